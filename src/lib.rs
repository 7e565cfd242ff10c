// ==========================================
// 库存分配系统 - 核心库
// ==========================================
// 职责: 将各渠道月度配额按周顺序分配到 SKU × 渠道 × 周
// 技术栈: Rust + SQLite
// 系统定位: 决策支持 (分配结果供人工复核)
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 日历/输入/结果
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 分配规则
pub mod engine;

// 配置层 - 月度日历与参数
pub mod config;

// 数据库基础设施（连接初始化/建表）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// 导出 - CSV
pub mod export;

// ==========================================
// 重导出核心类型
// ==========================================

pub use domain::{
    AllocationWarning, ChannelQuota, MonthCalendar, MonthlyAllocationPlan,
    MonthlyAllocationReport, PhysicalSnapshot, SeasonalityTable, SkuAllocationInput, Week,
    WeekStatus, WeeklyAllocation,
};

pub use engine::{
    AllocationOrchestrator, ConsolidatedViewBuilder, ReconciliationPolicy,
    ReconciliationValidator, SequentialAllocationEngine,
};

pub use api::{AllocationApi, ApiError, ApiResult};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "库存分配系统";
