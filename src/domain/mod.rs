// ==========================================
// 库存分配系统 - 领域模型层
// ==========================================
// 职责: 定义日历、分配输入、分配结果与汇总视图
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod allocation;
pub mod calendar;
pub mod inventory;
pub mod summary;
pub mod types;

// 重导出核心类型
pub use allocation::{
    AllocationWarning, MonthlyAllocationPlan, MonthlyAllocationReport, WeeklyAllocation,
};
pub use calendar::{CalendarError, MonthCalendar, SeasonalityTable, Week, DEFAULT_SEASONALITY_FACTOR};
pub use inventory::{ActualSales, ChannelQuota, PhysicalSnapshot, SkuAllocationInput};
pub use summary::{ChannelMetrics, ChannelSummary, ConsolidatedSku, MonthWeekSummary, WeeklySummary};
pub use types::{ComplianceStatus, WeekStatus};
