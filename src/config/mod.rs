// ==========================================
// 库存分配系统 - 配置层
// ==========================================
// 职责: 月度日历与分配参数管理
// 存储: config_kv 表
// ==========================================

pub mod allocation_config_trait;
pub mod config_manager;
pub mod error;

// 重导出核心配置管理器
pub use allocation_config_trait::AllocationConfigReader;
pub use config_manager::{config_keys, ConfigManager, DEFAULT_MAX_WORKERS};
pub use error::{ConfigError, ConfigResult};
