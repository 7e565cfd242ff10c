// ==========================================
// 库存分配系统 - 配置层错误类型
// ==========================================
// 工具: thiserror 派生宏
// ==========================================

use crate::domain::calendar::CalendarError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("数据库访问失败: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("锁获取失败: {0}")]
    LockError(String),

    #[error("配置格式错误 (key={key}): {message}")]
    InvalidValue { key: String, message: String },

    #[error("月度日历未配置: {0}")]
    CalendarNotFound(String),

    #[error("月度日历非法: {0}")]
    InvalidCalendar(#[from] CalendarError),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

pub type ConfigResult<T> = Result<T, ConfigError>;
