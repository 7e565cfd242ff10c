// ==========================================
// 库存分配系统 - 分配配置读取 Trait
// ==========================================
// 职责: 定义分配引擎所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::config::error::ConfigResult;
use crate::domain::calendar::MonthCalendar;
use crate::engine::reconciliation::ReconciliationPolicy;
use async_trait::async_trait;

// ==========================================
// AllocationConfigReader Trait
// ==========================================
// 实现者: ConfigManager（从 config_kv 表读取）
#[async_trait]
pub trait AllocationConfigReader: Send + Sync {
    /// 获取月度日历（周窗口 + 季节性系数）
    ///
    /// # 错误
    /// - 未配置: ConfigError::CalendarNotFound
    /// - 校验失败: ConfigError::InvalidCalendar
    async fn get_month_calendar(&self, month_key: &str) -> ConfigResult<MonthCalendar>;

    /// 获取对账容差
    ///
    /// # 默认值
    /// - tolerance_pct = 0.01
    /// - min_tolerance_units = 10
    async fn get_reconciliation_policy(&self) -> ConfigResult<ReconciliationPolicy>;

    /// 获取并行计算的最大工作线程数
    ///
    /// # 默认值
    /// - 4
    async fn get_max_workers(&self) -> ConfigResult<usize>;
}
