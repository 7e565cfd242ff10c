// ==========================================
// Mock 配置实现 - 用于集成测试
// ==========================================

use async_trait::async_trait;
use inventory_distribution::config::{AllocationConfigReader, ConfigError, ConfigResult};
use inventory_distribution::domain::calendar::MonthCalendar;
use inventory_distribution::engine::ReconciliationPolicy;

/// Mock 配置结构
#[derive(Debug, Clone)]
pub struct MockConfig {
    pub calendar: Option<MonthCalendar>,
    pub policy: ReconciliationPolicy,
    pub max_workers: usize,
}

impl MockConfig {
    pub fn new(calendar: MonthCalendar) -> Self {
        Self {
            calendar: Some(calendar),
            policy: ReconciliationPolicy::default(),
            max_workers: 2,
        }
    }

    /// 收紧容差,便于触发对账告警
    pub fn strict(mut self) -> Self {
        self.policy = ReconciliationPolicy {
            tolerance_pct: 0.0,
            min_tolerance_units: 0.0,
        };
        self
    }
}

#[async_trait]
impl AllocationConfigReader for MockConfig {
    async fn get_month_calendar(&self, month_key: &str) -> ConfigResult<MonthCalendar> {
        self.calendar
            .clone()
            .filter(|c| c.month_key == month_key)
            .ok_or_else(|| ConfigError::CalendarNotFound(month_key.to_string()))
    }

    async fn get_reconciliation_policy(&self) -> ConfigResult<ReconciliationPolicy> {
        Ok(self.policy)
    }

    async fn get_max_workers(&self) -> ConfigResult<usize> {
        Ok(self.max_workers)
    }
}
