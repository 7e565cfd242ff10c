// ==========================================
// 库存分配系统 - 对账校验器
// ==========================================
// 职责: 校验分配合计与月度配额的偏差
// 容差: max(配额 * 比例, 最小件数)
// 红线: 对账结果只产生告警,方案始终返回
// ==========================================

use crate::domain::allocation::{AllocationWarning, MonthlyAllocationPlan};
use crate::domain::types::non_negative;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// 缺省容差比例 (1%)
pub const DEFAULT_TOLERANCE_PCT: f64 = 0.01;

/// 缺省最小容差 (件)
pub const DEFAULT_MIN_TOLERANCE_UNITS: f64 = 10.0;

// ==========================================
// ReconciliationPolicy - 对账容差配置
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationPolicy {
    pub tolerance_pct: f64,
    pub min_tolerance_units: f64,
}

impl ReconciliationPolicy {
    /// 某配额对应的容差
    pub fn tolerance_for(&self, quota: f64) -> f64 {
        (non_negative(quota) * non_negative(self.tolerance_pct)).max(non_negative(self.min_tolerance_units))
    }
}

impl Default for ReconciliationPolicy {
    fn default() -> Self {
        Self {
            tolerance_pct: DEFAULT_TOLERANCE_PCT,
            min_tolerance_units: DEFAULT_MIN_TOLERANCE_UNITS,
        }
    }
}

// ==========================================
// ReconciliationValidator
// ==========================================
pub struct ReconciliationValidator {
    policy: ReconciliationPolicy,
}

impl ReconciliationValidator {
    pub fn new(policy: ReconciliationPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> ReconciliationPolicy {
        self.policy
    }

    /// 校验单 SKU 方案
    ///
    /// 先逐渠道比对,再比对 SKU 合计
    pub fn validate(&self, plan: &MonthlyAllocationPlan) -> Vec<AllocationWarning> {
        let mut warnings = Vec::new();
        if plan.rows.is_empty() {
            return warnings;
        }

        let assigned = plan.assigned_by_channel();
        for (channel, quota) in plan.quota_by_channel() {
            let actual = assigned.get(&channel).copied().unwrap_or(0.0);
            let tolerance = self.policy.tolerance_for(quota);
            if (actual - quota).abs() > tolerance {
                warn!(
                    sku = %plan.sku,
                    channel = %channel,
                    expected = quota,
                    actual = actual,
                    tolerance = tolerance,
                    "渠道分配合计与月度配额不一致"
                );
                warnings.push(AllocationWarning::ChannelQuotaMismatch {
                    sku: plan.sku.clone(),
                    channel,
                    expected_units: quota,
                    actual_units: actual,
                    tolerance_units: tolerance,
                });
            }
        }

        let total_quota = plan.total_quota();
        let total_assigned = plan.total_assigned();
        let tolerance = self.policy.tolerance_for(total_quota);
        if (total_assigned - total_quota).abs() > tolerance {
            warn!(
                sku = %plan.sku,
                expected = total_quota,
                actual = total_assigned,
                tolerance = tolerance,
                "SKU 分配合计与月度配额不一致"
            );
            warnings.push(AllocationWarning::SkuQuotaMismatch {
                sku: plan.sku.clone(),
                expected_units: total_quota,
                actual_units: total_assigned,
                tolerance_units: tolerance,
            });
        } else {
            let sold = plan.total_calc_sales();
            info!(
                sku = %plan.sku,
                assigned = total_assigned,
                sold = sold,
                quota = total_quota,
                remaining = total_quota - sold,
                "对账通过"
            );
        }

        warnings
    }
}

impl Default for ReconciliationValidator {
    fn default() -> Self {
        Self::new(ReconciliationPolicy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::allocation::WeeklyAllocation;
    use crate::domain::types::WeekStatus;

    fn row(channel: &str, week_index: u32, quota: f64, assigned: f64) -> WeeklyAllocation {
        WeeklyAllocation {
            sku: "SKU-1".to_string(),
            description: None,
            channel: channel.to_string(),
            week_index,
            week_label: format!("W{}", week_index),
            week_status: WeekStatus::Open,
            initial_stock_units: 0.0,
            arrivals_units: 0.0,
            reserved_units: 0.0,
            physical_units: 0.0,
            channel_quota_units: quota,
            channel_weight: 0.0,
            balance_before_units: quota,
            balance_after_units: quota,
            weekly_total_units: 0.0,
            assigned_units: assigned,
            calc_sales_units: 0.0,
            info_sales_units: 0.0,
        }
    }

    fn plan(rows: Vec<WeeklyAllocation>) -> MonthlyAllocationPlan {
        MonthlyAllocationPlan {
            sku: "SKU-1".to_string(),
            description: None,
            month_key: "2026-03".to_string(),
            rows,
            warnings: Vec::new(),
        }
    }

    #[test]
    fn test_tolerance_rule() {
        let policy = ReconciliationPolicy::default();
        assert_eq!(policy.tolerance_for(100.0), 10.0);
        assert_eq!(policy.tolerance_for(5000.0), 50.0);
        assert_eq!(policy.tolerance_for(0.0), 10.0);
    }

    #[test]
    fn test_within_tolerance_no_warning() {
        let validator = ReconciliationValidator::default();
        let p = plan(vec![
            row("A", 1, 600.0, 300.0),
            row("A", 2, 600.0, 295.0),
            row("B", 1, 400.0, 200.0),
            row("B", 2, 400.0, 200.0),
        ]);
        assert!(validator.validate(&p).is_empty());
    }

    #[test]
    fn test_channel_mismatch_reported() {
        let validator = ReconciliationValidator::default();
        let p = plan(vec![
            row("A", 1, 600.0, 300.0),
            row("A", 2, 600.0, 250.0),
            row("B", 1, 400.0, 200.0),
            row("B", 2, 400.0, 200.0),
        ]);
        let warnings = validator.validate(&p);
        assert_eq!(warnings.len(), 2);
        match &warnings[0] {
            AllocationWarning::ChannelQuotaMismatch {
                channel,
                expected_units,
                actual_units,
                ..
            } => {
                assert_eq!(channel, "A");
                assert_eq!(*expected_units, 600.0);
                assert_eq!(*actual_units, 550.0);
            }
            other => panic!("unexpected warning: {:?}", other),
        }
        assert!(matches!(warnings[1], AllocationWarning::SkuQuotaMismatch { .. }));
    }

    #[test]
    fn test_empty_plan_has_no_warnings() {
        let validator = ReconciliationValidator::default();
        assert!(validator.validate(&plan(Vec::new())).is_empty());
    }
}
