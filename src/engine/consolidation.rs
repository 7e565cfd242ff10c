// ==========================================
// 库存分配系统 - 汇总视图构建器
// ==========================================
// 职责: 将渠道明细投影为 SKU 周汇总、合并视图、月度周汇总与渠道指标
// 红线: 不含任何分配逻辑
// ==========================================

use crate::domain::allocation::MonthlyAllocationPlan;
use crate::domain::summary::{
    ChannelMetrics, ChannelSummary, ConsolidatedSku, MonthWeekSummary, WeeklySummary,
};
use crate::domain::types::{finite_or_zero, ComplianceStatus};
use std::collections::{BTreeMap, BTreeSet};

/// 达成率 (%),分配为 0 时返回 0
fn compliance_pct(sold: f64, assigned: f64) -> f64 {
    if assigned <= 0.0 {
        return 0.0;
    }
    finite_or_zero(sold / assigned * 100.0)
}

pub struct ConsolidatedViewBuilder {
    // 无状态
}

impl ConsolidatedViewBuilder {
    pub fn new() -> Self {
        Self {}
    }

    /// SKU 周汇总
    ///
    /// 实物库存在同一 SKU-周 的各渠道行中重复出现,只取一次
    pub fn sku_weekly(&self, plan: &MonthlyAllocationPlan) -> Vec<WeeklySummary> {
        let mut by_week: BTreeMap<u32, WeeklySummary> = BTreeMap::new();
        for row in &plan.rows {
            let entry = by_week.entry(row.week_index).or_insert_with(|| WeeklySummary {
                sku: plan.sku.clone(),
                week_index: row.week_index,
                week_label: row.week_label.clone(),
                physical_units: row.physical_units,
                assigned_units: 0.0,
                sold_units: 0.0,
                calc_sold_units: 0.0,
                compliance_pct: 0.0,
                status: ComplianceStatus::Low,
            });
            entry.assigned_units += row.assigned_units;
            entry.sold_units += row.info_sales_units;
            entry.calc_sold_units += row.calc_sales_units;
        }

        by_week
            .into_values()
            .map(|mut s| {
                s.compliance_pct = compliance_pct(s.sold_units, s.assigned_units);
                s.status = ComplianceStatus::classify(s.sold_units, s.assigned_units);
                s
            })
            .collect()
    }

    /// 合并视图: 每个 SKU 一项,附描述、配额合计与周汇总
    pub fn consolidated(&self, plans: &[MonthlyAllocationPlan]) -> Vec<ConsolidatedSku> {
        plans
            .iter()
            .map(|plan| {
                let mut quotas: BTreeMap<&str, f64> = BTreeMap::new();
                for row in &plan.rows {
                    quotas.insert(row.channel.as_str(), row.channel_quota_units);
                }
                ConsolidatedSku {
                    sku: plan.sku.clone(),
                    description: plan.description.clone(),
                    quota_units: quotas.values().sum(),
                    weeks: self.sku_weekly(plan),
                }
            })
            .collect()
    }

    /// 单渠道月度指标
    ///
    /// 剩余库存 = 各 SKU 首周期初库存之和 - 渠道销量合计,不截断为 0。
    /// 渠道无明细时全部为 0。
    pub fn channel_metrics(&self, plans: &[MonthlyAllocationPlan], channel: &str) -> ChannelMetrics {
        let mut assigned = 0.0;
        let mut sold = 0.0;
        let mut initial_stock = 0.0;
        let mut sku_count = 0;

        for plan in plans {
            let rows: Vec<_> = plan.rows.iter().filter(|r| r.channel == channel).collect();
            let Some(first) = rows.iter().min_by_key(|r| r.week_index) else {
                continue;
            };
            sku_count += 1;
            initial_stock += first.initial_stock_units;
            for row in &rows {
                assigned += row.assigned_units;
                sold += row.info_sales_units;
            }
        }

        ChannelMetrics {
            channel: channel.to_string(),
            assigned_units: assigned,
            sold_units: sold,
            compliance_pct: compliance_pct(sold, assigned),
            remaining_units: finite_or_zero(initial_stock - sold),
            sku_count,
        }
    }

    /// 月度周汇总 (跨 SKU)
    pub fn month_weekly(&self, plans: &[MonthlyAllocationPlan]) -> Vec<MonthWeekSummary> {
        let mut by_week: BTreeMap<u32, (MonthWeekSummary, BTreeSet<String>)> = BTreeMap::new();
        for plan in plans {
            for summary in self.sku_weekly(plan) {
                let (entry, skus) = by_week.entry(summary.week_index).or_insert_with(|| {
                    (
                        MonthWeekSummary {
                            week_index: summary.week_index,
                            physical_units: 0.0,
                            assigned_units: 0.0,
                            sold_units: 0.0,
                            sku_count: 0,
                            compliance_pct: 0.0,
                        },
                        BTreeSet::new(),
                    )
                });
                entry.physical_units += summary.physical_units;
                entry.assigned_units += summary.assigned_units;
                entry.sold_units += summary.sold_units;
                skus.insert(summary.sku);
            }
        }

        by_week
            .into_values()
            .map(|(mut s, skus)| {
                s.sku_count = skus.len();
                s.compliance_pct = compliance_pct(s.sold_units, s.assigned_units);
                s
            })
            .collect()
    }

    /// 渠道汇总,按分配合计降序
    pub fn channel_summary(&self, plans: &[MonthlyAllocationPlan]) -> Vec<ChannelSummary> {
        // channel -> (skus, assigned, weight_sum, weight_count)
        let mut acc: BTreeMap<String, (BTreeSet<String>, f64, f64, usize)> = BTreeMap::new();
        for plan in plans {
            let mut weight_seen: BTreeSet<&str> = BTreeSet::new();
            for row in &plan.rows {
                let entry = acc
                    .entry(row.channel.clone())
                    .or_insert_with(|| (BTreeSet::new(), 0.0, 0.0, 0));
                entry.0.insert(plan.sku.clone());
                entry.1 += row.assigned_units;
                if weight_seen.insert(row.channel.as_str()) {
                    entry.2 += row.channel_weight;
                    entry.3 += 1;
                }
            }
        }

        let mut summaries: Vec<ChannelSummary> = acc
            .into_iter()
            .map(|(channel, (skus, assigned, weight_sum, weight_count))| ChannelSummary {
                channel,
                sku_count: skus.len(),
                assigned_units: assigned,
                avg_weight: if weight_count == 0 {
                    0.0
                } else {
                    finite_or_zero(weight_sum / weight_count as f64)
                },
            })
            .collect();
        summaries.sort_by(|a, b| {
            b.assigned_units
                .total_cmp(&a.assigned_units)
                .then_with(|| a.channel.cmp(&b.channel))
        });
        summaries
    }
}

impl Default for ConsolidatedViewBuilder {
    fn default() -> Self {
        Self::new()
    }
}
