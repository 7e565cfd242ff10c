// ==========================================
// 库存分配系统 - 汇总视图模型
// ==========================================
// 纯投影,不含分配逻辑
// ==========================================

use crate::domain::types::ComplianceStatus;
use serde::{Deserialize, Serialize};

/// SKU 周度汇总
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklySummary {
    pub sku: String,
    pub week_index: u32,
    pub week_label: String,
    pub physical_units: f64,      // 实物库存 (每 SKU-周只计一次)
    pub assigned_units: f64,      // 各渠道分配合计
    pub sold_units: f64,          // 展示用销量合计
    pub calc_sold_units: f64,     // 参与计算的销量合计
    pub compliance_pct: f64,      // 达成率 = 销量 / 分配 * 100
    pub status: ComplianceStatus,
}

/// 合并视图中的单个 SKU
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsolidatedSku {
    pub sku: String,
    pub description: Option<String>,
    pub quota_units: f64,         // 各渠道月度配额合计
    pub weeks: Vec<WeeklySummary>,
}

impl ConsolidatedSku {
    /// SKU 或描述包含关键字 (不区分大小写)
    pub fn matches(&self, query: &str) -> bool {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        self.sku.to_lowercase().contains(&needle)
            || self
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(&needle))
    }
}

/// 月度周汇总 (跨 SKU)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthWeekSummary {
    pub week_index: u32,
    pub physical_units: f64,
    pub assigned_units: f64,
    pub sold_units: f64,
    pub sku_count: usize,
    pub compliance_pct: f64,
}

/// 渠道汇总
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelSummary {
    pub channel: String,
    pub sku_count: usize,
    pub assigned_units: f64,
    pub avg_weight: f64,
}

/// 单渠道月度指标
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelMetrics {
    pub channel: String,
    pub assigned_units: f64,      // 分配合计
    pub sold_units: f64,          // 展示用销量合计
    pub compliance_pct: f64,
    pub remaining_units: f64,     // 各 SKU 首周期初库存合计 - 销量合计
    pub sku_count: usize,
}
