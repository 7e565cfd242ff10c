// ==========================================
// 库存分配系统 - 分配输入模型
// ==========================================
// 职责: 渠道月度配额、周库存快照、实际销量
// 红线: 缺失数据必须显式表达 (Option / 缺省 0),不允许 NaN
// ==========================================

use crate::domain::types::non_negative;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ==========================================
// ChannelQuota - 渠道月度配额
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelQuota {
    pub channel: String,     // 渠道
    pub quota_units: f64,    // 月度配额 (件)
    pub weight: f64,         // 静态权重 (0..1, 仅展示)
}

impl ChannelQuota {
    pub fn new(channel: impl Into<String>, quota_units: f64) -> Self {
        Self {
            channel: channel.into(),
            quota_units,
            weight: 0.0,
        }
    }

    /// 有效配额: 非法值按 0 处理
    pub fn effective_quota(&self) -> f64 {
        non_negative(self.quota_units)
    }
}

// ==========================================
// PhysicalSnapshot - 周库存快照
// ==========================================
// initial_stock_units 仅在该周已盘点时存在
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhysicalSnapshot {
    pub initial_stock_units: Option<f64>, // 期初库存 (已盘点)
    pub arrivals_units: f64,              // 预计到货
    pub reserved_units: f64,              // 预留/预测消耗 (B2B)
}

impl PhysicalSnapshot {
    /// 已盘点快照
    pub fn measured(initial: f64, arrivals: f64, reserved: f64) -> Self {
        Self {
            initial_stock_units: Some(initial),
            arrivals_units: arrivals,
            reserved_units: reserved,
        }
    }

    /// 未盘点快照 (仅有到货/预留)
    pub fn projected(arrivals: f64, reserved: f64) -> Self {
        Self {
            initial_stock_units: None,
            arrivals_units: arrivals,
            reserved_units: reserved,
        }
    }

    pub fn is_measured(&self) -> bool {
        self.initial_stock_units.is_some()
    }
}

// ==========================================
// ActualSales - 实际销量记录
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActualSales {
    pub sku: String,
    pub channel: String,
    pub week_index: u32,
    pub units: f64,
}

// ==========================================
// SkuAllocationInput - 单 SKU 分配输入
// ==========================================
// 所有输入在计算开始前完整物化
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SkuAllocationInput {
    pub sku: String,
    pub description: Option<String>,
    pub channels: Vec<ChannelQuota>,
    pub snapshots: BTreeMap<u32, PhysicalSnapshot>,     // week_index -> 快照
    pub sales: BTreeMap<(String, u32), f64>,            // (channel, week_index) -> 销量
}

impl SkuAllocationInput {
    pub fn new(sku: impl Into<String>) -> Self {
        Self {
            sku: sku.into(),
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_channel(mut self, channel: impl Into<String>, quota_units: f64) -> Self {
        self.channels.push(ChannelQuota::new(channel, quota_units));
        self
    }

    pub fn with_snapshot(mut self, week_index: u32, snapshot: PhysicalSnapshot) -> Self {
        self.snapshots.insert(week_index, snapshot);
        self
    }

    pub fn with_sales(mut self, channel: impl Into<String>, week_index: u32, units: f64) -> Self {
        self.add_sales(channel, week_index, units);
        self
    }

    /// 累加销量 (同一渠道同一周可能有多条记录)
    pub fn add_sales(&mut self, channel: impl Into<String>, week_index: u32, units: f64) {
        *self.sales.entry((channel.into(), week_index)).or_insert(0.0) += non_negative(units);
    }

    /// 记录一条实际销量
    pub fn record_sales(&mut self, sale: ActualSales) {
        self.add_sales(sale.channel, sale.week_index, sale.units);
    }

    /// 某渠道某周的实际销量,缺失按 0
    pub fn sales_for(&self, channel: &str, week_index: u32) -> f64 {
        self.sales
            .get(&(channel.to_string(), week_index))
            .copied()
            .map(non_negative)
            .unwrap_or(0.0)
    }

    pub fn snapshot_for(&self, week_index: u32) -> Option<&PhysicalSnapshot> {
        self.snapshots.get(&week_index)
    }

    /// 参与本月分配的渠道
    ///
    /// 配额为 0 (或缺失/非法) 的渠道不参与分配；
    /// 按配额降序、渠道名升序排列,保证输出顺序稳定
    pub fn active_channels(&self) -> Vec<ChannelQuota> {
        let mut merged: BTreeMap<String, ChannelQuota> = BTreeMap::new();
        for quota in &self.channels {
            let entry = merged
                .entry(quota.channel.clone())
                .or_insert_with(|| ChannelQuota {
                    channel: quota.channel.clone(),
                    quota_units: 0.0,
                    weight: quota.weight,
                });
            entry.quota_units = quota.effective_quota();
            entry.weight = quota.weight;
        }

        let mut active: Vec<ChannelQuota> = merged
            .into_values()
            .filter(|q| q.quota_units > 0.0)
            .collect();
        active.sort_by(|a, b| {
            b.quota_units
                .total_cmp(&a.quota_units)
                .then_with(|| a.channel.cmp(&b.channel))
        });
        active
    }

    /// SKU 月度配额合计
    pub fn quota_total(&self) -> f64 {
        self.active_channels().iter().map(|q| q.quota_units).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_active_channels_excludes_zero_quota() {
        let input = SkuAllocationInput::new("SKU-1")
            .with_channel("B", 400.0)
            .with_channel("A", 600.0)
            .with_channel("C", 0.0)
            .with_channel("D", f64::NAN);

        let active = input.active_channels();
        let names: Vec<&str> = active.iter().map(|q| q.channel.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);
        assert_eq!(input.quota_total(), 1000.0);
    }

    #[test]
    fn test_duplicate_channel_last_quota_wins() {
        let input = SkuAllocationInput::new("SKU-1")
            .with_channel("A", 100.0)
            .with_channel("A", 250.0);
        let active = input.active_channels();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].quota_units, 250.0);
    }

    #[test]
    fn test_sales_accumulate_and_default_to_zero() {
        let mut input = SkuAllocationInput::new("SKU-1");
        input.add_sales("A", 1, 10.0);
        input.add_sales("A", 1, 5.0);
        input.add_sales("A", 2, -3.0);

        assert_eq!(input.sales_for("A", 1), 15.0);
        assert_eq!(input.sales_for("A", 2), 0.0);
        assert_eq!(input.sales_for("B", 1), 0.0);
    }
}
