// ==========================================
// 库存分配系统 - 分配结果模型
// ==========================================
// 职责: 周度渠道分配明细、单 SKU 月度方案、告警
// 红线: 分配量 >= 0, 且不超过分配前渠道余额
// ==========================================

use crate::domain::types::WeekStatus;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ==========================================
// WeeklyAllocation - 周度渠道分配明细
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyAllocation {
    // ===== 维度 =====
    pub sku: String,
    pub description: Option<String>,
    pub channel: String,
    pub week_index: u32,
    pub week_label: String,
    pub week_status: WeekStatus,

    // ===== 实物库存 =====
    pub initial_stock_units: f64,     // 实际采用的期初库存 (盘点值或结转值)
    pub arrivals_units: f64,          // 预计到货
    pub reserved_units: f64,          // 预留消耗
    pub physical_units: f64,          // 本周实物可用

    // ===== 配额 =====
    pub channel_quota_units: f64,     // 渠道月度配额
    pub channel_weight: f64,          // 静态权重 (仅展示)
    pub balance_before_units: f64,    // 分配前渠道余额
    pub balance_after_units: f64,     // 本周结算后渠道余额

    // ===== 分配 =====
    pub weekly_total_units: f64,      // 本周 SKU 待分配总量
    pub assigned_units: f64,          // 渠道分配量 (整数)

    // ===== 销量 =====
    pub calc_sales_units: f64,        // 参与计算的销量 (未结束周为 0)
    pub info_sales_units: f64,        // 展示用实际销量
}

// ==========================================
// AllocationWarning - 非致命告警
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AllocationWarning {
    /// 所有渠道余额耗尽,本周跳过分配
    NoBalanceRemaining { sku: String, week_index: u32 },

    /// 渠道分配合计与月度配额偏差超出容差
    ChannelQuotaMismatch {
        sku: String,
        channel: String,
        expected_units: f64,
        actual_units: f64,
        tolerance_units: f64,
    },

    /// SKU 分配合计与月度配额合计偏差超出容差
    SkuQuotaMismatch {
        sku: String,
        expected_units: f64,
        actual_units: f64,
        tolerance_units: f64,
    },
}

impl AllocationWarning {
    pub fn sku(&self) -> &str {
        match self {
            AllocationWarning::NoBalanceRemaining { sku, .. }
            | AllocationWarning::ChannelQuotaMismatch { sku, .. }
            | AllocationWarning::SkuQuotaMismatch { sku, .. } => sku,
        }
    }
}

impl fmt::Display for AllocationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllocationWarning::NoBalanceRemaining { sku, week_index } => {
                write!(f, "NO_BALANCE_REMAINING: sku={}, week={}", sku, week_index)
            }
            AllocationWarning::ChannelQuotaMismatch {
                sku,
                channel,
                expected_units,
                actual_units,
                tolerance_units,
            } => write!(
                f,
                "CHANNEL_QUOTA_MISMATCH: sku={}, channel={}, expected={:.0}, actual={:.0}, tolerance={:.1}",
                sku, channel, expected_units, actual_units, tolerance_units
            ),
            AllocationWarning::SkuQuotaMismatch {
                sku,
                expected_units,
                actual_units,
                tolerance_units,
            } => write!(
                f,
                "SKU_QUOTA_MISMATCH: sku={}, expected={:.0}, actual={:.0}, tolerance={:.1}",
                sku, expected_units, actual_units, tolerance_units
            ),
        }
    }
}

// ==========================================
// MonthlyAllocationPlan - 单 SKU 月度分配方案
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyAllocationPlan {
    pub sku: String,
    pub description: Option<String>,
    pub month_key: String,
    pub rows: Vec<WeeklyAllocation>,
    pub warnings: Vec<AllocationWarning>, // 引擎运行期告警
}

impl MonthlyAllocationPlan {
    /// 各渠道分配合计
    pub fn assigned_by_channel(&self) -> BTreeMap<String, f64> {
        let mut totals = BTreeMap::new();
        for row in &self.rows {
            *totals.entry(row.channel.clone()).or_insert(0.0) += row.assigned_units;
        }
        totals
    }

    /// 各渠道月度配额
    pub fn quota_by_channel(&self) -> BTreeMap<String, f64> {
        self.rows
            .iter()
            .map(|row| (row.channel.clone(), row.channel_quota_units))
            .collect()
    }

    pub fn total_assigned(&self) -> f64 {
        self.rows.iter().map(|r| r.assigned_units).sum()
    }

    pub fn total_quota(&self) -> f64 {
        self.quota_by_channel().values().sum()
    }

    /// 参与计算的销量合计 (仅已结束周)
    pub fn total_calc_sales(&self) -> f64 {
        self.rows.iter().map(|r| r.calc_sales_units).sum()
    }

    /// 某渠道按周排列的明细
    pub fn rows_for_channel<'a>(&'a self, channel: &'a str) -> impl Iterator<Item = &'a WeeklyAllocation> + 'a {
        self.rows.iter().filter(move |r| r.channel == channel)
    }

    pub fn row(&self, channel: &str, week_index: u32) -> Option<&WeeklyAllocation> {
        self.rows
            .iter()
            .find(|r| r.channel == channel && r.week_index == week_index)
    }
}

// ==========================================
// MonthlyAllocationReport - 月度批量计算结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyAllocationReport {
    pub month_key: String,
    pub today: NaiveDate,
    pub plans: Vec<MonthlyAllocationPlan>, // 按 SKU 升序
    pub warnings: Vec<AllocationWarning>,  // 引擎告警 + 对账告警
}

impl MonthlyAllocationReport {
    /// 扁平化的全部明细行
    pub fn rows(&self) -> impl Iterator<Item = &WeeklyAllocation> {
        self.plans.iter().flat_map(|p| p.rows.iter())
    }

    pub fn plan(&self, sku: &str) -> Option<&MonthlyAllocationPlan> {
        self.plans.iter().find(|p| p.sku == sku)
    }
}
