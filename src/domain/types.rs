// ==========================================
// 库存分配系统 - 领域类型定义
// ==========================================
// 周状态在一次计算开始时统一判定,算法内部不再比较日期
// ==========================================

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 周状态 (Week Status)
// ==========================================
// Closed: 周结束日期早于参考日,实际销量为权威数据
// Open:   当前周或未来周,实际销量只做展示
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WeekStatus {
    Closed, // 已结束
    Open,   // 当前/未来
}

impl WeekStatus {
    /// 按参考日判定周状态
    ///
    /// # 参数
    /// - `end_date`: 周结束日期
    /// - `today`: 参考日
    pub fn classify(end_date: NaiveDate, today: NaiveDate) -> Self {
        if end_date < today {
            WeekStatus::Closed
        } else {
            WeekStatus::Open
        }
    }

    pub fn is_closed(self) -> bool {
        self == WeekStatus::Closed
    }

    pub fn is_open(self) -> bool {
        self == WeekStatus::Open
    }
}

impl fmt::Display for WeekStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WeekStatus::Closed => write!(f, "CLOSED"),
            WeekStatus::Open => write!(f, "OPEN"),
        }
    }
}

// ==========================================
// 达成状态 (Compliance Status)
// ==========================================
// 按 SKU-周 的销量/分配判定,优先级: 超卖 > 达成 > 部分 > 偏低
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComplianceStatus {
    OverSold,  // 销量 > 分配 * 1.05
    Fulfilled, // 达成率 >= 95%
    Partial,   // 达成率 >= 80%
    Low,       // 其余
}

/// 超卖判定倍数
pub const OVERSOLD_FACTOR: f64 = 1.05;
/// 达成阈值 (%)
pub const FULFILLED_PCT: f64 = 95.0;
/// 部分达成阈值 (%)
pub const PARTIAL_PCT: f64 = 80.0;

impl ComplianceStatus {
    /// 按销量与分配量判定
    ///
    /// 分配为 0 时达成率按 0 计; 此时只要有销量即为超卖
    pub fn classify(sold: f64, assigned: f64) -> Self {
        let sold = non_negative(sold);
        let assigned = non_negative(assigned);
        if sold > assigned * OVERSOLD_FACTOR {
            return ComplianceStatus::OverSold;
        }
        let pct = if assigned > 0.0 {
            finite_or_zero(sold / assigned * 100.0)
        } else {
            0.0
        };
        if pct >= FULFILLED_PCT {
            ComplianceStatus::Fulfilled
        } else if pct >= PARTIAL_PCT {
            ComplianceStatus::Partial
        } else {
            ComplianceStatus::Low
        }
    }
}

impl fmt::Display for ComplianceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComplianceStatus::OverSold => write!(f, "OVER_SOLD"),
            ComplianceStatus::Fulfilled => write!(f, "FULFILLED"),
            ComplianceStatus::Partial => write!(f, "PARTIAL"),
            ComplianceStatus::Low => write!(f, "LOW"),
        }
    }
}

// ==========================================
// 数值保护
// ==========================================

/// 将 NaN/Inf 归零,其余原样返回
pub fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// 将 NaN/Inf/负数归零
pub fn non_negative(value: f64) -> f64 {
    finite_or_zero(value).max(0.0)
}
