// ==========================================
// 库存分配系统 - 月度日历与季节性系数
// ==========================================
// 职责: 描述一个月包含哪些周、每周的日期窗口与季节性系数
// 红线: 算法本身不感知具体日历,日历全部来自配置
// ==========================================

use crate::domain::types::{finite_or_zero, WeekStatus};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use thiserror::Error;

/// 缺省季节性系数（未配置的周按 1.0 计）
pub const DEFAULT_SEASONALITY_FACTOR: f64 = 1.0;

// ==========================================
// Week - 月内周期
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Week {
    pub index: u32,                // 月内序号 (1..N)
    #[serde(default)]
    pub label: Option<String>,     // 展示标签 (如 ISO 周号 "49")
    pub start_date: NaiveDate,     // 周开始日期
    pub end_date: NaiveDate,       // 周结束日期

    // 库存快照日期 (默认: 周开始前一天)
    #[serde(default)]
    pub inventory_date: Option<NaiveDate>,

    // 销量统计窗口 (跨年周可与周窗口不同)
    #[serde(default)]
    pub sales_start: Option<NaiveDate>,
    #[serde(default)]
    pub sales_end: Option<NaiveDate>,
}

impl Week {
    pub fn new(index: u32, start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            index,
            label: None,
            start_date,
            end_date,
            inventory_date: None,
            sales_start: None,
            sales_end: None,
        }
    }

    /// 周状态
    pub fn status(&self, today: NaiveDate) -> WeekStatus {
        WeekStatus::classify(self.end_date, today)
    }

    /// 库存快照日期
    pub fn snapshot_date(&self) -> NaiveDate {
        self.inventory_date
            .unwrap_or_else(|| self.start_date - Duration::days(1))
    }

    /// 销量统计窗口（闭区间）
    pub fn sales_window(&self) -> (NaiveDate, NaiveDate) {
        (
            self.sales_start.unwrap_or(self.start_date),
            self.sales_end.unwrap_or(self.end_date),
        )
    }

    pub fn display_label(&self) -> String {
        self.label
            .clone()
            .unwrap_or_else(|| format!("W{}", self.index))
    }
}

// ==========================================
// SeasonalityTable - 季节性系数表
// ==========================================
// 系数只用于比例计算,不要求归一化
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeasonalityTable {
    factors: BTreeMap<u32, f64>,
}

impl SeasonalityTable {
    pub fn new(factors: BTreeMap<u32, f64>) -> Self {
        Self { factors }
    }

    /// 全部周使用同一系数
    pub fn uniform(indexes: impl IntoIterator<Item = u32>, factor: f64) -> Self {
        Self {
            factors: indexes.into_iter().map(|i| (i, factor)).collect(),
        }
    }

    pub fn set(&mut self, week_index: u32, factor: f64) {
        self.factors.insert(week_index, factor);
    }

    /// 读取系数,未配置或非法值按缺省系数处理
    pub fn factor(&self, week_index: u32) -> f64 {
        match self.factors.get(&week_index) {
            Some(f) if f.is_finite() && *f > 0.0 => *f,
            _ => DEFAULT_SEASONALITY_FACTOR,
        }
    }

    /// 本周在剩余周中的权重: factor[w] / Σ factor[w'], w' ∈ remaining
    ///
    /// `remaining` 必须包含 `week_index` 本身；分母为 0 时返回 0
    pub fn share_of_remaining(&self, week_index: u32, remaining: &[u32]) -> f64 {
        let denominator: f64 = remaining.iter().map(|i| self.factor(*i)).sum();
        if denominator <= 0.0 {
            return 0.0;
        }
        finite_or_zero(self.factor(week_index) / denominator)
    }

    pub fn configured(&self) -> &BTreeMap<u32, f64> {
        &self.factors
    }
}

// ==========================================
// CalendarError - 日历配置错误
// ==========================================
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CalendarError {
    #[error("月份标识不能为空")]
    EmptyMonthKey,

    #[error("月份 {0} 未配置任何周")]
    NoWeeks(String),

    #[error("周序号重复: {0}")]
    DuplicateWeek(u32),

    #[error("周 {index} 开始日期 {start} 晚于结束日期 {end}")]
    InvalidWeekRange {
        index: u32,
        start: NaiveDate,
        end: NaiveDate,
    },

    #[error("周 {index} 销量窗口非法: {start} > {end}")]
    InvalidSalesWindow {
        index: u32,
        start: NaiveDate,
        end: NaiveDate,
    },

    #[error("周 {index} 的季节性系数 {factor} 必须为正数")]
    InvalidSeasonality { index: u32, factor: f64 },
}

// ==========================================
// MonthCalendar - 月度日历
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthCalendar {
    pub month_key: String,              // 月份标识 (如 "2025-12")
    pub weeks: Vec<Week>,
    #[serde(default)]
    pub seasonality: SeasonalityTable,
}

impl MonthCalendar {
    pub fn new(month_key: impl Into<String>, weeks: Vec<Week>, seasonality: SeasonalityTable) -> Self {
        Self {
            month_key: month_key.into(),
            weeks,
            seasonality,
        }
    }

    /// 按开始日期升序排列的周列表
    pub fn ordered_weeks(&self) -> Vec<Week> {
        let mut weeks = self.weeks.clone();
        weeks.sort_by(|a, b| a.start_date.cmp(&b.start_date).then(a.index.cmp(&b.index)));
        weeks
    }

    /// 一次性判定所有周的状态
    pub fn classify(&self, today: NaiveDate) -> Vec<(Week, WeekStatus)> {
        self.ordered_weeks()
            .into_iter()
            .map(|w| {
                let status = w.status(today);
                (w, status)
            })
            .collect()
    }

    /// 验证日历配置
    ///
    /// # 验证规则
    /// 1. 月份标识不能为空
    /// 2. 至少包含一周
    /// 3. 周序号不重复
    /// 4. 开始日期不晚于结束日期,销量窗口同理
    /// 5. 已配置的季节性系数必须为有限正数
    pub fn validate(&self) -> Result<(), CalendarError> {
        if self.month_key.trim().is_empty() {
            return Err(CalendarError::EmptyMonthKey);
        }

        if self.weeks.is_empty() {
            return Err(CalendarError::NoWeeks(self.month_key.clone()));
        }

        let mut seen = HashSet::new();
        for week in &self.weeks {
            if !seen.insert(week.index) {
                return Err(CalendarError::DuplicateWeek(week.index));
            }
            if week.start_date > week.end_date {
                return Err(CalendarError::InvalidWeekRange {
                    index: week.index,
                    start: week.start_date,
                    end: week.end_date,
                });
            }
            let (sales_start, sales_end) = week.sales_window();
            if sales_start > sales_end {
                return Err(CalendarError::InvalidSalesWindow {
                    index: week.index,
                    start: sales_start,
                    end: sales_end,
                });
            }
        }

        for (index, factor) in self.seasonality.configured() {
            if !factor.is_finite() || *factor <= 0.0 {
                return Err(CalendarError::InvalidSeasonality {
                    index: *index,
                    factor: *factor,
                });
            }
        }

        Ok(())
    }
}
