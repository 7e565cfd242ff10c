// ==========================================
// 库存分配系统 - 周度顺序分配引擎
// ==========================================
// 职责: 将渠道月度配额按周顺序分配,受实物库存与实际消耗约束
// 输入: SkuAllocationInput + MonthCalendar + 参考日
// 输出: MonthlyAllocationPlan (渠道 x 周 明细)
// ==========================================
// 红线:
// 1) 周按时间顺序逐一处理,不可并行
// 2) 渠道余额只被实际消耗扣减,不被分配量扣减
// 3) 已结束周受实物库存约束；当前/未来周按理论量分配 (不受实物约束)
// 4) 未结束周的实际销量只展示,不参与计算
// ==========================================

use crate::domain::allocation::{AllocationWarning, MonthlyAllocationPlan, WeeklyAllocation};
use crate::domain::calendar::{MonthCalendar, SeasonalityTable, Week};
use crate::domain::inventory::{ChannelQuota, SkuAllocationInput};
use crate::domain::types::{finite_or_zero, non_negative, WeekStatus};
use crate::engine::availability::PhysicalAvailabilityResolver;
use chrono::NaiveDate;
use std::collections::BTreeMap;
use tracing::{debug, instrument, warn};

// ==========================================
// AllocationState - 单 SKU 跨周状态
// ==========================================
// 每周产生一个新状态,旧状态不被修改
#[derive(Debug, Clone, PartialEq)]
pub struct AllocationState {
    pub balances: BTreeMap<String, f64>, // 渠道剩余额度 (bolsa)
    pub assigned_so_far: f64,            // 已处理的未结束周分配合计
    pub carried_physical: f64,           // 结转实物库存
    pub closed_sales_to_date: f64,       // 已处理的已结束周实际销量合计
}

impl AllocationState {
    /// 初始状态: 渠道余额 = 月度配额
    pub fn initial(channels: &[ChannelQuota]) -> Self {
        Self {
            balances: channels
                .iter()
                .map(|c| (c.channel.clone(), c.effective_quota()))
                .collect(),
            assigned_so_far: 0.0,
            carried_physical: 0.0,
            closed_sales_to_date: 0.0,
        }
    }

    pub fn balance(&self, channel: &str) -> f64 {
        self.balances.get(channel).copied().unwrap_or(0.0)
    }

    /// 正余额合计
    pub fn balance_total(&self) -> f64 {
        self.balances.values().filter(|b| **b > 0.0).sum()
    }
}

/// 单周转移结果
#[derive(Debug, Clone)]
pub struct WeekOutcome {
    pub state: AllocationState,
    pub rows: Vec<WeeklyAllocation>,
    pub warning: Option<AllocationWarning>,
}

/// 单周计算上下文
pub struct WeekContext<'a> {
    pub week: &'a Week,
    pub status: WeekStatus,
    pub remaining_indexes: &'a [u32], // 本周及之后的周序号
}

// ==========================================
// SequentialAllocationEngine
// ==========================================
pub struct SequentialAllocationEngine {
    resolver: PhysicalAvailabilityResolver,
}

impl SequentialAllocationEngine {
    pub fn new() -> Self {
        Self {
            resolver: PhysicalAvailabilityResolver::new(),
        }
    }

    // ==========================================
    // 核心方法
    // ==========================================

    /// 计算单 SKU 的月度分配方案
    ///
    /// 周状态在入口处一次性判定,之后按周顺序折叠状态。
    /// 相同输入总是得到相同输出。
    ///
    /// # 参数
    /// - `input`: SKU 分配输入 (配额/快照/销量)
    /// - `calendar`: 月度日历 (周与季节性系数)
    /// - `today`: 参考日,用于区分已结束周与未结束周
    #[instrument(skip(self, input, calendar), fields(
        sku = %input.sku,
        month_key = %calendar.month_key,
        today = %today
    ))]
    pub fn allocate(
        &self,
        input: &SkuAllocationInput,
        calendar: &MonthCalendar,
        today: NaiveDate,
    ) -> MonthlyAllocationPlan {
        let channels = input.active_channels();
        let mut plan = MonthlyAllocationPlan {
            sku: input.sku.clone(),
            description: input.description.clone(),
            month_key: calendar.month_key.clone(),
            rows: Vec::with_capacity(channels.len() * calendar.weeks.len()),
            warnings: Vec::new(),
        };

        if channels.is_empty() {
            debug!("无有效渠道配额,跳过");
            return plan;
        }

        let quota_total: f64 = channels.iter().map(|c| c.quota_units).sum();
        let classified = calendar.classify(today);
        let indexes: Vec<u32> = classified.iter().map(|(w, _)| w.index).collect();

        let final_state = classified.iter().enumerate().fold(
            AllocationState::initial(&channels),
            |state, (pos, (week, status))| {
                let ctx = WeekContext {
                    week,
                    status: *status,
                    remaining_indexes: &indexes[pos..],
                };
                let outcome = self.step(
                    input,
                    &channels,
                    quota_total,
                    &calendar.seasonality,
                    &ctx,
                    &state,
                );
                plan.rows.extend(outcome.rows);
                plan.warnings.extend(outcome.warning);
                outcome.state
            },
        );

        debug!(
            rows = plan.rows.len(),
            assigned_total = plan.total_assigned(),
            assigned_open_weeks = final_state.assigned_so_far,
            closed_sales = final_state.closed_sales_to_date,
            "SKU 分配完成"
        );

        plan
    }

    /// 单周状态转移
    ///
    /// 步骤:
    /// 1) 解析本周实物可用量 (盘点值或上周结转)
    /// 2) 剩余池 = 配额合计 - 已结束周销量 - 未结束周已分配
    /// 3) 理论量 = 剩余池 * 本周季节性占比
    /// 4) 本周总量: 未结束周取理论量；已结束周取 min(实物, 理论量, 余额合计)
    /// 5) 渠道分配 = round(min(总量 * 余额占比, 渠道余额))
    /// 6) 余额扣减参与计算的销量,结转实物库存,累计未结束周分配
    pub fn step(
        &self,
        input: &SkuAllocationInput,
        channels: &[ChannelQuota],
        quota_total: f64,
        seasonality: &SeasonalityTable,
        ctx: &WeekContext<'_>,
        state: &AllocationState,
    ) -> WeekOutcome {
        let week_index = ctx.week.index;
        let availability = self
            .resolver
            .resolve(input.snapshot_for(week_index), state.carried_physical);

        let remaining_pool =
            finite_or_zero(quota_total - state.closed_sales_to_date - state.assigned_so_far);
        let share = seasonality.share_of_remaining(week_index, ctx.remaining_indexes);
        let theoretical = finite_or_zero(remaining_pool * share);
        let balance_total = state.balance_total();

        let weekly_total = match ctx.status {
            WeekStatus::Open => non_negative(theoretical),
            WeekStatus::Closed => non_negative(
                availability
                    .physical_units
                    .min(theoretical)
                    .min(balance_total),
            ),
        };

        let exhausted = balance_total <= 0.0;
        let warning = if exhausted {
            warn!(
                sku = %input.sku,
                week_index = week_index,
                "所有渠道余额已耗尽,本周跳过分配"
            );
            Some(AllocationWarning::NoBalanceRemaining {
                sku: input.sku.clone(),
                week_index,
            })
        } else {
            None
        };

        let mut next = state.clone();
        let mut rows = Vec::with_capacity(channels.len());
        let mut assigned_week = 0.0;
        let mut consumed_week = 0.0;

        for channel in channels {
            let before = state.balance(&channel.channel);
            let assigned = if exhausted {
                0.0
            } else {
                let factor = finite_or_zero(before / balance_total);
                Self::assign_units(weekly_total * factor, before)
            };

            let info_sales = input.sales_for(&channel.channel, week_index);
            let calc_sales = match ctx.status {
                WeekStatus::Closed => info_sales,
                WeekStatus::Open => 0.0,
            };
            let after = non_negative(before - calc_sales);
            next.balances.insert(channel.channel.clone(), after);

            assigned_week += assigned;
            consumed_week += calc_sales;

            rows.push(WeeklyAllocation {
                sku: input.sku.clone(),
                description: input.description.clone(),
                channel: channel.channel.clone(),
                week_index,
                week_label: ctx.week.display_label(),
                week_status: ctx.status,
                initial_stock_units: availability.initial_stock_units,
                arrivals_units: availability.arrivals_units,
                reserved_units: availability.reserved_units,
                physical_units: availability.physical_units,
                channel_quota_units: channel.quota_units,
                channel_weight: channel.weight,
                balance_before_units: before,
                balance_after_units: after,
                weekly_total_units: weekly_total,
                assigned_units: assigned,
                calc_sales_units: calc_sales,
                info_sales_units: info_sales,
            });
        }

        next.carried_physical = non_negative(availability.physical_units - consumed_week);
        next.closed_sales_to_date += consumed_week;
        if ctx.status.is_open() {
            next.assigned_so_far += assigned_week;
        }

        debug!(
            week_index = week_index,
            status = %ctx.status,
            physical = availability.physical_units,
            measured = availability.measured,
            remaining_pool = remaining_pool,
            share = share,
            theoretical = theoretical,
            weekly_total = weekly_total,
            assigned = assigned_week,
            consumed = consumed_week,
            "周分配完成"
        );

        WeekOutcome {
            state: next,
            rows,
            warning,
        }
    }

    // ==========================================
    // 辅助方法
    // ==========================================

    /// 渠道分配取整
    ///
    /// 先按渠道余额截断再取整 (恰为 .5 时取偶数)；若取整后超过余额 (余额为小数时),
    /// 退回到余额向下取整,保证分配量不超过分配前余额
    pub fn assign_units(raw: f64, balance: f64) -> f64 {
        let balance = non_negative(balance);
        let rounded = non_negative(raw).min(balance).round_ties_even();
        if rounded > balance {
            balance.floor()
        } else {
            rounded
        }
    }
}

impl Default for SequentialAllocationEngine {
    fn default() -> Self {
        Self::new()
    }
}
