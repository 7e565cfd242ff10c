// ==========================================
// SequentialAllocationEngine 集成测试
// ==========================================
// 测试目标: 验证周度顺序分配规则
// 覆盖范围: 未结束周理论分配、已结束周实物约束、余额耗尽、
//          单渠道主导、季节性系数、非法输入防护、结果确定性
// ==========================================


use chrono::Duration;
use inventory_distribution::domain::allocation::{AllocationWarning, MonthlyAllocationPlan};
use inventory_distribution::domain::calendar::{MonthCalendar, SeasonalityTable};
use inventory_distribution::domain::inventory::{PhysicalSnapshot, SkuAllocationInput};
use inventory_distribution::domain::types::WeekStatus;
use inventory_distribution::engine::{ReconciliationValidator, SequentialAllocationEngine};
use test_helpers::{four_week_calendar, week, week_start, MONTH_KEY};

// ==========================================
// 测试辅助函数
// ==========================================

fn assigned(plan: &MonthlyAllocationPlan, channel: &str, week_index: u32) -> f64 {
    plan.row(channel, week_index)
        .unwrap_or_else(|| panic!("缺少明细行: {} 第{}周", channel, week_index))
        .assigned_units
}

fn two_channel_input(a: f64, b: f64) -> SkuAllocationInput {
    SkuAllocationInput::new("SKU-001")
        .with_description("测试商品")
        .with_channel("A", a)
        .with_channel("B", b)
}

// ==========================================
// 测试用例
// ==========================================

#[test]
fn test_all_open_weeks_split_quota_evenly() {
    let engine = SequentialAllocationEngine::new();
    let input = two_channel_input(600.0, 400.0)
        .with_sales("A", 3, 40.0)
        .with_sales("B", 4, 25.0);
    let today = week_start(1);

    let plan = engine.allocate(&input, &four_week_calendar(), today);

    assert_eq!(plan.rows.len(), 8);
    for w in 1..=4 {
        assert_eq!(assigned(&plan, "A", w), 150.0);
        assert_eq!(assigned(&plan, "B", w), 100.0);
        assert_eq!(plan.row("A", w).unwrap().week_status, WeekStatus::Open);
    }

    // 未结束周的销量只展示,不扣余额
    let a3 = plan.row("A", 3).unwrap();
    assert_eq!(a3.info_sales_units, 40.0);
    assert_eq!(a3.calc_sales_units, 0.0);
    assert_eq!(a3.balance_after_units, 600.0);
    assert_eq!(plan.total_calc_sales(), 0.0);

    let totals = plan.assigned_by_channel();
    assert_eq!(totals["A"], 600.0);
    assert_eq!(totals["B"], 400.0);
    assert!(plan.warnings.is_empty());
}

#[test]
fn test_closed_week_is_bounded_by_measured_stock() {
    let engine = SequentialAllocationEngine::new();
    let input = two_channel_input(240.0, 160.0)
        .with_snapshot(1, PhysicalSnapshot::measured(50.0, 0.0, 0.0))
        .with_sales("A", 1, 30.0)
        .with_sales("B", 1, 10.0);
    let today = week_start(2);

    let plan = engine.allocate(&input, &four_week_calendar(), today);

    // 第1周: 已结束,实物 50 限制总量
    let a1 = plan.row("A", 1).unwrap();
    assert_eq!(a1.week_status, WeekStatus::Closed);
    assert_eq!(a1.physical_units, 50.0);
    assert_eq!(a1.weekly_total_units, 50.0);
    assert_eq!(assigned(&plan, "A", 1), 30.0);
    assert_eq!(assigned(&plan, "B", 1), 20.0);
    assert_eq!(a1.balance_after_units, 210.0);
    assert_eq!(plan.row("B", 1).unwrap().balance_after_units, 150.0);

    // 第2周: 剩余池 360 的 1/3,结转实物 50 - 40 = 10
    let a2 = plan.row("A", 2).unwrap();
    assert_eq!(a2.week_status, WeekStatus::Open);
    assert_eq!(a2.physical_units, 10.0);
    assert!((a2.weekly_total_units - 120.0).abs() < 1e-9);
    assert_eq!(assigned(&plan, "A", 2), 70.0);
    assert_eq!(assigned(&plan, "B", 2), 50.0);

    for w in 3..=4 {
        assert_eq!(assigned(&plan, "A", w), 70.0);
        assert_eq!(assigned(&plan, "B", w), 50.0);
    }

    let totals = plan.assigned_by_channel();
    assert_eq!(totals["A"], 240.0);
    assert_eq!(totals["B"], 170.0);

    // B 超出 10 件,仍在最小容差内
    let warnings = ReconciliationValidator::default().validate(&plan);
    assert!(warnings.is_empty(), "unexpected warnings: {:?}", warnings);
}

#[test]
fn test_single_channel_dominance_after_balance_consumed() {
    let engine = SequentialAllocationEngine::new();
    let input = two_channel_input(100.0, 300.0)
        .with_snapshot(1, PhysicalSnapshot::measured(1000.0, 0.0, 0.0))
        .with_sales("A", 1, 50.0)
        .with_sales("A", 2, 60.0);
    let today = week_start(3);

    let plan = engine.allocate(&input, &four_week_calendar(), today);

    assert_eq!(assigned(&plan, "A", 1), 25.0);
    assert_eq!(assigned(&plan, "B", 1), 75.0);
    assert_eq!(assigned(&plan, "A", 2), 17.0);
    assert_eq!(assigned(&plan, "B", 2), 100.0);

    // 销量 60 超过余额 50,余额归零而非负数
    assert_eq!(plan.row("A", 2).unwrap().balance_after_units, 0.0);

    for w in 3..=4 {
        assert_eq!(assigned(&plan, "A", w), 0.0);
        assert_eq!(assigned(&plan, "B", w), 145.0);
    }
}

#[test]
fn test_exhausted_balance_emits_warning_per_week() {
    let engine = SequentialAllocationEngine::new();
    let input = SkuAllocationInput::new("SKU-010")
        .with_channel("A", 10.0)
        .with_snapshot(1, PhysicalSnapshot::measured(100.0, 0.0, 0.0))
        .with_sales("A", 1, 10.0);
    let today = week_start(3);

    let plan = engine.allocate(&input, &four_week_calendar(), today);

    // 理论量 2.5 取偶为 2
    assert_eq!(assigned(&plan, "A", 1), 2.0);
    for w in 2..=4 {
        assert_eq!(assigned(&plan, "A", w), 0.0);
    }

    let exhausted_weeks: Vec<u32> = plan
        .warnings
        .iter()
        .filter_map(|w| match w {
            AllocationWarning::NoBalanceRemaining { week_index, .. } => Some(*week_index),
            _ => None,
        })
        .collect();
    assert_eq!(exhausted_weeks, vec![2, 3, 4]);

    // 实物结转照常进行
    assert_eq!(plan.row("A", 2).unwrap().physical_units, 90.0);
}

#[test]
fn test_closed_weeks_without_sales_overshoot_quota() {
    let engine = SequentialAllocationEngine::new();
    let input = two_channel_input(600.0, 400.0)
        .with_snapshot(1, PhysicalSnapshot::measured(10_000.0, 0.0, 0.0))
        .with_sales("A", 3, 100.0)
        .with_sales("B", 3, 50.0);
    let today = week_start(4);

    let plan = engine.allocate(&input, &four_week_calendar(), today);
    let totals = plan.assigned_by_channel();
    assert_eq!(totals["A"], 1150.0);
    assert_eq!(totals["B"], 783.0);

    let warnings = ReconciliationValidator::default().validate(&plan);
    assert!(warnings
        .iter()
        .any(|w| matches!(w, AllocationWarning::ChannelQuotaMismatch { channel, .. } if channel == "A")));
    assert!(warnings
        .iter()
        .any(|w| matches!(w, AllocationWarning::SkuQuotaMismatch { .. })));
}

#[test]
fn test_half_unit_ties_round_to_even_across_weeks() {
    let engine = SequentialAllocationEngine::new();
    let input = SkuAllocationInput::new("SKU-050").with_channel("A", 10.0);

    let plan = engine.allocate(&input, &four_week_calendar(), week_start(1));

    // 2.5 → 2, 8/3 → 3, 2.5 → 2, 3 → 3
    let weekly: Vec<f64> = plan.rows_for_channel("A").map(|r| r.assigned_units).collect();
    assert_eq!(weekly, vec![2.0, 3.0, 2.0, 3.0]);
    assert_eq!(plan.total_assigned(), 10.0);
}

#[test]
fn test_rows_carry_week_label() {
    let engine = SequentialAllocationEngine::new();
    let mut calendar = four_week_calendar();
    calendar.weeks[0].label = Some("10".to_string());

    let plan = engine.allocate(&two_channel_input(600.0, 400.0), &calendar, week_start(1));

    assert_eq!(plan.row("A", 1).unwrap().week_label, "10");
    assert_eq!(plan.row("B", 1).unwrap().week_label, "10");
    // 未配置标签时按序号生成
    assert_eq!(plan.row("A", 2).unwrap().week_label, "W2");
}

#[test]
fn test_seasonality_weights_remaining_pool() {
    let engine = SequentialAllocationEngine::new();
    let weeks = vec![week(1), week(2)];
    let mut seasonality = SeasonalityTable::default();
    seasonality.set(1, 1.0);
    seasonality.set(2, 3.0);
    let calendar = MonthCalendar::new(MONTH_KEY, weeks, seasonality);
    let input = SkuAllocationInput::new("SKU-020").with_channel("A", 400.0);

    let plan = engine.allocate(&input, &calendar, week_start(1));

    assert_eq!(assigned(&plan, "A", 1), 100.0);
    assert_eq!(assigned(&plan, "A", 2), 300.0);
}

#[test]
fn test_invalid_factor_and_quota_are_neutralised() {
    let engine = SequentialAllocationEngine::new();
    let mut seasonality = SeasonalityTable::uniform(1..=4, 1.0);
    seasonality.set(2, f64::NAN);
    let calendar = MonthCalendar::new(MONTH_KEY, (1..=4).map(week).collect(), seasonality);

    let input = two_channel_input(600.0, 400.0)
        .with_channel("C", f64::NAN)
        .with_channel("D", -5.0)
        .with_sales("C", 1, 99.0);

    let plan = engine.allocate(&input, &calendar, week_start(1));

    // 非法配额渠道不出现在结果中
    assert!(plan.rows.iter().all(|r| r.channel == "A" || r.channel == "B"));
    for row in &plan.rows {
        assert!(row.assigned_units.is_finite());
        assert!(row.weekly_total_units.is_finite());
    }
    // NaN 系数按 1 处理
    assert_eq!(assigned(&plan, "A", 2), 150.0);
    assert_eq!(assigned(&plan, "B", 2), 100.0);
}

#[test]
fn test_rows_respect_capacity_and_monotonic_balance() {
    let engine = SequentialAllocationEngine::new();
    let input = SkuAllocationInput::new("SKU-030")
        .with_channel("A", 333.3)
        .with_channel("B", 77.7)
        .with_channel("C", 12.4)
        .with_snapshot(1, PhysicalSnapshot::measured(120.0, 15.0, 5.0))
        .with_snapshot(3, PhysicalSnapshot::projected(40.0, 10.0))
        .with_sales("A", 1, 80.0)
        .with_sales("B", 2, 30.0)
        .with_sales("C", 2, 20.0)
        .with_sales("A", 4, 10.0);
    let today = week_start(3) + Duration::days(2);

    let plan = engine.allocate(&input, &four_week_calendar(), today);

    for row in &plan.rows {
        assert!(row.assigned_units >= 0.0);
        assert_eq!(row.assigned_units, row.assigned_units.round());
        assert!(
            row.assigned_units <= row.balance_before_units,
            "{} 第{}周 分配 {} 超过余额 {}",
            row.channel,
            row.week_index,
            row.assigned_units,
            row.balance_before_units
        );
        assert!(row.balance_after_units >= 0.0);
        assert!(row.balance_after_units <= row.balance_before_units);
        assert!(row.physical_units >= 0.0);
    }

    for channel in ["A", "B", "C"] {
        let balances: Vec<f64> = plan
            .rows_for_channel(channel)
            .map(|r| r.balance_before_units)
            .collect();
        assert!(balances.windows(2).all(|w| w[1] <= w[0]));
    }

    // 第3周含当日,未结束
    assert_eq!(plan.row("A", 3).unwrap().week_status, WeekStatus::Open);
    assert_eq!(plan.row("A", 2).unwrap().week_status, WeekStatus::Closed);
}

#[test]
fn test_allocation_is_deterministic() {
    let engine = SequentialAllocationEngine::new();
    let input = two_channel_input(240.0, 160.0)
        .with_snapshot(1, PhysicalSnapshot::measured(50.0, 0.0, 0.0))
        .with_sales("A", 1, 30.0)
        .with_sales("B", 1, 10.0);
    let calendar = four_week_calendar();
    let today = week_start(2);

    let first = serde_json::to_string(&engine.allocate(&input, &calendar, today)).unwrap();
    let second = serde_json::to_string(&engine.allocate(&input, &calendar, today)).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_sku_without_positive_quota_yields_empty_plan() {
    let engine = SequentialAllocationEngine::new();
    let input = SkuAllocationInput::new("SKU-040").with_channel("A", 0.0);

    let plan = engine.allocate(&input, &four_week_calendar(), week_start(1));
    assert!(plan.rows.is_empty());
    assert!(ReconciliationValidator::default().validate(&plan).is_empty());
}
