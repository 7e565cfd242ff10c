// ==========================================
// AllocationOrchestrator 测试
// ==========================================
// 测试目标: 并行计算与顺序计算结果一致,输出按 SKU 排序,对账告警合并
// ==========================================

mod helpers;

use helpers::mock_config::MockConfig;
use inventory_distribution::config::AllocationConfigReader;
use inventory_distribution::domain::allocation::AllocationWarning;
use inventory_distribution::domain::inventory::{PhysicalSnapshot, SkuAllocationInput};
use inventory_distribution::engine::{AllocationOrchestrator, ReconciliationPolicy};
use std::sync::Arc;
use test_helpers::{four_week_calendar, week_start};

fn sample_inputs() -> Vec<SkuAllocationInput> {
    (0..12)
        .rev()
        .map(|i| {
            let base = 100.0 + 10.0 * i as f64;
            SkuAllocationInput::new(format!("SKU-{:03}", i))
                .with_channel("RETAIL", base * 2.0)
                .with_channel("ONLINE", base)
                .with_snapshot(1, PhysicalSnapshot::measured(base, 5.0, 2.0))
                .with_sales("RETAIL", 1, base / 4.0)
                .with_sales("ONLINE", 1, base / 10.0)
        })
        .collect()
}

#[tokio::test]
async fn test_parallel_run_matches_sequential_run() {
    let orchestrator = AllocationOrchestrator::new(ReconciliationPolicy::default(), 3);
    let calendar = four_week_calendar();
    let today = week_start(2);
    let inputs = sample_inputs();

    let sequential = orchestrator.run_month_sync(&inputs, &calendar, today);
    let parallel = orchestrator
        .run_month(inputs, Arc::new(calendar), today)
        .await
        .unwrap();

    assert_eq!(sequential, parallel);
    assert_eq!(parallel.plans.len(), 12);

    let skus: Vec<&str> = parallel.plans.iter().map(|p| p.sku.as_str()).collect();
    let mut sorted = skus.clone();
    sorted.sort();
    assert_eq!(skus, sorted);
}

#[tokio::test]
async fn test_report_merges_reconciliation_warnings() {
    let orchestrator = AllocationOrchestrator::new(ReconciliationPolicy::default(), 2);
    let inputs = vec![
        SkuAllocationInput::new("SKU-B")
            .with_channel("A", 600.0)
            .with_channel("B", 400.0),
        SkuAllocationInput::new("SKU-A")
            .with_channel("A", 600.0)
            .with_channel("B", 400.0)
            .with_snapshot(1, PhysicalSnapshot::measured(10_000.0, 0.0, 0.0))
            .with_sales("A", 3, 100.0)
            .with_sales("B", 3, 50.0),
    ];

    let report = orchestrator
        .run_month(inputs, Arc::new(four_week_calendar()), week_start(4))
        .await
        .unwrap();

    assert_eq!(report.plans[0].sku, "SKU-A");
    assert!(!report.warnings.is_empty());
    assert!(report.warnings.iter().all(|w| w.sku() == "SKU-A"));
    assert!(report
        .warnings
        .iter()
        .any(|w| matches!(w, AllocationWarning::SkuQuotaMismatch { .. })));
}

#[tokio::test]
async fn test_zero_workers_still_runs() {
    let orchestrator = AllocationOrchestrator::new(ReconciliationPolicy::default(), 0);
    assert_eq!(orchestrator.max_workers(), 1);

    let report = orchestrator
        .run_month(sample_inputs(), Arc::new(four_week_calendar()), week_start(1))
        .await
        .unwrap();
    assert_eq!(report.plans.len(), 12);
    assert_eq!(report.rows().count(), 12 * 2 * 4);
}

#[tokio::test]
async fn test_from_config_reads_policy_and_workers() {
    let config = MockConfig::new(four_week_calendar()).strict();
    let orchestrator = AllocationOrchestrator::from_config(&config).await.unwrap();
    assert_eq!(orchestrator.max_workers(), 2);

    let calendar = config
        .get_month_calendar(test_helpers::MONTH_KEY)
        .await
        .unwrap();
    assert!(config.get_month_calendar("2030-01").await.is_err());

    // 零容差下,B 多分配的 10 件触发告警
    let input = SkuAllocationInput::new("SKU-001")
        .with_channel("A", 240.0)
        .with_channel("B", 160.0)
        .with_snapshot(1, PhysicalSnapshot::measured(50.0, 0.0, 0.0))
        .with_sales("A", 1, 30.0)
        .with_sales("B", 1, 10.0);
    let report = orchestrator
        .run_month(vec![input], Arc::new(calendar), week_start(2))
        .await
        .unwrap();
    assert!(report.warnings.iter().any(|w| matches!(
        w,
        AllocationWarning::ChannelQuotaMismatch { channel, .. } if channel == "B"
    )));
}

#[tokio::test]
async fn test_empty_input_yields_empty_report() {
    let orchestrator = AllocationOrchestrator::default();
    let report = orchestrator
        .run_month(Vec::new(), Arc::new(four_week_calendar()), week_start(1))
        .await
        .unwrap();
    assert!(report.plans.is_empty());
    assert!(report.warnings.is_empty());
    assert_eq!(report.month_key, test_helpers::MONTH_KEY);
}
