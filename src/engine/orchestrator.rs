// ==========================================
// 库存分配系统 - 分配编排器
// ==========================================
// 用途: 按 SKU 并行执行顺序分配引擎,合并结果并对账
// 并发: 每个 SKU 一个任务 (spawn_blocking),同时运行数受 max_workers 限制
// 红线: SKU 之间无共享可变状态；合并后按 SKU 排序,保证输出确定
// ==========================================

use crate::config::{AllocationConfigReader, ConfigResult};
use crate::domain::allocation::{MonthlyAllocationPlan, MonthlyAllocationReport};
use crate::domain::calendar::MonthCalendar;
use crate::domain::inventory::SkuAllocationInput;
use crate::engine::allocation::SequentialAllocationEngine;
use crate::engine::reconciliation::{ReconciliationPolicy, ReconciliationValidator};
use chrono::NaiveDate;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{info, instrument};

#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("SKU 计算任务失败: sku={sku}, {message}")]
    WorkerFailed { sku: String, message: String },
}

// ==========================================
// AllocationOrchestrator
// ==========================================
pub struct AllocationOrchestrator {
    engine: Arc<SequentialAllocationEngine>,
    validator: ReconciliationValidator,
    max_workers: usize,
}

impl AllocationOrchestrator {
    /// 创建编排器
    ///
    /// # 参数
    /// - policy: 对账容差
    /// - max_workers: 最大并行 SKU 数 (0 按 1 处理)
    pub fn new(policy: ReconciliationPolicy, max_workers: usize) -> Self {
        Self {
            engine: Arc::new(SequentialAllocationEngine::new()),
            validator: ReconciliationValidator::new(policy),
            max_workers: max_workers.max(1),
        }
    }

    /// 从配置读取器构建
    pub async fn from_config<C>(config: &C) -> ConfigResult<Self>
    where
        C: AllocationConfigReader + ?Sized,
    {
        let policy = config.get_reconciliation_policy().await?;
        let max_workers = config.get_max_workers().await?;
        Ok(Self::new(policy, max_workers))
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// 全月计算（同步,逐 SKU 顺序执行）
    pub fn run_month_sync(
        &self,
        inputs: &[SkuAllocationInput],
        calendar: &MonthCalendar,
        today: NaiveDate,
    ) -> MonthlyAllocationReport {
        let plans = inputs
            .iter()
            .map(|input| self.engine.allocate(input, calendar, today))
            .collect();
        self.finish_report(calendar, today, plans)
    }

    /// 全月计算（并行）
    ///
    /// 每个 SKU 的计算在阻塞线程池中执行,同时运行的任务数不超过 max_workers
    #[instrument(skip(self, inputs, calendar), fields(
        month_key = %calendar.month_key,
        today = %today,
        skus = inputs.len(),
        max_workers = self.max_workers
    ))]
    pub async fn run_month(
        &self,
        inputs: Vec<SkuAllocationInput>,
        calendar: Arc<MonthCalendar>,
        today: NaiveDate,
    ) -> Result<MonthlyAllocationReport, OrchestratorError> {
        let started = Instant::now();

        let results: Vec<Result<MonthlyAllocationPlan, OrchestratorError>> =
            stream::iter(inputs.into_iter().map(|input| {
                let engine = Arc::clone(&self.engine);
                let calendar = Arc::clone(&calendar);
                async move {
                    let sku = input.sku.clone();
                    tokio::task::spawn_blocking(move || engine.allocate(&input, &calendar, today))
                        .await
                        .map_err(|e| OrchestratorError::WorkerFailed {
                            sku,
                            message: e.to_string(),
                        })
                }
            }))
            .buffer_unordered(self.max_workers)
            .collect()
            .await;

        let plans = results.into_iter().collect::<Result<Vec<_>, _>>()?;
        let report = self.finish_report(&calendar, today, plans);

        info!(
            plans = report.plans.len(),
            warnings = report.warnings.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "月度分配计算完成"
        );
        Ok(report)
    }

    /// 合并: 按 SKU 排序,汇总引擎告警与对账告警
    fn finish_report(
        &self,
        calendar: &MonthCalendar,
        today: NaiveDate,
        mut plans: Vec<MonthlyAllocationPlan>,
    ) -> MonthlyAllocationReport {
        plans.sort_by(|a, b| a.sku.cmp(&b.sku));

        let mut warnings = Vec::new();
        for plan in &plans {
            warnings.extend(plan.warnings.iter().cloned());
            warnings.extend(self.validator.validate(plan));
        }

        MonthlyAllocationReport {
            month_key: calendar.month_key.clone(),
            today,
            plans,
            warnings,
        }
    }
}

impl Default for AllocationOrchestrator {
    fn default() -> Self {
        Self::new(
            ReconciliationPolicy::default(),
            crate::config::DEFAULT_MAX_WORKERS,
        )
    }
}
