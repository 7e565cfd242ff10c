// ==========================================
// 库存分配系统 - 分配 API
// ==========================================
// 职责: 组合配置/仓储/编排器,提供月度分配计算与汇总视图
// 红线: API 层只做参数校验与组装,不实现分配规则
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::config::ConfigManager;
use crate::domain::allocation::MonthlyAllocationReport;
use crate::domain::calendar::MonthCalendar;
use crate::domain::summary::{
    ChannelMetrics, ChannelSummary, ConsolidatedSku, MonthWeekSummary, WeeklySummary,
};
use crate::engine::consolidation::ConsolidatedViewBuilder;
use crate::engine::orchestrator::AllocationOrchestrator;
use crate::export;
use crate::repository::AllocationInputRepository;
use chrono::NaiveDate;
use std::io::Write;
use std::sync::Arc;
use tracing::{info, instrument, warn};

// ==========================================
// AllocationApi
// ==========================================
pub struct AllocationApi {
    config: Arc<ConfigManager>,
    input_repo: Arc<AllocationInputRepository>,
    views: ConsolidatedViewBuilder,
}

impl AllocationApi {
    pub fn new(config: Arc<ConfigManager>, input_repo: Arc<AllocationInputRepository>) -> Self {
        Self {
            config,
            input_repo,
            views: ConsolidatedViewBuilder::new(),
        }
    }

    // ==========================================
    // 日历配置
    // ==========================================

    /// 已配置日历的月份
    pub fn list_months(&self) -> ApiResult<Vec<String>> {
        Ok(self.config.list_month_keys()?)
    }

    pub fn get_month_calendar(&self, month_key: &str) -> ApiResult<MonthCalendar> {
        validate_month_key(month_key)?;
        Ok(self.config.load_month_calendar(month_key)?)
    }

    pub fn save_month_calendar(&self, calendar: &MonthCalendar) -> ApiResult<()> {
        validate_month_key(&calendar.month_key)?;
        calendar
            .validate()
            .map_err(|e| ApiError::InvalidInput(e.to_string()))?;
        Ok(self.config.save_month_calendar(calendar)?)
    }

    // ==========================================
    // 计算
    // ==========================================

    /// 计算一个月份的全部 SKU 分配
    ///
    /// # 参数
    /// - month_key: 月份标识
    /// - today: 参考日期,决定每周 CLOSED/OPEN
    #[instrument(skip(self))]
    pub async fn compute_month(
        &self,
        month_key: &str,
        today: NaiveDate,
    ) -> ApiResult<MonthlyAllocationReport> {
        validate_month_key(month_key)?;

        let calendar = self.config.load_month_calendar(month_key)?;
        let inputs = self.input_repo.load_month_inputs(&calendar)?;
        if inputs.is_empty() {
            warn!(month_key = %month_key, "该月份无有效渠道配额");
        }

        let orchestrator = AllocationOrchestrator::from_config(self.config.as_ref()).await?;
        let report = orchestrator
            .run_month(inputs, Arc::new(calendar), today)
            .await?;

        for warning in &report.warnings {
            warn!(sku = %warning.sku(), "{}", warning);
        }
        info!(
            skus = report.plans.len(),
            rows = report.rows().count(),
            warnings = report.warnings.len(),
            "分配计算结果已生成"
        );
        Ok(report)
    }

    // ==========================================
    // 汇总视图
    // ==========================================

    /// SKU × 周汇总（全部 SKU）
    pub fn weekly_summary(&self, report: &MonthlyAllocationReport) -> Vec<WeeklySummary> {
        report
            .plans
            .iter()
            .flat_map(|plan| self.views.sku_weekly(plan))
            .collect()
    }

    /// 单 SKU 的周汇总
    pub fn sku_weekly_summary(
        &self,
        report: &MonthlyAllocationReport,
        sku: &str,
    ) -> ApiResult<Vec<WeeklySummary>> {
        if sku.trim().is_empty() {
            return Err(ApiError::InvalidInput("SKU不能为空".to_string()));
        }
        let plan = report
            .plan(sku)
            .ok_or_else(|| ApiError::NotFound(format!("SKU {} 无分配结果", sku)))?;
        Ok(self.views.sku_weekly(plan))
    }

    /// 合并视图,可按 SKU 或描述关键字过滤 (不区分大小写)
    pub fn consolidated_view(
        &self,
        report: &MonthlyAllocationReport,
        query: Option<&str>,
    ) -> Vec<ConsolidatedSku> {
        let mut view = self.views.consolidated(&report.plans);
        if let Some(query) = query {
            view.retain(|item| item.matches(query));
        }
        view
    }

    /// 月 × 周汇总
    pub fn month_summary(&self, report: &MonthlyAllocationReport) -> Vec<MonthWeekSummary> {
        self.views.month_weekly(&report.plans)
    }

    /// 渠道汇总
    pub fn channel_summary(&self, report: &MonthlyAllocationReport) -> Vec<ChannelSummary> {
        self.views.channel_summary(&report.plans)
    }

    /// 单渠道月度指标
    pub fn channel_metrics(
        &self,
        report: &MonthlyAllocationReport,
        channel: &str,
    ) -> ApiResult<ChannelMetrics> {
        if channel.trim().is_empty() {
            return Err(ApiError::InvalidInput("渠道不能为空".to_string()));
        }
        Ok(self.views.channel_metrics(&report.plans, channel))
    }

    // ==========================================
    // 导出
    // ==========================================

    /// 导出分配明细 CSV,返回写出行数
    pub fn export_allocations<W: Write>(
        &self,
        report: &MonthlyAllocationReport,
        writer: W,
    ) -> ApiResult<usize> {
        Ok(export::write_allocations_csv(writer, report.rows())?)
    }

    /// 导出周汇总 CSV,返回写出行数
    pub fn export_weekly_summary<W: Write>(
        &self,
        report: &MonthlyAllocationReport,
        writer: W,
    ) -> ApiResult<usize> {
        let rows = self.weekly_summary(report);
        Ok(export::write_weekly_summary_csv(writer, &rows)?)
    }
}

fn validate_month_key(month_key: &str) -> ApiResult<()> {
    if month_key.trim().is_empty() {
        return Err(ApiError::InvalidInput("月份标识不能为空".to_string()));
    }
    Ok(())
}
