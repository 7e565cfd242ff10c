// ==========================================
// 库存分配系统 - 引擎层
// ==========================================
// 职责: 实现分配规则,不拼 SQL
// 红线: Engine 不拼 SQL, 所有跳过/偏差必须输出告警
// ==========================================

pub mod allocation;
pub mod availability;
pub mod consolidation;
pub mod orchestrator;
pub mod reconciliation;

// 重导出核心引擎
pub use allocation::{AllocationState, SequentialAllocationEngine, WeekContext, WeekOutcome};
pub use availability::{PhysicalAvailabilityResolver, ResolvedAvailability};
pub use consolidation::ConsolidatedViewBuilder;
pub use orchestrator::{AllocationOrchestrator, OrchestratorError};
pub use reconciliation::{ReconciliationPolicy, ReconciliationValidator};
