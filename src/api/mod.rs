// ==========================================
// 库存分配系统 - API 层
// ==========================================
// 职责: 对外业务接口,参数校验 + 组装下层
// ==========================================

pub mod allocation_api;
pub mod error;

pub use allocation_api::AllocationApi;
pub use error::{ApiError, ApiResult};
