// ==========================================
// 库存分配系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================

pub mod allocation_input_repo;
pub mod error;

pub use allocation_input_repo::AllocationInputRepository;
pub use error::{RepositoryError, RepositoryResult};
