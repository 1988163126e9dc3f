// ==========================================
// 工序报工配额系统 - API 层
// ==========================================
// 职责: 提供报工业务接口，供界面层/后台任务调用
// 状态: 由 ProductionApi 显式持有，不使用进程级全局状态
// ==========================================

pub mod error;
pub mod production_api;

// 重导出核心类型
pub use error::{ApiError, ApiResult};
pub use production_api::{ProductionApi, ReportOutcome, ReportReceipt, ReportRequest};
