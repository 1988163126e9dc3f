// ==========================================
// 工序报工配额系统 - 后台服务
// ==========================================

pub mod escalation_worker;

pub use escalation_worker::{EscalationWorker, ResolveReport, TickReport};
