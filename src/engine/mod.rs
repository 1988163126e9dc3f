// ==========================================
// 工序报工配额系统 - 引擎层
// ==========================================
// 职责: 配额计算、报工校验、台账、超产事件与升级调度
// 红线: Engine 不做 I/O, 不拼 SQL
// ==========================================

pub mod clock;
pub mod error;
pub mod escalation;
pub mod event_store;
pub mod ledger;
pub mod quota;
pub mod summary;
pub mod validator;

// 重导出核心引擎
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{EngineError, EngineResult};
pub use escalation::{EscalationNotice, EscalationScheduler, NoticeKind};
pub use event_store::{EventStore, ResolveOutcome};
pub use ledger::{LedgerSnapshot, OperationLedger};
pub use quota::{Quota, QuotaResolver};
pub use summary::{operation_board, order_summary, OperationStatusRow, OrderSummary};
pub use validator::{ReportDecision, ReportValidator};
