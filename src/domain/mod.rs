// ==========================================
// 工序报工配额系统 - 领域模型层
// ==========================================
// 职责: 定义订单、台账、超产事件等实体与类型
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod event;
pub mod ledger;
pub mod order;
pub mod settings;
pub mod types;

// 重导出核心类型
pub use event::{OverproductionDetails, OverproductionEvent};
pub use ledger::LedgerEntry;
pub use order::{Operation, Order};
pub use settings::{EscalationSettings, ReportingSettings};
pub use types::{EventStatus, PrevQtySource, SequenceMode, SupervisorReason};
