// ==========================================
// 工序报工配额系统 - 通知层
// ==========================================
// 职责: 升级通知投递（主渠道 + 发件箱备用渠道）
// ==========================================

pub mod error;
pub mod outbox;
pub mod sender;

pub use error::{NotifyError, NotifyResult};
pub use outbox::OutboxFileSender;
pub use sender::{FallbackSender, NotificationSender, TracingSender};
