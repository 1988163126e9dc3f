// ==========================================
// 工序报工配额系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 通过不透明键值存储持久化台账与超产事件
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod error;
pub mod event_repo;
pub mod kv_store;
pub mod ledger_repo;

// 重导出核心仓储
pub use error::{RepositoryError, RepositoryResult};
pub use event_repo::{EventRepository, EVENT_PREFIX};
pub use kv_store::{KvStore, SqliteKvStore};
pub use ledger_repo::{LedgerRepository, LEDGER_PREFIX};
