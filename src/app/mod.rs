// ==========================================
// 工序报工配额系统 - 应用层
// ==========================================
// 职责: 组装各层实例，供可执行入口使用
// ==========================================

pub mod state;

// 重导出
pub use state::{get_default_db_path, outbox_path_for, AppState, DB_PATH_ENV};
