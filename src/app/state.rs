// ==========================================
// 工序报工配额系统 - 应用状态
// ==========================================
// 职责: 组装共享连接、配置、订单来源、报工服务与升级任务
// ==========================================

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::api::{ApiResult, ProductionApi};
use crate::config::ConfigManager;
use crate::db::open_sqlite_connection;
use crate::engine::clock::{Clock, SystemClock};
use crate::importer::OrderSource;
use crate::notify::{FallbackSender, NotificationSender, OutboxFileSender, TracingSender};
use crate::repository::{KvStore, RepositoryError, SqliteKvStore};
use crate::services::EscalationWorker;

/// 数据库路径环境变量
pub const DB_PATH_ENV: &str = "SHOPFLOOR_QUOTA_DB";

/// 发件箱文件名（与数据库同目录）
pub const OUTBOX_FILE_NAME: &str = "notify_outbox.jsonl";

/// 应用状态
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 报工服务
    pub production_api: Arc<ProductionApi>,

    /// 升级通知任务
    pub escalation_worker: Arc<EscalationWorker>,

    /// 配置管理器（与报工服务共享）
    pub config: Arc<ConfigManager>,
}

impl AppState {
    /// 创建AppState实例
    ///
    /// 说明：
    /// 1. 打开共享连接并建表
    /// 2. 从存储恢复台账与事件
    /// 3. 通知渠道: 日志为主，发件箱文件为备用
    pub fn new(db_path: String, orders: Arc<dyn OrderSource>) -> ApiResult<Self> {
        Self::with_clock(db_path, orders, Arc::new(SystemClock))
    }

    pub fn with_clock(db_path: String, orders: Arc<dyn OrderSource>, clock: Arc<dyn Clock>) -> ApiResult<Self> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        let conn = open_sqlite_connection(&db_path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(format!("无法打开数据库: {}", e)))?;
        let conn = Arc::new(Mutex::new(conn));

        let config = Arc::new(ConfigManager::from_connection(conn.clone())?);
        let store: Arc<dyn KvStore> = Arc::new(SqliteKvStore::new(conn)?);
        let production_api = Arc::new(ProductionApi::new(store, orders, config.clone(), clock)?);

        let outbox = OutboxFileSender::new(outbox_path_for(&db_path));
        tracing::info!("备用通知发件箱: {}", outbox.path().display());
        let sender: Arc<dyn NotificationSender> =
            Arc::new(FallbackSender::new(Arc::new(TracingSender), Arc::new(outbox)));
        let escalation_worker = Arc::new(EscalationWorker::new(production_api.clone(), sender));

        Ok(Self {
            db_path,
            production_api,
            escalation_worker,
            config,
        })
    }
}

/// 发件箱路径: 与数据库文件同目录
pub fn outbox_path_for(db_path: &str) -> PathBuf {
    Path::new(db_path)
        .parent()
        .map(|dir| dir.join(OUTBOX_FILE_NAME))
        .unwrap_or_else(|| PathBuf::from(OUTBOX_FILE_NAME))
}

/// 获取默认数据库路径
///
/// 优先级: 环境变量 SHOPFLOOR_QUOTA_DB → 用户数据目录 → 当前目录
pub fn get_default_db_path() -> String {
    if let Ok(path) = std::env::var(DB_PATH_ENV) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./shopfloor_quota.db");

    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("shopfloor-quota");
        // 目录创建失败时回落到当前目录
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("shopfloor_quota.db");
        }
    }

    path.to_string_lossy().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_default_db_path() {
        let path = get_default_db_path();
        assert!(!path.is_empty());
        assert!(path.ends_with(".db"));
    }

    #[test]
    fn test_outbox_sits_next_to_database() {
        let path = outbox_path_for("/var/lib/quota/shopfloor.db");
        assert_eq!(path, PathBuf::from("/var/lib/quota").join(OUTBOX_FILE_NAME));
    }
}
