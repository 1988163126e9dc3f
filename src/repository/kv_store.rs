// ==========================================
// 工序报工配额系统 - 键值存储
// ==========================================
// 职责: 为台账/事件提供不透明的 key → JSON 文本存储
// 表设计: kv_record(key 主键, value 文本, updated_at)
// 键约定: ledger/{order_id}/{operation_code}, event/{event_id}
// ==========================================

use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension};

use crate::db::{ensure_schema, open_sqlite_connection};
use crate::repository::error::{RepositoryError, RepositoryResult};

/// 键值存储接口
pub trait KvStore: Send + Sync {
    fn get(&self, key: &str) -> RepositoryResult<Option<String>>;

    fn put(&self, key: &str, value: &str) -> RepositoryResult<()>;

    fn delete(&self, key: &str) -> RepositoryResult<bool>;

    /// 按前缀列出，按 key 升序
    fn list_prefix(&self, prefix: &str) -> RepositoryResult<Vec<(String, String)>>;

    /// 按前缀删除，返回删除条数
    fn delete_prefix(&self, prefix: &str) -> RepositoryResult<usize>;

    /// 在同一事务内按多个前缀删除，任一失败则全部不生效
    fn delete_prefixes(&self, prefixes: &[&str]) -> RepositoryResult<usize>;
}

// 转义 LIKE 通配符，前缀按字面匹配
fn like_prefix(prefix: &str) -> String {
    let escaped = prefix
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("{}%", escaped)
}

// ==========================================
// SqliteKvStore - SQLite 实现
// ==========================================
pub struct SqliteKvStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteKvStore {
    /// 基于共享连接创建，并确保表存在
    pub fn new(conn: Arc<Mutex<Connection>>) -> RepositoryResult<Self> {
        let store = Self { conn };
        store.ensure_schema()?;
        Ok(store)
    }

    /// 打开数据库文件
    pub fn open(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;
        Self::new(Arc::new(Mutex::new(conn)))
    }

    /// 内存库（测试使用）
    pub fn open_in_memory() -> RepositoryResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;
        Self::new(Arc::new(Mutex::new(conn)))
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 建表统一走 db::ensure_schema
    pub fn ensure_schema(&self) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        ensure_schema(&conn)?;
        Ok(())
    }
}

impl KvStore for SqliteKvStore {
    fn get(&self, key: &str) -> RepositoryResult<Option<String>> {
        let conn = self.get_conn()?;
        let value = conn
            .query_row(
                "SELECT value FROM kv_record WHERE key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn put(&self, key: &str, value: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO kv_record (key, value, updated_at) VALUES (?1, ?2, datetime('now'))
            ON CONFLICT(key) DO UPDATE SET value = ?2, updated_at = datetime('now')
            "#,
            params![key, value],
        )?;
        Ok(())
    }

    fn delete(&self, key: &str) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let changed = conn.execute("DELETE FROM kv_record WHERE key = ?1", params![key])?;
        Ok(changed > 0)
    }

    fn list_prefix(&self, prefix: &str) -> RepositoryResult<Vec<(String, String)>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT key, value FROM kv_record WHERE key LIKE ?1 ESCAPE '\\' ORDER BY key",
        )?;
        let rows = stmt
            .query_map(params![like_prefix(prefix)], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn delete_prefix(&self, prefix: &str) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let changed = conn.execute(
            "DELETE FROM kv_record WHERE key LIKE ?1 ESCAPE '\\'",
            params![like_prefix(prefix)],
        )?;
        Ok(changed)
    }

    fn delete_prefixes(&self, prefixes: &[&str]) -> RepositoryResult<usize> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        let mut changed = 0;
        for prefix in prefixes {
            changed += tx.execute(
                "DELETE FROM kv_record WHERE key LIKE ?1 ESCAPE '\\'",
                params![like_prefix(prefix)],
            )?;
        }
        tx.commit()?;
        Ok(changed)
    }
}
