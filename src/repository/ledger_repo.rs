// ==========================================
// 工序报工配额系统 - 报工台账仓储
// ==========================================
// 存储: kv_record, key = ledger/{order_id}/{operation_code}
// 值: LedgerEntry JSON (camelCase)
// ==========================================

use std::sync::Arc;

use crate::domain::ledger::LedgerEntry;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::kv_store::KvStore;

pub const LEDGER_PREFIX: &str = "ledger/";

/// 键片段编码，避免订单号中的 '/' 造成前缀串扰
pub(crate) fn encode_segment(raw: &str) -> String {
    raw.replace('%', "%25").replace('/', "%2F")
}

pub struct LedgerRepository {
    store: Arc<dyn KvStore>,
}

impl LedgerRepository {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    fn order_prefix(order_id: &str) -> String {
        format!("{}{}/", LEDGER_PREFIX, encode_segment(order_id))
    }

    fn entry_key(order_id: &str, operation_code: &str) -> String {
        format!(
            "{}{}",
            Self::order_prefix(order_id),
            encode_segment(operation_code)
        )
    }

    pub fn save(&self, entry: &LedgerEntry) -> RepositoryResult<()> {
        let key = Self::entry_key(&entry.order_id, &entry.operation_code);
        let value = serde_json::to_string(entry).map_err(|e| RepositoryError::SerializationError {
            key: key.clone(),
            message: e.to_string(),
        })?;
        self.store.put(&key, &value)
    }

    pub fn find(&self, order_id: &str, operation_code: &str) -> RepositoryResult<Option<LedgerEntry>> {
        let key = Self::entry_key(order_id, operation_code);
        match self.store.get(&key)? {
            Some(raw) => Ok(Some(decode(&key, &raw)?)),
            None => Ok(None),
        }
    }

    pub fn load_all(&self) -> RepositoryResult<Vec<LedgerEntry>> {
        self.store
            .list_prefix(LEDGER_PREFIX)?
            .iter()
            .map(|(key, raw)| decode(key, raw))
            .collect()
    }

    pub fn delete_order(&self, order_id: &str) -> RepositoryResult<usize> {
        self.store.delete_prefix(&Self::order_prefix(order_id))
    }
}

fn decode(key: &str, raw: &str) -> RepositoryResult<LedgerEntry> {
    serde_json::from_str(raw).map_err(|e| RepositoryError::SerializationError {
        key: key.to_string(),
        message: e.to_string(),
    })
}
