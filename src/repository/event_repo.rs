// ==========================================
// 工序报工配额系统 - 超产事件仓储
// ==========================================
// 存储: kv_record, key = event/{event_id}
// 值: OverproductionEvent JSON (camelCase)
// ==========================================

use std::sync::Arc;

use crate::domain::event::OverproductionEvent;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::kv_store::KvStore;
use crate::repository::ledger_repo::encode_segment;

pub const EVENT_PREFIX: &str = "event/";

pub struct EventRepository {
    store: Arc<dyn KvStore>,
}

impl EventRepository {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    fn event_key(event_id: &str) -> String {
        format!("{}{}", EVENT_PREFIX, encode_segment(event_id))
    }

    pub fn save(&self, event: &OverproductionEvent) -> RepositoryResult<()> {
        let key = Self::event_key(&event.id);
        let value = serde_json::to_string(event).map_err(|e| RepositoryError::SerializationError {
            key: key.clone(),
            message: e.to_string(),
        })?;
        self.store.put(&key, &value)
    }

    pub fn find(&self, event_id: &str) -> RepositoryResult<Option<OverproductionEvent>> {
        let key = Self::event_key(event_id);
        match self.store.get(&key)? {
            Some(raw) => Ok(Some(decode(&key, &raw)?)),
            None => Ok(None),
        }
    }

    pub fn load_all(&self) -> RepositoryResult<Vec<OverproductionEvent>> {
        self.store
            .list_prefix(EVENT_PREFIX)?
            .iter()
            .map(|(key, raw)| decode(key, raw))
            .collect()
    }

}

fn decode(key: &str, raw: &str) -> RepositoryResult<OverproductionEvent> {
    serde_json::from_str(raw).map_err(|e| RepositoryError::SerializationError {
        key: key.to_string(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::event::OverproductionDetails;
    use crate::repository::kv_store::SqliteKvStore;

    #[test]
    fn test_event_json_uses_camel_case_fields() {
        let kv: Arc<dyn KvStore> = Arc::new(SqliteKvStore::open_in_memory().unwrap());
        let repo = EventRepository::new(kv.clone());
        let event = OverproductionEvent::from_details(
            "e-1".to_string(),
            OverproductionDetails {
                order_id: "VIGA001".to_string(),
                operation_code: "20".to_string(),
                machine_id: "M2".to_string(),
                cap: 10,
                remaining: 2,
                requested_good: 5,
                produced_good: 8,
                produced_scrap: 1,
            },
            42,
        );
        repo.save(&event).unwrap();

        let raw = kv.get("event/e-1").unwrap().unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json["timestampOperator"], 42);
        assert_eq!(json["escalationNotified"], false);
        assert_eq!(json["status"], "PENDING");
        assert_eq!(json["excess"], 3);

        assert_eq!(repo.find("e-1").unwrap(), Some(event));
        assert_eq!(repo.load_all().unwrap().len(), 1);
    }
}
