// ==========================================
// 工序报工配额系统 - 工序报工台账
// ==========================================
// 职责: 按 (订单, 工序) 维护累计 good / scrap
// 口径: good 为毛产出，无条件累加；scrap 从 good 中划出
// 不变式: 任意提交序列后 scrap <= good
// 说明: 不做幂等去重，重复提交按累加处理
// ==========================================

use std::collections::HashMap;

use tracing::debug;

use crate::domain::ledger::LedgerEntry;
use crate::engine::error::{EngineError, EngineResult};

type LedgerKey = (String, String);

fn key(order_id: &str, operation_code: &str) -> LedgerKey {
    (order_id.to_string(), operation_code.to_string())
}

// ==========================================
// LedgerSnapshot - 单个订单的台账只读快照
// ==========================================
// 在锁外供配额计算使用
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerSnapshot {
    pub order_id: String,
    entries: HashMap<String, LedgerEntry>,
}

impl LedgerSnapshot {
    pub fn from_entries(order_id: impl Into<String>, entries: Vec<LedgerEntry>) -> Self {
        let order_id = order_id.into();
        let entries = entries
            .into_iter()
            .filter(|e| e.order_id == order_id)
            .map(|e| (e.operation_code.clone(), e))
            .collect();
        Self { order_id, entries }
    }

    pub fn entry(&self, operation_code: &str) -> LedgerEntry {
        self.entries
            .get(operation_code)
            .cloned()
            .unwrap_or_else(|| LedgerEntry::empty(self.order_id.clone(), operation_code))
    }

    pub fn good(&self, operation_code: &str) -> u64 {
        self.entries.get(operation_code).map_or(0, |e| e.good)
    }

    pub fn scrap(&self, operation_code: &str) -> u64 {
        self.entries.get(operation_code).map_or(0, |e| e.scrap)
    }

    pub fn final_good(&self, operation_code: &str) -> u64 {
        self.entries.get(operation_code).map_or(0, LedgerEntry::final_good)
    }
}

// ==========================================
// OperationLedger - 报工台账
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct OperationLedger {
    entries: HashMap<LedgerKey, LedgerEntry>,
}

impl OperationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从持久化记录恢复台账
    pub fn from_entries(entries: impl IntoIterator<Item = LedgerEntry>) -> Self {
        let entries = entries
            .into_iter()
            .map(|e| (key(&e.order_id, &e.operation_code), e))
            .collect();
        Self { entries }
    }

    pub fn entry(&self, order_id: &str, operation_code: &str) -> LedgerEntry {
        self.entries
            .get(&key(order_id, operation_code))
            .cloned()
            .unwrap_or_else(|| LedgerEntry::empty(order_id, operation_code))
    }

    pub fn final_good(&self, order_id: &str, operation_code: &str) -> u64 {
        self.entries
            .get(&key(order_id, operation_code))
            .map_or(0, LedgerEntry::final_good)
    }

    /// 提交良品（无条件累加）
    pub fn commit_good(
        &mut self,
        order_id: &str,
        operation_code: &str,
        delta: u64,
    ) -> EngineResult<LedgerEntry> {
        if delta == 0 {
            return Err(EngineError::InvalidDelta("良品增量必须大于0".to_string()));
        }

        let entry = self
            .entries
            .entry(key(order_id, operation_code))
            .or_insert_with(|| LedgerEntry::empty(order_id, operation_code));
        entry.good = entry
            .good
            .checked_add(delta)
            .ok_or_else(|| EngineError::InvalidDelta(format!("良品累计溢出: delta={}", delta)))?;

        debug!(order_id, operation_code, delta, good = entry.good, "台账提交良品");
        Ok(entry.clone())
    }

    /// 提交判废
    ///
    /// 实际入账 = min(delta, good - scrap)，超出部分静默截断
    /// 调用方须先经 ReportValidator 校验可用量，截断不作为用户提示手段
    ///
    /// 返回: (更新后的条目, 实际入账数量)
    pub fn commit_scrap(
        &mut self,
        order_id: &str,
        operation_code: &str,
        delta: u64,
    ) -> EngineResult<(LedgerEntry, u64)> {
        if delta == 0 {
            return Err(EngineError::InvalidDelta("判废增量必须大于0".to_string()));
        }

        let entry = self
            .entries
            .entry(key(order_id, operation_code))
            .or_insert_with(|| LedgerEntry::empty(order_id, operation_code));
        let applied = delta.min(entry.final_good());
        entry.scrap += applied;

        debug!(
            order_id,
            operation_code,
            requested = delta,
            applied,
            scrap = entry.scrap,
            "台账提交判废"
        );
        Ok((entry.clone(), applied))
    }

    /// 覆盖单个条目（持久化失败时回滚使用）
    pub fn restore(&mut self, entry: LedgerEntry) {
        self.entries
            .insert(key(&entry.order_id, &entry.operation_code), entry);
    }

    /// 订单快照
    pub fn snapshot(&self, order_id: &str) -> LedgerSnapshot {
        LedgerSnapshot::from_entries(
            order_id,
            self.entries
                .values()
                .filter(|e| e.order_id == order_id)
                .cloned()
                .collect(),
        )
    }

    /// 清除单个订单的台账，返回被清除的条目
    pub fn remove_order(&mut self, order_id: &str) -> Vec<LedgerEntry> {
        let keys: Vec<LedgerKey> = self
            .entries
            .keys()
            .filter(|(o, _)| o == order_id)
            .cloned()
            .collect();
        keys.into_iter()
            .filter_map(|k| self.entries.remove(&k))
            .collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn entries(&self) -> impl Iterator<Item = &LedgerEntry> {
        self.entries.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commit_good_accumulates() {
        let mut ledger = OperationLedger::new();
        ledger.commit_good("OP1", "10", 4).unwrap();
        let entry = ledger.commit_good("OP1", "10", 4).unwrap();
        assert_eq!(entry.good, 8);
        assert_eq!(entry.scrap, 0);
        assert_eq!(ledger.final_good("OP1", "10"), 8);
    }

    #[test]
    fn test_zero_delta_rejected_without_mutation() {
        let mut ledger = OperationLedger::new();
        assert!(matches!(
            ledger.commit_good("OP1", "10", 0),
            Err(EngineError::InvalidDelta(_))
        ));
        assert!(matches!(
            ledger.commit_scrap("OP1", "10", 0),
            Err(EngineError::InvalidDelta(_))
        ));
        assert_eq!(ledger.entries().count(), 0);
    }

    #[test]
    fn test_commit_scrap_caps_at_available() {
        let mut ledger = OperationLedger::new();
        ledger.commit_good("OP1", "10", 10).unwrap();

        let (entry, applied) = ledger.commit_scrap("OP1", "10", 3).unwrap();
        assert_eq!(applied, 3);
        assert_eq!(entry.final_good(), 7);

        let (entry, applied) = ledger.commit_scrap("OP1", "10", 50).unwrap();
        assert_eq!(applied, 7);
        assert_eq!(entry.scrap, 10);
        assert_eq!(entry.final_good(), 0);
    }

    #[test]
    fn test_remove_order_only_touches_that_order() {
        let mut ledger = OperationLedger::new();
        ledger.commit_good("OP1", "10", 1).unwrap();
        ledger.commit_good("OP1", "20", 1).unwrap();
        ledger.commit_good("OP2", "10", 1).unwrap();

        let removed = ledger.remove_order("OP1");
        assert_eq!(removed.len(), 2);
        assert_eq!(ledger.entry("OP2", "10").good, 1);
        assert_eq!(ledger.entry("OP1", "10").good, 0);
    }

    #[derive(Debug, Clone, Copy)]
    enum Step {
        Good(u64),
        Scrap(u64),
    }

    // 穷举小字母表上的提交序列，检查 scrap <= good 与单调性
    #[test]
    fn test_scrap_never_exceeds_good_under_any_interleaving() {
        let alphabet = [
            Step::Good(1),
            Step::Good(3),
            Step::Scrap(1),
            Step::Scrap(2),
            Step::Scrap(5),
        ];
        let len = 6;
        let total = alphabet.len().pow(len as u32);

        for mut n in 0..total {
            let mut ledger = OperationLedger::new();
            let mut prev = LedgerEntry::empty("OP", "10");

            for _ in 0..len {
                let step = alphabet[n % alphabet.len()];
                n /= alphabet.len();

                let available = prev.final_good();
                let next = match step {
                    Step::Good(d) => ledger.commit_good("OP", "10", d).unwrap(),
                    Step::Scrap(d) => {
                        let (entry, applied) = ledger.commit_scrap("OP", "10", d).unwrap();
                        assert!(applied <= available);
                        assert!(applied <= d);
                        entry
                    }
                };

                assert!(next.scrap <= next.good, "{:?} after {:?}", next, step);
                assert!(next.good >= prev.good);
                assert!(next.scrap >= prev.scrap);
                assert_eq!(next.final_good(), next.good - next.scrap);
                prev = next;
            }
        }
    }
}
