// ==========================================
// 工序报工配额系统 - 配额计算引擎
// ==========================================
// 职责: 计算工序的允许上限 (cap) 与剩余配额 (remaining)
// 规则:
// - 首道工序: cap = 本工序计划数
// - 其他工序: cap = 紧前工序净良品 (good - scrap, 下限 0)
// - remaining = max(cap - 本工序 good, 0)
//   本工序 scrap 不再扣减 remaining（已作为 good 计过一次）
// 性质: 纯函数，相同快照得到相同结果，可在锁外并发调用
// ==========================================

use serde::{Deserialize, Serialize};

use crate::domain::order::Order;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::ledger::LedgerSnapshot;

/// 配额计算结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quota {
    pub cap: u64,
    pub remaining: u64,
}

// ==========================================
// QuotaResolver - 配额计算引擎
// ==========================================
#[derive(Debug, Clone, Copy, Default)]
pub struct QuotaResolver;

impl QuotaResolver {
    pub fn new() -> Self {
        Self
    }

    /// 计算工序配额
    ///
    /// # 错误
    /// - UnknownOperation: 订单中不存在该工序
    pub fn compute_quota(
        &self,
        order: &Order,
        snapshot: &LedgerSnapshot,
        operation_code: &str,
    ) -> EngineResult<Quota> {
        let idx = order
            .position(operation_code)
            .ok_or_else(|| EngineError::UnknownOperation {
                order_id: order.id.clone(),
                operation_code: operation_code.to_string(),
            })?;

        let cap = match idx {
            0 => order.operations[0].planned_qty,
            _ => snapshot.final_good(&order.operations[idx - 1].code),
        };
        let remaining = cap.saturating_sub(snapshot.good(operation_code));

        Ok(Quota { cap, remaining })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ledger::LedgerEntry;
    use crate::domain::order::Operation;

    fn order() -> Order {
        Order::new(
            "VIGA001",
            "VIGA001",
            vec![
                Operation::new("10", "下料", 10),
                Operation::new("20", "焊接", 10),
                Operation::new("30", "喷涂", 10),
            ],
        )
    }

    fn entry(op: &str, good: u64, scrap: u64) -> LedgerEntry {
        LedgerEntry {
            order_id: "VIGA001".to_string(),
            operation_code: op.to_string(),
            good,
            scrap,
        }
    }

    #[test]
    fn test_first_operation_uses_planned_qty() {
        let resolver = QuotaResolver::new();
        let snapshot = LedgerSnapshot::from_entries("VIGA001", vec![entry("10", 4, 2)]);

        let quota = resolver.compute_quota(&order(), &snapshot, "10").unwrap();
        assert_eq!(quota.cap, 10);
        // 本工序 scrap 不回补 remaining
        assert_eq!(quota.remaining, 6);
    }

    #[test]
    fn test_next_operation_capped_by_predecessor_final_good() {
        let resolver = QuotaResolver::new();
        let snapshot = LedgerSnapshot::from_entries(
            "VIGA001",
            vec![entry("10", 10, 0), entry("20", 3, 1)],
        );

        let quota = resolver.compute_quota(&order(), &snapshot, "20").unwrap();
        assert_eq!(quota, Quota { cap: 10, remaining: 7 });

        // op30 的上限 = op20 净良品 2
        let quota = resolver.compute_quota(&order(), &snapshot, "30").unwrap();
        assert_eq!(quota, Quota { cap: 2, remaining: 2 });
    }

    #[test]
    fn test_scrap_at_predecessor_shrinks_cap() {
        let resolver = QuotaResolver::new();
        let snapshot = LedgerSnapshot::from_entries("VIGA001", vec![entry("10", 10, 3)]);

        let quota = resolver.compute_quota(&order(), &snapshot, "20").unwrap();
        assert_eq!(quota.cap, 7);
        assert_eq!(quota.remaining, 7);
    }

    #[test]
    fn test_remaining_floors_at_zero() {
        let resolver = QuotaResolver::new();
        // op20 已报 8，但 op10 后续判废导致净良品只剩 5
        let snapshot = LedgerSnapshot::from_entries(
            "VIGA001",
            vec![entry("10", 10, 5), entry("20", 8, 0)],
        );

        let quota = resolver.compute_quota(&order(), &snapshot, "20").unwrap();
        assert_eq!(quota, Quota { cap: 5, remaining: 0 });
    }

    #[test]
    fn test_compute_quota_is_pure() {
        let resolver = QuotaResolver::new();
        let snapshot = LedgerSnapshot::from_entries(
            "VIGA001",
            vec![entry("10", 9, 2), entry("20", 4, 0)],
        );
        let first = resolver.compute_quota(&order(), &snapshot, "20").unwrap();
        for _ in 0..10 {
            assert_eq!(resolver.compute_quota(&order(), &snapshot, "20").unwrap(), first);
        }
    }

    #[test]
    fn test_unknown_operation() {
        let resolver = QuotaResolver::new();
        let snapshot = LedgerSnapshot::default();
        assert!(matches!(
            resolver.compute_quota(&order(), &snapshot, "99"),
            Err(EngineError::UnknownOperation { .. })
        ));
    }
}
