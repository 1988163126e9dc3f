// ==========================================
// 工序报工配额系统 - 生产订单领域模型
// ==========================================
// 来源: ERP/BOM 外部只读数据，核心不拥有其生命周期
// ==========================================

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

// ==========================================
// Operation - 工序
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    pub code: String,     // 工序代码（订单内唯一）
    pub name: String,     // 工序名称
    pub planned_qty: u64, // ERP 计划数量
}

impl Operation {
    pub fn new(code: impl Into<String>, name: impl Into<String>, planned_qty: u64) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            planned_qty,
        }
    }
}

// ==========================================
// Order - 生产订单
// ==========================================
// 工序按加工顺序排列
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub title: String,
    pub operations: Vec<Operation>,
}

impl Order {
    pub fn new(id: impl Into<String>, title: impl Into<String>, operations: Vec<Operation>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            operations,
        }
    }

    /// 工序在订单中的位置
    pub fn position(&self, operation_code: &str) -> Option<usize> {
        self.operations.iter().position(|op| op.code == operation_code)
    }

    pub fn operation(&self, operation_code: &str) -> Option<&Operation> {
        self.operations.iter().find(|op| op.code == operation_code)
    }

    /// 紧前工序（首道工序返回 None）
    pub fn predecessor(&self, operation_code: &str) -> Option<&Operation> {
        match self.position(operation_code) {
            Some(idx) if idx > 0 => self.operations.get(idx - 1),
            _ => None,
        }
    }

    pub fn is_first(&self, operation_code: &str) -> bool {
        self.position(operation_code) == Some(0)
    }

    pub fn last_operation(&self) -> Option<&Operation> {
        self.operations.last()
    }

    /// 校验工序代码唯一性，返回第一个重复的代码
    pub fn find_duplicate_code(&self) -> Option<&str> {
        let mut seen = HashSet::new();
        self.operations
            .iter()
            .find(|op| !seen.insert(op.code.as_str()))
            .map(|op| op.code.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_order() -> Order {
        Order::new(
            "VIGA001",
            "VIGA001 - 车身横梁",
            vec![
                Operation::new("10", "下料", 10),
                Operation::new("20", "焊接", 10),
                Operation::new("30", "喷涂", 10),
            ],
        )
    }

    #[test]
    fn test_predecessor_lookup() {
        let order = sample_order();
        assert!(order.predecessor("10").is_none());
        assert_eq!(order.predecessor("30").map(|op| op.code.as_str()), Some("20"));
        assert!(order.predecessor("99").is_none());
        assert!(order.is_first("10"));
        assert!(!order.is_first("20"));
    }

    #[test]
    fn test_find_duplicate_code() {
        let mut order = sample_order();
        assert!(order.find_duplicate_code().is_none());
        order.operations.push(Operation::new("20", "返修", 5));
        assert_eq!(order.find_duplicate_code(), Some("20"));
    }
}
