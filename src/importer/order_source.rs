// ==========================================
// 工序报工配额系统 - 订单来源
// ==========================================
// 订单/工序清单是外部只读参考数据（BOM/ERP），核心不拥有
// ==========================================

use std::collections::HashMap;

use crate::domain::order::Order;
use crate::importer::error::{ImportError, ImportResult};

/// 只读订单来源
pub trait OrderSource: Send + Sync {
    fn find_order(&self, order_id: &str) -> Option<Order>;

    /// 按导入顺序列出
    fn list_orders(&self) -> Vec<Order>;
}

// ==========================================
// StaticOrderSource - 内存订单表
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct StaticOrderSource {
    orders: Vec<Order>,
    index: HashMap<String, usize>,
}

impl StaticOrderSource {
    /// 构建订单表，拒绝空工序与重复工序编码
    pub fn new(orders: Vec<Order>) -> ImportResult<Self> {
        let mut index = HashMap::with_capacity(orders.len());
        for (pos, order) in orders.iter().enumerate() {
            if order.operations.is_empty() {
                return Err(ImportError::EmptyOrder(order.id.clone()));
            }
            if let Some(code) = order.find_duplicate_code() {
                return Err(ImportError::DuplicateOperation {
                    order_id: order.id.clone(),
                    operation_code: code.to_string(),
                });
            }
            // 同一订单号出现多次时以后者为准
            index.insert(order.id.clone(), pos);
        }
        Ok(Self { orders, index })
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

impl OrderSource for StaticOrderSource {
    fn find_order(&self, order_id: &str) -> Option<Order> {
        self.index.get(order_id).map(|&pos| self.orders[pos].clone())
    }

    fn list_orders(&self) -> Vec<Order> {
        self.orders
            .iter()
            .enumerate()
            .filter(|(pos, order)| self.index.get(&order.id) == Some(pos))
            .map(|(_, order)| order.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::Operation;

    #[test]
    fn test_find_and_list() {
        let source = StaticOrderSource::new(vec![
            Order::new("VIGA001", "Viga A", vec![Operation::new("10", "Corte", 10)]),
            Order::new("VIGA002", "Viga B", vec![Operation::new("10", "Corte", 4)]),
        ])
        .unwrap();

        assert_eq!(source.len(), 2);
        assert_eq!(source.find_order("VIGA002").unwrap().operations[0].planned_qty, 4);
        assert!(source.find_order("VIGA999").is_none());
        let ids: Vec<_> = source.list_orders().into_iter().map(|o| o.id).collect();
        assert_eq!(ids, vec!["VIGA001", "VIGA002"]);
    }

    #[test]
    fn test_rejects_duplicate_operation_code() {
        let result = StaticOrderSource::new(vec![Order::new(
            "VIGA001",
            "Viga A",
            vec![Operation::new("10", "Corte", 10), Operation::new("10", "Soldadura", 10)],
        )]);
        assert!(matches!(result, Err(ImportError::DuplicateOperation { .. })));
    }

    #[test]
    fn test_rejects_empty_order() {
        let result = StaticOrderSource::new(vec![Order::new("VIGA001", "Viga A", vec![])]);
        assert!(matches!(result, Err(ImportError::EmptyOrder(_))));
    }
}
