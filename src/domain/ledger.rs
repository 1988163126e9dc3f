// ==========================================
// 工序报工配额系统 - 报工台账条目
// ==========================================
// 口径: good 为累计毛产出（含后续转废部分），只增不减
//       scrap 为 good 中被判废的部分，只增不减，且 scrap <= good
// ==========================================

use serde::{Deserialize, Serialize};

// ==========================================
// LedgerEntry - (订单, 工序) 累计报工
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    pub order_id: String,
    pub operation_code: String,
    pub good: u64,
    pub scrap: u64,
}

impl LedgerEntry {
    pub fn empty(order_id: impl Into<String>, operation_code: impl Into<String>) -> Self {
        Self {
            order_id: order_id.into(),
            operation_code: operation_code.into(),
            good: 0,
            scrap: 0,
        }
    }

    /// 净良品 = good - scrap（下限 0），即流向下道工序的数量
    pub fn final_good(&self) -> u64 {
        self.good.saturating_sub(self.scrap)
    }
}
