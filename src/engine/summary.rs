// ==========================================
// 工序报工配额系统 - 订单看板汇总
// ==========================================
// 职责:
// 1) 工序看板: 每道工序的计划/报工/上限/剩余
// 2) 订单汇总: 计划总数、完成数、判废合计、未完成数
// 口径: 完成数 = 末道工序净良品（不超过计划总数）
// ==========================================

use serde::{Deserialize, Serialize};

use crate::domain::order::Order;
use crate::domain::settings::ReportingSettings;
use crate::domain::types::PrevQtySource;
use crate::engine::error::EngineResult;
use crate::engine::ledger::LedgerSnapshot;
use crate::engine::quota::QuotaResolver;

/// 工序看板行
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationStatusRow {
    pub code: String,
    pub name: String,
    pub planned_qty: u64,
    pub prev_planned_qty: Option<u64>, // 首道工序为 None
    pub good: u64,
    pub scrap: u64,
    pub final_good: u64,
    pub cap: u64,
    pub remaining: u64,
}

/// 订单汇总
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    pub planned_total: u64,
    pub realized: u64,
    pub scrap_total: u64,
    pub pending: u64,
}

/// 生成工序看板
pub fn operation_board(
    order: &Order,
    snapshot: &LedgerSnapshot,
    settings: &ReportingSettings,
) -> EngineResult<Vec<OperationStatusRow>> {
    let resolver = QuotaResolver::new();

    order
        .operations
        .iter()
        .enumerate()
        .map(|(idx, op)| {
            let quota = resolver.compute_quota(order, snapshot, &op.code)?;
            let prev_planned_qty = match (idx, settings.prev_qty_source, settings.manual_prev_qty) {
                (0, _, _) => None,
                (_, PrevQtySource::Manual, Some(manual)) => Some(manual),
                _ => Some(order.operations[idx - 1].planned_qty),
            };
            let entry = snapshot.entry(&op.code);

            Ok(OperationStatusRow {
                code: op.code.clone(),
                name: op.name.clone(),
                planned_qty: op.planned_qty,
                prev_planned_qty,
                good: entry.good,
                scrap: entry.scrap,
                final_good: entry.final_good(),
                cap: quota.cap,
                remaining: quota.remaining,
            })
        })
        .collect()
}

/// 生成订单汇总
pub fn order_summary(order: &Order, snapshot: &LedgerSnapshot) -> OrderSummary {
    let planned_total = order
        .operations
        .iter()
        .map(|op| op.planned_qty)
        .max()
        .unwrap_or(0);
    let realized = order
        .last_operation()
        .map_or(0, |op| snapshot.final_good(&op.code))
        .min(planned_total);
    let scrap_total = order
        .operations
        .iter()
        .map(|op| snapshot.scrap(&op.code))
        .sum();

    OrderSummary {
        planned_total,
        realized,
        scrap_total,
        pending: planned_total.saturating_sub(realized),
    }
}
