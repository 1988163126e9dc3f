// ==========================================
// 工序报工配额系统 - 超产事件领域模型
// ==========================================
// 生命周期: 仅在操作员确认超产时创建，PENDING → RESOLVED
// 快照字段创建后不可变；可变字段只能前进（状态、通知标记）
// 销毁: 仅全量重置
// ==========================================

use serde::{Deserialize, Serialize};

use crate::domain::types::{EventStatus, SupervisorReason};

// ==========================================
// OverproductionDetails - 触发事件的报工上下文
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverproductionDetails {
    pub order_id: String,
    pub operation_code: String,
    pub machine_id: String,
    pub cap: u64,
    pub remaining: u64,
    pub requested_good: u64,
    pub produced_good: u64,  // 创建时该工序已报 good
    pub produced_scrap: u64, // 创建时该工序已报 scrap
}

// ==========================================
// OverproductionEvent - 超产事件
// ==========================================
// 时间戳统一为 Unix 毫秒
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverproductionEvent {
    // ===== 标识与状态 =====
    pub id: String,
    pub status: EventStatus,

    // ===== 创建快照（不可变） =====
    pub order_id: String,
    pub operation_code: String,
    pub machine_id: String,
    pub cap: u64,
    pub remaining: u64,
    pub requested_good: u64,
    pub excess: u64,
    pub produced_good: u64,
    pub produced_scrap: u64,
    pub timestamp_operator: i64,

    // ===== 主管处理 =====
    pub timestamp_supervisor: Option<i64>,
    pub supervisor_reason: Option<SupervisorReason>,
    pub response_ms: Option<i64>,

    // ===== 升级通知 =====
    pub escalation_notified: bool,
    pub escalation_notice_timestamp: Option<i64>,
    pub escalation_resolved_notified: bool,
    pub escalation_resolved_timestamp: Option<i64>,
}

impl OverproductionEvent {
    /// 由报工上下文生成新的待处理事件
    pub fn from_details(id: String, details: OverproductionDetails, now_ms: i64) -> Self {
        let excess = details.requested_good.saturating_sub(details.remaining);
        Self {
            id,
            status: EventStatus::Pending,
            order_id: details.order_id,
            operation_code: details.operation_code,
            machine_id: details.machine_id,
            cap: details.cap,
            remaining: details.remaining,
            requested_good: details.requested_good,
            excess,
            produced_good: details.produced_good,
            produced_scrap: details.produced_scrap,
            timestamp_operator: now_ms,
            timestamp_supervisor: None,
            supervisor_reason: None,
            response_ms: None,
            escalation_notified: false,
            escalation_notice_timestamp: None,
            escalation_resolved_notified: false,
            escalation_resolved_timestamp: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == EventStatus::Pending
    }
}
