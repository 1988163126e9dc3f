// ==========================================
// 工序报工配额系统 - 超产事件存储
// ==========================================
// 状态机: PENDING → RESOLVED（终态，无其他转换）
// 约束:
// - 快照字段创建后不变
// - 状态与通知标记只前进不后退
// - 已处理事件再次处理: 原样保留并返回 EventAlreadyResolved
// ==========================================

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::domain::event::{OverproductionDetails, OverproductionEvent};
use crate::domain::types::{EventStatus, SupervisorReason};
use crate::engine::error::{EngineError, EngineResult};

/// 主管处理结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveOutcome {
    pub event: OverproductionEvent,
    /// 已发过升级通知时为 true，调用方须发送且仅发送一次处理完成通知
    pub should_notify_resolution: bool,
}

// ==========================================
// EventStore - 超产事件存储
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct EventStore {
    events: HashMap<String, OverproductionEvent>,
}

impl EventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从持久化记录恢复
    pub fn from_events(events: impl IntoIterator<Item = OverproductionEvent>) -> Self {
        Self {
            events: events.into_iter().map(|e| (e.id.clone(), e)).collect(),
        }
    }

    /// 创建待处理事件
    pub fn create(&mut self, details: OverproductionDetails, now_ms: i64) -> OverproductionEvent {
        let event = OverproductionEvent::from_details(Uuid::new_v4().to_string(), details, now_ms);
        info!(
            event_id = %event.id,
            order_id = %event.order_id,
            operation_code = %event.operation_code,
            excess = event.excess,
            "超产事件已创建"
        );
        self.events.insert(event.id.clone(), event.clone());
        event
    }

    /// 主管处理事件
    ///
    /// # 错误
    /// - EventNotFound: 事件不存在
    /// - EventAlreadyResolved: 事件已处理（不做任何修改）
    /// - MissingReason: 原因为空或不在枚举集合内
    pub fn resolve(&mut self, event_id: &str, reason: &str, now_ms: i64) -> EngineResult<ResolveOutcome> {
        let event = self
            .events
            .get_mut(event_id)
            .ok_or_else(|| EngineError::EventNotFound(event_id.to_string()))?;

        if event.status == EventStatus::Resolved {
            return Err(EngineError::EventAlreadyResolved(event_id.to_string()));
        }

        let reason = SupervisorReason::parse(reason).ok_or(EngineError::MissingReason)?;

        event.status = EventStatus::Resolved;
        event.timestamp_supervisor = Some(now_ms);
        event.supervisor_reason = Some(reason);
        event.response_ms = Some(now_ms - event.timestamp_operator);

        let should_notify_resolution = event.escalation_notified && !event.escalation_resolved_notified;
        if should_notify_resolution {
            event.escalation_resolved_notified = true;
            event.escalation_resolved_timestamp = Some(now_ms);
        }

        info!(
            event_id,
            reason = %reason,
            response_ms = now_ms - event.timestamp_operator,
            should_notify_resolution,
            "超产事件已处理"
        );

        Ok(ResolveOutcome {
            event: event.clone(),
            should_notify_resolution,
        })
    }

    /// 标记升级通知已发出
    ///
    /// 仅对 PENDING 且未通知的事件生效，返回更新后的事件
    pub fn mark_escalated(&mut self, event_id: &str, now_ms: i64) -> Option<OverproductionEvent> {
        let event = self.events.get_mut(event_id)?;
        if !event.is_pending() || event.escalation_notified {
            return None;
        }
        event.escalation_notified = true;
        event.escalation_notice_timestamp = Some(now_ms);
        Some(event.clone())
    }

    /// 覆盖单个事件（持久化失败时回滚使用）
    pub fn restore(&mut self, event: OverproductionEvent) {
        self.events.insert(event.id.clone(), event);
    }

    /// 删除单个事件（仅用于回滚未持久化的创建）
    pub(crate) fn discard(&mut self, event_id: &str) {
        self.events.remove(event_id);
    }

    pub fn get(&self, event_id: &str) -> Option<&OverproductionEvent> {
        self.events.get(event_id)
    }

    /// 待处理事件（最新在前）
    pub fn pending(&self) -> Vec<OverproductionEvent> {
        self.by_status(EventStatus::Pending)
    }

    /// 已处理事件（最新在前）
    pub fn resolved(&self) -> Vec<OverproductionEvent> {
        self.by_status(EventStatus::Resolved)
    }

    fn by_status(&self, status: EventStatus) -> Vec<OverproductionEvent> {
        let mut events: Vec<OverproductionEvent> = self
            .events
            .values()
            .filter(|e| e.status == status)
            .cloned()
            .collect();
        events.sort_by(|a, b| {
            b.timestamp_operator
                .cmp(&a.timestamp_operator)
                .then_with(|| a.id.cmp(&b.id))
        });
        events
    }

    pub fn iter(&self) -> impl Iterator<Item = &OverproductionEvent> {
        self.events.values()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}
