// ==========================================
// 工序报工配额系统 - 升级通知调度器
// ==========================================
// 职责: 待处理事件超过阈值未处理时，触发一次升级通知
// 实现: 按截止时间 (timestamp_operator + 阈值) 排序的最小堆
// 契约: 当且仅当 now - timestamp_operator >= 阈值 时触发，且每个事件只触发一次
// 说明: 阈值变化时按当前待处理事件重建堆
// ==========================================

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::domain::event::OverproductionEvent;
use crate::engine::event_store::EventStore;

/// 通知类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NoticeKind {
    /// 超时升级通知
    Notice,
    /// 已升级事件的处理完成通知
    ResolutionNotice,
}

impl NoticeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NoticeKind::Notice => "notice",
            NoticeKind::ResolutionNotice => "resolutionNotice",
        }
    }
}

/// 待发送的通知
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EscalationNotice {
    pub kind: NoticeKind,
    pub event: OverproductionEvent,
}

// ==========================================
// EscalationScheduler - 截止时间调度器
// ==========================================
#[derive(Debug, Clone)]
pub struct EscalationScheduler {
    threshold_minutes: u32,
    deadlines: BinaryHeap<Reverse<(i64, String)>>,
}

impl EscalationScheduler {
    pub fn new(threshold_minutes: u32) -> Self {
        Self {
            threshold_minutes,
            deadlines: BinaryHeap::new(),
        }
    }

    pub fn threshold_minutes(&self) -> u32 {
        self.threshold_minutes
    }

    fn threshold_ms(&self) -> i64 {
        i64::from(self.threshold_minutes) * 60_000
    }

    /// 登记事件截止时间（已处理或已通知的事件忽略）
    pub fn schedule(&mut self, event: &OverproductionEvent) {
        if !event.is_pending() || event.escalation_notified {
            return;
        }
        let deadline = event.timestamp_operator + self.threshold_ms();
        debug!(event_id = %event.id, deadline, "登记升级截止时间");
        self.deadlines.push(Reverse((deadline, event.id.clone())));
    }

    /// 按事件存储重建截止时间堆
    pub fn rebuild(&mut self, store: &EventStore) {
        self.deadlines.clear();
        for event in store.iter() {
            self.schedule(event);
        }
    }

    /// 最近的截止时间
    pub fn next_deadline(&self) -> Option<i64> {
        self.deadlines.peek().map(|Reverse((deadline, _))| *deadline)
    }

    /// 执行一次调度
    ///
    /// 对所有截止时间 <= now 的事件标记已通知，并返回需要发送的通知
    pub fn tick(
        &mut self,
        store: &mut EventStore,
        now_ms: i64,
        threshold_minutes: u32,
    ) -> Vec<EscalationNotice> {
        if threshold_minutes != self.threshold_minutes {
            info!(
                from = self.threshold_minutes,
                to = threshold_minutes,
                "升级阈值变更，重建调度堆"
            );
            self.threshold_minutes = threshold_minutes;
            self.rebuild(store);
        }

        let mut notices = Vec::new();
        while let Some(Reverse((deadline, _))) = self.deadlines.peek() {
            if *deadline > now_ms {
                break;
            }
            let Some(Reverse((_, event_id))) = self.deadlines.pop() else {
                break;
            };
            // 已处理/已通知的事件在此被跳过
            if let Some(event) = store.mark_escalated(&event_id, now_ms) {
                info!(event_id = %event.id, order_id = %event.order_id, "超产事件超时升级");
                notices.push(EscalationNotice {
                    kind: NoticeKind::Notice,
                    event,
                });
            }
        }
        notices
    }

    pub fn clear(&mut self) {
        self.deadlines.clear();
    }

    pub fn len(&self) -> usize {
        self.deadlines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deadlines.is_empty()
    }
}
