// ==========================================
// 工序报工配额系统 - 通知发送
// ==========================================
// 职责: 将升级/处理完成通知投递到外部渠道
// 语义: 至少一次；主渠道失败时走备用渠道
// 说明: 投递失败不回滚已提交的台账与事件状态
// ==========================================

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::engine::escalation::{EscalationNotice, NoticeKind};
use crate::notify::error::{NotifyError, NotifyResult};

/// 通知发送接口
#[async_trait]
pub trait NotificationSender: Send + Sync {
    /// 渠道名（用于日志）
    fn channel(&self) -> &str;

    async fn send(&self, notice: &EscalationNotice) -> NotifyResult<()>;
}

// ==========================================
// TracingSender - 日志渠道
// ==========================================
// 无外部通道时的默认主渠道：以结构化日志输出
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSender;

#[async_trait]
impl NotificationSender for TracingSender {
    fn channel(&self) -> &str {
        "tracing"
    }

    async fn send(&self, notice: &EscalationNotice) -> NotifyResult<()> {
        let event = &notice.event;
        match notice.kind {
            NoticeKind::Notice => warn!(
                kind = notice.kind.as_str(),
                event_id = %event.id,
                order_id = %event.order_id,
                operation_code = %event.operation_code,
                machine_id = %event.machine_id,
                excess = event.excess,
                "超产事件超时未处理，升级通知主管"
            ),
            NoticeKind::ResolutionNotice => info!(
                kind = notice.kind.as_str(),
                event_id = %event.id,
                order_id = %event.order_id,
                reason = event.supervisor_reason.map(|r| r.as_str()).unwrap_or(""),
                response_ms = event.response_ms.unwrap_or_default(),
                "已升级的超产事件处理完成"
            ),
        }
        Ok(())
    }
}

// ==========================================
// FallbackSender - 主/备渠道组合
// ==========================================
pub struct FallbackSender {
    primary: Arc<dyn NotificationSender>,
    fallback: Arc<dyn NotificationSender>,
}

impl FallbackSender {
    pub fn new(primary: Arc<dyn NotificationSender>, fallback: Arc<dyn NotificationSender>) -> Self {
        Self { primary, fallback }
    }
}

#[async_trait]
impl NotificationSender for FallbackSender {
    fn channel(&self) -> &str {
        self.primary.channel()
    }

    async fn send(&self, notice: &EscalationNotice) -> NotifyResult<()> {
        let primary_err = match self.primary.send(notice).await {
            Ok(()) => return Ok(()),
            Err(e) => e,
        };

        warn!(
            event_id = %notice.event.id,
            primary = self.primary.channel(),
            fallback = self.fallback.channel(),
            error = %primary_err,
            "主通知渠道失败，改用备用渠道"
        );

        self.fallback
            .send(notice)
            .await
            .map_err(|fallback_err| NotifyError::AllChannelsFailed {
                primary: primary_err.to_string(),
                fallback: fallback_err.to_string(),
            })
    }
}
