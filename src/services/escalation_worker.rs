// ==========================================
// 工序报工配额系统 - 升级通知后台任务
// ==========================================
// 职责: 定时驱动 ProductionApi::tick 并投递通知
// 调度: 睡眠至 min(最近截止时间, 轮询间隔)，收到停机信号即退出
// 语义: 投递失败只记录，不回滚事件状态
// ==========================================

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::api::error::ApiResult;
use crate::api::production_api::ProductionApi;
use crate::engine::escalation::EscalationNotice;
use crate::engine::event_store::ResolveOutcome;
use crate::notify::error::NotifyError;
use crate::notify::sender::NotificationSender;

const RETRY_BACKOFF_MS: u64 = 1_000;

/// 单次 tick 的投递统计
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickReport {
    pub delivered: usize,
    pub failed: usize,
}

/// 主管处理结果及处理完成通知的投递情况
#[derive(Debug)]
pub struct ResolveReport {
    pub outcome: ResolveOutcome,
    pub delivery_error: Option<NotifyError>,
}

pub struct EscalationWorker {
    api: Arc<ProductionApi>,
    sender: Arc<dyn NotificationSender>,
}

impl EscalationWorker {
    pub fn new(api: Arc<ProductionApi>, sender: Arc<dyn NotificationSender>) -> Self {
        Self { api, sender }
    }

    /// 执行一轮: tick 并投递全部通知
    pub async fn run_once(&self) -> ApiResult<TickReport> {
        let notices = self.api.tick_now()?;
        let mut report = TickReport::default();
        for notice in &notices {
            match self.deliver(notice).await {
                Ok(()) => report.delivered += 1,
                Err(_) => report.failed += 1,
            }
        }
        if !notices.is_empty() {
            info!(delivered = report.delivered, failed = report.failed, "升级通知投递完成");
        }
        Ok(report)
    }

    /// 主管处理事件，需要时发送处理完成通知
    pub async fn resolve_and_notify(&self, event_id: &str, reason: &str) -> ApiResult<ResolveReport> {
        let outcome = self.api.resolve_event(event_id, reason)?;
        let mut delivery_error = None;
        // 立即取走排队的通知，避免下一轮 tick 重复投递
        if let Some(notice) = self.api.take_resolution_notice(event_id)? {
            delivery_error = self.deliver(&notice).await.err();
        }
        Ok(ResolveReport {
            outcome,
            delivery_error,
        })
    }

    async fn deliver(&self, notice: &EscalationNotice) -> Result<(), NotifyError> {
        let result = self.sender.send(notice).await;
        if let Err(e) = &result {
            error!(
                event_id = %notice.event.id,
                kind = notice.kind.as_str(),
                channel = self.sender.channel(),
                error = %e,
                "通知投递失败"
            );
        }
        result
    }

    /// 下一次唤醒前的等待时长
    fn next_sleep(&self) -> ApiResult<Duration> {
        let poll_ms = self.api.escalation_settings()?.poll_interval_secs.saturating_mul(1_000);
        let wait_ms = match self.api.next_deadline()? {
            Some(deadline) => {
                let until = deadline.saturating_sub(self.api.now_ms()).max(0) as u64;
                // 本轮刚执行过 tick，仍已到期说明写入失败待重试
                if until == 0 {
                    RETRY_BACKOFF_MS.min(poll_ms)
                } else {
                    until.min(poll_ms)
                }
            }
            None => poll_ms,
        };
        Ok(Duration::from_millis(wait_ms))
    }

    /// 主循环，直到 shutdown 为 true 或发送端关闭
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(channel = self.sender.channel(), "升级通知任务启动");

        loop {
            if *shutdown.borrow() {
                break;
            }

            if let Err(e) = self.run_once().await {
                warn!(error = %e, "升级调度执行失败");
            }

            let sleep_for = self.next_sleep().unwrap_or_else(|e| {
                warn!(error = %e, "读取调度参数失败，使用默认间隔");
                Duration::from_secs(crate::domain::settings::DEFAULT_ESCALATION_POLL_INTERVAL_SECS)
            });
            debug!(sleep_ms = sleep_for.as_millis() as u64, "等待下一轮升级调度");

            tokio::select! {
                _ = tokio::time::sleep(sleep_for) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("升级通知任务已停止");
    }
}
