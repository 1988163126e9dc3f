// ==========================================
// 工序报工配额系统 - 通知发件箱
// ==========================================
// 备用渠道: 每条通知追加一行 JSON 到本地文件，由外部流程补发
// 自动创建父目录；每条写入后立即 flush
// ==========================================

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;

use crate::engine::escalation::{EscalationNotice, NoticeKind};
use crate::domain::event::OverproductionEvent;
use crate::notify::error::{NotifyError, NotifyResult};
use crate::notify::sender::NotificationSender;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OutboxLine<'a> {
    queued_at: i64,
    kind: NoticeKind,
    event: &'a OverproductionEvent,
}

pub struct OutboxFileSender {
    path: PathBuf,
    // 串行化追加写，避免多行交错
    write_lock: Mutex<()>,
}

impl OutboxFileSender {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn append(&self, line: &str) -> std::io::Result<()> {
        let _guard = self.write_lock.lock().await;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.write_all(b"\n").await?;
        file.flush().await
    }
}

#[async_trait]
impl NotificationSender for OutboxFileSender {
    fn channel(&self) -> &str {
        "outbox"
    }

    async fn send(&self, notice: &EscalationNotice) -> NotifyResult<()> {
        let line = serde_json::to_string(&OutboxLine {
            queued_at: Utc::now().timestamp_millis(),
            kind: notice.kind,
            event: &notice.event,
        })
        .map_err(|e| NotifyError::Serialization(e.to_string()))?;

        self.append(&line)
            .await
            .map_err(|e| NotifyError::channel(self.channel(), e.to_string()))?;

        debug!(path = %self.path.display(), event_id = %notice.event.id, "通知已写入发件箱");
        Ok(())
    }
}
