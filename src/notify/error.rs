// ==========================================
// 工序报工配额系统 - 通知错误类型
// ==========================================

use thiserror::Error;

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("通知渠道{channel}发送失败: {message}")]
    ChannelFailed { channel: String, message: String },

    #[error("主渠道与备用渠道均失败: primary={primary}; fallback={fallback}")]
    AllChannelsFailed { primary: String, fallback: String },

    #[error("通知序列化失败: {0}")]
    Serialization(String),
}

impl NotifyError {
    pub fn channel(channel: &str, message: impl Into<String>) -> Self {
        NotifyError::ChannelFailed {
            channel: channel.to_string(),
            message: message.into(),
        }
    }
}

pub type NotifyResult<T> = Result<T, NotifyError>;
