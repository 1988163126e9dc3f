// ==========================================
// 工序报工配额系统 - API层错误类型
// ==========================================
// 职责: 定义API层错误类型，将引擎/仓储/配置错误转换为用户可读的错误消息
// 说明: NeedsConfirm 不是错误，由 ReportOutcome 表达
// ==========================================

use crate::config::ConfigError;
use crate::engine::error::EngineError;
use crate::importer::error::ImportError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 报工错误（拒绝时不修改任何状态）
    // ==========================================
    #[error("无效数量: {0}")]
    InvalidDelta(String),

    #[error("判废数量{requested}超出可用良品{available}")]
    ScrapExceedsAvailable { requested: u64, available: u64 },

    // ==========================================
    // 超产事件错误
    // ==========================================
    #[error("待处理超产事件不存在: {0}")]
    EventNotFound(String),

    #[error("超产事件已处理: {0}")]
    EventAlreadyResolved(String),

    #[error("缺少有效的主管处理原因")]
    MissingReason,

    // ==========================================
    // 参考数据错误
    // ==========================================
    #[error("订单不存在: {0}")]
    OrderNotFound(String),

    #[error("订单{order_id}中不存在工序{operation_code}")]
    OperationNotFound {
        order_id: String,
        operation_code: String,
    },

    #[error("订单数据导入失败: {0}")]
    ImportFailed(String),

    // ==========================================
    // 配置错误
    // ==========================================
    #[error("配置无效: {0}")]
    InvalidConfig(String),

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    Database(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    Internal(String),
}

// ==========================================
// 从 EngineError 转换
// ==========================================
impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::InvalidDelta(msg) => ApiError::InvalidDelta(msg),
            EngineError::ScrapExceedsAvailable {
                requested,
                available,
            } => ApiError::ScrapExceedsAvailable {
                requested,
                available,
            },
            EngineError::UnknownOperation {
                order_id,
                operation_code,
            } => ApiError::OperationNotFound {
                order_id,
                operation_code,
            },
            EngineError::EventNotFound(id) => ApiError::EventNotFound(id),
            EngineError::EventAlreadyResolved(id) => ApiError::EventAlreadyResolved(id),
            EngineError::MissingReason => ApiError::MissingReason,
        }
    }
}

// ==========================================
// 从 RepositoryError 转换
// 目的: 将Repository层的技术错误转换为用户友好的错误
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::Database(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::DatabaseConnectionError(msg)
            | RepositoryError::DatabaseQueryError(msg) => ApiError::Database(msg),
            RepositoryError::LockError(msg) => {
                ApiError::Database(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::SerializationError { key, message } => {
                ApiError::Database(format!("记录{}序列化失败: {}", key, message))
            }
        }
    }
}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::UnknownKey(_) | ConfigError::InvalidValue { .. } => {
                ApiError::InvalidConfig(err.to_string())
            }
            ConfigError::LockError(msg) => ApiError::Internal(format!("锁获取失败: {}", msg)),
            ConfigError::Database(e) => ApiError::Database(e.to_string()),
        }
    }
}

impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        ApiError::ImportFailed(err.to_string())
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;
