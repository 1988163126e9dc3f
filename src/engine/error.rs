// ==========================================
// 工序报工配额系统 - 引擎层错误类型
// ==========================================
// 工具: thiserror 派生宏
// 说明: NeedsConfirm 是合法分类，不是错误
// ==========================================

use thiserror::Error;

/// 引擎层错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    // ===== 台账错误 =====
    #[error("无效数量: {0}")]
    InvalidDelta(String),

    #[error("判废数量超出可用良品: requested={requested}, available={available}")]
    ScrapExceedsAvailable { requested: u64, available: u64 },

    #[error("订单{order_id}中不存在工序{operation_code}")]
    UnknownOperation {
        order_id: String,
        operation_code: String,
    },

    // ===== 事件错误 =====
    #[error("待处理超产事件不存在: {0}")]
    EventNotFound(String),

    #[error("超产事件已处理: {0}")]
    EventAlreadyResolved(String),

    #[error("缺少有效的主管处理原因")]
    MissingReason,
}

/// Result 类型别名
pub type EngineResult<T> = Result<T, EngineError>;
