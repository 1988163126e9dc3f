// ==========================================
// 工序报工配额系统 - 运行设置
// ==========================================
// 来源: config_kv 表（由 ConfigManager 读取）
// ==========================================

use serde::{Deserialize, Serialize};

use crate::domain::types::{PrevQtySource, SequenceMode};

/// 升级阈值默认值（分钟）
pub const DEFAULT_ESCALATION_THRESHOLD_MINUTES: u32 = 5;

/// 升级轮询最大间隔默认值（秒）
pub const DEFAULT_ESCALATION_POLL_INTERVAL_SECS: u64 = 15;

// ==========================================
// EscalationSettings - 升级通知设置
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EscalationSettings {
    pub escalation_threshold_minutes: u32, // > 0
    pub poll_interval_secs: u64,
}

impl Default for EscalationSettings {
    fn default() -> Self {
        Self {
            escalation_threshold_minutes: DEFAULT_ESCALATION_THRESHOLD_MINUTES,
            poll_interval_secs: DEFAULT_ESCALATION_POLL_INTERVAL_SECS,
        }
    }
}

// ==========================================
// ReportingSettings - 报工控制设置
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ReportingSettings {
    pub sequence_mode: SequenceMode,
    pub prev_qty_source: PrevQtySource,
    pub manual_prev_qty: Option<u64>,
}
