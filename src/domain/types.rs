// ==========================================
// 工序报工配额系统 - 领域类型定义
// ==========================================
// 职责: 事件状态、主管原因、顺序控制模式等枚举
// 序列化格式: SCREAMING_SNAKE_CASE (与存储一致)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 超产事件状态 (Event Status)
// ==========================================
// 状态机: PENDING → RESOLVED (终态)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventStatus {
    Pending,  // 待主管处理
    Resolved, // 已处理
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventStatus::Pending => write!(f, "PENDING"),
            EventStatus::Resolved => write!(f, "RESOLVED"),
        }
    }
}

// ==========================================
// 主管处理原因 (Supervisor Reason)
// ==========================================
// 固定枚举集合，空值或集合外的值一律视为缺失原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SupervisorReason {
    ErpQuantityOutdated,   // ERP 计划数量未更新
    ReworkRecovered,       // 返工件回收
    SetupTrialPieces,      // 调机/试制件
    CustomerExtraDemand,   // 客户追加需求
    OperatorReportError,   // 操作员报工错误
    Other,                 // 其他
}

impl SupervisorReason {
    pub const ALL: [SupervisorReason; 6] = [
        SupervisorReason::ErpQuantityOutdated,
        SupervisorReason::ReworkRecovered,
        SupervisorReason::SetupTrialPieces,
        SupervisorReason::CustomerExtraDemand,
        SupervisorReason::OperatorReportError,
        SupervisorReason::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SupervisorReason::ErpQuantityOutdated => "ERP_QUANTITY_OUTDATED",
            SupervisorReason::ReworkRecovered => "REWORK_RECOVERED",
            SupervisorReason::SetupTrialPieces => "SETUP_TRIAL_PIECES",
            SupervisorReason::CustomerExtraDemand => "CUSTOMER_EXTRA_DEMAND",
            SupervisorReason::OperatorReportError => "OPERATOR_REPORT_ERROR",
            SupervisorReason::Other => "OTHER",
        }
    }

    /// 解析原因代码（忽略首尾空白与大小写），空值或未知值返回 None
    pub fn parse(raw: &str) -> Option<Self> {
        let code = raw.trim().to_uppercase();
        if code.is_empty() {
            return None;
        }
        Self::ALL.iter().copied().find(|r| r.as_str() == code)
    }
}

impl fmt::Display for SupervisorReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 工序顺序控制模式 (Sequence Mode)
// ==========================================
// BLOCK: 超出剩余配额需确认，确认后生成超产事件
// ALERT: 超出部分直接入账，仅告警
// OFF:   不做配额控制
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SequenceMode {
    Off,
    Alert,
    #[default]
    Block,
}

impl SequenceMode {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_uppercase().as_str() {
            "OFF" | "NONE" => Some(SequenceMode::Off),
            "ALERT" => Some(SequenceMode::Alert),
            "BLOCK" => Some(SequenceMode::Block),
            _ => None,
        }
    }
}

impl fmt::Display for SequenceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SequenceMode::Off => write!(f, "OFF"),
            SequenceMode::Alert => write!(f, "ALERT"),
            SequenceMode::Block => write!(f, "BLOCK"),
        }
    }
}

// ==========================================
// 前道计划数来源 (Previous Qty Source)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PrevQtySource {
    #[default]
    Erp,    // 取 ERP 前道工序计划数
    Manual, // 取人工录入值
}

impl PrevQtySource {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_uppercase().as_str() {
            "ERP" => Some(PrevQtySource::Erp),
            "MANUAL" => Some(PrevQtySource::Manual),
            _ => None,
        }
    }
}

impl fmt::Display for PrevQtySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrevQtySource::Erp => write!(f, "ERP"),
            PrevQtySource::Manual => write!(f, "MANUAL"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supervisor_reason_parse() {
        assert_eq!(
            SupervisorReason::parse(" rework_recovered "),
            Some(SupervisorReason::ReworkRecovered)
        );
        assert_eq!(SupervisorReason::parse(""), None);
        assert_eq!(SupervisorReason::parse("   "), None);
        assert_eq!(SupervisorReason::parse("BECAUSE"), None);
    }

    #[test]
    fn test_sequence_mode_parse_and_default() {
        assert_eq!(SequenceMode::default(), SequenceMode::Block);
        assert_eq!(SequenceMode::parse("none"), Some(SequenceMode::Off));
        assert_eq!(SequenceMode::parse("Alert"), Some(SequenceMode::Alert));
        assert_eq!(SequenceMode::parse("x"), None);
    }

    #[test]
    fn test_event_status_serde() {
        let json = serde_json::to_string(&EventStatus::Pending).unwrap();
        assert_eq!(json, "\"PENDING\"");
    }
}
