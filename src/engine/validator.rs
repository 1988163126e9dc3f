// ==========================================
// 工序报工配额系统 - 报工校验器
// ==========================================
// 职责: 将一次良品报工请求按剩余配额分类
// - requested <= remaining            → Ok
// - requested >  remaining, 未确认    → NeedsConfirm
// - requested >  remaining, 已确认    → Confirmed
// 判废请求独立校验，不会产生 NeedsConfirm
// 本组件无持久状态
// ==========================================

use serde::{Deserialize, Serialize};

use crate::domain::order::Order;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::ledger::LedgerSnapshot;
use crate::engine::quota::{Quota, QuotaResolver};

// ==========================================
// ReportDecision - 报工分类结果
// ==========================================
// 序列化为 {"status": "ok" | "needs_confirm" | "confirmed", ...}
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReportDecision {
    Ok { remaining: u64 },
    NeedsConfirm { excess: u64, remaining: u64 },
    Confirmed { excess: u64, remaining: u64 },
}

impl ReportDecision {
    pub fn remaining(&self) -> u64 {
        match *self {
            ReportDecision::Ok { remaining }
            | ReportDecision::NeedsConfirm { remaining, .. }
            | ReportDecision::Confirmed { remaining, .. } => remaining,
        }
    }

    pub fn excess(&self) -> u64 {
        match *self {
            ReportDecision::Ok { .. } => 0,
            ReportDecision::NeedsConfirm { excess, .. } | ReportDecision::Confirmed { excess, .. } => {
                excess
            }
        }
    }
}

// ==========================================
// ReportValidator - 报工校验器
// ==========================================
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportValidator {
    resolver: QuotaResolver,
}

impl ReportValidator {
    pub fn new() -> Self {
        Self {
            resolver: QuotaResolver::new(),
        }
    }

    /// 按已算出的配额分类
    pub fn classify(&self, quota: Quota, requested_good: u64, override_confirmed: bool) -> ReportDecision {
        let remaining = quota.remaining;
        if requested_good <= remaining {
            return ReportDecision::Ok { remaining };
        }

        let excess = requested_good - remaining;
        if override_confirmed {
            ReportDecision::Confirmed { excess, remaining }
        } else {
            ReportDecision::NeedsConfirm { excess, remaining }
        }
    }

    /// 计算配额并分类
    pub fn validate_report(
        &self,
        order: &Order,
        snapshot: &LedgerSnapshot,
        operation_code: &str,
        requested_good: u64,
        override_confirmed: bool,
    ) -> EngineResult<ReportDecision> {
        let quota = self.resolver.compute_quota(order, snapshot, operation_code)?;
        Ok(self.classify(quota, requested_good, override_confirmed))
    }

    /// 校验判废数量不超过可用良品（good - scrap）
    pub fn validate_scrap(
        &self,
        snapshot: &LedgerSnapshot,
        operation_code: &str,
        requested_scrap: u64,
    ) -> EngineResult<()> {
        self.check_scrap_available(snapshot.final_good(operation_code), requested_scrap)
    }

    /// 校验判废数量不超过给定可用量
    pub fn check_scrap_available(&self, available: u64, requested_scrap: u64) -> EngineResult<()> {
        if requested_scrap > available {
            return Err(EngineError::ScrapExceedsAvailable {
                requested: requested_scrap,
                available,
            });
        }
        Ok(())
    }
}
