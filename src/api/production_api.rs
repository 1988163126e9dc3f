// ==========================================
// 工序报工配额系统 - 报工 API
// ==========================================
// 职责: 报工/判废提交、超产事件创建与处理、升级调度入口、看板查询
// 并发: 台账、事件、调度器由同一把写锁保护
//   - 取配额 → 校验 → 提交 为原子操作
//   - tick 与 resolve 修改事件标记前获取同一把锁
//   - 配额计算在锁外基于台账快照进行
// 持久化: 持锁写穿；写入失败时回滚内存修改，内存与存储不分叉
// 通知: 超时升级通知与处理完成通知都经 tick 返回
// ==========================================

use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::config::ConfigManager;
use crate::domain::event::{OverproductionDetails, OverproductionEvent};
use crate::domain::ledger::LedgerEntry;
use crate::domain::order::Order;
use crate::domain::settings::{EscalationSettings, ReportingSettings};
use crate::domain::types::SequenceMode;
use crate::engine::clock::Clock;
use crate::engine::escalation::{EscalationNotice, EscalationScheduler, NoticeKind};
use crate::engine::event_store::{EventStore, ResolveOutcome};
use crate::engine::ledger::{LedgerSnapshot, OperationLedger};
use crate::engine::quota::{Quota, QuotaResolver};
use crate::engine::summary::{self, OperationStatusRow, OrderSummary};
use crate::engine::validator::{ReportDecision, ReportValidator};
use crate::api::error::{ApiError, ApiResult};
use crate::importer::order_source::OrderSource;
use crate::repository::event_repo::{EventRepository, EVENT_PREFIX};
use crate::repository::kv_store::KvStore;
use crate::repository::ledger_repo::{LedgerRepository, LEDGER_PREFIX};

// ==========================================
// 请求/响应类型
// ==========================================

/// 组合报工请求（良品 + 判废）
///
/// 数量以有符号整数接收，负数按 InvalidDelta 拒绝
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRequest {
    pub order_id: String,
    pub operation_code: String,
    pub machine_id: String,
    pub good: i64,
    pub scrap: i64,
    #[serde(default)]
    pub override_confirmed: bool,
}

/// 已入账的报工回执
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportReceipt {
    pub entry: LedgerEntry,
    pub decision: ReportDecision,
    pub scrap_applied: u64,
    /// 仅 BLOCK 模式下确认超产时生成
    pub event: Option<OverproductionEvent>,
    /// ALERT 模式下未经确认直接入账的超出量
    pub unconfirmed_excess: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReportOutcome {
    Committed(ReportReceipt),
    /// 超出剩余配额且未确认，未做任何修改
    NeedsConfirm { remaining: u64, excess: u64 },
}

// ==========================================
// CoreState - 写锁保护的核心状态
// ==========================================
struct CoreState {
    ledger: OperationLedger,
    events: EventStore,
    scheduler: EscalationScheduler,
    /// 已处理、待发送的处理完成通知（仅内存）
    resolution_queue: Vec<EscalationNotice>,
}

// ==========================================
// ProductionApi - 报工服务上下文
// ==========================================
pub struct ProductionApi {
    orders: Arc<dyn OrderSource>,
    config: Arc<ConfigManager>,
    clock: Arc<dyn Clock>,
    store: Arc<dyn KvStore>,
    ledger_repo: LedgerRepository,
    event_repo: EventRepository,
    resolver: QuotaResolver,
    validator: ReportValidator,
    state: Mutex<CoreState>,
}

impl ProductionApi {
    /// 创建服务并从存储恢复台账与事件
    pub fn new(
        store: Arc<dyn KvStore>,
        orders: Arc<dyn OrderSource>,
        config: Arc<ConfigManager>,
        clock: Arc<dyn Clock>,
    ) -> ApiResult<Self> {
        let ledger_repo = LedgerRepository::new(store.clone());
        let event_repo = EventRepository::new(store.clone());

        let ledger = OperationLedger::from_entries(ledger_repo.load_all()?);
        let events = EventStore::from_events(event_repo.load_all()?);
        let settings = config.get_escalation_settings()?;
        let mut scheduler = EscalationScheduler::new(settings.escalation_threshold_minutes);
        scheduler.rebuild(&events);

        info!(
            ledger_entries = ledger.entries().count(),
            events = events.len(),
            scheduled = scheduler.len(),
            threshold_minutes = settings.escalation_threshold_minutes,
            "报工服务状态已恢复"
        );

        Ok(Self {
            orders,
            config,
            clock,
            store,
            ledger_repo,
            event_repo,
            resolver: QuotaResolver::new(),
            validator: ReportValidator::new(),
            state: Mutex::new(CoreState {
                ledger,
                events,
                scheduler,
                resolution_queue: Vec::new(),
            }),
        })
    }

    fn lock_state(&self) -> ApiResult<MutexGuard<'_, CoreState>> {
        self.state
            .lock()
            .map_err(|e| ApiError::Internal(format!("锁获取失败: {}", e)))
    }

    pub fn now_ms(&self) -> i64 {
        self.clock.now_ms()
    }

    // ==========================================
    // 参考数据与配置
    // ==========================================

    pub fn find_order(&self, order_id: &str) -> ApiResult<Order> {
        self.orders
            .find_order(order_id)
            .ok_or_else(|| ApiError::OrderNotFound(order_id.to_string()))
    }

    pub fn list_orders(&self) -> Vec<Order> {
        self.orders.list_orders()
    }

    fn find_order_with_operation(&self, order_id: &str, operation_code: &str) -> ApiResult<Order> {
        let order = self.find_order(order_id)?;
        if order.operation(operation_code).is_none() {
            return Err(ApiError::OperationNotFound {
                order_id: order_id.to_string(),
                operation_code: operation_code.to_string(),
            });
        }
        Ok(order)
    }

    pub fn escalation_settings(&self) -> ApiResult<EscalationSettings> {
        Ok(self.config.get_escalation_settings()?)
    }

    pub fn reporting_settings(&self) -> ApiResult<ReportingSettings> {
        Ok(self.config.get_reporting_settings()?)
    }

    /// 写入配置（阈值变化在下一次 tick 时生效）
    pub fn set_config_value(&self, key: &str, value: &str) -> ApiResult<()> {
        Ok(self.config.set_config_value(key, value)?)
    }

    // ==========================================
    // 配额与校验
    // ==========================================

    /// 订单台账快照（短暂持锁后释放）
    pub fn ledger_snapshot(&self, order_id: &str) -> ApiResult<LedgerSnapshot> {
        Ok(self.lock_state()?.ledger.snapshot(order_id))
    }

    /// 计算工序配额（锁外计算）
    pub fn compute_quota(&self, order_id: &str, operation_code: &str) -> ApiResult<Quota> {
        let order = self.find_order(order_id)?;
        let snapshot = self.ledger_snapshot(order_id)?;
        Ok(self.resolver.compute_quota(&order, &snapshot, operation_code)?)
    }

    /// 预校验良品报工
    ///
    /// OFF 模式下始终返回 Ok
    pub fn validate_report(
        &self,
        order_id: &str,
        operation_code: &str,
        requested_good: i64,
        override_confirmed: bool,
    ) -> ApiResult<ReportDecision> {
        let requested_good = non_negative(requested_good, "良品")?;
        let quota = self.compute_quota(order_id, operation_code)?;
        let mode = self.reporting_settings()?.sequence_mode;
        Ok(self.classify(mode, quota, requested_good, override_confirmed))
    }

    fn classify(
        &self,
        mode: SequenceMode,
        quota: Quota,
        requested_good: u64,
        override_confirmed: bool,
    ) -> ReportDecision {
        match mode {
            SequenceMode::Off => ReportDecision::Ok {
                remaining: quota.remaining,
            },
            // 告警模式不需要确认，也不生成事件
            SequenceMode::Alert => self.validator.classify(quota, requested_good, false),
            SequenceMode::Block => self
                .validator
                .classify(quota, requested_good, override_confirmed),
        }
    }

    // ==========================================
    // 台账提交
    // ==========================================

    /// 提交良品（无条件累加，不做配额判断）
    pub fn commit_good(&self, order_id: &str, operation_code: &str, delta: i64) -> ApiResult<LedgerEntry> {
        let delta = positive(delta, "良品")?;
        self.find_order_with_operation(order_id, operation_code)?;

        let mut state = self.lock_state()?;
        let previous = state.ledger.entry(order_id, operation_code);
        let entry = state.ledger.commit_good(order_id, operation_code, delta)?;
        self.persist_entry(&mut state, &entry, previous)?;

        info!(order_id, operation_code, delta, good = entry.good, "良品已入账");
        Ok(entry)
    }

    /// 提交判废
    ///
    /// 先校验可用良品，全部可入账才提交，不依赖台账的静默截断
    pub fn commit_scrap(&self, order_id: &str, operation_code: &str, delta: i64) -> ApiResult<LedgerEntry> {
        let delta = positive(delta, "判废")?;
        self.find_order_with_operation(order_id, operation_code)?;

        let mut state = self.lock_state()?;
        let previous = state.ledger.entry(order_id, operation_code);
        self.validator
            .check_scrap_available(previous.final_good(), delta)?;
        let (entry, _) = state.ledger.commit_scrap(order_id, operation_code, delta)?;
        self.persist_entry(&mut state, &entry, previous)?;

        info!(order_id, operation_code, delta, scrap = entry.scrap, "判废已入账");
        Ok(entry)
    }

    /// 组合报工: 校验配额 → 提交良品/判废 → 确认超产时生成事件
    pub fn report_production(&self, request: ReportRequest) -> ApiResult<ReportOutcome> {
        let good = non_negative(request.good, "良品")?;
        let scrap = non_negative(request.scrap, "判废")?;
        if good == 0 && scrap == 0 {
            return Err(ApiError::InvalidDelta("良品与判废不能同时为0".to_string()));
        }

        let order_id = request.order_id.as_str();
        let operation_code = request.operation_code.as_str();
        let order = self.find_order_with_operation(order_id, operation_code)?;
        let mode = self.reporting_settings()?.sequence_mode;

        let mut state = self.lock_state()?;
        let snapshot = state.ledger.snapshot(order_id);
        let quota = self.resolver.compute_quota(&order, &snapshot, operation_code)?;

        let decision = if good == 0 {
            ReportDecision::Ok {
                remaining: quota.remaining,
            }
        } else {
            self.classify(mode, quota, good, request.override_confirmed)
        };

        let mut unconfirmed_excess = 0;
        if let ReportDecision::NeedsConfirm { excess, remaining } = decision {
            if mode == SequenceMode::Block {
                info!(order_id, operation_code, good, remaining, excess, "报工超出剩余配额，需确认");
                return Ok(ReportOutcome::NeedsConfirm { remaining, excess });
            }
            warn!(order_id, operation_code, good, remaining, excess, "报工超出剩余配额（告警模式，直接入账）");
            unconfirmed_excess = excess;
        }

        // 本次良品一并计入可用量
        let previous = snapshot.entry(operation_code);
        self.validator
            .check_scrap_available(previous.final_good().saturating_add(good), scrap)?;

        let mut entry = previous.clone();
        if good > 0 {
            entry = state.ledger.commit_good(order_id, operation_code, good)?;
        }
        let mut scrap_applied = 0;
        if scrap > 0 {
            let committed = match state.ledger.commit_scrap(order_id, operation_code, scrap) {
                Ok(committed) => committed,
                Err(e) => {
                    state.ledger.restore(previous);
                    return Err(e.into());
                }
            };
            entry = committed.0;
            scrap_applied = committed.1;
        }
        self.persist_entry(&mut state, &entry, previous.clone())?;

        let event = match decision {
            ReportDecision::Confirmed { .. } => {
                let details = OverproductionDetails {
                    order_id: order_id.to_string(),
                    operation_code: operation_code.to_string(),
                    machine_id: request.machine_id.clone(),
                    cap: quota.cap,
                    remaining: quota.remaining,
                    requested_good: good,
                    produced_good: previous.good,
                    produced_scrap: previous.scrap,
                };
                match self.insert_event(&mut state, details) {
                    Ok(event) => Some(event),
                    Err(e) => {
                        // 事件写入失败，台账一并回滚
                        state.ledger.restore(previous.clone());
                        if let Err(rollback_err) = self.ledger_repo.save(&previous) {
                            error!(order_id, operation_code, error = %rollback_err, "台账回滚写入失败");
                        }
                        return Err(e);
                    }
                }
            }
            _ => None,
        };

        info!(
            order_id,
            operation_code,
            machine_id = %request.machine_id,
            good,
            scrap_applied,
            final_good = entry.final_good(),
            "报工已入账"
        );

        Ok(ReportOutcome::Committed(ReportReceipt {
            entry,
            decision,
            scrap_applied,
            event,
            unconfirmed_excess,
        }))
    }

    fn persist_entry(&self, state: &mut CoreState, entry: &LedgerEntry, previous: LedgerEntry) -> ApiResult<()> {
        if let Err(e) = self.ledger_repo.save(entry) {
            error!(
                order_id = %entry.order_id,
                operation_code = %entry.operation_code,
                error = %e,
                "台账写入失败，回滚内存"
            );
            state.ledger.restore(previous);
            return Err(e.into());
        }
        Ok(())
    }

    // ==========================================
    // 超产事件
    // ==========================================

    /// 直接创建超产事件
    pub fn create_overproduction_event(&self, details: OverproductionDetails) -> ApiResult<OverproductionEvent> {
        let mut state = self.lock_state()?;
        self.insert_event(&mut state, details)
    }

    fn insert_event(&self, state: &mut CoreState, details: OverproductionDetails) -> ApiResult<OverproductionEvent> {
        let event = state.events.create(details, self.clock.now_ms());
        if let Err(e) = self.event_repo.save(&event) {
            error!(event_id = %event.id, error = %e, "超产事件写入失败，回滚");
            state.events.discard(&event.id);
            return Err(e.into());
        }
        state.scheduler.schedule(&event);
        Ok(event)
    }

    /// 主管处理事件
    ///
    /// should_notify_resolution 为 true 时，处理完成通知进入队列，
    /// 由下一次 tick 返回，或由 take_resolution_notice 立即取走
    pub fn resolve_event(&self, event_id: &str, reason: &str) -> ApiResult<ResolveOutcome> {
        let mut state = self.lock_state()?;
        let previous = state
            .events
            .get(event_id)
            .cloned()
            .ok_or_else(|| ApiError::EventNotFound(event_id.to_string()))?;

        let outcome = state.events.resolve(event_id, reason, self.clock.now_ms())?;
        if let Err(e) = self.event_repo.save(&outcome.event) {
            // 截止时间仍在堆中，只需恢复事件本身
            error!(event_id, error = %e, "事件处理结果写入失败，回滚");
            state.events.restore(previous);
            return Err(e.into());
        }
        if outcome.should_notify_resolution {
            state.resolution_queue.push(EscalationNotice {
                kind: NoticeKind::ResolutionNotice,
                event: outcome.event.clone(),
            });
        }
        Ok(outcome)
    }

    /// 取走指定事件排队中的处理完成通知
    pub fn take_resolution_notice(&self, event_id: &str) -> ApiResult<Option<EscalationNotice>> {
        let mut state = self.lock_state()?;
        let position = state
            .resolution_queue
            .iter()
            .position(|n| n.event.id == event_id);
        Ok(position.map(|i| state.resolution_queue.remove(i)))
    }

    /// 升级调度
    ///
    /// 返回本次需要发送的通知: 先是排队的处理完成通知，再是到期的升级通知
    /// 写入失败的事件回退为未通知，下次 tick 重试
    pub fn tick(&self, now_ms: i64) -> ApiResult<Vec<EscalationNotice>> {
        let threshold = self.escalation_settings()?.escalation_threshold_minutes;

        let mut state = self.lock_state()?;
        let state = &mut *state;
        let fired = state.scheduler.tick(&mut state.events, now_ms, threshold);

        let mut notices: Vec<EscalationNotice> = state.resolution_queue.drain(..).collect();
        notices.reserve(fired.len());
        for notice in fired {
            match self.event_repo.save(&notice.event) {
                Ok(()) => notices.push(notice),
                Err(e) => {
                    error!(event_id = %notice.event.id, error = %e, "升级标记写入失败，待下次重试");
                    let mut previous = notice.event;
                    previous.escalation_notified = false;
                    previous.escalation_notice_timestamp = None;
                    state.scheduler.schedule(&previous);
                    state.events.restore(previous);
                }
            }
        }
        Ok(notices)
    }

    /// 按当前时钟执行 tick
    pub fn tick_now(&self) -> ApiResult<Vec<EscalationNotice>> {
        self.tick(self.clock.now_ms())
    }

    /// 最近的升级截止时间
    pub fn next_deadline(&self) -> ApiResult<Option<i64>> {
        Ok(self.lock_state()?.scheduler.next_deadline())
    }

    pub fn get_event(&self, event_id: &str) -> ApiResult<OverproductionEvent> {
        self.lock_state()?
            .events
            .get(event_id)
            .cloned()
            .ok_or_else(|| ApiError::EventNotFound(event_id.to_string()))
    }

    /// 待处理事件（最新在前）
    pub fn pending_events(&self) -> ApiResult<Vec<OverproductionEvent>> {
        Ok(self.lock_state()?.events.pending())
    }

    /// 已处理事件（最新在前）
    pub fn resolved_events(&self) -> ApiResult<Vec<OverproductionEvent>> {
        Ok(self.lock_state()?.events.resolved())
    }

    // ==========================================
    // 看板查询
    // ==========================================

    pub fn operation_board(&self, order_id: &str) -> ApiResult<Vec<OperationStatusRow>> {
        let order = self.find_order(order_id)?;
        let settings = self.reporting_settings()?;
        let snapshot = self.ledger_snapshot(order_id)?;
        Ok(summary::operation_board(&order, &snapshot, &settings)?)
    }

    pub fn order_summary(&self, order_id: &str) -> ApiResult<OrderSummary> {
        let order = self.find_order(order_id)?;
        let snapshot = self.ledger_snapshot(order_id)?;
        Ok(summary::order_summary(&order, &snapshot))
    }

    // ==========================================
    // 重置
    // ==========================================

    /// 清除单个订单的台账（事件保留），返回清除条数
    pub fn reset_order(&self, order_id: &str) -> ApiResult<usize> {
        let mut state = self.lock_state()?;
        self.ledger_repo.delete_order(order_id)?;
        let removed = state.ledger.remove_order(order_id).len();
        info!(order_id, removed, "订单台账已重置");
        Ok(removed)
    }

    /// 全量重置: 台账与全部事件
    ///
    /// 存储侧在同一事务内删除，成功后才清空内存
    pub fn reset_all(&self) -> ApiResult<()> {
        let mut state = self.lock_state()?;
        let removed = self.store.delete_prefixes(&[LEDGER_PREFIX, EVENT_PREFIX])?;
        state.ledger.clear();
        state.events.clear();
        state.scheduler.clear();
        state.resolution_queue.clear();
        warn!(removed, "全量重置完成");
        Ok(())
    }
}

fn non_negative(value: i64, label: &str) -> ApiResult<u64> {
    u64::try_from(value).map_err(|_| ApiError::InvalidDelta(format!("{}数量不能为负数: {}", label, value)))
}

fn positive(value: i64, label: &str) -> ApiResult<u64> {
    match non_negative(value, label)? {
        0 => Err(ApiError::InvalidDelta(format!("{}增量必须大于0", label))),
        v => Ok(v),
    }
}
