// ==========================================
// 升级通知任务测试
// ==========================================
// 职责: 验证 tick → 投递、主/备渠道切换、处理完成通知、停机
// ==========================================

#[path = "test_helpers.rs"]
mod test_helpers;

#[cfg(test)]
mod escalation_worker_test {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;
    use shopfloor_quota::engine::{EscalationNotice, ManualClock, NoticeKind};
    use shopfloor_quota::notify::{
        FallbackSender, NotificationSender, NotifyError, NotifyResult, OutboxFileSender,
    };
    use shopfloor_quota::services::{EscalationWorker, TickReport};
    use tempfile::TempDir;
    use tokio::sync::watch;

    use crate::test_helpers::{create_test_db, open_state, report, MINUTE_MS, T0};

    /// 记录投递内容，可配置为总是失败
    struct ScriptedSender {
        fail: bool,
        sent: Mutex<Vec<EscalationNotice>>,
    }

    impl ScriptedSender {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                fail,
                sent: Mutex::new(Vec::new()),
            })
        }

        fn kinds(&self) -> Vec<NoticeKind> {
            self.sent.lock().unwrap().iter().map(|n| n.kind).collect()
        }
    }

    #[async_trait]
    impl NotificationSender for ScriptedSender {
        fn channel(&self) -> &str {
            "scripted"
        }

        async fn send(&self, notice: &EscalationNotice) -> NotifyResult<()> {
            if self.fail {
                return Err(NotifyError::channel("scripted", "smtp unreachable"));
            }
            self.sent.lock().unwrap().push(notice.clone());
            Ok(())
        }
    }

    /// 创建一个在 T0 确认超产的事件，返回事件 ID
    fn seed_event(api: &shopfloor_quota::ProductionApi) -> String {
        api.commit_good("VIGA001", "10", 10).unwrap();
        match api.report_production(report("VIGA001", "10", 1, 0, true)).unwrap() {
            shopfloor_quota::ReportOutcome::Committed(receipt) => receipt.event.unwrap().id,
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_run_once_delivers_each_notice_once() {
        let (_tmp, db_path) = create_test_db().unwrap();
        let clock = Arc::new(ManualClock::new(T0));
        let state = open_state(&db_path, clock.clone());
        let sender = ScriptedSender::new(false);
        let worker = EscalationWorker::new(state.production_api.clone(), sender.clone());

        let event_id = seed_event(&state.production_api);

        clock.set(T0 + 4 * MINUTE_MS);
        assert_eq!(worker.run_once().await.unwrap(), TickReport::default());

        clock.set(T0 + 5 * MINUTE_MS);
        assert_eq!(
            worker.run_once().await.unwrap(),
            TickReport { delivered: 1, failed: 0 }
        );
        assert_eq!(worker.run_once().await.unwrap(), TickReport::default());

        let sent = sender.sent.lock().unwrap().clone();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].event.id, event_id);
        assert!(sent[0].event.escalation_notified);
    }

    #[tokio::test]
    async fn test_primary_failure_falls_back_to_outbox() {
        let (_tmp, db_path) = create_test_db().unwrap();
        let clock = Arc::new(ManualClock::new(T0));
        let state = open_state(&db_path, clock.clone());
        let outbox_dir = TempDir::new().unwrap();
        let outbox_path = outbox_dir.path().join("outbox.jsonl");

        let sender = Arc::new(FallbackSender::new(
            ScriptedSender::new(true),
            Arc::new(OutboxFileSender::new(&outbox_path)),
        ));
        let worker = EscalationWorker::new(state.production_api.clone(), sender);
        let event_id = seed_event(&state.production_api);

        clock.set(T0 + 6 * MINUTE_MS);
        assert_eq!(
            worker.run_once().await.unwrap(),
            TickReport { delivered: 1, failed: 0 }
        );

        let content = std::fs::read_to_string(&outbox_path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 1);
        let line: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(line["kind"], "notice");
        assert_eq!(line["event"]["id"], event_id.as_str());
    }

    #[tokio::test]
    async fn test_delivery_failure_does_not_roll_back_event_state() {
        let (_tmp, db_path) = create_test_db().unwrap();
        let clock = Arc::new(ManualClock::new(T0));
        let state = open_state(&db_path, clock.clone());
        let sender = Arc::new(FallbackSender::new(
            ScriptedSender::new(true),
            ScriptedSender::new(true),
        ));
        let worker = EscalationWorker::new(state.production_api.clone(), sender);
        let event_id = seed_event(&state.production_api);

        clock.set(T0 + 6 * MINUTE_MS);
        assert_eq!(
            worker.run_once().await.unwrap(),
            TickReport { delivered: 0, failed: 1 }
        );
        assert!(state.production_api.get_event(&event_id).unwrap().escalation_notified);
    }

    #[tokio::test]
    async fn test_resolve_and_notify_only_after_escalation() {
        let (_tmp, db_path) = create_test_db().unwrap();
        let clock = Arc::new(ManualClock::new(T0));
        let state = open_state(&db_path, clock.clone());
        let sender = ScriptedSender::new(false);
        let worker = EscalationWorker::new(state.production_api.clone(), sender.clone());

        // 未升级即处理: 不发通知
        let quiet_id = seed_event(&state.production_api);
        let report = worker.resolve_and_notify(&quiet_id, "OTHER").await.unwrap();
        assert!(!report.outcome.should_notify_resolution);
        assert!(sender.kinds().is_empty());

        // 升级后处理: 发送一次处理完成通知
        clock.set(T0 + MINUTE_MS);
        let escalated_id = match state
            .production_api
            .report_production(crate::test_helpers::report("VIGA001", "10", 1, 0, true))
            .unwrap()
        {
            shopfloor_quota::ReportOutcome::Committed(receipt) => receipt.event.unwrap().id,
            other => panic!("unexpected outcome: {:?}", other),
        };
        clock.set(T0 + 7 * MINUTE_MS);
        worker.run_once().await.unwrap();
        clock.set(T0 + 9 * MINUTE_MS);
        let report = worker
            .resolve_and_notify(&escalated_id, "ERP_QUANTITY_OUTDATED")
            .await
            .unwrap();
        assert!(report.outcome.should_notify_resolution);
        assert!(report.delivery_error.is_none());
        assert_eq!(report.outcome.event.response_ms, Some(8 * MINUTE_MS));
        assert_eq!(sender.kinds(), vec![NoticeKind::Notice, NoticeKind::ResolutionNotice]);
        assert_eq!(worker.run_once().await.unwrap(), TickReport::default());

        assert!(worker.resolve_and_notify(&escalated_id, "OTHER").await.is_err());
        assert_eq!(sender.kinds().len(), 2);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown_signal() {
        let (_tmp, db_path) = create_test_db().unwrap();
        let state = open_state(&db_path, Arc::new(ManualClock::new(T0)));
        let worker = Arc::new(EscalationWorker::new(
            state.production_api.clone(),
            ScriptedSender::new(false),
        ));

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = {
            let worker = worker.clone();
            tokio::spawn(async move { worker.run(shutdown_rx).await })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("升级任务未在超时内退出")
            .unwrap();
    }
}
