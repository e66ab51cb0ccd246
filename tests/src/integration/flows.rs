//! Flow chaining, halting, races, and reaping across subsystems.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use gw_04_flow_driver::{CandidatePolicy, FlowOutcome};
    use shared_types::{FlowState, StepStatus, Workload, WorkloadStatus};

    use crate::integration::fixtures::{
        catalog_item, catalog_message, script_full_sync_chain, TestEngine,
    };

    #[tokio::test]
    async fn test_fully_synchronous_counterparty_confirms_in_one_call() {
        let engine = TestEngine::new();
        script_full_sync_chain(
            &engine.transport,
            vec![catalog_item("item-1", 80.0, 100.0)],
        );

        let workload = Workload::new("wl-1", serde_json::json!({"cpu_kw": 64}));
        let outcome = engine
            .driver
            .drive_synchronous(&workload, CandidatePolicy::FirstItem)
            .await
            .unwrap();

        let FlowOutcome::Confirmed { transaction_id, .. } = outcome else {
            panic!("expected Confirmed");
        };

        // One ledger row, one transaction id, four completed steps.
        let record = engine
            .ledger
            .get_transaction(&transaction_id)
            .unwrap()
            .unwrap();
        assert_eq!(record.state, FlowState::Confirmed);
        assert_eq!(record.steps.len(), 4);
        assert!(record
            .steps
            .iter()
            .all(|s| s.status == StepStatus::Completed));
        for (action, _) in engine.transport.calls() {
            let sent = record.step(action.as_str()).unwrap();
            assert_eq!(
                sent.request["context"]["transaction_id"],
                transaction_id.as_str()
            );
        }
        assert_eq!(
            engine.transport.dispatched_actions(),
            vec!["discover", "select", "init", "confirm"]
        );
    }

    #[tokio::test]
    async fn test_ack_only_counterparty_advances_one_step_per_callback() {
        let engine = TestEngine::new();

        let workload = Workload::new("wl-1", serde_json::json!({}));
        let pending = engine
            .driver
            .drive_synchronous(&workload, CandidatePolicy::TopRanked)
            .await
            .unwrap();
        assert!(matches!(pending, FlowOutcome::Pending { .. }));
        let txn = pending.transaction_id().to_string();
        assert_eq!(engine.transport.dispatched_actions(), vec!["discover"]);

        // Each callback completes the in-flight step and issues exactly the
        // next action, which the ack-only counterparty accepts as pending.
        let steps: Vec<(&str, serde_json::Value)> = vec![
            (
                "on_discover",
                catalog_message(vec![catalog_item("item-1", 60.0, 30.0)]),
            ),
            (
                "on_select",
                serde_json::json!({"order": {"quote": {"id": "q"}}}),
            ),
            ("on_init", serde_json::json!({"order": {"id": "o"}})),
        ];
        for (callback, message) in steps {
            let outcome = engine
                .driver
                .drive_from_callback(&txn, callback, serde_json::json!({"message": message}))
                .await
                .unwrap();
            assert!(matches!(outcome, FlowOutcome::Pending { .. }));
        }

        let outcome = engine
            .driver
            .drive_from_callback(
                &txn,
                "on_confirm",
                serde_json::json!({"message": {"order": {"id": "o", "state": "CONFIRMED"}}}),
            )
            .await
            .unwrap();
        assert!(matches!(outcome, FlowOutcome::Confirmed { .. }));

        assert_eq!(
            engine.transport.dispatched_actions(),
            vec!["discover", "select", "init", "confirm"]
        );
        let record = engine.ledger.get_transaction(&txn).unwrap().unwrap();
        assert_eq!(record.state, FlowState::Confirmed);
        assert_eq!(record.completed_steps(), 4);
    }

    #[tokio::test]
    async fn test_step_failure_halts_one_flow_without_touching_siblings() {
        let engine = TestEngine::new();

        // wl-a: discover ok, select rejected. wl-b: full chain.
        engine.transport.push_reply(
            200,
            gw_02_negotiation_client::testing::ScriptedTransport::sync_body(
                shared_types::Action::Discover,
                "t",
                catalog_message(vec![catalog_item("item-1", 50.0, 50.0)]),
            ),
        );
        engine.transport.push_reply(500, serde_json::Value::Null);
        script_full_sync_chain(&engine.transport, vec![catalog_item("item-2", 70.0, 10.0)]);

        engine
            .ledger
            .upsert_workload(&Workload::new("wl-a", serde_json::json!({})))
            .unwrap();
        engine
            .ledger
            .upsert_workload(&Workload::new("wl-b", serde_json::json!({})))
            .unwrap();

        engine.processor.process_batch().await.unwrap();

        let failed = engine.ledger.get_workload("wl-a").unwrap().unwrap();
        assert_eq!(failed.status, WorkloadStatus::Failed);
        assert!(failed.error.as_deref().unwrap().contains("500"));

        let done = engine.ledger.get_workload("wl-b").unwrap().unwrap();
        assert_eq!(done.status, WorkloadStatus::Processed);
        assert_eq!(done.recommendations.len(), 3);
    }

    #[tokio::test]
    async fn test_concurrent_callbacks_converge_on_one_row() {
        let engine = TestEngine::new();

        let workload = Workload::new("wl-1", serde_json::json!({}));
        let pending = engine
            .driver
            .drive_synchronous(&workload, CandidatePolicy::TopRanked)
            .await
            .unwrap();
        let txn = pending.transaction_id().to_string();

        let payload = serde_json::json!({
            "context": {"action": "on_discover", "transaction_id": txn},
            "message": catalog_message(vec![catalog_item("item-1", 40.0, 20.0)]),
        });

        // Duplicate delivery racing on the same transaction id.
        let mut handles = Vec::new();
        for _ in 0..4 {
            let driver = Arc::clone(&engine.driver);
            let txn = txn.clone();
            let payload = payload.clone();
            handles.push(tokio::spawn(async move {
                driver.drive_from_callback(&txn, "on_discover", payload).await
            }));
        }

        let mut applied = 0;
        let mut ignored = 0;
        for handle in handles {
            match handle.await.unwrap().unwrap() {
                FlowOutcome::Ignored { .. } => ignored += 1,
                _ => applied += 1,
            }
        }
        assert_eq!(applied, 1);
        assert_eq!(ignored, 3);

        // Exactly one select went out, and the row advanced exactly once.
        assert_eq!(
            engine.transport.dispatched_actions(),
            vec!["discover", "select"]
        );
        let record = engine.ledger.get_transaction(&txn).unwrap().unwrap();
        assert_eq!(record.state, FlowState::Selecting);
        assert_eq!(
            record
                .steps
                .iter()
                .filter(|s| s.action == "discover")
                .count(),
            1
        );
    }

    #[tokio::test]
    async fn test_reaper_only_touches_stalled_pending_flows() {
        let engine = TestEngine::new();

        // A pending flow, artificially aged.
        let workload = Workload::new("wl-1", serde_json::json!({}));
        let pending = engine
            .driver
            .drive_synchronous(&workload, CandidatePolicy::FirstItem)
            .await
            .unwrap();
        let txn = pending.transaction_id().to_string();
        let mut record = engine.ledger.get_transaction(&txn).unwrap().unwrap();
        record.updated_at = chrono::Utc::now() - chrono::Duration::minutes(30);
        engine.ledger.upsert_transaction(&record).unwrap();

        // A confirmed flow, also old, must stay untouched.
        script_full_sync_chain(&engine.transport, vec![catalog_item("item-1", 50.0, 10.0)]);
        let confirmed = engine
            .driver
            .drive_synchronous(&Workload::new("wl-2", serde_json::json!({})), CandidatePolicy::FirstItem)
            .await
            .unwrap();
        let confirmed_txn = confirmed.transaction_id().to_string();
        let mut old_confirmed = engine
            .ledger
            .get_transaction(&confirmed_txn)
            .unwrap()
            .unwrap();
        old_confirmed.updated_at = chrono::Utc::now() - chrono::Duration::minutes(30);
        engine.ledger.upsert_transaction(&old_confirmed).unwrap();

        let reaped = engine
            .driver
            .reap_stalled(chrono::Duration::minutes(5))
            .await
            .unwrap();
        assert_eq!(reaped, 1);

        assert_eq!(
            engine.ledger.get_transaction(&txn).unwrap().unwrap().state,
            FlowState::TimedOut
        );
        assert_eq!(
            engine
                .ledger
                .get_transaction(&confirmed_txn)
                .unwrap()
                .unwrap()
                .state,
            FlowState::Confirmed
        );

        // A late callback after the timeout is dropped.
        let late = engine
            .driver
            .drive_from_callback(
                &txn,
                "on_discover",
                serde_json::json!({"message": catalog_message(vec![catalog_item("x", 1.0, 1.0)])}),
            )
            .await
            .unwrap();
        assert!(matches!(late, FlowOutcome::Ignored { .. }));
    }
}
