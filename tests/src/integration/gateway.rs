//! Inbound callback surface, exercised in-process.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use gw_04_flow_driver::CandidatePolicy;
    use gw_06_callback_gateway::{build_router, GatewayState};
    use http_body_util::BodyExt;
    use shared_types::{Workload, WorkloadStatus};
    use tower::ServiceExt;

    use crate::integration::fixtures::{catalog_item, catalog_message, TestEngine};

    fn router(engine: &TestEngine) -> axum::Router {
        build_router(GatewayState {
            driver: Arc::clone(&engine.driver),
            processor: Arc::clone(&engine.processor),
        })
    }

    async fn post_json(
        router: axum::Router,
        path: &str,
        body: serde_json::Value,
    ) -> serde_json::Value {
        let response = router
            .oneshot(
                axum::http::Request::builder()
                    .method("POST")
                    .uri(path)
                    .header("content-type", "application/json")
                    .body(axum::body::Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_every_callback_route_acks() {
        let engine = TestEngine::new();
        for path in [
            "/on_discover",
            "/on_select",
            "/on_init",
            "/on_confirm",
            "/on_status",
            "/on_update",
        ] {
            let reply = post_json(
                router(&engine),
                path,
                serde_json::json!({
                    "context": {
                        "action": path.trim_start_matches('/'),
                        "transaction_id": "txn-any",
                    },
                    "message": {}
                }),
            )
            .await;
            assert_eq!(reply["message"]["ack"]["status"], "ACK", "route {path}");
        }
    }

    #[tokio::test]
    async fn test_envelope_without_transaction_id_is_nacked() {
        let engine = TestEngine::new();
        let reply = post_json(
            router(&engine),
            "/on_select",
            serde_json::json!({"context": {"action": "on_select"}, "message": {}}),
        )
        .await;
        assert_eq!(reply["message"]["ack"]["status"], "NACK");
    }

    #[tokio::test]
    async fn test_full_async_negotiation_through_the_gateway() {
        let engine = TestEngine::new();

        // Submit and start: the counterparty only ever acks.
        let workload = Workload::new("wl-1", serde_json::json!({"gpu_kw": 30}));
        engine.ledger.upsert_workload(&workload).unwrap();
        let pending = engine
            .driver
            .drive_synchronous(&workload, CandidatePolicy::TopRanked)
            .await
            .unwrap();
        let txn = pending.transaction_id().to_string();

        let callbacks: Vec<(&str, serde_json::Value)> = vec![
            (
                "on_discover",
                catalog_message(vec![catalog_item("item-1", 75.0, 25.0)]),
            ),
            (
                "on_select",
                serde_json::json!({"order": {"quote": {"id": "q-1"}}}),
            ),
            ("on_init", serde_json::json!({"order": {"id": "o-1"}})),
            (
                "on_confirm",
                serde_json::json!({"order": {"id": "o-1", "state": "CONFIRMED"}}),
            ),
        ];
        for (callback, message) in callbacks {
            let reply = post_json(
                router(&engine),
                &format!("/{callback}"),
                serde_json::json!({
                    "context": {"action": callback, "transaction_id": txn},
                    "message": message,
                }),
            )
            .await;
            assert_eq!(reply["message"]["ack"]["status"], "ACK");

            // Handlers continue on a spawned task; wait for the step to land.
            for _ in 0..100 {
                tokio::time::sleep(std::time::Duration::from_millis(5)).await;
                let record = engine.ledger.get_transaction(&txn).unwrap().unwrap();
                let done = record
                    .step(callback.trim_start_matches("on_"))
                    .is_some_and(|s| s.status == shared_types::StepStatus::Completed);
                if done {
                    break;
                }
            }
        }

        // The confirm callback finalized the workload via the processor.
        let mut status = WorkloadStatus::Processing;
        for _ in 0..100 {
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            status = engine.ledger.get_workload("wl-1").unwrap().unwrap().status;
            if status == WorkloadStatus::Processed {
                break;
            }
        }
        assert_eq!(status, WorkloadStatus::Processed);

        let done = engine.ledger.get_workload("wl-1").unwrap().unwrap();
        assert_eq!(done.recommendations.len(), 3);
        assert_eq!(done.summary.as_deref(), Some("ok"));
        assert_eq!(
            engine.transport.dispatched_actions(),
            vec!["discover", "select", "init", "confirm"]
        );
    }
}
