//! Callback routes and handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use gw_04_flow_driver::FlowDriver;
use gw_05_job_processor::JobProcessor;
use tower_http::trace::TraceLayer;

/// Shared handler state.
#[derive(Clone)]
pub struct GatewayState {
    /// Resumes flows from callbacks.
    pub driver: Arc<FlowDriver>,
    /// Finalizes workloads once a resumed flow reaches its outcome.
    pub processor: Arc<JobProcessor>,
}

/// Build the callback router. One handler serves every `on_*` route; the
/// envelope's `context.action` names the callback, which keeps route
/// registration and payload validation from drifting apart.
pub fn build_router(state: GatewayState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/on_discover", post(on_callback))
        .route("/on_select", post(on_callback))
        .route("/on_init", post(on_callback))
        .route("/on_confirm", post(on_callback))
        .route("/on_status", post(on_callback))
        .route("/on_update", post(on_callback))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

async fn on_callback(
    State(state): State<GatewayState>,
    Json(body): Json<serde_json::Value>,
) -> Json<serde_json::Value> {
    let context = &body["context"];
    let Some(transaction_id) = non_empty(context["transaction_id"].as_str()) else {
        tracing::warn!("[gw-06] Rejecting callback without transaction id");
        return nack("context.transaction_id is required");
    };
    let Some(callback) = non_empty(context["action"].as_str()) else {
        tracing::warn!(
            "[gw-06] Rejecting callback without action (txn: {})",
            transaction_id
        );
        return nack("context.action is required");
    };

    tracing::info!(
        "[gw-06] Received {} (txn: {})",
        callback,
        transaction_id
    );

    // Acknowledge now, continue the flow off the request path.
    let driver = Arc::clone(&state.driver);
    let processor = Arc::clone(&state.processor);
    let transaction_id = transaction_id.to_string();
    let callback = callback.to_string();
    tokio::spawn(async move {
        match driver
            .drive_from_callback(&transaction_id, &callback, body)
            .await
        {
            Ok(outcome) => processor.finalize(&outcome).await,
            Err(e) => {
                tracing::warn!(
                    "[gw-06] Callback {} not applied (txn: {}): {}",
                    callback,
                    transaction_id,
                    e
                );
            }
        }
    });

    ack()
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.trim().is_empty())
}

fn ack() -> Json<serde_json::Value> {
    Json(serde_json::json!({"message": {"ack": {"status": "ACK"}}}))
}

fn nack(reason: &str) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "message": {"ack": {"status": "NACK"}},
        "error": {"message": reason},
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use gw_01_transaction_ledger::{InMemoryStore, LedgerService, RetryPolicy};
    use gw_02_negotiation_client::testing::ScriptedTransport;
    use gw_02_negotiation_client::NegotiationClient;
    use gw_03_grid_ranking::RankingService;
    use gw_04_flow_driver::CandidatePolicy;
    use gw_05_job_processor::{ProcessorConfig, Summarizer, SummarizerError};
    use http_body_util::BodyExt;
    use serde_json::json;
    use shared_types::{ContextBuilder, FlowState, Workload};
    use tower::ServiceExt;

    struct NoopSummarizer;

    #[async_trait]
    impl Summarizer for NoopSummarizer {
        async fn summarize(&self, _prompt: &str) -> Result<String, SummarizerError> {
            Ok("ok".to_string())
        }
    }

    fn gateway(transport: Arc<ScriptedTransport>) -> (Router, Arc<FlowDriver>, LedgerService) {
        let ledger = LedgerService::new(Arc::new(InMemoryStore::new()));
        let builder = ContextBuilder::new("energy:compute", "bap.test", "https://bap.test");
        let client = NegotiationClient::new(
            transport,
            ledger.clone(),
            builder,
            RetryPolicy::default(),
        );
        let ranking = RankingService::new(ledger.clone());
        let driver = Arc::new(FlowDriver::new(
            client,
            ranking.clone(),
            ledger.clone(),
            RetryPolicy::default(),
            "bap.test",
        ));
        let processor = Arc::new(JobProcessor::new(
            ledger.clone(),
            Arc::clone(&driver),
            ranking,
            Arc::new(NoopSummarizer),
            ProcessorConfig::default(),
        ));
        let router = build_router(GatewayState {
            driver: Arc::clone(&driver),
            processor,
        });
        (router, driver, ledger)
    }

    async fn post_json(router: Router, path: &str, body: serde_json::Value) -> serde_json::Value {
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
    async fn test_healthz() {
        let (router, _driver, _ledger) = gateway(Arc::new(ScriptedTransport::new()));
        let response = router
            .oneshot(
                axum::http::Request::builder()
                    .uri("/healthz")
                    .body(axum::body::Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), axum::http::StatusCode::OK);
    }

    #[tokio::test]
    async fn test_missing_transaction_id_is_nacked() {
        let (router, _driver, _ledger) = gateway(Arc::new(ScriptedTransport::new()));
        let reply = post_json(
            router,
            "/on_discover",
            json!({"context": {"action": "on_discover"}, "message": {}}),
        )
        .await;
        assert_eq!(reply["message"]["ack"]["status"], "NACK");
        assert!(reply["error"]["message"].is_string());
    }

    #[tokio::test]
    async fn test_callback_acks_and_resumes_flow() {
        let transport = Arc::new(ScriptedTransport::new());
        let (router, driver, ledger) = gateway(Arc::clone(&transport));

        // Seed a pending flow awaiting on_discover.
        let workload = Workload::new("wl-1", json!({"cpu_kw": 10}));
        ledger.upsert_workload(&workload).unwrap();
        let pending = driver
            .drive_synchronous(&workload, CandidatePolicy::FirstItem)
            .await
            .unwrap();
        let txn = pending.transaction_id().to_string();

        let reply = post_json(
            router,
            "/on_discover",
            json!({
                "context": {"action": "on_discover", "transaction_id": txn},
                "message": {"catalog": {"providers": [{
                    "id": "bpp-1",
                    "items": [{"id": "item-1", "tags": {
                        "zone": "North Grid",
                        "renewable_mix_percent": 70,
                        "carbon_intensity": 90,
                    }}]
                }]}}
            }),
        )
        .await;
        assert_eq!(reply["message"]["ack"]["status"], "ACK");

        // The continuation runs on a spawned task; poll briefly.
        let mut state = FlowState::Discovering;
        for _ in 0..50 {
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            state = ledger.get_transaction(&txn).unwrap().unwrap().state;
            if state == FlowState::Selecting {
                break;
            }
        }
        assert_eq!(state, FlowState::Selecting);
        assert_eq!(
            transport.dispatched_actions(),
            vec!["discover", "select"]
        );
    }
}
