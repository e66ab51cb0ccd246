//! Shared fixtures: a fully wired engine over the in-memory store and the
//! scripted transport.

use std::sync::Arc;

use async_trait::async_trait;
use gw_01_transaction_ledger::{InMemoryStore, LedgerService, RetryPolicy};
use gw_02_negotiation_client::testing::ScriptedTransport;
use gw_02_negotiation_client::NegotiationClient;
use gw_03_grid_ranking::RankingService;
use gw_04_flow_driver::FlowDriver;
use gw_05_job_processor::{JobProcessor, ProcessorConfig, Summarizer, SummarizerError};
use shared_types::{Action, ContextBuilder, ZoneRecord};

/// Summarizer double: fixed text, or a scripted failure.
pub struct FixedSummarizer(pub Option<String>);

#[async_trait]
impl Summarizer for FixedSummarizer {
    async fn summarize(&self, _prompt: &str) -> Result<String, SummarizerError> {
        match &self.0 {
            Some(text) => Ok(text.clone()),
            None => Err(SummarizerError("model offline".to_string())),
        }
    }
}

/// Everything a cross-subsystem test needs, wired the way the runtime
/// wires production (same graph, test adapters).
pub struct TestEngine {
    pub transport: Arc<ScriptedTransport>,
    pub ledger: LedgerService,
    pub ranking: RankingService,
    pub driver: Arc<FlowDriver>,
    pub processor: Arc<JobProcessor>,
}

impl TestEngine {
    pub fn new() -> Self {
        Self::with_summarizer(Arc::new(FixedSummarizer(Some("ok".to_string()))))
    }

    pub fn with_summarizer(summarizer: Arc<dyn Summarizer>) -> Self {
        let transport = Arc::new(ScriptedTransport::new());
        let ledger = LedgerService::new(Arc::new(InMemoryStore::new()));
        seed_zones(&ledger);

        let builder = ContextBuilder::new("energy:compute", "bap.test", "https://bap.test");
        let client = NegotiationClient::new(
            Arc::clone(&transport) as Arc<dyn gw_02_negotiation_client::ProtocolTransport>,
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
            ranking.clone(),
            summarizer,
            ProcessorConfig {
                poll_interval_secs: 1,
                batch_size: 8,
            },
        ));

        Self {
            transport,
            ledger,
            ranking,
            driver,
            processor,
        }
    }
}

impl Default for TestEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn seed_zones(ledger: &LedgerService) {
    for (zone_id, name) in [
        ("zone-north", "North Grid"),
        ("zone-south", "South Grid"),
    ] {
        ledger
            .put_zone(&ZoneRecord {
                zone_id: zone_id.to_string(),
                name: name.to_string(),
                region: "test".to_string(),
            })
            .unwrap();
    }
}

/// Catalog item with the grid attributes in its tags.
pub fn catalog_item(id: &str, renewable: f64, carbon: f64) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "tags": {
            "zone": "North Grid",
            "renewable_mix_percent": renewable,
            "carbon_intensity": carbon,
            "available_capacity_kw": 250,
        }
    })
}

/// `message` half of an on_discover payload.
pub fn catalog_message(items: Vec<serde_json::Value>) -> serde_json::Value {
    serde_json::json!({"catalog": {"providers": [
        {"id": "bpp-1", "uri": "https://bpp-1.example", "items": items}
    ]}})
}

/// Script a full in-band chain: the counterparty echoes each step.
pub fn script_full_sync_chain(transport: &ScriptedTransport, items: Vec<serde_json::Value>) {
    transport.push_reply(
        200,
        ScriptedTransport::sync_body(Action::Discover, "t", catalog_message(items)),
    );
    transport.push_reply(
        200,
        ScriptedTransport::sync_body(
            Action::Select,
            "t",
            serde_json::json!({"order": {"quote": {"id": "quote-1"}}}),
        ),
    );
    transport.push_reply(
        200,
        ScriptedTransport::sync_body(
            Action::Init,
            "t",
            serde_json::json!({"order": {"id": "order-1"}}),
        ),
    );
    transport.push_reply(
        200,
        ScriptedTransport::sync_body(
            Action::Confirm,
            "t",
            serde_json::json!({"order": {"id": "order-1", "state": "CONFIRMED"}}),
        ),
    );
}
