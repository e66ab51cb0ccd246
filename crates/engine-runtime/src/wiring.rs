//! Dependency wiring.
//!
//! Builds the subsystem graph once at startup: store → ledger → client →
//! ranking → driver → processor/gateway. Everything downstream shares the
//! same ledger and driver instances.

use std::sync::Arc;

use gw_01_transaction_ledger::{Backoff, FileBackedStore, LedgerService, RetryPolicy};
use gw_02_negotiation_client::{HttpTransport, NegotiationClient};
use gw_03_grid_ranking::RankingService;
use gw_04_flow_driver::FlowDriver;
use gw_05_job_processor::{HttpSummarizer, JobProcessor, ProcessorConfig};
use gw_06_callback_gateway::GatewayState;
use shared_types::{ContextBuilder, ZoneRecord};

use crate::config::EngineConfig;

/// Default zone registry, seeded on first start. Placement still works for
/// catalogs naming other zones via the registry fallback.
const DEFAULT_ZONES: &[(&str, &str, &str)] = &[
    ("zone-north", "North Grid", "north"),
    ("zone-south", "South Grid", "south"),
    ("zone-east", "East Grid", "east"),
    ("zone-west", "West Grid", "west"),
];

/// The fully wired engine.
pub struct Engine {
    pub config: EngineConfig,
    pub ledger: LedgerService,
    pub driver: Arc<FlowDriver>,
    pub processor: Arc<JobProcessor>,
}

impl Engine {
    /// Wire every subsystem from configuration.
    pub fn build(config: EngineConfig) -> anyhow::Result<Self> {
        config.validate()?;

        let store = FileBackedStore::open(config.ledger_path())?;
        let ledger = LedgerService::new(Arc::new(store));
        Self::seed_zones(&ledger)?;

        let retry = RetryPolicy {
            max_attempts: config.ledger.retry_max_attempts,
            backoff: Backoff::Exponential {
                base: std::time::Duration::from_millis(50),
                cap: std::time::Duration::from_secs(2),
            },
        };

        let transport = HttpTransport::with_timeout(
            &config.counterparty.bpp_url,
            config.counterparty.request_timeout_secs,
        )?;
        let builder = ContextBuilder::new(
            &config.identity.domain,
            &config.identity.bap_id,
            &config.identity.bap_uri,
        );
        let client = NegotiationClient::new(Arc::new(transport), ledger.clone(), builder, retry);

        let ranking = RankingService::new(ledger.clone());
        let driver = Arc::new(FlowDriver::new(
            client,
            ranking.clone(),
            ledger.clone(),
            retry,
            &config.identity.bap_id,
        ));

        let summarizer =
            HttpSummarizer::new(&config.summarizer.base_url, &config.summarizer.model)?;
        let processor = Arc::new(JobProcessor::new(
            ledger.clone(),
            Arc::clone(&driver),
            ranking,
            Arc::new(summarizer),
            ProcessorConfig {
                poll_interval_secs: config.poller.poll_interval_secs,
                batch_size: config.poller.batch_size,
            },
        ));

        Ok(Self {
            config,
            ledger,
            driver,
            processor,
        })
    }

    /// Handler state for the callback gateway.
    pub fn gateway_state(&self) -> GatewayState {
        GatewayState {
            driver: Arc::clone(&self.driver),
            processor: Arc::clone(&self.processor),
        }
    }

    fn seed_zones(ledger: &LedgerService) -> anyhow::Result<()> {
        if ledger.first_zone()?.is_some() {
            return Ok(());
        }
        for (zone_id, name, region) in DEFAULT_ZONES {
            ledger.put_zone(&ZoneRecord {
                zone_id: zone_id.to_string(),
                name: name.to_string(),
                region: region.to_string(),
            })?;
        }
        tracing::info!("[runtime] Seeded {} default zones", DEFAULT_ZONES.len());
        Ok(())
    }
}
