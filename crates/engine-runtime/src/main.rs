//! GridWeave negotiation engine binary.
//!
//! Spawns three long-running tasks (the poll-driven job processor, the
//! stalled-flow reaper, and the callback gateway) and runs until Ctrl-C.

use std::sync::Arc;

use engine_runtime::{Engine, EngineConfig};
use gridweave_telemetry::{init_telemetry, TelemetryConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_telemetry(&TelemetryConfig::from_env())?;

    let config = EngineConfig::from_env();
    tracing::info!(
        "[runtime] Starting engine (bpp: {}, gateway: {})",
        config.counterparty.bpp_url,
        config.gateway.bind_addr
    );

    let engine = Engine::build(config)?;
    let gateway_addr = engine.config.gateway_addr()?;

    let poller = tokio::spawn(Arc::clone(&engine.processor).run());

    let reaper_driver = Arc::clone(&engine.driver);
    let reaper_config = engine.config.reaper.clone();
    let reaper = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(std::time::Duration::from_secs(
            reaper_config.interval_secs.max(1),
        ));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match reaper_driver
                .reap_stalled(chrono::Duration::seconds(reaper_config.deadline_secs as i64))
                .await
            {
                Ok(0) => {}
                Ok(n) => tracing::info!("[runtime] Reaper timed out {} flows", n),
                Err(e) => tracing::error!("[runtime] Reaper sweep failed: {}", e),
            }
        }
    });

    let gateway_state = engine.gateway_state();
    let gateway = tokio::spawn(async move {
        if let Err(e) = gw_06_callback_gateway::serve(gateway_addr, gateway_state).await {
            tracing::error!("[runtime] Gateway exited: {}", e);
        }
    });

    tokio::signal::ctrl_c().await?;
    tracing::info!("[runtime] Shutdown signal received");

    engine.processor.stop();
    reaper.abort();
    gateway.abort();
    let _ = poller.await;

    tracing::info!("[runtime] Engine stopped");
    Ok(())
}
