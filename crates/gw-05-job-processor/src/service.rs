//! The poll loop and per-workload pipeline.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use gw_01_transaction_ledger::LedgerService;
use gw_03_grid_ranking::RankingService;
use gw_04_flow_driver::{CandidatePolicy, FlowDriver, FlowOutcome};
use shared_types::{
    Action, FlowError, FlowResult, GridRecommendation, Workload, WorkloadStatus,
};

use crate::config::ProcessorConfig;
use crate::ports::{Summarizer, SUMMARY_PLACEHOLDER};

/// Batch processor for submitted workloads.
pub struct JobProcessor {
    ledger: LedgerService,
    driver: Arc<FlowDriver>,
    ranking: RankingService,
    summarizer: Arc<dyn Summarizer>,
    config: ProcessorConfig,
    is_active: AtomicBool,
}

impl JobProcessor {
    pub fn new(
        ledger: LedgerService,
        driver: Arc<FlowDriver>,
        ranking: RankingService,
        summarizer: Arc<dyn Summarizer>,
        config: ProcessorConfig,
    ) -> Self {
        Self {
            ledger,
            driver,
            ranking,
            summarizer,
            config: config.sanitized(),
            is_active: AtomicBool::new(true),
        }
    }

    /// Run the poll loop until [`JobProcessor::stop`] is called. Intended
    /// to be spawned as its own task by the runtime.
    pub async fn run(self: Arc<Self>) {
        tracing::info!(
            "[gw-05] Poll loop started (interval: {}s, batch: {})",
            self.config.poll_interval_secs,
            self.config.batch_size
        );
        let mut ticker =
            tokio::time::interval(Duration::from_secs(self.config.poll_interval_secs));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            if !self.is_active.load(Ordering::SeqCst) {
                tracing::info!("[gw-05] Poll loop stopped");
                break;
            }
            if let Err(e) = self.process_batch().await {
                tracing::error!("[gw-05] Batch aborted: {}", e);
            }
        }
    }

    /// Signal the poll loop to exit at its next tick.
    pub fn stop(&self) {
        self.is_active.store(false, Ordering::SeqCst);
    }

    /// One poll tick: pick up a bounded batch and process it sequentially.
    ///
    /// Per-item failures are recorded on the workload and the batch
    /// continues; only a ledger scan failure aborts the tick.
    pub async fn process_batch(&self) -> FlowResult<usize> {
        let batch = self
            .ledger
            .unprocessed_workloads(self.config.batch_size)
            .map_err(|e| FlowError::Downstream(e.to_string()))?;
        if batch.is_empty() {
            return Ok(0);
        }
        tracing::info!("[gw-05] Processing batch of {}", batch.len());

        let mut processed = 0;
        for mut workload in batch {
            workload.status = WorkloadStatus::Processing;
            workload.updated_at = chrono::Utc::now();
            self.ledger
                .upsert_workload(&workload)
                .map_err(|e| FlowError::Downstream(e.to_string()))?;

            match self.process_one(&workload).await {
                Ok(outcome) => {
                    self.finalize(&outcome).await;
                    processed += 1;
                }
                Err(e) => {
                    tracing::warn!(
                        "[gw-05] Workload {} failed: {}",
                        workload.workload_id,
                        e
                    );
                    self.mark_workload_failed(&workload.workload_id, &e.to_string());
                }
            }
        }
        Ok(processed)
    }

    async fn process_one(&self, workload: &Workload) -> FlowResult<FlowOutcome> {
        self.driver
            .drive_synchronous(workload, CandidatePolicy::TopRanked)
            .await
    }

    /// Apply a flow outcome to its linked workload. Also invoked by the
    /// callback gateway when an asynchronous flow reaches its outcome.
    pub async fn finalize(&self, outcome: &FlowOutcome) {
        match outcome {
            FlowOutcome::Confirmed { transaction_id, .. } => {
                if let Err(e) = self.complete_confirmed(transaction_id).await {
                    tracing::warn!(
                        "[gw-05] Could not finalize workload for txn {}: {}",
                        transaction_id,
                        e
                    );
                }
            }
            FlowOutcome::Partial {
                transaction_id,
                error,
            }
            | FlowOutcome::Failed {
                transaction_id,
                error,
            } => {
                if let Some(workload_id) = self.workload_for(transaction_id) {
                    self.mark_workload_failed(&workload_id, error);
                }
            }
            // Pending flows finish later via callback; ignored callbacks
            // change nothing.
            FlowOutcome::Pending { .. } | FlowOutcome::Ignored { .. } => {}
        }
    }

    /// Rank the confirmed flow's catalog, summarize, and mark the linked
    /// workload processed.
    async fn complete_confirmed(&self, transaction_id: &str) -> FlowResult<()> {
        let record = self
            .ledger
            .get_transaction(transaction_id)
            .map_err(|e| FlowError::Downstream(e.to_string()))?
            .ok_or_else(|| FlowError::Data(format!("no ledger row for {transaction_id}")))?;
        let Some(workload_id) = record.workload_id.clone() else {
            // Flow not linked to a workload; nothing to finalize.
            return Ok(());
        };

        let discover_payload = record
            .step(Action::Discover.as_str())
            .and_then(|s| s.response.clone())
            .ok_or_else(|| FlowError::Data("discover payload missing".to_string()))?;
        let ranked = self.ranking.rank_catalog(&discover_payload)?;
        let summary = self.summarize(&ranked.recommendations).await;

        let mut workload = self
            .ledger
            .get_workload(&workload_id)
            .map_err(|e| FlowError::Downstream(e.to_string()))?
            .ok_or_else(|| FlowError::Data(format!("workload {workload_id} vanished")))?;
        workload.status = WorkloadStatus::Processed;
        workload.recommendations = ranked.recommendations;
        workload.summary = Some(summary);
        workload.error = None;
        workload.updated_at = chrono::Utc::now();
        self.ledger
            .upsert_workload(&workload)
            .map_err(|e| FlowError::Downstream(e.to_string()))?;

        tracing::info!(
            "[gw-05] ✅ Workload {} processed (txn: {})",
            workload_id,
            transaction_id
        );
        Ok(())
    }

    async fn summarize(&self, recommendations: &[GridRecommendation]) -> String {
        let prompt = Self::summary_prompt(recommendations);
        match self.summarizer.summarize(&prompt).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("[gw-05] Summarizer degraded to placeholder: {}", e);
                SUMMARY_PLACEHOLDER.to_string()
            }
        }
    }

    fn summary_prompt(recommendations: &[GridRecommendation]) -> String {
        let mut prompt = String::from(
            "Summarize these grid placement recommendations in two sentences \
             for an operations dashboard. Mention the best zone and why.\n",
        );
        for (i, r) in recommendations.iter().enumerate() {
            prompt.push_str(&format!(
                "{}. zone {} ({}), renewable {}%, carbon {} gCO2/kWh, capacity {} kW, score {:.1}\n",
                i + 1,
                r.zone_name,
                r.zone_id,
                r.renewable_mix_percent,
                r.carbon_intensity,
                r.available_capacity_kw,
                r.score
            ));
        }
        prompt
    }

    fn workload_for(&self, transaction_id: &str) -> Option<String> {
        self.ledger
            .get_transaction(transaction_id)
            .ok()
            .flatten()
            .and_then(|r| r.workload_id)
    }

    fn mark_workload_failed(&self, workload_id: &str, error: &str) {
        let workload = match self.ledger.get_workload(workload_id) {
            Ok(Some(w)) => Some(w),
            _ => None,
        };
        let Some(mut workload) = workload else {
            tracing::warn!("[gw-05] Cannot mark unknown workload {} failed", workload_id);
            return;
        };
        workload.status = WorkloadStatus::Failed;
        workload.error = Some(error.to_string());
        workload.updated_at = chrono::Utc::now();
        if let Err(e) = self.ledger.upsert_workload(&workload) {
            tracing::error!(
                "[gw-05] Could not persist failure for workload {}: {}",
                workload_id,
                e
            );
        }
    }
}
