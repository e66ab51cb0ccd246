//! The flow state machine.
//!
//! One driver instance serves the whole process. Two entry points:
//! [`FlowDriver::drive_synchronous`] starts a flow and chains steps as long
//! as the counterparty answers in-band, and [`FlowDriver::drive_from_callback`]
//! resumes a pending flow when its callback arrives. A callback-driven
//! continuation keeps chaining too when the next step answers
//! synchronously, so an ack-only counterparty receives exactly one action
//! per callback and an in-band counterparty is never deadlocked.

use chrono::Utc;
use gw_01_transaction_ledger::{LedgerService, RetryPolicy};
use gw_02_negotiation_client::{Dispatch, NegotiationClient, NegotiationOutcome};
use gw_03_grid_ranking::{extract_candidates, rank_candidates, CandidateItem, RankingService};
use shared_types::{
    Action, FlowError, FlowResult, FlowState, Negotiation, ProviderRef, TransactionRecord,
    Workload,
};
use uuid::Uuid;

use crate::locks::TxnLocks;

/// How a flow picks its catalog item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidatePolicy {
    /// Take the first item in catalog order.
    FirstItem,
    /// Take the highest-scoring item.
    TopRanked,
}

/// Final answer of one driver entry point.
#[derive(Debug, Clone)]
pub enum FlowOutcome {
    /// The full chain completed; `payload` is the `on_confirm` result.
    Confirmed {
        transaction_id: String,
        payload: serde_json::Value,
    },
    /// A step was accepted asynchronously; the flow resumes on callback.
    Pending { transaction_id: String },
    /// The flow halted after at least one completed step.
    Partial {
        transaction_id: String,
        error: String,
    },
    /// The flow halted with no usable progress.
    Failed {
        transaction_id: String,
        error: String,
    },
    /// A stale, duplicate, or out-of-order callback was dropped.
    Ignored {
        transaction_id: String,
        reason: String,
    },
}

impl FlowOutcome {
    /// Transaction id the outcome refers to.
    pub fn transaction_id(&self) -> &str {
        match self {
            FlowOutcome::Confirmed { transaction_id, .. }
            | FlowOutcome::Pending { transaction_id }
            | FlowOutcome::Partial { transaction_id, .. }
            | FlowOutcome::Failed { transaction_id, .. }
            | FlowOutcome::Ignored { transaction_id, .. } => transaction_id,
        }
    }
}

/// Drives negotiation flows against one counterparty.
pub struct FlowDriver {
    client: NegotiationClient,
    ranking: RankingService,
    ledger: LedgerService,
    locks: TxnLocks,
    retry: RetryPolicy,
    initiator: String,
}

impl FlowDriver {
    pub fn new(
        client: NegotiationClient,
        ranking: RankingService,
        ledger: LedgerService,
        retry: RetryPolicy,
        initiator: impl Into<String>,
    ) -> Self {
        Self {
            client,
            ranking,
            ledger,
            locks: TxnLocks::new(),
            retry,
            initiator: initiator.into(),
        }
    }

    /// Start a flow for `workload` and chain discover → select → init →
    /// confirm for as long as the counterparty answers in-band.
    pub async fn drive_synchronous(
        &self,
        workload: &Workload,
        policy: CandidatePolicy,
    ) -> FlowResult<FlowOutcome> {
        let transaction_id = Uuid::new_v4().to_string();
        let _guard = self.locks.acquire(&transaction_id).await;

        let mut record = TransactionRecord::new(&transaction_id, workload.requirements.clone())
            .with_workload(&workload.workload_id);
        self.persist(&record).await?;

        tracing::info!(
            "[gw-04] Starting flow for workload {} (txn: {})",
            workload.workload_id,
            transaction_id
        );

        let intent = serde_json::json!({"intent": {"requirements": workload.requirements}});
        let dispatch = self
            .client
            .dispatch(Action::Discover, Some(&transaction_id), None, intent)
            .await?;
        record = self.load(&transaction_id)?;

        match dispatch.outcome {
            NegotiationOutcome::Synchronous(payload) => {
                self.advance(&mut record, Action::Discover, payload, policy)
                    .await
            }
            NegotiationOutcome::Pending => Ok(FlowOutcome::Pending { transaction_id }),
            NegotiationOutcome::Error(e) => self.finalize_halt(&mut record, &e).await,
        }
    }

    /// Resume a pending flow from an inbound `on_<action>` callback.
    ///
    /// Callbacks for unknown transactions are errors; callbacks for
    /// terminal flows, already-completed steps, or steps that are not in
    /// flight are dropped as [`FlowOutcome::Ignored`].
    pub async fn drive_from_callback(
        &self,
        transaction_id: &str,
        callback: &str,
        payload: serde_json::Value,
    ) -> FlowResult<FlowOutcome> {
        let _guard = self.locks.acquire(transaction_id).await;

        let Some(mut record) = self
            .ledger
            .get_transaction(transaction_id)
            .map_err(|e| FlowError::Downstream(e.to_string()))?
        else {
            return Err(FlowError::Data(format!(
                "callback {callback} for unknown transaction {transaction_id}"
            )));
        };

        let Some(action) = Action::from_callback_name(callback) else {
            return Err(FlowError::Data(format!("unknown callback {callback}")));
        };

        if let Some(reason) = Self::callback_is_stale(&record, action, callback) {
            tracing::warn!("[gw-04] {} (txn: {})", reason, transaction_id);
            return Ok(FlowOutcome::Ignored {
                transaction_id: transaction_id.to_string(),
                reason,
            });
        }

        tracing::info!(
            "[gw-04] Callback {} resuming flow (txn: {})",
            callback,
            transaction_id
        );
        record.record_completion(action.as_str(), payload.clone());
        self.persist(&record).await?;

        // Orchestrated flows carry a workload id and rank their candidates.
        let policy = if record.workload_id.is_some() {
            CandidatePolicy::TopRanked
        } else {
            CandidatePolicy::FirstItem
        };
        self.advance(&mut record, action, payload, policy).await
    }

    /// Mark every pending flow untouched for `older_than` as timed out.
    /// Returns the number of flows reaped.
    pub async fn reap_stalled(&self, older_than: chrono::Duration) -> FlowResult<usize> {
        let cutoff = Utc::now() - older_than;
        let stalled = self
            .ledger
            .pending_transactions_older_than(cutoff)
            .map_err(|e| FlowError::Downstream(e.to_string()))?;

        let mut reaped = 0;
        for candidate in stalled {
            let _guard = self.locks.acquire(&candidate.transaction_id).await;
            // Re-check under the lock; a callback may have just landed.
            let mut record = self.load(&candidate.transaction_id)?;
            if !record.state.is_pending() || record.updated_at >= cutoff {
                continue;
            }
            record.error = Some(format!(
                "no callback for {} within the deadline",
                record.in_flight_action().unwrap_or("<none>")
            ));
            record.transition(FlowState::TimedOut);
            self.persist(&record).await?;
            tracing::warn!(
                "[gw-04] ⏱️ Flow timed out (txn: {})",
                record.transaction_id
            );
            reaped += 1;
        }
        Ok(reaped)
    }

    fn callback_is_stale(
        record: &TransactionRecord,
        action: Action,
        callback: &str,
    ) -> Option<String> {
        if record.state.is_terminal() {
            return Some(format!(
                "dropping {callback}: flow already {}",
                record.state
            ));
        }
        if record
            .step(action.as_str())
            .is_some_and(|s| s.status == shared_types::StepStatus::Completed)
        {
            return Some(format!("dropping duplicate {callback}"));
        }
        if record.in_flight_action() != Some(action.as_str()) {
            return Some(format!(
                "dropping out-of-order {callback}: in-flight step is {}",
                record.in_flight_action().unwrap_or("<none>")
            ));
        }
        None
    }

    /// Chain steps starting after `completed`, for as long as replies come
    /// back synchronously.
    async fn advance(
        &self,
        record: &mut TransactionRecord,
        mut completed: Action,
        mut payload: serde_json::Value,
        policy: CandidatePolicy,
    ) -> FlowResult<FlowOutcome> {
        loop {
            let Some(next) = completed.next_in_chain() else {
                return self.finalize_confirmed(record, payload).await;
            };

            let (provider, message) = match self.prepare_step(record, next, policy).await {
                Ok(prepared) => prepared,
                Err(e) => return self.finalize_halt(record, &e).await,
            };

            let dispatch: Dispatch = self
                .client
                .dispatch(next, Some(&record.transaction_id), provider.as_ref(), message)
                .await?;
            *record = self.load(&record.transaction_id)?;

            match dispatch.outcome {
                NegotiationOutcome::Synchronous(p) => {
                    completed = next;
                    payload = p;
                }
                NegotiationOutcome::Pending => {
                    return Ok(FlowOutcome::Pending {
                        transaction_id: record.transaction_id.clone(),
                    });
                }
                NegotiationOutcome::Error(e) => return self.finalize_halt(record, &e).await,
            }
        }
    }

    /// Build the provider ref and message body for the next chain step,
    /// from identifiers persisted by the steps before it.
    async fn prepare_step(
        &self,
        record: &mut TransactionRecord,
        next: Action,
        policy: CandidatePolicy,
    ) -> FlowResult<(Option<ProviderRef>, serde_json::Value)> {
        let candidate = self.chosen_candidate(record, policy)?;
        let provider = ProviderRef {
            id: candidate.provider_id.clone(),
            uri: candidate.provider_uri.clone(),
        };
        let order_items = serde_json::json!({
            "provider": {"id": candidate.provider_id},
            "items": [{"id": candidate.item_id}],
        });

        let message = match next {
            Action::Select => {
                if record.provider_id.as_deref() != Some(candidate.provider_id.as_str()) {
                    record.provider_id = Some(candidate.provider_id.clone());
                    self.persist(record).await?;
                }
                serde_json::json!({"order": order_items})
            }
            Action::Init => {
                let mut order = order_items;
                // Quote id is carried forward when the provider issued one.
                if let Some(quote_id) = Self::step_field(record, Action::Select, "quote") {
                    order["quote"] = serde_json::json!({"id": quote_id});
                }
                serde_json::json!({"order": order})
            }
            Action::Confirm => {
                let Some(order_id) = Self::step_field(record, Action::Init, "order") else {
                    return Err(FlowError::Data(
                        "init result carries no order id".to_string(),
                    ));
                };
                let mut order = order_items;
                order["id"] = serde_json::Value::String(order_id);
                serde_json::json!({"order": order})
            }
            other => {
                return Err(FlowError::Data(format!(
                    "{other} is not a chain step"
                )));
            }
        };

        Ok((Some(provider), message))
    }

    /// The catalog item this flow negotiates for, re-derived from the
    /// persisted discover payload so callback resumption sees the same
    /// choice as an unbroken chain.
    fn chosen_candidate(
        &self,
        record: &TransactionRecord,
        policy: CandidatePolicy,
    ) -> FlowResult<CandidateItem> {
        let payload = record
            .step(Action::Discover.as_str())
            .and_then(|s| s.response.clone())
            .ok_or_else(|| FlowError::Data("discover payload missing from ledger".to_string()))?;

        let candidates = extract_candidates(&payload)?;
        let chosen = match policy {
            CandidatePolicy::FirstItem => candidates.into_iter().next(),
            CandidatePolicy::TopRanked => rank_candidates(candidates).into_iter().next(),
        };
        // Extraction guarantees at least one candidate.
        chosen.ok_or_else(|| FlowError::Data("catalog contains no usable items".to_string()))
    }

    /// Identifier carried by a completed step's payload:
    /// `message.order.quote.id` for `key == "quote"`, `message.order.id`
    /// for `key == "order"`.
    fn step_field(record: &TransactionRecord, action: Action, key: &str) -> Option<String> {
        let payload = record.step(action.as_str())?.response.as_ref()?;
        let order = &payload["message"]["order"];
        let value = match key {
            "quote" => &order["quote"]["id"],
            _ => &order["id"],
        };
        value.as_str().map(str::to_string)
    }

    async fn finalize_confirmed(
        &self,
        record: &mut TransactionRecord,
        payload: serde_json::Value,
    ) -> FlowResult<FlowOutcome> {
        record.transition(FlowState::Confirmed);
        self.persist(record).await?;
        tracing::info!(
            "[gw-04] ✅ Flow confirmed in {} steps (txn: {})",
            record.completed_steps(),
            record.transaction_id
        );

        // The aggregate record is supplementary; its failure never undoes a
        // confirmed flow.
        let proposals = record
            .step(Action::Discover.as_str())
            .and_then(|s| s.response.as_ref())
            .and_then(|p| self.ranking.rank_catalog(p).ok())
            .map(|r| r.recommendations)
            .unwrap_or_default();
        let negotiation = Negotiation {
            transaction_id: record.transaction_id.clone(),
            initiator: self.initiator.clone(),
            proposals,
            status: record.state,
            completed_at: Utc::now(),
        };
        if let Err(e) = self.ledger.record_negotiation(&negotiation) {
            tracing::warn!(
                "[gw-04] Failed to write negotiation record (txn: {}): {}",
                record.transaction_id,
                e
            );
        }

        Ok(FlowOutcome::Confirmed {
            transaction_id: record.transaction_id.clone(),
            payload,
        })
    }

    async fn finalize_halt(
        &self,
        record: &mut TransactionRecord,
        error: &FlowError,
    ) -> FlowResult<FlowOutcome> {
        let error_text = error.to_string();
        if record.error.is_none() {
            record.error = Some(error_text.clone());
        }

        let outcome = if record.completed_steps() >= 1 {
            record.transition(FlowState::Partial);
            FlowOutcome::Partial {
                transaction_id: record.transaction_id.clone(),
                error: error_text,
            }
        } else {
            record.transition(FlowState::Failed);
            FlowOutcome::Failed {
                transaction_id: record.transaction_id.clone(),
                error: error_text,
            }
        };
        self.persist(record).await?;

        tracing::warn!(
            "[gw-04] Flow halted in state {} (txn: {}): {}",
            record.state,
            record.transaction_id,
            record.error.as_deref().unwrap_or("<none>")
        );
        Ok(outcome)
    }

    fn load(&self, transaction_id: &str) -> FlowResult<TransactionRecord> {
        self.ledger
            .get_transaction(transaction_id)
            .map_err(|e| FlowError::Downstream(e.to_string()))?
            .ok_or_else(|| {
                FlowError::Downstream(format!("ledger row vanished for {transaction_id}"))
            })
    }

    async fn persist(&self, record: &TransactionRecord) -> FlowResult<()> {
        self.retry
            .run("ledger upsert", || self.ledger.upsert_transaction(record))
            .await
            .map_err(|e| FlowError::Downstream(e.to_string()))
    }
}
