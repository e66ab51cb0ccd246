//! Negotiation client service.
//!
//! The single dispatch primitive every subsystem uses to talk to the
//! counterparty. One call = envelope build, ledger `Dispatched` row, POST,
//! classification, final ledger row. The ledger rows always land before the
//! caller observes the outcome, so a crash between send and observation
//! leaves a resumable row instead of a lost flow.

use std::sync::Arc;

use gw_01_transaction_ledger::{LedgerService, RetryPolicy};
use shared_types::{
    Action, ContextBuilder, FlowError, FlowResult, FlowState, NegotiationContext, ProviderRef,
    TransactionRecord,
};

use crate::outcome::{classify, NegotiationOutcome};
use crate::ports::ProtocolTransport;

/// Result of one dispatched action.
#[derive(Debug, Clone)]
pub struct Dispatch {
    /// The envelope that was sent; its `transaction_id` keys the ledger row.
    pub context: NegotiationContext,
    /// Classified reply.
    pub outcome: NegotiationOutcome,
}

/// Outbound protocol client bound to one buyer identity.
#[derive(Clone)]
pub struct NegotiationClient {
    transport: Arc<dyn ProtocolTransport>,
    ledger: LedgerService,
    builder: ContextBuilder,
    retry: RetryPolicy,
}

impl NegotiationClient {
    pub fn new(
        transport: Arc<dyn ProtocolTransport>,
        ledger: LedgerService,
        builder: ContextBuilder,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            transport,
            ledger,
            builder,
            retry,
        }
    }

    /// Dispatch one action and classify the reply.
    ///
    /// `transaction_id` is `None` only at flow start; every later step must
    /// carry the flow's id. The returned `Err` is always
    /// [`FlowError::Downstream`]: it means the ledger could not be written
    /// even with retries, which poisons correctness. A failed protocol call
    /// is not an `Err`, it is `Ok` with [`NegotiationOutcome::Error`].
    pub async fn dispatch(
        &self,
        action: Action,
        transaction_id: Option<&str>,
        provider: Option<&ProviderRef>,
        message: serde_json::Value,
    ) -> FlowResult<Dispatch> {
        let context = self.builder.build(action, transaction_id, None, provider);
        let txn_id = context.transaction_id.clone();
        let body = ContextBuilder::envelope_body(&context, message);

        let mut record = self.load_or_create(&txn_id)?;
        record.record_dispatch(action.as_str(), body.clone());
        if let Some(state) = Self::pending_state(action) {
            record.transition(state);
        }
        self.persist(&record).await?;

        tracing::info!(
            "[gw-02] Dispatching {} (txn: {})",
            action,
            txn_id
        );
        let outcome = classify(action, self.transport.post(action, &body).await);

        match &outcome {
            NegotiationOutcome::Synchronous(payload) => {
                tracing::info!("[gw-02] {} completed synchronously (txn: {})", action, txn_id);
                record.record_completion(action.as_str(), payload.clone());
            }
            NegotiationOutcome::Pending => {
                tracing::info!("[gw-02] {} accepted, awaiting callback (txn: {})", action, txn_id);
            }
            NegotiationOutcome::Error(e) => {
                tracing::warn!("[gw-02] {} failed (txn: {}): {}", action, txn_id, e);
                record.record_failure(action.as_str(), e.to_string());
            }
        }
        self.persist(&record).await?;

        Ok(Dispatch { context, outcome })
    }

    /// The in-flight state a chain action moves the flow into at dispatch.
    fn pending_state(action: Action) -> Option<FlowState> {
        match action {
            Action::Discover => Some(FlowState::Discovering),
            Action::Select => Some(FlowState::Selecting),
            Action::Init => Some(FlowState::Initializing),
            Action::Confirm => Some(FlowState::Confirming),
            _ => None,
        }
    }

    fn load_or_create(&self, transaction_id: &str) -> FlowResult<TransactionRecord> {
        match self
            .ledger
            .get_transaction(transaction_id)
            .map_err(|e| FlowError::Downstream(e.to_string()))?
        {
            Some(record) => Ok(record),
            None => Ok(TransactionRecord::new(
                transaction_id,
                serde_json::Value::Null,
            )),
        }
    }

    async fn persist(&self, record: &TransactionRecord) -> FlowResult<()> {
        self.retry
            .run("ledger upsert", || self.ledger.upsert_transaction(record))
            .await
            .map_err(|e| FlowError::Downstream(e.to_string()))
    }
}
