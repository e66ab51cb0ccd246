//! # Domain Entities
//!
//! Ledger rows and aggregates shared by every subsystem: the per-flow
//! `TransactionRecord`, the externally-submitted `Workload`, the ranked
//! `GridRecommendation`, and the completed-flow `Negotiation` summary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Fixed number of recommendation slots every processed workload carries.
pub const RECOMMENDATION_SLOTS: usize = 3;

/// Lifecycle state of one negotiation flow.
///
/// Transitions are monotonic: the ordinal never decreases, and the terminal
/// states (`Confirmed`, `Failed`, `TimedOut`) are sticky. `Partial` records
/// a halted flow that completed at least one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowState {
    /// Flow created, nothing dispatched yet.
    Initiated,
    /// Discover dispatched, awaiting catalog.
    Discovering,
    /// Select dispatched, awaiting provider acceptance.
    Selecting,
    /// Init dispatched, awaiting order draft.
    Initializing,
    /// Confirm dispatched, awaiting final order.
    Confirming,
    /// Order confirmed; terminal.
    Confirmed,
    /// Flow halted after at least one completed step.
    Partial,
    /// Flow halted with no usable progress; terminal.
    Failed,
    /// No callback arrived within the deadline; terminal.
    TimedOut,
}

impl FlowState {
    /// Position in the monotonic ordering.
    pub fn ordinal(&self) -> u8 {
        match self {
            FlowState::Initiated => 0,
            FlowState::Discovering => 1,
            FlowState::Selecting => 2,
            FlowState::Initializing => 3,
            FlowState::Confirming => 4,
            FlowState::Confirmed => 5,
            FlowState::Partial => 5,
            FlowState::Failed => 5,
            FlowState::TimedOut => 5,
        }
    }

    /// True for states a flow can never leave.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            FlowState::Confirmed | FlowState::Failed | FlowState::TimedOut
        )
    }

    /// True when the flow is waiting on a counterparty callback.
    pub fn is_pending(&self) -> bool {
        matches!(
            self,
            FlowState::Discovering
                | FlowState::Selecting
                | FlowState::Initializing
                | FlowState::Confirming
        )
    }

    /// Whether a transition to `next` respects monotonicity.
    pub fn can_advance_to(&self, next: FlowState) -> bool {
        !self.is_terminal() && next.ordinal() >= self.ordinal()
    }

    /// Wire name of the state.
    pub fn as_str(&self) -> &'static str {
        match self {
            FlowState::Initiated => "initiated",
            FlowState::Discovering => "discovering",
            FlowState::Selecting => "selecting",
            FlowState::Initializing => "initializing",
            FlowState::Confirming => "confirming",
            FlowState::Confirmed => "confirmed",
            FlowState::Partial => "partial",
            FlowState::Failed => "failed",
            FlowState::TimedOut => "timeout",
        }
    }
}

impl std::fmt::Display for FlowState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one protocol step as persisted in the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// Request sent; result not yet observed.
    Dispatched,
    /// Synchronous echo or callback received.
    Completed,
    /// Transport/protocol error ended the step.
    Failed,
}

/// Request/response snapshot for one step of one transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    /// Wire name of the dispatched action.
    pub action: String,
    /// Current status of this step.
    pub status: StepStatus,
    /// The full request body that was sent.
    pub request: serde_json::Value,
    /// The response or callback payload, once observed.
    pub response: Option<serde_json::Value>,
    /// Readable failure description, when failed.
    pub error: Option<String>,
    /// When the request was dispatched.
    pub dispatched_at: DateTime<Utc>,
    /// When the step reached a final status.
    pub finished_at: Option<DateTime<Utc>>,
}

/// One negotiation flow's durable ledger row.
///
/// The ledger holds exactly one row per transaction id; every mutation is
/// an upsert of the whole row, so racing writers converge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Stable across all steps of one flow.
    pub transaction_id: String,
    /// Current flow state.
    pub state: FlowState,
    /// Per-step snapshots in dispatch order.
    pub steps: Vec<StepRecord>,
    /// Workload this flow is reserving capacity for.
    pub workload_id: Option<String>,
    /// Chosen provider, once discover completes.
    pub provider_id: Option<String>,
    /// The original requirements, needed to resume from a callback.
    pub requirements: serde_json::Value,
    /// Readable error for failed/timed-out flows.
    pub error: Option<String>,
    /// Row creation time.
    pub created_at: DateTime<Utc>,
    /// Last mutation time.
    pub updated_at: DateTime<Utc>,
}

impl TransactionRecord {
    /// Create a fresh row at flow start.
    pub fn new(transaction_id: impl Into<String>, requirements: serde_json::Value) -> Self {
        let now = Utc::now();
        Self {
            transaction_id: transaction_id.into(),
            state: FlowState::Initiated,
            steps: Vec::new(),
            workload_id: None,
            provider_id: None,
            requirements,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Attach the workload this flow serves.
    pub fn with_workload(mut self, workload_id: impl Into<String>) -> Self {
        self.workload_id = Some(workload_id.into());
        self
    }

    /// Look up the step row for an action.
    pub fn step(&self, action: &str) -> Option<&StepRecord> {
        self.steps.iter().find(|s| s.action == action)
    }

    fn step_mut(&mut self, action: &str) -> Option<&mut StepRecord> {
        self.steps.iter_mut().find(|s| s.action == action)
    }

    /// Record that a step's request went out. Re-dispatching an existing
    /// step overwrites its snapshot instead of appending a duplicate.
    pub fn record_dispatch(&mut self, action: &str, request: serde_json::Value) {
        let now = Utc::now();
        if let Some(step) = self.step_mut(action) {
            step.status = StepStatus::Dispatched;
            step.request = request;
            step.response = None;
            step.error = None;
            step.dispatched_at = now;
            step.finished_at = None;
        } else {
            self.steps.push(StepRecord {
                action: action.to_string(),
                status: StepStatus::Dispatched,
                request,
                response: None,
                error: None,
                dispatched_at: now,
                finished_at: None,
            });
        }
        self.updated_at = now;
    }

    /// Record a step's successful payload (sync echo or callback).
    pub fn record_completion(&mut self, action: &str, response: serde_json::Value) {
        let now = Utc::now();
        if let Some(step) = self.step_mut(action) {
            step.status = StepStatus::Completed;
            step.response = Some(response);
            step.finished_at = Some(now);
        } else {
            // Callback observed before the dispatch row survived a crash.
            self.steps.push(StepRecord {
                action: action.to_string(),
                status: StepStatus::Completed,
                request: serde_json::Value::Null,
                response: Some(response),
                error: None,
                dispatched_at: now,
                finished_at: Some(now),
            });
        }
        self.updated_at = now;
    }

    /// Record a step failure with a readable reason.
    pub fn record_failure(&mut self, action: &str, error: impl Into<String>) {
        let now = Utc::now();
        let error = error.into();
        if let Some(step) = self.step_mut(action) {
            step.status = StepStatus::Failed;
            step.error = Some(error.clone());
            step.finished_at = Some(now);
        }
        self.error = Some(error);
        self.updated_at = now;
    }

    /// Advance the flow state, enforcing monotonicity.
    ///
    /// Returns false (and leaves the row untouched) when the transition
    /// would move backward or leave a terminal state.
    pub fn transition(&mut self, next: FlowState) -> bool {
        if !self.state.can_advance_to(next) {
            return false;
        }
        self.state = next;
        self.updated_at = Utc::now();
        true
    }

    /// Number of steps with a completed payload.
    pub fn completed_steps(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| s.status == StepStatus::Completed)
            .count()
    }

    /// Payload of the most recently completed step, for partial outcomes.
    pub fn last_completed_payload(&self) -> Option<&serde_json::Value> {
        self.steps
            .iter()
            .rev()
            .find(|s| s.status == StepStatus::Completed)
            .and_then(|s| s.response.as_ref())
    }

    /// The action currently awaiting a result, if any.
    pub fn in_flight_action(&self) -> Option<&str> {
        self.steps
            .iter()
            .find(|s| s.status == StepStatus::Dispatched)
            .map(|s| s.action.as_str())
    }
}

/// Status of an externally-submitted workload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkloadStatus {
    /// Queued, not yet picked up by the processor.
    Submitted,
    /// A processor iteration is working on it.
    Processing,
    /// Flow completed and recommendations stored.
    Processed,
    /// Unrecoverable per-item error; see `error`.
    Failed,
}

/// A compute job waiting for a grid placement recommendation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workload {
    /// External job identifier.
    pub workload_id: String,
    /// Resource requirements as submitted (opaque to the engine).
    pub requirements: serde_json::Value,
    /// Processing status.
    pub status: WorkloadStatus,
    /// Exactly `RECOMMENDATION_SLOTS` entries once processed.
    pub recommendations: Vec<GridRecommendation>,
    /// Natural-language placement summary (best effort).
    pub summary: Option<String>,
    /// Readable error text when failed.
    pub error: Option<String>,
    /// Submission time.
    pub created_at: DateTime<Utc>,
    /// Last mutation time.
    pub updated_at: DateTime<Utc>,
}

impl Workload {
    /// Create a freshly submitted workload.
    pub fn new(workload_id: impl Into<String>, requirements: serde_json::Value) -> Self {
        let now = Utc::now();
        Self {
            workload_id: workload_id.into(),
            requirements,
            status: WorkloadStatus::Submitted,
            recommendations: Vec::new(),
            summary: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// One ranked placement candidate extracted from a discover catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridRecommendation {
    /// Catalog item identifier.
    pub item_id: String,
    /// Resolved grid-zone identifier (never null; see zone fallback).
    pub zone_id: String,
    /// Human-readable zone name from the catalog.
    pub zone_name: String,
    /// Locality / region hint, when the catalog carries one.
    pub locality: Option<String>,
    /// Renewable share of the zone's mix, percent.
    pub renewable_mix_percent: f64,
    /// Carbon intensity in gCO2/kWh.
    pub carbon_intensity: f64,
    /// Capacity available in the window, kW.
    pub available_capacity_kw: f64,
    /// Window lower bound (RFC3339), when present.
    pub window_start: Option<String>,
    /// Window upper bound (RFC3339), when present.
    pub window_end: Option<String>,
    /// Rank score: `renewable_mix - carbon_intensity / 10`.
    pub score: f64,
}

/// Aggregated record of one full negotiation flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Negotiation {
    /// Transaction id of the underlying flow.
    pub transaction_id: String,
    /// Buyer application that initiated the flow.
    pub initiator: String,
    /// The proposal bundle the flow produced.
    pub proposals: Vec<GridRecommendation>,
    /// Final flow state.
    pub status: FlowState,
    /// Completion time.
    pub completed_at: DateTime<Utc>,
}

/// A grid zone known to the engine, used for name resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneRecord {
    /// Stable zone identifier.
    pub zone_id: String,
    /// Human-readable name (matched case-insensitively).
    pub name: String,
    /// Enclosing region.
    pub region: String,
}
