//! # `NegotiationContext` Envelope
//!
//! The universal wrapper for every protocol round-trip between the buyer
//! application (BAP) and a seller provider (BPP).
//!
//! ## Correlation Properties
//!
//! - **Versioning**: every context carries the protocol `version`.
//! - **Transaction identity**: the `transaction_id` is generated once at
//!   flow start and carried verbatim through every later step and callback.
//! - **Message identity**: the `message_id` is fresh for every round-trip.
//! - **Sync detection**: a response completed synchronously when its echoed
//!   `action` equals `on_<request action>`.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Protocol version stamped into every envelope.
pub const PROTOCOL_VERSION: &str = "1.1.0";

/// Fixed time-to-live for one protocol message (ISO 8601 duration).
pub const MESSAGE_TTL: &str = "PT30S";

/// The nine protocol actions a buyer application may dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Catalog discovery across providers.
    Discover,
    /// Select one catalog item from a provider.
    Select,
    /// Initialize the order for the selected item.
    Init,
    /// Confirm the initialized order.
    Confirm,
    /// Mutate an already-confirmed order.
    Update,
    /// Query current order state.
    Status,
    /// Cancel a confirmed order.
    Cancel,
    /// Rate a completed negotiation.
    Rating,
    /// Open a support channel for an order.
    Support,
}

impl Action {
    /// Wire name of the action.
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Discover => "discover",
            Action::Select => "select",
            Action::Init => "init",
            Action::Confirm => "confirm",
            Action::Update => "update",
            Action::Status => "status",
            Action::Cancel => "cancel",
            Action::Rating => "rating",
            Action::Support => "support",
        }
    }

    /// Name of the asynchronous callback counterpart (`on_<action>`).
    pub fn callback_name(&self) -> String {
        format!("on_{}", self.as_str())
    }

    /// Resolve an action from its callback name (`on_select` -> `Select`).
    pub fn from_callback_name(name: &str) -> Option<Action> {
        let action = name.strip_prefix("on_")?;
        Action::from_wire(action)
    }

    /// Resolve an action from its wire name.
    pub fn from_wire(name: &str) -> Option<Action> {
        match name {
            "discover" => Some(Action::Discover),
            "select" => Some(Action::Select),
            "init" => Some(Action::Init),
            "confirm" => Some(Action::Confirm),
            "update" => Some(Action::Update),
            "status" => Some(Action::Status),
            "cancel" => Some(Action::Cancel),
            "rating" => Some(Action::Rating),
            "support" => Some(Action::Support),
            _ => None,
        }
    }

    /// True when `echoed` is this action's synchronous completion echo.
    pub fn matches_echo(&self, echoed: &str) -> bool {
        echoed == self.callback_name()
    }

    /// The step that follows this one in the reservation chain.
    ///
    /// Only discover/select/init participate; confirm terminates the chain
    /// and the remaining actions are single-shot operations.
    pub fn next_in_chain(&self) -> Option<Action> {
        match self {
            Action::Discover => Some(Action::Select),
            Action::Select => Some(Action::Init),
            Action::Init => Some(Action::Confirm),
            _ => None,
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of the seller provider a message is addressed to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderRef {
    /// Provider (BPP) identifier.
    pub id: String,
    /// Provider callback URI, when known.
    pub uri: Option<String>,
}

/// The protocol envelope for one round-trip.
///
/// Serialized as the `context` half of the `{context, message}` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NegotiationContext {
    /// Protocol version for forward compatibility.
    pub version: String,

    /// Action this message performs (or echoes, for `on_*` callbacks).
    pub action: String,

    /// Domain identifier (e.g. the compute-energy retail domain).
    pub domain: String,

    /// Buyer application identity.
    pub bap_id: String,
    /// Buyer application callback URI.
    pub bap_uri: String,

    /// Seller provider identity, once a provider has been chosen.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bpp_id: Option<String>,
    /// Seller provider URI.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bpp_uri: Option<String>,

    /// Correlates all messages of one negotiation flow.
    pub transaction_id: String,

    /// Unique per round-trip.
    pub message_id: String,

    /// RFC3339 timestamp with millisecond precision.
    pub timestamp: String,

    /// Message time-to-live (ISO 8601 duration).
    pub ttl: String,
}

/// Builds protocol envelopes with the buyer's fixed identity baked in.
///
/// One builder is constructed at startup from configuration and shared by
/// every call site, so envelope construction cannot drift between steps.
#[derive(Debug, Clone)]
pub struct ContextBuilder {
    domain: String,
    bap_id: String,
    bap_uri: String,
}

impl ContextBuilder {
    /// Create a builder for the given buyer identity.
    pub fn new(
        domain: impl Into<String>,
        bap_id: impl Into<String>,
        bap_uri: impl Into<String>,
    ) -> Self {
        Self {
            domain: domain.into(),
            bap_id: bap_id.into(),
            bap_uri: bap_uri.into(),
        }
    }

    /// Build the envelope for one action.
    ///
    /// A fresh message id is always generated when absent. The transaction
    /// id is generated only when absent, i.e. only at flow start; every
    /// later step must carry the original id forward. Never fails.
    pub fn build(
        &self,
        action: Action,
        transaction_id: Option<&str>,
        message_id: Option<&str>,
        provider: Option<&ProviderRef>,
    ) -> NegotiationContext {
        NegotiationContext {
            version: PROTOCOL_VERSION.to_string(),
            action: action.as_str().to_string(),
            domain: self.domain.clone(),
            bap_id: self.bap_id.clone(),
            bap_uri: self.bap_uri.clone(),
            bpp_id: provider.map(|p| p.id.clone()),
            bpp_uri: provider.and_then(|p| p.uri.clone()),
            transaction_id: transaction_id
                .map(str::to_string)
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            message_id: message_id
                .map(str::to_string)
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            ttl: MESSAGE_TTL.to_string(),
        }
    }

    /// Wrap an envelope and message payload into the request body shape.
    pub fn envelope_body(
        context: &NegotiationContext,
        message: serde_json::Value,
    ) -> serde_json::Value {
        serde_json::json!({
            "context": context,
            "message": message,
        })
    }
}
