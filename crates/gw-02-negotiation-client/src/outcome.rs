//! Reply classification.
//!
//! Every protocol reply lands in exactly one of three buckets, and callers
//! branch on the tag instead of re-inspecting status codes or echoed
//! actions.

use shared_types::{Action, FlowError};

use crate::ports::{TransportError, TransportReply};

/// Classified result of one protocol round-trip.
#[derive(Debug, Clone)]
pub enum NegotiationOutcome {
    /// The counterparty answered in-band: the reply body carries the
    /// `on_<action>` echo and its payload is the step result.
    Synchronous(serde_json::Value),
    /// Accepted for asynchronous processing; the result arrives later as a
    /// callback to the gateway.
    Pending,
    /// The round-trip failed; the flow driver decides what that means.
    Error(FlowError),
}

impl NegotiationOutcome {
    /// True for the error variant.
    pub fn is_error(&self) -> bool {
        matches!(self, NegotiationOutcome::Error(_))
    }
}

/// Classify a transport-level result for `action`.
///
/// - 2xx with `context.action == "on_<action>"` → [`Synchronous`]
/// - 2xx (typically 202) without the echo → [`Pending`]
/// - non-2xx → [`Error`] with [`FlowError::Protocol`]
/// - no round-trip at all → [`Error`] with [`FlowError::Transport`]
///
/// [`Synchronous`]: NegotiationOutcome::Synchronous
/// [`Pending`]: NegotiationOutcome::Pending
/// [`Error`]: NegotiationOutcome::Error
pub fn classify(
    action: Action,
    result: Result<TransportReply, TransportError>,
) -> NegotiationOutcome {
    let reply = match result {
        Ok(reply) => reply,
        Err(e) => return NegotiationOutcome::Error(FlowError::Transport(e.to_string())),
    };

    if !(200..300).contains(&reply.status) {
        return NegotiationOutcome::Error(FlowError::Protocol {
            status: reply.status,
            message: format!("counterparty rejected {action}"),
        });
    }

    let echoed = reply.body["context"]["action"].as_str().unwrap_or("");
    if action.matches_echo(echoed) {
        NegotiationOutcome::Synchronous(reply.body)
    } else {
        NegotiationOutcome::Pending
    }
}
