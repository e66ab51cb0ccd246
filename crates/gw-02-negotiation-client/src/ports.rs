//! Transport port.
//!
//! The one seam between protocol logic and the network. Production uses
//! [`crate::HttpTransport`]; tests script replies via
//! [`crate::testing::ScriptedTransport`].

use async_trait::async_trait;
use shared_types::Action;
use thiserror::Error;

/// Failure reaching the counterparty at all.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// Request exceeded the configured timeout.
    #[error("request timed out after {seconds}s")]
    Timeout {
        /// Configured timeout.
        seconds: u64,
    },

    /// Connection or request failure before any status was observed.
    #[error("request failed: {message}")]
    Request {
        /// Readable description.
        message: String,
    },
}

/// Raw reply from the counterparty, before classification.
#[derive(Debug, Clone)]
pub struct TransportReply {
    /// HTTP status code.
    pub status: u16,
    /// Response body parsed as JSON; `Null` for empty bodies.
    pub body: serde_json::Value,
}

/// Abstract interface for posting one protocol action.
#[async_trait]
pub trait ProtocolTransport: Send + Sync {
    /// POST `body` to the counterparty's endpoint for `action`.
    ///
    /// A non-2xx status is a successful transport round-trip; only failures
    /// to complete the round-trip return `TransportError`.
    async fn post(
        &self,
        action: Action,
        body: &serde_json::Value,
    ) -> Result<TransportReply, TransportError>;
}
