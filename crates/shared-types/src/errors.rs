//! # Error Taxonomy
//!
//! The four failure classes every subsystem speaks:
//! transport, protocol, data, downstream.

use thiserror::Error;

/// Result alias used across the negotiation subsystems.
pub type FlowResult<T> = std::result::Result<T, FlowError>;

/// Failure classes of the negotiation engine.
#[derive(Debug, Clone, Error)]
pub enum FlowError {
    /// Network failure or request timeout reaching the counterparty.
    #[error("transport error: {0}")]
    Transport(String),

    /// Non-2xx status or a malformed protocol envelope.
    #[error("protocol error (status {status}): {message}")]
    Protocol {
        /// HTTP status observed, 0 when no response arrived.
        status: u16,
        /// Readable description.
        message: String,
    },

    /// A field needed to proceed is missing (e.g. empty catalog).
    #[error("missing data: {0}")]
    Data(String),

    /// Store or summarizer collaborator failed.
    #[error("downstream error: {0}")]
    Downstream(String),
}

impl FlowError {
    /// True when this error must halt the affected flow.
    ///
    /// Data errors have documented fallbacks and downstream errors are
    /// retried at the call site, so only transport/protocol abort.
    pub fn aborts_flow(&self) -> bool {
        matches!(self, FlowError::Transport(_) | FlowError::Protocol { .. })
    }

    /// True when the call site should retry with bounded backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FlowError::Downstream(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_abort_classes() {
        assert!(FlowError::Transport("connect refused".into()).aborts_flow());
        assert!(FlowError::Protocol {
            status: 500,
            message: "server error".into()
        }
        .aborts_flow());
        assert!(!FlowError::Data("empty catalog".into()).aborts_flow());
        assert!(!FlowError::Downstream("store write failed".into()).aborts_flow());
    }

    #[test]
    fn test_retry_classes() {
        assert!(FlowError::Downstream("store write failed".into()).is_retryable());
        assert!(!FlowError::Transport("timeout".into()).is_retryable());
    }
}
