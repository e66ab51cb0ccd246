//! Scripted transport double for tests.
//!
//! Lives in the library (not behind `cfg(test)`) so downstream crates'
//! tests and the integration suite can script counterparty behavior.

use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;
use shared_types::Action;

use crate::ports::{ProtocolTransport, TransportError, TransportReply};

/// Transport that pops pre-scripted replies in FIFO order and records every
/// call it saw. When the script runs dry it answers a 202 ACK, i.e. the
/// counterparty accepted the request for asynchronous processing.
#[derive(Default)]
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<Result<TransportReply, TransportError>>>,
    calls: Mutex<Vec<(Action, serde_json::Value)>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the next reply.
    pub fn push_reply(&self, status: u16, body: serde_json::Value) {
        self.replies
            .lock()
            .push_back(Ok(TransportReply { status, body }));
    }

    /// Script the next call to fail before any status is observed.
    pub fn push_error(&self, error: TransportError) {
        self.replies.lock().push_back(Err(error));
    }

    /// Every call posted so far, in order.
    pub fn calls(&self) -> Vec<(Action, serde_json::Value)> {
        self.calls.lock().clone()
    }

    /// Wire names of every action posted so far, in order.
    pub fn dispatched_actions(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .map(|(a, _)| a.as_str().to_string())
            .collect()
    }

    /// Body of a synchronous completion: the `on_<action>` echo wrapping
    /// `message`, correlated to `transaction_id`.
    pub fn sync_body(
        action: Action,
        transaction_id: &str,
        message: serde_json::Value,
    ) -> serde_json::Value {
        serde_json::json!({
            "context": {
                "action": action.callback_name(),
                "transaction_id": transaction_id,
            },
            "message": message,
        })
    }

    /// The standard ACK body of an asynchronous acceptance.
    pub fn ack_body() -> serde_json::Value {
        serde_json::json!({"message": {"ack": {"status": "ACK"}}})
    }
}

#[async_trait]
impl ProtocolTransport for ScriptedTransport {
    async fn post(
        &self,
        action: Action,
        body: &serde_json::Value,
    ) -> Result<TransportReply, TransportError> {
        self.calls.lock().push((action, body.clone()));
        match self.replies.lock().pop_front() {
            Some(result) => result,
            None => Ok(TransportReply {
                status: 202,
                body: Self::ack_body(),
            }),
        }
    }
}
