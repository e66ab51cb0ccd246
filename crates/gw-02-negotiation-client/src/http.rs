//! HTTP transport adapter over reqwest.

use std::time::Duration;

use async_trait::async_trait;
use shared_types::Action;

use crate::ports::{ProtocolTransport, TransportError, TransportReply};

const CONNECT_TIMEOUT_SECS: u64 = 8;
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Production transport: posts each action to `<base_url>/<action>`.
#[derive(Clone)]
pub struct HttpTransport {
    base_url: String,
    http: reqwest::Client,
    timeout_secs: u64,
}

impl HttpTransport {
    /// Build a transport against the counterparty's base URL with the
    /// default ~30s request timeout.
    pub fn new(base_url: impl Into<String>) -> Result<Self, TransportError> {
        Self::with_timeout(base_url, REQUEST_TIMEOUT_SECS)
    }

    /// Build a transport with an explicit request timeout (seconds).
    pub fn with_timeout(
        base_url: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| TransportError::Request {
                message: e.to_string(),
            })?;
        Ok(Self {
            base_url: base_url.into(),
            http,
            timeout_secs,
        })
    }

    fn url(&self, action: Action) -> String {
        let base = self.base_url.trim_end_matches('/');
        format!("{base}/{action}")
    }
}

#[async_trait]
impl ProtocolTransport for HttpTransport {
    async fn post(
        &self,
        action: Action,
        body: &serde_json::Value,
    ) -> Result<TransportReply, TransportError> {
        let url = self.url(action);
        tracing::debug!("[gw-02] POST {} ({})", url, action);

        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TransportError::Timeout {
                        seconds: self.timeout_secs,
                    }
                } else {
                    TransportError::Request {
                        message: e.to_string(),
                    }
                }
            })?;

        let status = response.status().as_u16();
        // Empty and non-JSON bodies classify on status alone.
        let body = response
            .json::<serde_json::Value>()
            .await
            .unwrap_or(serde_json::Value::Null);

        Ok(TransportReply { status, body })
    }
}
