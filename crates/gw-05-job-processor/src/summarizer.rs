//! HTTP summarizer adapter (Ollama-style generate endpoint).

use std::time::Duration;

use async_trait::async_trait;

use crate::ports::{Summarizer, SummarizerError};

const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Summarizer backed by a local text-generation server exposing
/// `POST /api/generate` with `{model, prompt, stream:false}` and answering
/// `{"response": "..."}`.
#[derive(Clone)]
pub struct HttpSummarizer {
    base_url: String,
    model: String,
    http: reqwest::Client,
}

impl HttpSummarizer {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self, SummarizerError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| SummarizerError(e.to_string()))?;
        Ok(Self {
            base_url: base_url.into(),
            model: model.into(),
            http,
        })
    }

    fn url(&self) -> String {
        format!("{}/api/generate", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl Summarizer for HttpSummarizer {
    async fn summarize(&self, prompt: &str) -> Result<String, SummarizerError> {
        let body = serde_json::json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
        });

        let response = self
            .http
            .post(self.url())
            .json(&body)
            .send()
            .await
            .map_err(|e| SummarizerError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(SummarizerError(format!(
                "generate endpoint returned {}",
                response.status()
            )));
        }

        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| SummarizerError(e.to_string()))?;
        let text = payload["response"].as_str().unwrap_or("").trim();
        if text.is_empty() {
            return Err(SummarizerError("empty response".to_string()));
        }
        Ok(text.to_string())
    }
}
