//! Summarizer port.

use async_trait::async_trait;
use thiserror::Error;

/// Placeholder used whenever the summarizer cannot produce text. Flow
/// completion never waits on a working language model.
pub const SUMMARY_PLACEHOLDER: &str = "summary unavailable";

/// Failure talking to the text-generation collaborator.
#[derive(Debug, Clone, Error)]
#[error("summarizer error: {0}")]
pub struct SummarizerError(pub String);

/// Abstract interface for best-effort natural-language summaries.
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Produce a short summary for `prompt`.
    async fn summarize(&self, prompt: &str) -> Result<String, SummarizerError>;
}
