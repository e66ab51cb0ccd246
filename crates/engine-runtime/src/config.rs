//! Engine configuration.
//!
//! Plain scalars grouped per concern, with working local-development
//! defaults and a small set of environment overrides for the knobs that
//! differ between deployments:
//!
//! - `GW_BPP_URL`: counterparty base URL
//! - `GW_DATA_DIR`: ledger data directory
//! - `GW_GATEWAY_ADDR`: callback gateway bind address
//! - `GW_SUMMARIZER_URL`: text-generation server base URL

use std::net::SocketAddr;
use std::path::PathBuf;

/// Buyer application identity stamped into every envelope.
#[derive(Debug, Clone)]
pub struct IdentityConfig {
    pub domain: String,
    pub bap_id: String,
    pub bap_uri: String,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            domain: "energy:compute".to_string(),
            bap_id: "bap.gridweave.local".to_string(),
            bap_uri: "http://127.0.0.1:8099".to_string(),
        }
    }
}

/// Counterparty endpoint settings.
#[derive(Debug, Clone)]
pub struct CounterpartyConfig {
    /// Base URL; each action posts to `<base>/<action>`.
    pub bpp_url: String,
    /// Per-call request timeout, seconds.
    pub request_timeout_secs: u64,
}

impl Default for CounterpartyConfig {
    fn default() -> Self {
        Self {
            bpp_url: "http://127.0.0.1:8098".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// Ledger persistence settings.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// Directory holding the ledger file.
    pub data_dir: PathBuf,
    /// Attempts for must-not-lose ledger writes.
    pub retry_max_attempts: u32,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            retry_max_attempts: 3,
        }
    }
}

/// Poll-loop settings, mapped onto the processor's own config.
#[derive(Debug, Clone)]
pub struct PollerConfig {
    pub poll_interval_secs: u64,
    pub batch_size: usize,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 10,
            batch_size: 8,
        }
    }
}

/// Reaper cadence and staleness deadline.
#[derive(Debug, Clone)]
pub struct ReaperConfig {
    /// Seconds between reaper sweeps.
    pub interval_secs: u64,
    /// A pending flow untouched this long is timed out.
    pub deadline_secs: u64,
}

impl Default for ReaperConfig {
    fn default() -> Self {
        Self {
            interval_secs: 30,
            deadline_secs: 300,
        }
    }
}

/// Callback gateway settings.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub bind_addr: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8099".to_string(),
        }
    }
}

/// Summarizer endpoint settings.
#[derive(Debug, Clone)]
pub struct SummarizerConfig {
    pub base_url: String,
    pub model: String,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:11434".to_string(),
            model: "llama3.2".to_string(),
        }
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    pub identity: IdentityConfig,
    pub counterparty: CounterpartyConfig,
    pub ledger: LedgerConfig,
    pub poller: PollerConfig,
    pub reaper: ReaperConfig,
    pub gateway: GatewayConfig,
    pub summarizer: SummarizerConfig,
}

impl EngineConfig {
    /// Defaults with environment overrides applied.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = std::env::var("GW_BPP_URL") {
            config.counterparty.bpp_url = url;
        }
        if let Ok(dir) = std::env::var("GW_DATA_DIR") {
            config.ledger.data_dir = PathBuf::from(dir);
        }
        if let Ok(addr) = std::env::var("GW_GATEWAY_ADDR") {
            config.gateway.bind_addr = addr;
        }
        if let Ok(url) = std::env::var("GW_SUMMARIZER_URL") {
            config.summarizer.base_url = url;
        }
        config
    }

    /// Reject configurations the engine cannot start with.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.counterparty.bpp_url.trim().is_empty() {
            anyhow::bail!("counterparty.bpp_url must not be empty");
        }
        if self.identity.bap_id.trim().is_empty() {
            anyhow::bail!("identity.bap_id must not be empty");
        }
        self.gateway_addr()?;
        if self.reaper.deadline_secs == 0 {
            anyhow::bail!("reaper.deadline_secs must be positive");
        }
        Ok(())
    }

    /// Parsed gateway bind address.
    pub fn gateway_addr(&self) -> anyhow::Result<SocketAddr> {
        self.gateway
            .bind_addr
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid gateway.bind_addr '{}': {e}", self.gateway.bind_addr))
    }

    /// Path of the ledger file inside the data directory.
    pub fn ledger_path(&self) -> PathBuf {
        self.ledger.data_dir.join("ledger.db")
    }
}
