//! Telemetry configuration.

/// Logging configuration for one engine process.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name stamped into log lines.
    pub service_name: String,
    /// Default log level filter when `RUST_LOG` is unset.
    pub log_level: String,
    /// Emit JSON log lines (containers/production) instead of pretty output.
    pub json_logs: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "gridweave".to_string(),
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

impl TelemetryConfig {
    /// Build from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            service_name: defaults.service_name,
            log_level: std::env::var("GW_LOG_LEVEL").unwrap_or(defaults.log_level),
            json_logs: std::env::var("GW_LOG_JSON")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(defaults.json_logs),
        }
    }
}
