//! Processor configuration.

/// Tuning knobs for the poll loop.
#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    /// Seconds between poll ticks.
    pub poll_interval_secs: u64,
    /// Maximum workloads picked up per tick.
    pub batch_size: usize,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 10,
            batch_size: 8,
        }
    }
}

impl ProcessorConfig {
    /// Clamp nonsensical values instead of failing startup.
    pub fn sanitized(mut self) -> Self {
        if self.poll_interval_secs == 0 {
            self.poll_interval_secs = 10;
        }
        if self.batch_size == 0 {
            self.batch_size = 1;
        }
        self
    }
}
