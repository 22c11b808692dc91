/// Engine-level relay options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayConfig {
    /// Log end-to-end latency for timestamped system messages on first store.
    pub report_latency: bool,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            report_latency: true,
        }
    }
}
