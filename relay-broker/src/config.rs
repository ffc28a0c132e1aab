//! Broker timing configuration.

use std::time::Duration;

/// How long a triggering request waits before handing out a correlation id.
pub const DEFAULT_WAIT_BUDGET: Duration = Duration::from_millis(100);

/// Timing knobs for a [`CompletionBroker`](crate::CompletionBroker).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub struct BrokerConfig {
    /// Time a triggering request waits for the outcome before going pending.
    pub wait_budget: Duration,

    /// Upper bound on a single retrieve wait. `None` waits until the
    /// operation finishes, however long that takes.
    pub retrieve_limit: Option<Duration>,
}

impl BrokerConfig {
    /// Create a config with the default wait budget and no retrieve limit.
    #[must_use]
    pub fn new() -> Self {
        Self { wait_budget: DEFAULT_WAIT_BUDGET, retrieve_limit: None }
    }

    /// Replace the wait budget.
    #[must_use]
    pub fn with_wait_budget(mut self, wait_budget: Duration) -> Self {
        self.wait_budget = wait_budget;
        self
    }

    /// Bound every retrieve wait by `limit`.
    #[must_use]
    pub fn with_retrieve_limit(mut self, limit: Duration) -> Self {
        self.retrieve_limit = Some(limit);
        self
    }
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self::new()
    }
}
