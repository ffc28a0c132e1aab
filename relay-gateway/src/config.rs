//! Gateway configuration loaded from environment variables.

use std::{net::SocketAddr, time::Duration};

use relay_broker::BrokerConfig;

const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:3456";
const DEFAULT_PROVISION_DELAY: Duration = Duration::from_millis(500);

/// Errors that can occur while loading configuration.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// `RELAY_LISTEN_ADDR` is not a socket address.
    #[error("RELAY_LISTEN_ADDR is not a valid socket address: {0}")]
    InvalidListenAddr(String),

    /// A millisecond setting is not a non-negative integer.
    #[error("{var} must be a whole number of milliseconds, got '{value}'")]
    InvalidMillis { var: &'static str, value: String },
}

/// Runtime configuration for the gateway binary.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct GatewayConfig {
    /// Address the HTTP server binds to.
    pub listen_addr: SocketAddr,
    /// Wait budget and retrieve limit for the completion broker.
    pub broker: BrokerConfig,
    /// Simulated provisioning time of the in-memory tunnel backend.
    pub provision_delay: Duration,
}

impl GatewayConfig {
    /// Load configuration from the process environment.
    ///
    /// - `RELAY_LISTEN_ADDR`: bind address (default `127.0.0.1:3456`)
    /// - `RELAY_WAIT_BUDGET_MS`: how long a trigger waits before going pending (default `100`)
    /// - `RELAY_RETRIEVE_LIMIT_MS`: cap on a single poll wait; unset or `0` waits indefinitely
    /// - `RELAY_PROVISION_DELAY_MS`: in-memory backend provisioning time (default `500`)
    ///
    /// # Errors
    /// Returns [`ConfigError`] if any variable is set to an unparsable value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    ///
    /// # Errors
    /// Same as [`Self::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let addr = lookup("RELAY_LISTEN_ADDR")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_owned());
        let listen_addr = addr.parse().map_err(|_| ConfigError::InvalidListenAddr(addr))?;

        let mut broker = BrokerConfig::new();
        if let Some(budget) = millis(&lookup, "RELAY_WAIT_BUDGET_MS")? {
            broker = broker.with_wait_budget(budget);
        }
        if let Some(limit) = millis(&lookup, "RELAY_RETRIEVE_LIMIT_MS")?.filter(|d| !d.is_zero()) {
            broker = broker.with_retrieve_limit(limit);
        }

        let provision_delay =
            millis(&lookup, "RELAY_PROVISION_DELAY_MS")?.unwrap_or(DEFAULT_PROVISION_DELAY);

        Ok(Self { listen_addr, broker, provision_delay })
    }
}

fn millis<F>(lookup: &F, var: &'static str) -> Result<Option<Duration>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(var).filter(|v| !v.trim().is_empty()) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse::<u64>()
            .map(|ms| Some(Duration::from_millis(ms)))
            .map_err(|_| ConfigError::InvalidMillis { var, value }),
    }
}
