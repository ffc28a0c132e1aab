use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::id::TunnelId;

/// Longest hostname accepted by DNS.
const MAX_DOMAIN_LEN: usize = 253;

fn default_client_addr() -> String {
    "127.0.0.1".to_owned()
}

/// Parameters for provisioning a new tunnel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TunnelRequest {
    /// Public domain the tunnel is served under (e.g. `"app.example.com"`).
    pub domain: String,
    /// Address the tunnel client forwards traffic to.
    #[serde(default = "default_client_addr")]
    pub client_addr: String,
    /// Port the tunnel client forwards traffic to.
    pub client_port: u32,
}

impl TunnelRequest {
    /// Creates a request forwarding `domain` to `127.0.0.1:<client_port>`.
    pub fn new(domain: impl Into<String>, client_port: u32) -> Self {
        Self { domain: domain.into(), client_addr: default_client_addr(), client_port }
    }

    /// Checks the domain and port.
    ///
    /// # Errors
    /// Returns [`CoreError::InvalidDomain`] if the domain is empty, too long,
    /// or contains a label that is not a valid hostname label.
    /// Returns [`CoreError::InvalidPort`] if the port is `0` or above `65535`.
    pub fn validate(&self) -> Result<(), CoreError> {
        validate_domain(&self.domain)?;
        if self.client_port == 0 || self.client_port > u32::from(u16::MAX) {
            return Err(CoreError::InvalidPort { port: self.client_port });
        }
        Ok(())
    }
}

fn validate_domain(domain: &str) -> Result<(), CoreError> {
    let invalid = |reason: &str| CoreError::InvalidDomain {
        domain: domain.to_owned(),
        reason: reason.to_owned(),
    };

    if domain.is_empty() {
        return Err(invalid("domain is empty"));
    }
    if domain.len() > MAX_DOMAIN_LEN {
        return Err(invalid("domain is longer than 253 characters"));
    }
    for label in domain.split('.') {
        if label.is_empty() || label.len() > 63 {
            return Err(invalid("each label must be 1 to 63 characters"));
        }
        if label.starts_with('-') || label.ends_with('-') {
            return Err(invalid("labels must not start or end with '-'"));
        }
        if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(invalid("labels may only contain ASCII letters, digits and '-'"));
        }
    }
    Ok(())
}

/// A provisioned tunnel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[non_exhaustive]
pub struct Tunnel {
    /// Unique identifier for this tunnel.
    pub id: TunnelId,
    /// Public domain the tunnel is served under.
    pub domain: String,
    /// Address the tunnel client forwards traffic to.
    pub client_addr: String,
    /// Port the tunnel client forwards traffic to.
    pub client_port: u16,
    /// When the tunnel finished provisioning.
    pub created_at: DateTime<Utc>,
}

impl Tunnel {
    /// Builds the tunnel record for a validated request.
    ///
    /// # Errors
    /// Propagates [`TunnelRequest::validate`] failures.
    pub fn from_request(request: TunnelRequest) -> Result<Self, CoreError> {
        request.validate()?;
        let client_port = u16::try_from(request.client_port)
            .map_err(|_| CoreError::InvalidPort { port: request.client_port })?;
        Ok(Self {
            id: TunnelId::new(),
            domain: request.domain,
            client_addr: request.client_addr,
            client_port,
            created_at: Utc::now(),
        })
    }
}
