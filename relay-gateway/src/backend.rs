//! Tunnel backend abstraction.
//!
//! The gateway only knows that creating or deleting a tunnel eventually
//! succeeds or fails; how provisioning happens is up to the implementation.

use async_trait::async_trait;
use relay_core::{CoreError, Tunnel, TunnelRequest};

/// Errors a tunnel backend can report for a single operation.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum BackendError {
    /// The request failed validation.
    #[error(transparent)]
    Invalid(#[from] CoreError),

    /// Another tunnel already serves this domain.
    #[error("domain already in use: {0}")]
    DomainTaken(String),

    /// No tunnel serves this domain.
    #[error("tunnel not found: {0}")]
    TunnelNotFound(String),
}

/// Mutation API for tunnels.
///
/// Implementations must be `Send + Sync`; operations run on detached tasks
/// spawned by the completion broker and are never cancelled.
#[async_trait]
pub trait TunnelBackend: Send + Sync {
    /// Provision a tunnel for `request`.
    ///
    /// # Errors
    /// Returns [`BackendError::Invalid`] if the request fails validation.
    /// Returns [`BackendError::DomainTaken`] if the domain is already served.
    async fn create_tunnel(&self, request: TunnelRequest) -> Result<Tunnel, BackendError>;

    /// Tear down the tunnel serving `domain`.
    ///
    /// # Errors
    /// Returns [`BackendError::TunnelNotFound`] if no tunnel serves `domain`.
    async fn delete_tunnel(&self, domain: &str) -> Result<(), BackendError>;

    /// All provisioned tunnels, oldest first.
    async fn list_tunnels(&self) -> Vec<Tunnel>;
}
