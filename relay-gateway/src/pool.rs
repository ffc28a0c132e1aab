//! In-memory tunnel registry.
//!
//! Stands in for a real tunnel manager: records tunnels by domain and
//! sleeps for a configurable provisioning delay on every mutation, which is
//! what makes the completion broker's pending path observable.

use std::{sync::RwLock, time::Duration};

use async_trait::async_trait;
use indexmap::IndexMap;
use relay_core::{Tunnel, TunnelRequest};
use tracing::info;

use crate::backend::{BackendError, TunnelBackend};

/// Thread-safe registry of provisioned tunnels, keyed by domain.
#[derive(Debug, Default)]
pub struct TunnelPool {
    tunnels: RwLock<IndexMap<String, Tunnel>>,
    provision_delay: Duration,
}

impl TunnelPool {
    /// Create an empty pool whose mutations take `provision_delay`.
    #[must_use]
    pub fn new(provision_delay: Duration) -> Self {
        Self { tunnels: RwLock::new(IndexMap::new()), provision_delay }
    }
}

#[async_trait]
impl TunnelBackend for TunnelPool {
    /// # Panics
    /// Panics if the internal `RwLock` is poisoned.
    async fn create_tunnel(&self, request: TunnelRequest) -> Result<Tunnel, BackendError> {
        let tunnel = Tunnel::from_request(request)?;
        tokio::time::sleep(self.provision_delay).await;

        #[expect(clippy::expect_used, reason = "lock poisoning is unrecoverable")]
        let mut tunnels = self.tunnels.write().expect("tunnel pool write lock poisoned");
        if tunnels.contains_key(&tunnel.domain) {
            return Err(BackendError::DomainTaken(tunnel.domain));
        }
        info!(domain = %tunnel.domain, id = %tunnel.id, "tunnel provisioned");
        tunnels.insert(tunnel.domain.clone(), tunnel.clone());
        Ok(tunnel)
    }

    /// # Panics
    /// Panics if the internal `RwLock` is poisoned.
    async fn delete_tunnel(&self, domain: &str) -> Result<(), BackendError> {
        tokio::time::sleep(self.provision_delay).await;

        #[expect(clippy::expect_used, reason = "lock poisoning is unrecoverable")]
        let mut tunnels = self.tunnels.write().expect("tunnel pool write lock poisoned");
        match tunnels.shift_remove(domain) {
            Some(tunnel) => {
                info!(domain, id = %tunnel.id, "tunnel removed");
                Ok(())
            }
            None => Err(BackendError::TunnelNotFound(domain.to_owned())),
        }
    }

    /// # Panics
    /// Panics if the internal `RwLock` is poisoned.
    async fn list_tunnels(&self) -> Vec<Tunnel> {
        #[expect(clippy::expect_used, reason = "lock poisoning is unrecoverable")]
        let tunnels = self.tunnels.read().expect("tunnel pool read lock poisoned");
        tunnels.values().cloned().collect()
    }
}
