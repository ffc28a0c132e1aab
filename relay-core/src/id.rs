use std::{fmt, str::FromStr};

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::error::CoreError;

/// Number of random bytes backing a [`CorrelationId`].
pub const CORRELATION_ID_LEN: usize = 16;

/// Opaque single-use token linking a deferred poll to the operation that
/// produced it.
///
/// Backed by 128 bits from the operating system entropy source and rendered
/// as unpadded URL-safe base64, so it can be dropped into a query string
/// as-is.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct CorrelationId([u8; CORRELATION_ID_LEN]);

impl CorrelationId {
    /// Draws a fresh id from the operating system entropy source.
    ///
    /// # Errors
    /// Returns [`CoreError::Entropy`] if the entropy source fails.
    pub fn generate() -> Result<Self, CoreError> {
        let mut bytes = [0u8; CORRELATION_ID_LEN];
        getrandom::fill(&mut bytes).map_err(|e| CoreError::Entropy { reason: e.to_string() })?;
        Ok(Self(bytes))
    }

    /// Creates an id from raw bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; CORRELATION_ID_LEN]) -> Self {
        Self(bytes)
    }

    /// Returns the raw bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; CORRELATION_ID_LEN] {
        &self.0
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&URL_SAFE_NO_PAD.encode(self.0))
    }
}

impl fmt::Debug for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CorrelationId({self})")
    }
}

impl FromStr for CorrelationId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let decoded = URL_SAFE_NO_PAD
            .decode(s)
            .map_err(|e| CoreError::InvalidCorrelationId { reason: e.to_string() })?;
        let bytes: [u8; CORRELATION_ID_LEN] =
            decoded.try_into().map_err(|v: Vec<u8>| CoreError::InvalidCorrelationId {
                reason: format!("expected {CORRELATION_ID_LEN} bytes, got {}", v.len()),
            })?;
        Ok(Self(bytes))
    }
}

impl Serialize for CorrelationId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CorrelationId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

/// Unique identifier for a provisioned tunnel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub struct TunnelId(pub Uuid);

impl TunnelId {
    /// Creates a new random `TunnelId`.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TunnelId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TunnelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for TunnelId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}
