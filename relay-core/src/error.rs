/// Errors produced by the `relay-core` crate.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum CoreError {
    /// The operating system entropy source could not produce random bytes.
    #[error("entropy source failed: {reason}")]
    Entropy { reason: String },

    /// A correlation id could not be parsed from its textual form.
    #[error("invalid correlation id: {reason}")]
    InvalidCorrelationId { reason: String },

    /// A tunnel domain failed validation.
    #[error("invalid domain '{domain}': {reason}")]
    InvalidDomain { domain: String, reason: String },

    /// A tunnel client port was outside the usable range.
    #[error("invalid client port {port}: must be in 1..=65535")]
    InvalidPort { port: u32 },
}
