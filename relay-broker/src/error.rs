//! Error types for the broker crate.

use relay_core::{CoreError, CorrelationId};

/// Errors that can occur while starting or retrieving a brokered operation.
///
/// Failures of the operation itself are not errors here; they travel as
/// [`relay_core::Outcome::Failure`].
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum BrokerError {
    /// The id was never issued or its outcome has already been consumed.
    #[error("no such pending operation: {0}")]
    UnknownOperation(CorrelationId),

    /// The retrieve limit elapsed; the operation is parked again under the same id.
    #[error("operation {0} is still running")]
    StillPending(CorrelationId),

    /// The result channel closed without an outcome being written.
    #[error("operation {0} was abandoned before producing an outcome")]
    Abandoned(CorrelationId),

    /// A correlation id could not be generated.
    #[error(transparent)]
    Core(#[from] CoreError),
}
