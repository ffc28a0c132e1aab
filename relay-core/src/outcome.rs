use std::fmt;

use serde::{Deserialize, Serialize};

/// Terminal result of a backend operation.
///
/// Each started operation produces exactly one `Outcome`, written once by
/// the task executing the work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Outcome {
    /// The operation succeeded; the caller should be sent to this location.
    Success(String),
    /// The operation failed for the given human-readable reason.
    Failure(String),
}

impl Outcome {
    /// Creates a successful outcome redirecting to `target`.
    pub fn success(target: impl Into<String>) -> Self {
        Self::Success(target.into())
    }

    /// Creates a failed outcome carrying `reason`.
    pub fn failure(reason: impl Into<String>) -> Self {
        Self::Failure(reason.into())
    }

    /// Returns `true` for [`Outcome::Success`].
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success(target) => write!(f, "success -> {target}"),
            Self::Failure(reason) => write!(f, "failure: {reason}"),
        }
    }
}

impl<E: fmt::Display> From<Result<String, E>> for Outcome {
    fn from(result: Result<String, E>) -> Self {
        match result {
            Ok(target) => Self::Success(target),
            Err(e) => Self::Failure(e.to_string()),
        }
    }
}
