use thiserror::Error;

/// Fatal conditions of a synthesis run.
///
/// Unsolvable separation problems are *not* errors; they are reported through
/// [`crate::synthesis::SynthesizePN`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SynthesisError {
    #[error("the transition system has no initial state")]
    MissingInitialState,
    #[error("event `{event}` has no location, but the distributed property was requested")]
    MissingLocation { event: String },
    #[error("invalid bound {value} for property {property}")]
    InvalidBound { property: &'static str, value: u64 },
    #[error("state {0} is not reachable from the initial state")]
    UnreachableState(String),
    #[error("synthesis was cancelled")]
    Cancelled,
    #[error("internal invariant violated: {0}")]
    InvariantViolation(String),
    #[error("arithmetic overflow while computing regions")]
    Overflow,
    #[error("failed to start worker pool: {0}")]
    WorkerPool(String),
}

impl SynthesisError {
    /// Configuration errors are caused by the request, not by a bug.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            SynthesisError::MissingInitialState
                | SynthesisError::MissingLocation { .. }
                | SynthesisError::InvalidBound { .. }
        )
    }
}
