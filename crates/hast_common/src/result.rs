//! Common result and error types for the hast generator.

/// Result of an internal operation that can only fail because of a generator bug.
pub type HastResult<T> = Result<T, InternalError>;

/// An internal error indicating a bug in the generator, not a problem with the
/// input program or configuration.
///
/// Input problems are reported through each crate's own error enum.
#[derive(Debug, thiserror::Error)]
#[error("internal generator error: {message}")]
pub struct InternalError {
    /// Description of the broken invariant.
    pub message: String,
}

impl InternalError {
    /// Creates a new internal error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<String> for InternalError {
    fn from(message: String) -> Self {
        Self { message }
    }
}
