//! Error types for the Saathi core.

use thiserror::Error;

/// Result type alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Failures the relay flow can surface. One variant per external
/// collaborator; callers do not get finer-grained subtypes.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Preference backend unreachable or an operation on it failed.
    #[error("preference store unavailable: {0}")]
    StoreUnavailable(String),

    /// Completion call failed or returned an unusable result.
    #[error("generation failed: {0}")]
    GenerationFailed(String),
}

impl From<sled::Error> for CoreError {
    fn from(err: sled::Error) -> Self {
        CoreError::StoreUnavailable(err.to_string())
    }
}
