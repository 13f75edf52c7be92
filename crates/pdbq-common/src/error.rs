//! Error types for PDBQ

use thiserror::Error;

/// Result type alias for PDBQ operations
pub type Result<T> = std::result::Result<T, PdbqError>;

/// Classified error surface for all PDBQ operations.
///
/// Every operation resolves to either a typed success payload or one of
/// these variants. Raw upstream error bodies are logged, never carried in
/// the message shown to callers.
#[derive(Error, Debug)]
pub enum PdbqError {
    /// Malformed input, rejected before any network call.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Upstream confirmed the entity does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The provider does not implement this operation.
    #[error("Operation '{operation}' is not supported by provider '{provider}'")]
    Unsupported {
        provider: &'static str,
        operation: &'static str,
    },

    /// Transport failure, non-2xx response, or alignment timeout.
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Invariant violation in local processing.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PdbqError {
    /// True when retrying against a mirror provider could help.
    ///
    /// `NotFound` is excluded: the mirror serves the same dataset, so a
    /// missing entry stays missing. `Validation` never reaches a provider.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PdbqError::ServiceUnavailable(_) | PdbqError::Internal(_) | PdbqError::Unsupported { .. }
        )
    }
}

impl From<reqwest::Error> for PdbqError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            PdbqError::ServiceUnavailable(format!("upstream request timed out: {err}"))
        } else {
            PdbqError::ServiceUnavailable(format!("upstream request failed: {err}"))
        }
    }
}

impl From<serde_json::Error> for PdbqError {
    fn from(err: serde_json::Error) -> Self {
        PdbqError::Internal(format!("response decoding failed: {err}"))
    }
}
