use thiserror::Error;

/// DA-layer failures.
///
/// Transient failures are retried with backoff by the poster; permanent
/// ones (misconfigured namespace, oversized blob) raise a critical alert
/// and leave the local block uncommitted rather than rewriting anything.
#[derive(Debug, Error)]
pub enum DaError {
    #[error("transient DA failure: {0}")]
    Transient(String),

    #[error("permanent DA failure: {0}")]
    Permanent(String),
}

impl DaError {
    pub fn is_transient(&self) -> bool {
        matches!(self, DaError::Transient(_))
    }
}
