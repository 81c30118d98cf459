//! Error types for iot-jobs-client.

use thiserror::Error;

/// Main error type for all jobs operations.
///
/// Errors raised after an operation was issued are delivered through the
/// operation's completion (waiter or callback), never as panics.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobsError {
    /// Memory for a request document or response buffer could not be obtained.
    #[error("memory allocation failed")]
    NoMemory,

    /// A request parameter failed validation before anything was published.
    #[error("bad parameter: {0}")]
    BadParameter(String),

    /// The response could not be interpreted (missing or unknown `code`, etc.).
    #[error("bad response from the jobs service")]
    BadResponse,

    /// Server rejected the request: the topic was invalid.
    #[error("rejected: InvalidTopic")]
    InvalidTopic,

    /// Server rejected the request: the request document was not valid JSON.
    #[error("rejected: InvalidJson")]
    InvalidJson,

    /// Server rejected the request: the request contents were invalid.
    #[error("rejected: InvalidRequest")]
    InvalidRequest,

    /// Server rejected the request: the status update is not a legal transition.
    #[error("rejected: InvalidStateTransition")]
    InvalidStateTransition,

    /// Server rejected the request: the job or execution does not exist.
    #[error("rejected: ResourceNotFound")]
    NotFound,

    /// Server rejected the request: `expectedVersion` did not match.
    #[error("rejected: VersionMismatch")]
    VersionMismatch,

    /// Server rejected the request: internal service error.
    #[error("rejected: InternalError")]
    InternalError,

    /// Server rejected the request: request rate exceeded.
    #[error("rejected: RequestThrottled")]
    Throttled,

    /// Server rejected the request: the job execution is already terminal.
    #[error("rejected: TerminalStateReached")]
    TerminalState,

    /// Another pending operation already uses this client token.
    #[error("client token {0} is already in use by a pending operation")]
    DuplicateToken(String),

    /// The in-flight operation limit was reached.
    #[error("too many operations in flight (limit {0})")]
    TooManyOperations(usize),

    /// No response arrived before the wait timeout elapsed.
    #[error("timed out waiting for a response")]
    Timeout,

    /// The operation was canceled locally (e.g. client shutdown).
    #[error("operation canceled")]
    Canceled,

    /// The transport failed to publish the request.
    #[error("publish failed: {0}")]
    Publish(String),

    /// Invalid client configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

impl JobsError {
    /// Whether this error came from a server-side rejection.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            JobsError::InvalidTopic
                | JobsError::InvalidJson
                | JobsError::InvalidRequest
                | JobsError::InvalidStateTransition
                | JobsError::NotFound
                | JobsError::VersionMismatch
                | JobsError::InternalError
                | JobsError::Throttled
                | JobsError::TerminalState
        )
    }
}

impl From<std::collections::TryReserveError> for JobsError {
    fn from(_: std::collections::TryReserveError) -> Self {
        JobsError::NoMemory
    }
}

impl From<serde_json::Error> for JobsError {
    fn from(err: serde_json::Error) -> Self {
        JobsError::Config(err.to_string())
    }
}

/// Result type alias using JobsError.
pub type Result<T> = std::result::Result<T, JobsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_classification() {
        assert!(JobsError::VersionMismatch.is_rejection());
        assert!(JobsError::TerminalState.is_rejection());
        assert!(!JobsError::BadResponse.is_rejection());
        assert!(!JobsError::Timeout.is_rejection());
    }

    #[test]
    fn test_try_reserve_maps_to_no_memory() {
        let mut v: Vec<u8> = Vec::new();
        let err = v.try_reserve_exact(usize::MAX).unwrap_err();
        assert_eq!(JobsError::from(err), JobsError::NoMemory);
    }

    #[test]
    fn test_display() {
        assert_eq!(
            JobsError::DuplicateToken("abc".into()).to_string(),
            "client token abc is already in use by a pending operation"
        );
        assert_eq!(JobsError::NotFound.to_string(), "rejected: ResourceNotFound");
    }
}
