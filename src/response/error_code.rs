//! Error codes carried in the `code` field of rejected responses.

use crate::error::JobsError;

/// Closed set of error codes the jobs service sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    InvalidTopic,
    InvalidJson,
    InvalidRequest,
    InvalidStateTransition,
    ResourceNotFound,
    VersionMismatch,
    InternalError,
    RequestThrottled,
    TerminalStateReached,
}

impl ErrorCode {
    /// All codes, in table order.
    pub const ALL: [ErrorCode; 9] = [
        ErrorCode::InvalidTopic,
        ErrorCode::InvalidJson,
        ErrorCode::InvalidRequest,
        ErrorCode::InvalidStateTransition,
        ErrorCode::ResourceNotFound,
        ErrorCode::VersionMismatch,
        ErrorCode::InternalError,
        ErrorCode::RequestThrottled,
        ErrorCode::TerminalStateReached,
    ];

    /// Look up a code string (without quotes). Matching is exact.
    pub fn from_code(code: &[u8]) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|candidate| candidate.as_str().as_bytes() == code)
    }

    /// The code as it appears on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InvalidTopic => "InvalidTopic",
            ErrorCode::InvalidJson => "InvalidJson",
            ErrorCode::InvalidRequest => "InvalidRequest",
            ErrorCode::InvalidStateTransition => "InvalidStateTransition",
            ErrorCode::ResourceNotFound => "ResourceNotFound",
            ErrorCode::VersionMismatch => "VersionMismatch",
            ErrorCode::InternalError => "InternalError",
            ErrorCode::RequestThrottled => "RequestThrottled",
            ErrorCode::TerminalStateReached => "TerminalStateReached",
        }
    }

    /// The local error this code maps to.
    pub fn into_error(self) -> JobsError {
        match self {
            ErrorCode::InvalidTopic => JobsError::InvalidTopic,
            ErrorCode::InvalidJson => JobsError::InvalidJson,
            ErrorCode::InvalidRequest => JobsError::InvalidRequest,
            ErrorCode::InvalidStateTransition => JobsError::InvalidStateTransition,
            ErrorCode::ResourceNotFound => JobsError::NotFound,
            ErrorCode::VersionMismatch => JobsError::VersionMismatch,
            ErrorCode::InternalError => JobsError::InternalError,
            ErrorCode::RequestThrottled => JobsError::Throttled,
            ErrorCode::TerminalStateReached => JobsError::TerminalState,
        }
    }
}

/// Map a raw code string to an error; anything unknown is a bad response.
pub fn error_for_code(code: &[u8]) -> JobsError {
    ErrorCode::from_code(code)
        .map(ErrorCode::into_error)
        .unwrap_or(JobsError::BadResponse)
}
