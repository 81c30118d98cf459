//! A single jobs operation and its status.

use std::fmt;

use crate::buffer::{ResponseBuffer, SharedAllocator};
use crate::error::{JobsError, Result};
use crate::request::{ClientToken, OperationKind};

/// Status of an operation.
///
/// Starts as `Pending` and changes exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobsStatus {
    /// No response yet.
    Pending,
    /// The request was accepted.
    Success,
    /// The request failed or was rejected.
    Failed(JobsError),
}

impl JobsStatus {
    /// Whether this status can no longer change.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobsStatus::Pending)
    }
}

/// One request and everything needed to resolve it.
pub struct Operation {
    token: ClientToken,
    kind: OperationKind,
    status: JobsStatus,
    response: Option<ResponseBuffer>,
    allocator: SharedAllocator,
}

impl Operation {
    /// Create a pending operation.
    pub fn new(token: ClientToken, kind: OperationKind, allocator: SharedAllocator) -> Self {
        Self {
            token,
            kind,
            status: JobsStatus::Pending,
            response: None,
            allocator,
        }
    }

    /// Correlation key.
    #[inline]
    pub fn token(&self) -> &ClientToken {
        &self.token
    }

    /// Request kind.
    #[inline]
    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    /// Current status.
    #[inline]
    pub fn status(&self) -> &JobsStatus {
        &self.status
    }

    /// Attached response buffer, if any.
    pub fn response(&self) -> Option<&ResponseBuffer> {
        self.response.as_ref()
    }

    /// Allocator used for response buffers.
    pub fn allocator(&self) -> &SharedAllocator {
        &self.allocator
    }

    /// Move the operation to a terminal status.
    ///
    /// Returns `false` and changes nothing if the operation is already
    /// terminal or `status` is `Pending`.
    pub fn resolve(&mut self, status: JobsStatus) -> bool {
        if self.status.is_terminal() || !status.is_terminal() {
            return false;
        }
        self.status = status;
        true
    }

    /// Resolve as accepted, attaching the response buffer.
    pub fn succeed(&mut self, response: ResponseBuffer) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.response = Some(response);
        self.status = JobsStatus::Success;
        true
    }

    /// Resolve as failed.
    pub fn fail(&mut self, error: JobsError) -> bool {
        self.resolve(JobsStatus::Failed(error))
    }

    /// Consume the operation into the result handed to the caller.
    pub fn into_completed(self) -> CompletedOperation {
        let result = match (self.status, self.response) {
            (JobsStatus::Success, Some(response)) => Ok(response),
            (JobsStatus::Success, None) => Err(JobsError::BadResponse),
            (JobsStatus::Failed(error), _) => Err(error),
            (JobsStatus::Pending, _) => Err(JobsError::Canceled),
        };

        CompletedOperation {
            token: self.token,
            kind: self.kind,
            result,
        }
    }
}

impl fmt::Debug for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation")
            .field("token", &self.token)
            .field("kind", &self.kind)
            .field("status", &self.status)
            .field("response", &self.response.as_ref().map(|r| r.len()))
            .finish()
    }
}

/// Final result of an operation, owned by the caller.
#[derive(Debug)]
pub struct CompletedOperation {
    /// Correlation key of the operation.
    pub token: ClientToken,
    /// Request kind.
    pub kind: OperationKind,
    /// Accepted response document, or the error that ended the operation.
    pub result: Result<ResponseBuffer>,
}

impl CompletedOperation {
    /// Whether the request was accepted.
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}
