//! Response parsing.
//!
//! The parser never returns a value. It resolves the operation it is given,
//! and every input, including empty or malformed documents, leaves that
//! operation in a terminal status.

use std::fmt;

use super::error_code::error_for_code;
use crate::buffer::ResponseBuffer;
use crate::error::JobsError;
use crate::json;
use crate::operation::Operation;

/// JSON key of the error code in rejected responses.
pub const CODE_KEY: &[u8] = b"code";

/// JSON key of the error message in rejected responses.
pub const MESSAGE_KEY: &[u8] = b"message";

/// Which response topic a document arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseClass {
    /// The request was accepted.
    Accepted,
    /// The request was rejected.
    Rejected,
}

impl ResponseClass {
    /// Topic suffix for this class.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseClass::Accepted => "accepted",
            ResponseClass::Rejected => "rejected",
        }
    }
}

impl fmt::Display for ResponseClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolve `operation` from a response document.
///
/// - Accepted: the whole document is copied into a buffer from the
///   operation's allocator and attached; allocation failure resolves the
///   operation with `JobsError::NoMemory` and attaches nothing.
/// - Rejected: the `code` field is mapped to an error; a missing or unknown
///   code resolves with `JobsError::BadResponse`.
///
/// Operations that are already terminal are left untouched.
pub fn parse_response(class: ResponseClass, payload: &[u8], operation: &mut Operation) {
    if operation.status().is_terminal() {
        tracing::debug!(
            "Ignoring {} response for completed operation {}",
            class,
            operation.token()
        );
        return;
    }

    match class {
        ResponseClass::Accepted => {
            match ResponseBuffer::copy_from(payload, operation.allocator().as_ref()) {
                Ok(buffer) => {
                    operation.succeed(buffer);
                }
                Err(e) => {
                    tracing::warn!(
                        "Failed to allocate {} bytes for {} response: {}",
                        payload.len(),
                        operation.kind(),
                        e
                    );
                    operation.fail(JobsError::NoMemory);
                }
            }
        }
        ResponseClass::Rejected => {
            let error = parse_error_document(payload);
            tracing::debug!(
                "{} operation {} rejected: {}",
                operation.kind(),
                operation.token(),
                error
            );
            operation.fail(error);
        }
    }
}

/// Map a rejected response document to its error.
pub fn parse_error_document(payload: &[u8]) -> JobsError {
    let Some(code) = json::find_value_slice(payload, CODE_KEY) else {
        tracing::warn!("Rejected response has no error code");
        return JobsError::BadResponse;
    };

    let Some(code) = json::unquote(code) else {
        tracing::warn!(
            "Rejected response error code is not a string: {}",
            String::from_utf8_lossy(code)
        );
        return JobsError::BadResponse;
    };

    if let Some(message) = json::find_value_slice(payload, MESSAGE_KEY) {
        tracing::debug!(
            "Rejection {}: {}",
            String::from_utf8_lossy(code),
            String::from_utf8_lossy(message)
        );
    }

    error_for_code(code)
}
