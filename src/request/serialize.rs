//! Request document generation.
//!
//! Field layout per kind:
//!
//! | kind       | fields                                                        |
//! |------------|---------------------------------------------------------------|
//! | GetPending | `clientToken`                                                 |
//! | StartNext  | `statusDetails`?, `stepTimeoutInMinutes`?, `clientToken`      |
//! | Describe   | `executionNumber`?, `includeJobDocument`, `clientToken`       |
//! | Update     | `status`, `statusDetails`?, `expectedVersion`? (quoted), `executionNumber`?, `includeJobExecutionState`? , `includeJobDocument`?, `stepTimeoutInMinutes`?, `clientToken` |
//!
//! The byte range of the emitted client token (quotes included) is recorded
//! on the [`RequestDocument`] so the correlator never re-scans the document.

use std::fmt;
use std::ops::Range;

use bytes::Bytes;

use super::info::{DescribeInfo, OperationKind, RequestContents, RequestInfo, UpdateInfo};
use super::token::ClientToken;
use crate::buffer::BufferAllocator;
use crate::error::Result;
use crate::json::{JsonValue, ObjectWriter};

/// JSON key of the client token.
pub const CLIENT_TOKEN_KEY: &str = "clientToken";

/// A generated request document.
pub struct RequestDocument {
    kind: OperationKind,
    bytes: Vec<u8>,
    token_span: Range<usize>,
    token: ClientToken,
}

impl RequestDocument {
    /// Kind the document was generated for.
    #[inline]
    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    /// The document bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Document length in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the document is empty (never true for generated documents).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Byte range of the client token value, quotes included.
    #[inline]
    pub fn client_token_span(&self) -> Range<usize> {
        self.token_span.clone()
    }

    /// The client token value as emitted, quotes included.
    #[inline]
    pub fn client_token_bytes(&self) -> &[u8] {
        &self.bytes[self.token_span.clone()]
    }

    /// The client token without quotes.
    #[inline]
    pub fn client_token(&self) -> &ClientToken {
        &self.token
    }

    /// Consume the document for publishing.
    pub fn into_bytes(self) -> Bytes {
        Bytes::from(self.bytes)
    }
}

impl fmt::Debug for RequestDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestDocument")
            .field("kind", &self.kind)
            .field("token", &self.token)
            .field("document", &String::from_utf8_lossy(&self.bytes))
            .finish()
    }
}

/// Generate the request document for `contents`.
///
/// Parameters are emitted as given; range checks belong to
/// [`RequestInfo::validate`] and [`RequestContents::validate`]. Fails with
/// `JobsError::NoMemory` when `allocator` cannot supply the buffer.
pub fn generate(
    contents: &RequestContents<'_>,
    info: &RequestInfo,
    allocator: &dyn BufferAllocator,
) -> Result<RequestDocument> {
    let token = match &info.client_token {
        Some(token) => ClientToken::new(token.as_str()),
        None => ClientToken::generate(),
    };

    let mut object = ObjectWriter::new();
    match contents {
        RequestContents::GetPending => {}
        RequestContents::StartNext(update) => start_next_fields(&mut object, update),
        RequestContents::Describe(describe) => describe_fields(&mut object, describe),
        RequestContents::Update(update) => update_fields(&mut object, update),
    }

    let token_index = object.len();
    object.field(CLIENT_TOKEN_KEY, JsonValue::Str(token.as_str()));

    let mut bytes = allocator.allocate(object.encoded_len())?;
    let spans = object.write_into(&mut bytes);
    let token_span = spans[token_index].clone();

    Ok(RequestDocument {
        kind: contents.kind(),
        bytes,
        token_span,
        token,
    })
}

fn step_timeout(update: &UpdateInfo) -> Option<JsonValue<'_>> {
    update.step_timeout.wire_value().map(JsonValue::Int)
}

// Zero is the service's "no execution number" value.
fn execution_number(number: Option<u32>) -> Option<JsonValue<'static>> {
    number
        .filter(|&n| n != 0)
        .map(|n| JsonValue::Int(i64::from(n)))
}

fn status_details(update: &UpdateInfo) -> Option<JsonValue<'_>> {
    update
        .status_details
        .as_deref()
        .map(|details| JsonValue::Raw(details.as_bytes()))
}

fn start_next_fields<'a>(object: &mut ObjectWriter<'a>, update: &'a UpdateInfo) {
    object
        .optional("statusDetails", status_details(update))
        .optional("stepTimeoutInMinutes", step_timeout(update));
}

fn describe_fields<'a>(object: &mut ObjectWriter<'a>, describe: &'a DescribeInfo) {
    object
        .optional(
            "executionNumber",
            execution_number(describe.execution_number),
        )
        .field(
            "includeJobDocument",
            JsonValue::Bool(describe.include_job_document),
        );
}

fn update_fields<'a>(object: &mut ObjectWriter<'a>, update: &'a UpdateInfo) {
    // `expectedVersion` is a quoted string on the wire, `executionNumber` is not.
    object
        .field("status", JsonValue::Str(update.new_status.as_str()))
        .optional("statusDetails", status_details(update))
        .optional(
            "expectedVersion",
            update
                .expected_version
                .filter(|&v| v != 0)
                .map(|v| JsonValue::QuotedInt(u64::from(v))),
        )
        .optional(
            "executionNumber",
            execution_number(update.execution_number),
        )
        .optional(
            "includeJobExecutionState",
            update.include_job_execution_state.then_some(JsonValue::Bool(true)),
        )
        .optional(
            "includeJobDocument",
            update.include_job_document.then_some(JsonValue::Bool(true)),
        )
        .optional("stepTimeoutInMinutes", step_timeout(update));
}
