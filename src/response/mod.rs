//! Response module - resolving operations from accepted/rejected documents.
//!
//! - [`ResponseClass`] - which response topic a document arrived on
//! - [`parse_response`] - resolves an operation's status in place
//! - [`ErrorCode`] - the `code` values of rejected responses

mod error_code;
mod parser;

pub use error_code::{error_for_code, ErrorCode};
pub use parser::{parse_error_document, parse_response, ResponseClass, CODE_KEY, MESSAGE_KEY};
