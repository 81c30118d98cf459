//! JSON module - the two primitives the jobs protocol needs.
//!
//! - [`find_value`] / [`find_value_slice`] - locate a key's value span without
//!   building a tree
//! - [`ObjectWriter`] - build a flat request object with an exact,
//!   precomputed length
//!
//! Nested values (status details, job documents) are never interpreted; they
//! are copied byte for byte.

mod scanner;
mod writer;

pub use scanner::{find_value, find_value_slice, unquote};
pub use writer::{JsonValue, ObjectWriter};
