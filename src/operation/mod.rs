//! Operation module - in-flight request tracking and correlation.
//!
//! Provides:
//! - [`Operation`] - one request, its status and its response buffer
//! - [`OperationRegistry`] - pending operations keyed by client token
//! - [`CompletionMode`] - waiter or callback, fixed at registration
//! - [`WaitableOperation`] - blocks until completion or timeout
//!
//! # Lifecycle
//!
//! ```text
//! issue ──► register ──► publish
//!                           │
//!      response / cancel / timeout ──► remove from registry ──► parse ──► deliver
//! ```

mod handle;
mod record;
mod registry;

pub use handle::WaitableOperation;
pub use record::{CompletedOperation, JobsStatus, Operation};
pub use registry::{CompletionMode, JobsCallback, OperationRegistry, RegistrationId};
