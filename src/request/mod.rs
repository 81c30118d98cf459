//! Request module - parameters, client tokens and document generation.
//!
//! Provides:
//! - [`RequestInfo`], [`UpdateInfo`], [`DescribeInfo`] - per-call parameters
//! - [`RequestContents`] - a request kind bound to its parameters
//! - [`ClientToken`] - the correlation key
//! - [`generate`] - builds a [`RequestDocument`]
//!
//! # Example
//!
//! ```
//! use iot_jobs_client::buffer::HeapAllocator;
//! use iot_jobs_client::request::{generate, JobState, RequestContents, RequestInfo, UpdateInfo};
//!
//! let update = UpdateInfo::new(JobState::Succeeded);
//! let info = RequestInfo::new().with_client_token("test");
//! let doc = generate(&RequestContents::Update(&update), &info, &HeapAllocator).unwrap();
//!
//! assert_eq!(doc.client_token_bytes(), br#""test""#);
//! ```

mod info;
mod serialize;
mod token;

pub use info::{
    DescribeInfo, JobState, OperationKind, RequestContents, RequestInfo, StepTimeout,
    UpdateInfo, MAX_CLIENT_TOKEN_LEN, MAX_JOB_ID_LEN, MAX_STEP_TIMEOUT_MINUTES, NEXT_JOB_ID,
};
pub use serialize::{generate, RequestDocument, CLIENT_TOKEN_KEY};
pub use token::{validate_client_token, ClientToken};
