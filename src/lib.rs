//! # iot-jobs-client
//!
//! Device-side client for the IoT Jobs publish/subscribe protocol.
//!
//! A device asks the jobs service for pending work, starts the next job,
//! describes an execution and reports status updates. Each request is a small
//! JSON document published on a thing-scoped topic; the service answers on
//! `<request topic>/accepted` or `<request topic>/rejected`, and answers are
//! matched to requests by their `clientToken`.
//!
//! ## Architecture
//!
//! - **Requests**: flat JSON documents generated with an exact precomputed
//!   length into a single allocation
//! - **Responses**: scanned for `clientToken` and `code` without building a
//!   tree; accepted documents are handed to the caller verbatim
//! - **Correlation**: a mutex-guarded registry keyed by client token, resolved
//!   exactly once by a response, a timeout or a cancellation
//!
//! The MQTT connection itself is not part of this crate: implement
//! [`transport::JobsTransport`] for it and feed incoming messages to
//! [`JobsClient::handle_publish`].
//!
//! ## Example
//!
//! ```no_run
//! use iot_jobs_client::request::{JobState, UpdateInfo};
//! use iot_jobs_client::transport::ChannelTransport;
//! use iot_jobs_client::JobsClient;
//!
//! # async fn run() -> iot_jobs_client::Result<()> {
//! let (transport, _outbound) = ChannelTransport::new(64);
//! let client = JobsClient::builder("sensor-1").transport(transport).build()?;
//!
//! let next = client.start_next(&UpdateInfo::default()).await?;
//! if let Some(execution) = next.find("execution") {
//!     println!("started {}", String::from_utf8_lossy(execution));
//!     client
//!         .update("job-1", &UpdateInfo::new(JobState::Succeeded))
//!         .await?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod buffer;
pub mod config;
pub mod error;
pub mod json;
pub mod operation;
pub mod request;
pub mod response;
pub mod topic;
pub mod transport;

mod client;

pub use buffer::ResponseBuffer;
pub use client::{JobsClient, JobsClientBuilder};
pub use config::JobsConfig;
pub use error::{JobsError, Result};
pub use operation::{CompletedOperation, WaitableOperation};
pub use request::{ClientToken, OperationKind, RequestContents, RequestInfo};
pub use response::ResponseClass;
