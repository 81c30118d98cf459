//! Transport module - the publish seam to the pub/sub connection.
//!
//! Connection management, TLS and subscriptions belong to the transport.
//! The client only needs to publish a request document on a topic; incoming
//! responses are handed back through
//! [`JobsClient::handle_publish`](crate::JobsClient::handle_publish).
//!
//! - [`JobsTransport`] - publish primitive implemented by the connection
//! - [`ChannelTransport`] - forwards publishes into a tokio mpsc channel

mod channel;

use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;

use crate::error::Result;

pub use channel::{ChannelTransport, OutboundMessage};

/// Boxed future returned by transports.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Publish side of a pub/sub connection.
pub trait JobsTransport: Send + Sync + 'static {
    /// Publish `payload` on `topic`.
    ///
    /// Failures should be reported as `JobsError::Publish`.
    fn publish(&self, topic: String, payload: Bytes) -> BoxFuture<'static, Result<()>>;
}
