//! Channel-backed transport.
//!
//! Every publish becomes an [`OutboundMessage`] on a bounded mpsc channel.
//! The receiving side can bridge to a real connection, or act as the service
//! in tests.

use bytes::Bytes;
use tokio::sync::mpsc;

use super::{BoxFuture, JobsTransport};
use crate::error::{JobsError, Result};

/// A message published by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    /// Topic the message was published on.
    pub topic: String,
    /// Request document.
    pub payload: Bytes,
}

/// Transport that forwards publishes into a channel.
#[derive(Debug, Clone)]
pub struct ChannelTransport {
    tx: mpsc::Sender<OutboundMessage>,
}

impl ChannelTransport {
    /// Create a transport and the receiver for its messages.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<OutboundMessage>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }
}

impl JobsTransport for ChannelTransport {
    fn publish(&self, topic: String, payload: Bytes) -> BoxFuture<'static, Result<()>> {
        let tx = self.tx.clone();
        Box::pin(async move {
            tx.send(OutboundMessage { topic, payload })
                .await
                .map_err(|_| JobsError::Publish("channel closed".to_string()))
        })
    }
}
