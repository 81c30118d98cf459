//! Handle for waiting on an operation.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;

use super::record::CompletedOperation;
use super::registry::{OperationRegistry, RegistrationId};
use crate::buffer::ResponseBuffer;
use crate::error::{JobsError, Result};
use crate::request::{ClientToken, OperationKind};

/// A pending operation whose result is collected with [`wait`](Self::wait).
///
/// Dropping the handle without waiting removes the operation from the
/// registry; a response that arrives later is dropped.
#[derive(Debug)]
pub struct WaitableOperation {
    token: ClientToken,
    kind: OperationKind,
    id: RegistrationId,
    receiver: oneshot::Receiver<CompletedOperation>,
    registry: Arc<OperationRegistry>,
    finished: bool,
}

impl WaitableOperation {
    pub(crate) fn new(
        token: ClientToken,
        kind: OperationKind,
        id: RegistrationId,
        receiver: oneshot::Receiver<CompletedOperation>,
        registry: Arc<OperationRegistry>,
    ) -> Self {
        Self {
            token,
            kind,
            id,
            receiver,
            registry,
            finished: false,
        }
    }

    /// Correlation key of the operation.
    #[inline]
    pub fn token(&self) -> &ClientToken {
        &self.token
    }

    /// Request kind.
    #[inline]
    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    /// Wait for the accepted response document.
    ///
    /// If `timeout` elapses first the operation is removed from the registry
    /// and `JobsError::Timeout` is returned.
    pub async fn wait(self, timeout: Duration) -> Result<ResponseBuffer> {
        self.wait_completed(timeout).await.result
    }

    /// Like [`wait`](Self::wait), returning the token and kind as well.
    pub async fn wait_completed(mut self, timeout: Duration) -> CompletedOperation {
        let outcome = match tokio::time::timeout(timeout, &mut self.receiver).await {
            Ok(received) => received,
            Err(_) => {
                // Cancelling delivers the timeout into our own channel. If the
                // cancel loses, a response already removed the entry and is
                // about to deliver, so wait for it.
                if self
                    .registry
                    .cancel_registration(&self.token, self.id, JobsError::Timeout)
                {
                    tracing::debug!("{} operation {} timed out", self.kind, self.token);
                }
                (&mut self.receiver).await
            }
        };
        self.finished = true;

        outcome.unwrap_or_else(|_| CompletedOperation {
            token: self.token.clone(),
            kind: self.kind,
            result: Err(JobsError::Canceled),
        })
    }
}

impl Drop for WaitableOperation {
    fn drop(&mut self) {
        if !self.finished && self.registry.discard_registration(&self.token, self.id) {
            tracing::debug!(
                "{} operation {} abandoned before completion",
                self.kind,
                self.token
            );
        }
    }
}
