//! Client builder and request issuing.
//!
//! The [`JobsClientBuilder`] provides a fluent API for configuring the
//! client. The [`JobsClient`] drives each operation:
//! 1. Validate the request parameters
//! 2. Generate the request document
//! 3. Register the operation under its client token
//! 4. Publish the document on the request topic
//!
//! Responses come back through [`JobsClient::handle_publish`] (or
//! [`JobsClient::handle_response`] when the caller already classified the
//! topic) and are correlated by client token.
//!
//! # Example
//!
//! ```
//! use iot_jobs_client::request::{JobState, UpdateInfo};
//! use iot_jobs_client::transport::ChannelTransport;
//! use iot_jobs_client::JobsClient;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> iot_jobs_client::Result<()> {
//! let (transport, mut outbound) = ChannelTransport::new(16);
//! let client = JobsClient::builder("sensor-1").transport(transport).build()?;
//!
//! let responder = client.clone();
//! tokio::spawn(async move {
//!     while let Some(msg) = outbound.recv().await {
//!         // Echo the request back as an accepted response.
//!         let topic = format!("{}/accepted", msg.topic);
//!         responder.handle_publish(&topic, &msg.payload);
//!     }
//! });
//!
//! let response = client.update("job-1", &UpdateInfo::new(JobState::Succeeded)).await?;
//! assert_eq!(response.find("status"), Some(&b"\"SUCCEEDED\""[..]));
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use crate::buffer::{default_allocator, ResponseBuffer, SharedAllocator};
use crate::config::JobsConfig;
use crate::error::{JobsError, Result};
use crate::json;
use crate::operation::{
    CompletedOperation, CompletionMode, Operation, OperationRegistry, RegistrationId,
    WaitableOperation,
};
use crate::request::{
    generate, ClientToken, DescribeInfo, OperationKind, RequestContents, RequestDocument,
    RequestInfo, UpdateInfo, CLIENT_TOKEN_KEY,
};
use crate::response::ResponseClass;
use crate::topic::JobsTopics;
use crate::transport::JobsTransport;

/// Builder for configuring and creating a [`JobsClient`].
pub struct JobsClientBuilder {
    config: JobsConfig,
    allocator: SharedAllocator,
    transport: Option<Arc<dyn JobsTransport>>,
}

impl JobsClientBuilder {
    /// Create a builder for `thing_name` with default settings.
    pub fn new(thing_name: impl Into<String>) -> Self {
        Self::from_config(JobsConfig::new(thing_name))
    }

    /// Create a builder from a loaded configuration.
    pub fn from_config(config: JobsConfig) -> Self {
        Self {
            config,
            allocator: default_allocator(),
            transport: None,
        }
    }

    /// Set the timeout used by the convenience calls.
    ///
    /// Default: 5 seconds
    pub fn default_timeout(mut self, timeout: Duration) -> Self {
        self.config.default_timeout = timeout;
        self
    }

    /// Set the maximum number of pending operations.
    ///
    /// When this limit is reached, new requests fail with
    /// `JobsError::TooManyOperations`.
    /// Default: 256
    pub fn max_in_flight(mut self, limit: usize) -> Self {
        self.config.max_in_flight = limit;
        self
    }

    /// Set the allocator used for request and response documents.
    pub fn allocator(mut self, allocator: SharedAllocator) -> Self {
        self.allocator = allocator;
        self
    }

    /// Set the transport requests are published on. Required.
    pub fn transport<T: JobsTransport>(mut self, transport: T) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Set a transport that is already shared.
    pub fn shared_transport(mut self, transport: Arc<dyn JobsTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Validate the configuration and build the client.
    pub fn build(self) -> Result<JobsClient> {
        self.config.validate()?;
        let transport = self
            .transport
            .ok_or_else(|| JobsError::Config("no transport configured".into()))?;

        Ok(JobsClient {
            registry: Arc::new(OperationRegistry::with_limit(self.config.max_in_flight)),
            transport,
            topics: Arc::new(JobsTopics::new(&self.config.thing_name)),
            allocator: self.allocator,
            config: Arc::new(self.config),
        })
    }
}

/// Device-side jobs client.
///
/// Cloning is cheap; clones share the same pending operations, so a clone
/// can be moved into a callback or a response-dispatch task.
#[derive(Clone)]
pub struct JobsClient {
    registry: Arc<OperationRegistry>,
    transport: Arc<dyn JobsTransport>,
    topics: Arc<JobsTopics>,
    allocator: SharedAllocator,
    config: Arc<JobsConfig>,
}

impl JobsClient {
    /// Create a new client builder.
    pub fn builder(thing_name: impl Into<String>) -> JobsClientBuilder {
        JobsClientBuilder::new(thing_name)
    }

    /// Issue a request whose result is collected by waiting.
    ///
    /// Returns once the request is published. Fails synchronously on invalid
    /// parameters, allocation failure, a duplicate client token, the
    /// in-flight limit, or a publish failure; in every failure case nothing
    /// stays registered.
    pub async fn issue(
        &self,
        contents: RequestContents<'_>,
        info: &RequestInfo,
    ) -> Result<WaitableOperation> {
        let document = self.prepare(&contents, info)?;
        let token = document.client_token().clone();
        let kind = document.kind();

        let (mode, receiver) = CompletionMode::waitable();
        let id = self
            .registry
            .register(Operation::new(token.clone(), kind, self.allocator.clone()), mode)?;

        // Dropping the handle on a publish error removes the registration.
        let handle = WaitableOperation::new(token, kind, id, receiver, self.registry.clone());
        self.publish(document, info.job_id.as_deref()).await?;
        Ok(handle)
    }

    /// Issue a request whose result is delivered to `callback`.
    ///
    /// The callback runs exactly once, on the thread that completes the
    /// operation. It is not invoked when this call itself fails, or when the
    /// returned future is dropped before the request is published.
    ///
    /// No timeout applies: the operation stays pending until a response
    /// arrives or it is ended with [`cancel`](Self::cancel) or
    /// [`shutdown`](Self::shutdown). Use
    /// [`issue_with_callback_timeout`](Self::issue_with_callback_timeout) to
    /// bound it.
    pub async fn issue_with_callback<F>(
        &self,
        contents: RequestContents<'_>,
        info: &RequestInfo,
        callback: F,
    ) -> Result<ClientToken>
    where
        F: FnOnce(CompletedOperation) + Send + 'static,
    {
        let (token, _) = self.submit_callback(contents, info, callback).await?;
        Ok(token)
    }

    /// Like [`issue_with_callback`](Self::issue_with_callback), but the
    /// operation is canceled with `JobsError::Timeout` if no response arrives
    /// within `timeout`.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn issue_with_callback_timeout<F>(
        &self,
        contents: RequestContents<'_>,
        info: &RequestInfo,
        timeout: Duration,
        callback: F,
    ) -> Result<ClientToken>
    where
        F: FnOnce(CompletedOperation) + Send + 'static,
    {
        let (token, id) = self.submit_callback(contents, info, callback).await?;

        let registry = self.registry.clone();
        let expired = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            if registry.cancel_registration(&expired, id, JobsError::Timeout) {
                tracing::debug!("Operation {} timed out", expired);
            }
        });

        Ok(token)
    }

    /// End the pending operation `token` with `JobsError::Canceled`.
    ///
    /// Its waiter or callback receives the cancellation. Returns `false` if
    /// no operation with that token is pending.
    pub fn cancel(&self, token: &ClientToken) -> bool {
        self.registry.cancel(token, JobsError::Canceled)
    }

    /// Ask for the pending job executions and wait for the answer.
    pub async fn get_pending(&self) -> Result<ResponseBuffer> {
        self.issue(RequestContents::GetPending, &RequestInfo::new())
            .await?
            .wait(self.config.default_timeout)
            .await
    }

    /// Start the next pending job execution and wait for the answer.
    pub async fn start_next(&self, update: &UpdateInfo) -> Result<ResponseBuffer> {
        self.issue(RequestContents::StartNext(update), &RequestInfo::new())
            .await?
            .wait(self.config.default_timeout)
            .await
    }

    /// Describe the execution of `job_id` (or `$next`) and wait for the answer.
    pub async fn describe(&self, job_id: &str, describe: &DescribeInfo) -> Result<ResponseBuffer> {
        self.issue(
            RequestContents::Describe(describe),
            &RequestInfo::new().with_job_id(job_id),
        )
        .await?
        .wait(self.config.default_timeout)
        .await
    }

    /// Report the status of `job_id` and wait for the answer.
    pub async fn update(&self, job_id: &str, update: &UpdateInfo) -> Result<ResponseBuffer> {
        self.issue(
            RequestContents::Update(update),
            &RequestInfo::new().with_job_id(job_id),
        )
        .await?
        .wait(self.config.default_timeout)
        .await
    }

    /// Feed a response received on a jobs topic.
    ///
    /// Returns `true` if the topic is a response topic of this thing and the
    /// response resolved a pending operation.
    pub fn handle_publish(&self, topic: &str, payload: &[u8]) -> bool {
        match self.topics.classify(topic) {
            Some((kind, class)) => self.handle_response(kind, class, payload),
            None => {
                tracing::debug!("Ignoring message on {}", topic);
                false
            }
        }
    }

    /// Feed a response of `kind` and `class`.
    ///
    /// The client token is read from the payload. Returns `false` when the
    /// payload has no usable token or no operation is waiting for it.
    pub fn handle_response(&self, kind: OperationKind, class: ResponseClass, payload: &[u8]) -> bool {
        let token = json::find_value_slice(payload, CLIENT_TOKEN_KEY.as_bytes())
            .and_then(ClientToken::from_span);

        let Some(token) = token else {
            tracing::warn!("{} {} response without a client token, dropping", kind, class);
            return false;
        };

        self.registry.complete(&token, Some(kind), class, payload)
    }

    /// Cancel every pending operation with `JobsError::Canceled`.
    ///
    /// Returns how many operations were canceled.
    pub fn shutdown(&self) -> usize {
        let count = self.registry.cancel_all(JobsError::Canceled);
        if count > 0 {
            tracing::debug!("Canceled {} pending operations", count);
        }
        count
    }

    /// Number of pending operations.
    pub fn pending_operations(&self) -> usize {
        self.registry.len()
    }

    /// Topics of this client's thing.
    pub fn topics(&self) -> &JobsTopics {
        &self.topics
    }

    /// Effective configuration.
    pub fn config(&self) -> &JobsConfig {
        &self.config
    }

    async fn submit_callback<F>(
        &self,
        contents: RequestContents<'_>,
        info: &RequestInfo,
        callback: F,
    ) -> Result<(ClientToken, RegistrationId)>
    where
        F: FnOnce(CompletedOperation) + Send + 'static,
    {
        let document = self.prepare(&contents, info)?;
        let token = document.client_token().clone();
        let kind = document.kind();

        let id = self.registry.register(
            Operation::new(token.clone(), kind, self.allocator.clone()),
            CompletionMode::callback(callback),
        )?;

        let mut guard = Unpublished::new(&self.registry, token.clone(), id);
        self.publish(document, info.job_id.as_deref()).await?;
        guard.disarm();

        Ok((token, id))
    }

    fn prepare(&self, contents: &RequestContents<'_>, info: &RequestInfo) -> Result<RequestDocument> {
        contents.validate()?;
        info.validate(contents.kind())?;
        generate(contents, info, self.allocator.as_ref())
    }

    async fn publish(&self, document: RequestDocument, job_id: Option<&str>) -> Result<()> {
        let kind = document.kind();
        let token = document.client_token().clone();
        let topic = self.topics.request_topic(kind, job_id);

        tracing::debug!("Publishing {} request {} on {}", kind, token, topic);
        self.transport
            .publish(topic, document.into_bytes())
            .await
            .inspect_err(|e| tracing::warn!("Failed to publish {} request {}: {}", kind, token, e))
    }
}

/// Removes a registration whose request was never published, either because
/// publishing failed or because the issuing future was dropped.
struct Unpublished<'a> {
    registry: &'a OperationRegistry,
    token: ClientToken,
    id: RegistrationId,
    published: bool,
}

impl<'a> Unpublished<'a> {
    fn new(registry: &'a OperationRegistry, token: ClientToken, id: RegistrationId) -> Self {
        Self {
            registry,
            token,
            id,
            published: false,
        }
    }

    /// The request went out; keep the registration.
    fn disarm(&mut self) {
        self.published = true;
    }
}

impl Drop for Unpublished<'_> {
    fn drop(&mut self) {
        if !self.published && self.registry.discard_registration(&self.token, self.id) {
            tracing::debug!("Discarded unpublished operation {}", self.token);
        }
    }
}

impl std::fmt::Debug for JobsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobsClient")
            .field("thing_name", &self.config.thing_name)
            .field("pending", &self.registry.len())
            .finish()
    }
}
