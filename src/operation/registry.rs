//! Registry of pending operations, keyed by client token.
//!
//! Responses arrive on the transport's notification path while callers keep
//! issuing requests, so every registry mutation goes through one mutex. The
//! lock only guards the map: an entry is removed under the lock, then parsed
//! and delivered after the lock is released. Removal is the single point
//! where an operation leaves `Pending`, so each operation completes at most
//! once, and callbacks may issue new operations without deadlocking.
//!
//! # Example
//!
//! ```
//! use iot_jobs_client::buffer::default_allocator;
//! use iot_jobs_client::operation::{CompletionMode, Operation, OperationRegistry};
//! use iot_jobs_client::request::{ClientToken, OperationKind};
//! use iot_jobs_client::response::ResponseClass;
//!
//! let registry = OperationRegistry::new();
//! let token = ClientToken::from("t1");
//! let op = Operation::new(token.clone(), OperationKind::GetPending, default_allocator());
//!
//! registry
//!     .register(op, CompletionMode::callback(|done| assert!(done.is_success())))
//!     .unwrap();
//! assert!(registry.complete(&token, None, ResponseClass::Accepted, b"{}"));
//! assert!(registry.is_empty());
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::oneshot;

use super::record::{CompletedOperation, Operation};
use crate::error::{JobsError, Result};
use crate::request::{ClientToken, OperationKind};
use crate::response::{parse_response, ResponseClass};

/// Callback invoked once when an operation completes.
pub type JobsCallback = Box<dyn FnOnce(CompletedOperation) + Send + 'static>;

/// How an operation reports its completion. Fixed when it is registered.
pub enum CompletionMode {
    /// A waiter holds the receiving half.
    Waitable(oneshot::Sender<CompletedOperation>),
    /// Invoked on the thread that completes the operation.
    Callback(JobsCallback),
}

impl CompletionMode {
    /// Wrap a closure as a callback.
    pub fn callback<F>(f: F) -> Self
    where
        F: FnOnce(CompletedOperation) + Send + 'static,
    {
        CompletionMode::Callback(Box::new(f))
    }

    /// Create a waitable mode and its receiving half.
    pub fn waitable() -> (Self, oneshot::Receiver<CompletedOperation>) {
        let (tx, rx) = oneshot::channel();
        (CompletionMode::Waitable(tx), rx)
    }

    fn deliver(self, completed: CompletedOperation) {
        match self {
            CompletionMode::Waitable(tx) => {
                if let Err(completed) = tx.send(completed) {
                    tracing::debug!(
                        "Waiter for {} operation {} is gone, dropping result",
                        completed.kind,
                        completed.token
                    );
                }
            }
            CompletionMode::Callback(callback) => callback(completed),
        }
    }
}

impl fmt::Debug for CompletionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompletionMode::Waitable(_) => f.write_str("Waitable"),
            CompletionMode::Callback(_) => f.write_str("Callback"),
        }
    }
}

/// Identifies one registration. Distinguishes a pending operation from a
/// later one that reuses its client token.
pub type RegistrationId = u64;

/// A registered operation.
struct Entry {
    id: RegistrationId,
    operation: Operation,
    mode: CompletionMode,
}

impl Entry {
    fn finish(self) {
        let completed = self.operation.into_completed();
        tracing::debug!(
            "{} operation {} complete: {}",
            completed.kind,
            completed.token,
            match &completed.result {
                Ok(_) => "success".to_string(),
                Err(e) => e.to_string(),
            }
        );
        self.mode.deliver(completed);
    }
}

/// Pending operations, keyed by client token.
pub struct OperationRegistry {
    pending: Mutex<HashMap<ClientToken, Entry>>,
    max_in_flight: Option<usize>,
    next_id: AtomicU64,
}

impl OperationRegistry {
    /// Create an unbounded registry.
    pub fn new() -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
            max_in_flight: None,
            next_id: AtomicU64::new(1),
        }
    }

    /// Create a registry that refuses operations beyond `limit`.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
            max_in_flight: Some(limit),
            next_id: AtomicU64::new(1),
        }
    }

    // The map stays consistent even if a holder panicked: no user code runs
    // under the lock.
    fn lock(&self) -> MutexGuard<'_, HashMap<ClientToken, Entry>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a pending operation.
    ///
    /// Fails without touching the registry if another pending operation uses
    /// the same token or the in-flight limit is reached. Returns the id of
    /// the new registration.
    pub fn register(&self, operation: Operation, mode: CompletionMode) -> Result<RegistrationId> {
        let mut pending = self.lock();

        if pending.contains_key(operation.token()) {
            return Err(JobsError::DuplicateToken(operation.token().to_string()));
        }

        if let Some(limit) = self.max_in_flight {
            if pending.len() >= limit {
                tracing::warn!(
                    "In-flight limit reached, refusing {} operation {}",
                    operation.kind(),
                    operation.token()
                );
                return Err(JobsError::TooManyOperations(limit));
            }
        }

        tracing::debug!(
            "Registered {} operation {}",
            operation.kind(),
            operation.token()
        );
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        pending.insert(operation.token().clone(), Entry { id, operation, mode });
        Ok(id)
    }

    /// Resolve the operation for `token` from a response.
    ///
    /// When `hint` is given, only an operation of that kind matches. Returns
    /// `false` when nothing matched; the response is then dropped.
    pub fn complete(
        &self,
        token: &ClientToken,
        hint: Option<OperationKind>,
        class: ResponseClass,
        payload: &[u8],
    ) -> bool {
        let entry = {
            let mut pending = self.lock();
            match (pending.get(token).map(|e| e.operation.kind()), hint) {
                (Some(kind), Some(expected)) if kind != expected => {
                    tracing::debug!(
                        "Dropping {} response for {}: operation is {}",
                        expected,
                        token,
                        kind
                    );
                    None
                }
                (Some(_), _) => pending.remove(token),
                (None, _) => None,
            }
        };

        let Some(mut entry) = entry else {
            tracing::debug!("No pending operation for {}, dropping {} response", token, class);
            return false;
        };

        parse_response(class, payload, &mut entry.operation);
        entry.finish();
        true
    }

    /// End the operation for `token` locally with `reason`.
    ///
    /// Returns `false` if no such operation is pending.
    pub fn cancel(&self, token: &ClientToken, reason: JobsError) -> bool {
        let entry = self.lock().remove(token);
        Self::fail_entry(entry, reason)
    }

    /// Like [`cancel`](Self::cancel), but only if `token` still belongs to
    /// registration `id`.
    pub fn cancel_registration(
        &self,
        token: &ClientToken,
        id: RegistrationId,
        reason: JobsError,
    ) -> bool {
        let entry = Self::remove_registration(&mut self.lock(), token, id);
        Self::fail_entry(entry, reason)
    }

    fn fail_entry(entry: Option<Entry>, reason: JobsError) -> bool {
        let Some(mut entry) = entry else {
            return false;
        };

        entry.operation.fail(reason);
        entry.finish();
        true
    }

    fn remove_registration(
        pending: &mut HashMap<ClientToken, Entry>,
        token: &ClientToken,
        id: RegistrationId,
    ) -> Option<Entry> {
        match pending.get(token) {
            Some(entry) if entry.id == id => pending.remove(token),
            _ => None,
        }
    }

    /// End every pending operation with `reason`. Returns how many ended.
    pub fn cancel_all(&self, reason: JobsError) -> usize {
        let entries: Vec<Entry> = self.lock().drain().map(|(_, entry)| entry).collect();
        let count = entries.len();

        for mut entry in entries {
            entry.operation.fail(reason.clone());
            entry.finish();
        }

        count
    }

    /// Remove the operation for `token` without completing it.
    ///
    /// Used when the caller learns the outcome synchronously (e.g. the
    /// request could not be published).
    pub fn discard(&self, token: &ClientToken) -> bool {
        self.lock().remove(token).is_some()
    }

    /// Like [`discard`](Self::discard), but only if `token` still belongs to
    /// registration `id`.
    pub fn discard_registration(&self, token: &ClientToken, id: RegistrationId) -> bool {
        Self::remove_registration(&mut self.lock(), token, id).is_some()
    }

    /// Whether an operation with `token` is pending.
    pub fn contains(&self, token: &ClientToken) -> bool {
        self.lock().contains_key(token)
    }

    /// Number of pending operations.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no operations are pending.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// In-flight limit, if any.
    pub fn max_in_flight(&self) -> Option<usize> {
        self.max_in_flight
    }
}

impl Default for OperationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for OperationRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationRegistry")
            .field("pending", &self.len())
            .field("max_in_flight", &self.max_in_flight)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::default_allocator;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn op(token: &str, kind: OperationKind) -> Operation {
        Operation::new(ClientToken::from(token), kind, default_allocator())
    }

    #[test]
    fn test_register_and_complete() {
        let registry = OperationRegistry::new();
        let (mode, mut rx) = CompletionMode::waitable();

        registry.register(op("a", OperationKind::Update), mode).unwrap();
        assert!(registry.contains(&ClientToken::from("a")));
        assert_eq!(registry.len(), 1);

        assert!(registry.complete(
            &ClientToken::from("a"),
            Some(OperationKind::Update),
            ResponseClass::Rejected,
            br#"{"code":"VersionMismatch"}"#,
        ));
        assert!(registry.is_empty());

        let done = rx.try_recv().unwrap();
        assert_eq!(done.result.unwrap_err(), JobsError::VersionMismatch);
    }

    #[test]
    fn test_second_response_is_dropped() {
        let registry = OperationRegistry::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();

        registry
            .register(
                op("a", OperationKind::Update),
                CompletionMode::callback(move |done| {
                    assert_eq!(done.result.unwrap_err(), JobsError::VersionMismatch);
                    calls_clone.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .unwrap();

        let token = ClientToken::from("a");
        let doc = br#"{"code":"VersionMismatch"}"#;
        assert!(registry.complete(&token, None, ResponseClass::Rejected, doc));
        assert!(!registry.complete(&token, None, ResponseClass::Rejected, doc));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_duplicate_token_leaves_registry_unchanged() {
        let registry = OperationRegistry::new();
        registry
            .register(op("a", OperationKind::Describe), CompletionMode::callback(|_| {}))
            .unwrap();

        let err = registry
            .register(op("a", OperationKind::Update), CompletionMode::callback(|_| {}))
            .unwrap_err();
        assert_eq!(err, JobsError::DuplicateToken("a".into()));
        assert_eq!(registry.len(), 1);

        // The original registration is still the one that resolves.
        assert!(!registry.complete(
            &ClientToken::from("a"),
            Some(OperationKind::Update),
            ResponseClass::Accepted,
            b"{}",
        ));
        assert!(registry.complete(
            &ClientToken::from("a"),
            Some(OperationKind::Describe),
            ResponseClass::Accepted,
            b"{}",
        ));
    }

    #[test]
    fn test_token_reusable_after_completion() {
        let registry = OperationRegistry::new();
        let token = ClientToken::from("a");

        registry
            .register(op("a", OperationKind::GetPending), CompletionMode::callback(|_| {}))
            .unwrap();
        registry.complete(&token, None, ResponseClass::Accepted, b"{}");

        assert!(registry
            .register(op("a", OperationKind::GetPending), CompletionMode::callback(|_| {}))
            .is_ok());
    }

    #[test]
    fn test_unknown_token_is_dropped() {
        let registry = OperationRegistry::new();
        assert!(!registry.complete(
            &ClientToken::from("nobody"),
            None,
            ResponseClass::Accepted,
            b"{}",
        ));
    }

    #[test]
    fn test_cancel() {
        let registry = OperationRegistry::new();
        let (mode, mut rx) = CompletionMode::waitable();
        registry.register(op("a", OperationKind::StartNext), mode).unwrap();

        assert!(registry.cancel(&ClientToken::from("a"), JobsError::Timeout));
        assert!(!registry.cancel(&ClientToken::from("a"), JobsError::Timeout));
        assert!(registry.is_empty());
        assert_eq!(rx.try_recv().unwrap().result.unwrap_err(), JobsError::Timeout);
    }

    #[test]
    fn test_cancel_all() {
        let registry = OperationRegistry::new();
        let calls = Arc::new(AtomicUsize::new(0));

        for token in ["a", "b", "c"] {
            let calls = calls.clone();
            registry
                .register(
                    op(token, OperationKind::GetPending),
                    CompletionMode::callback(move |done| {
                        assert_eq!(done.result.unwrap_err(), JobsError::Canceled);
                        calls.fetch_add(1, Ordering::SeqCst);
                    }),
                )
                .unwrap();
        }

        assert_eq!(registry.cancel_all(JobsError::Canceled), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_discard_does_not_deliver() {
        let registry = OperationRegistry::new();
        let (mode, mut rx) = CompletionMode::waitable();
        registry.register(op("a", OperationKind::GetPending), mode).unwrap();

        assert!(registry.discard(&ClientToken::from("a")));
        assert!(registry.is_empty());
        // Sender dropped without a value.
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_registration_id_guards_reused_token() {
        let registry = OperationRegistry::new();
        let token = ClientToken::from("a");

        let first = registry
            .register(op("a", OperationKind::GetPending), CompletionMode::callback(|_| {}))
            .unwrap();
        registry.complete(&token, None, ResponseClass::Accepted, b"{}");

        let (mode, mut rx) = CompletionMode::waitable();
        let second = registry.register(op("a", OperationKind::GetPending), mode).unwrap();
        assert_ne!(first, second);

        // Stale id leaves the new registration alone.
        assert!(!registry.cancel_registration(&token, first, JobsError::Timeout));
        assert!(!registry.discard_registration(&token, first));
        assert!(registry.contains(&token));

        assert!(registry.cancel_registration(&token, second, JobsError::Timeout));
        assert_eq!(rx.try_recv().unwrap().result.unwrap_err(), JobsError::Timeout);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_discard_registration() {
        let registry = OperationRegistry::new();
        let id = registry
            .register(op("a", OperationKind::Update), CompletionMode::callback(|_| {}))
            .unwrap();

        assert!(registry.discard_registration(&ClientToken::from("a"), id));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_in_flight_limit() {
        let registry = OperationRegistry::with_limit(1);
        registry
            .register(op("a", OperationKind::GetPending), CompletionMode::callback(|_| {}))
            .unwrap();

        let err = registry
            .register(op("b", OperationKind::GetPending), CompletionMode::callback(|_| {}))
            .unwrap_err();
        assert_eq!(err, JobsError::TooManyOperations(1));
        assert_eq!(registry.max_in_flight(), Some(1));
    }

    #[test]
    fn test_callback_can_register_without_deadlock() {
        let registry = Arc::new(OperationRegistry::new());
        let inner = registry.clone();

        registry
            .register(
                op("first", OperationKind::StartNext),
                CompletionMode::callback(move |_| {
                    inner
                        .register(
                            op("second", OperationKind::Update),
                            CompletionMode::callback(|_| {}),
                        )
                        .unwrap();
                }),
            )
            .unwrap();

        registry.complete(&ClientToken::from("first"), None, ResponseClass::Accepted, b"{}");
        assert!(registry.contains(&ClientToken::from("second")));
        assert!(!registry.contains(&ClientToken::from("first")));
    }

    #[test]
    fn test_concurrent_completion_delivers_once() {
        let registry = Arc::new(OperationRegistry::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();

        registry
            .register(
                op("race", OperationKind::Update),
                CompletionMode::callback(move |_| {
                    calls_clone.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .unwrap();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    let token = ClientToken::from("race");
                    if i % 2 == 0 {
                        registry.complete(&token, None, ResponseClass::Accepted, b"{}")
                    } else {
                        registry.cancel(&token, JobsError::Timeout)
                    }
                })
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();

        assert_eq!(winners, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
