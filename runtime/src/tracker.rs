//! Action tracker
//!
//! [`ActionTracker::track`] wraps one asynchronous operation. The returned
//! [`TrackedAction`] exposes a live [`ActionStatusHandle`] that is already
//! `Pending` when `track` returns and follows the operation until it settles.
//!
//! Each call owns an independent status store, so concurrent invocations never
//! observe each other. The tracker cannot cancel an operation; an operation
//! that gives up reports [`ActionError::Aborted`] itself.

use crate::{RuntimeError, Store, StoreConfig};
use action_meta_core::environment::{Clock, SystemClock};
use action_meta_core::{ActionError, ActionStatus, Status, StatusAction, StatusReducer};
use futures::FutureExt;
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

type StatusStore<T> = Store<ActionStatus<T>, StatusAction<T>, (), StatusReducer<T>>;

/// Runs operations and records their lifecycle
///
/// # Example
///
/// ```ignore
/// let tracker = ActionTracker::system();
/// let tracked = tracker.track(|| api.fetch_group(7));
///
/// let status = tracked.status();
/// assert!(status.pending());
///
/// let settled = tracked.join().await?;
/// assert_eq!(settled.status(), Status::Success);
/// ```
#[derive(Clone)]
pub struct ActionTracker {
    clock: Arc<dyn Clock>,
    config: StoreConfig,
}

impl ActionTracker {
    /// Create a tracker that stamps `started_at` with the given clock
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            config: StoreConfig::default(),
        }
    }

    /// Create a tracker backed by the system clock
    #[must_use]
    pub fn system() -> Self {
        Self::new(Arc::new(SystemClock))
    }

    /// Use a custom configuration for per-invocation status stores
    #[must_use]
    pub fn with_config(mut self, config: StoreConfig) -> Self {
        self.config = config;
        self
    }

    /// Invoke `operation` and track it until it settles
    ///
    /// The status is `Pending` with `started_at` set before this returns.
    /// The operation's future runs on a spawned task; dropping the returned
    /// [`TrackedAction`] does not stop it.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime.
    pub fn track<F, Fut, T>(&self, operation: F) -> TrackedAction<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ActionError>> + Send + 'static,
        T: Clone + Send + Sync + 'static,
    {
        let store: StatusStore<T> = Store::with_config(
            ActionStatus::initial(),
            StatusReducer::new(),
            (),
            self.config,
        );
        store.send(StatusAction::Start {
            at: self.clock.now(),
        });
        metrics::counter!("action_meta.tracked.total").increment(1);

        let status = ActionStatusHandle {
            receiver: store.subscribe(),
        };
        let task = tokio::spawn(settle(store, operation()));

        TrackedAction { status, task }
    }
}

impl fmt::Debug for ActionTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionTracker")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Default for ActionTracker {
    fn default() -> Self {
        Self::system()
    }
}

/// Drive the operation and apply its outcome to the status store
async fn settle<T, Fut>(
    store: StatusStore<T>,
    operation: Fut,
) -> Result<ActionStatus<T>, RuntimeError>
where
    Fut: Future<Output = Result<T, ActionError>>,
    T: Clone,
{
    // A panicking operation is recorded as an unhandled failure
    let outcome = AssertUnwindSafe(operation)
        .catch_unwind()
        .await
        .unwrap_or_else(|panic| Err(ActionError::other(panic_message(&*panic))));

    match outcome {
        Ok(result) => store.send(StatusAction::Resolve(result)),
        Err(error) => store.send(StatusAction::Reject(Arc::new(error))),
    }

    let settled = store.state(ActionStatus::clone);
    let status = settled.status();
    metrics::counter!("action_meta.tracked.outcome", "status" => status.as_str()).increment(1);

    match status {
        Status::Aborted => tracing::warn!("action aborted"),
        Status::UnhandledError => {
            if let Some(error) = settled.unhandled_error() {
                tracing::error!(error = %error, "Unhandled action failure");
                return Err(RuntimeError::Unhandled(Arc::clone(error)));
            }
        },
        _ => tracing::debug!(%status, "Action settled"),
    }

    Ok(settled)
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        format!("operation panicked: {message}")
    } else if let Some(message) = panic.downcast_ref::<String>() {
        format!("operation panicked: {message}")
    } else {
        "operation panicked".to_string()
    }
}

/// A running (or settled) tracked operation
pub struct TrackedAction<T> {
    status: ActionStatusHandle<T>,
    task: JoinHandle<Result<ActionStatus<T>, RuntimeError>>,
}

impl<T> TrackedAction<T> {
    /// A live handle on the status of this action
    #[must_use]
    pub fn status(&self) -> ActionStatusHandle<T> {
        self.status.clone()
    }

    /// Whether the operation has settled and its outcome was recorded
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the operation to settle
    ///
    /// Handled failures (aborted, validation, server, network) are part of
    /// the returned status, not errors.
    ///
    /// # Errors
    ///
    /// - [`RuntimeError::Unhandled`] if the failure could not be classified.
    ///   The status records it as `UnhandledError` as well.
    /// - [`RuntimeError::TaskJoinError`] if the driving task was cancelled.
    pub async fn join(self) -> Result<ActionStatus<T>, RuntimeError> {
        self.task.await?
    }
}

impl<T> fmt::Debug for TrackedAction<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackedAction")
            .field("status", &self.status.receiver.borrow().status())
            .field("finished", &self.task.is_finished())
            .finish()
    }
}

/// Live view of an [`ActionStatus`]
///
/// Obtained before the action settles; every later transition is visible
/// through it without re-subscribing.
pub struct ActionStatusHandle<T> {
    receiver: watch::Receiver<ActionStatus<T>>,
}

impl<T> Clone for ActionStatusHandle<T> {
    fn clone(&self) -> Self {
        Self {
            receiver: self.receiver.clone(),
        }
    }
}

impl<T> fmt::Debug for ActionStatusHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionStatusHandle")
            .field("status", &self.receiver.borrow().status())
            .finish()
    }
}

impl<T> ActionStatusHandle<T> {
    /// Read the current status via a closure
    ///
    /// `f` runs while the status is borrowed and settlement waits for it;
    /// keep it short or use [`get`](Self::get).
    pub fn with<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&ActionStatus<T>) -> R,
    {
        f(&self.receiver.borrow())
    }

    /// Current lifecycle state
    #[must_use]
    pub fn status(&self) -> Status {
        self.receiver.borrow().status()
    }

    /// True while the action is in flight
    #[must_use]
    pub fn pending(&self) -> bool {
        self.receiver.borrow().pending()
    }

    /// A change-notification channel for this status
    ///
    /// `changed().await` resolves on every transition. Intermediate states
    /// may be coalesced if the receiver falls behind.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ActionStatus<T>> {
        self.receiver.clone()
    }
}

impl<T: Clone> ActionStatusHandle<T> {
    /// Snapshot of the current status
    #[must_use]
    pub fn get(&self) -> ActionStatus<T> {
        self.receiver.borrow().clone()
    }

    /// Wait until the status is terminal and return it
    ///
    /// If the status store goes away first (the runtime shut down), returns
    /// the last recorded status.
    pub async fn settled(&self) -> ActionStatus<T> {
        let mut receiver = self.receiver.clone();
        if let Ok(settled) = receiver.wait_for(ActionStatus::is_settled).await {
            return settled.clone();
        }
        receiver.borrow().clone()
    }

    /// Call `listener` with the current status and after every change
    ///
    /// The listener stops being called once the status is terminal.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime.
    pub fn observe<F>(&self, mut listener: F) -> JoinHandle<()>
    where
        F: FnMut(&ActionStatus<T>) + Send + 'static,
        T: Send + Sync + 'static,
    {
        let mut receiver = self.receiver.clone();
        tokio::spawn(async move {
            loop {
                // Snapshot first so the listener never runs under the read lock
                let current = receiver.borrow_and_update().clone();
                listener(&current);
                if current.is_settled() || receiver.changed().await.is_err() {
                    break;
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use action_meta_testing::{fixtures, test_clock};
    use std::time::Duration;
    use tokio::sync::oneshot;

    fn tracker() -> ActionTracker {
        ActionTracker::new(Arc::new(test_clock()))
    }

    #[tokio::test]
    async fn test_pending_before_settlement() {
        let (tx, rx) = oneshot::channel::<u32>();
        let tracked = tracker().track(|| async move { rx.await.map_err(ActionError::other) });

        let status = tracked.status();
        assert_eq!(status.status(), Status::Pending);
        assert!(status.pending());
        assert_eq!(status.get().started_at(), Some(test_clock().now()));

        let _ = tx.send(5);
        let settled = status.settled().await;

        assert_eq!(settled.status(), Status::Success);
        assert_eq!(settled.result(), Some(&5));
        assert!(!status.pending());
    }

    #[tokio::test]
    async fn test_join_returns_terminal_status() {
        let tracked = tracker().track(|| async { Err::<(), _>(fixtures::server_error(503)) });

        let settled = tracked.join().await;

        assert!(matches!(settled, Ok(ref s) if s.server_error()));
    }

    #[tokio::test]
    async fn test_unhandled_failure_is_recorded_and_reraised() {
        let tracked = tracker().track(|| async { Err::<(), _>(fixtures::unexpected("bug")) });
        let status = tracked.status();

        let result = tracked.join().await;

        assert!(matches!(result, Err(RuntimeError::Unhandled(_))));
        let settled = status.get();
        assert_eq!(settled.status(), Status::UnhandledError);
        assert_eq!(
            settled.unhandled_error().map(ToString::to_string).as_deref(),
            Some("bug")
        );
    }

    #[tokio::test]
    async fn test_panic_becomes_unhandled_failure() {
        #[allow(clippy::panic)]
        let tracked = tracker().track(|| async {
            if true {
                panic!("exploded");
            }
            Ok(())
        });
        let status = tracked.status();

        let result = tracked.join().await;

        assert!(matches!(result, Err(RuntimeError::Unhandled(_))));
        assert_eq!(status.status(), Status::UnhandledError);
        assert!(
            status
                .get()
                .unhandled_error()
                .is_some_and(|e| e.to_string().contains("exploded"))
        );
    }

    #[tokio::test]
    async fn test_observe_sees_pending_then_terminal() {
        let (tx, rx) = oneshot::channel::<()>();
        let tracked = tracker().track(|| async move {
            let _ = rx.await;
            Err::<(), _>(fixtures::aborted())
        });

        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let observer = tracked.status().observe(move |status| {
            if let Ok(mut seen) = sink.lock() {
                seen.push(status.status());
            }
        });

        tokio::task::yield_now().await;
        let _ = tx.send(());
        let _ = tokio::time::timeout(Duration::from_secs(1), observer).await;

        let seen = seen.lock().map(|s| s.clone()).unwrap_or_default();
        assert_eq!(seen.first(), Some(&Status::Pending));
        assert_eq!(seen.last(), Some(&Status::Aborted));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_slow_observer_does_not_delay_settlement() {
        let (tx, rx) = oneshot::channel::<u32>();
        let tracked = tracker().track(|| async move { rx.await.map_err(ActionError::other) });

        let (entered_tx, mut entered_rx) = tokio::sync::mpsc::unbounded_channel();
        let _observer = tracked.status().observe(move |_| {
            let _ = entered_tx.send(());
            std::thread::sleep(Duration::from_millis(500));
        });
        let _ = entered_rx.recv().await;

        let started = std::time::Instant::now();
        let _ = tx.send(1);
        let settled = tokio::time::timeout(Duration::from_secs(5), tracked.join()).await;

        assert!(matches!(settled, Ok(Ok(ref s)) if s.result() == Some(&1)));
        assert!(
            started.elapsed() < Duration::from_millis(250),
            "settlement waited {:?} on the observer",
            started.elapsed()
        );
    }

    #[tokio::test]
    async fn test_with_reads_in_place_and_custom_config() {
        let tracked = tracker()
            .with_config(StoreConfig::new(1))
            .track(|| async { Ok::<_, ActionError>(vec![1, 2, 3]) });
        let status = tracked.status();

        let _ = tracked.join().await;

        assert_eq!(status.with(|s| s.result().map(Vec::len)), Some(3));
        assert!(status.with(ActionStatus::is_settled));
    }

    #[tokio::test]
    async fn test_invocations_are_independent() {
        let tracker = tracker();
        let ok = tracker.track(|| async { Ok::<_, ActionError>("done") });
        let failed = tracker.track(|| async { Err::<&str, _>(fixtures::network_error()) });

        let failed = failed.join().await;
        let ok = ok.join().await;

        assert!(matches!(ok, Ok(ref s) if s.status() == Status::Success));
        assert!(matches!(failed, Ok(ref s) if s.network_error() && s.result().is_none()));
    }
}
