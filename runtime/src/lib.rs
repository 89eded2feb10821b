//! # Action Meta Runtime
//!
//! Runtime for the action-meta architecture.
//!
//! This crate owns state and drives the pure state machines from
//! `action-meta-core` as wrapped operations settle.
//!
//! ## Core Components
//!
//! - **Store**: Owns one piece of state, applies a reducer on `send`, notifies observers
//! - **Action Tracker**: Runs an operation and exposes a live [`ActionStatusHandle`]
//! - **Meta Registry**: Keyed waiting/success/error metadata for named requests
//! - **Meta Scope**: Derives registry keys from action names and arguments
//!
//! ## Example
//!
//! ```ignore
//! use action_meta_runtime::{ActionTracker, MetaRegistry, with_meta};
//!
//! // Track one invocation
//! let tracked = ActionTracker::system().track(|| api.save(group));
//! let status = tracked.status();
//! assert!(status.pending());
//!
//! // Or record request metadata under a derived key
//! let meta = with_meta(MetaRegistry::new());
//! meta.run("save", group.id, |id| api.save_by_id(id)).await?;
//! assert!(meta.status("save", &group.id).success);
//! ```

/// Runtime configuration
pub mod config;

/// Action tracker and observable action status
pub mod tracker;

/// Keyed request metadata registry
pub mod registry;

/// Key-deriving wrappers around the registry
pub mod scope;

/// Error types for the runtime
pub mod error {
    use action_meta_core::ActionError;
    use std::sync::Arc;
    use thiserror::Error;

    /// Errors surfaced by the runtime
    #[derive(Error, Debug)]
    pub enum RuntimeError {
        /// A tracked operation failed in a way that could not be classified
        ///
        /// The failure is also recorded on the action status; this is the
        /// re-raise towards the enclosing context.
        #[error("Unhandled action failure: {0}")]
        Unhandled(Arc<ActionError>),

        /// The task driving a tracked operation was cancelled
        #[error("Tracked task failed: {0}")]
        TaskJoinError(#[from] tokio::task::JoinError),

        /// No action with this name is registered in an action group
        #[error("Unknown action: {0}")]
        UnknownAction(String),

        /// A registry request failed with a non-API error
        #[error(transparent)]
        Action(#[from] ActionError),
    }
}

pub use config::StoreConfig;
pub use error::RuntimeError;
pub use registry::MetaRegistry;
pub use scope::{ActionGroup, MetaScope, with_meta, with_prefixed_id_meta};
pub use tracker::{ActionStatusHandle, ActionTracker, TrackedAction};

/// Store module - Owner of one piece of reducer-driven state
///
/// State lives inside a `tokio::sync::watch` channel so every observer holding
/// a receiver sees each change without re-subscribing. Reduction is
/// synchronous; a `send` is never interleaved with another `send` on the
/// same store.
pub mod store {
    use super::StoreConfig;
    use action_meta_core::reducer::Reducer;
    use tokio::sync::{broadcast, watch};

    /// The Store - owner of state and the reducer that changes it
    ///
    /// # Type Parameters
    ///
    /// - `S`: State type
    /// - `A`: Action type
    /// - `E`: Environment type
    /// - `R`: Reducer implementation
    ///
    /// # Example
    ///
    /// ```
    /// use action_meta_core::{MetaAction, MetaReducer, MetaState};
    /// use action_meta_runtime::store::Store;
    ///
    /// let store = Store::new(MetaState::new(), MetaReducer, ());
    /// store.send(MetaAction::Request { id: "save-1".into() });
    ///
    /// assert!(store.state(|s| s.get("save-1").is_waiting));
    /// ```
    pub struct Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E>,
    {
        state: watch::Sender<S>,
        reducer: R,
        environment: E,
        /// Every applied action is re-published here for observers.
        action_broadcast: broadcast::Sender<A>,
    }

    impl<S, A, E, R> Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E>,
        A: Clone,
    {
        /// Create a new store with initial state, reducer, and environment
        #[must_use]
        pub fn new(initial_state: S, reducer: R, environment: E) -> Self {
            Self::with_config(initial_state, reducer, environment, StoreConfig::default())
        }

        /// Create a new store with custom configuration
        #[must_use]
        pub fn with_config(
            initial_state: S,
            reducer: R,
            environment: E,
            config: StoreConfig,
        ) -> Self {
            let (state, _) = watch::channel(initial_state);
            let (action_broadcast, _) = broadcast::channel(config.broadcast_capacity.max(1));

            Self {
                state,
                reducer,
                environment,
                action_broadcast,
            }
        }

        /// Apply an action to the state and notify observers
        pub fn send(&self, action: A) {
            tracing::trace!("Processing action");

            let observed = (self.action_broadcast.receiver_count() > 0).then(|| action.clone());

            self.state
                .send_modify(|state| self.reducer.reduce(state, action, &self.environment));

            if let Some(action) = observed {
                // Observers may have gone away in the meantime
                let _ = self.action_broadcast.send(action);
            }
        }

        /// Read current state via a closure
        ///
        /// ```ignore
        /// let waiting = store.state(|s| s.get("save-1").is_waiting);
        /// ```
        pub fn state<F, T>(&self, f: F) -> T
        where
            F: FnOnce(&S) -> T,
        {
            f(&self.state.borrow())
        }

        /// Subscribe to state changes
        ///
        /// The receiver always holds the latest state; `changed().await`
        /// resolves after every `send`.
        #[must_use]
        pub fn subscribe(&self) -> watch::Receiver<S> {
            self.state.subscribe()
        }

        /// Subscribe to applied actions
        ///
        /// Slow observers may miss actions once the broadcast buffer wraps
        /// (see [`StoreConfig::broadcast_capacity`]).
        #[must_use]
        pub fn subscribe_actions(&self) -> broadcast::Receiver<A> {
            self.action_broadcast.subscribe()
        }
    }
}

pub use store::Store;
