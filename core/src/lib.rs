//! # Action Meta Core
//!
//! Core types for tracking the lifecycle of asynchronous actions.
//!
//! This crate holds the pure, synchronous half of the system. Nothing in here
//! spawns tasks, performs I/O or logs. The runtime crate drives these types.
//!
//! ## Core Concepts
//!
//! - **Failure**: What a wrapped operation reports when it does not succeed ([`ActionError`])
//! - **Classification**: Mapping a failure to one of a fixed set of kinds ([`classify`])
//! - **Action Status**: Lifecycle record of a single tracked invocation ([`ActionStatus`])
//! - **Request Meta**: Keyed waiting/success/error entries ([`MetaState`])
//! - **Reducer**: Pure state machine `(State, Action, Environment) → State`
//!
//! ## Example
//!
//! ```
//! use action_meta_core::{ActionError, FailureKind, classify};
//! use serde_json::json;
//!
//! let error = ActionError::response(422, json!({ "name": ["required"] }));
//! match classify(&error) {
//!     FailureKind::Validation(errors) => assert_eq!(errors.first("name"), Some("required")),
//!     other => panic!("unexpected classification: {other:?}"),
//! }
//! ```

// Re-export commonly used types
pub use chrono::{DateTime, Utc};

/// Failure values reported by wrapped operations
pub mod failure;

/// Error classification policies
pub mod classify;

/// Per-invocation action status and its state machine
pub mod status;

/// Keyed request metadata and its state machine
pub mod meta;

/// Registry key derivation
pub mod keys;

/// Store independent helpers for domain modules
pub mod index;

/// Reducer module - The trait behind every state machine in this crate
///
/// Reducers are pure functions: `(State, Action, Environment) → State`.
/// They are deterministic and hold no data of their own; whoever owns the
/// state decides when to apply an action.
pub mod reducer {
    /// The Reducer trait - a state machine transition function
    ///
    /// # Type Parameters
    ///
    /// - `State`: The state this reducer operates on
    /// - `Action`: The transitions this reducer understands
    /// - `Environment`: The injected dependencies this reducer needs
    ///
    /// # Example
    ///
    /// ```
    /// use action_meta_core::reducer::Reducer;
    ///
    /// struct Counter;
    ///
    /// impl Reducer for Counter {
    ///     type State = u32;
    ///     type Action = u32;
    ///     type Environment = ();
    ///
    ///     fn reduce(&self, state: &mut u32, action: u32, _env: &()) {
    ///         *state += action;
    ///     }
    /// }
    ///
    /// let mut state = 1;
    /// Counter.reduce(&mut state, 2, &());
    /// assert_eq!(state, 3);
    /// ```
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The action type this reducer processes
        type Action;

        /// The environment type with injected dependencies
        type Environment;

        /// Apply an action to state in place
        ///
        /// Actions that are not valid for the current state are ignored.
        fn reduce(&self, state: &mut Self::State, action: Self::Action, env: &Self::Environment);
    }
}

/// Environment module - Dependency injection traits
///
/// External dependencies are abstracted behind traits so tests can
/// substitute deterministic implementations.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```
    /// use action_meta_core::environment::{Clock, SystemClock};
    ///
    /// let clock = SystemClock;
    /// let _now = clock.now();
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Production clock backed by the system time
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}

pub use classify::{FailureKind, classify, only_handle_api_error};
pub use failure::{ActionError, ValidationErrors};
pub use keys::{KeyStyle, MetaArgument};
pub use meta::{ErrorPayload, MetaAction, MetaReducer, MetaState, RequestMeta};
pub use status::{ActionStatus, Status, StatusAction, StatusReducer};
