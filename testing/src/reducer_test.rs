//! Ergonomic testing utilities for reducers
//!
//! This module provides a fluent API for testing reducers with readable Given-When-Then syntax.

#![allow(clippy::module_name_repetitions)] // ReducerTest is the natural name

use action_meta_core::reducer::Reducer;

/// Type alias for state assertion functions
type StateAssertion<S> = Box<dyn FnOnce(&S)>;

/// Fluent API for testing reducers with Given-When-Then syntax
///
/// Several actions may be given; they are applied in order.
///
/// # Example
///
/// ```
/// use action_meta_core::{MetaAction, MetaReducer, MetaState};
/// use action_meta_testing::ReducerTest;
///
/// ReducerTest::new(MetaReducer)
///     .with_env(())
///     .given_state(MetaState::new())
///     .when_action(MetaAction::Request { id: "save-1".into() })
///     .then_state(|state| assert!(state.get("save-1").is_waiting))
///     .run();
/// ```
pub struct ReducerTest<R, S, A, E>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    reducer: R,
    environment: Option<E>,
    initial_state: Option<S>,
    actions: Vec<A>,
    state_assertions: Vec<StateAssertion<S>>,
}

impl<R, S, A, E> ReducerTest<R, S, A, E>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    /// Create a new reducer test with the given reducer
    #[must_use]
    pub const fn new(reducer: R) -> Self {
        Self {
            reducer,
            environment: None,
            initial_state: None,
            actions: Vec::new(),
            state_assertions: Vec::new(),
        }
    }

    /// Set the environment for the test
    #[must_use]
    pub fn with_env(mut self, env: E) -> Self {
        self.environment = Some(env);
        self
    }

    /// Set the initial state (Given)
    #[must_use]
    pub fn given_state(mut self, state: S) -> Self {
        self.initial_state = Some(state);
        self
    }

    /// Add an action to apply (When)
    #[must_use]
    pub fn when_action(mut self, action: A) -> Self {
        self.actions.push(action);
        self
    }

    /// Add an assertion about the resulting state (Then)
    #[must_use]
    pub fn then_state<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&S) + 'static,
    {
        self.state_assertions.push(Box::new(assertion));
        self
    }

    /// Run the test and execute all assertions
    ///
    /// # Panics
    ///
    /// Panics if initial state or environment is not set, if no action was
    /// given, or if any assertions fail.
    #[allow(clippy::panic)] // Test code can panic
    #[allow(clippy::expect_used)] // Test code can use expect
    pub fn run(self) {
        let mut state = self
            .initial_state
            .expect("Initial state must be set with given_state()");

        assert!(
            !self.actions.is_empty(),
            "At least one action must be set with when_action()"
        );

        let env = self
            .environment
            .expect("Environment must be set with with_env()");

        for action in self.actions {
            self.reducer.reduce(&mut state, action, &env);
        }

        for assertion in self.state_assertions {
            assertion(&state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use action_meta_core::{
        ActionError, ActionStatus, ErrorPayload, MetaAction, MetaReducer, MetaState, Status,
        StatusAction, StatusReducer,
    };
    use serde_json::json;
    use std::sync::Arc;

    use crate::test_clock;
    use action_meta_core::environment::Clock;

    #[test]
    fn test_meta_request_then_error() {
        ReducerTest::new(MetaReducer)
            .with_env(())
            .given_state(MetaState::new())
            .when_action(MetaAction::Request { id: "apply".into() })
            .when_action(MetaAction::ReceiveError {
                id: "apply".into(),
                error: ErrorPayload::from_body(Some(&json!({ "answers": ["required"] }))),
            })
            .then_state(|state| {
                let entry = state.get("apply");
                assert!(!entry.is_waiting);
                assert!(!entry.success);
                assert_eq!(entry.error_message("answers"), Some("required"));
            })
            .run();
    }

    #[test]
    fn test_status_start_then_reject() {
        ReducerTest::new(StatusReducer::<()>::new())
            .with_env(())
            .given_state(ActionStatus::initial())
            .when_action(StatusAction::Start {
                at: test_clock().now(),
            })
            .when_action(StatusAction::Reject(Arc::new(ActionError::network("down"))))
            .then_state(|state| {
                assert_eq!(state.status(), Status::NetworkError);
                assert_eq!(state.started_at(), Some(test_clock().now()));
            })
            .run();
    }

    #[test]
    #[should_panic(expected = "At least one action")]
    fn test_run_requires_an_action() {
        ReducerTest::new(MetaReducer)
            .with_env(())
            .given_state(MetaState::new())
            .run();
    }
}
