//! Per-invocation action status
//!
//! An [`ActionStatus`] records the lifecycle of one tracked invocation:
//!
//! ```text
//! Initial ─Start─▶ Pending ─Resolve─▶ Success
//!                     │
//!                     └──Reject──▶ Aborted | ValidationErrors | ServerError
//!                                  | NetworkError | UnhandledError
//! ```
//!
//! The boolean flags consumers render from (`pending`, `aborted`, ...) are
//! derived from [`Status`], so at most one of them can hold.

use crate::classify::{FailureKind, classify};
use crate::failure::{ActionError, ValidationErrors};
use crate::reducer::Reducer;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// Lifecycle state of a tracked action
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    /// Created, not started
    #[default]
    Initial,
    /// Started, not settled
    Pending,
    /// Settled with a result
    Success,
    /// The operation cancelled itself
    Aborted,
    /// Rejected with per-field validation messages
    ValidationErrors,
    /// Rejected with a 5xx response
    ServerError,
    /// Rejected without any response
    NetworkError,
    /// Rejected with a failure that could not be classified
    UnhandledError,
}

impl Status {
    /// Whether no further transition will happen
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Initial | Self::Pending)
    }

    /// Stable upper-case name, used as a metrics label
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Initial => "INITIAL",
            Self::Pending => "PENDING",
            Self::Success => "SUCCESS",
            Self::Aborted => "ABORTED",
            Self::ValidationErrors => "VALIDATION_ERRORS",
            Self::ServerError => "SERVER_ERROR",
            Self::NetworkError => "NETWORK_ERROR",
            Self::UnhandledError => "UNHANDLED_ERROR",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status record of a single tracked invocation
///
/// Read-only from the outside; only [`StatusReducer`] changes it.
#[derive(Debug, Clone)]
pub struct ActionStatus<T> {
    status: Status,
    started_at: Option<DateTime<Utc>>,
    validation_errors: ValidationErrors,
    result: Option<T>,
    unhandled_error: Option<Arc<ActionError>>,
}

impl<T> Default for ActionStatus<T> {
    fn default() -> Self {
        Self::initial()
    }
}

impl<T> ActionStatus<T> {
    /// A status that has not started yet
    #[must_use]
    pub const fn initial() -> Self {
        Self {
            status: Status::Initial,
            started_at: None,
            validation_errors: ValidationErrors::new(),
            result: None,
            unhandled_error: None,
        }
    }

    /// Current lifecycle state
    #[must_use]
    pub const fn status(&self) -> Status {
        self.status
    }

    /// When the action entered `Pending`
    #[must_use]
    pub const fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    /// Per-field messages of a validation failure (empty otherwise)
    #[must_use]
    pub const fn validation_errors(&self) -> &ValidationErrors {
        &self.validation_errors
    }

    /// The resolved value, once successful
    #[must_use]
    pub const fn result(&self) -> Option<&T> {
        self.result.as_ref()
    }

    /// The raw failure, when it could not be classified
    #[must_use]
    pub const fn unhandled_error(&self) -> Option<&Arc<ActionError>> {
        self.unhandled_error.as_ref()
    }

    /// True iff the status is `Pending`
    #[must_use]
    pub fn pending(&self) -> bool {
        self.status == Status::Pending
    }

    /// True iff the status is `ValidationErrors`
    #[must_use]
    pub fn has_validation_errors(&self) -> bool {
        self.status == Status::ValidationErrors
    }

    /// True iff the status is `ServerError`
    #[must_use]
    pub fn server_error(&self) -> bool {
        self.status == Status::ServerError
    }

    /// True iff the status is `NetworkError`
    #[must_use]
    pub fn network_error(&self) -> bool {
        self.status == Status::NetworkError
    }

    /// True iff the status is `Aborted`
    #[must_use]
    pub fn aborted(&self) -> bool {
        self.status == Status::Aborted
    }

    /// Whether the action reached a terminal state
    #[must_use]
    pub const fn is_settled(&self) -> bool {
        self.status.is_terminal()
    }

    /// Consume the record, returning the resolved value
    #[must_use]
    pub fn into_result(self) -> Option<T> {
        self.result
    }
}

/// Transitions of an [`ActionStatus`]
#[derive(Debug, Clone)]
pub enum StatusAction<T> {
    /// The operation was invoked
    Start {
        /// Invocation time
        at: DateTime<Utc>,
    },
    /// The operation resolved
    Resolve(T),
    /// The operation failed
    Reject(Arc<ActionError>),
}

/// Reducer for [`ActionStatus`]
///
/// `Start` only applies to an `Initial` status; `Resolve` and `Reject` are
/// ignored once the status is terminal.
pub struct StatusReducer<T> {
    _phantom: PhantomData<fn() -> T>,
}

impl<T> StatusReducer<T> {
    /// Create a status reducer
    #[must_use]
    pub const fn new() -> Self {
        Self {
            _phantom: PhantomData,
        }
    }
}

impl<T> Default for StatusReducer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for StatusReducer<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for StatusReducer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StatusReducer")
    }
}

impl<T> Reducer for StatusReducer<T> {
    type State = ActionStatus<T>;
    type Action = StatusAction<T>;
    type Environment = ();

    fn reduce(&self, state: &mut ActionStatus<T>, action: StatusAction<T>, _env: &()) {
        match action {
            StatusAction::Start { at } => {
                if state.status == Status::Initial {
                    state.status = Status::Pending;
                    state.started_at = Some(at);
                }
            },
            StatusAction::Resolve(result) => {
                if !state.status.is_terminal() {
                    state.result = Some(result);
                    state.status = Status::Success;
                }
            },
            StatusAction::Reject(error) => {
                if state.status.is_terminal() {
                    return;
                }
                state.status = match classify(&error) {
                    FailureKind::Aborted => Status::Aborted,
                    FailureKind::Validation(errors) => {
                        state.validation_errors = errors;
                        Status::ValidationErrors
                    },
                    FailureKind::Server => Status::ServerError,
                    FailureKind::Network => Status::NetworkError,
                    FailureKind::Unclassified => {
                        state.unhandled_error = Some(error);
                        Status::UnhandledError
                    },
                };
            },
        }
    }
}
