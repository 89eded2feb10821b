//! Keyed request metadata
//!
//! A [`MetaState`] maps caller-chosen keys (for example `save-42`) to a
//! [`RequestMeta`] entry describing whether that request is in flight, has
//! succeeded or has failed with an API error. Absent keys read as the idle
//! entry without being inserted.
//!
//! All writes go through [`MetaReducer`]. The runtime's `MetaRegistry` owns the
//! state and is the only thing that applies [`MetaAction`]s.

use crate::failure::ValidationErrors;
use crate::reducer::Reducer;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;

/// Error payload recorded for a failed request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ErrorPayload {
    /// The body was a `field → messages` map
    Fields(ValidationErrors),
    /// The body had some other shape
    Body(Value),
    /// The response had no body
    Empty,
}

impl ErrorPayload {
    /// Build a payload from an optional response body
    #[must_use]
    pub fn from_body(body: Option<&Value>) -> Self {
        match body {
            None | Some(Value::Null) => Self::Empty,
            Some(body) => {
                ValidationErrors::from_body(body).map_or_else(|| Self::Body(body.clone()), Self::Fields)
            },
        }
    }

    /// The first message for a field
    ///
    /// For bodies that are not a clean field map, a field holding a string
    /// or an array starting with a string still yields that string.
    #[must_use]
    pub fn first_message(&self, field: &str) -> Option<&str> {
        match self {
            Self::Fields(errors) => errors.first(field),
            Self::Body(body) => match body.get(field)? {
                Value::String(message) => Some(message.as_str()),
                Value::Array(items) => items.first()?.as_str(),
                _ => None,
            },
            Self::Empty => None,
        }
    }

    /// The per-field messages, when the body was a field map
    #[must_use]
    pub const fn field_errors(&self) -> Option<&ValidationErrors> {
        match self {
            Self::Fields(errors) => Some(errors),
            _ => None,
        }
    }
}

/// Registry entry for one request key
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RequestMeta {
    /// A request under this key is in flight
    pub is_waiting: bool,
    /// Payload of the last API error, if the last request failed with one
    pub error: Option<ErrorPayload>,
    /// The last request under this key succeeded
    pub success: bool,
}

impl RequestMeta {
    /// The entry every key starts with
    pub const IDLE: Self = Self {
        is_waiting: false,
        error: None,
        success: false,
    };

    /// An in-flight request
    #[must_use]
    pub const fn waiting() -> Self {
        Self {
            is_waiting: true,
            error: None,
            success: false,
        }
    }

    /// A successfully settled request
    #[must_use]
    pub const fn succeeded() -> Self {
        Self {
            is_waiting: false,
            error: None,
            success: true,
        }
    }

    /// A request that failed with an API error
    #[must_use]
    pub const fn failed(error: ErrorPayload) -> Self {
        Self {
            is_waiting: false,
            error: Some(error),
            success: false,
        }
    }

    /// The first error message for a field
    #[must_use]
    pub fn error_message(&self, field: &str) -> Option<&str> {
        self.error.as_ref()?.first_message(field)
    }

    /// Whether the recorded error carries per-field messages
    #[must_use]
    pub fn has_validation_errors(&self) -> bool {
        self.error
            .as_ref()
            .and_then(ErrorPayload::field_errors)
            .is_some_and(|errors| !errors.is_empty())
    }

    /// Whether this entry is indistinguishable from an untouched key
    #[must_use]
    pub fn is_idle(&self) -> bool {
        *self == Self::IDLE
    }
}

/// State owned by a request registry
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetaState {
    entries: HashMap<String, RequestMeta>,
}

impl MetaState {
    /// Create an empty state
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The entry for a key, or the idle entry if the key was never touched
    ///
    /// Never inserts anything.
    #[must_use]
    pub fn get(&self, id: &str) -> RequestMeta {
        self.entries.get(id).cloned().unwrap_or_default()
    }

    /// The stored entry for a key, without defaulting
    #[must_use]
    pub fn entry(&self, id: &str) -> Option<&RequestMeta> {
        self.entries.get(id)
    }

    /// Number of stored entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no entry is stored
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over stored entries
    pub fn iter(&self) -> impl Iterator<Item = (&str, &RequestMeta)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Transitions of a request registry
#[derive(Debug, Clone, PartialEq)]
pub enum MetaAction {
    /// A request under `id` started
    Request {
        /// Request key
        id: String,
    },
    /// The request under `id` succeeded
    ReceiveSuccess {
        /// Request key
        id: String,
    },
    /// The request under `id` failed with an API error
    ReceiveError {
        /// Request key
        id: String,
        /// Recorded payload
        error: ErrorPayload,
    },
    /// Reset `id` to the idle entry
    Clear {
        /// Request key
        id: String,
    },
    /// Reset several keys to the idle entry
    ClearMany {
        /// Request keys
        ids: Vec<String>,
    },
    /// Forget every entry
    ClearAll,
}

impl MetaAction {
    /// The key this action targets, for single-key actions
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        match self {
            Self::Request { id }
            | Self::ReceiveSuccess { id }
            | Self::ReceiveError { id, .. }
            | Self::Clear { id } => Some(id.as_str()),
            Self::ClearMany { .. } | Self::ClearAll => None,
        }
    }
}

/// Reducer for [`MetaState`]
///
/// Every single-key transition overwrites the entry. Two requests racing on
/// the same key leave whichever settled last.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetaReducer;

impl Reducer for MetaReducer {
    type State = MetaState;
    type Action = MetaAction;
    type Environment = ();

    fn reduce(&self, state: &mut MetaState, action: MetaAction, _env: &()) {
        match action {
            MetaAction::Request { id } => {
                state.entries.insert(id, RequestMeta::waiting());
            },
            MetaAction::ReceiveSuccess { id } => {
                state.entries.insert(id, RequestMeta::succeeded());
            },
            MetaAction::ReceiveError { id, error } => {
                state.entries.insert(id, RequestMeta::failed(error));
            },
            MetaAction::Clear { id } => {
                state.entries.insert(id, RequestMeta::IDLE);
            },
            MetaAction::ClearMany { ids } => {
                for id in ids {
                    state.entries.insert(id, RequestMeta::IDLE);
                }
            },
            MetaAction::ClearAll => state.entries.clear(),
        }
    }
}
