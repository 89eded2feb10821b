//! Failure values reported by wrapped operations
//!
//! Operations tracked by this system talk to an HTTP collaborator. When they
//! fail, they report an [`ActionError`] that mirrors what that collaborator
//! can observe: the server answered with a status and a body, no answer
//! arrived at all, the operation cancelled itself, or something else went
//! wrong.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

/// Failure of a tracked operation
///
/// # Examples
///
/// ```
/// use action_meta_core::ActionError;
/// use serde_json::json;
///
/// let error = ActionError::response(404, json!({ "detail": "Not found." }));
/// assert_eq!(error.status(), Some(404));
///
/// let error = ActionError::network("connection reset");
/// assert_eq!(error.status(), None);
/// ```
#[derive(Error, Debug)]
pub enum ActionError {
    /// The operation cancelled itself
    #[error("ActionAborted")]
    Aborted,

    /// The server answered with a non-success status
    #[error("Request failed with status {status}")]
    Response {
        /// HTTP status code
        status: u16,
        /// Response body, if any
        data: Option<Value>,
    },

    /// No response was received (connectivity failure, timeout)
    #[error("Network error: {0}")]
    Network(String),

    /// Anything else, usually a programming error inside the operation
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ActionError {
    /// Create a failure for a response carrying a body
    #[must_use]
    pub const fn response(status: u16, data: Value) -> Self {
        Self::Response {
            status,
            data: Some(data),
        }
    }

    /// Create a failure for a response without a body
    #[must_use]
    pub const fn status_only(status: u16) -> Self {
        Self::Response { status, data: None }
    }

    /// Create a failure for a request that never got a response
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    /// Create an unexpected failure from a message
    #[must_use]
    pub fn other(message: impl std::fmt::Display) -> Self {
        Self::Other(anyhow::anyhow!("{message}"))
    }

    /// The response status, if the server answered
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Response { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The response body, if the server answered with one
    #[must_use]
    pub const fn data(&self) -> Option<&Value> {
        match self {
            Self::Response { data, .. } => data.as_ref(),
            _ => None,
        }
    }

    /// Whether this failure is the tagged cancellation signal
    #[must_use]
    pub const fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted)
    }
}

/// Per-field validation messages, as returned in a 4xx response body
///
/// Fields are kept in sorted order so snapshots compare deterministically.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    /// Create an empty set of validation errors
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Parse a response body shaped as `field → messages`
    ///
    /// Each field may map to a list of strings or to a single string (which
    /// becomes a one-element list). Any other shape yields `None`.
    ///
    /// # Examples
    ///
    /// ```
    /// use action_meta_core::ValidationErrors;
    /// use serde_json::json;
    ///
    /// let errors = ValidationErrors::from_body(&json!({
    ///     "email": ["invalid", "taken"],
    ///     "detail": "Not found.",
    /// }))
    /// .unwrap();
    /// assert_eq!(errors.first("email"), Some("invalid"));
    /// assert_eq!(errors.first("detail"), Some("Not found."));
    ///
    /// assert!(ValidationErrors::from_body(&json!(["not", "a", "map"])).is_none());
    /// ```
    #[must_use]
    pub fn from_body(body: &Value) -> Option<Self> {
        let object = body.as_object()?;
        let mut fields = BTreeMap::new();

        for (field, value) in object {
            let messages = match value {
                Value::String(message) => vec![message.clone()],
                Value::Array(items) => items
                    .iter()
                    .map(|item| item.as_str().map(str::to_owned))
                    .collect::<Option<Vec<_>>>()?,
                _ => return None,
            };
            fields.insert(field.clone(), messages);
        }

        Some(Self(fields))
    }

    /// Add messages for a field, replacing any previous ones
    pub fn insert(&mut self, field: impl Into<String>, messages: Vec<String>) {
        self.0.insert(field.into(), messages);
    }

    /// All messages for a field
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// The first message for a field
    #[must_use]
    pub fn first(&self, field: &str) -> Option<&str> {
        self.0
            .get(field)
            .and_then(|messages| messages.first())
            .map(String::as_str)
    }

    /// Number of fields with messages
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no field has messages
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over `(field, messages)` pairs in field order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

impl<K: Into<String>> FromIterator<(K, Vec<String>)> for ValidationErrors {
    fn from_iter<I: IntoIterator<Item = (K, Vec<String>)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}
