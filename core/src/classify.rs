//! Error classification policies
//!
//! Two policies live here and they are deliberately different:
//!
//! - [`classify`] is the rich classifier used by the action tracker. It
//!   tells aborted, validation, server, network and unclassified failures
//!   apart.
//! - [`api_error_payload`] is the coarse check used by the request registry.
//!   It only recognises `400..500` responses and treats everything else as
//!   fatal.
//!
//! Both are side-effect free. Logging and propagation belong to the caller.

use crate::failure::{ActionError, ValidationErrors};
use crate::meta::ErrorPayload;

/// Outcome of classifying a failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    /// The operation cancelled itself
    Aborted,
    /// A 4xx response whose body is a `field → messages` map
    Validation(ValidationErrors),
    /// A 5xx response
    Server,
    /// No response was received
    Network,
    /// Anything else; must be re-raised by the caller
    Unclassified,
}

impl FailureKind {
    /// Whether the caller is expected to absorb this failure
    #[must_use]
    pub const fn is_handled(&self) -> bool {
        !matches!(self, Self::Unclassified)
    }
}

/// Classify a failure into exactly one [`FailureKind`]
///
/// # Examples
///
/// ```
/// use action_meta_core::{ActionError, FailureKind, classify};
///
/// assert_eq!(classify(&ActionError::Aborted), FailureKind::Aborted);
/// assert_eq!(classify(&ActionError::status_only(503)), FailureKind::Server);
/// assert_eq!(classify(&ActionError::network("offline")), FailureKind::Network);
/// assert_eq!(classify(&ActionError::other("bug")), FailureKind::Unclassified);
/// ```
#[must_use]
pub fn classify(error: &ActionError) -> FailureKind {
    match error {
        ActionError::Aborted => FailureKind::Aborted,
        ActionError::Response { status, data } => match *status {
            400..=499 => data
                .as_ref()
                .and_then(ValidationErrors::from_body)
                .map_or(FailureKind::Unclassified, FailureKind::Validation),
            500.. => FailureKind::Server,
            _ => FailureKind::Unclassified,
        },
        ActionError::Network(_) => FailureKind::Network,
        ActionError::Other(_) => FailureKind::Unclassified,
    }
}

/// Whether a failure is a 4xx response with per-field messages
#[must_use]
pub fn is_validation_error(error: &ActionError) -> bool {
    matches!(classify(error), FailureKind::Validation(_))
}

/// Whether a failure is a 5xx response
#[must_use]
pub fn is_server_error(error: &ActionError) -> bool {
    matches!(error.status(), Some(500..))
}

/// Whether a failure never received a response
#[must_use]
pub const fn is_network_error(error: &ActionError) -> bool {
    matches!(error, ActionError::Network(_))
}

/// The coarse registry policy: extract the payload of a `400..500` response
///
/// Returns `None` for every other failure, which the registry treats as
/// fatal. This does not look at the body shape and does not distinguish
/// server, network or aborted failures.
#[must_use]
pub fn api_error_payload(error: &ActionError) -> Option<ErrorPayload> {
    match error {
        ActionError::Response {
            status: 400..=499,
            data,
        } => Some(ErrorPayload::from_body(data.as_ref())),
        _ => None,
    }
}

/// What [`only_handle_api_error`] hands to its handler
#[derive(Debug)]
pub enum ApiFailure<'a> {
    /// A 4xx response; the failure is absorbed
    Api(ErrorPayload),
    /// Any other failure; it is returned to the caller after the handler runs
    Fatal(&'a ActionError),
}

/// Let `handle` observe a failure, absorbing it only if it is a 4xx response
///
/// # Errors
///
/// Returns the original failure when it is not a `400..500` response.
///
/// # Examples
///
/// ```
/// use action_meta_core::classify::{ApiFailure, only_handle_api_error};
/// use action_meta_core::ActionError;
/// use serde_json::json;
///
/// let mut seen = None;
/// let result = only_handle_api_error(
///     ActionError::response(400, json!({ "name": ["taken"] })),
///     |failure| {
///         if let ApiFailure::Api(payload) = failure {
///             seen = payload.first_message("name").map(str::to_owned);
///         }
///     },
/// );
/// assert!(result.is_ok());
/// assert_eq!(seen.as_deref(), Some("taken"));
///
/// let result = only_handle_api_error(ActionError::status_only(500), |_| {});
/// assert!(result.is_err());
/// ```
pub fn only_handle_api_error<F>(error: ActionError, handle: F) -> Result<(), ActionError>
where
    F: FnOnce(ApiFailure<'_>),
{
    if let Some(payload) = api_error_payload(&error) {
        handle(ApiFailure::Api(payload));
        Ok(())
    } else {
        handle(ApiFailure::Fatal(&error));
        Err(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_validation_error_with_field_map() {
        let error = ActionError::response(422, json!({ "field": ["required"] }));

        let FailureKind::Validation(errors) = classify(&error) else {
            unreachable!("422 with field map must classify as validation");
        };
        assert_eq!(errors.get("field"), Some(&["required".to_string()][..]));
        assert!(is_validation_error(&error));
    }

    #[test]
    fn test_client_error_without_field_map_is_unclassified() {
        assert_eq!(
            classify(&ActionError::status_only(404)),
            FailureKind::Unclassified
        );
        assert_eq!(
            classify(&ActionError::response(400, json!(["a", "b"]))),
            FailureKind::Unclassified
        );
    }

    #[test]
    fn test_non_error_status_is_unclassified() {
        assert_eq!(
            classify(&ActionError::status_only(302)),
            FailureKind::Unclassified
        );
    }

    #[test]
    fn test_handled_kinds() {
        assert!(FailureKind::Aborted.is_handled());
        assert!(FailureKind::Server.is_handled());
        assert!(FailureKind::Network.is_handled());
        assert!(!FailureKind::Unclassified.is_handled());
    }

    #[test]
    fn test_predicates() {
        assert!(is_server_error(&ActionError::status_only(500)));
        assert!(!is_server_error(&ActionError::status_only(499)));
        assert!(is_network_error(&ActionError::network("down")));
        assert!(!is_network_error(&ActionError::Aborted));
    }

    #[test]
    fn test_registry_policy_ignores_body_shape() {
        let payload = api_error_payload(&ActionError::response(404, json!("gone")));
        assert_eq!(payload, Some(ErrorPayload::Body(json!("gone"))));

        let payload = api_error_payload(&ActionError::status_only(403));
        assert_eq!(payload, Some(ErrorPayload::Empty));
    }

    #[test]
    fn test_registry_policy_rejects_everything_else() {
        assert_eq!(api_error_payload(&ActionError::status_only(500)), None);
        assert_eq!(api_error_payload(&ActionError::network("down")), None);
        assert_eq!(api_error_payload(&ActionError::Aborted), None);
        assert_eq!(api_error_payload(&ActionError::other("bug")), None);
    }

    #[test]
    fn test_only_handle_api_error_reports_fatal_before_returning_it() {
        let mut fatal_seen = false;
        let result = only_handle_api_error(ActionError::network("down"), |failure| {
            fatal_seen = matches!(failure, ApiFailure::Fatal(ActionError::Network(_)));
        });

        assert!(fatal_seen);
        assert!(matches!(result, Err(ActionError::Network(_))));
    }

    proptest! {
        #[test]
        fn prop_5xx_is_server_error(status in 500u16..600) {
            prop_assert_eq!(classify(&ActionError::status_only(status)), FailureKind::Server);
            prop_assert_eq!(api_error_payload(&ActionError::status_only(status)), None);
        }

        #[test]
        fn prop_4xx_field_map_is_validation(status in 400u16..500, field in "[a-z]{1,8}", message in "[a-z ]{0,16}") {
            let error = ActionError::response(status, json!({ field.clone(): [message.clone()] }));
            let kind = classify(&error);
            prop_assert!(matches!(&kind, FailureKind::Validation(errors) if errors.first(&field) == Some(message.as_str())));
            prop_assert!(api_error_payload(&error).is_some());
        }

        #[test]
        fn prop_below_400_is_unclassified(status in 0u16..400) {
            prop_assert_eq!(classify(&ActionError::status_only(status)), FailureKind::Unclassified);
            prop_assert_eq!(api_error_payload(&ActionError::status_only(status)), None);
        }
    }
}
