//! Keyed request metadata registry
//!
//! A [`MetaRegistry`] records, per caller-chosen key, whether a request is in
//! flight, succeeded, or failed with an API error. It is injected into the
//! domain module that owns it; clones share the same state.
//!
//! Failure handling is intentionally coarser than the action tracker's:
//! only `400..500` responses are recorded. Every other failure is returned
//! to the caller and the entry stays as it was when the request started.
//!
//! Two requests racing on the same key are not ordered; the entry reflects
//! whichever settled last.

use crate::{Store, StoreConfig};
use action_meta_core::classify::api_error_payload;
use action_meta_core::{ActionError, MetaAction, MetaReducer, MetaState, RequestMeta};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};

type MetaStore = Store<MetaState, MetaAction, (), MetaReducer>;

/// Shared registry of request metadata
///
/// # Example
///
/// ```ignore
/// let meta = MetaRegistry::new();
///
/// meta.request(format!("save-{}", group.id), || async {
///     let updated = api.save(&group).await?;
///     groups.receive(updated);
///     Ok(())
/// })
/// .await?;
///
/// if let Some(message) = meta.error(&format!("save-{}", group.id), "name") {
///     show_field_error("name", &message);
/// }
/// ```
#[derive(Clone)]
pub struct MetaRegistry {
    store: Arc<MetaStore>,
}

impl MetaRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    /// Create an empty registry with custom configuration
    #[must_use]
    pub fn with_config(config: StoreConfig) -> Self {
        Self {
            store: Arc::new(Store::with_config(MetaState::new(), MetaReducer, (), config)),
        }
    }

    /// Run a request under `id`, recording its metadata
    ///
    /// The entry is marked waiting before `run` is invoked. On success the
    /// entry is marked successful and the value is returned as `Some`. On a
    /// `400..500` response the payload is recorded and `Ok(None)` is
    /// returned.
    ///
    /// # Errors
    ///
    /// Returns the failure unchanged for anything other than a `400..500`
    /// response. The entry is left waiting in that case.
    #[tracing::instrument(skip_all, name = "meta_request")]
    pub async fn request<F, Fut, T>(
        &self,
        id: impl Into<String>,
        run: F,
    ) -> Result<Option<T>, ActionError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ActionError>>,
    {
        let id = id.into();
        tracing::debug!(%id, "Request started");
        metrics::counter!("action_meta.requests.total").increment(1);
        self.store.send(MetaAction::Request { id: id.clone() });

        match run().await {
            Ok(value) => {
                tracing::debug!(%id, "Request succeeded");
                metrics::counter!("action_meta.requests.outcome", "outcome" => "success")
                    .increment(1);
                self.store.send(MetaAction::ReceiveSuccess { id });
                Ok(Some(value))
            },
            Err(error) => {
                if let Some(payload) = api_error_payload(&error) {
                    tracing::debug!(%id, %error, "Request failed with API error");
                    metrics::counter!("action_meta.requests.outcome", "outcome" => "api_error")
                        .increment(1);
                    self.store.send(MetaAction::ReceiveError { id, error: payload });
                    Ok(None)
                } else {
                    tracing::debug!(%id, %error, "Request failed, propagating");
                    metrics::counter!("action_meta.requests.outcome", "outcome" => "propagated")
                        .increment(1);
                    Err(error)
                }
            },
        }
    }

    /// Reset `id` to the idle entry
    pub fn clear(&self, id: impl Into<String>) {
        self.store.send(MetaAction::Clear { id: id.into() });
    }

    /// Reset several keys to the idle entry
    pub fn clear_many<I, K>(&self, ids: I)
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        let ids = ids.into_iter().map(Into::into).collect();
        self.store.send(MetaAction::ClearMany { ids });
    }

    /// Forget every entry
    pub fn clear_all(&self) {
        self.store.send(MetaAction::ClearAll);
    }

    /// The entry for `id`, or the idle entry for unknown keys
    #[must_use]
    pub fn get(&self, id: &str) -> RequestMeta {
        self.store.state(|state| state.get(id))
    }

    /// Whether a request under `id` is in flight
    #[must_use]
    pub fn is_waiting(&self, id: &str) -> bool {
        self.store
            .state(|state| state.entry(id).is_some_and(|entry| entry.is_waiting))
    }

    /// Whether the last request under `id` succeeded
    #[must_use]
    pub fn success(&self, id: &str) -> bool {
        self.store
            .state(|state| state.entry(id).is_some_and(|entry| entry.success))
    }

    /// The first recorded error message for `field` under `id`
    #[must_use]
    pub fn error(&self, id: &str, field: &str) -> Option<String> {
        self.store.state(|state| {
            state
                .entry(id)
                .and_then(|entry| entry.error_message(field))
                .map(str::to_owned)
        })
    }

    /// Snapshot of the whole registry state
    #[must_use]
    pub fn snapshot(&self) -> MetaState {
        self.store.state(MetaState::clone)
    }

    /// Subscribe to registry state changes
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<MetaState> {
        self.store.subscribe()
    }

    /// Subscribe to applied registry transitions
    #[must_use]
    pub fn subscribe_actions(&self) -> broadcast::Receiver<MetaAction> {
        self.store.subscribe_actions()
    }
}

impl Default for MetaRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MetaRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetaRegistry")
            .field("entries", &self.store.state(MetaState::len))
            .finish()
    }
}
