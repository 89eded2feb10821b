//! Integration tests for action tracking and request metadata
//!
//! Covers the observable guarantees consumers rely on: terminal states per
//! failure kind, propagation of unclassified failures, and registry defaults.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use action_meta_core::{ActionError, RequestMeta, Status};
use action_meta_runtime::{ActionTracker, MetaRegistry, RuntimeError};
use action_meta_testing::{fixtures, helpers, test_clock};
use proptest::prelude::*;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn tracker() -> ActionTracker {
    helpers::init_tracing();
    ActionTracker::new(Arc::new(test_clock()))
}

async fn settle<T>(outcome: Result<T, ActionError>) -> Result<action_meta_core::ActionStatus<T>, RuntimeError>
where
    T: Clone + Send + Sync + 'static,
{
    let tracked = tracker().track(move || async move { outcome });
    tokio::time::timeout(Duration::from_secs(5), tracked.join())
        .await
        .expect("tracked action should settle")
}

// ============================================================================
// Tracker
// ============================================================================

#[tokio::test]
async fn test_success_records_result() {
    let status = settle(Ok::<_, ActionError>(vec![1, 2, 3])).await.unwrap();

    assert_eq!(status.status(), Status::Success);
    assert_eq!(status.result(), Some(&vec![1, 2, 3]));
    assert!(!status.pending());
}

#[tokio::test]
async fn test_aborted() {
    let status = settle(Err::<(), _>(fixtures::aborted())).await.unwrap();

    assert_eq!(status.status(), Status::Aborted);
    assert!(status.aborted());
}

#[tokio::test]
async fn test_validation_errors() {
    let status = settle(Err::<(), _>(fixtures::validation(
        422,
        json!({ "field": ["required"] }),
    )))
    .await
    .unwrap();

    assert_eq!(status.status(), Status::ValidationErrors);
    assert_eq!(
        status.validation_errors().get("field"),
        Some(&["required".to_string()][..])
    );
}

#[tokio::test]
async fn test_server_error() {
    let status = settle(Err::<(), _>(fixtures::server_error(500))).await.unwrap();

    assert_eq!(status.status(), Status::ServerError);
    assert!(status.server_error());
}

#[tokio::test]
async fn test_network_error() {
    let status = settle(Err::<(), _>(fixtures::network_error())).await.unwrap();

    assert_eq!(status.status(), Status::NetworkError);
    assert!(status.network_error());
}

#[tokio::test]
async fn test_unclassified_failure_reaches_enclosing_context() {
    let tracked = tracker().track(|| async { Err::<(), _>(fixtures::unexpected("broken invariant")) });
    let handle = tracked.status();

    // The enclosing chain still observes the rejection
    let chained = async { tracked.join().await.map(|_| "unreachable") }.await;

    match chained {
        Err(RuntimeError::Unhandled(error)) => assert_eq!(error.to_string(), "broken invariant"),
        other => panic!("expected unhandled failure, got {other:?}"),
    }

    let status = handle.get();
    assert_eq!(status.status(), Status::UnhandledError);
    assert!(status.unhandled_error().is_some());
}

#[tokio::test]
async fn test_handle_obtained_early_sees_settlement() {
    let (tx, rx) = tokio::sync::oneshot::channel::<&'static str>();
    let tracked = tracker().track(|| async move { rx.await.map_err(ActionError::other) });
    let handle = tracked.status();
    let mut changes = handle.subscribe();

    assert!(handle.pending());
    tx.send("saved").unwrap();

    changes.changed().await.unwrap();
    assert_eq!(changes.borrow().status(), Status::Success);
    assert_eq!(handle.get().result(), Some(&"saved"));
}

// ============================================================================
// Registry
// ============================================================================

#[tokio::test]
async fn test_registry_unknown_key_default() {
    let meta = MetaRegistry::new();

    assert_eq!(
        meta.get("anything"),
        RequestMeta {
            is_waiting: false,
            error: None,
            success: false,
        }
    );
    assert!(meta.snapshot().is_empty());
}

#[tokio::test]
async fn test_registry_404_message() {
    let meta = MetaRegistry::new();

    meta.request("fetch-9", || async {
        Err::<(), _>(fixtures::validation(404, json!({ "detail": "Not found." })))
    })
    .await
    .unwrap();

    assert_eq!(meta.error("fetch-9", "detail").as_deref(), Some("Not found."));
    assert!(!meta.is_waiting("fetch-9"));
    assert!(!meta.success("fetch-9"));
}

#[tokio::test]
async fn test_registry_clear_twice_same_as_once() {
    let once = MetaRegistry::new();
    let twice = MetaRegistry::new();
    for meta in [&once, &twice] {
        meta.request("k", || async { Ok(()) }).await.unwrap();
    }

    once.clear("k");
    twice.clear("k");
    twice.clear("k");

    assert_eq!(once.snapshot(), twice.snapshot());
}

proptest! {
    #[test]
    fn prop_registry_get_never_inserts(key in "[a-z0-9:/-]{0,24}") {
        let meta = MetaRegistry::new();
        prop_assert_eq!(meta.get(&key), RequestMeta::IDLE);
        prop_assert!(meta.snapshot().is_empty());
    }
}
