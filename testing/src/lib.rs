//! # Action Meta Testing
//!
//! Testing utilities and helpers for action-meta.
//!
//! This crate provides:
//! - Deterministic clocks for `started_at` assertions
//! - Failure fixtures shaped like what the HTTP collaborator reports
//! - A Given/When/Then harness for reducers
//!
//! ## Example
//!
//! ```ignore
//! use action_meta_testing::{fixtures, test_clock};
//! use action_meta_runtime::ActionTracker;
//!
//! #[tokio::test]
//! async fn test_save_reports_validation_errors() {
//!     let tracker = ActionTracker::new(Arc::new(test_clock()));
//!     let tracked = tracker.track(|| async {
//!         Err::<(), _>(fixtures::validation(400, json!({ "name": ["taken"] })))
//!     });
//!
//!     let status = tracked.join().await.unwrap();
//!     assert!(status.has_validation_errors());
//! }
//! ```

use action_meta_core::environment::Clock;
use chrono::{DateTime, Utc};

/// Ergonomic Given/When/Then testing for reducers
pub mod reducer_test;

/// Mock implementations of Environment traits
pub mod mocks {
    use super::{Clock, DateTime, Utc};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use action_meta_testing::mocks::FixedClock;
    /// use action_meta_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

/// Failure fixtures
///
/// Each helper builds the [`ActionError`](action_meta_core::ActionError) an
/// HTTP collaborator would report for that situation.
pub mod fixtures {
    use action_meta_core::ActionError;
    use serde_json::Value;

    /// The operation cancelled itself
    #[must_use]
    pub const fn aborted() -> ActionError {
        ActionError::Aborted
    }

    /// A response with a JSON body (typically `field → messages`)
    #[must_use]
    pub const fn validation(status: u16, body: Value) -> ActionError {
        ActionError::response(status, body)
    }

    /// A response without a body
    #[must_use]
    pub const fn server_error(status: u16) -> ActionError {
        ActionError::status_only(status)
    }

    /// No response at all
    #[must_use]
    pub fn network_error() -> ActionError {
        ActionError::network("connection refused")
    }

    /// Something the classifier cannot place
    #[must_use]
    pub fn unexpected(message: &str) -> ActionError {
        ActionError::other(message)
    }
}

/// Test helpers and utilities
pub mod helpers {
    use tracing_subscriber::EnvFilter;

    /// Install a test subscriber honouring `RUST_LOG`
    ///
    /// Safe to call from every test; only the first call installs anything.
    pub fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }
}

// Re-export commonly used items
pub use mocks::{FixedClock, test_clock};
pub use reducer_test::ReducerTest;
