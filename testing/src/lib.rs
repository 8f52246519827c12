//! # Firetodo Testing
//!
//! Testing utilities and helpers for firetodo features.
//!
//! This crate provides:
//! - Deterministic [`Clock`] implementations
//! - [`ReducerTest`], a Given/When/Then harness for reducers
//! - Effect assertion helpers
//! - [`wait_for_state`] for eventually-consistent store scenarios (live queries)
//!
//! ## Example
//!
//! ```ignore
//! use firetodo_testing::{test_clock, wait_for_state};
//! use firetodo_runtime::Store;
//!
//! #[tokio::test]
//! async fn add_shows_up_in_list() {
//!     let store = Store::new(AppState::default(), AppReducer, env);
//!     store.send(add("Buy milk")).await?;
//!
//!     wait_for_state(&store, Duration::from_secs(1), |s| s.todos.todos.len() == 1).await?;
//! }
//! ```

use chrono::{DateTime, Utc};
use firetodo_core::environment::Clock;
use firetodo_core::reducer::Reducer;
use firetodo_runtime::Store;
use std::time::Duration;


pub use reducer_test::{ReducerTest, assertions};

/// Mock implementations of Environment traits
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use std::sync::Mutex;

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use firetodo_testing::mocks::FixedClock;
    /// use firetodo_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
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

    /// Clock that moves forward by a fixed step on every reading
    ///
    /// Gives every server timestamp a distinct, increasing value.
    #[derive(Debug)]
    pub struct SteppingClock {
        next: Mutex<DateTime<Utc>>,
        step: chrono::Duration,
    }

    impl SteppingClock {
        /// Start at `start`, advancing by `step` per call to [`Clock::now`]
        #[must_use]
        pub const fn new(start: DateTime<Utc>, step: chrono::Duration) -> Self {
            Self {
                next: Mutex::new(start),
                step,
            }
        }
    }

    impl Clock for SteppingClock {
        fn now(&self) -> DateTime<Utc> {
            let mut next = self
                .next
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            let now = *next;
            *next = now + self.step;
            now
        }
    }

    /// 2025-01-01 00:00:00 UTC
    #[must_use]
    pub fn epoch() -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(1_735_689_600, 0).unwrap_or_default()
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(epoch())
    }

    /// Stepping clock starting at 2025-01-01 00:00:00 UTC, one second per reading
    #[must_use]
    pub fn stepping_clock() -> SteppingClock {
        SteppingClock::new(epoch(), chrono::Duration::seconds(1))
    }
}

/// Error returned by [`wait_for_state`]
#[derive(Debug, thiserror::Error, Clone, Copy, PartialEq, Eq)]
#[error("state did not satisfy the predicate within {0:?}")]
pub struct WaitTimeout(pub Duration);

/// Wait until the store's state satisfies `predicate`
///
/// Checks immediately, then after every reduction.
///
/// # Errors
///
/// Returns [`WaitTimeout`] if the predicate is still false when `timeout` expires.
pub async fn wait_for_state<S, A, E, R, F>(
    store: &Store<S, A, E, R>,
    timeout: Duration,
    predicate: F,
) -> Result<(), WaitTimeout>
where
    R: Reducer<State = S, Action = A, Environment = E> + Send + Sync + 'static,
    A: Send + Clone + 'static,
    S: Send + Sync + 'static,
    E: Send + Sync + 'static,
    F: Fn(&S) -> bool,
{
    let mut changes = store.subscribe_changes();
    let wait = async {
        loop {
            let _ = changes.borrow_and_update();
            if store.state(&predicate).await {
                return;
            }
            if changes.changed().await.is_err() {
                // Sender lives as long as the store; keep polling state
                tokio::task::yield_now().await;
            }
        }
    };

    tokio::time::timeout(timeout, wait)
        .await
        .map_err(|_| WaitTimeout(timeout))
}

/// Install a `tracing` subscriber writing to the test output
///
/// Safe to call from several tests; only the first call installs.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_test_writer()
        .try_init();
}

// Re-export commonly used items
pub use mocks::{FixedClock, SteppingClock, stepping_clock, test_clock};
