//! # Firetodo Runtime
//!
//! The Store runtime that coordinates reducer execution and effect handling.
//!
//! ## Core Components
//!
//! - **Store**: holds feature state, runs the reducer, executes effects
//! - **Effect Executor**: spawns futures and streams, feeds their actions back to the reducer
//! - **Cancellation registry**: tracks tasks started under an [`EffectId`] so a
//!   reduction can tear them down (live queries, auth listeners)
//! - **Change notification**: every reduction bumps a watch channel, giving
//!   observers a "current value + on-change" view of the state
//!
//! ## Example
//!
//! ```ignore
//! use firetodo_runtime::Store;
//!
//! let store = Store::new(initial_state, reducer, environment);
//!
//! // Send an action
//! store.send(Action::DoSomething).await?;
//!
//! // Read state
//! let value = store.state(|s| s.some_field).await;
//!
//! // React to changes
//! let mut changes = store.subscribe_changes();
//! changes.changed().await?;
//! ```

use firetodo_core::{
    effect::{Effect, EffectId},
    reducer::Reducer,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{RwLock, watch};
use tokio::task::AbortHandle;

/// Error types for the Store runtime
pub mod error {
    use thiserror::Error;

    /// Errors that can occur during Store operations
    #[derive(Error, Debug, Clone, PartialEq, Eq)]
    pub enum StoreError {
        /// The store has been shut down and no longer accepts actions
        #[error("Store is shutting down, no new actions accepted")]
        ShutdownInProgress,

        /// The action broadcast channel closed while waiting for a result
        #[error("Action broadcast channel closed")]
        ChannelClosed,

        /// Timed out waiting for a matching action
        #[error("Timed out waiting for action")]
        Timeout,
    }
}

pub use error::StoreError;

/// Handle for tracking effect completion
///
/// Returned by [`Store::send()`]. Tracks the [`Effect::Future`] work started by
/// that action, including reduction of the actions those futures feed back.
/// Streams are long-lived (live queries, auth listeners) and are not tracked.
///
/// # Example
///
/// ```ignore
/// let mut handle = store.send(Action::Start).await?;
/// handle.wait_with_timeout(Duration::from_secs(5)).await?;
/// ```
#[derive(Clone)]
pub struct EffectHandle {
    effects: Arc<AtomicUsize>,
    completion: watch::Receiver<()>,
}

impl EffectHandle {
    fn new() -> (Self, EffectTracking) {
        let counter = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = watch::channel(());

        let handle = Self {
            effects: Arc::clone(&counter),
            completion: rx,
        };
        let tracking = EffectTracking {
            counter,
            notifier: Arc::new(tx),
        };

        (handle, tracking)
    }

    /// Create a handle that's already complete
    #[must_use]
    pub fn completed() -> Self {
        let (handle, _tracking) = Self::new();
        handle
    }

    /// Number of tracked effects still running
    #[must_use]
    pub fn pending(&self) -> usize {
        self.effects.load(Ordering::SeqCst)
    }

    /// Wait for all tracked effects to complete
    pub async fn wait(&mut self) {
        while self.effects.load(Ordering::SeqCst) > 0 {
            if self.completion.changed().await.is_err() {
                break;
            }
        }
    }

    /// Wait for all tracked effects to complete with a timeout
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Timeout`] if the timeout expires first.
    pub async fn wait_with_timeout(&mut self, timeout: Duration) -> Result<(), StoreError> {
        tokio::time::timeout(timeout, self.wait())
            .await
            .map_err(|_| StoreError::Timeout)
    }
}

impl std::fmt::Debug for EffectHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectHandle")
            .field("pending_effects", &self.pending())
            .finish_non_exhaustive()
    }
}

/// Internal: counter shared between an [`EffectHandle`] and the effects it tracks
#[derive(Clone)]
struct EffectTracking {
    counter: Arc<AtomicUsize>,
    notifier: Arc<watch::Sender<()>>,
}

impl EffectTracking {
    fn increment(&self) {
        self.counter.fetch_add(1, Ordering::SeqCst);
    }

    fn decrement(&self) {
        if self.counter.fetch_sub(1, Ordering::SeqCst) == 1 {
            // Counter reached zero, notify waiters
            let _ = self.notifier.send(());
        }
    }
}

/// Internal: decrements the effect counter on drop
///
/// Created before the task is spawned so an aborted task still releases it.
struct DecrementGuard(EffectTracking);

impl Drop for DecrementGuard {
    fn drop(&mut self) {
        self.0.decrement();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Internal: running tasks, by cancellation id and overall (for shutdown)
#[derive(Default)]
struct TaskRegistry {
    by_id: HashMap<EffectId, Vec<AbortHandle>>,
    all: Vec<AbortHandle>,
}

impl TaskRegistry {
    fn register(&mut self, scope: Option<EffectId>, handle: AbortHandle) {
        self.all.retain(|h| !h.is_finished());
        self.all.push(handle.clone());
        if let Some(id) = scope {
            let handles = self.by_id.entry(id).or_default();
            handles.retain(|h| !h.is_finished());
            handles.push(handle);
        }
    }

    fn cancel(&mut self, id: EffectId) -> usize {
        let handles = self.by_id.remove(&id).unwrap_or_default();
        for handle in &handles {
            handle.abort();
        }
        handles.len()
    }

    fn abort_all(&mut self) {
        for handle in self.all.drain(..) {
            handle.abort();
        }
        self.by_id.clear();
    }
}

/// Store module - The runtime for reducers
pub mod store {
    use super::{
        Arc, AtomicBool, DecrementGuard, Effect, EffectHandle, EffectId, EffectTracking,
        Ordering, Reducer, RwLock, StoreError, TaskRegistry, lock,
    };
    use futures::StreamExt;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::sync::{broadcast, watch};

    /// The Store - runtime coordinator for a reducer
    ///
    /// The Store manages:
    /// 1. State (behind `RwLock` for concurrent access)
    /// 2. Reducer (feature logic)
    /// 3. Environment (injected dependencies)
    /// 4. Effect execution (with feedback loop and cancellation)
    ///
    /// # Type Parameters
    ///
    /// - `S`: State type
    /// - `A`: Action type
    /// - `E`: Environment type
    /// - `R`: Reducer implementation
    pub struct Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E>,
    {
        state: Arc<RwLock<S>>,
        reducer: R,
        environment: E,
        shutdown: Arc<AtomicBool>,
        tasks: Arc<Mutex<TaskRegistry>>,
        /// Bumped after every reduction.
        changes: Arc<watch::Sender<u64>>,
        /// Actions produced by effects, for observers.
        action_broadcast: broadcast::Sender<A>,
    }

    impl<S, A, E, R> Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Send + Sync + 'static,
        A: Send + Clone + 'static,
        S: Send + Sync + 'static,
        E: Send + Sync + 'static,
    {
        /// Create a new store with initial state, reducer, and environment
        #[must_use]
        pub fn new(initial_state: S, reducer: R, environment: E) -> Self {
            Self::with_broadcast_capacity(initial_state, reducer, environment, 16)
        }

        /// Create a store with a custom action broadcast capacity
        #[must_use]
        pub fn with_broadcast_capacity(
            initial_state: S,
            reducer: R,
            environment: E,
            capacity: usize,
        ) -> Self {
            let (action_broadcast, _) = broadcast::channel(capacity.max(1));
            let (changes, _) = watch::channel(0);

            Self {
                state: Arc::new(RwLock::new(initial_state)),
                reducer,
                environment,
                shutdown: Arc::new(AtomicBool::new(false)),
                tasks: Arc::new(Mutex::new(TaskRegistry::default())),
                changes: Arc::new(changes),
                action_broadcast,
            }
        }

        /// Send an action to the store
        ///
        /// 1. Acquires the state write lock
        /// 2. Calls reducer with (state, action, environment)
        /// 3. Notifies change observers
        /// 4. Executes returned effects in order
        ///
        /// Returns after effects have been started, not completed.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownInProgress`] if the store has been shut down.
        #[tracing::instrument(skip(self, action), name = "store_send")]
        pub async fn send(&self, action: A) -> Result<EffectHandle, StoreError>
        where
            R: Clone,
            E: Clone,
        {
            if self.shutdown.load(Ordering::Acquire) {
                tracing::warn!("Rejected action: store is shutting down");
                metrics::counter!("store.shutdown.rejected_actions").increment(1);
                return Err(StoreError::ShutdownInProgress);
            }

            metrics::counter!("store.actions.total").increment(1);
            let (handle, tracking) = EffectHandle::new();

            let effects = {
                let mut state = self.state.write().await;
                self.reducer.reduce(&mut state, action, &self.environment)
            };
            self.changes.send_modify(|version| *version = version.wrapping_add(1));

            tracing::trace!("Reducer returned {} effects", effects.len());
            for effect in effects {
                self.execute_effect(effect, &tracking, None);
            }

            Ok(handle)
        }

        /// Send an action and wait for an effect-produced action matching the predicate
        ///
        /// # Errors
        ///
        /// - [`StoreError::Timeout`]: no matching action before the timeout
        /// - [`StoreError::ChannelClosed`]: the broadcast channel closed
        /// - [`StoreError::ShutdownInProgress`]: the store is shutting down
        pub async fn send_and_wait_for<F>(
            &self,
            action: A,
            predicate: F,
            timeout: Duration,
        ) -> Result<A, StoreError>
        where
            R: Clone,
            E: Clone,
            F: Fn(&A) -> bool,
        {
            // Subscribe BEFORE sending to avoid race condition
            let mut rx = self.action_broadcast.subscribe();
            self.send(action).await?;

            tokio::time::timeout(timeout, async {
                loop {
                    match rx.recv().await {
                        Ok(action) if predicate(&action) => return Ok(action),
                        Ok(_) => {},
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, "Action observer lagged");
                        },
                        Err(broadcast::error::RecvError::Closed) => {
                            return Err(StoreError::ChannelClosed);
                        },
                    }
                }
            })
            .await
            .map_err(|_| StoreError::Timeout)?
        }

        /// Subscribe to every action produced by effects
        #[must_use]
        pub fn subscribe_actions(&self) -> broadcast::Receiver<A> {
            self.action_broadcast.subscribe()
        }

        /// Subscribe to state changes
        ///
        /// The receiver observes a counter bumped after every reduction; read
        /// the new state with [`Store::state`].
        #[must_use]
        pub fn subscribe_changes(&self) -> watch::Receiver<u64> {
            self.changes.subscribe()
        }

        /// Read current state via a closure
        pub async fn state<F, T>(&self, f: F) -> T
        where
            F: FnOnce(&S) -> T,
        {
            let state = self.state.read().await;
            f(&*state)
        }

        /// Access the injected environment
        #[must_use]
        pub const fn environment(&self) -> &E {
            &self.environment
        }

        /// Stop accepting actions and abort every running effect
        pub fn shutdown(&self) {
            if self.shutdown.swap(true, Ordering::AcqRel) {
                return;
            }
            tracing::info!("Store shutting down, aborting running effects");
            lock(&self.tasks).abort_all();
        }

        /// Returns `true` once [`Store::shutdown`] has been called
        #[must_use]
        pub fn is_shutdown(&self) -> bool {
            self.shutdown.load(Ordering::Acquire)
        }

        /// Execute an effect
        ///
        /// - `None`: no-op
        /// - `Parallel`: executes each child
        /// - `Future`: spawned; a produced action is broadcast then sent back
        /// - `Stream`: spawned; every item is broadcast then sent back
        /// - `Cancellable`: executes the child with its tasks registered under the id
        /// - `Cancel`: aborts the tasks registered under the id
        fn execute_effect(
            &self,
            effect: Effect<A>,
            tracking: &EffectTracking,
            scope: Option<EffectId>,
        ) where
            R: Clone,
            E: Clone,
        {
            match effect {
                Effect::None => {
                    tracing::trace!("Executing Effect::None (no-op)");
                },
                Effect::Parallel(effects) => {
                    tracing::trace!("Executing Effect::Parallel with {} effects", effects.len());
                    metrics::counter!("store.effects.executed", "type" => "parallel").increment(1);
                    for effect in effects {
                        self.execute_effect(effect, tracking, scope);
                    }
                },
                Effect::Future(fut) => {
                    tracing::trace!("Executing Effect::Future");
                    metrics::counter!("store.effects.executed", "type" => "future").increment(1);
                    tracking.increment();
                    let guard = DecrementGuard(tracking.clone());
                    let store = self.clone();

                    let task = tokio::spawn(async move {
                        let _guard = guard;
                        if let Some(action) = fut.await {
                            let _ = store.action_broadcast.send(action.clone());
                            let _ = store.send(action).await;
                        }
                    });
                    lock(&self.tasks).register(scope, task.abort_handle());
                },
                Effect::Stream(mut stream) => {
                    tracing::trace!("Executing Effect::Stream");
                    metrics::counter!("store.effects.executed", "type" => "stream").increment(1);
                    let store = self.clone();

                    let task = tokio::spawn(async move {
                        while let Some(action) = stream.next().await {
                            let _ = store.action_broadcast.send(action.clone());
                            if store.send(action).await.is_err() {
                                break;
                            }
                        }
                        tracing::trace!("Effect::Stream completed");
                    });
                    lock(&self.tasks).register(scope, task.abort_handle());
                },
                Effect::Cancellable { id, effect } => {
                    tracing::debug!(effect_id = %id, "Starting cancellable effect");
                    self.execute_effect(*effect, tracking, Some(id));
                },
                Effect::Cancel(id) => {
                    let cancelled = lock(&self.tasks).cancel(id);
                    tracing::debug!(effect_id = %id, cancelled, "Cancelled effect tasks");
                    metrics::counter!("store.effects.cancelled").increment(cancelled as u64);
                },
            }
        }
    }

    impl<S, A, E, R> Clone for Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Clone,
        E: Clone,
    {
        fn clone(&self) -> Self {
            Self {
                state: Arc::clone(&self.state),
                reducer: self.reducer.clone(),
                environment: self.environment.clone(),
                shutdown: Arc::clone(&self.shutdown),
                tasks: Arc::clone(&self.tasks),
                changes: Arc::clone(&self.changes),
                action_broadcast: self.action_broadcast.clone(),
            }
        }
    }
}

// Re-export for convenience
pub use store::Store;
