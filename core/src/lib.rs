//! # Firetodo Core
//!
//! The building blocks every firetodo feature is written against.
//!
//! ## Core Concepts
//!
//! - **State**: owned, cloneable data for one feature (session, login form, todo list)
//! - **Action**: every input a feature reacts to, whether a user intent or a backend reply
//! - **Reducer**: pure function `(State, Action, Environment) → (State, Effects)`
//! - **Effect**: a description of work for the runtime (a backend call, a live query)
//! - **Environment**: injected dependencies (backend client, clock)
//!
//! Reducers never perform I/O. A reducer that needs the backend returns an
//! [`effect::Effect`] wrapping the call; the runtime executes it and feeds the
//! resulting action back in.
//!
//! ## Example
//!
//! ```
//! use firetodo_core::{effect::Effect, reducer::Reducer, SmallVec};
//!
//! #[derive(Default)]
//! struct DraftState {
//!     text: String,
//! }
//!
//! enum DraftAction {
//!     Typed(String),
//!     Cleared,
//! }
//!
//! struct DraftReducer;
//!
//! impl Reducer for DraftReducer {
//!     type State = DraftState;
//!     type Action = DraftAction;
//!     type Environment = ();
//!
//!     fn reduce(
//!         &self,
//!         state: &mut DraftState,
//!         action: DraftAction,
//!         _env: &(),
//!     ) -> SmallVec<[Effect<DraftAction>; 4]> {
//!         match action {
//!             DraftAction::Typed(text) => state.text = text,
//!             DraftAction::Cleared => state.text.clear(),
//!         }
//!         SmallVec::new()
//!     }
//! }
//!
//! let mut state = DraftState::default();
//! let effects = DraftReducer.reduce(&mut state, DraftAction::Typed("milk".into()), &());
//! assert!(effects.is_empty());
//! assert_eq!(state.text, "milk");
//! ```

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use smallvec::{smallvec, SmallVec};

/// Reducer module - The core trait for business logic
pub mod reducer {
    use super::effect::Effect;
    use smallvec::SmallVec;

    /// The Reducer trait - core abstraction for feature logic
    ///
    /// # Type Parameters
    ///
    /// - `State`: The feature state this reducer operates on
    /// - `Action`: The action type this reducer processes
    /// - `Environment`: The injected dependencies this reducer needs
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The action type this reducer processes
        type Action;

        /// The environment type with injected dependencies
        type Environment;

        /// Reduce an action into state changes and effects
        ///
        /// This is a pure function that:
        /// 1. Validates the action
        /// 2. Updates state in place
        /// 3. Returns effect descriptions to be executed
        ///
        /// Effects are executed by the runtime in the order they are returned.
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]>;
    }
}

/// Effect module - Side effect descriptions
///
/// Effects describe work to be performed by the runtime. They are values,
/// composable with [`Effect::merge`] and [`Effect::map`], and long-running ones
/// can be tagged with an [`EffectId`](effect::EffectId) so a later reduction can cancel them.
pub mod effect {
    use futures::{Stream, StreamExt};
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::Arc;

    /// Identifier for a cancellable, usually long-running, effect
    ///
    /// Only one family of tasks is registered per id at a time from the
    /// reducer's point of view: emitting [`Effect::Cancel`] followed by a new
    /// [`Effect::Cancellable`] with the same id replaces the old work.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub struct EffectId(&'static str);

    impl EffectId {
        /// Create a new effect id from a static name
        #[must_use]
        pub const fn new(name: &'static str) -> Self {
            Self(name)
        }

        /// The name this id was created with
        #[must_use]
        pub const fn name(&self) -> &'static str {
            self.0
        }
    }

    impl std::fmt::Display for EffectId {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str(self.0)
        }
    }

    /// Effect type - describes a side effect to be executed
    ///
    /// Effects are NOT executed immediately. They are descriptions of what should happen,
    /// returned from reducers and executed by the Store runtime.
    ///
    /// # Type Parameters
    ///
    /// - `Action`: The action type that effects can produce (feedback loop)
    pub enum Effect<Action> {
        /// No-op effect
        None,

        /// Run effects in parallel
        Parallel(Vec<Effect<Action>>),

        /// Arbitrary async computation
        ///
        /// Returns `Option<Action>` - if Some, the action is fed back into the reducer
        Future(Pin<Box<dyn Future<Output = Option<Action>> + Send>>),

        /// Long-running source of actions
        ///
        /// Every item is fed back into the reducer until the stream ends or
        /// the effect is cancelled.
        Stream(Pin<Box<dyn Stream<Item = Action> + Send>>),

        /// Run `effect`, registering its tasks under `id`
        Cancellable {
            /// Identifier used by a later [`Effect::Cancel`]
            id: EffectId,
            /// The effect to run
            effect: Box<Effect<Action>>,
        },

        /// Abort every running task registered under the id
        Cancel(EffectId),
    }

    // Manual Debug implementation since Future and Stream don't implement Debug
    impl<Action> std::fmt::Debug for Effect<Action> {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Effect::None => write!(f, "Effect::None"),
                Effect::Parallel(effects) => {
                    f.debug_tuple("Effect::Parallel").field(effects).finish()
                },
                Effect::Future(_) => write!(f, "Effect::Future(<future>)"),
                Effect::Stream(_) => write!(f, "Effect::Stream(<stream>)"),
                Effect::Cancellable { id, effect } => f
                    .debug_struct("Effect::Cancellable")
                    .field("id", id)
                    .field("effect", effect)
                    .finish(),
                Effect::Cancel(id) => f.debug_tuple("Effect::Cancel").field(id).finish(),
            }
        }
    }

    impl<Action> Effect<Action> {
        /// Combine effects to run in parallel
        #[must_use]
        pub const fn merge(effects: Vec<Effect<Action>>) -> Effect<Action> {
            Effect::Parallel(effects)
        }

        /// Tag this effect so it can be aborted with [`Effect::Cancel`]
        #[must_use]
        pub fn cancellable(self, id: EffectId) -> Effect<Action> {
            Effect::Cancellable {
                id,
                effect: Box::new(self),
            }
        }

        /// Returns `true` for [`Effect::None`] and empty [`Effect::Parallel`]
        #[must_use]
        pub fn is_none(&self) -> bool {
            match self {
                Effect::None => true,
                Effect::Parallel(effects) => effects.iter().all(Effect::is_none),
                _ => false,
            }
        }
    }

    impl<Action: Send + 'static> Effect<Action> {
        /// Wrap an async computation
        #[must_use]
        pub fn future<F>(fut: F) -> Self
        where
            F: Future<Output = Option<Action>> + Send + 'static,
        {
            Effect::Future(Box::pin(fut))
        }

        /// Wrap a stream of actions
        #[must_use]
        pub fn stream<S>(stream: S) -> Self
        where
            S: Stream<Item = Action> + Send + 'static,
        {
            Effect::Stream(Box::pin(stream))
        }

        /// Transform the actions this effect produces
        ///
        /// Used to lift a child feature's effects into a parent action type.
        /// Cancellation ids are preserved.
        #[must_use]
        pub fn map<B, F>(self, f: F) -> Effect<B>
        where
            B: Send + 'static,
            F: Fn(Action) -> B + Send + Sync + 'static,
        {
            self.map_shared(Arc::new(f))
        }

        fn map_shared<B>(self, f: Arc<dyn Fn(Action) -> B + Send + Sync>) -> Effect<B>
        where
            B: Send + 'static,
        {
            match self {
                Effect::None => Effect::None,
                Effect::Parallel(effects) => Effect::Parallel(
                    effects
                        .into_iter()
                        .map(|effect| effect.map_shared(Arc::clone(&f)))
                        .collect(),
                ),
                Effect::Future(fut) => {
                    Effect::Future(Box::pin(async move { fut.await.map(|action| f(action)) }))
                },
                Effect::Stream(stream) => {
                    Effect::Stream(Box::pin(stream.map(move |action| f(action))))
                },
                Effect::Cancellable { id, effect } => Effect::Cancellable {
                    id,
                    effect: Box::new(effect.map_shared(f)),
                },
                Effect::Cancel(id) => Effect::Cancel(id),
            }
        }
    }
}

/// Environment module - Dependency injection traits
///
/// All external dependencies are abstracted behind traits and injected
/// via the Environment parameter.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Wall-clock time
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}
