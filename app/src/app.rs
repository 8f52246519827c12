//! Composition of the features into one store.
//!
//! [`AppReducer`] delegates every action to its feature and lifts the
//! feature's effects back into [`AppAction`]. An identity reported by the
//! session is forwarded to the todo list inside the same reduction, so the
//! list never observes a session it has not been told about.

use crate::config::AppError;
use crate::environment::AppEnvironment;
use crate::login::{LoginAction, LoginFormState, LoginReducer};
use crate::session::{SessionAction, SessionReducer, SessionState};
use crate::todos::{TodoListAction, TodoListReducer, TodoListState};
use crate::view::{Intent, Screen, render};
use firetodo_backend::BackendClient;
use firetodo_core::{SmallVec, effect::Effect, reducer::Reducer};
use firetodo_runtime::{EffectHandle, Store};
use tokio::sync::watch;

/// Whole app state.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AppState {
    /// Session Store
    pub session: SessionState,
    /// Login Form
    pub login: LoginFormState,
    /// Todo List Store
    pub todos: TodoListState,
}

/// Whole app actions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AppAction {
    /// Session action
    Session(SessionAction),
    /// Login form action
    Login(LoginAction),
    /// Todo list action
    Todos(TodoListAction),
}

/// Run a child reducer and lift its effects.
fn lift<R, A, F>(
    reducer: &R,
    state: &mut R::State,
    action: R::Action,
    env: &AppEnvironment,
    wrap: F,
) -> SmallVec<[Effect<AppAction>; 4]>
where
    R: Reducer<Action = A, Environment = AppEnvironment>,
    A: Send + 'static,
    F: Fn(A) -> AppAction + Copy + Send + Sync + 'static,
{
    reducer
        .reduce(state, action, env)
        .into_iter()
        .map(|effect| effect.map(wrap))
        .collect()
}

/// Root reducer.
#[derive(Clone, Copy, Debug, Default)]
pub struct AppReducer;

impl Reducer for AppReducer {
    type State = AppState;
    type Action = AppAction;
    type Environment = AppEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            AppAction::Session(action) => {
                let identity = match &action {
                    SessionAction::IdentityChanged(user) => {
                        Some(user.as_ref().map(|user| user.uid.clone()))
                    },
                    SessionAction::Start | SessionAction::Stop => None,
                };

                let mut effects =
                    lift(&SessionReducer, &mut state.session, action, env, AppAction::Session);
                if let Some(owner) = identity {
                    effects.extend(lift(
                        &TodoListReducer,
                        &mut state.todos,
                        TodoListAction::IdentityChanged(owner),
                        env,
                        AppAction::Todos,
                    ));
                }
                effects
            },
            AppAction::Login(action) => {
                lift(&LoginReducer, &mut state.login, action, env, AppAction::Login)
            },
            AppAction::Todos(action) => {
                lift(&TodoListReducer, &mut state.todos, action, env, AppAction::Todos)
            },
        }
    }
}

/// Store type driving the app.
pub type AppStore = Store<AppState, AppAction, AppEnvironment, AppReducer>;

/// The running app: a store over [`AppReducer`] plus the view.
///
/// # Example
///
/// ```ignore
/// let app = TodoApp::new(backend);
/// app.start().await?;
/// app.dispatch(Intent::EditInput("Buy milk".into())).await?;
/// app.dispatch(Intent::SubmitAdd).await?;
/// println!("{}", app.screen().await);
/// ```
pub struct TodoApp {
    store: AppStore,
}

impl TodoApp {
    /// App over `backend`, not yet started.
    #[must_use]
    pub fn new(backend: BackendClient) -> Self {
        Self {
            store: Store::new(
                AppState::default(),
                AppReducer,
                AppEnvironment::new(backend),
            ),
        }
    }

    /// Subscribe to the identity stream.
    ///
    /// # Errors
    ///
    /// Returns an error if the app has been shut down.
    pub async fn start(&self) -> Result<(), AppError> {
        tracing::info!("starting todo app");
        self.send(AppAction::Session(SessionAction::Start)).await?;
        Ok(())
    }

    /// Dispatch a user intent against the current state.
    ///
    /// # Errors
    ///
    /// Returns an error if the app has been shut down.
    pub async fn dispatch(&self, intent: Intent) -> Result<(), AppError> {
        let action = self
            .store
            .state(|state| intent.into_action(state))
            .await;
        if let Some(action) = action {
            self.send(action).await?;
        }
        Ok(())
    }

    /// Send an action directly.
    ///
    /// # Errors
    ///
    /// Returns an error if the app has been shut down.
    pub async fn send(&self, action: AppAction) -> Result<EffectHandle, AppError> {
        Ok(self.store.send(action).await?)
    }

    /// Render the current state.
    pub async fn screen(&self) -> Screen {
        self.store.state(render).await
    }

    /// Read the current state.
    pub async fn state<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&AppState) -> T,
    {
        self.store.state(f).await
    }

    /// Receiver bumped after every state change.
    #[must_use]
    pub fn subscribe_changes(&self) -> watch::Receiver<u64> {
        self.store.subscribe_changes()
    }

    /// The underlying store.
    #[must_use]
    pub const fn store(&self) -> &AppStore {
        &self.store
    }

    /// Tear down every subscription and reject further intents.
    pub fn shutdown(&self) {
        self.store.shutdown();
    }
}
