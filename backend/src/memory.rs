//! In-memory backend for tests and the offline demo.
//!
//! Implements both provider traits over shared state and enforces the hosted
//! project's security rules: a user may only read and write documents whose
//! `userId` is their own identity.

use crate::error::{BackendError, Result};
use crate::model::{NewTodo, Snapshot, Todo, TodoId, TodoPatch, TodoQuery, User};
use crate::providers::{AuthProvider, BoxFuture, DocumentStore};
use crate::subscription::Subscription;
use firetodo_core::environment::Clock;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use uuid::Uuid;

/// Minimum password length accepted on sign-up.
const MIN_PASSWORD_LEN: usize = 6;

/// Backend operations that can be made to fail with [`InMemoryBackend::fail_next`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    /// [`AuthProvider::sign_in`]
    SignIn,
    /// [`AuthProvider::sign_up`]
    SignUp,
    /// [`AuthProvider::sign_out`]
    SignOut,
    /// [`DocumentStore::subscribe`]
    Subscribe,
    /// [`DocumentStore::create`]
    Create,
    /// [`DocumentStore::update`]
    Update,
    /// [`DocumentStore::delete`]
    Delete,
}

#[derive(Debug)]
struct Account {
    user: User,
    password: String,
}

#[derive(Debug)]
struct LiveQuery {
    query: TodoQuery,
    sender: watch::Sender<Snapshot>,
}

#[derive(Debug, Default)]
struct State {
    accounts: HashMap<String, Account>,
    /// Documents in insertion order
    documents: Vec<Todo>,
    live_queries: Vec<LiveQuery>,
    failures: HashMap<Operation, BackendError>,
}

impl State {
    fn take_failure(&mut self, operation: Operation) -> Result<()> {
        self.failures.remove(&operation).map_or(Ok(()), Err)
    }

    /// Re-deliver every live query after a committed write.
    fn publish(&mut self) {
        self.live_queries.retain(|live| !live.sender.is_closed());
        for live in &self.live_queries {
            let todos = live.query.evaluate(&self.documents);
            live.sender.send_if_modified(|current| {
                if matches!(current, Ok(existing) if *existing == todos) {
                    false
                } else {
                    *current = Ok(todos);
                    true
                }
            });
        }
    }
}

/// In-memory auth service and document database.
///
/// # Example
///
/// ```ignore
/// let backend = Arc::new(InMemoryBackend::new(Arc::new(SystemClock)));
/// backend.sign_up("a@x.com", "secret1").await?;
/// let id = backend.create(NewTodo::new("Buy milk", user.uid)).await?;
/// ```
pub struct InMemoryBackend {
    project_id: String,
    clock: Arc<dyn Clock>,
    identity: watch::Sender<Option<User>>,
    state: Mutex<State>,
}

impl std::fmt::Debug for InMemoryBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryBackend")
            .field("project_id", &self.project_id)
            .field("current_user", &*self.identity.borrow())
            .finish_non_exhaustive()
    }
}

impl InMemoryBackend {
    /// Empty backend stamping server timestamps with `clock`.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        let (identity, _) = watch::channel(None);
        Self {
            project_id: "firetodo-local".to_string(),
            clock,
            identity,
            state: Mutex::new(State::default()),
        }
    }

    /// Use `project_id` in document paths of error messages.
    #[must_use]
    pub fn with_project_id(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = project_id.into();
        self
    }

    /// Make the next call of `operation` fail with `error`.
    ///
    /// The failure is consumed by that call; later calls behave normally.
    pub fn fail_next(&self, operation: Operation, error: BackendError) {
        self.lock().failures.insert(operation, error);
    }

    /// Deliver `error` to every open live query, as a listener failure does.
    pub fn fail_live_queries(&self, error: &BackendError) {
        let state = self.lock();
        for live in &state.live_queries {
            live.sender.send_replace(Err(error.clone()));
        }
        tracing::debug!(count = state.live_queries.len(), error = %error, "live queries failed");
    }

    /// Every stored document, in insertion order, regardless of owner.
    #[must_use]
    pub fn documents(&self) -> Vec<Todo> {
        self.lock().documents.clone()
    }

    /// Number of live queries still held by a subscriber.
    #[must_use]
    pub fn active_queries(&self) -> usize {
        self.lock()
            .live_queries
            .iter()
            .filter(|live| !live.sender.is_closed())
            .count()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn signed_in(&self) -> Result<User> {
        self.identity
            .borrow()
            .clone()
            .ok_or_else(BackendError::permission_denied)
    }

    fn sign_in_now(&self, email: &str, password: &str) -> Result<User> {
        let user = {
            let mut state = self.lock();
            state.take_failure(Operation::SignIn)?;
            match state.accounts.get(email) {
                Some(account) if account.password == password => account.user.clone(),
                _ => return Err(BackendError::invalid_credentials()),
            }
        };
        tracing::debug!(uid = %user.uid, "signed in");
        self.identity.send_replace(Some(user.clone()));
        Ok(user)
    }

    fn sign_up_now(&self, email: &str, password: &str) -> Result<User> {
        let user = {
            let mut state = self.lock();
            state.take_failure(Operation::SignUp)?;
            if !email.contains('@') {
                return Err(BackendError::auth("invalid-email"));
            }
            if state.accounts.contains_key(email) {
                return Err(BackendError::email_already_in_use());
            }
            if password.chars().count() < MIN_PASSWORD_LEN {
                return Err(BackendError::weak_password());
            }
            let user = User::new(Uuid::new_v4().simple().to_string(), email);
            state.accounts.insert(
                email.to_string(),
                Account {
                    user: user.clone(),
                    password: password.to_string(),
                },
            );
            user
        };
        tracing::debug!(uid = %user.uid, "account created");
        self.identity.send_replace(Some(user.clone()));
        Ok(user)
    }

    fn sign_out_now(&self) -> Result<()> {
        self.lock().take_failure(Operation::SignOut)?;
        self.identity.send_replace(None);
        tracing::debug!("signed out");
        Ok(())
    }

    fn subscribe_now(&self, query: TodoQuery) -> Result<Subscription<Snapshot>> {
        let mut state = self.lock();
        state.take_failure(Operation::Subscribe)?;
        let user = self.signed_in()?;
        if user.uid != query.owner {
            return Err(BackendError::permission_denied());
        }

        let (sender, receiver) = watch::channel(Ok(query.evaluate(&state.documents)));
        state.live_queries.push(LiveQuery { query, sender });
        tracing::debug!(uid = %user.uid, "live query started");
        Ok(Subscription::new(receiver))
    }

    fn create_now(&self, todo: NewTodo) -> Result<TodoId> {
        let mut state = self.lock();
        state.take_failure(Operation::Create)?;
        let user = self.signed_in()?;
        if user.uid != todo.owner {
            return Err(BackendError::permission_denied());
        }

        let id = TodoId::new(Uuid::new_v4().simple().to_string());
        state.documents.push(Todo {
            id: id.clone(),
            text: todo.text,
            completed: false,
            owner: todo.owner,
            created_at: Some(self.clock.now()),
            last_modified_at: None,
        });
        state.publish();
        tracing::debug!(%id, "document created");
        Ok(id)
    }

    fn update_now(&self, id: &TodoId, patch: TodoPatch) -> Result<()> {
        let mut state = self.lock();
        state.take_failure(Operation::Update)?;
        let user = self.signed_in()?;
        let Some(document) = state.documents.iter_mut().find(|todo| todo.id == *id) else {
            return Err(BackendError::no_document_to_update(&self.document_path(id)));
        };
        if document.owner != user.uid {
            return Err(BackendError::permission_denied());
        }

        if let Some(text) = patch.text {
            document.text = text;
        }
        if let Some(completed) = patch.completed {
            document.completed = completed;
        }
        if patch.last_modified.is_some() {
            document.last_modified_at = Some(self.clock.now());
        }
        state.publish();
        tracing::debug!(%id, "document updated");
        Ok(())
    }

    fn delete_now(&self, id: &TodoId) -> Result<()> {
        let mut state = self.lock();
        state.take_failure(Operation::Delete)?;
        let user = self.signed_in()?;
        let Some(index) = state.documents.iter().position(|todo| todo.id == *id) else {
            return Ok(());
        };
        if state.documents[index].owner != user.uid {
            return Err(BackendError::permission_denied());
        }

        state.documents.remove(index);
        state.publish();
        tracing::debug!(%id, "document deleted");
        Ok(())
    }
}

impl AuthProvider for InMemoryBackend {
    fn identity_changes(&self) -> Subscription<Option<User>> {
        Subscription::new(self.identity.subscribe())
    }

    fn current_user(&self) -> Option<User> {
        self.identity.borrow().clone()
    }

    fn sign_in<'a>(&'a self, email: &'a str, password: &'a str) -> BoxFuture<'a, Result<User>> {
        Box::pin(async move { self.sign_in_now(email, password) })
    }

    fn sign_up<'a>(&'a self, email: &'a str, password: &'a str) -> BoxFuture<'a, Result<User>> {
        Box::pin(async move { self.sign_up_now(email, password) })
    }

    fn sign_out(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move { self.sign_out_now() })
    }
}

impl DocumentStore for InMemoryBackend {
    fn subscribe(&self, query: TodoQuery) -> BoxFuture<'_, Result<Subscription<Snapshot>>> {
        Box::pin(async move { self.subscribe_now(query) })
    }

    fn create(&self, todo: NewTodo) -> BoxFuture<'_, Result<TodoId>> {
        Box::pin(async move { self.create_now(todo) })
    }

    fn update<'a>(&'a self, id: &'a TodoId, patch: TodoPatch) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move { self.update_now(id, patch) })
    }

    fn delete<'a>(&'a self, id: &'a TodoId) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move { self.delete_now(id) })
    }

    fn document_path(&self, id: &TodoId) -> String {
        format!(
            "projects/{}/databases/(default)/documents/{}/{id}",
            self.project_id,
            crate::model::TODOS_COLLECTION
        )
    }
}
