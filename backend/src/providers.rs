//! Provider traits for the hosted services.
//!
//! Both traits are dyn-compatible: async operations return boxed futures so
//! implementations can sit behind `Arc<dyn ..>` in the app environment.

use crate::error::Result;
use crate::model::{NewTodo, Snapshot, TodoId, TodoPatch, TodoQuery, User};
use crate::subscription::Subscription;
use std::future::Future;
use std::pin::Pin;

/// Boxed, sendable future returned by provider operations.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Authentication service.
///
/// # Contract
///
/// - `identity_changes()` yields the current identity first, then one value
///   per sign-in, sign-up or sign-out.
/// - A successful `sign_up` also signs the new user in.
/// - Errors carry the service's message verbatim.
pub trait AuthProvider: Send + Sync {
    /// Subscribe to identity changes.
    fn identity_changes(&self) -> Subscription<Option<User>>;

    /// The signed-in user, if any.
    fn current_user(&self) -> Option<User>;

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns the service's rejection (invalid credentials, network failure).
    fn sign_in<'a>(&'a self, email: &'a str, password: &'a str) -> BoxFuture<'a, Result<User>>;

    /// Register a new account and sign it in.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::EmailAlreadyInUse`](crate::BackendError::EmailAlreadyInUse)
    /// if the email is registered, or the service's policy rejection.
    fn sign_up<'a>(&'a self, email: &'a str, password: &'a str) -> BoxFuture<'a, Result<User>>;

    /// Sign out the current user.
    ///
    /// # Errors
    ///
    /// Returns an error if the service rejects the request.
    fn sign_out(&self) -> BoxFuture<'_, Result<()>>;
}

/// Document database, scoped to the todos collection.
///
/// # Contract
///
/// - `subscribe` fails if the query cannot be set up (e.g. permission denied);
///   afterwards the subscription re-delivers the full ordered result after
///   every relevant write. A later failure is delivered once as `Err`.
/// - Writes are authorized against the signed-in user.
pub trait DocumentStore: Send + Sync {
    /// Start a live query.
    ///
    /// # Errors
    ///
    /// Returns an error if the query is rejected or the service is unreachable.
    fn subscribe(&self, query: TodoQuery) -> BoxFuture<'_, Result<Subscription<Snapshot>>>;

    /// Create a document with a server-assigned creation timestamp.
    ///
    /// # Errors
    ///
    /// Returns an error if the write is rejected.
    fn create(&self, todo: NewTodo) -> BoxFuture<'_, Result<TodoId>>;

    /// Apply a partial update.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::NotFound`](crate::BackendError::NotFound) if the
    /// document does not exist, or the rejection of the write.
    fn update<'a>(&'a self, id: &'a TodoId, patch: TodoPatch) -> BoxFuture<'a, Result<()>>;

    /// Delete a document. Deleting a missing document succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the write is rejected.
    fn delete<'a>(&'a self, id: &'a TodoId) -> BoxFuture<'a, Result<()>>;

    /// Full resource path of a document, as it appears in service messages.
    fn document_path(&self, id: &TodoId) -> String;
}
