//! Domain model shared by every backend implementation.

use crate::error::BackendError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Collection holding every todo document.
pub const TODOS_COLLECTION: &str = "todos";

/// Result of one live-query delivery.
///
/// A subscription that fails after setup delivers an `Err` once and stops.
pub type Snapshot = Result<Vec<Todo>, BackendError>;

/// Opaque identity of an authenticated user, stable across sessions.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Wrap a backend-assigned user id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw id.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// An authenticated user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Backend-assigned identity
    pub uid: UserId,
    /// Email the account was registered with
    pub email: String,
}

impl User {
    /// Create a user.
    #[must_use]
    pub fn new(uid: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            uid: UserId::new(uid),
            email: email.into(),
        }
    }
}

/// Opaque document id assigned by the backend.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TodoId(String);

impl TodoId {
    /// Wrap a document id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw id.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TodoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TodoId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// A todo document as delivered by a live query.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Todo {
    /// Document id
    pub id: TodoId,
    /// Text as stored
    pub text: String,
    /// Completion flag
    pub completed: bool,
    /// User who created the document
    pub owner: UserId,
    /// Server creation time; `None` while the server timestamp is pending
    pub created_at: Option<DateTime<Utc>>,
    /// Server time of the last text edit
    pub last_modified_at: Option<DateTime<Utc>>,
}

/// Fields of a document to create. New todos always start incomplete.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewTodo {
    /// Text as typed
    pub text: String,
    /// Creating user
    pub owner: UserId,
}

impl NewTodo {
    /// Todo owned by `owner`.
    #[must_use]
    pub fn new(text: impl Into<String>, owner: UserId) -> Self {
        Self {
            text: text.into(),
            owner,
        }
    }
}

/// Sentinel resolved to the server's clock when the write commits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ServerTimestamp;

/// Partial update of a todo document. `None` fields are left untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TodoPatch {
    /// New text
    pub text: Option<String>,
    /// New completion flag
    pub completed: Option<bool>,
    /// Stamp `lastModified` with the server time
    pub last_modified: Option<ServerTimestamp>,
}

impl TodoPatch {
    /// Set the completion flag.
    #[must_use]
    pub const fn completed(completed: bool) -> Self {
        Self {
            text: None,
            completed: Some(completed),
            last_modified: None,
        }
    }

    /// Replace the text and stamp the modification time.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            completed: None,
            last_modified: Some(ServerTimestamp),
        }
    }

    /// Returns `true` if the patch changes nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.text.is_none() && self.completed.is_none() && self.last_modified.is_none()
    }
}

/// Result ordering of a live query.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TodoOrder {
    /// Creation timestamp ascending; pending timestamps sort last, ties keep
    /// insertion order.
    #[default]
    CreatedAscending,
}

/// Live query over the todos collection.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TodoQuery {
    /// Only documents whose `userId` equals this identity
    pub owner: UserId,
    /// Result ordering
    pub order: TodoOrder,
}

impl TodoQuery {
    /// All todos owned by `owner`, oldest first.
    #[must_use]
    pub fn owned_by(owner: UserId) -> Self {
        Self {
            owner,
            order: TodoOrder::CreatedAscending,
        }
    }

    /// Returns `true` if `todo` belongs in the result set.
    #[must_use]
    pub fn matches(&self, todo: &Todo) -> bool {
        todo.owner == self.owner
    }

    /// Sort `todos` by the query ordering. The sort is stable.
    pub fn sort(&self, todos: &mut [Todo]) {
        match self.order {
            TodoOrder::CreatedAscending => {
                todos.sort_by_key(|todo| (todo.created_at.is_none(), todo.created_at));
            },
        }
    }

    /// Filter and order `documents` as the backend would deliver them.
    #[must_use]
    pub fn evaluate<'a>(&self, documents: impl IntoIterator<Item = &'a Todo>) -> Vec<Todo> {
        let mut todos: Vec<Todo> = documents
            .into_iter()
            .filter(|todo| self.matches(todo))
            .cloned()
            .collect();
        self.sort(&mut todos);
        todos
    }
}
