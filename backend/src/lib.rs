//! # Firetodo Backend
//!
//! The hosted backend, as the todo client sees it: an auth service and a
//! document database. Nothing here reimplements either service; this crate
//! only consumes them.
//!
//! ## Architecture
//!
//! Provider traits are **interfaces**, not implementations. Features depend on
//! [`BackendClient`], which holds trait objects constructed once at startup
//! and injected through the environment:
//!
//! ```text
//! ┌──────────────────┐        ┌───────────────────────┐
//! │ BackendClient    │───────▶│ AuthProvider          │  sign in / up / out,
//! │ (Arc<dyn ..>)    │        │                       │  identity changes
//! │                  │        └───────────────────────┘
//! │                  │        ┌───────────────────────┐
//! │                  │───────▶│ DocumentStore         │  live query, create,
//! └──────────────────┘        │                       │  update, delete
//!                             └───────────────────────┘
//!            implemented by: InMemoryBackend (tests, demo)
//!                            FirebaseBackend (REST)
//! ```
//!
//! Long-lived listeners are explicit [`Subscription`] objects: they expose the
//! current value, an on-change wait, and tear the producer down when dropped.

pub mod client;
pub mod config;
pub mod error;
pub mod firebase;
pub mod memory;
pub mod model;
pub mod providers;
pub mod subscription;

// Re-export main types for convenience
pub use client::BackendClient;
pub use config::{BackendConfig, ConfigError};
pub use error::{BackendError, Result};
pub use firebase::FirebaseBackend;
pub use memory::{InMemoryBackend, Operation};
pub use model::{
    NewTodo, ServerTimestamp, Snapshot, TODOS_COLLECTION, Todo, TodoId, TodoOrder, TodoPatch,
    TodoQuery, User, UserId,
};
pub use providers::{AuthProvider, BoxFuture, DocumentStore};
pub use subscription::Subscription;
