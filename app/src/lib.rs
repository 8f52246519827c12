//! # Firetodo App
//!
//! A single-session todo client over a hosted auth service and document
//! database, built as a set of reducer features:
//!
//! - [`session`]: current identity, fed by the auth service's identity stream
//! - [`login`]: email/password form issuing sign-in, sign-up and sign-out
//! - [`todos`]: live mirror of the signed-in user's todos plus mutations
//! - [`view`]: pure rendering of the whole state and user intents
//! - [`app`]: composition of the features and the [`TodoApp`] facade
//!
//! Control flow: identity stream → session → todo list live query → view →
//! intents → todo list mutations → backend → live query echo.

pub mod app;
pub mod config;
pub mod environment;
pub mod login;
pub mod session;
pub mod todos;
pub mod view;

pub use app::{AppAction, AppReducer, AppState, TodoApp};
pub use config::{AppConfig, AppError, BackendKind};
pub use environment::AppEnvironment;
pub use view::{Intent, Screen, render};
