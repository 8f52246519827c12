//! Hosted backend over its REST endpoints.
//!
//! - Auth: Identity Toolkit password sign-in/sign-up, Secure Token refresh.
//! - Documents: Firestore `:commit` for writes and `:runQuery` for the live
//!   query, re-run on an interval and after every local write.

mod auth;
mod firestore;
pub mod wire;

use crate::config::BackendConfig;
use crate::error::{BackendError, Result};
use crate::model::{TodoId, User};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use tokio::sync::watch;

/// Signed-in session: identity plus tokens.
#[derive(Debug, Clone)]
struct AuthSession {
    user: User,
    id_token: String,
    refresh_token: String,
    expires_at: Instant,
}

struct Inner {
    config: BackendConfig,
    http: reqwest::Client,
    identity: watch::Sender<Option<User>>,
    session: Mutex<Option<AuthSession>>,
    /// Bumped after each committed write. Pollers keep a receiver, so a write
    /// that lands while a query is in flight is still seen on the next turn.
    writes: watch::Sender<u64>,
}

impl Inner {
    fn session(&self) -> MutexGuard<'_, Option<AuthSession>> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn documents_url(&self) -> String {
        format!(
            "{}/{}",
            self.config.firestore_url.trim_end_matches('/'),
            self.config.documents_root()
        )
    }

    fn write_committed(&self) {
        self.writes.send_modify(|count| *count = count.wrapping_add(1));
    }

    fn watch_writes(&self) -> watch::Receiver<u64> {
        self.writes.subscribe()
    }

    fn document_name(&self, id: &TodoId) -> String {
        format!(
            "{}/{}/{id}",
            self.config.documents_root(),
            crate::model::TODOS_COLLECTION
        )
    }
}

/// Auth service and document database of a hosted project.
///
/// Cloning shares the session and the HTTP connection pool.
#[derive(Clone)]
pub struct FirebaseBackend {
    inner: Arc<Inner>,
}

impl FirebaseBackend {
    /// Connect to the project described by `config`.
    ///
    /// No request is made until the first operation.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Internal`] if the configuration is incomplete or
    /// the HTTP client cannot be built.
    pub fn new(config: BackendConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| BackendError::Internal(e.to_string()))?;
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| BackendError::Internal(format!("Failed to build HTTP client: {e}")))?;
        let (identity, _) = watch::channel(None);
        let (writes, _) = watch::channel(0);

        tracing::info!(project_id = %config.project_id, "Firebase backend configured");
        Ok(Self {
            inner: Arc::new(Inner {
                config,
                http,
                identity,
                session: Mutex::new(None),
                writes,
            }),
        })
    }

    /// Project configuration.
    #[must_use]
    pub fn config(&self) -> &BackendConfig {
        &self.inner.config
    }
}

impl std::fmt::Debug for FirebaseBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FirebaseBackend")
            .field("project_id", &self.inner.config.project_id)
            .finish_non_exhaustive()
    }
}

/// Decode an Identity Toolkit error response.
async fn auth_error(response: reqwest::Response) -> BackendError {
    let status = response.status();
    match response.json::<wire::ErrorEnvelope>().await {
        Ok(envelope) => BackendError::from_identity_toolkit(&envelope.error.message),
        Err(_) => BackendError::Internal(format!("auth request failed with status {status}")),
    }
}

/// Decode a Firestore error response.
async fn firestore_error(response: reqwest::Response) -> BackendError {
    let status = response.status();
    match response.json::<wire::ErrorEnvelope>().await {
        Ok(envelope) => BackendError::from_firestore(
            envelope.error.status.as_deref().unwrap_or_default(),
            envelope.error.message,
        ),
        Err(_) => BackendError::Internal(format!("document request failed with status {status}")),
    }
}
