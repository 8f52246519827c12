//! The explicitly constructed backend handle injected into the app.

use crate::config::BackendConfig;
use crate::error::Result;
use crate::firebase::FirebaseBackend;
use crate::memory::InMemoryBackend;
use crate::providers::{AuthProvider, DocumentStore};
use firetodo_core::environment::Clock;
use std::sync::Arc;

/// Handles to the auth service and the document database.
///
/// Cheap to clone; read-only after construction and safe to share between
/// every subscription and mutation.
#[derive(Clone)]
pub struct BackendClient {
    auth: Arc<dyn AuthProvider>,
    documents: Arc<dyn DocumentStore>,
}

impl BackendClient {
    /// Combine separate providers.
    #[must_use]
    pub fn new(auth: Arc<dyn AuthProvider>, documents: Arc<dyn DocumentStore>) -> Self {
        Self { auth, documents }
    }

    /// Use one backend for both services.
    #[must_use]
    pub fn from_backend<B>(backend: Arc<B>) -> Self
    where
        B: AuthProvider + DocumentStore + 'static,
    {
        Self {
            auth: backend.clone(),
            documents: backend,
        }
    }

    /// Fresh in-memory backend. Returns the backend too, for seeding and
    /// fault injection.
    #[must_use]
    pub fn in_memory(clock: Arc<dyn Clock>) -> (Self, Arc<InMemoryBackend>) {
        let backend = Arc::new(InMemoryBackend::new(clock));
        (Self::from_backend(backend.clone()), backend)
    }

    /// Hosted project over its REST endpoints.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is incomplete or the HTTP client
    /// cannot be built.
    pub fn firebase(config: BackendConfig) -> Result<Self> {
        let backend = Arc::new(FirebaseBackend::new(config)?);
        Ok(Self::from_backend(backend))
    }

    /// Auth service.
    #[must_use]
    pub fn auth(&self) -> &dyn AuthProvider {
        self.auth.as_ref()
    }

    /// Document database.
    #[must_use]
    pub fn documents(&self) -> &dyn DocumentStore {
        self.documents.as_ref()
    }
}

impl std::fmt::Debug for BackendClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendClient").finish_non_exhaustive()
    }
}
