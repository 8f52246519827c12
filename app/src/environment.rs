//! Dependencies injected into every feature reducer.

use firetodo_backend::BackendClient;

/// Environment shared by the app's features.
///
/// The backend client is constructed once at startup and passed in here;
/// reducers never reach for a global handle.
#[derive(Clone, Debug)]
pub struct AppEnvironment {
    /// Auth service and document database
    pub backend: BackendClient,
}

impl AppEnvironment {
    /// Creates a new `AppEnvironment`
    #[must_use]
    pub const fn new(backend: BackendClient) -> Self {
        Self { backend }
    }
}
