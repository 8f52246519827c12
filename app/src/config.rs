//! App configuration and top-level errors.
//!
//! Loaded from environment variables with sensible defaults. Parsing goes
//! through a lookup function so tests never touch the process environment.

use firetodo_backend::{BackendClient, BackendConfig, BackendError, ConfigError};
use firetodo_core::environment::SystemClock;
use firetodo_runtime::StoreError;
use std::env;
use std::sync::Arc;
use thiserror::Error;

/// Errors surfaced by the app facade and the binary.
#[derive(Debug, Error)]
pub enum AppError {
    /// The store rejected an action.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The backend client could not be constructed.
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),
}

/// Which backend the app talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendKind {
    /// In-process backend (offline demo)
    #[default]
    Memory,
    /// Hosted project over REST
    Firebase,
}

/// App configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Selected backend (`FIRETODO_BACKEND`)
    pub backend: BackendKind,
    /// Fallback log filter when `RUST_LOG` is unset (`FIRETODO_LOG`)
    pub log_filter: String,
    /// Project configuration, present when the hosted backend is selected
    pub firebase: Option<BackendConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Memory,
            log_filter: "info".to_string(),
            firebase: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// See [`AppConfig::from_lookup`].
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from a variable lookup.
    ///
    /// `FIRETODO_BACKEND` is `memory` (default) or `firebase`; the latter also
    /// reads the `FIREBASE_*` project variables.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Config`] for an unknown backend or incomplete
    /// project configuration.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let backend = match lookup("FIRETODO_BACKEND").as_deref().map(str::trim) {
            None | Some("" | "memory") => BackendKind::Memory,
            Some("firebase") => BackendKind::Firebase,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    var: "FIRETODO_BACKEND",
                    value: other.to_string(),
                }
                .into());
            },
        };

        let firebase = match backend {
            BackendKind::Firebase => Some(BackendConfig::from_lookup(&lookup)?),
            BackendKind::Memory => None,
        };

        Ok(Self {
            backend,
            log_filter: lookup("FIRETODO_LOG")
                .filter(|filter| !filter.trim().is_empty())
                .unwrap_or_else(|| "info".to_string()),
            firebase,
        })
    }

    /// Construct the backend client this configuration selects.
    ///
    /// # Errors
    ///
    /// Returns an error if the hosted backend is selected without a usable
    /// project configuration.
    pub fn backend_client(&self) -> Result<BackendClient, AppError> {
        match (&self.backend, &self.firebase) {
            (BackendKind::Memory, _) => Ok(BackendClient::in_memory(Arc::new(SystemClock)).0),
            (BackendKind::Firebase, Some(config)) => Ok(BackendClient::firebase(config.clone())?),
            (BackendKind::Firebase, None) => {
                Err(ConfigError::Missing("FIREBASE_API_KEY").into())
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code can use unwrap
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_to_memory_backend() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, AppConfig::default());
        assert!(config.backend_client().is_ok());
    }

    #[test]
    fn firebase_backend_reads_project() {
        let config = AppConfig::from_lookup(lookup(&[
            ("FIRETODO_BACKEND", "firebase"),
            ("FIRETODO_LOG", "firetodo_app=debug"),
            ("FIREBASE_API_KEY", "key"),
            ("FIREBASE_PROJECT_ID", "todo-app"),
        ]))
        .unwrap();

        assert_eq!(config.backend, BackendKind::Firebase);
        assert_eq!(config.log_filter, "firetodo_app=debug");
        assert_eq!(
            config.firebase.map(|f| f.project_id),
            Some("todo-app".to_string())
        );
    }

    #[test]
    fn firebase_backend_requires_project() {
        let error = AppConfig::from_lookup(lookup(&[("FIRETODO_BACKEND", "firebase")])).unwrap_err();
        assert!(matches!(
            error,
            AppError::Config(ConfigError::Missing("FIREBASE_API_KEY"))
        ));
    }

    #[test]
    fn unknown_backend_is_rejected() {
        let error = AppConfig::from_lookup(lookup(&[("FIRETODO_BACKEND", "sqlite")])).unwrap_err();
        assert!(matches!(
            error,
            AppError::Config(ConfigError::Invalid { var: "FIRETODO_BACKEND", .. })
        ));
    }
}
