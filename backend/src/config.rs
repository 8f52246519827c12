//! Backend project configuration.
//!
//! A static set of project identifiers embedded at initialization, plus
//! endpoint overrides so the REST backend can target a local emulator.

use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use thiserror::Error;

/// Default Identity Toolkit endpoint
pub const DEFAULT_AUTH_URL: &str = "https://identitytoolkit.googleapis.com/v1";
/// Default Secure Token endpoint
pub const DEFAULT_TOKEN_URL: &str = "https://securetoken.googleapis.com/v1";
/// Default Firestore endpoint
pub const DEFAULT_FIRESTORE_URL: &str = "https://firestore.googleapis.com/v1";
/// Default live-query polling interval
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Configuration errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required variable is absent or empty.
    #[error("Missing required configuration: {0}")]
    Missing(&'static str),

    /// A variable could not be parsed.
    #[error("Invalid value for {var}: {value}")]
    Invalid {
        /// Variable name
        var: &'static str,
        /// Rejected value
        value: String,
    },
}

/// Hosted project identifiers and endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Web API key (public identifier, not a secret)
    pub api_key: String,
    /// Auth domain, e.g. `my-project.firebaseapp.com`
    pub auth_domain: String,
    /// Project id
    pub project_id: String,
    /// Storage bucket
    pub storage_bucket: String,
    /// Messaging sender id
    pub messaging_sender_id: String,
    /// App id
    pub app_id: String,
    /// Analytics measurement id
    pub measurement_id: Option<String>,
    /// Identity Toolkit base URL
    pub auth_url: String,
    /// Secure Token base URL
    pub token_url: String,
    /// Firestore base URL
    pub firestore_url: String,
    /// How often the REST live query re-runs
    pub poll_interval: Duration,
}

impl BackendConfig {
    /// Configuration for `project_id` with the production endpoints.
    #[must_use]
    pub fn new(api_key: impl Into<String>, project_id: impl Into<String>) -> Self {
        let project_id = project_id.into();
        Self {
            api_key: api_key.into(),
            auth_domain: format!("{project_id}.firebaseapp.com"),
            storage_bucket: format!("{project_id}.firebasestorage.app"),
            project_id,
            messaging_sender_id: String::new(),
            app_id: String::new(),
            measurement_id: None,
            auth_url: DEFAULT_AUTH_URL.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            firestore_url: DEFAULT_FIRESTORE_URL.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Set the messaging sender id.
    #[must_use]
    pub fn with_messaging_sender_id(mut self, id: impl Into<String>) -> Self {
        self.messaging_sender_id = id.into();
        self
    }

    /// Set the app id.
    #[must_use]
    pub fn with_app_id(mut self, id: impl Into<String>) -> Self {
        self.app_id = id.into();
        self
    }

    /// Set the measurement id.
    #[must_use]
    pub fn with_measurement_id(mut self, id: impl Into<String>) -> Self {
        self.measurement_id = Some(id.into());
        self
    }

    /// Point auth, token and document endpoints at other hosts (emulators).
    #[must_use]
    pub fn with_endpoints(
        mut self,
        auth_url: impl Into<String>,
        token_url: impl Into<String>,
        firestore_url: impl Into<String>,
    ) -> Self {
        self.auth_url = auth_url.into();
        self.token_url = token_url.into();
        self.firestore_url = firestore_url.into();
        self
    }

    /// Set the live-query polling interval.
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Load from `FIREBASE_*` environment variables.
    ///
    /// # Errors
    ///
    /// See [`BackendConfig::from_lookup`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load from a variable lookup.
    ///
    /// Required: `FIREBASE_API_KEY`, `FIREBASE_PROJECT_ID`. Optional:
    /// `FIREBASE_AUTH_DOMAIN`, `FIREBASE_STORAGE_BUCKET`,
    /// `FIREBASE_MESSAGING_SENDER_ID`, `FIREBASE_APP_ID`,
    /// `FIREBASE_MEASUREMENT_ID`, `FIREBASE_AUTH_URL`, `FIREBASE_TOKEN_URL`,
    /// `FIRESTORE_URL`, `FIRESTORE_POLL_INTERVAL_MS`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] for an absent required variable and
    /// [`ConfigError::Invalid`] for an unparsable polling interval.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let required = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let mut config = Self::new(
            required("FIREBASE_API_KEY")?,
            required("FIREBASE_PROJECT_ID")?,
        );

        if let Some(domain) = get("FIREBASE_AUTH_DOMAIN") {
            config.auth_domain = domain;
        }
        if let Some(bucket) = get("FIREBASE_STORAGE_BUCKET") {
            config.storage_bucket = bucket;
        }
        if let Some(sender) = get("FIREBASE_MESSAGING_SENDER_ID") {
            config.messaging_sender_id = sender;
        }
        if let Some(app_id) = get("FIREBASE_APP_ID") {
            config.app_id = app_id;
        }
        config.measurement_id = get("FIREBASE_MEASUREMENT_ID");
        if let Some(url) = get("FIREBASE_AUTH_URL") {
            config.auth_url = url;
        }
        if let Some(url) = get("FIREBASE_TOKEN_URL") {
            config.token_url = url;
        }
        if let Some(url) = get("FIRESTORE_URL") {
            config.firestore_url = url;
        }
        if let Some(raw) = get("FIRESTORE_POLL_INTERVAL_MS") {
            let millis = raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|ms| *ms > 0)
                .ok_or(ConfigError::Invalid {
                    var: "FIRESTORE_POLL_INTERVAL_MS",
                    value: raw.clone(),
                })?;
            config.poll_interval = Duration::from_millis(millis);
        }

        Ok(config)
    }

    /// Check the identifiers the REST backend cannot work without.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] for an empty api key or project id.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_key.trim().is_empty() {
            return Err(ConfigError::Missing("FIREBASE_API_KEY"));
        }
        if self.project_id.trim().is_empty() {
            return Err(ConfigError::Missing("FIREBASE_PROJECT_ID"));
        }
        Ok(())
    }

    /// Resource path of the database's document root.
    #[must_use]
    pub fn documents_root(&self) -> String {
        format!("projects/{}/databases/(default)/documents", self.project_id)
    }
}
