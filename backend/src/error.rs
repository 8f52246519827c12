//! Error types for backend operations.
//!
//! Every variant carries the human-readable message produced by the hosted
//! service. `Display` prints that message verbatim so it can be shown to the
//! user unchanged.

use thiserror::Error;

/// Result type alias for backend operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Error taxonomy for the auth service and the document database.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BackendError {
    // ═══════════════════════════════════════════════════════════
    // Authentication Errors
    // ═══════════════════════════════════════════════════════════

    /// Wrong email or password.
    #[error("{0}")]
    InvalidCredentials(String),

    /// The email is already registered (conflict).
    #[error("{0}")]
    EmailAlreadyInUse(String),

    /// Password rejected by the service's strength policy.
    #[error("{0}")]
    WeakPassword(String),

    /// Email rejected by the service.
    #[error("{0}")]
    InvalidEmail(String),

    /// Any other auth-service rejection.
    #[error("{0}")]
    AuthRejected(String),

    // ═══════════════════════════════════════════════════════════
    // Document Errors
    // ═══════════════════════════════════════════════════════════

    /// The referenced document does not exist.
    #[error("{0}")]
    NotFound(String),

    /// Security rules rejected the read or write.
    #[error("{0}")]
    PermissionDenied(String),

    /// The request carried no valid credentials.
    #[error("{0}")]
    Unauthenticated(String),

    /// Any other rejected write or query.
    #[error("{0}")]
    Rejected(String),

    // ═══════════════════════════════════════════════════════════
    // System Errors
    // ═══════════════════════════════════════════════════════════

    /// The service could not be reached.
    #[error("{0}")]
    Network(String),

    /// Unexpected response or client-side failure.
    #[error("Internal error: {0}")]
    Internal(String),
}

const WEAK_PASSWORD_MESSAGE: &str =
    "Firebase: Password should be at least 6 characters (auth/weak-password).";

impl BackendError {
    /// Build the error for an auth error code such as `email-already-in-use`.
    ///
    /// The message follows the hosted SDK: `Firebase: Error (auth/<code>).`
    #[must_use]
    pub fn auth(code: &str) -> Self {
        let message = format!("Firebase: Error (auth/{code}).");
        match code {
            "invalid-credential" | "wrong-password" | "user-not-found" => {
                Self::InvalidCredentials(message)
            },
            "email-already-in-use" => Self::EmailAlreadyInUse(message),
            "weak-password" => Self::WeakPassword(WEAK_PASSWORD_MESSAGE.to_string()),
            "invalid-email" => Self::InvalidEmail(message),
            "network-request-failed" => Self::Network(message),
            _ => Self::AuthRejected(message),
        }
    }

    /// Wrong email or password.
    #[must_use]
    pub fn invalid_credentials() -> Self {
        Self::auth("invalid-credential")
    }

    /// Email already registered.
    #[must_use]
    pub fn email_already_in_use() -> Self {
        Self::auth("email-already-in-use")
    }

    /// Password shorter than the service minimum.
    #[must_use]
    pub fn weak_password() -> Self {
        Self::auth("weak-password")
    }

    /// Security rules rejected the operation.
    #[must_use]
    pub fn permission_denied() -> Self {
        Self::PermissionDenied("Missing or insufficient permissions.".to_string())
    }

    /// Update of a document that does not exist.
    #[must_use]
    pub fn no_document_to_update(path: &str) -> Self {
        Self::NotFound(format!("No document to update: {path}"))
    }

    /// Map an Identity Toolkit REST error message (e.g. `EMAIL_EXISTS`,
    /// `WEAK_PASSWORD : Password should be at least 6 characters`).
    #[must_use]
    pub fn from_identity_toolkit(message: &str) -> Self {
        let code = message
            .split([' ', ':'])
            .next()
            .unwrap_or_default();
        match code {
            "EMAIL_EXISTS" => Self::auth("email-already-in-use"),
            "INVALID_LOGIN_CREDENTIALS" => Self::auth("invalid-credential"),
            "EMAIL_NOT_FOUND" => Self::auth("user-not-found"),
            "INVALID_PASSWORD" => Self::auth("wrong-password"),
            "WEAK_PASSWORD" => Self::auth("weak-password"),
            "INVALID_EMAIL" => Self::auth("invalid-email"),
            "MISSING_PASSWORD" => Self::auth("missing-password"),
            "USER_DISABLED" => Self::auth("user-disabled"),
            "TOO_MANY_ATTEMPTS_TRY_LATER" => Self::auth("too-many-requests"),
            "OPERATION_NOT_ALLOWED" => Self::auth("operation-not-allowed"),
            "TOKEN_EXPIRED" | "INVALID_REFRESH_TOKEN" | "USER_NOT_FOUND" => {
                Self::auth("user-token-expired")
            },
            _ => Self::AuthRejected(format!("Firebase: {message}")),
        }
    }

    /// Map a Firestore REST error (`status` such as `NOT_FOUND`).
    #[must_use]
    pub fn from_firestore(status: &str, message: String) -> Self {
        match status {
            "NOT_FOUND" => Self::NotFound(message),
            "PERMISSION_DENIED" => Self::PermissionDenied(message),
            "UNAUTHENTICATED" => Self::Unauthenticated(message),
            "UNAVAILABLE" => Self::Network(message),
            _ => Self::Rejected(message),
        }
    }

    /// Returns `true` for the "conflict" class (email already registered).
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::EmailAlreadyInUse(_))
    }

    /// Returns `true` if the auth service produced this error.
    #[must_use]
    pub const fn is_auth_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidCredentials(_)
                | Self::EmailAlreadyInUse(_)
                | Self::WeakPassword(_)
                | Self::InvalidEmail(_)
                | Self::AuthRejected(_)
        )
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            Self::Internal(error.to_string())
        } else {
            Self::Network(error.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_message_matches_sdk_format() {
        let error = BackendError::email_already_in_use();
        assert_eq!(
            error.to_string(),
            "Firebase: Error (auth/email-already-in-use)."
        );
        assert!(error.is_conflict());
        assert!(error.is_auth_error());
    }

    #[test]
    fn identity_toolkit_codes_are_classified() {
        assert!(matches!(
            BackendError::from_identity_toolkit("EMAIL_EXISTS"),
            BackendError::EmailAlreadyInUse(_)
        ));
        assert!(matches!(
            BackendError::from_identity_toolkit("INVALID_LOGIN_CREDENTIALS"),
            BackendError::InvalidCredentials(_)
        ));
        assert_eq!(
            BackendError::from_identity_toolkit(
                "WEAK_PASSWORD : Password should be at least 6 characters"
            )
            .to_string(),
            WEAK_PASSWORD_MESSAGE
        );
    }

    #[test]
    fn unknown_identity_toolkit_code_keeps_message() {
        let error = BackendError::from_identity_toolkit("SOMETHING_NEW");
        assert_eq!(error.to_string(), "Firebase: SOMETHING_NEW");
        assert!(!error.is_conflict());
    }

    #[test]
    fn firestore_status_mapping() {
        let error = BackendError::from_firestore("NOT_FOUND", "No document to update: x".into());
        assert_eq!(error, BackendError::NotFound("No document to update: x".into()));
        assert!(matches!(
            BackendError::from_firestore("PERMISSION_DENIED", "denied".into()),
            BackendError::PermissionDenied(_)
        ));
        assert!(matches!(
            BackendError::from_firestore("FAILED_PRECONDITION", "index".into()),
            BackendError::Rejected(_)
        ));
    }
}
