//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Wrong username or password, or the account is inactive.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Password too weak or invalid.
    #[error("{0}")]
    WeakPassword(String),

    /// New password and confirmation differ.
    #[error("passwords do not match")]
    PasswordMismatch,

    /// Reset token unknown or expired.
    #[error("invalid or expired reset token")]
    InvalidResetToken,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}

impl AuthError {
    /// Text to show on the form that failed.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidCredentials => "Invalid username or password.".to_string(),
            Self::WeakPassword(msg) => msg.clone(),
            Self::PasswordMismatch => "New passwords do not match.".to_string(),
            Self::InvalidResetToken => {
                "Invalid or expired reset link. Please request a new one.".to_string()
            }
            Self::Repository(_) | Self::PasswordHash => {
                let event_id = sentry::capture_error(self);
                tracing::error!(error = %self, sentry_event_id = %event_id, "Auth failure");
                "Something went wrong. Please try again.".to_string()
            }
        }
    }
}
