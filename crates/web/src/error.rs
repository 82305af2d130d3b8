//! Errors returned by page and API handlers.
//!
//! Ledger and registry rule violations never reach this type: handlers turn a
//! [`ServiceError`](crate::services::ServiceError) into a flash message and a
//! redirect. What is left is missing records, stale forms and server faults.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use pharmacy_core::UserId;

use crate::db::RepositoryError;

/// Handler failure, rendered as a plain-text response.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// A drug, batch, user or other record named in the URL does not exist.
    #[error("{0} was not found")]
    NotFound(String),

    /// The submitted form failed the CSRF check.
    #[error("{0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    /// Status code sent to the client.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
        }
    }

    const fn is_server_fault(&self) -> bool {
        matches!(self, Self::Database(_) | Self::Internal(_))
    }

    /// Text shown to the user. Server faults stay generic.
    #[must_use]
    pub fn public_message(&self) -> String {
        if self.is_server_fault() {
            "Something went wrong. Please try again.".to_string()
        } else {
            self.to_string()
        }
    }
}

impl From<askama::Error> for AppError {
    fn from(err: askama::Error) -> Self {
        Self::Internal(format!("template error: {err}"))
    }
}

impl From<tower_sessions::session::Error> for AppError {
    fn from(err: tower_sessions::session::Error) -> Self {
        Self::Internal(format!("session error: {err}"))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.is_server_fault() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(error = %self, sentry_event_id = %event_id, "Request failed");
        } else {
            tracing::debug!(error = %self, "Request refused");
        }

        (self.status(), self.public_message()).into_response()
    }
}

/// Tag Sentry events with the signed-in pharmacy user.
pub fn set_sentry_user(user_id: UserId, username: &str) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            username: Some(username.to_string()),
            ..Default::default()
        }));
    });
}

/// Drop the user tag on logout or session expiry.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_record_names_the_record() {
        let err = AppError::NotFound("drug 42".to_string());
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.public_message(), "drug 42 was not found");
    }

    #[test]
    fn test_stale_form_is_forbidden() {
        let err = AppError::Forbidden("Your form has expired.".to_string());
        assert_eq!(err.into_response().status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_server_faults_hide_details() {
        let db = AppError::Database(RepositoryError::DataCorruption("bad role 'x'".to_string()));
        assert_eq!(db.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!db.public_message().contains("bad role"));

        let internal = AppError::Internal("session error: store offline".to_string());
        assert_eq!(
            internal.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
