//! Error type shared by the ledger and registry services.

use thiserror::Error;

use crate::db::RepositoryError;

/// Shown when a concurrent request created the same row first.
pub const CONCURRENT_UPDATE: &str = "Another user changed this record at the same time. Please retry.";

/// Shown in place of store failures.
const GENERIC_FAILURE: &str = "Something went wrong while saving. Please try again.";

/// Errors raised by ledger and registry operations.
///
/// Every variant except `Store` carries text that is safe to show the user.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Malformed or out-of-range input.
    #[error("{0}")]
    Validation(String),

    /// Business rule violated by the current state.
    #[error("{0}")]
    Conflict(String),

    /// Referenced record does not exist.
    #[error("{0}")]
    NotFound(String),

    /// Persistence failure.
    #[error("store error: {0}")]
    Store(#[source] RepositoryError),
}

impl ServiceError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub(crate) fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Text to show the user.
    ///
    /// Store failures are logged and sent to Sentry here, and the user sees a
    /// generic message instead of the underlying error.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(msg) | Self::Conflict(msg) | Self::NotFound(msg) => msg.clone(),
            Self::Store(_) => {
                let event_id = sentry::capture_error(self);
                tracing::error!(error = %self, sentry_event_id = %event_id, "Store failure");
                GENERIC_FAILURE.to_string()
            }
        }
    }
}

impl From<RepositoryError> for ServiceError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Conflict(msg) => Self::Conflict(msg),
            RepositoryError::NotFound => Self::NotFound("Record not found.".to_string()),
            RepositoryError::Database(e) => e.into(),
            other @ RepositoryError::DataCorruption(_) => Self::Store(other),
        }
    }
}

impl From<sqlx::Error> for ServiceError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = err
            && db_err.is_unique_violation()
        {
            return Self::Conflict(CONCURRENT_UPDATE.to_string());
        }
        Self::Store(RepositoryError::Database(err))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_user_facing_variants_pass_message_through() {
        let err = ServiceError::conflict("Not enough stock for transfer.");
        assert_eq!(err.user_message(), "Not enough stock for transfer.");

        let err = ServiceError::validation("Transfer quantity must be positive.");
        assert_eq!(err.to_string(), "Transfer quantity must be positive.");
    }

    #[test]
    fn test_store_error_hides_details() {
        let err = ServiceError::from(RepositoryError::DataCorruption("bad row".to_string()));
        assert!(matches!(err, ServiceError::Store(_)));
        assert_eq!(err.user_message(), GENERIC_FAILURE);
    }

    #[test]
    fn test_repository_conflict_and_not_found_map_through() {
        let err = ServiceError::from(RepositoryError::Conflict("Drug already exists.".to_string()));
        assert!(matches!(err, ServiceError::Conflict(ref m) if m == "Drug already exists."));

        let err = ServiceError::from(RepositoryError::NotFound);
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[test]
    fn test_plain_sqlx_error_is_store() {
        let err = ServiceError::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, ServiceError::Store(_)));
    }
}
