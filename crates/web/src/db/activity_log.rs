//! Audit trail of user actions.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use pharmacy_core::UserId;

use super::RepositoryError;

/// One recorded action, joined with the acting user's name.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ActivityEntry {
    pub user_name: Option<String>,
    pub action: String,
    pub details: Option<String>,
    pub ip_address: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Repository for the activity log.
pub struct ActivityLogRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ActivityLogRepository<'a> {
    /// Create a new activity log repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Append an entry.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn record(
        &self,
        user: Option<UserId>,
        action: &str,
        details: Option<&str>,
        ip_address: Option<&str>,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO activity_log (user_id, action, details, ip_address)
            VALUES ($1, $2, $3, $4)
            ",
        )
        .bind(user)
        .bind(action)
        .bind(details)
        .bind(ip_address)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Most recent entries, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn recent(&self, limit: i64) -> Result<Vec<ActivityEntry>, RepositoryError> {
        let entries = sqlx::query_as::<_, ActivityEntry>(
            r"
            SELECT u.full_name AS user_name, a.action, a.details, a.ip_address, a.created_at
            FROM activity_log a
            LEFT JOIN users u ON u.user_id = a.user_id
            ORDER BY a.created_at DESC, a.log_id DESC
            LIMIT $1
            ",
        )
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        Ok(entries)
    }
}
