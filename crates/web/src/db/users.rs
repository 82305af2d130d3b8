//! User repository for database operations.
//!
//! Password hashes never leave this module except through the explicit
//! credential lookups used by the auth service.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use pharmacy_core::{DepartmentId, Email, Role, UserId};

use super::{RepositoryError, conflict_on_unique};
use crate::models::{NewUser, User, UserListing, UserUpdate};

/// Shown when a username is already registered.
pub const DUPLICATE_USERNAME: &str = "Username already exists.";

const USER_COLUMNS: &str = r"
    u.user_id, u.username, u.full_name, u.email, u.department_id, u.role,
    u.is_active, u.last_login, u.created_at
";

// =============================================================================
// Internal Row Types
// =============================================================================

/// Internal row type for user queries.
#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    user_id: UserId,
    username: String,
    full_name: String,
    email: Option<String>,
    department_id: Option<DepartmentId>,
    role: Role,
    is_active: bool,
    last_login: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let email = row
            .email
            .as_deref()
            .map(Email::parse)
            .transpose()
            .map_err(|e| {
                RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
            })?;

        Ok(Self {
            id: row.user_id,
            username: row.username,
            full_name: row.full_name,
            email,
            department_id: row.department_id,
            role: row.role,
            is_active: row.is_active,
            last_login: row.last_login,
            created_at: row.created_at,
        })
    }
}

/// User row joined with the department name.
#[derive(Debug, sqlx::FromRow)]
struct UserListingRow {
    #[sqlx(flatten)]
    user: UserRow,
    department_name: Option<String>,
}

/// User row with the stored password hash.
#[derive(Debug, sqlx::FromRow)]
struct CredentialRow {
    #[sqlx(flatten)]
    user: UserRow,
    password_hash: String,
}

/// User row with the reset token expiry.
#[derive(Debug, sqlx::FromRow)]
struct ResetRow {
    #[sqlx(flatten)]
    user: UserRow,
    reset_expires: Option<DateTime<Utc>>,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List all users with their department names.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the data is invalid.
    pub async fn list(&self) -> Result<Vec<UserListing>, RepositoryError> {
        let rows = sqlx::query_as::<_, UserListingRow>(&format!(
            r"
            SELECT {USER_COLUMNS}, d.department_name
            FROM users u
            LEFT JOIN departments d ON d.department_id = u.department_id
            ORDER BY u.is_active DESC, u.full_name
            "
        ))
        .fetch_all(self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(UserListing {
                    user: row.user.try_into()?,
                    department_name: row.department_name,
                })
            })
            .collect()
    }

    /// Get a user by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the data is invalid.
    pub async fn get(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users u WHERE u.user_id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Get a user and their password hash by username.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the data is invalid.
    pub async fn get_credentials(
        &self,
        username: &str,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let row = sqlx::query_as::<_, CredentialRow>(&format!(
            "SELECT {USER_COLUMNS}, u.password_hash FROM users u WHERE u.username = $1"
        ))
        .bind(username)
        .fetch_optional(self.pool)
        .await?;

        row.map(|r| Ok((r.user.try_into()?, r.password_hash)))
            .transpose()
    }

    /// Get the stored password hash for a user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_password_hash(&self, id: UserId) -> Result<Option<String>, RepositoryError> {
        let hash: Option<String> =
            sqlx::query_scalar("SELECT password_hash FROM users WHERE user_id = $1")
                .bind(id)
                .fetch_optional(self.pool)
                .await?;

        Ok(hash)
    }

    /// Find an active user by email address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the data is invalid.
    pub async fn find_active_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r"
            SELECT {USER_COLUMNS} FROM users u
            WHERE lower(u.email) = $1 AND u.is_active
            ORDER BY u.user_id
            LIMIT 1
            "
        ))
        .bind(email.as_str())
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Create a user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the username is taken.
    pub async fn create(&self, user: &NewUser, password_hash: &str) -> Result<User, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(
            r"
            INSERT INTO users (username, password_hash, full_name, email, department_id, role, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING user_id, username, full_name, email, department_id, role,
                      is_active, last_login, created_at
            ",
        )
        .bind(&user.username)
        .bind(password_hash)
        .bind(&user.full_name)
        .bind(user.email.as_ref().map(Email::as_str))
        .bind(user.department_id)
        .bind(user.role)
        .bind(user.is_active)
        .fetch_one(self.pool)
        .await
        .map_err(conflict_on_unique(DUPLICATE_USERNAME))?;

        row.try_into()
    }

    /// Update a user's profile, role and status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    pub async fn update(&self, id: UserId, update: &UserUpdate) -> Result<User, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(
            r"
            UPDATE users
            SET full_name = $2, email = $3, department_id = $4, role = $5,
                is_active = $6, updated_at = NOW()
            WHERE user_id = $1
            RETURNING user_id, username, full_name, email, department_id, role,
                      is_active, last_login, created_at
            ",
        )
        .bind(id)
        .bind(&update.full_name)
        .bind(update.email.as_ref().map(Email::as_str))
        .bind(update.department_id)
        .bind(update.role)
        .bind(update.is_active)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        row.try_into()
    }

    /// Replace a user's password hash.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    pub async fn set_password(&self, id: UserId, password_hash: &str) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE users SET password_hash = $2, updated_at = NOW() WHERE user_id = $1",
        )
        .bind(id)
        .bind(password_hash)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Mark a user inactive.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    pub async fn deactivate(&self, id: UserId) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE users SET is_active = FALSE, updated_at = NOW() WHERE user_id = $1",
        )
        .bind(id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Stamp the last login time.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn record_login(&self, id: UserId) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE users SET last_login = NOW() WHERE user_id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(())
    }

    /// Store a password reset token.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn store_reset_token(
        &self,
        id: UserId,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE users SET reset_token = $2, reset_expires = $3 WHERE user_id = $1")
            .bind(id)
            .bind(token)
            .bind(expires_at)
            .execute(self.pool)
            .await?;

        Ok(())
    }

    /// Find the user holding a reset token, with the token's expiry.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the data is invalid.
    pub async fn find_by_reset_token(
        &self,
        token: &str,
    ) -> Result<Option<(User, Option<DateTime<Utc>>)>, RepositoryError> {
        let row = sqlx::query_as::<_, ResetRow>(&format!(
            "SELECT {USER_COLUMNS}, u.reset_expires FROM users u WHERE u.reset_token = $1"
        ))
        .bind(token)
        .fetch_optional(self.pool)
        .await?;

        row.map(|r| Ok((r.user.try_into()?, r.reset_expires)))
            .transpose()
    }

    /// Set a new password hash and clear any reset token.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    pub async fn complete_reset(&self, id: UserId, password_hash: &str) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE users
            SET password_hash = $2, reset_token = NULL, reset_expires = NULL, updated_at = NOW()
            WHERE user_id = $1
            ",
        )
        .bind(id)
        .bind(password_hash)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
