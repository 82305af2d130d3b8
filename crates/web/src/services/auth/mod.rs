//! Authentication service.
//!
//! Username and password login, password changes, and email-based password
//! resets. Passwords are stored as Argon2id PHC strings.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use sqlx::PgPool;
use tracing::instrument;

use pharmacy_core::{Email, UserId};

use crate::db::users::UserRepository;
use crate::models::User;

/// Minimum password length.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// A reset token issued to a user.
#[derive(Debug, Clone)]
pub struct PasswordReset {
    pub user: User,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Authentication service.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            users: UserRepository::new(pool),
        }
    }

    /// Login with username and password.
    ///
    /// Only active users may log in. Stamps `last_login` on success.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the username/password is
    /// wrong or the account is inactive.
    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> Result<User, AuthError> {
        let (user, password_hash) = self
            .users
            .get_credentials(username.trim())
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;
        if !user.is_active {
            return Err(AuthError::InvalidCredentials);
        }

        self.users.record_login(user.id).await?;
        Ok(user)
    }

    /// Change a user's own password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the current password is
    /// wrong, `WeakPassword` or `PasswordMismatch` for a bad new password.
    #[instrument(skip(self, current, new, confirm))]
    pub async fn change_password(
        &self,
        user_id: UserId,
        current: &str,
        new: &str,
        confirm: &str,
    ) -> Result<(), AuthError> {
        let stored = self
            .users
            .get_password_hash(user_id)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;
        verify_password(current, &stored)?;

        validate_new_password(new, confirm)?;
        let password_hash = hash_password(new)?;
        self.users.set_password(user_id, &password_hash).await?;
        Ok(())
    }

    /// Issue a reset token for the active user with this email.
    ///
    /// Returns `None` for unknown or malformed addresses; callers must
    /// respond identically in both cases.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` if the token cannot be stored.
    #[instrument(skip(self, email))]
    pub async fn start_password_reset(
        &self,
        email: &str,
        ttl: Duration,
    ) -> Result<Option<PasswordReset>, AuthError> {
        let Ok(email) = Email::parse(email) else {
            return Ok(None);
        };
        let Some(user) = self.users.find_active_by_email(&email).await? else {
            return Ok(None);
        };

        let token = generate_token();
        let expires_at = Utc::now() + ttl;
        self.users
            .store_reset_token(user.id, &token, expires_at)
            .await?;

        Ok(Some(PasswordReset {
            user,
            token,
            expires_at,
        }))
    }

    /// Whether a reset token is currently valid.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` if the lookup fails.
    pub async fn reset_token_is_valid(&self, token: &str) -> Result<bool, AuthError> {
        Ok(self.user_for_token(token).await?.is_some())
    }

    /// Set a new password using a reset token, then clear the token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidResetToken` for an unknown or expired token,
    /// `WeakPassword` or `PasswordMismatch` for a bad new password.
    #[instrument(skip_all)]
    pub async fn reset_password(
        &self,
        token: &str,
        new: &str,
        confirm: &str,
    ) -> Result<User, AuthError> {
        let user = self
            .user_for_token(token)
            .await?
            .ok_or(AuthError::InvalidResetToken)?;

        validate_new_password(new, confirm)?;
        let password_hash = hash_password(new)?;
        self.users.complete_reset(user.id, &password_hash).await?;
        Ok(user)
    }

    async fn user_for_token(&self, token: &str) -> Result<Option<User>, AuthError> {
        if token.is_empty() {
            return Ok(None);
        }
        let found = self.users.find_by_reset_token(token).await?;
        Ok(found.and_then(|(user, expires_at)| {
            let live = expires_at.is_some_and(|at| at > Utc::now());
            (live && user.is_active).then_some(user)
        }))
    }
}

/// Generate a random 64-character hex token.
#[must_use]
pub fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill(&mut bytes);
    hex::encode(bytes)
}

/// Validate password meets requirements.
///
/// # Errors
///
/// Returns `AuthError::WeakPassword` if the password is too short.
pub fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters long."
        )));
    }
    Ok(())
}

fn validate_new_password(new: &str, confirm: &str) -> Result<(), AuthError> {
    validate_password(new)?;
    if new != confirm {
        return Err(AuthError::PasswordMismatch);
    }
    Ok(())
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify_round_trip() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("correct horse", &hash).is_ok());
        assert!(matches!(
            verify_password("wrong horse", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_verify_rejects_garbage_hash() {
        assert!(matches!(
            verify_password("anything", "not-a-phc-string"),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_password_rules() {
        assert!(matches!(
            validate_password("short"),
            Err(AuthError::WeakPassword(_))
        ));
        assert!(validate_password("eightchr").is_ok());
        assert!(matches!(
            validate_new_password("longenough", "different1"),
            Err(AuthError::PasswordMismatch)
        ));
        assert!(validate_new_password("longenough", "longenough").is_ok());
    }

    #[test]
    fn test_generate_token_format() {
        let token = generate_token();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(token, generate_token());
    }
}
