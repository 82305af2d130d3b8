//! Account administration for the users screen.

use sqlx::PgPool;
use tracing::instrument;

use pharmacy_core::{DepartmentId, Email, Role, UserId};

use crate::db::{DepartmentRepository, UserRepository};
use crate::models::{NewUser, User, UserUpdate};
use crate::services::ServiceError;
use crate::services::auth::{AuthError, hash_password, validate_password};
use crate::services::registry::optional;

/// Shown when an administrator tries to deactivate their own account.
pub const CANNOT_DEACTIVATE_SELF: &str = "You cannot delete your own account.";

/// Raw input for a new account.
#[derive(Debug, Clone)]
pub struct AccountRequest {
    pub username: String,
    pub password: String,
    pub full_name: String,
    pub email: Option<String>,
    pub department_id: Option<DepartmentId>,
    pub role: Role,
}

/// Raw input for a profile change.
#[derive(Debug, Clone)]
pub struct ProfileRequest {
    pub full_name: String,
    pub email: Option<String>,
    pub department_id: Option<DepartmentId>,
    pub role: Role,
    pub is_active: bool,
}

/// Admin-only operations on user accounts.
pub struct UserAdmin<'a> {
    pool: &'a PgPool,
}

impl<'a> UserAdmin<'a> {
    /// Create a user administration service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Create an active account.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for missing fields, a short password, a malformed
    /// email or an unknown department, and `Conflict` for a taken username.
    #[instrument(skip(self, request), fields(username = %request.username))]
    pub async fn create(&self, request: AccountRequest) -> Result<User, ServiceError> {
        let username = request.username.trim().to_string();
        if username.is_empty() {
            return Err(ServiceError::validation("Username is required."));
        }
        let full_name = required_name(&request.full_name)?;
        let email = parse_email(request.email)?;
        self.check_department(request.department_id).await?;

        validate_password(&request.password).map_err(password_error)?;
        let password_hash = hash_password(&request.password).map_err(password_error)?;

        let user = NewUser {
            username,
            full_name,
            email,
            department_id: request.department_id,
            role: request.role,
            is_active: true,
        };
        Ok(UserRepository::new(self.pool)
            .create(&user, &password_hash)
            .await?)
    }

    /// Update profile, role, department and status.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for bad input, `NotFound` for an unknown user and
    /// `Conflict` when an administrator deactivates themselves.
    #[instrument(skip(self, request))]
    pub async fn update(
        &self,
        actor: UserId,
        id: UserId,
        request: ProfileRequest,
    ) -> Result<User, ServiceError> {
        if actor == id && !request.is_active {
            return Err(ServiceError::conflict(CANNOT_DEACTIVATE_SELF));
        }
        let update = UserUpdate {
            full_name: required_name(&request.full_name)?,
            email: parse_email(request.email)?,
            department_id: request.department_id,
            role: request.role,
            is_active: request.is_active,
        };
        self.check_department(update.department_id).await?;

        Ok(UserRepository::new(self.pool).update(id, &update).await?)
    }

    /// Set a new password for another user.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for a short password and `NotFound` for an
    /// unknown user.
    #[instrument(skip(self, password))]
    pub async fn reset_password(&self, id: UserId, password: &str) -> Result<(), ServiceError> {
        validate_password(password).map_err(password_error)?;
        let password_hash = hash_password(password).map_err(password_error)?;
        UserRepository::new(self.pool)
            .set_password(id, &password_hash)
            .await?;
        Ok(())
    }

    /// Deactivate an account. Administrators cannot deactivate themselves.
    ///
    /// # Errors
    ///
    /// Returns `Conflict` for the acting user and `NotFound` for an unknown one.
    #[instrument(skip(self))]
    pub async fn deactivate(&self, actor: UserId, id: UserId) -> Result<(), ServiceError> {
        if actor == id {
            return Err(ServiceError::conflict(CANNOT_DEACTIVATE_SELF));
        }
        UserRepository::new(self.pool).deactivate(id).await?;
        Ok(())
    }

    async fn check_department(&self, id: Option<DepartmentId>) -> Result<(), ServiceError> {
        if let Some(id) = id
            && DepartmentRepository::new(self.pool).get(id).await?.is_none()
        {
            return Err(ServiceError::validation("Selected department does not exist."));
        }
        Ok(())
    }
}

fn required_name(value: &str) -> Result<String, ServiceError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ServiceError::validation("Full name is required."));
    }
    Ok(value.to_string())
}

fn parse_email(value: Option<String>) -> Result<Option<Email>, ServiceError> {
    optional(value)
        .map(|raw| Email::parse(&raw))
        .transpose()
        .map_err(|e| ServiceError::validation(format!("Invalid email: {e}.")))
}

fn password_error(err: AuthError) -> ServiceError {
    match err {
        AuthError::Repository(e) => e.into(),
        AuthError::WeakPassword(msg) => ServiceError::Validation(msg),
        other => ServiceError::Validation(other.user_message()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_email_is_optional_but_validated() {
        assert!(parse_email(None).unwrap().is_none());
        assert!(parse_email(Some("   ".to_string())).unwrap().is_none());
        assert_eq!(
            parse_email(Some("Nurse@Hospital.org".to_string()))
                .unwrap()
                .unwrap()
                .as_str(),
            "nurse@hospital.org"
        );
        assert!(matches!(
            parse_email(Some("nurse@".to_string())),
            Err(ServiceError::Validation(_))
        ));
    }

    #[test]
    fn test_weak_password_maps_to_validation() {
        let err = password_error(validate_password("short").unwrap_err());
        assert!(matches!(err, ServiceError::Validation(ref m) if m.contains("at least 8")));
    }

    #[test]
    fn test_full_name_required() {
        assert!(required_name("  ").is_err());
        assert_eq!(required_name(" Ada Obi ").unwrap(), "Ada Obi");
    }
}
