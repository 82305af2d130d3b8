//! User bootstrap command.
//!
//! Creates accounts outside the web interface, typically the first
//! administrator of a fresh database.

use pharmacy_core::{DepartmentId, Role};
use pharmacy_web::db::DepartmentRepository;
use pharmacy_web::models::DepartmentFields;
use pharmacy_web::services::ServiceError;
use pharmacy_web::services::registry::Registry;
use pharmacy_web::services::users::{AccountRequest, UserAdmin};
use sqlx::PgPool;
use thiserror::Error;

use super::{CommandError, connect};

/// Errors that can occur while creating a user.
#[derive(Debug, Error)]
pub enum UserError {
    #[error(transparent)]
    Connect(#[from] CommandError),

    /// Invalid role.
    #[error("Invalid role: {0}. Valid roles: admin, pharmacist, department_staff")]
    InvalidRole(String),

    /// Rejected by validation or a uniqueness rule.
    #[error("{0}")]
    Rejected(String),

    /// Database failure.
    #[error("Database error: {0}")]
    Store(#[from] pharmacy_web::db::RepositoryError),
}

impl From<ServiceError> for UserError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Store(e) => Self::Store(e),
            other => Self::Rejected(other.to_string()),
        }
    }
}

/// Command-line input for a new account.
#[derive(Debug)]
pub struct NewAccount {
    pub username: String,
    pub full_name: String,
    pub password: String,
    pub role: String,
    pub email: Option<String>,
    pub department: Option<String>,
}

/// Create an active user.
///
/// # Errors
///
/// Returns an error for an invalid role, rejected input or a database failure.
pub async fn create(account: NewAccount) -> Result<(), UserError> {
    let role: Role = account
        .role
        .parse()
        .map_err(|_| UserError::InvalidRole(account.role.clone()))?;

    let pool = connect().await?;

    let department_id = match account.department.as_deref() {
        Some(name) => Some(find_or_create_department(&pool, name).await?),
        None => None,
    };

    tracing::info!("Creating user: {} ({})", account.username, role);
    let user = UserAdmin::new(&pool)
        .create(AccountRequest {
            username: account.username,
            password: account.password,
            full_name: account.full_name,
            email: account.email,
            department_id,
            role,
        })
        .await?;

    tracing::info!(
        "User created successfully! ID: {}, Username: {}, Role: {}",
        user.id,
        user.username,
        user.role
    );
    Ok(())
}

async fn find_or_create_department(pool: &PgPool, name: &str) -> Result<DepartmentId, UserError> {
    let existing = DepartmentRepository::new(pool)
        .list()
        .await?
        .into_iter()
        .find(|d| d.name.eq_ignore_ascii_case(name.trim()));
    if let Some(department) = existing {
        return Ok(department.id);
    }

    let department = Registry::new(pool)
        .create_department(DepartmentFields {
            name: name.to_string(),
            location: None,
            contact_person: None,
            contact_phone: None,
            is_active: true,
        })
        .await?;
    tracing::info!("Created department: {} ({})", department.name, department.id);
    Ok(department.id)
}
