//! Pharmacy user domain types.

use chrono::{DateTime, Utc};

use pharmacy_core::{DepartmentId, Email, Role, UserId};

/// A pharmacy user (without the password hash).
#[derive(Debug, Clone)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub full_name: String,
    pub email: Option<Email>,
    pub department_id: Option<DepartmentId>,
    pub role: Role,
    /// Inactive users cannot log in and are signed out on their next request.
    pub is_active: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// A user with their department name, for the users screen.
#[derive(Debug, Clone)]
pub struct UserListing {
    pub user: User,
    pub department_name: Option<String>,
}

/// Validated values for a new account.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub full_name: String,
    pub email: Option<Email>,
    pub department_id: Option<DepartmentId>,
    pub role: Role,
    pub is_active: bool,
}

/// Validated profile changes made by an administrator.
#[derive(Debug, Clone)]
pub struct UserUpdate {
    pub full_name: String,
    pub email: Option<Email>,
    pub department_id: Option<DepartmentId>,
    pub role: Role,
    pub is_active: bool,
}
