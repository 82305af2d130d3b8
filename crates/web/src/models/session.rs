//! Session-related types for pharmacy authentication.

use serde::{Deserialize, Serialize};

use pharmacy_core::{DepartmentId, Role, UserId};

use super::user::User;

/// Session-stored user identity.
///
/// The role and department are refreshed from the database on every gated
/// request, so a stale copy here never grants access on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: UserId,
    pub username: String,
    pub full_name: String,
    pub role: Role,
    pub department_id: Option<DepartmentId>,
}

impl From<&User> for CurrentUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            full_name: user.full_name.clone(),
            role: user.role,
            department_id: user.department_id,
        }
    }
}

/// Session keys for pharmacy authentication data.
pub mod keys {
    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// Key for the per-session CSRF token.
    pub const CSRF_TOKEN: &str = "csrf_token";

    /// Key for the one-shot flash message shown after a redirect.
    pub const FLASH: &str = "flash";
}
