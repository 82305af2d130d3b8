//! User administration route handlers (admin only).

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    response::Redirect,
};
use serde::Deserialize;
use tracing::instrument;

use pharmacy_core::{DepartmentId, Page, Role, UserId};

use crate::db::{DepartmentRepository, UserRepository};
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::{Authorized, area, verify_csrf};
use crate::models::{Department, User, UserListing};
use crate::routes::page::{self, CsrfForm, Done, Layout, checked, conclude};
use crate::services::ServiceError;
use crate::services::auth::MIN_PASSWORD_LENGTH;
use crate::services::users::{AccountRequest, ProfileRequest, UserAdmin};
use crate::state::AppState;

const USERS: &str = "/users";

// =============================================================================
// Form Types
// =============================================================================

/// New user form data.
#[derive(Debug, Deserialize)]
pub struct CreateUserForm {
    pub csrf_token: String,
    pub username: String,
    pub password: String,
    pub full_name: String,
    pub email: Option<String>,
    #[serde(default)]
    pub department_id: String,
    pub role: String,
}

impl CreateUserForm {
    fn request(&self) -> std::result::Result<AccountRequest, ServiceError> {
        Ok(AccountRequest {
            username: self.username.clone(),
            password: self.password.clone(),
            full_name: self.full_name.clone(),
            email: self.email.clone(),
            department_id: page::optional_id::<DepartmentId>(&self.department_id, "department")?,
            role: parse_role(&self.role)?,
        })
    }
}

/// Edit user form data.
#[derive(Debug, Deserialize)]
pub struct UpdateUserForm {
    pub csrf_token: String,
    pub full_name: String,
    pub email: Option<String>,
    #[serde(default)]
    pub department_id: String,
    pub role: String,
    pub is_active: Option<String>,
}

impl UpdateUserForm {
    fn request(&self) -> std::result::Result<ProfileRequest, ServiceError> {
        Ok(ProfileRequest {
            full_name: self.full_name.clone(),
            email: self.email.clone(),
            department_id: page::optional_id::<DepartmentId>(&self.department_id, "department")?,
            role: parse_role(&self.role)?,
            is_active: checked(self.is_active.as_ref()),
        })
    }
}

/// Admin password reset form data.
#[derive(Debug, Deserialize)]
pub struct SetPasswordForm {
    pub csrf_token: String,
    pub password: String,
}

fn parse_role(raw: &str) -> std::result::Result<Role, ServiceError> {
    raw.parse()
        .map_err(|_| ServiceError::validation("Invalid role."))
}

// =============================================================================
// Templates
// =============================================================================

/// Users page template.
#[derive(Template, WebTemplate)]
#[template(path = "users/index.html")]
pub struct UsersTemplate {
    pub layout: Layout,
    pub users: Vec<UserListing>,
    pub departments: Vec<Department>,
    pub roles: [Role; 3],
    pub min_length: usize,
}

/// User edit page template.
#[derive(Template, WebTemplate)]
#[template(path = "users/edit.html")]
pub struct UserEditTemplate {
    pub layout: Layout,
    pub user: User,
    pub departments: Vec<Department>,
    pub roles: [Role; 3],
    pub min_length: usize,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
impl UserEditTemplate {
    fn in_department(&self, department: &DepartmentId) -> bool {
        self.user.department_id == Some(*department)
    }

    fn is_self(&self) -> bool {
        self.user.id == self.layout.user.id
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// List users.
#[instrument(skip_all)]
pub async fn index(
    State(state): State<AppState>,
    auth: Authorized<area::Users>,
) -> Result<UsersTemplate> {
    Ok(UsersTemplate {
        layout: Layout::new(&auth, Page::Users, "Users").await?,
        users: UserRepository::new(state.pool()).list().await?,
        departments: DepartmentRepository::new(state.pool()).list_active().await?,
        roles: Role::ALL,
        min_length: MIN_PASSWORD_LENGTH,
    })
}

/// Show the edit form for one user.
pub async fn edit(
    State(state): State<AppState>,
    auth: Authorized<area::Users>,
    Path(id): Path<UserId>,
) -> Result<UserEditTemplate> {
    let user = UserRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("user {id}")))?;

    Ok(UserEditTemplate {
        layout: Layout::new(&auth, Page::Users, "Edit User").await?,
        user,
        departments: DepartmentRepository::new(state.pool()).list_active().await?,
        roles: Role::ALL,
        min_length: MIN_PASSWORD_LENGTH,
    })
}

/// Create a user.
#[instrument(skip_all, fields(user = %auth.user.username))]
pub async fn create(
    State(state): State<AppState>,
    auth: Authorized<area::Users>,
    Form(form): Form<CreateUserForm>,
) -> Result<Redirect> {
    verify_csrf(&auth.session, &form.csrf_token).await?;
    let outcome = create_user(&state, &form).await;
    Ok(conclude(&state, &auth, outcome, USERS, USERS).await)
}

async fn create_user(
    state: &AppState,
    form: &CreateUserForm,
) -> std::result::Result<Done, ServiceError> {
    let user = UserAdmin::new(state.pool()).create(form.request()?).await?;
    Ok(Done::new(
        "user_create",
        format!("user {} ({}, {})", user.id, user.username, user.role),
        "User added successfully.",
    ))
}

/// Update a user's profile, role and status.
#[instrument(skip_all, fields(user = %auth.user.username, target_id = %id))]
pub async fn update(
    State(state): State<AppState>,
    auth: Authorized<area::Users>,
    Path(id): Path<UserId>,
    Form(form): Form<UpdateUserForm>,
) -> Result<Redirect> {
    verify_csrf(&auth.session, &form.csrf_token).await?;
    let outcome = update_user(&state, auth.user.id, id, &form).await;
    let back = format!("/users/{id}");
    Ok(conclude(&state, &auth, outcome, USERS, &back).await)
}

async fn update_user(
    state: &AppState,
    actor: UserId,
    id: UserId,
    form: &UpdateUserForm,
) -> std::result::Result<Done, ServiceError> {
    let user = UserAdmin::new(state.pool())
        .update(actor, id, form.request()?)
        .await?;
    Ok(Done::new(
        "user_update",
        format!(
            "user {} ({}, {}, active: {})",
            user.id, user.username, user.role, user.is_active
        ),
        "User updated successfully.",
    ))
}

/// Set a new password for a user.
#[instrument(skip_all, fields(user = %auth.user.username, target_id = %id))]
pub async fn set_password(
    State(state): State<AppState>,
    auth: Authorized<area::Users>,
    Path(id): Path<UserId>,
    Form(form): Form<SetPasswordForm>,
) -> Result<Redirect> {
    verify_csrf(&auth.session, &form.csrf_token).await?;
    let outcome = UserAdmin::new(state.pool())
        .reset_password(id, &form.password)
        .await
        .map(|()| {
            Done::new(
                "user_password_reset",
                format!("user {id}"),
                "Password reset successfully.",
            )
        });
    let back = format!("/users/{id}");
    Ok(conclude(&state, &auth, outcome, &back, &back).await)
}

/// Deactivate a user.
#[instrument(skip_all, fields(user = %auth.user.username, target_id = %id))]
pub async fn delete(
    State(state): State<AppState>,
    auth: Authorized<area::Users>,
    Path(id): Path<UserId>,
    Form(form): Form<CsrfForm>,
) -> Result<Redirect> {
    verify_csrf(&auth.session, &form.csrf_token).await?;
    let outcome = UserAdmin::new(state.pool())
        .deactivate(auth.user.id, id)
        .await
        .map(|()| {
            Done::new(
                "user_delete",
                format!("user {id}"),
                "User deactivated successfully.",
            )
        });
    Ok(conclude(&state, &auth, outcome, USERS, USERS).await)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn department(id: i32, name: &str) -> Department {
        Department {
            id: DepartmentId::new(id),
            name: name.to_string(),
            location: None,
            contact_person: None,
            contact_phone: None,
            is_active: true,
        }
    }

    #[test]
    fn test_edit_page_selects_user_department() {
        let page = UserEditTemplate {
            layout: Layout::sample(Page::Users, "Edit User"),
            user: User {
                id: UserId::new(5),
                username: "ward.nurse".to_string(),
                full_name: "Ward Nurse".to_string(),
                email: None,
                department_id: Some(DepartmentId::new(3)),
                role: Role::DepartmentStaff,
                is_active: true,
                last_login: None,
                created_at: Utc::now(),
            },
            departments: vec![department(1, "Pharmacy"), department(3, "Ward A")],
            roles: Role::ALL,
            min_length: MIN_PASSWORD_LENGTH,
        };

        let html = page.render().unwrap();
        assert!(html.contains(r#"<option value="3" selected>Ward A</option>"#));
        assert!(html.contains(r#"<option value="1">Pharmacy</option>"#));
        assert!(html.contains(r#"name="is_active" value="on" checked"#));
    }
}
