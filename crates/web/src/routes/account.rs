//! Change password for the logged-in user.

use askama::Template;
use askama_web::WebTemplate;
use axum::{Form, extract::State, response::Redirect};
use serde::Deserialize;
use tracing::instrument;

use pharmacy_core::Page;

use crate::error::Result;
use crate::filters;
use crate::middleware::{Authorized, Flash, area, set_flash, verify_csrf};
use crate::routes::page::{Layout, record_activity};
use crate::services::auth::{AuthError, AuthService, MIN_PASSWORD_LENGTH};
use crate::state::AppState;

/// Change password form data.
#[derive(Debug, Deserialize)]
pub struct ChangePasswordForm {
    pub csrf_token: String,
    pub current_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

/// Change password page template.
#[derive(Template, WebTemplate)]
#[template(path = "account/password.html")]
pub struct ChangePasswordTemplate {
    pub layout: Layout,
    pub min_length: usize,
}

/// Display the change password form.
pub async fn password_page(
    auth: Authorized<area::ChangePassword>,
) -> Result<ChangePasswordTemplate> {
    Ok(ChangePasswordTemplate {
        layout: Layout::new(&auth, Page::ChangePassword, "Change Password").await?,
        min_length: MIN_PASSWORD_LENGTH,
    })
}

/// Handle change password form submission.
#[instrument(skip_all, fields(user = %auth.user.username))]
pub async fn change_password(
    State(state): State<AppState>,
    auth: Authorized<area::ChangePassword>,
    Form(form): Form<ChangePasswordForm>,
) -> Result<Redirect> {
    verify_csrf(&auth.session, &form.csrf_token).await?;

    let result = AuthService::new(state.pool())
        .change_password(
            auth.user.id,
            &form.current_password,
            &form.new_password,
            &form.confirm_password,
        )
        .await;

    let ip = auth.client_ip.as_deref();
    match result {
        Ok(()) => {
            record_activity(&state, Some(auth.user.id), ip, "password_change", None).await;
            set_flash(&auth.session, Flash::success("Password changed successfully.")).await;
        }
        Err(err) => {
            let reason = err.to_string();
            record_activity(
                &state,
                Some(auth.user.id),
                ip,
                "password_change_failed",
                Some(&reason),
            )
            .await;
            let message = match err {
                AuthError::InvalidCredentials => "Current password is incorrect.".to_string(),
                other => other.user_message(),
            };
            set_flash(&auth.session, Flash::error(message)).await;
        }
    }

    Ok(Redirect::to("/account/password"))
}
