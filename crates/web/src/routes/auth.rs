//! Authentication route handlers.
//!
//! Login, logout and the email-based password reset. These pages are
//! reachable without a session user; their forms still carry a CSRF token
//! bound to the anonymous session.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{Result, clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::{
    ClientIp, Flash, clear_current_user, csrf_token, set_current_user, set_flash, take_flash,
    verify_csrf,
};
use crate::models::{CurrentUser, session_keys};
use crate::routes::page::record_activity;
use crate::services::auth::{AuthError, AuthService};
use crate::state::AppState;

/// Shown after every forgot-password submission, whether or not the email matched.
const RESET_REQUESTED: &str =
    "If an account with that email exists, a password reset link has been sent.";

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub csrf_token: String,
    pub username: String,
    pub password: String,
}

/// Logout form data.
#[derive(Debug, Deserialize)]
pub struct LogoutForm {
    pub csrf_token: String,
}

/// Forgot password form data.
#[derive(Debug, Deserialize)]
pub struct ForgotPasswordForm {
    pub csrf_token: String,
    pub email: String,
}

/// Reset password form data.
#[derive(Debug, Deserialize)]
pub struct ResetPasswordForm {
    pub csrf_token: String,
    pub token: String,
    pub password: String,
    pub password_confirm: String,
}

/// Query parameters of the reset link.
#[derive(Debug, Deserialize)]
pub struct ResetQuery {
    #[serde(default)]
    pub token: String,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub csrf_token: String,
    pub flash: Option<Flash>,
}

/// Forgot password page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/forgot_password.html")]
pub struct ForgotPasswordTemplate {
    pub csrf_token: String,
    pub flash: Option<Flash>,
}

/// Reset password page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/reset_password.html")]
pub struct ResetPasswordTemplate {
    pub csrf_token: String,
    pub flash: Option<Flash>,
    /// `None` when the link is invalid or expired.
    pub token: Option<String>,
}

// =============================================================================
// Login / Logout
// =============================================================================

/// Display the login page.
pub async fn login_page(session: Session) -> Result<Response> {
    let logged_in = session
        .get::<CurrentUser>(session_keys::CURRENT_USER)
        .await?
        .is_some();
    if logged_in {
        return Ok(Redirect::to("/").into_response());
    }

    Ok(LoginTemplate {
        csrf_token: csrf_token(&session).await?,
        flash: take_flash(&session).await,
    }
    .into_response())
}

/// Handle login form submission.
#[instrument(skip_all, fields(username = %form.username))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    ClientIp(ip): ClientIp,
    Form(form): Form<LoginForm>,
) -> Result<Redirect> {
    verify_csrf(&session, &form.csrf_token).await?;

    match AuthService::new(state.pool())
        .login(&form.username, &form.password)
        .await
    {
        Ok(user) => {
            // New session id so a pre-login id cannot be reused.
            session.cycle_id().await?;
            let current = CurrentUser::from(&user);
            set_current_user(&session, &current).await?;
            set_sentry_user(current.id, &current.username);

            record_activity(&state, Some(user.id), ip.as_deref(), "login", None).await;
            tracing::info!(user_id = %user.id, "User logged in");
            Ok(Redirect::to("/"))
        }
        Err(err) => {
            if matches!(err, AuthError::InvalidCredentials) {
                let details = format!("username: {}", form.username.trim());
                record_activity(&state, None, ip.as_deref(), "login_failed", Some(&details))
                    .await;
                tracing::info!("Login failed");
            }
            set_flash(&session, Flash::error(err.user_message())).await;
            Ok(Redirect::to("/auth/login"))
        }
    }
}

/// Logout and clear session.
pub async fn logout(
    State(state): State<AppState>,
    session: Session,
    ClientIp(ip): ClientIp,
    Form(form): Form<LogoutForm>,
) -> Result<Redirect> {
    verify_csrf(&session, &form.csrf_token).await?;

    if let Some(user) = session
        .get::<CurrentUser>(session_keys::CURRENT_USER)
        .await?
    {
        record_activity(&state, Some(user.id), ip.as_deref(), "logout", None).await;
    }

    clear_current_user(&session).await?;
    clear_sentry_user();
    Ok(Redirect::to("/auth/login"))
}

// =============================================================================
// Password Reset
// =============================================================================

/// Display the forgot password page.
pub async fn forgot_password_page(session: Session) -> Result<ForgotPasswordTemplate> {
    Ok(ForgotPasswordTemplate {
        csrf_token: csrf_token(&session).await?,
        flash: take_flash(&session).await,
    })
}

/// Handle forgot password form submission.
///
/// The response is the same whether or not the email belongs to a user.
#[instrument(skip_all)]
pub async fn forgot_password(
    State(state): State<AppState>,
    session: Session,
    ClientIp(ip): ClientIp,
    Form(form): Form<ForgotPasswordForm>,
) -> Result<Redirect> {
    verify_csrf(&session, &form.csrf_token).await?;

    let ttl = state.config().password_reset_ttl;
    match AuthService::new(state.pool())
        .start_password_reset(&form.email, ttl)
        .await
    {
        Ok(Some(reset)) => {
            let reset_url = state
                .config()
                .absolute_url(&format!("/auth/reset-password?token={}", reset.token));

            match (state.email(), reset.user.email.as_ref()) {
                (Some(mailer), Some(to)) => {
                    if let Err(e) = mailer
                        .send_password_reset(
                            to.as_str(),
                            &reset.user.full_name,
                            &reset_url,
                            ttl.num_minutes(),
                        )
                        .await
                    {
                        tracing::error!(error = %e, user_id = %reset.user.id, "Failed to send reset email");
                    }
                }
                _ => {
                    tracing::warn!(user_id = %reset.user.id, "Email disabled, reset link not sent");
                }
            }

            record_activity(
                &state,
                Some(reset.user.id),
                ip.as_deref(),
                "password_reset_requested",
                None,
            )
            .await;
        }
        Ok(None) => tracing::info!("Password reset requested for unknown email"),
        Err(err) => tracing::error!(error = %err, "Password reset request failed"),
    }

    set_flash(&session, Flash::success(RESET_REQUESTED)).await;
    Ok(Redirect::to("/auth/forgot-password"))
}

/// Display the reset password page for a link.
pub async fn reset_password_page(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<ResetQuery>,
) -> Result<ResetPasswordTemplate> {
    let mut flash = take_flash(&session).await;
    let valid = is_token_shaped(&query.token)
        && AuthService::new(state.pool())
            .reset_token_is_valid(&query.token)
            .await
            .map_err(|e| crate::error::AppError::Internal(e.to_string()))?;

    if !valid {
        flash = Some(Flash::error(AuthError::InvalidResetToken.user_message()));
    }

    Ok(ResetPasswordTemplate {
        csrf_token: csrf_token(&session).await?,
        flash,
        token: valid.then_some(query.token),
    })
}

/// Handle reset password form submission.
#[instrument(skip_all)]
pub async fn reset_password(
    State(state): State<AppState>,
    session: Session,
    ClientIp(ip): ClientIp,
    Form(form): Form<ResetPasswordForm>,
) -> Result<Redirect> {
    verify_csrf(&session, &form.csrf_token).await?;

    if !is_token_shaped(&form.token) {
        set_flash(&session, Flash::error(AuthError::InvalidResetToken.user_message())).await;
        return Ok(Redirect::to("/auth/forgot-password"));
    }

    match AuthService::new(state.pool())
        .reset_password(&form.token, &form.password, &form.password_confirm)
        .await
    {
        Ok(user) => {
            record_activity(&state, Some(user.id), ip.as_deref(), "password_reset", None).await;
            set_flash(
                &session,
                Flash::success("Your password has been reset. Please log in."),
            )
            .await;
            Ok(Redirect::to("/auth/login"))
        }
        Err(AuthError::InvalidResetToken) => {
            set_flash(&session, Flash::error(AuthError::InvalidResetToken.user_message())).await;
            Ok(Redirect::to("/auth/forgot-password"))
        }
        Err(err) => {
            set_flash(&session, Flash::error(err.user_message())).await;
            Ok(Redirect::to(&format!(
                "/auth/reset-password?token={}",
                form.token
            )))
        }
    }
}

/// Reset tokens are 64 hex characters.
fn is_token_shaped(token: &str) -> bool {
    token.len() == 64 && token.chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::auth::generate_token;

    #[test]
    fn test_token_shape() {
        assert!(is_token_shaped(&generate_token()));
        assert!(!is_token_shaped(""));
        assert!(!is_token_shaped("abc"));
        assert!(!is_token_shaped(&"z".repeat(64)));
    }
}
