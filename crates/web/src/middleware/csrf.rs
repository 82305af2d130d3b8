//! Per-session CSRF tokens for HTML forms.
//!
//! Every form carries a hidden `csrf_token` field; handlers call
//! [`verify_csrf`] before acting on a POST.

use tower_sessions::Session;

use crate::error::AppError;
use crate::models::session_keys;
use crate::services::auth::generate_token;

/// Get the session's CSRF token, creating one on first use.
///
/// # Errors
///
/// Returns `AppError::Internal` if the session cannot be read or written.
pub async fn csrf_token(session: &Session) -> Result<String, AppError> {
    if let Some(token) = session
        .get::<String>(session_keys::CSRF_TOKEN)
        .await
        .map_err(session_error)?
    {
        return Ok(token);
    }

    let token = generate_token();
    session
        .insert(session_keys::CSRF_TOKEN, &token)
        .await
        .map_err(session_error)?;
    Ok(token)
}

/// Check a submitted CSRF token against the session.
///
/// # Errors
///
/// Returns `AppError::Forbidden` if the token is missing or wrong.
pub async fn verify_csrf(session: &Session, submitted: &str) -> Result<(), AppError> {
    let expected = session
        .get::<String>(session_keys::CSRF_TOKEN)
        .await
        .map_err(session_error)?;

    match expected {
        Some(expected) if constant_time_compare(&expected, submitted) => Ok(()),
        _ => {
            tracing::warn!("CSRF token mismatch");
            Err(AppError::Forbidden(
                "Your form has expired. Please reload the page and try again.".to_string(),
            ))
        }
    }
}

fn session_error(err: tower_sessions::session::Error) -> AppError {
    AppError::Internal(format!("session error: {err}"))
}

/// Constant-time string comparison to prevent timing attacks.
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result: u8 = 0;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }

    result == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_time_compare_equal() {
        assert!(constant_time_compare("hello", "hello"));
        assert!(constant_time_compare("", ""));
    }

    #[test]
    fn test_constant_time_compare_not_equal() {
        assert!(!constant_time_compare("hello", "world"));
        assert!(!constant_time_compare("hello", "hell"));
        assert!(!constant_time_compare("", "token"));
    }
}
