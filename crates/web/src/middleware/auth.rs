//! Authentication and role gate extractors.
//!
//! Every gated handler takes an [`Authorized`] parameter naming the page it
//! belongs to. The extractor loads the session user, re-reads their record
//! so deactivations and role changes apply immediately, and checks the role
//! against [`Role::can_access`](pharmacy_core::Role::can_access).

use std::marker::PhantomData;
use std::net::SocketAddr;
use std::ops::Deref;

use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use pharmacy_core::Page;

use crate::db::UserRepository;
use crate::error::{clear_sentry_user, set_sentry_user};
use crate::models::{CurrentUser, session_keys};
use crate::state::AppState;

/// A page of the application that a route belongs to.
pub trait Area: Send + Sync + 'static {
    const PAGE: Page;
}

macro_rules! areas {
    ($($(#[$doc:meta])* $name:ident => $page:ident;)*) => {
        $(
            $(#[$doc])*
            #[derive(Debug, Clone, Copy)]
            pub struct $name;

            impl Area for $name {
                const PAGE: Page = Page::$page;
            }
        )*
    };
}

/// Marker types for [`Authorized`].
pub mod area {
    use super::{Area, Page};

    areas! {
        Dashboard => Dashboard;
        ChangePassword => ChangePassword;
        Drugs => Drugs;
        Inventory => Inventory;
        Transactions => Transactions;
        Categories => Categories;
        /// Suppliers and departments.
        Management => Management;
        Users => Users;
    }
}

/// Who is making the request, passed explicitly into every handler.
#[derive(Clone)]
pub struct RequestContext {
    pub user: CurrentUser,
    pub client_ip: Option<String>,
    pub session: Session,
}

/// Error returned when a request fails the gate.
#[derive(Debug)]
pub enum AuthRejection {
    /// Redirect to login page (for HTML requests).
    RedirectToLogin,
    /// Unauthorized response (for API requests).
    Unauthorized,
    /// Logged in, but the role may not open this page.
    Forbidden,
    /// The user record could not be loaded.
    Internal,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin => Redirect::to("/auth/login").into_response(),
            Self::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
            Self::Forbidden => (
                StatusCode::FORBIDDEN,
                "You do not have permission to access this page.",
            )
                .into_response(),
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        }
    }
}

/// Extractor that requires a logged-in, active user allowed on page `A`.
///
/// ```rust,ignore
/// async fn index(auth: Authorized<area::Drugs>) -> Result<Response> {
///     tracing::info!(user = %auth.user.username, "Listing drugs");
///     // ...
/// }
/// ```
pub struct Authorized<A: Area> {
    context: RequestContext,
    area: PhantomData<A>,
}

impl<A: Area> Deref for Authorized<A> {
    type Target = RequestContext;

    fn deref(&self) -> &Self::Target {
        &self.context
    }
}

impl<A: Area> FromRequestParts<AppState> for Authorized<A> {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let context = authenticate(parts, state).await?;

        if !context.user.role.can_access(A::PAGE) {
            tracing::warn!(
                user = %context.user.username,
                role = %context.user.role,
                page = ?A::PAGE,
                "Access denied"
            );
            return Err(AuthRejection::Forbidden);
        }

        Ok(Self {
            context,
            area: PhantomData,
        })
    }
}

/// Extractor that requires any logged-in, active user.
pub struct Authenticated(pub RequestContext);

impl FromRequestParts<AppState> for Authenticated {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        authenticate(parts, state).await.map(Self)
    }
}

/// Client address for the activity log.
pub struct ClientIp(pub Option<String>);

impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(client_ip(parts)))
    }
}

/// Resolve the session user against the database.
async fn authenticate(parts: &Parts, state: &AppState) -> Result<RequestContext, AuthRejection> {
    let is_api = parts.uri.path().starts_with("/api/");
    let unauthenticated = || {
        if is_api {
            AuthRejection::Unauthorized
        } else {
            AuthRejection::RedirectToLogin
        }
    };

    let session = parts
        .extensions
        .get::<Session>()
        .cloned()
        .ok_or(AuthRejection::Unauthorized)?;

    let current: CurrentUser = session
        .get(session_keys::CURRENT_USER)
        .await
        .ok()
        .flatten()
        .ok_or_else(unauthenticated)?;

    let user = UserRepository::new(state.pool())
        .get(current.id)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, user_id = %current.id, "Failed to load session user");
            AuthRejection::Internal
        })?;

    let Some(user) = user.filter(|u| u.is_active) else {
        tracing::info!(user_id = %current.id, "Session user missing or inactive, logging out");
        if let Err(e) = session.flush().await {
            tracing::warn!(error = %e, "Failed to flush session");
        }
        clear_sentry_user();
        return Err(unauthenticated());
    };

    let refreshed = CurrentUser::from(&user);
    if refreshed != current
        && let Err(e) = set_current_user(&session, &refreshed).await
    {
        tracing::warn!(error = %e, "Failed to refresh session user");
    }
    set_sentry_user(refreshed.id, &refreshed.username);

    Ok(RequestContext {
        user: refreshed,
        client_ip: client_ip(parts),
        session,
    })
}

/// First `X-Forwarded-For` hop, falling back to the socket peer.
fn client_ip(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|ip| ip.trim().to_string())
        .filter(|ip| !ip.is_empty())
        .or_else(|| {
            parts
                .extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        })
}

/// Helper to set the current user in the session.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.insert(session_keys::CURRENT_USER, user).await
}

/// Helper to end the session (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be deleted.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(headers: &[(&str, &str)]) -> Parts {
        let mut builder = Request::builder().uri("/inventory");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_area_pages() {
        assert_eq!(area::Users::PAGE, Page::Users);
        assert_eq!(area::Management::PAGE, Page::Management);
        assert_eq!(area::ChangePassword::PAGE, Page::ChangePassword);
    }

    #[test]
    fn test_client_ip_prefers_forwarded_header() {
        let p = parts(&[("x-forwarded-for", "10.0.0.7, 172.16.0.1")]);
        assert_eq!(client_ip(&p).as_deref(), Some("10.0.0.7"));
    }

    #[test]
    fn test_client_ip_falls_back_to_peer() {
        let mut p = parts(&[]);
        assert_eq!(client_ip(&p), None);

        let addr: SocketAddr = "192.168.1.20:51000".parse().unwrap();
        p.extensions.insert(ConnectInfo(addr));
        assert_eq!(client_ip(&p).as_deref(), Some("192.168.1.20"));
    }

    #[test]
    fn test_rejection_status_codes() {
        assert_eq!(
            AuthRejection::Forbidden.into_response().status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AuthRejection::Unauthorized.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthRejection::RedirectToLogin.into_response().status(),
            StatusCode::SEE_OTHER
        );
    }
}
