//! Shared page chrome, form parsing and the post/redirect/get outcome.

use axum::response::Redirect;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;

use pharmacy_core::{Page, UserId};

use crate::db::ActivityLogRepository;
use crate::error::Result;
use crate::middleware::{Flash, RequestContext, csrf_token, set_flash, take_flash};
use crate::models::CurrentUser;
use crate::services::ServiceError;
use crate::state::AppState;

/// Navigation entries in display order.
const NAV: [(Page, &str, &str); 8] = [
    (Page::Dashboard, "/", "Dashboard"),
    (Page::Drugs, "/drugs", "Drugs"),
    (Page::Inventory, "/inventory", "Inventory"),
    (Page::Transactions, "/transactions", "Transactions"),
    (Page::Categories, "/categories", "Categories"),
    (Page::Management, "/management", "Management"),
    (Page::Users, "/users", "Users"),
    (Page::ChangePassword, "/account/password", "Change Password"),
];

/// A navigation link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavLink {
    pub href: &'static str,
    pub label: &'static str,
    pub active: bool,
}

/// Data every logged-in page renders around its content.
#[derive(Debug, Clone)]
pub struct Layout {
    pub title: &'static str,
    pub user: CurrentUser,
    pub csrf_token: String,
    pub flash: Option<Flash>,
    pub nav: Vec<NavLink>,
}

impl Layout {
    /// Build the layout, consuming any pending flash message.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Internal` if the session cannot be read.
    pub async fn new(ctx: &RequestContext, active: Page, title: &'static str) -> Result<Self> {
        Ok(Self {
            title,
            user: ctx.user.clone(),
            csrf_token: csrf_token(&ctx.session).await?,
            flash: take_flash(&ctx.session).await,
            nav: nav_for(&ctx.user, active),
        })
    }
}

/// Links the user's role may open.
fn nav_for(user: &CurrentUser, active: Page) -> Vec<NavLink> {
    NAV.iter()
        .filter(|(page, _, _)| user.role.can_access(*page))
        .map(|&(page, href, label)| NavLink {
            href,
            label,
            active: page == active,
        })
        .collect()
}

/// Form carrying only the CSRF token, used by delete buttons.
#[derive(Debug, Deserialize)]
pub struct CsrfForm {
    pub csrf_token: String,
}

// =============================================================================
// Outcome of a form POST
// =============================================================================

/// A completed mutation: what to log and what to tell the user.
#[derive(Debug)]
pub struct Done {
    pub action: &'static str,
    pub details: String,
    pub message: String,
}

impl Done {
    pub fn new(action: &'static str, details: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            action,
            details: details.into(),
            message: message.into(),
        }
    }
}

/// Log a successful mutation, flash its outcome and redirect.
///
/// Failures are flashed with their user-facing message and go back to
/// `failure_to`.
pub async fn conclude(
    state: &AppState,
    ctx: &RequestContext,
    outcome: std::result::Result<Done, ServiceError>,
    success_to: &str,
    failure_to: &str,
) -> Redirect {
    match outcome {
        Ok(done) => {
            record_activity(
                state,
                Some(ctx.user.id),
                ctx.client_ip.as_deref(),
                done.action,
                Some(&done.details),
            )
            .await;
            set_flash(&ctx.session, Flash::success(done.message)).await;
            Redirect::to(success_to)
        }
        Err(err) => {
            tracing::info!(user = %ctx.user.username, error = %err, "Request rejected");
            set_flash(&ctx.session, Flash::error(err.user_message())).await;
            Redirect::to(failure_to)
        }
    }
}

/// Append to the activity log. Failures are reported but never fail the request.
pub async fn record_activity(
    state: &AppState,
    user: Option<UserId>,
    ip: Option<&str>,
    action: &str,
    details: Option<&str>,
) {
    if let Err(e) = ActivityLogRepository::new(state.pool())
        .record(user, action, details, ip)
        .await
    {
        tracing::warn!(error = %e, action, "Failed to write activity log");
    }
}

// =============================================================================
// Form field parsing
// =============================================================================

/// Parse a required selection such as a drug or department.
pub fn required_id<T: From<i32>>(raw: &str, field: &str) -> std::result::Result<T, ServiceError> {
    optional_id(raw, field)?.ok_or_else(|| ServiceError::validation(format!("Please select a {field}.")))
}

/// Parse an optional selection; blank means none.
pub fn optional_id<T: From<i32>>(
    raw: &str,
    field: &str,
) -> std::result::Result<Option<T>, ServiceError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<i32>()
        .ok()
        .filter(|id| *id > 0)
        .map(|id| Some(T::from(id)))
        .ok_or_else(|| ServiceError::validation(format!("Invalid {field}.")))
}

/// Parse a whole number.
pub fn integer(raw: &str, field: &str) -> std::result::Result<i32, ServiceError> {
    raw.trim()
        .parse()
        .map_err(|_| ServiceError::validation(format!("{field} must be a whole number.")))
}

/// Parse a money amount.
pub fn decimal(raw: &str, field: &str) -> std::result::Result<Decimal, ServiceError> {
    raw.trim()
        .parse()
        .map_err(|_| ServiceError::validation(format!("{field} must be a number.")))
}

/// Parse a required `YYYY-MM-DD` date.
pub fn date(raw: &str, field: &str) -> std::result::Result<NaiveDate, ServiceError> {
    optional_date(raw, field)?
        .ok_or_else(|| ServiceError::validation(format!("{field} is required.")))
}

/// Parse an optional `YYYY-MM-DD` date; blank means none.
pub fn optional_date(raw: &str, field: &str) -> std::result::Result<Option<NaiveDate>, ServiceError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(Some)
        .map_err(|_| ServiceError::validation(format!("{field} must be a valid date.")))
}

/// Blank text becomes `None`.
pub fn text(raw: Option<String>) -> Option<String> {
    crate::services::registry::optional(raw)
}

/// HTML checkboxes are sent only when checked.
pub const fn checked(raw: Option<&String>) -> bool {
    raw.is_some()
}

#[cfg(test)]
impl Layout {
    /// Layout for rendering templates in unit tests.
    pub(crate) fn sample(active: Page, title: &'static str) -> Self {
        let user = CurrentUser {
            id: UserId::new(1),
            username: "admin".to_string(),
            full_name: "Admin User".to_string(),
            role: pharmacy_core::Role::Admin,
            department_id: None,
        };
        Self {
            title,
            nav: nav_for(&user, active),
            user,
            csrf_token: "token".to_string(),
            flash: None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pharmacy_core::{DepartmentId, Role};

    fn user(role: Role) -> CurrentUser {
        CurrentUser {
            id: UserId::new(1),
            username: "tester".to_string(),
            full_name: "Test User".to_string(),
            role,
            department_id: None,
        }
    }

    #[test]
    fn test_nav_follows_role() {
        let labels: Vec<_> = nav_for(&user(Role::Pharmacist), Page::Drugs)
            .into_iter()
            .map(|l| l.label)
            .collect();
        assert_eq!(
            labels,
            [
                "Dashboard",
                "Drugs",
                "Inventory",
                "Transactions",
                "Categories",
                "Change Password"
            ]
        );

        let staff = nav_for(&user(Role::DepartmentStaff), Page::Management);
        assert!(staff.iter().any(|l| l.label == "Management" && l.active));
        assert!(!staff.iter().any(|l| l.label == "Transactions"));

        assert_eq!(nav_for(&user(Role::Admin), Page::Users).len(), NAV.len());
    }

    #[test]
    fn test_id_parsing() {
        let id: DepartmentId = required_id("3", "department").unwrap();
        assert_eq!(id, DepartmentId::new(3));
        assert!(optional_id::<DepartmentId>(" ", "department").unwrap().is_none());
        assert!(required_id::<DepartmentId>("", "department").is_err());
        assert!(required_id::<DepartmentId>("-4", "department").is_err());
        assert!(required_id::<DepartmentId>("abc", "department").is_err());
    }

    #[test]
    fn test_number_and_date_parsing() {
        assert_eq!(integer(" -10 ", "Quantity").unwrap(), -10);
        assert!(integer("2.5", "Quantity").is_err());
        assert_eq!(decimal("1000.50", "Unit price").unwrap(), Decimal::new(100_050, 2));
        assert_eq!(
            date("2027-01-31", "Expiry date").unwrap(),
            NaiveDate::from_ymd_opt(2027, 1, 31).unwrap()
        );
        assert!(date("", "Expiry date").is_err());
        assert!(optional_date("31/01/2027", "Expiry date").is_err());
        assert!(optional_date("", "Expiry date").unwrap().is_none());
    }
}
