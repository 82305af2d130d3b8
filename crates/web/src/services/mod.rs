//! Business logic services.
//!
//! - [`ledger`] owns every change to inventory quantities.
//! - [`registry`] manages reference data (categories, suppliers, departments, drugs).
//! - [`auth`] handles login, password changes and password resets.
//! - [`users`] is the admin-only account management surface.
//! - [`email`] delivers password reset mail over SMTP.

pub mod auth;
pub mod email;
pub mod error;
pub mod ledger;
pub mod registry;
pub mod users;

pub use error::ServiceError;
