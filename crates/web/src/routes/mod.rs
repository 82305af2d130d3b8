//! HTTP route handlers for the pharmacy.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                 - Health check (registered in `app`)
//! GET  /health/ready           - Readiness check (registered in `app`)
//!
//! # Dashboard
//! GET  /                       - Dashboard overview
//!
//! # Auth
//! GET  /auth/login             - Login page
//! POST /auth/login             - Login action
//! POST /auth/logout            - Logout action
//! GET  /auth/forgot-password   - Forgot password page
//! POST /auth/forgot-password   - Send a reset link
//! GET  /auth/reset-password    - Reset password page (?token=)
//! POST /auth/reset-password    - Set the new password
//!
//! # Account
//! GET  /account/password       - Change password page
//! POST /account/password       - Change password action
//!
//! # Drugs
//! GET  /drugs                  - Drug list (?inactive=true)
//! POST /drugs                  - Add a drug
//! GET  /drugs/{id}             - Edit form
//! POST /drugs/{id}             - Update a drug
//! POST /drugs/{id}/delete      - Deactivate a drug
//!
//! # Inventory
//! GET  /inventory              - Batch list (?department_id=)
//! POST /inventory/restock      - Receive stock from a supplier
//! POST /inventory/adjust       - Correct a batch quantity
//! POST /inventory/transfer     - Move stock to another department
//!
//! # Transactions
//! GET  /transactions           - Weekly summary and recent transactions
//! POST /transactions           - Record a sale, return or issue
//! POST /transactions/{id}/delete - Reverse a transaction
//!
//! # Categories
//! GET  /categories             - Category list
//! POST /categories             - Add a category
//! GET  /categories/{id}        - Edit form
//! POST /categories/{id}        - Update a category
//! POST /categories/{id}/delete - Delete an unused category
//!
//! # Management
//! GET  /management             - Suppliers, departments and categories
//! POST /management/suppliers   - Add a supplier
//! GET  /management/suppliers/{id} - Edit form
//! POST /management/suppliers/{id} - Update a supplier
//! POST /management/suppliers/{id}/delete - Delete a supplier
//! POST /management/departments - Add a department
//! GET  /management/departments/{id} - Edit form
//! POST /management/departments/{id} - Update a department
//! POST /management/departments/{id}/delete - Delete a department
//!
//! # Users (admin only)
//! GET  /users                  - User list
//! POST /users                  - Add a user
//! GET  /users/{id}             - Edit form
//! POST /users/{id}             - Update a user
//! POST /users/{id}/password    - Set a user's password
//! POST /users/{id}/delete      - Deactivate a user
//!
//! # API
//! GET  /api/stock              - On-hand stock (?drug_id=&department_id=)
//! ```

pub mod account;
pub mod api;
pub mod auth;
pub mod categories;
pub mod dashboard;
pub mod drugs;
pub mod inventory;
pub mod management;
pub mod page;
pub mod transactions;
pub mod users;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/logout", post(auth::logout))
        .route(
            "/forgot-password",
            get(auth::forgot_password_page).post(auth::forgot_password),
        )
        .route(
            "/reset-password",
            get(auth::reset_password_page).post(auth::reset_password),
        )
}

/// Create the drug routes router.
pub fn drug_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(drugs::index).post(drugs::create))
        .route("/{id}", get(drugs::edit).post(drugs::update))
        .route("/{id}/delete", post(drugs::delete))
}

/// Create the inventory routes router.
pub fn inventory_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(inventory::index))
        .route("/restock", post(inventory::restock))
        .route("/adjust", post(inventory::adjust))
        .route("/transfer", post(inventory::transfer))
}

/// Create the transaction routes router.
pub fn transaction_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(transactions::index).post(transactions::record))
        .route("/{id}/delete", post(transactions::delete))
}

/// Create the category routes router.
pub fn category_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(categories::index).post(categories::create))
        .route("/{id}", get(categories::edit).post(categories::update))
        .route("/{id}/delete", post(categories::delete))
}

/// Create the management routes router.
pub fn management_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(management::index))
        .route("/suppliers", post(management::create_supplier))
        .route(
            "/suppliers/{id}",
            get(management::edit_supplier).post(management::update_supplier),
        )
        .route("/suppliers/{id}/delete", post(management::delete_supplier))
        .route("/departments", post(management::create_department))
        .route(
            "/departments/{id}",
            get(management::edit_department).post(management::update_department),
        )
        .route(
            "/departments/{id}/delete",
            post(management::delete_department),
        )
}

/// Create the user administration routes router.
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(users::index).post(users::create))
        .route("/{id}", get(users::edit).post(users::update))
        .route("/{id}/password", post(users::set_password))
        .route("/{id}/delete", post(users::delete))
}

/// Create all routes for the pharmacy.
pub fn routes() -> Router<AppState> {
    Router::new()
        // Dashboard
        .route("/", get(dashboard::index))
        // Account
        .route(
            "/account/password",
            get(account::password_page).post(account::change_password),
        )
        .nest("/auth", auth_routes())
        .nest("/drugs", drug_routes())
        .nest("/inventory", inventory_routes())
        .nest("/transactions", transaction_routes())
        .nest("/categories", category_routes())
        .nest("/management", management_routes())
        .nest("/users", user_routes())
        // JSON API
        .route("/api/stock", get(api::stock))
}
