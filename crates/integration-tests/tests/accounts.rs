//! Login, password and user administration integration tests.
//!
//! Run with: `cargo test -p pharmacy-integration-tests -- --ignored`

#![allow(clippy::unwrap_used)]

use chrono::Duration;
use sqlx::PgPool;

use pharmacy_core::Role;
use pharmacy_integration_tests::{Fixture, PASSWORD, create_user};
use pharmacy_web::db::UserRepository;
use pharmacy_web::services::ServiceError;
use pharmacy_web::services::auth::{AuthError, AuthService};
use pharmacy_web::services::users::{AccountRequest, ProfileRequest, UserAdmin};

const NEW_PASSWORD: &str = "staple-battery-horse";

// ============================================================================
// Login
// ============================================================================

#[sqlx::test(migrations = "../web/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_login_checks_password_and_stamps_last_login(pool: PgPool) {
    let fx = Fixture::seed(&pool).await;
    let auth = AuthService::new(&pool);

    let wrong = auth.login("admin", "not-the-password").await;
    assert!(matches!(wrong, Err(AuthError::InvalidCredentials)));
    let unknown = auth.login("nobody", PASSWORD).await;
    assert!(matches!(unknown, Err(AuthError::InvalidCredentials)));

    let user = auth.login(" admin ", PASSWORD).await.unwrap();
    assert_eq!(user.id, fx.admin);
    assert_eq!(user.role, Role::Admin);

    let stored = UserRepository::new(&pool).get(fx.admin).await.unwrap().unwrap();
    assert!(stored.last_login.is_some());
}

#[sqlx::test(migrations = "../web/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_inactive_user_cannot_log_in(pool: PgPool) {
    let fx = Fixture::seed(&pool).await;
    let clerk = create_user(&pool, "clerk", Role::Pharmacist, Some(fx.pharmacy)).await;
    UserAdmin::new(&pool).deactivate(fx.admin, clerk).await.unwrap();

    let result = AuthService::new(&pool).login("clerk", PASSWORD).await;
    assert!(matches!(result, Err(AuthError::InvalidCredentials)));
}

// ============================================================================
// Passwords
// ============================================================================

#[sqlx::test(migrations = "../web/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_change_password_requires_current_password(pool: PgPool) {
    let fx = Fixture::seed(&pool).await;
    let auth = AuthService::new(&pool);

    let wrong = auth
        .change_password(fx.admin, "guess", NEW_PASSWORD, NEW_PASSWORD)
        .await;
    assert!(matches!(wrong, Err(AuthError::InvalidCredentials)));

    let mismatch = auth
        .change_password(fx.admin, PASSWORD, NEW_PASSWORD, "something-else")
        .await;
    assert!(matches!(mismatch, Err(AuthError::PasswordMismatch)));

    auth.change_password(fx.admin, PASSWORD, NEW_PASSWORD, NEW_PASSWORD)
        .await
        .unwrap();
    assert!(auth.login("admin", PASSWORD).await.is_err());
    auth.login("admin", NEW_PASSWORD).await.unwrap();
}

#[sqlx::test(migrations = "../web/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_password_reset_token_is_single_use(pool: PgPool) {
    let fx = Fixture::seed(&pool).await;
    let auth = AuthService::new(&pool);

    let reset = auth
        .start_password_reset("ADMIN@hospital.example", Duration::hours(1))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reset.user.id, fx.admin);
    assert_eq!(reset.token.len(), 64);
    assert!(auth.reset_token_is_valid(&reset.token).await.unwrap());

    let weak = auth.reset_password(&reset.token, "short", "short").await;
    assert!(matches!(weak, Err(AuthError::WeakPassword(_))));

    auth.reset_password(&reset.token, NEW_PASSWORD, NEW_PASSWORD)
        .await
        .unwrap();
    assert!(!auth.reset_token_is_valid(&reset.token).await.unwrap());
    let reused = auth
        .reset_password(&reset.token, NEW_PASSWORD, NEW_PASSWORD)
        .await;
    assert!(matches!(reused, Err(AuthError::InvalidResetToken)));
    auth.login("admin", NEW_PASSWORD).await.unwrap();
}

#[sqlx::test(migrations = "../web/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_password_reset_ignores_unknown_and_expired(pool: PgPool) {
    Fixture::seed(&pool).await;
    let auth = AuthService::new(&pool);

    let unknown = auth
        .start_password_reset("ghost@hospital.example", Duration::hours(1))
        .await
        .unwrap();
    assert!(unknown.is_none());
    let malformed = auth
        .start_password_reset("not an address", Duration::hours(1))
        .await
        .unwrap();
    assert!(malformed.is_none());

    let expired = auth
        .start_password_reset("admin@hospital.example", Duration::seconds(-1))
        .await
        .unwrap()
        .unwrap();
    assert!(!auth.reset_token_is_valid(&expired.token).await.unwrap());
    assert!(!auth.reset_token_is_valid("").await.unwrap());
}

// ============================================================================
// User administration
// ============================================================================

#[sqlx::test(migrations = "../web/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_admin_cannot_deactivate_self(pool: PgPool) {
    let fx = Fixture::seed(&pool).await;
    let admin = UserAdmin::new(&pool);

    let delete = admin.deactivate(fx.admin, fx.admin).await;
    assert!(matches!(delete, Err(ServiceError::Conflict(_))));

    let update = admin
        .update(
            fx.admin,
            fx.admin,
            ProfileRequest {
                full_name: "admin user".to_string(),
                email: None,
                department_id: Some(fx.pharmacy),
                role: Role::Admin,
                is_active: false,
            },
        )
        .await;
    assert!(matches!(update, Err(ServiceError::Conflict(_))));
}

#[sqlx::test(migrations = "../web/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_create_user_validates_input(pool: PgPool) {
    let fx = Fixture::seed(&pool).await;
    let admin = UserAdmin::new(&pool);
    let request = |username: &str, password: &str| AccountRequest {
        username: username.to_string(),
        password: password.to_string(),
        full_name: "Dana Reyes".to_string(),
        email: None,
        department_id: Some(fx.ward),
        role: Role::DepartmentStaff,
    };

    let weak = admin.create(request("dreyes", "short")).await;
    assert!(matches!(weak, Err(ServiceError::Validation(_))));

    let taken = admin.create(request("admin", PASSWORD)).await;
    assert!(matches!(taken, Err(ServiceError::Conflict(_))));

    let created = admin.create(request("dreyes", PASSWORD)).await.unwrap();
    assert_eq!(created.department_id, Some(fx.ward));
    assert_eq!(created.role, Role::DepartmentStaff);
    assert!(created.is_active);
}

#[sqlx::test(migrations = "../web/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_admin_password_reset_replaces_login(pool: PgPool) {
    let fx = Fixture::seed(&pool).await;
    let clerk = create_user(&pool, "clerk", Role::Pharmacist, Some(fx.pharmacy)).await;

    UserAdmin::new(&pool)
        .reset_password(clerk, NEW_PASSWORD)
        .await
        .unwrap();

    let auth = AuthService::new(&pool);
    assert!(auth.login("clerk", PASSWORD).await.is_err());
    assert_eq!(auth.login("clerk", NEW_PASSWORD).await.unwrap().id, clerk);
}
