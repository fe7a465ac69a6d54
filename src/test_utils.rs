//! Shared test utilities.
//!
//! This module provides helpers for setting up test databases and creating
//! test accounts with sensible defaults.

use crate::{
    config::accounts::CreditSettings,
    core::account::{self, NewAccount},
    entities::{Role, user},
    errors::Result,
};
use chrono::Duration;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};

/// Password given to every account created by these helpers
pub const TEST_PASSWORD: &str = "password123";

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Creates a regular user with the default 25-credit limit.
///
/// # Defaults
/// * `name`: "Test User"
/// * `password`: [`TEST_PASSWORD`]
pub async fn create_test_user(db: &DatabaseConnection, email: &str) -> Result<user::Model> {
    account::register(db, CreditSettings::default(), "Test User", email, TEST_PASSWORD).await
}

/// Creates an admin with a 9999-credit display limit.
pub async fn create_test_admin(db: &DatabaseConnection, email: &str) -> Result<user::Model> {
    account::create_account(
        db,
        NewAccount {
            name: "Test Admin",
            email,
            password: TEST_PASSWORD,
            role: Role::Admin,
            daily_credit_limit: 9999,
        },
    )
    .await
}

/// Moves a user's last refill back by `by`, so the next read sees an earlier day.
pub async fn backdate_last_reset(
    db: &DatabaseConnection,
    user: user::Model,
    by: Duration,
) -> Result<user::Model> {
    let last_reset = user.last_credit_reset - by;
    let mut active_model: user::ActiveModel = user.into();
    active_model.last_credit_reset = Set(last_reset);
    active_model.update(db).await.map_err(Into::into)
}
