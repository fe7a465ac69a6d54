//! Account business logic - registration, login checks, and admin actions.
//!
//! Emails are matched on a stored key (trimmed and Unicode-lowercased), so two
//! spellings that differ only in letter case are the same account. Every path
//! that authenticates a user also runs the lazy daily credit refill.

use crate::{
    config::accounts::CreditSettings,
    core::{credits, password},
    entities::{Role, User, user},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{QueryOrder, Set, SqlErr, prelude::*};
use tracing::{info, instrument, warn};

/// Input for [`create_account`]
#[derive(Debug, Clone, Copy)]
pub struct NewAccount<'a> {
    /// Display name
    pub name: &'a str,
    /// Login email
    pub email: &'a str,
    /// Plain-text password
    pub password: &'a str,
    /// Account role
    pub role: Role,
    /// Daily limit, also the starting balance
    pub daily_credit_limit: i64,
}

/// The lookup key for `email`: surrounding whitespace removed, lowercased.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Finds a user by email, ignoring case and surrounding whitespace.
pub async fn find_by_email(db: &DatabaseConnection, email: &str) -> Result<Option<user::Model>> {
    User::find()
        .filter(user::Column::EmailKey.eq(normalize_email(email)))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Finds a user by id.
pub async fn find_by_id(db: &DatabaseConnection, user_id: i64) -> Result<Option<user::Model>> {
    User::find_by_id(user_id).one(db).await.map_err(Into::into)
}

/// Lists every account in registration order, for the admin user table.
pub async fn list_users(db: &DatabaseConnection) -> Result<Vec<user::Model>> {
    User::find()
        .order_by_asc(user::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Registers a regular user with the configured default daily limit.
///
/// # Errors
/// `DuplicateEmail` if the email is taken in any letter case.
pub async fn register(
    db: &DatabaseConnection,
    settings: CreditSettings,
    name: &str,
    email: &str,
    password: &str,
) -> Result<user::Model> {
    create_account(
        db,
        NewAccount {
            name,
            email,
            password,
            role: Role::User,
            daily_credit_limit: settings.default_daily_limit,
        },
    )
    .await
}

/// Creates an account with an explicit role and limit.
///
/// The balance starts full and the refill clock starts now.
pub async fn create_account(db: &DatabaseConnection, account: NewAccount<'_>) -> Result<user::Model> {
    let name = account.name.trim();
    let email = account.email.trim();
    if name.is_empty() {
        return Err(Error::MissingField { field: "name" });
    }
    if email.is_empty() {
        return Err(Error::MissingField { field: "email" });
    }
    if account.password.is_empty() {
        return Err(Error::MissingField { field: "password" });
    }
    if account.daily_credit_limit < 0 {
        return Err(Error::InvalidCredits {
            amount: account.daily_credit_limit,
        });
    }

    if find_by_email(db, email).await?.is_some() {
        return Err(Error::DuplicateEmail {
            email: email.to_string(),
        });
    }

    let now = Utc::now();
    let user = user::ActiveModel {
        name: Set(name.to_string()),
        email: Set(email.to_string()),
        email_key: Set(normalize_email(email)),
        password_hash: Set(password::hash_password(account.password)?),
        role: Set(account.role),
        current_credits: Set(account.daily_credit_limit),
        daily_credit_limit: Set(account.daily_credit_limit),
        last_credit_reset: Set(now),
        is_banned: Set(false),
        created_at: Set(now),
        ..Default::default()
    };

    let created = user
        .insert(db)
        .await
        .map_err(|e| insert_error(e, email))?;
    info!("Registered {} as {:?}", created.email, created.role);
    Ok(created)
}

/// A registration that lost a race to the same email hits the unique index on
/// `email_key`; report it like the checked case.
fn insert_error(err: DbErr, email: &str) -> Error {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => Error::DuplicateEmail {
            email: email.to_string(),
        },
        _ => err.into(),
    }
}

/// Checks an email/password pair and returns the refreshed user.
///
/// A banned account is reported as banned before its password is checked.
#[instrument(skip(db, password))]
pub async fn authenticate(
    db: &DatabaseConnection,
    email: &str,
    password: &str,
) -> Result<user::Model> {
    let user = find_by_email(db, email)
        .await?
        .ok_or(Error::InvalidCredentials)?;

    if user.is_banned {
        warn!("Rejected login for banned account {}", user.email);
        return Err(Error::AccountBanned);
    }

    if !password::verify_password(password, &user.password_hash)? {
        return Err(Error::InvalidCredentials);
    }

    credits::apply_daily_reset_if_due(db, user).await
}

/// Flips a user's ban flag.
pub async fn toggle_ban(db: &DatabaseConnection, user_id: i64) -> Result<user::Model> {
    let user = find_by_id(db, user_id)
        .await?
        .ok_or(Error::UserNotFound { id: user_id })?;

    let banned = !user.is_banned;
    let mut active_model: user::ActiveModel = user.into();
    active_model.is_banned = Set(banned);
    let updated = active_model.update(db).await?;

    info!("Set banned={} for {}", banned, updated.email);
    Ok(updated)
}

/// Shifts a user's daily limit by `delta` and grants (or removes) the same
/// amount from the current balance right away. Both clamp at zero.
pub async fn adjust_daily_limit(
    db: &DatabaseConnection,
    user_id: i64,
    delta: i64,
) -> Result<user::Model> {
    let user = find_by_id(db, user_id)
        .await?
        .ok_or(Error::UserNotFound { id: user_id })?;

    let updated = credits::apply_credit_delta(db, user, delta).await?;
    info!(
        "Adjusted daily limit of {} by {} to {}",
        updated.email, delta, updated.daily_credit_limit
    );
    Ok(updated)
}
