//! Credit business logic - daily refills, spending, and coupled limit changes.
//!
//! Refills are lazy: there is no scheduler. Every read path that hands a user
//! back to a caller runs [`apply_daily_reset_if_due`], which refills the balance
//! when the last refill happened on an earlier calendar day. The decision itself
//! is the pure function [`with_daily_reset`] so it can be tested with any `now`.

use crate::{
    core::session::UserProfile,
    entities::{User, user},
    errors::{Error, Result},
};
use chrono::{DateTime, Local, TimeZone, Utc};
use sea_orm::{Set, prelude::*, sea_query::Expr};
use tracing::{debug, info};

pub use crate::config::accounts::GENERATION_COST;

/// Whether a refill is due, judging calendar days in the time zone `tz`.
///
/// Due iff the day of `last_reset` is strictly before the day of `now`. Two
/// instants a few minutes apart across midnight are on different days; two
/// instants 23 hours apart on the same date are not.
pub fn is_reset_due_in<Tz: TimeZone>(
    last_reset: DateTime<Utc>,
    now: DateTime<Utc>,
    tz: &Tz,
) -> bool {
    last_reset.with_timezone(tz).date_naive() < now.with_timezone(tz).date_naive()
}

/// [`is_reset_due_in`] using the server's local day boundary.
#[must_use]
pub fn is_reset_due(last_reset: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    is_reset_due_in(last_reset, now, &Local)
}

/// Returns `user` with credits refilled to the daily limit if a refill is due.
///
/// Admins are returned unchanged.
#[must_use]
pub fn with_daily_reset(mut user: user::Model, now: DateTime<Utc>) -> user::Model {
    if user.is_admin() || !is_reset_due(user.last_credit_reset, now) {
        return user;
    }
    user.current_credits = user.daily_credit_limit;
    user.last_credit_reset = now;
    user
}

/// Refills and persists `user`'s credits if the last refill was before today.
pub async fn apply_daily_reset_if_due<C>(db: &C, user: user::Model) -> Result<user::Model>
where
    C: ConnectionTrait,
{
    apply_daily_reset_if_due_at(db, user, Utc::now()).await
}

/// [`apply_daily_reset_if_due`] with an explicit clock.
pub async fn apply_daily_reset_if_due_at<C>(
    db: &C,
    user: user::Model,
    now: DateTime<Utc>,
) -> Result<user::Model>
where
    C: ConnectionTrait,
{
    let refreshed = with_daily_reset(user.clone(), now);
    if refreshed == user {
        return Ok(user);
    }

    info!(
        "Resetting credits for {} to their limit of {}",
        refreshed.email, refreshed.daily_credit_limit
    );

    let mut active_model: user::ActiveModel = user.into();
    active_model.current_credits = Set(refreshed.current_credits);
    active_model.last_credit_reset = Set(refreshed.last_credit_reset);
    active_model.update(db).await.map_err(Into::into)
}

/// Spends `amount` credits from a user's balance.
///
/// Admins are never charged and come back unchanged. The subtraction is a
/// single guarded `UPDATE ... WHERE current_credits >= amount`, so the balance
/// cannot go negative even if it moved since it was read.
pub async fn deduct_credit(
    db: &DatabaseConnection,
    user_id: i64,
    amount: i64,
) -> Result<user::Model> {
    if amount < 0 {
        return Err(Error::InvalidCredits { amount });
    }

    let user = User::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or(Error::UserNotFound { id: user_id })?;

    if user.is_admin() {
        return Ok(user);
    }

    if user.current_credits < amount {
        return Err(Error::InsufficientCredits {
            current: user.current_credits,
            required: amount,
        });
    }

    let updated = User::update_many()
        .col_expr(
            user::Column::CurrentCredits,
            Expr::col(user::Column::CurrentCredits).sub(amount),
        )
        .filter(user::Column::Id.eq(user_id))
        .filter(user::Column::CurrentCredits.gte(amount))
        .exec(db)
        .await?;

    let user = User::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or(Error::UserNotFound { id: user_id })?;

    if updated.rows_affected == 0 {
        return Err(Error::InsufficientCredits {
            current: user.current_credits,
            required: amount,
        });
    }

    debug!(
        "Deducted {} credits from {}, {} left",
        amount, user.email, user.current_credits
    );
    Ok(user)
}

/// Moves a user's daily limit and current balance by the same `delta`.
///
/// Both fields are clamped at zero and written in one `UPDATE`, so callers never
/// observe one changed without the other.
pub async fn apply_credit_delta<C>(db: &C, user: user::Model, delta: i64) -> Result<user::Model>
where
    C: ConnectionTrait,
{
    let (limit, current) = shifted_credits(&user, delta);

    let mut active_model: user::ActiveModel = user.into();
    active_model.daily_credit_limit = Set(limit);
    active_model.current_credits = Set(current);
    active_model.update(db).await.map_err(Into::into)
}

/// New `(daily_credit_limit, current_credits)` after shifting both by `delta`.
fn shifted_credits(user: &user::Model, delta: i64) -> (i64, i64) {
    (
        user.daily_credit_limit.saturating_add(delta).max(0),
        user.current_credits.saturating_add(delta).max(0),
    )
}

/// Gate run by generation features before calling the model.
///
/// The later [`deduct_credit`] is not transactional with this check.
#[must_use]
pub const fn can_afford(profile: &UserProfile, cost: i64) -> bool {
    profile.role.is_admin() || profile.current_credits >= cost
}
