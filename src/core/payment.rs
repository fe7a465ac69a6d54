//! Payment request business logic - manual review of credit purchases.
//!
//! Users submit the UTR of a payment they made; an admin checks it by hand and
//! approves or rejects the request exactly once. Approval raises the user's
//! daily limit and current balance together. Listings are newest first.

use crate::{
    core::credits,
    entities::{PaymentRequest, PaymentStatus, User, payment_request},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use tracing::{info, instrument, warn};

/// An admin's verdict on a pending request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Grant the requested credits
    Approve,
    /// Decline without granting anything
    Reject,
}

impl Decision {
    /// The status a request ends up in after this decision
    #[must_use]
    pub const fn status(self) -> PaymentStatus {
        match self {
            Self::Approve => PaymentStatus::Approved,
            Self::Reject => PaymentStatus::Rejected,
        }
    }
}

/// Input for [`submit_payment_request`]
#[derive(Debug, Clone)]
pub struct NewPaymentRequest {
    /// Requesting user
    pub user_id: i64,
    /// Requesting user's email
    pub user_email: String,
    /// Credits to add to the daily limit
    pub credits: i64,
    /// Amount paid, as reported by the user
    pub amount_paid: f64,
    /// Payment transaction reference
    pub utr: String,
    /// Optional note for the reviewer
    pub message: Option<String>,
}

/// Records a new pending payment request.
///
/// The UTR is stored as given (trimmed) and not verified here.
pub async fn submit_payment_request(
    db: &DatabaseConnection,
    request: NewPaymentRequest,
) -> Result<payment_request::Model> {
    if request.credits <= 0 {
        return Err(Error::InvalidCredits {
            amount: request.credits,
        });
    }
    if !request.amount_paid.is_finite() || request.amount_paid < 0.0 {
        return Err(Error::InvalidAmount {
            amount: request.amount_paid,
        });
    }

    let utr = request.utr.trim();
    if utr.is_empty() {
        return Err(Error::MissingField { field: "utr" });
    }
    let user_email = request.user_email.trim();
    if user_email.is_empty() {
        return Err(Error::MissingField { field: "user_email" });
    }
    let message = request
        .message
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty());

    let now = Utc::now();
    let model = payment_request::ActiveModel {
        user_id: Set(request.user_id),
        user_email: Set(user_email.to_string()),
        credits: Set(request.credits),
        amount_paid: Set(request.amount_paid),
        utr: Set(utr.to_string()),
        message: Set(message),
        status: Set(PaymentStatus::Pending),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    let created = model.insert(db).await?;
    info!(
        "Payment request {} from {} for {} credits",
        created.id, created.user_email, created.credits
    );
    Ok(created)
}

/// Lists payment requests, newest first.
///
/// With `user_id` only that user's requests are returned; without it, all of
/// them (the admin view).
pub async fn list_payment_requests(
    db: &DatabaseConnection,
    user_id: Option<i64>,
) -> Result<Vec<payment_request::Model>> {
    let mut query = PaymentRequest::find();
    if let Some(user_id) = user_id {
        query = query.filter(payment_request::Column::UserId.eq(user_id));
    }

    query
        .order_by_desc(payment_request::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Retrieves a payment request by id.
pub async fn get_payment_request(
    db: &DatabaseConnection,
    request_id: i64,
) -> Result<Option<payment_request::Model>> {
    PaymentRequest::find_by_id(request_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Approves or rejects a pending request.
///
/// Runs in one database transaction. If the requesting user no longer exists
/// the request is closed as `Rejected` and `AssociatedUserMissing` is returned.
#[instrument(skip(db))]
pub async fn decide_payment_request(
    db: &DatabaseConnection,
    request_id: i64,
    decision: Decision,
) -> Result<payment_request::Model> {
    let txn = db.begin().await?;

    let request = PaymentRequest::find_by_id(request_id)
        .one(&txn)
        .await?
        .ok_or(Error::RequestNotFound { id: request_id })?;

    if request.status.is_terminal() {
        return Err(Error::AlreadyProcessed {
            status: request.status,
        });
    }

    let now = Utc::now();
    let user_id = request.user_id;
    let granted = request.credits;

    let Some(user) = User::find_by_id(user_id).one(&txn).await? else {
        let mut active_model: payment_request::ActiveModel = request.into();
        active_model.status = Set(PaymentStatus::Rejected);
        active_model.updated_at = Set(now);
        active_model.update(&txn).await?;
        txn.commit().await?;

        warn!("Rejected payment request {request_id}: user {user_id} no longer exists");
        return Err(Error::AssociatedUserMissing { user_id });
    };

    if decision == Decision::Approve {
        let user = credits::apply_credit_delta(&txn, user, granted).await?;
        info!(
            "Granted {} credits to {}, daily limit now {}",
            granted, user.email, user.daily_credit_limit
        );
    }

    let mut active_model: payment_request::ActiveModel = request.into();
    active_model.status = Set(decision.status());
    active_model.updated_at = Set(now);
    let decided = active_model.update(&txn).await?;

    txn.commit().await?;

    info!("Payment request {} {}", decided.id, decided.status);
    Ok(decided)
}
