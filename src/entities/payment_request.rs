//! Payment request entity - A user's claim to have paid for extra credits.
//!
//! Requests carry an external transaction reference (UTR) that an admin checks
//! by hand before approving or rejecting. Approval raises the user's daily limit.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Review state of a payment request
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum PaymentStatus {
    /// Waiting for an admin decision
    #[sea_orm(string_value = "Pending")]
    Pending,
    /// Credits granted
    #[sea_orm(string_value = "Approved")]
    Approved,
    /// Declined, no credits granted
    #[sea_orm(string_value = "Rejected")]
    Rejected,
}

impl PaymentStatus {
    /// Terminal states can never change again
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        };
        f.write_str(label)
    }
}

/// Payment request database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "payment_requests")]
pub struct Model {
    /// Unique identifier, increasing in submission order
    #[sea_orm(primary_key)]
    pub id: i64,
    /// ID of the requesting user
    pub user_id: i64,
    /// Requester's email at submission time
    pub user_email: String,
    /// Credits to add to the daily limit on approval
    pub credits: i64,
    /// Amount the user says they paid; informational only
    pub amount_paid: f64,
    /// External payment transaction reference
    pub utr: String,
    /// Optional note from the user
    pub message: Option<String>,
    /// Review state
    pub status: PaymentStatus,
    /// When the request was submitted
    pub created_at: DateTimeUtc,
    /// When the request last changed
    pub updated_at: DateTimeUtc,
}

/// `user_id` is a plain reference without a foreign key
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
