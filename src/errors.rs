//! Unified error type for the account store and session facade.
//!
//! Domain failures are distinct variants so callers can match on the kind and
//! choose their own wording. Infrastructure failures wrap the underlying error.

use crate::entities::payment_request::PaymentStatus;
use sea_orm::DbErr;
use thiserror::Error;

/// All errors raised by this crate
#[derive(Debug, Error)]
pub enum Error {
    /// An account with this email already exists (compared case-insensitively)
    #[error("An account with email {email} already exists")]
    DuplicateEmail {
        /// The email that collided
        email: String,
    },

    /// Unknown email or wrong password
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// The account exists but has been banned by an admin
    #[error("Account is banned")]
    AccountBanned,

    /// Spending more credits than the user currently holds
    #[error("Insufficient credits: have {current}, need {required}")]
    InsufficientCredits {
        /// Credits held at call time
        current: i64,
        /// Credits the operation asked for
        required: i64,
    },

    /// No user with this id
    #[error("User not found: {id}")]
    UserNotFound {
        /// The id that was looked up
        id: i64,
    },

    /// No payment request with this id
    #[error("Payment request not found: {id}")]
    RequestNotFound {
        /// The id that was looked up
        id: i64,
    },

    /// The payment request already left the pending state
    #[error("Payment request already {status}")]
    AlreadyProcessed {
        /// The terminal status the request is in
        status: PaymentStatus,
    },

    /// The user referenced by a payment request no longer exists
    #[error("User {user_id} associated with the payment request not found")]
    AssociatedUserMissing {
        /// The dangling user reference
        user_id: i64,
    },

    /// The operation needs a logged-in user and the session is absent
    #[error("No active session")]
    NoActiveSession,

    /// The operation needs an admin session
    #[error("Admin privileges required")]
    AdminRequired,

    /// A credit count outside its allowed range
    #[error("Invalid credit amount: {amount}")]
    InvalidCredits {
        /// The rejected credit count
        amount: i64,
    },

    /// A paid money amount that is negative or not a number
    #[error("Invalid payment amount: {amount}")]
    InvalidAmount {
        /// The rejected amount
        amount: f64,
    },

    /// A required text field was blank
    #[error("Missing required field: {field}")]
    MissingField {
        /// Name of the field
        field: &'static str,
    },

    /// Password hashing or hash parsing failed
    #[error("Password hash error: {message}")]
    PasswordHash {
        /// Description from the hasher
        message: String,
    },

    /// Configuration loading or parsing failed
    #[error("Configuration error: {message}")]
    Config {
        /// What went wrong
        message: String,
    },

    /// Database error from `SeaORM`
    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    /// Session snapshot (de)serialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
