//! User entity - Represents an account that spends credits.
//!
//! Users hold a credit balance that is refilled to their daily limit once per
//! calendar day. Admin accounts are exempt from spending and refills.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Account role
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Regular account, charged per generation
    #[sea_orm(string_value = "user")]
    User,
    /// Admin account with unlimited credits and access to the admin console
    #[sea_orm(string_value = "admin")]
    Admin,
}

impl Role {
    /// Whether this role is exempt from credit deduction and daily resets
    #[must_use]
    pub const fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }
}

/// User database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    /// Unique identifier for the user
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display name
    pub name: String,
    /// Login email as entered at registration
    pub email: String,
    /// Trimmed, Unicode-lowercased email; the uniqueness and lookup key
    #[sea_orm(unique)]
    pub email_key: String,
    /// Argon2id hash in PHC string format
    pub password_hash: String,
    /// Account role
    pub role: Role,
    /// Credits available to spend right now
    pub current_credits: i64,
    /// Credits granted on each daily reset
    pub daily_credit_limit: i64,
    /// When credits were last refilled
    pub last_credit_reset: DateTimeUtc,
    /// Banned accounts cannot log in and lose any open session
    pub is_banned: bool,
    /// When the account was registered
    pub created_at: DateTimeUtc,
}

impl Model {
    /// Shorthand for `self.role.is_admin()`
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

/// Payment requests reference users by id only, so requests survive their user.
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
