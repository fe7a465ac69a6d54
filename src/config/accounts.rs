//! Account and credit configuration loading from config.toml
//!
//! The `[credits]` table sets the daily limit given to new registrations and
//! the per-generation cost. `[[accounts]]` entries are seeded into the
//! database on startup when their email is not registered yet.

use crate::entities::Role;
use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;

/// Daily credit limit for a fresh registration
pub const DEFAULT_DAILY_CREDIT_LIMIT: i64 = 25;

/// Credits debited per successful image generation
pub const GENERATION_COST: i64 = 5;

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Credit settings
    #[serde(default)]
    pub credits: CreditSettings,
    /// Accounts to seed
    #[serde(default)]
    pub accounts: Vec<AccountConfig>,
}

/// Credit amounts used across the application
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct CreditSettings {
    /// Limit (and starting balance) for new registrations
    #[serde(default = "default_daily_limit")]
    pub default_daily_limit: i64,
    /// Cost of one generation
    #[serde(default = "default_generation_cost")]
    pub generation_cost: i64,
}

impl Default for CreditSettings {
    fn default() -> Self {
        Self {
            default_daily_limit: DEFAULT_DAILY_CREDIT_LIMIT,
            generation_cost: GENERATION_COST,
        }
    }
}

const fn default_daily_limit() -> i64 {
    DEFAULT_DAILY_CREDIT_LIMIT
}

const fn default_generation_cost() -> i64 {
    GENERATION_COST
}

/// Configuration for a single seeded account
#[derive(Debug, Deserialize, Clone)]
pub struct AccountConfig {
    /// Display name
    pub name: String,
    /// Login email
    pub email: String,
    /// Plain-text password, hashed before it is stored
    pub password: String,
    /// Account role, `user` when omitted
    #[serde(default = "default_role")]
    pub role: Role,
    /// Daily limit, falls back to `[credits] default_daily_limit`
    #[serde(default)]
    pub daily_credit_limit: Option<i64>,
}

const fn default_role() -> Role {
    Role::User
}

/// Loads account configuration from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - A credit amount is negative
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| Error::Config {
        message: format!("Failed to read config file: {e}"),
    })?;

    parse_config(&contents)
}

/// Loads account configuration from the default location (./config.toml)
pub fn load_default_config() -> Result<Config> {
    load_config("config.toml")
}

fn parse_config(contents: &str) -> Result<Config> {
    let config: Config = toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })?;

    if config.credits.default_daily_limit < 0 || config.credits.generation_cost < 0 {
        return Err(Error::Config {
            message: "Credit amounts in [credits] must not be negative".to_string(),
        });
    }
    if let Some(account) = config
        .accounts
        .iter()
        .find(|a| a.daily_credit_limit.is_some_and(|limit| limit < 0))
    {
        return Err(Error::Config {
            message: format!("Negative daily_credit_limit for {}", account.email),
        });
    }

    Ok(config)
}
