//! Seeds configured accounts (typically the support admin) on startup.

use crate::{
    config::accounts::Config,
    core::account::{self, NewAccount},
    errors::Result,
};
use sea_orm::DatabaseConnection;
use tracing::{debug, info};

/// Creates every configured account whose email is not registered yet.
///
/// Existing accounts are left untouched, so this is safe to run on every start.
/// Returns the number of accounts created.
pub async fn seed_accounts(db: &DatabaseConnection, config: &Config) -> Result<usize> {
    let mut created = 0;

    for seed in &config.accounts {
        if account::find_by_email(db, &seed.email).await?.is_some() {
            debug!("Seed account {} already exists", seed.email);
            continue;
        }

        account::create_account(
            db,
            NewAccount {
                name: &seed.name,
                email: &seed.email,
                password: &seed.password,
                role: seed.role,
                daily_credit_limit: seed
                    .daily_credit_limit
                    .unwrap_or(config.credits.default_daily_limit),
            },
        )
        .await?;
        created += 1;
    }

    info!("Seeded {} of {} configured accounts", created, config.accounts.len());
    Ok(created)
}
