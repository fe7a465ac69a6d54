use aozora_credits::{
    config::{self, accounts::Config},
    core::{account, payment, seed},
    entities::PaymentStatus,
    errors::Result,
};
use dotenvy::dotenv;
use std::path::Path;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const CONFIG_PATH: &str = "config.toml";

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file, non-fatal since env vars can be set externally
    dotenv().ok();

    // 3. Load credit settings and seed accounts
    let app_config = if Path::new(CONFIG_PATH).exists() {
        config::accounts::load_config(CONFIG_PATH)
            .inspect_err(|e| error!("Failed to load {}: {}", CONFIG_PATH, e))?
    } else {
        warn!("{} not found, using default credit settings", CONFIG_PATH);
        Config::default()
    };

    // 4. Connect and make sure the tables exist
    let db = config::database::create_connection()
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    config::database::create_tables(&db)
        .await
        .inspect(|_| info!("Database initialized successfully."))?;

    // 5. Seed configured accounts
    seed::seed_accounts(&db, &app_config).await?;

    // 6. Summarize state for the operator
    let users = account::list_users(&db).await?;
    let banned = users.iter().filter(|u| u.is_banned).count();
    let pending = payment::list_payment_requests(&db, None)
        .await?
        .into_iter()
        .filter(|r| r.status == PaymentStatus::Pending)
        .count();

    info!(
        "{} accounts ({} banned), {} payment requests awaiting review, {} credits per generation",
        users.len(),
        banned,
        pending,
        app_config.credits.generation_cost
    );

    Ok(())
}
