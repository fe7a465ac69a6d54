/// Database configuration and connection management
pub mod database;

/// Credit settings and seed accounts from config.toml
pub mod accounts;
