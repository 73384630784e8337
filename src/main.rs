//! Betbook server entry point: logging, config, store init, demo
//! seeding, and the API loop.

use anyhow::{Context, Result};
use betbook::api::{ApiConfig, ApiServer, AppState};
use betbook::store::Database;
use chrono::Utc;
use std::sync::Arc;
use tracing::info;

/// Default database path
const DEFAULT_DB_PATH: &str = "./data/betbook.db";

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("betbook=info".parse().unwrap()),
        )
        .init();

    let db_path = std::env::var("BETBOOK_DB").unwrap_or_else(|_| DEFAULT_DB_PATH.to_string());
    info!("[DB] Initializing database at: {}", db_path);

    let db = Database::open(&db_path).context("Failed to open database")?;
    db.initialize()
        .context("Failed to initialize database schema")?;

    seed_demo_events(&db)?;
    info!("[DB] {} events on the book", db.event_count()?);

    let state = Arc::new(AppState::new(db));
    let server = ApiServer::with_config(state, ApiConfig::from_env());
    server.run().await
}

/// Insert the demo events on first startup.
fn seed_demo_events(db: &Database) -> Result<()> {
    if db.event_count()? > 0 {
        return Ok(());
    }

    db.insert_event("Team A vs Team B", Utc::now())?;
    db.insert_event("Player X vs Player Y", Utc::now())?;
    info!("Seeded demo events");
    Ok(())
}
