//! Periodic trigger for open-ended series.
//!
//! Each run grows every open recurring series by at most one occurrence and exits.
//! Schedule it (cron, systemd timer) at least daily.

use chrono::Local;
use cuota_series::{
    config::{database, settings},
    core::{series, store::SeaOrmStore},
    errors::Result,
};
use dotenvy::dotenv;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Load .env file (non-fatal, env vars can be set externally)
    dotenv().ok();

    // 2. Load settings, they carry the fallback log level
    let settings = settings::load_default_settings()?;

    // 3. Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&settings.log_level)),
        )
        .init();

    // 4. Connect and make sure the schema exists
    let database_url = database::get_database_url(&settings);
    let db = database::create_connection(&database_url)
        .await
        .inspect(|_| info!("Database connection established."))
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db).await?;

    // 5. Grow open series; the engine itself never reads the clock
    let today = Local::now().date_naive();
    let store = SeaOrmStore::new(db);
    let created = series::extend_all_open_series(&store, today)
        .await
        .inspect_err(|e| error!("Open series sweep failed: {}", e))?;

    info!(%today, created = created.len(), "Open series sweep complete");
    Ok(())
}
