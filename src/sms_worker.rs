//! Runs only the outbox delivery worker and the feedback sweep, for
//! deployments that keep the HTTP server in a separate process.

use std::sync::Arc;
use std::time::Duration;

use color_eyre::eyre::{Result, WrapErr};
use courtcall_api::config::parse_log_level;
use courtcall_core::clock::{Clock, SystemClock};
use courtcall_db::{PgRanker, PgStore, create_pool, schema::initialize_database};
use courtcall_sms::config::SmsConfig;
use courtcall_sms::engine::Engine;
use tracing::info;
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    dotenv::dotenv().ok();

    let level = parse_log_level(&std::env::var("LOG_LEVEL").unwrap_or_default());
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let database_url = std::env::var("DATABASE_URL")
        .wrap_err("DATABASE_URL environment variable must be set")?;
    let sms_config = SmsConfig::from_env()?;

    info!("Starting CourtCall SMS worker");

    let db_pool = create_pool(&database_url).await?;
    initialize_database(&db_pool).await?;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let engine = Engine::new(
        Arc::new(PgStore::new(db_pool.clone())),
        Arc::new(PgRanker::new(db_pool)),
        clock.clone(),
    );

    let workers = courtcall_sms::start_workers(&engine, clock, &sms_config)?;

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");
    workers.shutdown();
    workers.wait_for_shutdown(Duration::from_secs(10)).await;

    Ok(())
}
