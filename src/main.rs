use std::sync::Arc;
use std::time::Duration;

use color_eyre::eyre::Result;
use courtcall_api::config::ApiConfig;
use courtcall_core::clock::{Clock, SystemClock};
use courtcall_db::{PgRanker, PgStore, create_pool, schema::initialize_database};
use courtcall_sms::config::SmsConfig;
use courtcall_sms::engine::Engine;
use tracing::info;
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    // Load environment variables
    dotenv::dotenv().ok();

    // Load configuration
    let config = ApiConfig::from_env()?;
    let sms_config = SmsConfig::from_env()?;

    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting CourtCall");

    // Create database connection pool and make sure the schema exists
    let db_pool = create_pool(&config.database_url).await?;
    initialize_database(&db_pool).await?;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let engine = Engine::new(
        Arc::new(PgStore::new(db_pool.clone())),
        Arc::new(PgRanker::new(db_pool)),
        clock.clone(),
    );

    // Pick up every match that was still collecting players
    let resumed = engine.resume().await?;
    info!(resumed, "Batch scheduling resumed");

    let workers = courtcall_sms::start_workers(&engine, clock, &sms_config)?;

    // Serve until Ctrl-C
    courtcall_api::start_server(&config, engine.clone()).await?;

    engine.shutdown();
    workers.shutdown();
    workers.wait_for_shutdown(Duration::from_secs(10)).await;

    Ok(())
}
