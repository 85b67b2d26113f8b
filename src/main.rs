//! Application entry point for deadline-alerts.
//!
//! Initializes all components and starts the hourly alert scheduler.

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use deadline_alerts::config::Config;
use deadline_alerts::logging::Console;
use deadline_alerts::logging::setup_logging;
use deadline_alerts::repository::Repository;
use deadline_alerts::service::Services;
use deadline_alerts::task::alert_scheduler::AlertScheduler;
use dotenv::dotenv;
use log::debug;
use log::info;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    let init_start = Instant::now();
    let config = load_config()?;

    let db = setup_database(&config, init_start).await?;
    let services = setup_services(db, &config)?;

    let scheduler = setup_scheduler(&config, &services, init_start)?;

    run(init_start).await?;

    if let Some(scheduler) = scheduler {
        scheduler.stop()?;
    }
    Ok(())
}

fn load_config() -> Result<Arc<Config>> {
    debug!("Loading configuration...");
    let mut config = Config::new();
    config.load()?;
    let config = Arc::new(config);
    setup_logging(&config.log, Console::Stdout)?;
    info!("Starting deadline-alerts...");
    Ok(config)
}

async fn setup_database(config: &Config, init_start: Instant) -> Result<Arc<Repository>> {
    debug!("Setting up Repository...");
    let db = Arc::new(Repository::new(&config.db_url, &config.db_path).await?);

    info!("Running database migrations...");
    db.run_migrations().await?;
    info!(
        "Database setup complete ({:.2}s).",
        init_start.elapsed().as_secs_f64()
    );

    Ok(db)
}

fn setup_services(db: Arc<Repository>, config: &Config) -> Result<Arc<Services>> {
    debug!("Setting up Services...");
    Ok(Arc::new(Services::new(db, config)?))
}

fn setup_scheduler(
    config: &Config,
    services: &Services,
    init_start: Instant,
) -> Result<Option<Arc<AlertScheduler>>> {
    if !config.features.scheduler {
        info!("Scheduler disabled; alerts only run through send-alerts.");
        return Ok(None);
    }
    debug!("Setting up AlertScheduler...");

    let scheduler = AlertScheduler::new(services.alert.clone(), config.alerts.utc_offset_hours);
    scheduler.clone().start()?;

    info!(
        "Scheduler setup complete ({:.2}s).",
        init_start.elapsed().as_secs_f64()
    );
    Ok(Some(scheduler))
}

async fn run(init_start: Instant) -> Result<()> {
    info!(
        "deadline-alerts is up in {:.2}s. Press Ctrl+C to stop.",
        init_start.elapsed().as_secs_f64()
    );

    tokio::signal::ctrl_c().await?;
    info!("Ctrl+C received, shutting down.");

    Ok(())
}
