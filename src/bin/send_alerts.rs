//! Sends deadline alerts to a single user right now, ignoring their alert hour.
//!
//! Usage: `send-alerts <username>`

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use anyhow::Result;
use chrono::Utc;
use deadline_alerts::config::Config;
use deadline_alerts::logging::Console;
use deadline_alerts::logging::setup_logging;
use deadline_alerts::repository::Repository;
use deadline_alerts::service::Services;
use deadline_alerts::service::error::AlertError;
use deadline_alerts::task::alert_scheduler::local_time;
use dotenv::dotenv;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenv().ok();

    let Some(username) = std::env::args().nth(1) else {
        eprintln!("Usage: send-alerts <username>");
        return Ok(ExitCode::from(2));
    };

    let mut config = Config::new();
    config.load()?;
    setup_logging(&config.log, Console::Stderr)?;

    let db = Arc::new(Repository::new(&config.db_url, &config.db_path).await?);
    db.run_migrations().await?;
    let services = Services::new(db, &config)?;

    let today = local_time(Utc::now(), config.alerts.utc_offset_hours).date();
    match services.alert.run_alerts_for_subscriber(&username, today).await {
        Ok(result) => {
            println!(
                "{}",
                serde_json::to_string_pretty(&result).context("Failed to serialize result")?
            );
            Ok(ExitCode::SUCCESS)
        }
        Err(e @ AlertError::SubscriberNotFound { .. }) => {
            eprintln!("{e}");
            Ok(ExitCode::FAILURE)
        }
        Err(e) => Err(e.into()),
    }
}
