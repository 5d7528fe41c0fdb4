//! One-shot matching run for the deployment named by `DEPLOYMENT_ID`.
//!
//! Meant to be invoked by an external scheduler (e.g. a cron job).
//! Exits 0 on success, 1 on any failure.

use coffee_match::bootstrap::build_engine;
use coffee_match::config::Settings;
use coffee_match::logging;
use std::process::ExitCode;
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();

    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    logging::init(&settings.logging.level, &settings.logging.format);

    let deployment_id = match std::env::var("DEPLOYMENT_ID") {
        Ok(id) if !id.trim().is_empty() => id,
        _ => {
            error!("No deployment ID provided");
            return ExitCode::FAILURE;
        }
    };

    info!("Running matching for deployment {}", deployment_id);

    let engine = match build_engine(&settings).await {
        Ok((engine, _)) => engine,
        Err(e) => {
            error!("Failed to initialize stores: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match engine.run(&deployment_id).await {
        Ok(matches) => {
            info!("Created {} matches for deployment {}", matches.len(), deployment_id);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Error running matching for deployment {}: {}", deployment_id, e);
            ExitCode::FAILURE
        }
    }
}
