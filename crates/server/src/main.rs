mod bootstrap;
mod health;
mod sweep;
mod webhook;

use anyhow::Result;
use concierge_core::config::{AppConfig, LoadOptions};

fn init_logging(config: &AppConfig) {
    use concierge_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    // Config and logging come up before anything that could want to log.
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await?;

    health::spawn(
        &app.config.server.bind_address,
        app.config.server.health_check_port,
        app.db_pool.clone(),
    )
    .await?;

    webhook::spawn(
        &app.config.server.bind_address,
        app.config.server.webhook_port,
        webhook::WebhookState { router: app.router.clone() },
    )
    .await?;

    sweep::spawn(app.escalation.clone(), app.config.sweep.clone());

    tracing::info!(event_name = "system.server.started", "concierge-server started");

    wait_for_shutdown().await?;
    tracing::info!(event_name = "system.server.stopping", "concierge-server stopping");
    app.db_pool.close().await;

    Ok(())
}

async fn wait_for_shutdown() -> Result<()> {
    tokio::signal::ctrl_c().await?;
    Ok(())
}
