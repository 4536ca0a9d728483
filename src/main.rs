//! alertgate - alert receiver with pluggable processing.

use alertgate::{app::App, cli::Cli, config::Config};
use anyhow::Result;
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration by layering sources: defaults, file, environment, and CLI args.
    let config = match Config::load(&cli) {
        Ok(config) => config,
        Err(err) => {
            tracing_subscriber::fmt().init();
            error!("Failed to load configuration: {}", err);
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    info!("alertgate starting up...");
    info!("-------------------- Configuration --------------------");
    info!("Log Level: {}", config.log_level);
    info!("Alarm Model: {:?}", config.alarm_model);
    info!("Plugins: {}", config.plugins.join(", "));
    info!("Plugins Raise On Error: {}", config.plugins_raise_on_error);
    info!("Notification Blackout: {}", config.notification_blackout);
    info!("Blackout Duration: {}s", config.blackout_duration_seconds);
    info!("Configured Blackouts: {}", config.blackouts.len());
    match &config.routing.rules_file {
        Some(path) => info!("Routing Rules: {}", path.display()),
        None => info!("Routing Rules: Not configured"),
    }
    info!("Listen Address: {}", config.server.listen_addr);
    info!(
        "Metrics: {}",
        if config.metrics.enabled { "Enabled" } else { "Disabled" }
    );
    info!("-------------------------------------------------------");

    let mut builder = App::builder(config.clone());
    if config.metrics.enabled {
        let handle = PrometheusBuilder::new().install_recorder()?;
        builder = builder.prom_handle(handle);
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let app = builder.build(shutdown_rx).await?;
    info!("alertgate initialized successfully on {}", app.local_addr());

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received. Shutting down gracefully...");
    if shutdown_tx.send(true).is_err() {
        error!("Server already stopped before shutdown signal was sent.");
    }

    app.run().await
}
