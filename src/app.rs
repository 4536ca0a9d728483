//! The main application logic, decoupled from the entry point.

use crate::{
    blackout::{BlackoutStore, InMemoryBlackoutStore},
    config::Config,
    pipeline::AlertPipeline,
    plugins::{PluginCatalog, PluginDeps, Plugins},
    server::{AlertServer, AppState},
};
use anyhow::{Context, Result};
use chrono::Utc;
use metrics_exporter_prometheus::PrometheusHandle;
use std::{net::SocketAddr, sync::Arc};
use tokio::{net::TcpListener, sync::watch, task::JoinHandle};
use tracing::{info, instrument};

/// A handle to the running application.
pub struct App {
    local_addr: SocketAddr,
    server_handle: JoinHandle<()>,
    pipeline: Arc<AlertPipeline>,
}

impl App {
    /// Creates a new `AppBuilder` to construct an `App`.
    pub fn builder(config: Config) -> AppBuilder {
        AppBuilder::new(config)
    }

    /// The address the HTTP server is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn pipeline(&self) -> &Arc<AlertPipeline> {
        &self.pipeline
    }

    /// Waits for the server task to finish after the shutdown signal.
    pub async fn run(self) -> Result<()> {
        self.server_handle.await.context("Alert server task panicked")?;
        info!("All tasks shut down.");
        Ok(())
    }
}

/// Builder for the main application.
///
/// Separates constructing the components from running them and lets tests
/// override the plugin catalog and the blackout store.
pub struct AppBuilder {
    config: Config,
    catalog: Option<PluginCatalog>,
    blackout_store: Option<Arc<dyn BlackoutStore>>,
    prom_handle: Option<PrometheusHandle>,
}

impl AppBuilder {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            catalog: None,
            blackout_store: None,
            prom_handle: None,
        }
    }

    /// Overrides the plugin catalog. Defaults to the built-in plugins.
    pub fn catalog(mut self, catalog: PluginCatalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Overrides the blackout store. Defaults to an in-memory store seeded
    /// from `config.blackouts`.
    pub fn blackout_store(mut self, store: Arc<dyn BlackoutStore>) -> Self {
        self.blackout_store = Some(store);
        self
    }

    /// Serves the given Prometheus handle on `/metrics`.
    pub fn prom_handle(mut self, handle: PrometheusHandle) -> Self {
        self.prom_handle = Some(handle);
        self
    }

    /// Registers plugins, binds the listener and spawns the server.
    #[instrument(skip_all)]
    pub async fn build(self, shutdown_rx: watch::Receiver<bool>) -> Result<App> {
        let config = Arc::new(self.config);

        let blackouts = match self.blackout_store {
            Some(store) => store,
            None => {
                let now = Utc::now();
                let default_duration = config
                    .blackout_duration()
                    .context("Invalid blackout_duration_seconds")?;
                let seeded = config
                    .blackouts
                    .iter()
                    .cloned()
                    .map(|b| b.into_blackout(now, default_duration))
                    .collect::<Result<Vec<_>, _>>()
                    .context("Invalid blackout in configuration")?;
                Arc::new(InMemoryBlackoutStore::with_blackouts(seeded)) as Arc<dyn BlackoutStore>
            }
        };

        let deps = PluginDeps {
            config: config.clone(),
            blackouts: blackouts.clone(),
        };
        let catalog = self.catalog.unwrap_or_default();
        let plugins = Arc::new(Plugins::register(&deps, &catalog));
        let pipeline = Arc::new(AlertPipeline::new(plugins));

        let listener = TcpListener::bind(config.server.listen_addr.as_str())
            .await
            .with_context(|| format!("Failed to bind {}", config.server.listen_addr))?;
        let local_addr = listener.local_addr()?;

        let state = AppState {
            pipeline: pipeline.clone(),
            blackouts,
            config,
            prom_handle: self.prom_handle,
        };
        let server = AlertServer::new(listener, state, shutdown_rx);
        let server_handle = tokio::spawn(server.run());

        Ok(App {
            local_addr,
            server_handle,
            pipeline,
        })
    }
}
