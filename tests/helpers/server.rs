//! An application bound to an ephemeral port for HTTP tests.

use alertgate::{
    app::App,
    blackout::BlackoutStore,
    config::{Config, ServerConfig},
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tokio::sync::watch;

pub struct TestServer {
    base_url: String,
    shutdown_tx: watch::Sender<bool>,
    app: App,
}

impl TestServer {
    pub async fn start(config: Config, store: Option<Arc<dyn BlackoutStore>>) -> Self {
        Self::start_with_metrics(config, store, None).await
    }

    pub async fn start_with_metrics(
        config: Config,
        store: Option<Arc<dyn BlackoutStore>>,
        prom_handle: Option<PrometheusHandle>,
    ) -> Self {
        let config = Config {
            server: ServerConfig {
                listen_addr: "127.0.0.1:0".to_string(),
            },
            ..config
        };
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let mut builder = App::builder(config);
        if let Some(store) = store {
            builder = builder.blackout_store(store);
        }
        if let Some(handle) = prom_handle {
            builder = builder.prom_handle(handle);
        }
        let app = builder.build(shutdown_rx).await.unwrap();
        Self {
            base_url: format!("http://{}", app.local_addr()),
            shutdown_tx,
            app,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn shutdown(self) {
        self.shutdown_tx.send(true).unwrap();
        self.app.run().await.unwrap();
    }
}
