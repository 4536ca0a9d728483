use alertgate::{
    config::Config,
    core::{Alert, ProcessOverrides},
    pipeline::AlertPipeline,
    plugins::{PluginCatalog, PluginDeps, Plugins},
};
use metrics_exporter_prometheus::PrometheusBuilder;
use serial_test::serial;
use std::sync::Arc;

#[path = "../helpers/mod.rs"]
mod helpers;
use helpers::{server::TestServer, store_with_active_blackout};

#[test]
#[serial]
fn test_alert_outcomes_move_their_counters() {
    std::env::remove_var("NOTIFICATION_BLACKOUT");
    let recorder = PrometheusBuilder::new().build_recorder();
    let handle = recorder.handle();

    let deps = PluginDeps {
        config: Arc::new(Config::default()),
        blackouts: store_with_active_blackout("Production"),
    };
    let pipeline = AlertPipeline::new(Arc::new(Plugins::register(
        &deps,
        &PluginCatalog::default(),
    )));

    // The local recorder is per thread, so drive the pipeline on this one.
    metrics::with_local_recorder(&recorder, || {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        runtime.block_on(async {
            for environment in ["Development", "Production", "Staging"] {
                let _ = pipeline
                    .process_alert(
                        Alert::new("web01", "NodeDown", environment),
                        ProcessOverrides::default(),
                    )
                    .await;
            }
        });
    });

    let rendered = handle.render();
    for line in [
        "alerts_received_total 3",
        "alerts_accepted_total 1",
        "alerts_blackout_total 1",
        "alerts_rejected_total 1",
    ] {
        assert!(
            rendered.lines().any(|l| l == line),
            "Metrics output should contain '{}'. Got:\n{}",
            line,
            rendered
        );
    }
    assert!(!rendered.contains("alerts_failed_total"));
}

#[tokio::test]
async fn test_metrics_route_serves_the_handle() {
    let recorder = PrometheusBuilder::new().build_recorder();
    let handle = recorder.handle();
    metrics::with_local_recorder(&recorder, || {
        metrics::counter!("alerts_received_total").increment(2);
    });
    let server = TestServer::start_with_metrics(Config::default(), None, Some(handle)).await;

    let response = reqwest::get(server.url("/metrics")).await.unwrap();
    assert_eq!(response.status(), 200);
    let text = response.text().await.unwrap();
    assert!(
        text.contains("alerts_received_total 2"),
        "Metrics output should contain 'alerts_received_total 2'. Got:\n{}",
        text
    );

    server.shutdown().await;
}

#[tokio::test]
async fn test_metrics_route_absent_without_handle() {
    let server = TestServer::start(Config::default(), None).await;

    let response = reqwest::get(server.url("/metrics")).await.unwrap();
    assert_eq!(response.status(), 404);

    server.shutdown().await;
}
