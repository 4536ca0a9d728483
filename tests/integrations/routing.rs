use alertgate::{
    config::RoutingConfig,
    core::Alert,
    plugins::{Plugin, PluginCatalog, PluginDeps, Plugins},
    routing::{RoutingRules, RuleRouter},
};
use std::{
    fs::File,
    io::Write,
    path::PathBuf,
    sync::{Arc, Mutex},
};
use tempfile::TempDir;

#[path = "../helpers/mod.rs"]
mod helpers;
use helpers::{config_with_plugins, empty_store, mock_plugin::RecordingPlugin};

const RULES: &str = r#"
- name: production-critical
  match:
    environment: Production
    severity: [critical]
  plugins: [audit, notify]
- name: development
  match:
    environment: Development
  plugins: [audit]
- name: typo
  match:
    environment: Typo
  plugins: [does-not-exist]
"#;

fn create_rule_file(dir: &TempDir, content: &str) -> PathBuf {
    let file_path = dir.path().join("routing.yml");
    let mut file = File::create(&file_path).unwrap();
    writeln!(file, "{}", content).unwrap();
    file_path
}

fn registered(rules_file: Option<PathBuf>) -> Plugins {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let mut catalog = PluginCatalog::empty();
    for name in ["audit", "notify", "archive"] {
        let calls = calls.clone();
        catalog.insert(name, move |_| {
            Ok(Arc::new(RecordingPlugin::new(name, calls.clone())) as Arc<dyn Plugin>)
        });
    }

    let mut config = config_with_plugins(&["audit", "notify", "archive"]);
    config.routing = RoutingConfig { rules_file };
    let deps = PluginDeps {
        config: Arc::new(config),
        blackouts: empty_store(),
    };
    Plugins::register(&deps, &catalog)
}

fn routed_names(plugins: &Plugins, alert: &Alert) -> Vec<String> {
    let (selected, _) = plugins.routing(alert);
    selected.iter().map(|p| p.name().to_string()).collect()
}

#[test]
fn test_first_matching_rule_selects_plugins() {
    let dir = TempDir::new().unwrap();
    let plugins = registered(Some(create_rule_file(&dir, RULES)));

    let mut alert = Alert::new("web01", "NodeDown", "Production");
    alert.severity = "critical".to_string();
    assert_eq!(routed_names(&plugins, &alert), vec!["audit", "notify"]);

    let alert = Alert::new("web01", "NodeDown", "Development");
    assert_eq!(routed_names(&plugins, &alert), vec!["audit"]);
}

#[test]
fn test_unmatched_alert_gets_all_plugins() {
    let dir = TempDir::new().unwrap();
    let plugins = registered(Some(create_rule_file(&dir, RULES)));

    let alert = Alert::new("web01", "NodeDown", "Production");
    assert_eq!(routed_names(&plugins, &alert), vec!["audit", "notify", "archive"]);
}

#[test]
fn test_rule_naming_unknown_plugin_falls_back_to_all() {
    let dir = TempDir::new().unwrap();
    let plugins = registered(Some(create_rule_file(&dir, RULES)));

    let alert = Alert::new("web01", "NodeDown", "Typo");
    assert_eq!(routed_names(&plugins, &alert), vec!["audit", "notify", "archive"]);
}

#[test]
fn test_router_reports_unknown_plugin() {
    let router = RuleRouter::from_yaml(RULES).unwrap();
    let plugins = registered(None);
    let named: Vec<(String, Arc<dyn Plugin>)> = plugins
        .names()
        .into_iter()
        .filter_map(|n| plugins.get(&n).map(|p| (n, p)))
        .collect();

    let err = router
        .route(&Alert::new("web01", "NodeDown", "Typo"), &named)
        .err().unwrap();
    assert!(err.to_string().contains("does-not-exist"));
}

#[test]
fn test_unparseable_rules_file_is_ignored() {
    let dir = TempDir::new().unwrap();
    let plugins = registered(Some(create_rule_file(&dir, "not: [valid")));

    let alert = Alert::new("web01", "NodeDown", "Development");
    assert_eq!(routed_names(&plugins, &alert), vec!["audit", "notify", "archive"]);
}
