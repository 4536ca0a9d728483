use alertgate::cli::Cli;
use alertgate::config::Config;
use alertgate::core::AlarmModel;
use serial_test::serial;
use std::io::Write;
use std::path::PathBuf;
use tempfile::NamedTempFile;

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{}", content).unwrap();
    file
}

fn cli_for(file: &NamedTempFile) -> Cli {
    Cli {
        config: Some(file.path().to_path_buf()),
        ..Default::default()
    }
}

#[test]
#[serial]
fn test_load_full_valid_config() {
    let file = write_config(
        r#"
        log_level = "debug"
        alarm_model = "ISA_18_2"
        plugins = ["blackout"]
        plugins_raise_on_error = false
        notification_blackout = true
        blackout_accept = ["critical"]
        blackout_duration_seconds = 600
        [reject]
        origin_blacklist = ["^curl"]
        allowed_environments = ["Production"]
        [routing]
        rules_file = "/etc/alertgate/routing.yml"
        [server]
        listen_addr = "0.0.0.0:9000"
        [metrics]
        enabled = true
        [[blackouts]]
        environment = "Production"
        resource = "web01"
        duration = 120
    "#,
    );

    let config = Config::load(&cli_for(&file)).unwrap();

    assert_eq!(config.log_level, "debug");
    assert_eq!(config.alarm_model, AlarmModel::Isa18_2);
    assert_eq!(config.plugins, vec!["blackout"]);
    assert!(!config.plugins_raise_on_error);
    assert!(config.notification_blackout);
    assert_eq!(config.blackout_accept, vec!["critical"]);
    assert_eq!(config.blackout_duration_seconds, 600);
    assert_eq!(config.reject.origin_blacklist, vec!["^curl"]);
    assert_eq!(config.reject.allowed_environments, vec!["Production"]);
    assert_eq!(
        config.routing.rules_file,
        Some(PathBuf::from("/etc/alertgate/routing.yml"))
    );
    assert_eq!(config.server.listen_addr, "0.0.0.0:9000");
    assert!(config.metrics.enabled);
    assert_eq!(config.blackouts.len(), 1);
    assert_eq!(config.blackouts[0].resource.as_deref(), Some("web01"));
    assert_eq!(config.blackouts[0].duration, Some(120));
}

#[test]
#[serial]
fn test_load_default_values() {
    let file = write_config("");
    let config = Config::load(&cli_for(&file)).unwrap();
    assert_eq!(config, Config::default());
}

#[test]
#[serial]
fn test_environment_overrides_file() {
    let file = write_config(
        r#"
        [server]
        listen_addr = "0.0.0.0:9000"
    "#,
    );
    std::env::set_var("ALERTGATE_SERVER__LISTEN_ADDR", "127.0.0.1:9100");
    std::env::set_var("ALERTGATE_NOTIFICATION_BLACKOUT", "true");

    let config = Config::load(&cli_for(&file));
    std::env::remove_var("ALERTGATE_SERVER__LISTEN_ADDR");
    std::env::remove_var("ALERTGATE_NOTIFICATION_BLACKOUT");

    let config = config.unwrap();
    assert_eq!(config.server.listen_addr, "127.0.0.1:9100");
    assert!(config.notification_blackout);
}

#[test]
#[serial]
fn test_cli_overrides_environment() {
    let file = write_config("");
    std::env::set_var("ALERTGATE_LOG_LEVEL", "warn");

    let cli = Cli {
        config: Some(file.path().to_path_buf()),
        log_level: Some("trace".to_string()),
        plugins: Some(vec!["blackout".to_string()]),
        metrics: true,
        ..Default::default()
    };
    let config = Config::load(&cli);
    std::env::remove_var("ALERTGATE_LOG_LEVEL");

    let config = config.unwrap();
    assert_eq!(config.log_level, "trace");
    assert_eq!(config.plugins, vec!["blackout"]);
    assert!(config.metrics.enabled);
}

#[test]
#[serial]
fn test_invalid_value_type() {
    let file = write_config(
        r#"
        blackout_duration_seconds = "an hour"
    "#,
    );
    assert!(Config::load(&cli_for(&file)).is_err());
}

#[test]
#[serial]
fn test_unknown_alarm_model_is_rejected() {
    let file = write_config(
        r#"
        alarm_model = "NAGIOS"
    "#,
    );
    assert!(Config::load(&cli_for(&file)).is_err());
}
