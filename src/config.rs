//! Configuration management for alertgate
//!
//! This module defines the main `Config` struct and its sub-structs. It uses
//! the `figment` crate to layer defaults, an `alertgate.toml` file,
//! `ALERTGATE_`-prefixed environment variables and command-line arguments.

use crate::blackout::{duration_from_secs, BlackoutError, NewBlackout};
use crate::cli::Cli;
use crate::core::AlarmModel;
use anyhow::Result;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// The configuration file read when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "alertgate.toml";

/// The main configuration struct for the application.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// The logging level for the application.
    pub log_level: String,
    /// Decides the status assigned to alerts accepted during blackout.
    pub alarm_model: AlarmModel,
    /// Names of the plugins to enable, in evaluation order.
    pub plugins: Vec<String>,
    /// Fail the request when a plugin errors instead of logging and skipping it.
    pub plugins_raise_on_error: bool,
    /// Accept blacked-out alerts with a blackout status instead of dropping them.
    pub notification_blackout: bool,
    /// Severities let through during blackout when notification blackout is off.
    pub blackout_accept: Vec<String>,
    /// Default length of a blackout created without an end time.
    pub blackout_duration_seconds: u64,
    /// Blackout periods loaded at startup.
    pub blackouts: Vec<NewBlackout>,
    pub reject: RejectConfig,
    pub routing: RoutingConfig,
    pub server: ServerConfig,
    pub metrics: MetricsConfig,
}

/// Configuration for the `reject` plugin.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct RejectConfig {
    /// Regular expressions matched against the alert origin.
    pub origin_blacklist: Vec<String>,
    /// Environments alerts are allowed to come from.
    pub allowed_environments: Vec<String>,
}

impl Default for RejectConfig {
    fn default() -> Self {
        Self {
            origin_blacklist: vec![],
            allowed_environments: vec!["Production".to_string(), "Development".to_string()],
        }
    }
}

/// Configuration for plugin routing rules.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
#[serde(default)]
pub struct RoutingConfig {
    /// A YAML file of routing rules. Without it every plugin sees every alert.
    pub rules_file: Option<PathBuf>,
}

/// Configuration for the HTTP server.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8080".to_string(),
        }
    }
}

/// Configuration for the Prometheus metrics endpoint.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
}

impl Config {
    /// Loads the application configuration by layering defaults, the TOML
    /// file, environment variables and command-line arguments.
    pub fn load(cli: &Cli) -> Result<Self> {
        let config_path = cli
            .config
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(config_path))
            // e.g. ALERTGATE_SERVER__LISTEN_ADDR=0.0.0.0:9000
            .merge(Env::prefixed("ALERTGATE_").split("__"))
            .merge(cli.clone())
            .extract()?;
        Ok(config)
    }

    /// The default blackout duration as a `chrono::Duration`.
    pub fn blackout_duration(&self) -> Result<chrono::Duration, BlackoutError> {
        duration_from_secs(self.blackout_duration_seconds)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            alarm_model: AlarmModel::Alerta,
            plugins: vec!["reject".to_string(), "blackout".to_string()],
            plugins_raise_on_error: true,
            notification_blackout: false,
            blackout_accept: vec![],
            blackout_duration_seconds: 3600,
            blackouts: vec![],
            reject: RejectConfig::default(),
            routing: RoutingConfig::default(),
            server: ServerConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}
