//! Command-Line Interface (CLI) argument parsing.
//!
//! These arguments are parsed at startup and merged on top of the
//! `alertgate.toml` file and environment variables.

use clap::Parser;
use figment::{
    value::{Dict, Map, Tag, Value},
    Error, Metadata, Profile, Provider,
};
use std::path::PathBuf;

/// Routes incoming alerts through processing plugins and applies blackouts.
#[derive(Parser, Debug, Default, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Address the HTTP server listens on.
    #[arg(long, value_name = "ADDR")]
    pub listen_addr: Option<String>,

    /// Logging level (trace, debug, info, warn, error).
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Comma-separated list of plugins to enable, in order.
    #[arg(long, value_name = "NAMES", value_delimiter = ',')]
    pub plugins: Option<Vec<String>>,

    /// Accept blacked-out alerts with a blackout status instead of dropping them.
    #[arg(long)]
    pub notification_blackout: Option<bool>,

    /// Serve Prometheus metrics on `/metrics`.
    #[arg(long)]
    pub metrics: bool,
}

impl Provider for Cli {
    fn metadata(&self) -> Metadata {
        Metadata::named("Command-Line Arguments")
    }

    fn data(&self) -> Result<Map<Profile, Dict>, Error> {
        let mut dict = Dict::new();

        if let Some(addr) = &self.listen_addr {
            let mut server = Dict::new();
            server.insert("listen_addr".into(), Value::from(addr.clone()));
            dict.insert("server".into(), Value::Dict(Tag::Default, server));
        }

        if let Some(level) = &self.log_level {
            dict.insert("log_level".into(), Value::from(level.clone()));
        }

        if let Some(plugins) = &self.plugins {
            let names = plugins.iter().map(|p| Value::from(p.clone())).collect();
            dict.insert("plugins".into(), Value::Array(Tag::Default, names));
        }

        if let Some(flag) = self.notification_blackout {
            dict.insert("notification_blackout".into(), Value::from(flag));
        }

        // Only an explicit flag turns metrics on; absence leaves the file value.
        if self.metrics {
            let mut metrics = Dict::new();
            metrics.insert("enabled".into(), Value::from(true));
            dict.insert("metrics".into(), Value::Dict(Tag::Default, metrics));
        }

        let mut map = Map::new();
        map.insert(Profile::Default, dict);
        Ok(map)
    }
}
