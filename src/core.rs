//! Core domain types for alertgate
//!
//! This module defines the alert structure that flows through the plugin
//! pipeline, the alarm models that decide which status a blacked-out alert
//! receives, and the per-call context handed to every plugin hook.

use crate::blackout::BlackoutStore;
use crate::config::Config;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// An alert as received from a monitoring source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    /// Unique identifier, generated when the sender omits it.
    #[serde(default = "new_alert_id")]
    pub id: String,
    /// The resource under alarm (host, service instance, ...).
    pub resource: String,
    /// Event name, e.g. "NodeDown".
    pub event: String,
    #[serde(default)]
    pub environment: String,
    #[serde(default = "default_severity")]
    pub severity: String,
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default)]
    pub service: Vec<String>,
    #[serde(default = "default_group")]
    pub group: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub origin: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer: Option<String>,
    #[serde(default = "Utc::now")]
    pub create_time: DateTime<Utc>,
}

fn new_alert_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn default_severity() -> String {
    "normal".to_string()
}

fn default_status() -> String {
    "open".to_string()
}

fn default_group() -> String {
    "Misc".to_string()
}

impl Alert {
    /// Creates a new alert with default severity, status and group.
    pub fn new(resource: &str, event: &str, environment: &str) -> Self {
        Self {
            id: new_alert_id(),
            resource: resource.to_string(),
            event: event.to_string(),
            environment: environment.to_string(),
            severity: default_severity(),
            status: default_status(),
            service: Vec::new(),
            group: default_group(),
            value: String::new(),
            text: String::new(),
            tags: Vec::new(),
            attributes: serde_json::Map::new(),
            origin: String::new(),
            customer: None,
            create_time: Utc::now(),
        }
    }

    /// Returns `true` if the alert falls inside an active blackout period.
    ///
    /// When notification blackout is disabled, severities listed in
    /// `blackout_accept` are let through regardless of any blackout.
    pub fn is_blackout(&self, config: &Config, store: &dyn BlackoutStore, now: DateTime<Utc>) -> bool {
        if !config.notification_blackout
            && config.blackout_accept.iter().any(|s| s == &self.severity)
        {
            return false;
        }
        store.is_blackout_period(self, now)
    }
}

/// The alarm model in use, which decides the status assigned during blackout.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum AlarmModel {
    #[default]
    #[serde(rename = "ALERTA")]
    Alerta,
    #[serde(rename = "ISA_18_2")]
    Isa18_2,
}

impl AlarmModel {
    /// The status an alert takes when it is accepted during a blackout period.
    pub fn blackout_status(&self) -> &'static str {
        match self {
            AlarmModel::Alerta => "blackout",
            AlarmModel::Isa18_2 => "OOSRV",
        }
    }
}

/// Context passed to every plugin hook.
#[derive(Debug, Clone)]
pub struct PluginContext {
    pub config: Arc<Config>,
    /// Per-call override of the notification blackout flag.
    pub notification_blackout: Option<bool>,
}

impl PluginContext {
    pub fn new(config: Arc<Config>) -> Self {
        Self {
            config,
            notification_blackout: None,
        }
    }
}

/// Optional per-request overrides supplied when processing an alert.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ProcessOverrides {
    pub notification_blackout: Option<bool>,
}
