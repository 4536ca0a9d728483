//! The default blackout suppression plugin.
//!
//! Alerts matching an active blackout period are dropped, which the HTTP
//! layer reports as `202 Accepted`. When notification blackout is enabled the
//! alert is kept but its status is set to the alarm model's blackout status,
//! so later plugins do not notify on it.

use super::{Plugin, PluginError};
use crate::blackout::BlackoutStore;
use crate::core::{Alert, PluginContext};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tracing::debug;

/// Environment variable that overrides the configured notification blackout flag.
pub const NOTIFICATION_BLACKOUT_ENV: &str = "NOTIFICATION_BLACKOUT";

pub struct BlackoutHandler {
    store: Arc<dyn BlackoutStore>,
}

impl BlackoutHandler {
    pub fn new(store: Arc<dyn BlackoutStore>) -> Self {
        Self { store }
    }

    /// Resolves the notification blackout flag. A per-call override beats the
    /// environment variable, which beats the configuration file.
    fn notification_blackout(ctx: &PluginContext) -> bool {
        if let Some(flag) = ctx.notification_blackout {
            return flag;
        }
        std::env::var(NOTIFICATION_BLACKOUT_ENV)
            .ok()
            .filter(|v| !v.is_empty())
            .and_then(|v| parse_bool(&v))
            .unwrap_or(ctx.config.notification_blackout)
    }
}

/// Parses the usual spellings of a boolean environment value.
pub(crate) fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[async_trait]
impl Plugin for BlackoutHandler {
    fn name(&self) -> &str {
        "blackout"
    }

    async fn pre_receive(&self, mut alert: Alert, ctx: &PluginContext) -> Result<Alert, PluginError> {
        let notification_blackout = Self::notification_blackout(ctx);
        let status = ctx.config.alarm_model.blackout_status();

        if alert.is_blackout(&ctx.config, self.store.as_ref(), Utc::now()) {
            if notification_blackout {
                debug!(alert_id = %alert.id, status, "Set status during blackout period");
                alert.status = status.to_string();
            } else {
                debug!(alert_id = %alert.id, "Suppressed alert during blackout period");
                return Err(PluginError::BlackoutPeriod(
                    "Suppressed alert during blackout period".to_string(),
                ));
            }
        }
        Ok(alert)
    }
}
