//! Runs alerts, status changes and actions through the routed plugins.

use crate::core::{Alert, PluginContext, ProcessOverrides};
use crate::plugins::{Plugin, PluginError, Plugins};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, instrument, warn};

/// Why processing an alert did not produce an accepted alert.
#[derive(Error, Debug)]
pub enum ProcessError {
    /// Dropped because it falls inside a blackout period.
    #[error("{0}")]
    Blackout(String),
    /// Refused by a policy plugin.
    #[error("{0}")]
    Rejected(String),
    #[error("Error while running {hook} plugin '{plugin}': {cause:#}")]
    PluginFailed {
        plugin: String,
        hook: &'static str,
        cause: anyhow::Error,
    },
}

/// Drives the enabled plugins for each alert.
pub struct AlertPipeline {
    plugins: Arc<Plugins>,
}

impl AlertPipeline {
    pub fn new(plugins: Arc<Plugins>) -> Self {
        Self { plugins }
    }

    pub fn plugins(&self) -> &Arc<Plugins> {
        &self.plugins
    }

    /// Runs `pre_receive` on every routed plugin, then `post_receive` unless
    /// the alert ended up in blackout status.
    #[instrument(skip_all, fields(alert_id = %alert.id))]
    pub async fn process_alert(
        &self,
        alert: Alert,
        overrides: ProcessOverrides,
    ) -> Result<Alert, ProcessError> {
        metrics::counter!("alerts_received_total").increment(1);
        let result = self.run_alert(alert, overrides).await;
        match &result {
            Ok(_) => metrics::counter!("alerts_accepted_total").increment(1),
            Err(ProcessError::Blackout(_)) => metrics::counter!("alerts_blackout_total").increment(1),
            Err(ProcessError::Rejected(_)) => metrics::counter!("alerts_rejected_total").increment(1),
            Err(ProcessError::PluginFailed { .. }) => {
                metrics::counter!("alerts_failed_total").increment(1)
            }
        }
        result
    }

    async fn run_alert(
        &self,
        mut alert: Alert,
        overrides: ProcessOverrides,
    ) -> Result<Alert, ProcessError> {
        let (wanted, config) = self.plugins.routing(&alert);
        let ctx = PluginContext {
            config: config.clone(),
            notification_blackout: overrides.notification_blackout,
        };

        for plugin in &wanted {
            match plugin.pre_receive(alert.clone(), &ctx).await {
                Ok(updated) => alert = updated,
                Err(e) => self.handle_error(plugin.as_ref(), "pre_receive", e)?,
            }
        }

        if alert.status == config.alarm_model.blackout_status() {
            debug!("Alert in blackout status, skipping post_receive plugins");
            return Ok(alert);
        }

        for plugin in &wanted {
            match plugin.post_receive(&alert, &ctx).await {
                Ok(Some(updated)) => alert = updated,
                Ok(None) => {}
                Err(e) => self.handle_error(plugin.as_ref(), "post_receive", e)?,
            }
        }
        Ok(alert)
    }

    /// Runs `status_change` on every routed plugin, threading any status and
    /// text a plugin returns into the next one.
    #[instrument(skip_all, fields(alert_id = %alert.id, status = %status))]
    pub async fn process_status(
        &self,
        mut alert: Alert,
        status: &str,
        text: &str,
    ) -> Result<(Alert, String, String), ProcessError> {
        let (wanted, config) = self.plugins.routing(&alert);
        let ctx = PluginContext::new(config);
        let mut status = status.to_string();
        let mut text = text.to_string();

        for plugin in &wanted {
            match plugin.status_change(&alert, &status, &text, &ctx).await {
                Ok(Some(change)) => {
                    alert = change.alert;
                    status = change.status;
                    text = change.text;
                }
                Ok(None) => {}
                Err(PluginError::NotImplemented) => {}
                Err(e) => self.handle_error(plugin.as_ref(), "status_change", e)?,
            }
        }
        Ok((alert, status, text))
    }

    /// Runs `take_action` on every routed plugin. Plugins that do not
    /// implement actions are skipped.
    #[instrument(skip_all, fields(alert_id = %alert.id, action = %action))]
    pub async fn process_action(
        &self,
        mut alert: Alert,
        action: &str,
        text: &str,
    ) -> Result<(Alert, String, String), ProcessError> {
        let (wanted, config) = self.plugins.routing(&alert);
        let ctx = PluginContext::new(config);
        let mut action = action.to_string();
        let mut text = text.to_string();

        for plugin in &wanted {
            match plugin.take_action(&alert, &action, &text, &ctx).await {
                Ok(Some(change)) => {
                    alert = change.alert;
                    action = change.action;
                    text = change.text;
                }
                Ok(None) => {}
                Err(PluginError::NotImplemented) => {
                    debug!(plugin = plugin.name(), "Plugin does not implement take_action");
                }
                Err(e) => self.handle_error(plugin.as_ref(), "take_action", e)?,
            }
        }
        Ok((alert, action, text))
    }

    /// Blackout and rejection always stop processing. Other failures stop it
    /// only when `plugins_raise_on_error` is set.
    fn handle_error(
        &self,
        plugin: &dyn Plugin,
        hook: &'static str,
        err: PluginError,
    ) -> Result<(), ProcessError> {
        match err {
            PluginError::BlackoutPeriod(msg) => Err(ProcessError::Blackout(msg)),
            PluginError::Rejected(msg) => Err(ProcessError::Rejected(msg)),
            PluginError::NotImplemented => {
                warn!(plugin = plugin.name(), hook, "Plugin hook not implemented");
                Ok(())
            }
            PluginError::Other(cause) => {
                if self.plugins.config().plugins_raise_on_error {
                    Err(ProcessError::PluginFailed {
                        plugin: plugin.name().to_string(),
                        hook,
                        cause,
                    })
                } else {
                    error!(plugin = plugin.name(), hook, "Error while running plugin: {:#}", cause);
                    Ok(())
                }
            }
        }
    }
}
