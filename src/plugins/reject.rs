//! Rejects alerts from blacklisted origins or disallowed environments.

use super::{Plugin, PluginError};
use crate::config::RejectConfig;
use crate::core::{Alert, PluginContext};
use anyhow::{Context, Result};
use async_trait::async_trait;
use regex::Regex;
use tracing::{debug, warn};

/// Comma-separated origin patterns that replace the configured blacklist.
pub const ORIGIN_BLACKLIST_ENV: &str = "ORIGIN_BLACKLIST";
/// Comma-separated environments that replace the configured allow list.
pub const ALLOWED_ENVIRONMENTS_ENV: &str = "ALLOWED_ENVIRONMENTS";

pub struct RejectPolicy {
    origin_blacklist: Vec<Regex>,
    allowed_environments: Vec<String>,
}

impl RejectPolicy {
    /// Builds the policy from configuration, letting the environment
    /// variables override each list.
    pub fn from_config(config: &RejectConfig) -> Result<Self> {
        let patterns = env_list(ORIGIN_BLACKLIST_ENV).unwrap_or_else(|| config.origin_blacklist.clone());
        let allowed_environments =
            env_list(ALLOWED_ENVIRONMENTS_ENV).unwrap_or_else(|| config.allowed_environments.clone());

        let origin_blacklist = patterns
            .iter()
            .map(|p| {
                Regex::new(p).with_context(|| format!("Invalid origin blacklist pattern '{}'", p))
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(
            blacklist = origin_blacklist.len(),
            ?allowed_environments,
            "Reject policy configured"
        );
        Ok(Self {
            origin_blacklist,
            allowed_environments,
        })
    }
}

fn env_list(key: &str) -> Option<Vec<String>> {
    let value = std::env::var(key).ok()?;
    Some(
        value
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect(),
    )
}

#[async_trait]
impl Plugin for RejectPolicy {
    fn name(&self) -> &str {
        "reject"
    }

    async fn pre_receive(&self, alert: Alert, _ctx: &PluginContext) -> Result<Alert, PluginError> {
        if self.origin_blacklist.iter().any(|re| re.is_match(&alert.origin)) {
            warn!(alert_id = %alert.id, origin = %alert.origin, "Rejected alert from blacklisted origin");
            return Err(PluginError::Rejected(format!(
                "[POLICY] Alert origin '{}' has been blacklisted",
                alert.origin
            )));
        }

        if !self.allowed_environments.contains(&alert.environment) {
            warn!(alert_id = %alert.id, environment = %alert.environment, "Rejected alert from disallowed environment");
            return Err(PluginError::Rejected(format!(
                "[POLICY] Alert environment does not match one of {}",
                self.allowed_environments.join(", ")
            )));
        }

        Ok(alert)
    }
}
