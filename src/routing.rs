//! Plugin routing rules.
//!
//! Routing rules decide which of the enabled plugins process a given alert.
//! The built-in `RuleRouter` reads an ordered list of rules from a YAML file;
//! the first rule whose conditions hold selects the plugins.

use crate::core::Alert;
use crate::plugins::Plugin;
use anyhow::{anyhow, Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, sync::Arc};

/// Picks the plugins that should process an alert.
pub trait RoutingRules: Send + Sync {
    /// Returns the plugins, drawn from `plugins`, that should process `alert`.
    fn route(
        &self,
        alert: &Alert,
        plugins: &[(String, Arc<dyn Plugin>)],
    ) -> Result<Vec<Arc<dyn Plugin>>>;
}

/// Routing rules compiled from a YAML file.
#[derive(Debug, Clone)]
pub struct RuleRouter {
    rules: Vec<RouteRule>,
}

/// A single compiled routing rule.
#[derive(Debug, Clone)]
pub struct RouteRule {
    pub name: String,
    pub environment: Option<String>,
    pub severity: Vec<String>,
    pub service: Vec<String>,
    pub tags: Vec<String>,
    pub resource_regex: Option<Regex>,
    pub event_regex: Option<Regex>,
    /// Plugin names to run when the rule matches, in order.
    pub plugins: Vec<String>,
}

impl RouteRule {
    /// Evaluates the rule's conditions against an alert. Unset conditions
    /// always hold.
    pub fn is_match(&self, alert: &Alert) -> bool {
        if let Some(env) = &self.environment {
            if env != &alert.environment {
                return false;
            }
        }
        if !self.severity.is_empty() && !self.severity.contains(&alert.severity) {
            return false;
        }
        if !self.service.is_empty() && !self.service.iter().any(|s| alert.service.contains(s)) {
            return false;
        }
        if !self.tags.iter().all(|t| alert.tags.contains(t)) {
            return false;
        }
        if let Some(regex) = &self.resource_regex {
            if !regex.is_match(&alert.resource) {
                return false;
            }
        }
        if let Some(regex) = &self.event_regex {
            if !regex.is_match(&alert.event) {
                return false;
            }
        }
        true
    }
}

impl RuleRouter {
    /// Loads and compiles routing rules from a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read routing rules file: {}", path.display()))?;
        Self::from_yaml(&content)
            .with_context(|| format!("Invalid routing rules file: {}", path.display()))
    }

    /// Compiles routing rules from a YAML document.
    pub fn from_yaml(content: &str) -> Result<Self> {
        let file_rules: Vec<FileRule> =
            serde_yml::from_str(content).context("Failed to parse routing rules YAML")?;

        let rules = file_rules
            .into_iter()
            .map(FileRule::compile)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { rules })
    }

    pub fn rules(&self) -> &[RouteRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl RoutingRules for RuleRouter {
    fn route(
        &self,
        alert: &Alert,
        plugins: &[(String, Arc<dyn Plugin>)],
    ) -> Result<Vec<Arc<dyn Plugin>>> {
        let _span = tracing::debug_span!("rule_router_route", alert_id = %alert.id).entered();

        let Some(rule) = self.rules.iter().find(|r| r.is_match(alert)) else {
            return Ok(plugins.iter().map(|(_, p)| p.clone()).collect());
        };
        tracing::debug!(rule = %rule.name, "Routing rule matched");

        rule.plugins
            .iter()
            .map(|name| {
                plugins
                    .iter()
                    .find(|(n, _)| n == name)
                    .map(|(_, p)| p.clone())
                    .ok_or_else(|| {
                        anyhow!("rule '{}' routes to unknown plugin '{}'", rule.name, name)
                    })
            })
            .collect()
    }
}

// --- Deserialization-only structs ---

/// A rule as written in the YAML file.
#[derive(Debug, Serialize, Deserialize)]
struct FileRule {
    name: String,
    #[serde(default, rename = "match")]
    conditions: FileConditions,
    plugins: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
struct FileConditions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    environment: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    severity: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    service: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    resource_regex: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    event_regex: Option<String>,
}

impl FileRule {
    fn compile(self) -> Result<RouteRule> {
        let name = self.name;
        let compile = |field: &str, pattern: Option<String>| -> Result<Option<Regex>> {
            pattern
                .map(|p| {
                    Regex::new(&p).with_context(|| {
                        format!("Failed to compile {} for routing rule '{}'", field, name)
                    })
                })
                .transpose()
        };
        let resource_regex = compile("resource_regex", self.conditions.resource_regex)?;
        let event_regex = compile("event_regex", self.conditions.event_regex)?;

        Ok(RouteRule {
            name,
            environment: self.conditions.environment,
            severity: self.conditions.severity,
            service: self.conditions.service,
            tags: self.conditions.tags,
            resource_regex,
            event_regex,
            plugins: self.plugins,
        })
    }
}
