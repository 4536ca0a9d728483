//! Plugin discovery and registration.
//!
//! `PluginCatalog` lists every plugin the binary knows how to build, keyed by
//! name. `Plugins` is the ordered set actually enabled by configuration,
//! together with optional routing rules that pick which plugins see a given
//! alert.

use super::{BlackoutHandler, Plugin, RejectPolicy};
use crate::blackout::BlackoutStore;
use crate::config::Config;
use crate::core::Alert;
use crate::routing::{RoutingRules, RuleRouter};
use anyhow::Result;
use itertools::Itertools;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Shared services handed to plugin factories.
#[derive(Clone)]
pub struct PluginDeps {
    pub config: Arc<Config>,
    pub blackouts: Arc<dyn BlackoutStore>,
}

/// Builds a plugin instance.
pub type PluginFactory = Box<dyn Fn(&PluginDeps) -> Result<Arc<dyn Plugin>> + Send + Sync>;

/// The set of plugins available to be enabled, keyed by name.
pub struct PluginCatalog {
    factories: BTreeMap<String, PluginFactory>,
}

impl PluginCatalog {
    /// An empty catalog.
    pub fn empty() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// Adds a plugin factory, replacing any factory with the same name.
    pub fn insert<F>(&mut self, name: &str, factory: F) -> &mut Self
    where
        F: Fn(&PluginDeps) -> Result<Arc<dyn Plugin>> + Send + Sync + 'static,
    {
        self.factories.insert(name.to_string(), Box::new(factory));
        self
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    fn get(&self, name: &str) -> Option<&PluginFactory> {
        self.factories.get(name)
    }
}

impl Default for PluginCatalog {
    /// The catalog of built-in plugins.
    fn default() -> Self {
        let mut catalog = Self::empty();
        catalog
            .insert("blackout", |deps| {
                Ok(Arc::new(BlackoutHandler::new(deps.blackouts.clone())) as Arc<dyn Plugin>)
            })
            .insert("reject", |deps| {
                Ok(Arc::new(RejectPolicy::from_config(&deps.config.reject)?) as Arc<dyn Plugin>)
            });
        catalog
    }
}

/// The enabled plugins, in evaluation order.
pub struct Plugins {
    plugins: Vec<(String, Arc<dyn Plugin>)>,
    rules: Option<Arc<dyn RoutingRules>>,
    config: Arc<Config>,
}

impl Plugins {
    /// Instantiates every plugin named in `config.plugins`.
    ///
    /// A plugin that is unknown or fails to build is logged and skipped; it
    /// never aborts registration. Routing rules are loaded afterwards if
    /// configured.
    pub fn register(deps: &PluginDeps, catalog: &PluginCatalog) -> Self {
        for name in catalog.names() {
            debug!(plugin = name, "Server plugin found");
        }

        let mut plugins: Vec<(String, Arc<dyn Plugin>)> = Vec::new();
        for name in &deps.config.plugins {
            let Some(factory) = catalog.get(name) else {
                error!(plugin = %name, "Failed to load plugin: no such plugin");
                continue;
            };
            match factory(deps) {
                Ok(plugin) => {
                    // Re-enabling a name keeps its first position.
                    match plugins.iter_mut().find(|(n, _)| n == name) {
                        Some(slot) => slot.1 = plugin,
                        None => plugins.push((name.clone(), plugin)),
                    }
                    info!(plugin = %name, "Server plugin loaded");
                }
                Err(e) => {
                    error!(plugin = %name, "Failed to load plugin: {:#}", e);
                }
            }
        }
        info!(
            "All server plugins enabled: {}",
            plugins.iter().map(|(n, _)| n.as_str()).join(", ")
        );

        let rules = match &deps.config.routing.rules_file {
            None => {
                info!("No plugin routing rules found. All plugins will be evaluated.");
                None
            }
            Some(path) => match RuleRouter::load(path) {
                Ok(router) => {
                    info!(path = %path.display(), rules = router.len(), "Plugin routing rules loaded");
                    Some(Arc::new(router) as Arc<dyn RoutingRules>)
                }
                Err(e) => {
                    warn!("Failed to load plugin routing rules, all plugins will be evaluated: {:#}", e);
                    None
                }
            },
        };

        Self {
            plugins,
            rules,
            config: deps.config.clone(),
        }
    }

    /// Replaces the routing rules.
    pub fn with_rules(mut self, rules: Arc<dyn RoutingRules>) -> Self {
        self.rules = Some(rules);
        self
    }

    /// Selects the plugins that should process `alert`, together with the
    /// configuration they run under.
    pub fn routing(&self, alert: &Alert) -> (Vec<Arc<dyn Plugin>>, Arc<Config>) {
        if !self.plugins.is_empty() {
            if let Some(rules) = &self.rules {
                match rules.route(alert, &self.plugins) {
                    Ok(selected) => return (selected, self.config.clone()),
                    Err(e) => warn!(alert_id = %alert.id, "Plugin routing rules failed: {:#}", e),
                }
            }
        }
        (
            self.plugins.iter().map(|(_, p)| p.clone()).collect(),
            self.config.clone(),
        )
    }

    /// Names of the enabled plugins, in evaluation order.
    pub fn names(&self) -> Vec<String> {
        self.plugins.iter().map(|(n, _)| n.clone()).collect()
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Plugin>> {
        self.plugins
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, p)| p.clone())
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }
}
