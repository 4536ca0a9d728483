//! The plugin contract that every alert processing plugin implements.
//!
//! A plugin hooks into four points of an alert's life: before it is accepted
//! (`pre_receive`), after it is accepted (`post_receive`), when its status
//! changes and when an operator takes an action on it. Only `pre_receive` is
//! mandatory; the other hooks default to doing nothing.

pub mod blackout;
pub mod registry;
pub mod reject;

use crate::core::{Alert, PluginContext};
use async_trait::async_trait;
use thiserror::Error;

pub use blackout::BlackoutHandler;
pub use registry::{PluginCatalog, PluginDeps, PluginFactory, Plugins};
pub use reject::RejectPolicy;

/// Errors a plugin hook may return.
#[derive(Error, Debug)]
pub enum PluginError {
    /// The alert falls inside a blackout period and must be dropped.
    #[error("{0}")]
    BlackoutPeriod(String),
    /// The alert violates a policy and must be refused.
    #[error("{0}")]
    Rejected(String),
    /// The plugin does not implement this hook.
    #[error("hook not implemented")]
    NotImplemented,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// A status transition proposed by a plugin's `status_change` hook.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusChange {
    pub alert: Alert,
    pub status: String,
    pub text: String,
}

/// An action proposed by a plugin's `take_action` hook.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionChange {
    pub alert: Alert,
    pub action: String,
    pub text: String,
}

/// An alert processing plugin.
#[async_trait]
pub trait Plugin: Send + Sync {
    /// The name the plugin is registered under.
    fn name(&self) -> &str;

    /// Called before an alert is accepted. Returns the (possibly modified)
    /// alert, or an error to stop processing.
    async fn pre_receive(&self, alert: Alert, ctx: &PluginContext) -> Result<Alert, PluginError>;

    /// Called after an alert is accepted. Returning `Some` replaces the alert.
    async fn post_receive(
        &self,
        _alert: &Alert,
        _ctx: &PluginContext,
    ) -> Result<Option<Alert>, PluginError> {
        Ok(None)
    }

    /// Called when an alert's status changes. Returning `Some` overrides the
    /// status and text passed to subsequent plugins.
    async fn status_change(
        &self,
        _alert: &Alert,
        _status: &str,
        _text: &str,
        _ctx: &PluginContext,
    ) -> Result<Option<StatusChange>, PluginError> {
        Ok(None)
    }

    /// Called when an operator takes an action on an alert.
    async fn take_action(
        &self,
        _alert: &Alert,
        _action: &str,
        _text: &str,
        _ctx: &PluginContext,
    ) -> Result<Option<ActionChange>, PluginError> {
        Err(PluginError::NotImplemented)
    }
}
