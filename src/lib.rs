//! alertgate - plugin orchestration for an alert receiver
//!
//! Alerts received over HTTP are routed through an ordered set of processing
//! plugins. The built-in `blackout` plugin drops or tags alerts that fall
//! inside an active blackout period; the `reject` plugin enforces origin and
//! environment policy.

pub mod app;
pub mod blackout;
pub mod cli;
pub mod config;
pub mod core;
pub mod pipeline;
pub mod plugins;
pub mod routing;
pub mod server;

// Re-export core types for convenience
pub use crate::core::{AlarmModel, Alert, PluginContext, ProcessOverrides};
