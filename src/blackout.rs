//! Blackout periods and the store that answers "is this alert blacked out?".
//!
//! A blackout is always scoped to an environment and may be narrowed further
//! by resource, service, event, group, tags, origin or customer. Every
//! condition set on a blackout must hold for an alert to match.

use crate::core::Alert;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::RwLock;
use thiserror::Error;
use tracing::{debug, info};

/// Errors raised by blackout store operations.
#[derive(Error, Debug, PartialEq)]
pub enum BlackoutError {
    #[error("blackout '{0}' not found")]
    NotFound(String),
    #[error("blackout must have an environment")]
    MissingEnvironment,
    #[error("blackout end time {end} is not after start time {start}")]
    InvalidPeriod {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    #[error("blackout duration of {0} seconds is out of range")]
    InvalidDuration(u64),
}

/// Converts a duration in seconds, rejecting values chrono cannot represent.
pub fn duration_from_secs(secs: u64) -> Result<Duration, BlackoutError> {
    i64::try_from(secs)
        .ok()
        .and_then(Duration::try_seconds)
        .ok_or(BlackoutError::InvalidDuration(secs))
}

/// A blackout period as stored and matched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Blackout {
    pub id: String,
    pub environment: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub service: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default)]
    pub text: String,
}

/// A request to create a blackout. Times are optional and filled in from
/// the current time and the configured default duration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewBlackout {
    pub environment: String,
    #[serde(default)]
    pub resource: Option<String>,
    #[serde(default)]
    pub service: Vec<String>,
    #[serde(default)]
    pub event: Option<String>,
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub origin: Option<String>,
    #[serde(default)]
    pub customer: Option<String>,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    /// Duration in seconds, used when `end_time` is not given.
    #[serde(default)]
    pub duration: Option<u64>,
    #[serde(default)]
    pub text: String,
}

impl NewBlackout {
    /// Resolves the request into a concrete blackout period.
    pub fn into_blackout(
        self,
        now: DateTime<Utc>,
        default_duration: Duration,
    ) -> Result<Blackout, BlackoutError> {
        if self.environment.is_empty() {
            return Err(BlackoutError::MissingEnvironment);
        }
        let start_time = self.start_time.unwrap_or(now);
        let end_time = match (self.end_time, self.duration) {
            (Some(end), _) => end,
            (None, Some(secs)) => start_time
                .checked_add_signed(duration_from_secs(secs)?)
                .ok_or(BlackoutError::InvalidDuration(secs))?,
            (None, None) => start_time.checked_add_signed(default_duration).ok_or(
                BlackoutError::InvalidDuration(default_duration.num_seconds().unsigned_abs()),
            )?,
        };
        if end_time <= start_time {
            return Err(BlackoutError::InvalidPeriod {
                start: start_time,
                end: end_time,
            });
        }

        Ok(Blackout {
            id: uuid::Uuid::new_v4().to_string(),
            environment: self.environment,
            resource: self.resource,
            service: self.service,
            event: self.event,
            group: self.group,
            tags: self.tags,
            origin: self.origin,
            customer: self.customer,
            start_time,
            end_time,
            text: self.text,
        })
    }
}

impl Blackout {
    /// Returns `true` while `now` lies in `[start_time, end_time)`.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.start_time <= now && now < self.end_time
    }

    /// Checks the blackout's scope against an alert, ignoring time.
    pub fn matches(&self, alert: &Alert) -> bool {
        if self.environment != alert.environment {
            return false;
        }
        if let Some(customer) = &self.customer {
            if alert.customer.as_ref() != Some(customer) {
                return false;
            }
        }
        let eq = |cond: &Option<String>, value: &str| cond.as_deref().map_or(true, |c| c == value);

        eq(&self.resource, &alert.resource)
            && eq(&self.event, &alert.event)
            && eq(&self.group, &alert.group)
            && eq(&self.origin, &alert.origin)
            && self.service.iter().all(|s| alert.service.contains(s))
            && self.tags.iter().all(|t| alert.tags.contains(t))
    }

    /// Ranks how narrowly the blackout is scoped. An environment-wide
    /// blackout has priority 1.
    pub fn priority(&self) -> u8 {
        if self.origin.is_some() {
            8
        } else if self.resource.is_some() && self.event.is_none() {
            2
        } else if self.resource.is_some() {
            3
        } else if !self.service.is_empty() {
            4
        } else if self.event.is_some() && self.group.is_none() {
            5
        } else if self.group.is_some() {
            6
        } else if !self.tags.is_empty() {
            7
        } else {
            1
        }
    }
}

/// Answers whether an alert is inside an active blackout and manages the
/// set of known blackouts.
pub trait BlackoutStore: Send + Sync {
    /// Returns `true` if any blackout active at `now` matches the alert.
    fn is_blackout_period(&self, alert: &Alert, now: DateTime<Utc>) -> bool;

    fn create(&self, blackout: Blackout) -> Blackout;

    fn list(&self) -> Vec<Blackout>;

    fn delete(&self, id: &str) -> Result<(), BlackoutError>;
}

/// A blackout store kept in process memory.
#[derive(Debug, Default)]
pub struct InMemoryBlackoutStore {
    blackouts: RwLock<Vec<Blackout>>,
}

impl InMemoryBlackoutStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store seeded with the given blackouts.
    pub fn with_blackouts(blackouts: Vec<Blackout>) -> Self {
        info!(count = blackouts.len(), "Seeding blackout store");
        Self {
            blackouts: RwLock::new(blackouts),
        }
    }
}

impl BlackoutStore for InMemoryBlackoutStore {
    fn is_blackout_period(&self, alert: &Alert, now: DateTime<Utc>) -> bool {
        let blackouts = self.blackouts.read().unwrap_or_else(|e| e.into_inner());
        match blackouts
            .iter()
            .find(|b| b.is_active(now) && b.matches(alert))
        {
            Some(blackout) => {
                debug!(alert_id = %alert.id, blackout_id = %blackout.id, "Alert matches blackout period");
                true
            }
            None => false,
        }
    }

    fn create(&self, blackout: Blackout) -> Blackout {
        info!(blackout_id = %blackout.id, environment = %blackout.environment, "Blackout created");
        let now = Utc::now();
        let mut blackouts = self.blackouts.write().unwrap_or_else(|e| e.into_inner());
        let before = blackouts.len();
        blackouts.retain(|b| b.end_time > now);
        if blackouts.len() < before {
            debug!(pruned = before - blackouts.len(), "Dropped expired blackouts");
        }
        blackouts.push(blackout.clone());
        blackout
    }

    fn list(&self) -> Vec<Blackout> {
        let blackouts = self.blackouts.read().unwrap_or_else(|e| e.into_inner());
        let mut listed = blackouts.clone();
        listed.sort_by(|a, b| a.start_time.cmp(&b.start_time));
        listed
    }

    fn delete(&self, id: &str) -> Result<(), BlackoutError> {
        let mut blackouts = self.blackouts.write().unwrap_or_else(|e| e.into_inner());
        let before = blackouts.len();
        blackouts.retain(|b| b.id != id);
        if blackouts.len() == before {
            return Err(BlackoutError::NotFound(id.to_string()));
        }
        info!(blackout_id = %id, "Blackout deleted");
        Ok(())
    }
}
