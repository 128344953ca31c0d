//! Publish configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use staticpub_transfer::{PollPolicy, RetryPolicy};

use crate::error::PublishError;

/// Environment variable holding the upload retry count.
pub const RETRIES_ENV: &str = "STATICPUB_RETRIES";

/// Environment variable enabling the archive strategy.
pub const ARCHIVE_ENV: &str = "STATICPUB_ARCHIVE";

/// Settings for one publish session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PublishConfig {
    /// Build the destinations are issued for.
    pub build_id: String,
    /// Upload retries after the first attempt.
    pub retries: u32,
    pub retry_min_delay_ms: u64,
    pub retry_max_delay_ms: u64,
    pub poll_interval_ms: u64,
    pub poll_attempts: u32,
    /// Try the archive strategy first.
    pub archive: bool,
}

impl Default for PublishConfig {
    fn default() -> Self {
        let retry = RetryPolicy::default();
        let poll = PollPolicy::default();
        Self {
            build_id: String::new(),
            retries: retry.retries,
            retry_min_delay_ms: retry.min_delay.as_millis() as u64,
            retry_max_delay_ms: retry.max_delay.as_millis() as u64,
            poll_interval_ms: poll.interval.as_millis() as u64,
            poll_attempts: poll.max_attempts,
            archive: false,
        }
    }
}

impl PublishConfig {
    pub fn new(build_id: impl Into<String>) -> Self {
        Self {
            build_id: build_id.into(),
            ..Self::default()
        }
    }

    /// Defaults overridden by `STATICPUB_RETRIES` and `STATICPUB_ARCHIVE`.
    pub fn from_env(build_id: impl Into<String>) -> Result<Self, PublishError> {
        Self::from_lookup(build_id, |key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env), reading variables through `lookup`.
    pub fn from_lookup(
        build_id: impl Into<String>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, PublishError> {
        let mut config = Self::new(build_id);

        if let Some(raw) = lookup(RETRIES_ENV) {
            config.retries = raw.trim().parse().map_err(|_| {
                PublishError::Config(format!(
                    "{RETRIES_ENV} must be a non-negative integer, got {raw:?}"
                ))
            })?;
        }

        if let Some(raw) = lookup(ARCHIVE_ENV) {
            config.archive = parse_flag(&raw).ok_or_else(|| {
                PublishError::Config(format!("{ARCHIVE_ENV} must be a boolean, got {raw:?}"))
            })?;
        }

        Ok(config)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            retries: self.retries,
            min_delay: Duration::from_millis(self.retry_min_delay_ms),
            max_delay: Duration::from_millis(self.retry_max_delay_ms),
        }
    }

    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            interval: Duration::from_millis(self.poll_interval_ms),
            max_attempts: self.poll_attempts,
        }
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "" | "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
