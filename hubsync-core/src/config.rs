//! Sync pipeline configuration.

use crate::error::{SyncError, SyncResult};
use crate::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for one sync run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Base URL for the CRM API (e.g., "https://api.hubapi.com").
    pub api_base_url: String,

    /// OAuth client id used for the refresh-token exchange.
    pub client_id: String,

    /// OAuth client secret used for the refresh-token exchange.
    pub client_secret: String,

    /// Entity collections to pull, in processing order.
    pub entities: Vec<String>,

    /// Records per search page.
    pub page_size: u32,

    /// Highest pagination offset the search endpoint accepts.
    pub offset_ceiling: u64,

    /// Total attempts per page query, including the first.
    pub max_attempts: u32,

    /// Backoff unit; the wait after failure `n` is `backoff_base_ms * 2^n`.
    pub backoff_base_ms: u64,

    /// HTTP request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.hubapi.com".to_string(),
            client_id: String::new(),
            client_secret: String::new(),
            entities: vec![
                "contacts".to_string(),
                "companies".to_string(),
                "meetings".to_string(),
            ],
            page_size: 100,
            offset_ceiling: 9900,
            max_attempts: 5,
            backoff_base_ms: 5000,
            request_timeout_secs: 30,
        }
    }
}

impl SyncConfig {
    /// Loads configuration from process environment variables.
    pub fn from_env() -> SyncResult<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Loads configuration through an arbitrary variable lookup.
    ///
    /// `HUBSPOT_CID` and `HUBSPOT_CS` are required; everything else falls
    /// back to [`SyncConfig::default`].
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> SyncResult<Self> {
        let defaults = Self::default();

        let client_id = required(&lookup, "HUBSPOT_CID")?;
        let client_secret = required(&lookup, "HUBSPOT_CS")?;

        let entities = match lookup("HUBSYNC_ENTITIES") {
            Some(raw) => {
                let names: Vec<String> = raw
                    .split(',')
                    .map(|s| s.trim().to_lowercase())
                    .filter(|s| !s.is_empty())
                    .collect();
                if names.is_empty() {
                    return Err(SyncError::Config(
                        "HUBSYNC_ENTITIES is set but lists no entities".to_string(),
                    ));
                }
                names
            }
            None => defaults.entities,
        };

        Ok(Self {
            api_base_url: lookup("HUBSPOT_API_BASE_URL").unwrap_or(defaults.api_base_url),
            client_id,
            client_secret,
            entities,
            page_size: parsed(&lookup, "HUBSYNC_PAGE_SIZE", defaults.page_size)?,
            offset_ceiling: defaults.offset_ceiling,
            max_attempts: parsed(&lookup, "HUBSYNC_MAX_ATTEMPTS", defaults.max_attempts)?,
            backoff_base_ms: parsed(&lookup, "HUBSYNC_BACKOFF_BASE_MS", defaults.backoff_base_ms)?,
            request_timeout_secs: defaults.request_timeout_secs,
        })
    }

    /// Retry policy applied to every page query.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, Duration::from_millis(self.backoff_base_ms))
    }
}

fn required(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> SyncResult<String> {
    lookup(key)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| SyncError::Config(format!("{key} is required but not set")))
}

fn parsed<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> SyncResult<T>
where
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| SyncError::Config(format!("invalid {key}: {e}"))),
        None => Ok(default),
    }
}
