//! # Config
//!
//! TOML configuration for the `sw` binary. Only loading lives here; the
//! engine consumes plain values through [`ExtractorSettings`].

use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use sw_extract::ExtractorSettings;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// The log group to query.
    pub log_group: String,
    /// Raw query text; validated before any network call.
    pub query: String,
    #[serde(default = "default_window_increment")]
    pub window_increment_s: i64,
    /// Optional upper bound for the run (RFC 3339, quoted). Still
    /// subject to the ingest-lag clamp.
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_subqueries: usize,
    /// Endpoint of the backing query API. Required for `extract`.
    #[serde(default)]
    pub endpoint_url: Option<String>,
    /// Static headers attached to every request (authorization etc).
    /// Credential/session construction is out of scope here; callers
    /// supply whatever their deployment needs.
    #[serde(default)]
    pub auth_headers: HashMap<String, String>,
}

fn default_window_increment() -> i64 {
    3600
}

fn default_max_concurrent() -> usize {
    20
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| format!("cannot read config {}: {e}", path.display()))?;
        let config: Config =
            toml::from_str(&raw).map_err(|e| format!("cannot parse config {}: {e}", path.display()))?;
        Ok(config)
    }

    pub fn settings(&self) -> ExtractorSettings {
        ExtractorSettings {
            log_group: self.log_group.clone(),
            query: self.query.clone(),
            window_increment_s: self.window_increment_s,
            max_concurrent_subqueries: self.max_concurrent_subqueries,
        }
    }
}
