//! Monitor configuration.
//!
//! Every option has a default, so an empty environment yields a working
//! monitor that tracks everything into `job_histories`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_TABLE_NAME: &str = "job_histories";
pub const DEFAULT_ROUTE_PREFIX: &str = "api/job-monitor";
pub const DEFAULT_PER_PAGE: u32 = 25;
pub const DEFAULT_RETENTION_DAYS: u32 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid table name {0:?}: expected [A-Za-z_][A-Za-z0-9_]*")]
    InvalidTableName(String),

    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
}

/// SQL table name, validated to be a plain identifier.
///
/// The Postgres store splices this into statements, so it must never carry
/// quoting or whitespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TableName(String);

impl TableName {
    pub fn new(name: impl Into<String>) -> Result<Self, ConfigError> {
        let name = name.into();
        let mut chars = name.chars();
        let valid_head = chars
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
        let valid_tail = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !valid_head || !valid_tail || name.len() > 63 {
            return Err(ConfigError::InvalidTableName(name));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TableName {
    fn default() -> Self {
        Self(DEFAULT_TABLE_NAME.to_string())
    }
}

impl TryFrom<String> for TableName {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TableName> for String {
    fn from(value: TableName) -> Self {
        value.0
    }
}

impl core::fmt::Display for TableName {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// HTTP route settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteConfig {
    pub enabled: bool,
    /// Path prefix the API is mounted under (leading/trailing slashes are ignored).
    pub prefix: String,
    /// Named middleware applied to the API routes (`api`, `auth`).
    pub middleware: Vec<String>,
    /// Bearer token required by the `auth` middleware.
    pub api_token: Option<String>,
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            prefix: DEFAULT_ROUTE_PREFIX.to_string(),
            middleware: vec!["api".to_string()],
            api_token: None,
        }
    }
}

impl RouteConfig {
    /// The prefix as an axum mount path: `""` for the root, otherwise `/segment/...`.
    pub fn mount_path(&self) -> String {
        let trimmed = self.prefix.trim().trim_matches('/');
        if trimmed.is_empty() {
            String::new()
        } else {
            format!("/{trimmed}")
        }
    }
}

/// Top-level monitor configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Master switch for lifecycle tracking.
    pub enabled: bool,
    pub table_name: TableName,
    /// Queues to track; empty tracks every queue.
    pub track_queues: Vec<String>,
    /// Job classes never tracked (exact match).
    pub skip_jobs: Vec<String>,
    /// Days to retain history; `None` keeps rows forever. Enforced by an
    /// external sweep, not by this crate.
    pub retention_days: Option<u32>,
    pub route: RouteConfig,
    /// Default page size for list queries.
    pub per_page: u32,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            table_name: TableName::default(),
            track_queues: Vec::new(),
            skip_jobs: Vec::new(),
            retention_days: Some(DEFAULT_RETENTION_DAYS),
            route: RouteConfig::default(),
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

impl MonitorConfig {
    /// Load configuration from `JOB_MONITOR_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup (used by tests).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(v) = lookup("JOB_MONITOR_ENABLED") {
            config.enabled = parse_bool("JOB_MONITOR_ENABLED", &v)?;
        }
        if let Some(v) = lookup("JOB_MONITOR_TABLE") {
            config.table_name = TableName::new(v.trim())?;
        }
        if let Some(v) = lookup("JOB_MONITOR_TRACK_QUEUES") {
            config.track_queues = parse_list(&v);
        }
        if let Some(v) = lookup("JOB_MONITOR_SKIP_JOBS") {
            config.skip_jobs = parse_list(&v);
        }
        if let Some(v) = lookup("JOB_MONITOR_RETENTION_DAYS") {
            config.retention_days = parse_optional_u32("JOB_MONITOR_RETENTION_DAYS", &v)?;
        }
        if let Some(v) = lookup("JOB_MONITOR_ROUTES_ENABLED") {
            config.route.enabled = parse_bool("JOB_MONITOR_ROUTES_ENABLED", &v)?;
        }
        if let Some(v) = lookup("JOB_MONITOR_ROUTE_PREFIX") {
            config.route.prefix = v.trim().to_string();
        }
        if let Some(v) = lookup("JOB_MONITOR_ROUTE_MIDDLEWARE") {
            config.route.middleware = parse_list(&v);
        }
        if let Some(v) = lookup("JOB_MONITOR_API_TOKEN") {
            let v = v.trim();
            config.route.api_token = (!v.is_empty()).then(|| v.to_string());
        }
        if let Some(v) = lookup("JOB_MONITOR_PER_PAGE") {
            config.per_page = match parse_optional_u32("JOB_MONITOR_PER_PAGE", &v)? {
                Some(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        key: "JOB_MONITOR_PER_PAGE",
                        value: v,
                    });
                }
            };
        }

        Ok(config)
    }
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key,
            value: value.to_string(),
        }),
    }
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_optional_u32(key: &'static str, value: &str) -> Result<Option<u32>, ConfigError> {
    let v = value.trim();
    if v.is_empty() || v.eq_ignore_ascii_case("null") {
        return Ok(None);
    }
    v.parse::<u32>()
        .map(Some)
        .map_err(|_| ConfigError::InvalidValue {
            key,
            value: value.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<MonitorConfig, ConfigError> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        MonitorConfig::from_lookup(|k| env.get(k).cloned())
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config, MonitorConfig::default());
        assert!(config.enabled);
        assert_eq!(config.table_name.as_str(), "job_histories");
        assert_eq!(config.retention_days, Some(30));
        assert_eq!(config.per_page, 25);
        assert_eq!(config.route.mount_path(), "/api/job-monitor");
        assert_eq!(config.route.middleware, vec!["api".to_string()]);
    }

    #[test]
    fn lists_and_switches_are_parsed() {
        let config = load(&[
            ("JOB_MONITOR_ENABLED", "false"),
            ("JOB_MONITOR_TRACK_QUEUES", "default, high-priority,,"),
            ("JOB_MONITOR_SKIP_JOBS", "App\\Jobs\\Heartbeat"),
            ("JOB_MONITOR_RETENTION_DAYS", "null"),
            ("JOB_MONITOR_ROUTE_PREFIX", "/monitor/"),
            ("JOB_MONITOR_ROUTE_MIDDLEWARE", "api,auth"),
            ("JOB_MONITOR_API_TOKEN", "s3cret"),
            ("JOB_MONITOR_PER_PAGE", "50"),
        ])
        .unwrap();

        assert!(!config.enabled);
        assert_eq!(config.track_queues, vec!["default", "high-priority"]);
        assert_eq!(config.skip_jobs, vec!["App\\Jobs\\Heartbeat"]);
        assert_eq!(config.retention_days, None);
        assert_eq!(config.route.mount_path(), "/monitor");
        assert_eq!(config.route.middleware, vec!["api", "auth"]);
        assert_eq!(config.route.api_token.as_deref(), Some("s3cret"));
        assert_eq!(config.per_page, 50);
    }

    #[test]
    fn root_prefix_mounts_at_root() {
        let config = load(&[("JOB_MONITOR_ROUTE_PREFIX", "/")]).unwrap();
        assert_eq!(config.route.mount_path(), "");
    }

    #[test]
    fn bad_values_are_rejected() {
        assert!(matches!(
            load(&[("JOB_MONITOR_TABLE", "jobs; DROP TABLE x")]),
            Err(ConfigError::InvalidTableName(_))
        ));
        assert!(matches!(
            load(&[("JOB_MONITOR_ENABLED", "maybe")]),
            Err(ConfigError::InvalidValue { key: "JOB_MONITOR_ENABLED", .. })
        ));
        assert!(load(&[("JOB_MONITOR_PER_PAGE", "0")]).is_err());
    }

    #[test]
    fn deserializes_from_partial_json() {
        let config: MonitorConfig =
            serde_json::from_str(r#"{"skip_jobs": ["Noisy"], "route": {"prefix": "x"}}"#).unwrap();
        assert_eq!(config.skip_jobs, vec!["Noisy"]);
        assert_eq!(config.route.prefix, "x");
        assert!(config.route.enabled);
        assert_eq!(config.per_page, 25);

        let bad: Result<MonitorConfig, _> = serde_json::from_str(r#"{"table_name": "1abc"}"#);
        assert!(bad.is_err());
    }
}
