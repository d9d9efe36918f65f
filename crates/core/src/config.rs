//! Configuration types shared across crates.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use time::Duration;

/// RRDP source configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RrdpConfig {
    /// URL of the notification document.
    pub url: String,
    /// Optional `"fromHost/toHost"` rewrite applied to the snapshot URL.
    /// A blank value is treated as unset.
    #[serde(default)]
    pub replace_host: Option<String>,
    /// Timeout for each HTTP request in seconds (default: 180).
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// User-Agent header sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// Rsync target directory configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RsyncConfig {
    /// Root directory that holds `published` and the `published-*` trees.
    pub path: PathBuf,
    /// Superseded trees younger than this are kept (default: 1 hour).
    #[serde(default = "default_retention_period_ms")]
    pub retention_period_ms: u64,
    /// Number of most recent trees that are always kept (default: 8).
    #[serde(default = "default_retention_copies_count")]
    pub retention_copies_count: usize,
}

/// Sync cycle configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Seconds between two sync cycles (default: 600).
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Refuse to publish snapshots with fewer objects than `minimal_object_count`.
    #[serde(default)]
    pub minimal_object_count_check_enabled: bool,
    #[serde(default)]
    pub minimal_object_count: usize,
    /// Timestamp cache entries not seen for this long are evicted (default: 3600).
    #[serde(default = "default_timestamp_cache_ttl_secs")]
    pub timestamp_cache_ttl_secs: u64,
}

/// Status server configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Enable the /metrics endpoint for Prometheus scraping (default: true).
    #[serde(default = "default_metrics_enabled")]
    pub metrics_enabled: bool,
}

fn default_request_timeout_secs() -> u64 {
    180
}

fn default_user_agent() -> String {
    format!("rsyncit/{}", env!("CARGO_PKG_VERSION"))
}

fn default_retention_period_ms() -> u64 {
    3_600_000
}

fn default_retention_copies_count() -> usize {
    8
}

fn default_interval_secs() -> u64 {
    600
}

fn default_timestamp_cache_ttl_secs() -> u64 {
    3600
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_metrics_enabled() -> bool {
    true
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            minimal_object_count_check_enabled: false,
            minimal_object_count: 0,
            timestamp_cache_ttl_secs: default_timestamp_cache_ttl_secs(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            metrics_enabled: default_metrics_enabled(),
        }
    }
}

impl SyncConfig {
    /// Get the scheduling interval as a std Duration.
    pub fn interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.interval_secs)
    }

    /// Get the timestamp cache TTL as a time Duration.
    pub fn timestamp_cache_ttl(&self) -> Duration {
        Duration::seconds(self.timestamp_cache_ttl_secs as i64)
    }
}

/// Rewrite rule replacing the first occurrence of `from` with `to`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HostSubstitution {
    pub from: String,
    pub to: String,
}

impl HostSubstitution {
    /// Parse a `"fromHost/toHost"` rule. Blank input means no rule.
    pub fn parse(value: &str) -> crate::Result<Option<Self>> {
        let value = value.trim();
        if value.is_empty() {
            return Ok(None);
        }
        let parts: Vec<&str> = value.split('/').collect();
        match parts.as_slice() {
            [from, to] if !from.is_empty() && !to.is_empty() => Ok(Some(Self {
                from: (*from).to_string(),
                to: (*to).to_string(),
            })),
            _ => Err(crate::Error::Config(format!(
                "rrdp.replace_host must have the form 'fromHost/toHost', got '{value}'"
            ))),
        }
    }

    pub fn apply(&self, url: &str) -> String {
        url.replacen(&self.from, &self.to, 1)
    }
}

/// Immutable settings for a single sync cycle.
#[derive(Clone, Debug)]
pub struct Config {
    pub rrdp_url: String,
    pub replace_host: Option<HostSubstitution>,
    pub target_directory: PathBuf,
    pub request_timeout: std::time::Duration,
    pub user_agent: String,
    pub retention_period: Duration,
    pub retention_copies_count: usize,
    /// `Some(floor)` when the minimal object count check is enabled.
    pub minimal_object_count: Option<usize>,
}

impl Config {
    /// Rewrite a snapshot URL with the configured host substitution, if any.
    pub fn substitute_host(&self, url: &str) -> String {
        match &self.replace_host {
            Some(rule) => rule.apply(url),
            None => url.to_string(),
        }
    }
}

/// Complete application configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppConfig {
    pub rrdp: RrdpConfig,
    pub rsync: RsyncConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

impl AppConfig {
    /// Create a test configuration pointing at `url` and writing below `path`.
    ///
    /// **For testing only.**
    pub fn for_testing(url: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            rrdp: RrdpConfig {
                url: url.into(),
                replace_host: None,
                request_timeout_secs: default_request_timeout_secs(),
                user_agent: default_user_agent(),
            },
            rsync: RsyncConfig {
                path: path.into(),
                retention_period_ms: default_retention_period_ms(),
                retention_copies_count: default_retention_copies_count(),
            },
            sync: SyncConfig::default(),
            server: ServerConfig::default(),
        }
    }

    /// Reject settings that would make every cycle fail.
    pub fn validate(&self) -> Result<(), String> {
        if self.rrdp.url.trim().is_empty() {
            return Err("rrdp.url must be set".to_string());
        }
        if self.rsync.path.as_os_str().is_empty() {
            return Err("rsync.path must be set".to_string());
        }
        if self.rrdp.request_timeout_secs == 0 {
            return Err("rrdp.request_timeout_secs cannot be 0".to_string());
        }
        if self.sync.interval_secs == 0 {
            return Err("sync.interval_secs cannot be 0. \
                 This would cause a panic when creating the sync timer."
                .to_string());
        }
        if let Some(rule) = &self.rrdp.replace_host {
            HostSubstitution::parse(rule).map_err(|e| e.to_string())?;
        }
        Ok(())
    }

    /// Derive the settings for one sync cycle.
    pub fn cycle_config(&self) -> crate::Result<Config> {
        let replace_host = match &self.rrdp.replace_host {
            Some(rule) => HostSubstitution::parse(rule)?,
            None => None,
        };
        let retention_period_ms = i64::try_from(self.rsync.retention_period_ms).map_err(|_| {
            crate::Error::Config(format!(
                "rsync.retention_period_ms out of range: {}",
                self.rsync.retention_period_ms
            ))
        })?;

        Ok(Config {
            rrdp_url: self.rrdp.url.clone(),
            replace_host,
            target_directory: self.rsync.path.clone(),
            request_timeout: std::time::Duration::from_secs(self.rrdp.request_timeout_secs),
            user_agent: self.rrdp.user_agent.clone(),
            retention_period: Duration::milliseconds(retention_period_ms),
            retention_copies_count: self.rsync.retention_copies_count,
            minimal_object_count: self
                .sync
                .minimal_object_count_check_enabled
                .then_some(self.sync.minimal_object_count),
        })
    }
}
