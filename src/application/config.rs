use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::retry_policy::{
    RetryPolicy, DEFAULT_BACKOFF_SECS, DEFAULT_MAX_JITTER_SECS, DEFAULT_MAX_RETRIES,
};

/// Lowest accepted sampling interval, to avoid a busy loop.
pub const MIN_INTERVAL_SECS: f64 = 0.1;

/// Top-level application configuration loaded from TOML, then overridden
/// by environment variables.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub collector: CollectorConfig,
    #[serde(default)]
    pub webhook: WebhookConfig,
    #[serde(default)]
    pub email: EmailConfig,
    #[serde(default)]
    pub notifications: NotificationConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
}

/// Background sampling loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectorConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_interval")]
    pub interval_secs: f64,
    /// CPU measurement window of the system sample source.
    #[serde(default = "default_sample_window")]
    pub sample_window_ms: u64,
    #[serde(default = "default_timeout")]
    pub sample_timeout_secs: u64,
}

/// Webhook channel. Disabled when `url` is absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_backoff")]
    pub backoff_secs: f64,
    #[serde(default = "default_max_jitter")]
    pub max_jitter_secs: f64,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

/// SMTP channel. Active only when host, sender and recipient are all set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    #[serde(default)]
    pub smtp_host: Option<String>,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    #[serde(default)]
    pub smtp_user: Option<String>,
    #[serde(default)]
    pub smtp_password: Option<String>,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

/// Dispatcher-wide settings and the optional JSON-lines log channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    #[serde(default)]
    pub log_file: Option<String>,
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,
    #[serde(default = "default_drain_timeout")]
    pub drain_timeout_secs: u64,
}

/// Database storage path (tilde-expanded at point of use).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_path")]
    pub path: String,
}

// --- Defaults ---

const fn default_true() -> bool {
    true
}

const fn default_interval() -> f64 {
    5.0
}

const fn default_sample_window() -> u64 {
    500
}

const fn default_timeout() -> u64 {
    10
}

const fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

const fn default_backoff() -> f64 {
    DEFAULT_BACKOFF_SECS
}

const fn default_max_jitter() -> f64 {
    DEFAULT_MAX_JITTER_SECS
}

const fn default_smtp_port() -> u16 {
    587
}

const fn default_max_in_flight() -> usize {
    64
}

const fn default_drain_timeout() -> u64 {
    15
}

fn default_database_path() -> String {
    "~/.local/share/hostwatch/hostwatch.db".into()
}

// --- Default impls ---

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            interval_secs: default_interval(),
            sample_window_ms: default_sample_window(),
            sample_timeout_secs: default_timeout(),
        }
    }
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_retries: default_max_retries(),
            backoff_secs: default_backoff(),
            max_jitter_secs: default_max_jitter(),
            timeout_secs: default_timeout(),
        }
    }
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            smtp_host: None,
            smtp_port: default_smtp_port(),
            smtp_user: None,
            smtp_password: None,
            from: None,
            to: None,
            timeout_secs: default_timeout(),
        }
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            log_file: None,
            max_in_flight: default_max_in_flight(),
            drain_timeout_secs: default_drain_timeout(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

// --- Derived values ---

impl CollectorConfig {
    /// Tick interval, floored at [`MIN_INTERVAL_SECS`]. Non-finite values
    /// fall back to the default; values too large for a `Duration` saturate.
    #[must_use]
    pub fn interval(&self) -> Duration {
        let secs = if self.interval_secs.is_finite() {
            self.interval_secs.max(MIN_INTERVAL_SECS)
        } else {
            default_interval()
        };
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    }

    #[must_use]
    pub const fn sample_window(&self) -> Duration {
        Duration::from_millis(self.sample_window_ms)
    }

    #[must_use]
    pub const fn sample_timeout(&self) -> Duration {
        Duration::from_secs(self.sample_timeout_secs)
    }
}

impl WebhookConfig {
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            backoff_base: if self.backoff_secs.is_finite() {
                self.backoff_secs.max(0.0)
            } else {
                DEFAULT_BACKOFF_SECS
            },
            max_jitter: self.max_jitter_secs,
        }
    }
}

impl EmailConfig {
    /// Whether the minimum settings for the email channel are present.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        [&self.smtp_host, &self.from, &self.to]
            .iter()
            .all(|v| v.as_deref().is_some_and(|s| !s.trim().is_empty()))
    }
}

// --- AppConfig methods ---

impl AppConfig {
    /// Load config from the default path (creating it if missing), then
    /// apply environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the config directory cannot be determined,
    /// the file cannot be read, or the TOML content is invalid.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        let mut config = Self::load_or_create(&path)?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load from an explicit path, then apply environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or the TOML content is invalid.
    pub fn load_with_env(path: &Path) -> Result<Self> {
        let mut config = Self::load_from(path)?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load from a specific path, or create a default config file if missing
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, the TOML content is invalid,
    /// or the default config file cannot be written.
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load_from(path)
        } else {
            let config = Self::default();
            config.save_to(path)?;
            Ok(config)
        }
    }

    /// Load from a specific path
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or the TOML content is invalid.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).context("Failed to read config file")?;
        toml::from_str(&content).context("Failed to parse config file")
    }

    /// Save config to a specific path, creating parent directories if needed
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created,
    /// serialization fails, or the file cannot be written.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content).context("Failed to write config file")?;
        Ok(())
    }

    /// Apply environment-style overrides. Unparseable values are logged and
    /// leave the current value in place.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("HOSTWATCH_COLLECTOR_ENABLED") {
            match v.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => self.collector.enabled = true,
                "0" | "false" | "no" | "off" => self.collector.enabled = false,
                _ => warn_invalid("HOSTWATCH_COLLECTOR_ENABLED", &v),
            }
        }
        parse_into(&get, "HOSTWATCH_INTERVAL_SECS", &mut self.collector.interval_secs);
        if let Some(v) = get("HOSTWATCH_DB_PATH") {
            self.database.path = v;
        }

        if let Some(v) = get("ALERT_WEBHOOK_URL") {
            self.webhook.url = Some(v);
        }
        parse_into(&get, "ALERT_WEBHOOK_RETRIES", &mut self.webhook.max_retries);
        parse_into(&get, "ALERT_WEBHOOK_BACKOFF", &mut self.webhook.backoff_secs);

        if let Some(v) = get("ALERT_SMTP_HOST") {
            self.email.smtp_host = Some(v);
        }
        parse_into(&get, "ALERT_SMTP_PORT", &mut self.email.smtp_port);
        if let Some(v) = get("ALERT_SMTP_USER") {
            self.email.smtp_user = Some(v);
        }
        if let Some(v) = get("ALERT_SMTP_PASS") {
            self.email.smtp_password = Some(v);
        }
        if let Some(v) = get("ALERT_FROM") {
            self.email.from = Some(v);
        }
        if let Some(v) = get("ALERT_TO") {
            self.email.to = Some(v);
        }

        if let Some(v) = get("ALERT_LOG_FILE") {
            self.notifications.log_file = Some(v);
        }
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("Could not determine config directory")?;
        Ok(config_dir.join("hostwatch").join("config.toml"))
    }
}

fn parse_into<T, G>(get: &G, key: &str, target: &mut T)
where
    T: std::str::FromStr,
    G: Fn(&str) -> Option<String>,
{
    if let Some(raw) = get(key) {
        match raw.trim().parse() {
            Ok(value) => *target = value,
            Err(_) => warn_invalid(key, &raw),
        }
    }
}

fn warn_invalid(key: &str, raw: &str) {
    tracing::warn!(key, value = raw, "Ignoring invalid environment override");
}
