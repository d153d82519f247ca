//! Configuration management for the client.
//!
//! Values come from an optional JSON file and the process environment. The
//! backend URL and anon key are mandatory: startup fails if either is absent
//! after both sources have been applied.

use crate::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Environment variable holding the Supabase project URL.
pub const ENV_SUPABASE_URL: &str = "ATELIER_SUPABASE_URL";

/// Environment variable holding the Supabase anon (public) key.
pub const ENV_ANON_KEY: &str = "ATELIER_SUPABASE_ANON_KEY";

const ENV_LOG_LEVEL: &str = "ATELIER_LOG_LEVEL";
const ENV_SITE_URL: &str = "ATELIER_SITE_URL";
const ENV_REQUEST_TIMEOUT_MS: &str = "ATELIER_REQUEST_TIMEOUT_MS";
const ENV_PULSE_INTERVAL_MS: &str = "ATELIER_PULSE_INTERVAL_MS";

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Hard deadline for every outbound request.
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 15_000;

/// Period of the proactive liveness probe.
pub const DEFAULT_PULSE_INTERVAL_MS: u64 = 60_000;

/// Minimum spacing between two session revalidations.
pub const DEFAULT_REVALIDATE_MIN_INTERVAL_MS: u64 = 15_000;

/// A session expiring within this window is refreshed proactively.
pub const DEFAULT_REFRESH_GRACE_MS: u64 = 60_000;

/// Table read by the liveness probe.
pub const DEFAULT_PULSE_TABLE: &str = "perfis";

/// Path of the login surface.
pub const DEFAULT_LOGIN_PATH: &str = "/login";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable single-line output.
    #[default]
    Compact,
    /// One JSON object per line.
    Json,
}

/// Client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
    /// Log output format.
    pub log_format: LogFormat,
    /// Supabase project URL.
    pub supabase_url: String,
    /// Supabase anon key (public, safe to expose).
    pub supabase_anon_key: String,
    /// Public origin of the web client, used for password-reset links.
    pub site_url: Option<String>,
    /// Deadline for each outbound request, in milliseconds.
    pub request_timeout_ms: u64,
    /// Heartbeat period of the liveness monitor, in milliseconds.
    pub pulse_interval_ms: u64,
    /// Table used by the liveness probe.
    pub pulse_table: String,
    /// Revalidation throttle window, in milliseconds.
    pub revalidate_min_interval_ms: u64,
    /// Proactive refresh window before session expiry, in milliseconds.
    pub refresh_grace_ms: u64,
    /// Path of the login surface.
    pub login_path: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            log_format: LogFormat::default(),
            supabase_url: String::new(),
            supabase_anon_key: String::new(),
            site_url: None,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            pulse_interval_ms: DEFAULT_PULSE_INTERVAL_MS,
            pulse_table: DEFAULT_PULSE_TABLE.to_string(),
            revalidate_min_interval_ms: DEFAULT_REVALIDATE_MIN_INTERVAL_MS,
            refresh_grace_ms: DEFAULT_REFRESH_GRACE_MS,
            login_path: DEFAULT_LOGIN_PATH.to_string(),
        }
    }
}

impl Config {
    /// Build the configuration from the process environment.
    ///
    /// Fails with [`CoreError::MissingEnv`] when the Supabase URL or anon key
    /// is not set.
    pub fn from_env() -> CoreResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> CoreResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        config.apply_env(&lookup)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file (if it exists), then the environment.
    pub fn load(path: &Path) -> CoreResult<Self> {
        Self::load_with_lookup(path, |key| std::env::var(key).ok())
    }

    fn load_with_lookup<F>(path: &Path, lookup: F) -> CoreResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = if path.exists() {
            Self::load_from_file(path)?
        } else {
            Self::default()
        };

        config.apply_env(&lookup)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file without validating it.
    pub fn load_from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Default config file location (`~/.atelier/config.json`).
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".atelier").join("config.json"))
    }

    fn apply_env<F>(&mut self, lookup: &F) -> CoreResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).and_then(non_empty);

        if let Some(url) = get(ENV_SUPABASE_URL) {
            self.supabase_url = url;
        }
        if let Some(key) = get(ENV_ANON_KEY) {
            self.supabase_anon_key = key;
        }
        if let Some(level) = get(ENV_LOG_LEVEL) {
            self.log_level = level;
        }
        if let Some(site_url) = get(ENV_SITE_URL) {
            self.site_url = Some(site_url);
        }
        if let Some(raw) = get(ENV_REQUEST_TIMEOUT_MS) {
            self.request_timeout_ms = parse_millis(ENV_REQUEST_TIMEOUT_MS, &raw)?;
        }
        if let Some(raw) = get(ENV_PULSE_INTERVAL_MS) {
            self.pulse_interval_ms = parse_millis(ENV_PULSE_INTERVAL_MS, &raw)?;
        }

        Ok(())
    }

    /// Check that the mandatory backend settings are present and well formed.
    pub fn validate(&self) -> CoreResult<()> {
        if self.supabase_url.trim().is_empty() {
            return Err(CoreError::MissingEnv(ENV_SUPABASE_URL));
        }
        if self.supabase_anon_key.trim().is_empty() {
            return Err(CoreError::MissingEnv(ENV_ANON_KEY));
        }
        self.supabase_url()?;
        Ok(())
    }

    /// Get the Supabase URL as a parsed URL.
    pub fn supabase_url(&self) -> CoreResult<Url> {
        Url::parse(&self.supabase_url).map_err(CoreError::from)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn pulse_interval(&self) -> Duration {
        Duration::from_millis(self.pulse_interval_ms)
    }

    pub fn revalidate_min_interval(&self) -> Duration {
        Duration::from_millis(self.revalidate_min_interval_ms)
    }

    pub fn refresh_grace(&self) -> Duration {
        Duration::from_millis(self.refresh_grace_ms)
    }

    /// Link embedded in password-reset emails, pointing back at the login page.
    pub fn password_reset_redirect(&self) -> Option<String> {
        self.site_url
            .as_deref()
            .map(|site| format!("{}{}", site.trim_end_matches('/'), self.login_path))
    }
}

fn non_empty(raw: String) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn parse_millis(key: &'static str, raw: &str) -> CoreResult<u64> {
    match raw.parse::<u64>() {
        Ok(value) if value > 0 => Ok(value),
        _ => Err(CoreError::InvalidValue {
            key,
            value: raw.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn required() -> Vec<(&'static str, &'static str)> {
        vec![
            (ENV_SUPABASE_URL, "https://abc123.supabase.co"),
            (ENV_ANON_KEY, "anon-key"),
        ]
    }

    #[test]
    fn test_from_lookup_with_required_values() {
        let config = Config::from_lookup(lookup(&required())).unwrap();
        assert_eq!(config.supabase_url, "https://abc123.supabase.co");
        assert_eq!(config.supabase_anon_key, "anon-key");
        assert_eq!(config.request_timeout(), Duration::from_millis(15_000));
        assert_eq!(config.pulse_interval(), Duration::from_millis(60_000));
        assert_eq!(config.revalidate_min_interval(), Duration::from_millis(15_000));
        assert_eq!(config.refresh_grace(), Duration::from_millis(60_000));
        assert_eq!(config.pulse_table, DEFAULT_PULSE_TABLE);
    }

    #[test]
    fn test_missing_url_fails_fast() {
        let result = Config::from_lookup(lookup(&[(ENV_ANON_KEY, "anon-key")]));
        assert!(matches!(result, Err(CoreError::MissingEnv(ENV_SUPABASE_URL))));
    }

    #[test]
    fn test_blank_anon_key_fails_fast() {
        let result = Config::from_lookup(lookup(&[
            (ENV_SUPABASE_URL, "https://abc123.supabase.co"),
            (ENV_ANON_KEY, "   "),
        ]));
        assert!(matches!(result, Err(CoreError::MissingEnv(ENV_ANON_KEY))));
    }

    #[test]
    fn test_invalid_url_rejected() {
        let result = Config::from_lookup(lookup(&[
            (ENV_SUPABASE_URL, "not a url"),
            (ENV_ANON_KEY, "anon-key"),
        ]));
        assert!(matches!(result, Err(CoreError::InvalidUrl(_))));
    }

    #[test]
    fn test_timeout_override() {
        let mut vars = required();
        vars.push((ENV_REQUEST_TIMEOUT_MS, "2500"));
        let config = Config::from_lookup(lookup(&vars)).unwrap();
        assert_eq!(config.request_timeout(), Duration::from_millis(2500));
    }

    #[test]
    fn test_zero_timeout_is_invalid() {
        let mut vars = required();
        vars.push((ENV_REQUEST_TIMEOUT_MS, "0"));
        let result = Config::from_lookup(lookup(&vars));
        assert!(matches!(
            result,
            Err(CoreError::InvalidValue {
                key: ENV_REQUEST_TIMEOUT_MS,
                ..
            })
        ));
    }

    #[test]
    fn test_load_file_then_env() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{
                "log_level": "debug",
                "supabase_url": "https://from-file.supabase.co",
                "supabase_anon_key": "file-key",
                "pulse_table": "contas"
            }"#,
        )
        .unwrap();

        let config = Config::load_with_lookup(
            &path,
            lookup(&[(ENV_SUPABASE_URL, "https://from-env.supabase.co")]),
        )
        .unwrap();

        assert_eq!(config.log_level, "debug");
        assert_eq!(config.supabase_url, "https://from-env.supabase.co");
        assert_eq!(config.supabase_anon_key, "file-key");
        assert_eq!(config.pulse_table, "contas");
    }

    #[test]
    fn test_load_nonexistent_file_needs_env() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing.json");

        assert!(Config::load_with_lookup(&path, lookup(&[])).is_err());
        assert!(Config::load_with_lookup(&path, lookup(&required())).is_ok());
    }

    #[test]
    fn test_password_reset_redirect() {
        let mut config = Config::default();
        assert_eq!(config.password_reset_redirect(), None);

        config.site_url = Some("https://atelier.app/".to_string());
        assert_eq!(
            config.password_reset_redirect().as_deref(),
            Some("https://atelier.app/login")
        );
    }
}
