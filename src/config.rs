//! Runtime configuration.
//! Loaded from an optional JSON file, then overlaid with `LINGUADEEP_*`
//! environment variables. Every field has a default.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::dialog::paginate::MAX_PAGE_CAPACITY;

/// Longest accepted cache TTL and purge interval: 7 days.
pub const MAX_CACHE_TTL_SECS: u64 = 7 * 24 * 3600;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Lifetime of cached message content after its latest write.
    pub cache_ttl_secs: u64,
    /// Options per select menu.
    pub page_capacity: usize,
    pub translator_timeout_ms: u64,
    /// SQLite file for cell storage; in-memory when unset.
    pub cache_db_path: Option<PathBuf>,
    pub purge_interval_secs: u64,
    pub log_filter: String,
    pub log_json: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_ttl_secs: 3600,
            page_capacity: MAX_PAGE_CAPACITY,
            translator_timeout_ms: 10_000,
            cache_db_path: None,
            purge_interval_secs: 600,
            log_filter: "linguadeep=info".to_string(),
            log_json: false,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(serde_json::Error),
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "config IO error: {e}"),
            ConfigError::Parse(e) => write!(f, "config parse error: {e}"),
            ConfigError::Invalid(msg) => write!(f, "invalid config: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        ConfigError::Parse(e)
    }
}

impl Config {
    /// Load from a JSON file. Missing fields take their defaults.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overlaid with the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().overlay(|name| std::env::var(name).ok())
    }

    /// Apply `LINGUADEEP_*` variables looked up through `var`.
    pub fn overlay(mut self, var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        fn parse<T: std::str::FromStr>(name: &str, raw: String) -> Result<T, ConfigError> {
            raw.trim()
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("{name}={raw:?}")))
        }

        if let Some(v) = var("LINGUADEEP_CACHE_TTL_SECS") {
            self.cache_ttl_secs = parse("LINGUADEEP_CACHE_TTL_SECS", v)?;
        }
        if let Some(v) = var("LINGUADEEP_PAGE_CAPACITY") {
            self.page_capacity = parse("LINGUADEEP_PAGE_CAPACITY", v)?;
        }
        if let Some(v) = var("LINGUADEEP_TRANSLATOR_TIMEOUT_MS") {
            self.translator_timeout_ms = parse("LINGUADEEP_TRANSLATOR_TIMEOUT_MS", v)?;
        }
        if let Some(v) = var("LINGUADEEP_CACHE_DB") {
            self.cache_db_path = (!v.is_empty()).then(|| PathBuf::from(v));
        }
        if let Some(v) = var("LINGUADEEP_PURGE_INTERVAL_SECS") {
            self.purge_interval_secs = parse("LINGUADEEP_PURGE_INTERVAL_SECS", v)?;
        }
        if let Some(v) = var("LINGUADEEP_LOG") {
            self.log_filter = v;
        }
        if let Some(v) = var("LINGUADEEP_LOG_JSON") {
            self.log_json = matches!(v.trim(), "1" | "true" | "yes");
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_CACHE_TTL_SECS).contains(&self.cache_ttl_secs) {
            return Err(ConfigError::Invalid(format!(
                "cache_ttl_secs must be 1..={MAX_CACHE_TTL_SECS}, got {}",
                self.cache_ttl_secs
            )));
        }
        if !(1..=MAX_PAGE_CAPACITY).contains(&self.page_capacity) {
            return Err(ConfigError::Invalid(format!(
                "page_capacity must be 1..={MAX_PAGE_CAPACITY}, got {}",
                self.page_capacity
            )));
        }
        if self.translator_timeout_ms == 0 {
            return Err(ConfigError::Invalid("translator_timeout_ms must be > 0".into()));
        }
        if !(1..=MAX_CACHE_TTL_SECS).contains(&self.purge_interval_secs) {
            return Err(ConfigError::Invalid(format!(
                "purge_interval_secs must be 1..={MAX_CACHE_TTL_SECS}, got {}",
                self.purge_interval_secs
            )));
        }
        Ok(())
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn translator_timeout(&self) -> Duration {
        Duration::from_millis(self.translator_timeout_ms)
    }

    pub fn purge_interval(&self) -> Duration {
        Duration::from_secs(self.purge_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.cache_ttl(), Duration::from_secs(3600));
        assert_eq!(config.page_capacity, 25);
    }

    #[test]
    fn env_overlay() {
        let config = Config::default()
            .overlay(env(&[
                ("LINGUADEEP_CACHE_TTL_SECS", "120"),
                ("LINGUADEEP_CACHE_DB", "/tmp/cells.db"),
                ("LINGUADEEP_LOG_JSON", "true"),
            ]))
            .unwrap();
        assert_eq!(config.cache_ttl_secs, 120);
        assert_eq!(config.cache_db_path, Some(PathBuf::from("/tmp/cells.db")));
        assert!(config.log_json);
        assert_eq!(config.translator_timeout_ms, 10_000);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            Config::default().overlay(env(&[("LINGUADEEP_PAGE_CAPACITY", "26")])),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            Config::default().overlay(env(&[("LINGUADEEP_CACHE_TTL_SECS", "soon")])),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn ttl_is_bounded() {
        let week = MAX_CACHE_TTL_SECS.to_string();
        let config = Config::default()
            .overlay(env(&[("LINGUADEEP_CACHE_TTL_SECS", week.as_str())]))
            .unwrap();
        assert_eq!(config.cache_ttl(), Duration::from_secs(7 * 24 * 3600));

        for too_long in [(MAX_CACHE_TTL_SECS + 1).to_string(), u64::MAX.to_string()] {
            assert!(matches!(
                Config::default().overlay(env(&[("LINGUADEEP_CACHE_TTL_SECS", too_long.as_str())])),
                Err(ConfigError::Invalid(_))
            ));
        }
        assert!(matches!(
            Config::default().overlay(env(&[("LINGUADEEP_PURGE_INTERVAL_SECS", "0")])),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn file_with_partial_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("linguadeep.json");
        std::fs::write(&path, r#"{ "cache_ttl_secs": 90, "page_capacity": 10 }"#).unwrap();
        let config = Config::load_from_file(&path).unwrap();
        assert_eq!(config.cache_ttl_secs, 90);
        assert_eq!(config.page_capacity, 10);
        assert_eq!(config.log_filter, "linguadeep=info");

        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(Config::load_from_file(&path), Err(ConfigError::Parse(_))));
    }
}
