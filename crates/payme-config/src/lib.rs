//! Configuration management for payme
//!
//! This module handles loading, validation, and management of
//! payme configuration from YAML files.

pub mod error;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub use error::{ConfigError, ConfigResult};

/// Environment variable overriding `backend.url`
pub const ENV_BACKEND_URL: &str = "PAYME_SUPABASE_URL";
/// Environment variable overriding `backend.anon_key`
pub const ENV_BACKEND_ANON_KEY: &str = "PAYME_SUPABASE_ANON_KEY";

// ==================== Configuration Types ====================

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,
    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8082
}

/// Hosted backend (Supabase) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Project URL, e.g. `https://xyz.supabase.co`
    #[serde(default)]
    pub url: Option<String>,
    /// Public anon key
    #[serde(default)]
    pub anon_key: Option<String>,
    #[serde(default = "default_payments_table")]
    pub payments_table: String,
    #[serde(default = "default_user_meta_table")]
    pub user_meta_table: String,
    #[serde(default = "default_receipts_bucket")]
    pub receipts_bucket: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: None,
            anon_key: None,
            payments_table: default_payments_table(),
            user_meta_table: default_user_meta_table(),
            receipts_bucket: default_receipts_bucket(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl BackendConfig {
    /// Both the URL and the anon key are present and non-empty
    pub fn is_configured(&self) -> bool {
        let present = |v: &Option<String>| v.as_deref().map_or(false, |s| !s.trim().is_empty());
        present(&self.url) && present(&self.anon_key)
    }
}

fn default_payments_table() -> String {
    "payments".to_string()
}

fn default_user_meta_table() -> String {
    "user_meta".to_string()
}

fn default_receipts_bucket() -> String {
    "receipts".to_string()
}

fn default_timeout_secs() -> u64 {
    15
}

/// Which date a history record is filtered by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateBasis {
    /// Calendar day of the backend insertion timestamp
    CreatedAt,
    /// First day of the billing month
    MonthYear,
}

impl Default for DateBasis {
    fn default() -> Self {
        DateBasis::CreatedAt
    }
}

impl std::str::FromStr for DateBasis {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "created_at" => Ok(DateBasis::CreatedAt),
            "month_year" => Ok(DateBasis::MonthYear),
            _ => Err(format!("Invalid date basis: {}", s)),
        }
    }
}

impl std::fmt::Display for DateBasis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DateBasis::CreatedAt => write!(f, "created_at"),
            DateBasis::MonthYear => write!(f, "month_year"),
        }
    }
}

/// Payment history view settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HistoryConfig {
    /// Date used by the date-from / date-to filters
    #[serde(default)]
    pub date_basis: DateBasis,
    /// Sort filter dropdown options instead of keeping first-seen order
    #[serde(default)]
    pub sort_filter_options: bool,
}

/// Fixed options offered by the payment form before any custom values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChoicesConfig {
    #[serde(default)]
    pub addresses: Vec<String>,
    #[serde(default = "default_payment_types")]
    pub payment_types: Vec<String>,
    #[serde(default = "default_banks")]
    pub banks: Vec<String>,
}

impl Default for ChoicesConfig {
    fn default() -> Self {
        Self {
            addresses: Vec::new(),
            payment_types: default_payment_types(),
            banks: default_banks(),
        }
    }
}

fn default_payment_types() -> Vec<String> {
    ["Электроэнергия", "Газ", "Вода", "Мусор", "Квартплата", "Интернет"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_banks() -> Vec<String> {
    ["Сбер", "Альфа", "Т-Банк", "ВТБ"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Offline asset cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Cache generation name; bumping it evicts older generations on activation
    #[serde(default = "default_cache_name")]
    pub name: String,
    /// Directory static assets are served from
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,
    /// Assets pre-cached on install, relative to `static_dir`
    #[serde(default = "default_cache_assets")]
    pub assets: Vec<String>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            name: default_cache_name(),
            static_dir: default_static_dir(),
            assets: default_cache_assets(),
        }
    }
}

fn default_cache_name() -> String {
    "payme-v1".to_string()
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("./static")
}

fn default_cache_assets() -> Vec<String> {
    ["style.css", "app.js", "manifest.json", "icon.svg"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}
/// Per-device session limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Sessions idle for longer than this are dropped
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
    /// Upper bound on live sessions; the least recently used is dropped first
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: default_idle_timeout_secs(),
            max_sessions: default_max_sessions(),
        }
    }
}

fn default_idle_timeout_secs() -> u64 {
    30 * 60
}

fn default_max_sessions() -> usize {
    1000
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub choices: ChoicesConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub sessions: SessionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a YAML file, then apply environment overrides
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.display().to_string(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_yaml(&content)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from YAML text without touching the environment
    pub fn from_yaml(content: &str) -> ConfigResult<Self> {
        serde_yaml::from_str(content).map_err(|e| ConfigError::InvalidYaml {
            message: e.to_string(),
        })
    }

    /// Override backend credentials from the environment
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_BACKEND_URL).filter(|v| !v.is_empty()) {
            log::debug!("backend.url overridden by {}", ENV_BACKEND_URL);
            self.backend.url = Some(url);
        }
        if let Some(key) = lookup(ENV_BACKEND_ANON_KEY).filter(|v| !v.is_empty()) {
            log::debug!("backend.anon_key overridden by {}", ENV_BACKEND_ANON_KEY);
            self.backend.anon_key = Some(key);
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> ConfigResult<()> {
        if self.server.port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.port".to_string(),
                reason: "Port must be greater than 0".to_string(),
            });
        }

        if let Some(url) = self.backend.url.as_deref() {
            if !url.is_empty() && !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::InvalidValue {
                    field: "backend.url".to_string(),
                    reason: "URL must start with http:// or https://".to_string(),
                });
            }
        }

        if self.backend.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "backend.timeout_secs".to_string(),
                reason: "Timeout must be at least 1 second".to_string(),
            });
        }

        for (field, value) in [
            ("backend.payments_table", &self.backend.payments_table),
            ("backend.user_meta_table", &self.backend.user_meta_table),
            ("backend.receipts_bucket", &self.backend.receipts_bucket),
            ("cache.name", &self.cache.name),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    reason: "Value must not be empty".to_string(),
                });
            }
        }

        if self.sessions.idle_timeout_secs == 0 || self.sessions.max_sessions == 0 {
            return Err(ConfigError::InvalidValue {
                field: "sessions".to_string(),
                reason: "Idle timeout and session limit must be greater than 0".to_string(),
            });
        }

        if let Some(asset) = self.cache.assets.iter().find(|a| a.contains("..")) {
            return Err(ConfigError::InvalidValue {
                field: "cache.assets".to_string(),
                reason: format!("Asset path '{}' must stay inside the static directory", asset),
            });
        }

        Ok(())
    }

    /// Generate a default configuration file
    pub fn generate_default() -> &'static str {
        include_str!("../templates/default_config.yaml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_from_empty_yaml() {
        let config = Config::from_yaml("{}").unwrap();
        assert_eq!(config.server.port, 8082);
        assert_eq!(config.backend.payments_table, "payments");
        assert_eq!(config.backend.user_meta_table, "user_meta");
        assert_eq!(config.backend.receipts_bucket, "receipts");
        assert_eq!(config.history.date_basis, DateBasis::CreatedAt);
        assert!(!config.history.sort_filter_options);
        assert_eq!(config.cache.name, "payme-v1");
        assert!(!config.backend.is_configured());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_template_parses_and_validates() {
        let config = Config::from_yaml(Config::generate_default()).unwrap();
        assert!(config.validate().is_ok());
        assert!(!config.choices.payment_types.is_empty());
    }

    #[test]
    fn test_history_section() {
        let yaml = "history:\n  date_basis: month_year\n  sort_filter_options: true\n";
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.history.date_basis, DateBasis::MonthYear);
        assert!(config.history.sort_filter_options);
    }

    #[test]
    fn test_sessions_section() {
        let config = Config::from_yaml("{}").unwrap();
        assert_eq!(config.sessions.idle_timeout_secs, 1800);
        assert_eq!(config.sessions.max_sessions, 1000);

        let config = Config::from_yaml("sessions:\n  max_sessions: 0\n").unwrap();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "sessions"));
    }

    #[test]
    fn test_date_basis_from_str() {
        assert_eq!("created_at".parse::<DateBasis>().unwrap(), DateBasis::CreatedAt);
        assert_eq!("MONTH_YEAR".parse::<DateBasis>().unwrap(), DateBasis::MonthYear);
        assert!("weekly".parse::<DateBasis>().is_err());
        assert_eq!(DateBasis::MonthYear.to_string(), "month_year");
    }

    #[test]
    fn test_validate_rejects_zero_port() {
        let mut config = Config::default();
        config.server.port = 0;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "server.port"));
    }

    #[test]
    fn test_validate_rejects_bad_url() {
        let mut config = Config::default();
        config.backend.url = Some("ftp://example.org".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_escaping_asset() {
        let mut config = Config::default();
        config.cache.assets.push("../secret".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_apply_env_overrides_backend() {
        let mut config = Config::default();
        config.apply_env(|key| match key {
            ENV_BACKEND_URL => Some("https://demo.supabase.co".to_string()),
            ENV_BACKEND_ANON_KEY => Some("anon".to_string()),
            _ => None,
        });
        assert_eq!(config.backend.url.as_deref(), Some("https://demo.supabase.co"));
        assert!(config.backend.is_configured());
    }

    #[test]
    fn test_load_missing_file() {
        let err = Config::load("/definitely/not/here.yaml").unwrap_err();
        assert_eq!(err.code(), error::ConfigErrorCode::FileNotFound);
        assert!(!err.to_details().suggestions.is_empty());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "server:\n  port: 9000\nchoices:\n  addresses: [\"ул. Мира, 1\"]").unwrap();
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.choices.addresses, vec!["ул. Мира, 1".to_string()]);
    }

    #[test]
    fn test_load_invalid_yaml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "server: [unclosed").unwrap();
        let err = Config::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidYaml { .. }));
    }
}
