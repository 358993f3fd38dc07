//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.
//!
//! The backend URL and public (anon) key are required; [`Config::validate`]
//! turns their absence into a startup error.

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Hosted backend connection settings
#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    /// Project URL, e.g. `https://abcd1234.supabase.co`
    #[serde(default)]
    pub url: String,

    /// Public anon key sent as `apikey`
    #[serde(default)]
    pub anon_key: String,

    /// Persist the session in local storage between runs
    #[serde(default = "default_persist_session")]
    pub persist_session: bool,

    /// Refresh the access token when it is about to expire
    #[serde(default = "default_auto_refresh")]
    pub auto_refresh_token: bool,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_persist_session() -> bool {
    true
}

fn default_auto_refresh() -> bool {
    true
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            anon_key: String::new(),
            persist_session: default_persist_session(),
            auto_refresh_token: default_auto_refresh(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl BackendConfig {
    pub fn new(url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            anon_key: anon_key.into(),
            ..Self::default()
        }
    }

    /// URL without trailing slash
    pub fn base_url(&self) -> &str {
        self.url.trim_end_matches('/')
    }

    /// Project reference: the first label of the URL host
    /// (`https://abcd.supabase.co` → `abcd`)
    pub fn project_ref(&self) -> String {
        let without_scheme = self
            .base_url()
            .split_once("://")
            .map(|(_, rest)| rest)
            .unwrap_or(self.base_url());
        let host = without_scheme.split(['/', ':']).next().unwrap_or_default();
        host.split('.').next().unwrap_or_default().to_string()
    }

    /// Local storage key under which the backend client keeps its session
    pub fn session_storage_key(&self) -> String {
        format!("sb-{}-auth-token", self.project_ref())
    }
}

/// Local storage location
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

fn default_data_dir() -> String {
    dirs::data_local_dir()
        .map(|p| p.join("spendbook").to_string_lossy().to_string())
        .unwrap_or_else(|| "./spendbook_data".to_string())
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Self::from_toml(&content).map_err(|e| match e {
            ConfigError::Parse { error, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                error,
            },
            other => other,
        })
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: PathBuf::new(),
            error: e.to_string(),
        })
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from an explicit path, the default locations, or environment.
    ///
    /// An explicit path that cannot be loaded is an error; failures at the
    /// default locations are logged and skipped.
    pub fn load_default(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            let config = Self::load_with_env(path)?;
            tracing::info!("Loaded config from {:?}", path);
            return Ok(config);
        }

        let config_paths = [
            dirs::config_dir().map(|p| p.join("spendbook").join("config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path in config_paths.iter().flatten() {
            if path.exists() {
                match Self::load_with_env(path) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path);
                        return Ok(config);
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path, e);
                    }
                }
            }
        }

        tracing::debug!("Using default config with environment overrides");
        Ok(Self::from_env())
    }

    /// Check the settings the client cannot start without
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.backend.url.trim().is_empty() {
            return Err(ConfigError::Missing {
                key: "backend.url",
                env: "SPENDBOOK_SUPABASE_URL",
            });
        }
        if self.backend.anon_key.trim().is_empty() {
            return Err(ConfigError::Missing {
                key: "backend.anon_key",
                env: "SPENDBOOK_SUPABASE_ANON_KEY",
            });
        }
        Ok(())
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let first = |keys: &[&str]| keys.iter().find_map(|k| lookup(k));

        // Backend overrides
        if let Some(url) = first(&["SPENDBOOK_SUPABASE_URL", "SUPABASE_URL"]) {
            self.backend.url = url;
        }
        if let Some(key) = first(&["SPENDBOOK_SUPABASE_ANON_KEY", "SUPABASE_ANON_KEY"]) {
            self.backend.anon_key = key;
        }

        // Storage overrides
        if let Some(data_dir) = lookup("SPENDBOOK_DATA_DIR") {
            self.storage.data_dir = data_dir;
        }

        // Logging overrides
        if let Some(level) = lookup("SPENDBOOK_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("SPENDBOOK_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },

    #[error("Missing required setting `{key}` (set it in config.toml or via {env})")]
    Missing { key: &'static str, env: &'static str },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Spendbook Configuration
#
# Environment variables override these settings:
# - SPENDBOOK_SUPABASE_URL (or SUPABASE_URL)
# - SPENDBOOK_SUPABASE_ANON_KEY (or SUPABASE_ANON_KEY)
# - SPENDBOOK_DATA_DIR
# - SPENDBOOK_LOG_LEVEL
# - SPENDBOOK_LOG_FORMAT

[backend]
# Supabase project URL (required)
url = ""

# Public anon key (required)
anon_key = ""

# Keep the session between runs
persist_session = true

# Refresh the access token before it expires
auto_refresh_token = true

# HTTP request timeout in seconds
request_timeout_secs = 30

[storage]
# Directory for the local storage file (default: platform data directory)
# data_dir = "/home/me/.local/share/spendbook"

[logging]
# Log level: trace, debug, info, warn, error
level = "warn"

# Log format: pretty or json
format = "pretty"
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config_template_parses() {
        let config = Config::from_toml(&generate_default_config()).unwrap();
        assert_eq!(config.backend.request_timeout_secs, 30);
        assert!(config.backend.persist_session);
        assert_eq!(config.logging.level, "warn");
    }

    #[test]
    fn test_validate_requires_url_and_key() {
        let mut config = Config::default();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Missing { key: "backend.url", .. }));

        config.backend.url = "https://abcd.supabase.co".to_string();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Missing { key: "backend.anon_key", .. }));

        config.backend.anon_key = "anon".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_overrides_prefer_prefixed_names() {
        let env: HashMap<&str, &str> = [
            ("SUPABASE_URL", "https://plain.supabase.co"),
            ("SPENDBOOK_SUPABASE_URL", "https://prefixed.supabase.co"),
            ("SUPABASE_ANON_KEY", "plain-key"),
            ("SPENDBOOK_LOG_FORMAT", "json"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.backend.url, "https://prefixed.supabase.co");
        assert_eq!(config.backend.anon_key, "plain-key");
        assert_eq!(config.logging.format, "json");
    }

    #[test]
    fn test_project_ref_and_storage_key() {
        let backend = BackendConfig::new("https://abcd1234.supabase.co/", "k");
        assert_eq!(backend.base_url(), "https://abcd1234.supabase.co");
        assert_eq!(backend.project_ref(), "abcd1234");
        assert_eq!(backend.session_storage_key(), "sb-abcd1234-auth-token");

        let local = BackendConfig::new("http://localhost:54321", "k");
        assert_eq!(local.project_ref(), "localhost");
    }

    #[test]
    fn test_load_missing_file() {
        let err = Config::load(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
