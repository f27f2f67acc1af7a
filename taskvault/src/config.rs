//! Configuration for the TaskVault client.

use std::path::{Path, PathBuf};

use config::{Config as ConfigLoader, ConfigError, Environment, File};
use serde::Deserialize;

/// Main configuration structure for the client.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub supabase: SupabaseConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub http: HttpConfig,
}

/// Hosted project the client talks to.
#[derive(Debug, Clone, Deserialize)]
pub struct SupabaseConfig {
    /// Project URL, e.g. `https://abcd.supabase.co`
    pub url: String,
    /// Public anon key, sent as `apikey` on every request.
    pub anon_key: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct SessionConfig {
    /// Where the signed-in session is persisted. Defaults to the user config dir.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl SessionConfig {
    pub fn resolved_path(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(default_session_path)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
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

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
        }
    }
}

// Default values
fn default_log_level() -> String {
    "warn".to_string()
}
fn default_timeout() -> u64 {
    30
}
fn default_session_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("taskvault")
        .join("session.json")
}

impl Config {
    /// Load configuration from file and environment variables.
    ///
    /// Configuration sources (in order of precedence):
    /// 1. Environment variables (TASKVAULT__SECTION__KEY format)
    /// 2. The given file, or taskvault.toml in the working directory (if present)
    /// 3. Built-in defaults
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name("taskvault").required(false),
        };

        let config = ConfigLoader::builder()
            // Set defaults
            .set_default("logging.level", default_log_level())?
            .set_default("http.timeout_secs", default_timeout() as i64)?
            .add_source(file)
            // Override with environment variables (TASKVAULT__SECTION__KEY format)
            .add_source(
                Environment::with_prefix("TASKVAULT")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
