use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config '{path}': {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),

    #[error("Missing credential: environment variable {0} is not set")]
    MissingCredential(String),

    #[error("Unsupported blob connection: {0}")]
    UnsupportedConnection(String),
}

/// Pipeline configuration, loaded once at process start.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub location: LocationConfig,
    pub api: ApiConfig,
    pub staging: StagingConfig,
    pub storage: StorageConfig,
    pub schedule: ScheduleConfig,
    pub credentials: CredentialsConfig,
}

/// Fixed coordinate the observations are fetched for.
#[derive(Debug, Clone, Deserialize)]
pub struct LocationConfig {
    #[serde(default = "default_latitude")]
    pub latitude: f64,

    #[serde(default = "default_longitude")]
    pub longitude: f64,
}

// Porto, PT
fn default_latitude() -> f64 {
    41.14961
}

fn default_longitude() -> f64 {
    -8.61099
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            latitude: default_latitude(),
            longitude: default_longitude(),
        }
    }
}

/// Weather API endpoint settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Base address; `/data/2.5/weather` is appended.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout. Unset means the HTTP client default.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_base_url() -> String {
    "https://api.openweathermap.org".to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StagingConfig {
    #[serde(default = "default_staging_path")]
    pub path: PathBuf,
}

fn default_staging_path() -> PathBuf {
    std::env::temp_dir().join("processed_weather_data.json")
}

impl Default for StagingConfig {
    fn default() -> Self {
        Self {
            path: default_staging_path(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_container")]
    pub container: String,
}

fn default_container() -> String {
    "tst".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            container: default_container(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleConfig {
    /// Cron expression (5 or 6 fields, or `@hourly` style shorthands).
    #[serde(default = "default_cron")]
    pub cron: String,
}

fn default_cron() -> String {
    "@hourly".to_string()
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            cron: default_cron(),
        }
    }
}

/// Names of the environment variables holding secrets.
#[derive(Debug, Clone, Deserialize)]
pub struct CredentialsConfig {
    #[serde(default = "default_api_key_var")]
    pub api_key_var: String,

    #[serde(default = "default_blob_connection_var")]
    pub blob_connection_var: String,
}

fn default_api_key_var() -> String {
    "OPENWEATHER_API_KEY".to_string()
}

fn default_blob_connection_var() -> String {
    "WEATHER_BLOB_CONNECTION".to_string()
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            api_key_var: default_api_key_var(),
            blob_connection_var: default_blob_connection_var(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from a YAML file and validate it.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&content)
    }

    /// Load from `path` if it exists, otherwise use defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            log::info!("Config file not found, using defaults: {}", path.display());
            let config = Self::default();
            config.validate()?;
            return Ok(config);
        }
        Self::load(path)
    }

    /// Parse and validate configuration from a YAML string.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let config: PipelineConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let LocationConfig {
            latitude,
            longitude,
        } = self.location;
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(ConfigError::Invalid(format!(
                "latitude {latitude} out of range [-90, 90]"
            )));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(ConfigError::Invalid(format!(
                "longitude {longitude} out of range [-180, 180]"
            )));
        }
        if self.api.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid("api.base_url is empty".into()));
        }
        if self.storage.container.trim().is_empty() {
            return Err(ConfigError::Invalid("storage.container is empty".into()));
        }
        crate::scheduler::parse_schedule(&self.schedule.cron)
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        Ok(())
    }
}

/// Secrets resolved once at startup from the credential store.
#[derive(Clone)]
pub struct Credentials {
    pub api_key: String,
    pub blob_connection: String,
}

impl Credentials {
    /// Resolve credentials from the process environment.
    pub fn from_env(config: &CredentialsConfig) -> Result<Self, ConfigError> {
        Self::from_lookup(config, |name| std::env::var(name).ok())
    }

    /// Resolve credentials through an arbitrary key-value lookup.
    pub fn from_lookup<F>(config: &CredentialsConfig, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let fetch = |name: &str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| ConfigError::MissingCredential(name.to_string()))
        };
        Ok(Self {
            api_key: fetch(&config.api_key_var)?,
            blob_connection: fetch(&config.blob_connection_var)?,
        })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"[REDACTED]")
            .field("blob_connection", &"[REDACTED]")
            .finish()
    }
}
