use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, path::PathBuf, time::Duration};

use crate::error::Error;
use tracing::warn;

pub const DEFAULT_APP_NAME: &str = "weather_app";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_USER_ID: &str = "default_user";
pub const DEFAULT_SESSION_ID: &str = "default_session";
pub const DEFAULT_BIND: &str = "127.0.0.1:8000";

pub const ENV_API_KEY: &str = "GOOGLE_API_KEY";
pub const ENV_MODEL: &str = "WEATHER_AGENT_MODEL";
pub const ENV_BIND: &str = "WEATHER_AGENT_BIND";

/// Endpoints of the external data providers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    pub geocoding_url: String,
    /// Client identity sent to the geocoder.
    pub geocoding_user_agent: String,
    pub forecast_url: String,
    pub llm_url: String,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            geocoding_url: "https://nominatim.openstreetmap.org".to_string(),
            geocoding_user_agent: "geoapi".to_string(),
            forecast_url: "https://api.open-meteo.com".to_string(),
            llm_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
        }
    }
}

/// Cache and retry knobs of the outbound HTTP client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub cache_ttl_secs: u64,
    pub cache_capacity: usize,
    /// Retries after the first attempt.
    pub retries: u32,
    pub backoff_factor_ms: u64,
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: 3600,
            cache_capacity: 256,
            retries: 5,
            backoff_factor_ms: 200,
            timeout_secs: 30,
        }
    }
}

impl HttpConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn backoff_factor(&self) -> Duration {
        Duration::from_millis(self.backoff_factor_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// google_api_key = "..."
/// model = "gemini-2.0-flash"
///
/// [http]
/// retries = 5
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub app_name: String,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub google_api_key: Option<String>,
    pub default_user_id: String,
    pub default_session_id: String,
    pub bind: String,
    pub max_iterations: usize,
    pub providers: ProvidersConfig,
    pub http: HttpConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_name: DEFAULT_APP_NAME.to_string(),
            model: DEFAULT_MODEL.to_string(),
            google_api_key: None,
            default_user_id: DEFAULT_USER_ID.to_string(),
            default_session_id: DEFAULT_SESSION_ID.to_string(),
            bind: DEFAULT_BIND.to_string(),
            max_iterations: 10,
            providers: ProvidersConfig::default(),
            http: HttpConfig::default(),
        }
    }
}

impl Config {
    /// Load config from disk, then apply `.env` and process environment overrides.
    pub fn load() -> Result<Self> {
        if let Some(err) = dotenv_failure(dotenvy::dotenv()) {
            warn!(error = %err, "Ignoring unreadable .env file");
        }

        let mut cfg = Self::load_from(&Self::config_file_path()?)?;
        cfg.apply_env(|key| std::env::var(key).ok());
        Ok(cfg)
    }

    /// Load config from `path`, or return the defaults if it doesn't exist yet.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Override fields from environment-like lookups. Empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = get(ENV_API_KEY) {
            self.google_api_key = Some(key);
        }
        if let Some(model) = get(ENV_MODEL) {
            self.model = model;
        }
        if let Some(bind) = get(ENV_BIND) {
            self.bind = bind;
        }
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::config_file_path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "weather-agent", "weather-api")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// The model provider credential. Serving without it is refused.
    pub fn api_key(&self) -> crate::Result<&str> {
        self.google_api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or(Error::MissingApiKey)
    }

    pub fn set_api_key(&mut self, api_key: String) {
        self.google_api_key = Some(api_key);
    }
}

/// The error of a `.env` load, unless the file simply doesn't exist.
fn dotenv_failure(result: dotenvy::Result<PathBuf>) -> Option<dotenvy::Error> {
    result.err().filter(|err| !err.not_found())
}
