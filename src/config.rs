use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::clients::gateway::{DEFAULT_AUTH_HEADER, DEFAULT_RETRIES};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub api: ApiConfig,

    pub host: HostConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub log_level: String,

    /// Emit logs as JSON lines instead of human-readable text
    pub log_json: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_json: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,

    /// Per-attempt request timeout in seconds (default: 30)
    pub request_timeout_seconds: u64,

    /// Extra attempts after a transport failure (default: 1).
    /// Error responses from the server are never retried.
    pub retries: u32,

    /// Header carrying the host init data
    pub auth_header: String,

    pub user_agent: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://tgapi.zchan.moe".to_string(),
            request_timeout_seconds: 30,
            retries: DEFAULT_RETRIES,
            auth_header: DEFAULT_AUTH_HEADER.to_string(),
            user_agent: concat!("tgsearch/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Token used until the host delivers one. Empty means anonymous.
    pub init_data: String,

    /// Environment variable the CLI treats as the host's init-data signal
    pub init_data_env: String,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            init_data: String::new(),
            init_data_env: "TGSEARCH_INIT_DATA".to_string(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let paths = Self::config_paths();

        for path in &paths {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                return Self::load_from_path(path);
            }
        }

        info!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        info!("Config saved to: {}", path.display());
        Ok(())
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![Self::default_config_path()];

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("tgsearch").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".tgsearch").join("config.toml"));
        }

        paths
    }

    fn default_config_path() -> PathBuf {
        PathBuf::from("config.toml")
    }

    pub fn create_default_if_missing() -> Result<bool> {
        Self::create_default_at(&Self::default_config_path())
    }

    /// Writes the default config to `path` unless something is already there.
    pub fn create_default_at(path: &Path) -> Result<bool> {
        if path.exists() {
            Ok(false)
        } else {
            Self::default().save_to_path(path)?;
            info!("Created default config file: {}", path.display());
            Ok(true)
        }
    }

    pub fn validate(&self) -> Result<()> {
        let base = url::Url::parse(&self.api.base_url)
            .with_context(|| format!("Invalid API base URL: '{}'", self.api.base_url))?;
        if !matches!(base.scheme(), "http" | "https") {
            anyhow::bail!("API base URL must be http or https, got '{}'", base.scheme());
        }

        if self.api.auth_header.trim().is_empty() {
            anyhow::bail!("Auth header name cannot be empty");
        }

        if self.api.request_timeout_seconds == 0 {
            anyhow::bail!("Request timeout must be > 0");
        }

        Ok(())
    }

    /// Init data published by the environment, if any.
    #[must_use]
    pub fn host_init_data(&self) -> Option<String> {
        std::env::var(&self.host.init_data_env)
            .ok()
            .filter(|value| !value.is_empty())
    }
}
