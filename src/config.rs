use std::{
    env,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Expand tilde (~) in path to user's home directory
fn expand_tilde(path: &Path) -> PathBuf {
    if let Some(s) = path.to_str() {
        if let Some(stripped) = s.strip_prefix("~/") {
            if let Some(home) = dirs::home_dir() {
                return home.join(stripped);
            }
        } else if s == "~" {
            if let Some(home) = dirs::home_dir() {
                return home;
            }
        }
    }
    path.to_path_buf()
}

/// Configuration for photo-poster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PosterConfig {
    /// Base URL of the posting service
    #[serde(default = "defaults::base_url")]
    pub base_url: String,
    /// Completion poll period
    #[serde(default = "defaults::poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// How often the post control is re-evaluated
    #[serde(default = "defaults::readiness_interval_ms")]
    pub readiness_interval_ms: u64,
    /// Ceiling for the poll retry delay after consecutive failures
    #[serde(default = "defaults::max_poll_backoff_ms")]
    pub max_poll_backoff_ms: u64,
    /// Per-request timeout for both endpoints
    #[serde(default = "defaults::request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// How long a submission may wait for completion before it is failed
    #[serde(default = "defaults::submission_timeout_secs")]
    pub submission_timeout_secs: u64,
    /// Banner text
    #[serde(default = "defaults::title")]
    pub title: String,
}

impl Default for PosterConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::base_url(),
            poll_interval_ms: defaults::poll_interval_ms(),
            readiness_interval_ms: defaults::readiness_interval_ms(),
            max_poll_backoff_ms: defaults::max_poll_backoff_ms(),
            request_timeout_secs: defaults::request_timeout_secs(),
            submission_timeout_secs: defaults::submission_timeout_secs(),
            title: defaults::title(),
        }
    }
}

impl PosterConfig {
    /// Load configuration from the config file (if any) and environment
    /// variables
    pub fn load() -> Result<Self> {
        let config_path = Self::config_file_path()?;
        tracing::debug!("loading photo-poster config from {:?}", config_path);
        let mut config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            tracing::debug!("no config file at {:?}, using defaults", config_path);
            Self::default()
        };

        config.apply_env()?;
        Ok(config)
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(url) = env::var("PHOTO_POSTER_BASE_URL") {
            self.base_url = url;
        }

        if let Some(value) = env_u64("PHOTO_POSTER_POLL_INTERVAL_MS")? {
            self.poll_interval_ms = value;
        }

        if let Some(value) = env_u64("PHOTO_POSTER_READINESS_INTERVAL_MS")? {
            self.readiness_interval_ms = value;
        }

        if let Some(value) = env_u64("PHOTO_POSTER_REQUEST_TIMEOUT_SECS")? {
            self.request_timeout_secs = value;
        }

        if let Some(value) = env_u64("PHOTO_POSTER_SUBMISSION_TIMEOUT_SECS")? {
            self.submission_timeout_secs = value;
        }

        Ok(())
    }

    /// Load configuration from a file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let config: PosterConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        // Ensure directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = serde_yaml::to_string(self).context("Failed to serialize config")?;

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {:?}", path))?;

        Ok(())
    }

    /// Config file path: `PHOTO_POSTER_CONFIG` or the default under the home
    /// directory
    pub fn config_file_path() -> Result<PathBuf> {
        if let Ok(path) = env::var("PHOTO_POSTER_CONFIG") {
            return Ok(expand_tilde(&PathBuf::from(path)));
        }

        dirs::home_dir()
            .map(|home| home.join(".config/photo-poster/config.yaml"))
            .context("Could not determine home directory for config file")
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn readiness_interval(&self) -> Duration {
        Duration::from_millis(self.readiness_interval_ms.max(1))
    }

    pub fn max_poll_backoff(&self) -> Duration {
        Duration::from_millis(self.max_poll_backoff_ms).max(self.poll_interval())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn submission_timeout(&self) -> Duration {
        Duration::from_secs(self.submission_timeout_secs)
    }
}

fn env_u64(name: &str) -> Result<Option<u64>> {
    match env::var(name) {
        Ok(value) => value
            .parse()
            .map(Some)
            .with_context(|| format!("Failed to parse {} as u64", name)),
        Err(_) => Ok(None),
    }
}

mod defaults {
    pub(crate) fn base_url() -> String {
        "http://127.0.0.1:8000".to_string()
    }

    pub(crate) fn poll_interval_ms() -> u64 {
        2000
    }

    pub(crate) fn readiness_interval_ms() -> u64 {
        2000
    }

    pub(crate) fn max_poll_backoff_ms() -> u64 {
        30_000
    }

    pub(crate) fn request_timeout_secs() -> u64 {
        30
    }

    pub(crate) fn submission_timeout_secs() -> u64 {
        600
    }

    pub(crate) fn title() -> String {
        "Instagram Poster".to_string()
    }
}
