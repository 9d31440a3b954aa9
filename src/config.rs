// Configuration loading
//
// TOML file (explicit path, ./reddit-downloader.toml, then the user config
// dir), environment overrides on top, defaults for everything missing.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::downloader::models::{MuxConfig, NetworkConfig};

pub const DEFAULT_SIZE_LIMIT: u64 = 8_000_000;

const LOCAL_CONFIG: &str = "reddit-downloader.toml";
const APP_DIR: &str = "reddit-downloader";

pub const ENV_FFMPEG: &str = "REDDIT_DL_FFMPEG";
pub const ENV_PROXY: &str = "REDDIT_DL_PROXY";
pub const ENV_SIZE_LIMIT: &str = "REDDIT_DL_SIZE_LIMIT";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid value {value:?} for {var}")]
    Env { var: &'static str, value: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Largest deliverable in bytes
    pub size_limit: u64,
    pub network: NetworkConfig,
    pub mux: MuxConfig,
    /// Also fetch subscriber counts from the subreddit's about page
    pub fetch_subreddit_stats: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            size_limit: DEFAULT_SIZE_LIMIT,
            network: NetworkConfig::default(),
            mux: MuxConfig::default(),
            fetch_subreddit_stats: true,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let config: Self = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Resolve the config file, apply environment overrides
    pub fn load(custom_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match custom_path {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_paths().into_iter().find(|p| p.exists()) {
                Some(path) => {
                    tracing::debug!("Loading config from {:?}", path);
                    Self::from_file(&path)?
                }
                None => Self::default(),
            },
        };

        config.apply_overrides(|var| std::env::var(var).ok())?;
        config.validate()?;
        Ok(config)
    }

    fn default_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(LOCAL_CONFIG)];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join(APP_DIR).join("config.toml"));
        }
        paths
    }

    /// Apply `REDDIT_DL_*` overrides read through `lookup`
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(path) = lookup(ENV_FFMPEG).filter(|v| !v.is_empty()) {
            self.mux.ffmpeg_path = Some(PathBuf::from(path));
        }

        if let Some(proxy) = lookup(ENV_PROXY) {
            // an empty value switches the proxy off
            self.network.proxy = Some(proxy).filter(|p| !p.is_empty());
        }

        if let Some(raw) = lookup(ENV_SIZE_LIMIT) {
            self.size_limit = raw.trim().parse().map_err(|_| ConfigError::Env {
                var: ENV_SIZE_LIMIT,
                value: raw.clone(),
            })?;
        }

        Ok(())
    }

    /// Reject settings no download can succeed with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.size_limit == 0 {
            return Err(ConfigError::Invalid("size_limit cannot be 0".to_string()));
        }
        if self.mux.container.is_empty() {
            return Err(ConfigError::Invalid("mux.container cannot be empty".to_string()));
        }
        Ok(())
    }

    pub fn with_size_limit(mut self, size_limit: u64) -> Self {
        self.size_limit = size_limit;
        self
    }

    pub fn with_proxy(mut self, proxy: impl Into<String>) -> Self {
        self.network.proxy = Some(proxy.into());
        self
    }

    pub fn with_ffmpeg(mut self, path: impl Into<PathBuf>) -> Self {
        self.mux.ffmpeg_path = Some(path.into());
        self
    }

    pub fn with_work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.mux.work_dir = dir.into();
        self
    }

    pub fn with_subreddit_stats(mut self, enabled: bool) -> Self {
        self.fetch_subreddit_stats = enabled;
        self
    }
}
