//! Root configuration model and loader.
//!
//! Configuration lives at `~/.config/threadline/config.toml`. A missing file
//! yields the defaults; a malformed file is an error rather than a silent
//! fallback. `THREADLINE_BASE_URL` overrides the backend base URL for
//! development against local stacks.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, ThreadlineError};
use crate::username::DEFAULT_USERNAME_LEN;

/// Environment variable overriding `backend.base_url`.
pub const BASE_URL_ENV: &str = "THREADLINE_BASE_URL";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RootConfig {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub profile: ProfileConfig,
}

/// Backend endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the chat API, without a trailing slash
    pub base_url: String,
    /// Path of the change-feed stream, relative to `base_url`
    pub subscribe_path: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:4000/api".to_string(),
            subscribe_path: "/chat/subscribe".to_string(),
        }
    }
}

/// Chat surface defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ChatConfig {
    /// Preferred completion model id; the catalog's first available entry
    /// is used when unset or unknown
    #[serde(default)]
    pub default_model: Option<String>,
    /// Directory transcripts are exported to; defaults to the working
    /// directory
    #[serde(default)]
    pub export_dir: Option<PathBuf>,
}

/// Username bootstrap tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileConfig {
    /// Target username length (at most 10)
    pub username_max_len: usize,
    /// Upsert attempts before the bootstrap gives up
    pub bootstrap_attempts: usize,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            username_max_len: DEFAULT_USERNAME_LEN,
            bootstrap_attempts: 10,
        }
    }
}

impl RootConfig {
    /// Loads the configuration from the default location.
    pub fn load() -> Result<Self> {
        let path = Self::default_path()?;
        Self::load_from(&path)
    }

    /// Loads the configuration from an explicit path.
    ///
    /// A missing file yields [`RootConfig::default`]. The base-URL
    /// environment override applies in both cases.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let raw = std::fs::read_to_string(path)?;
            toml::from_str(&raw)?
        } else {
            debug!(path = %path.display(), "config file missing, using defaults");
            Self::default()
        };

        if let Ok(base_url) = std::env::var(BASE_URL_ENV) {
            if !base_url.is_empty() {
                config.backend.base_url = base_url;
            }
        }

        Ok(config)
    }

    /// `~/.config/threadline/config.toml`
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| ThreadlineError::config("could not resolve the user config directory"))?;
        Ok(config_dir.join("threadline").join("config.toml"))
    }

    /// The absolute URL of the change-feed stream.
    pub fn subscribe_url(&self) -> String {
        format!(
            "{}{}",
            self.backend.base_url.trim_end_matches('/'),
            self.backend.subscribe_path
        )
    }
}
