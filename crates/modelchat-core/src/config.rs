use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{DownloadSource, ModelChatError, Result};

pub const ENV_BACKEND: &str = "MODELCHAT_BACKEND";
pub const ENV_POLL_INTERVAL_MS: &str = "MODELCHAT_POLL_INTERVAL_MS";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub poll: PollConfig,
    #[serde(default)]
    pub download: DownloadConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub base_url: String,
    /// Per-request timeout; 0 disables it.
    pub request_timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8001".to_string(),
            request_timeout_secs: 300,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    pub interval_ms: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self { interval_ms: 1000 }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DownloadConfig {
    #[serde(default)]
    pub default_source: DownloadSource,
}

impl ClientConfig {
    /// Read a JSON config file; missing sections fall back to defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ModelChatError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&raw)
            .map_err(|e| ModelChatError::Config(format!("invalid {}: {}", path.display(), e)))
    }

    /// Overlay environment variables, looked up through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_BACKEND) {
            self.backend.base_url = url;
        }
        if let Some(ms) = lookup(ENV_POLL_INTERVAL_MS) {
            self.poll.interval_ms = ms.trim().parse().map_err(|_| {
                ModelChatError::Config(format!("{ENV_POLL_INTERVAL_MS} is not a number: {ms}"))
            })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.backend.base_url.trim().is_empty() {
            return Err(ModelChatError::Config("backend base_url is empty".into()));
        }
        if self.poll.interval_ms == 0 {
            return Err(ModelChatError::Config("poll interval must be positive".into()));
        }
        Ok(())
    }

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.backend.base_url.trim_end_matches('/')
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        match self.backend.request_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll.interval_ms)
    }
}
