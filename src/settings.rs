use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::application::services::{
    PollConfig, DEFAULT_COMPLETION_DISPLAY, DEFAULT_MAX_ATTEMPTS, DEFAULT_POLL_INTERVAL,
    DEFAULT_TOP_K,
};
use crate::domain::DomainError;
use crate::infrastructure::{ClientConfig, DEFAULT_BASE_URL, DEFAULT_TIMEOUT};

/// Default filename used to persist configuration within the data directory.
const CONFIG_FILENAME: &str = "config.json";

pub const ENV_BASE_URL: &str = "DOCUMIND_BASE_URL";
pub const ENV_TIMEOUT_SECS: &str = "DOCUMIND_TIMEOUT_SECS";
pub const ENV_API_KEY: &str = "DOCUMIND_API_KEY";

/// Complete persisted configuration payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub poll_max_attempts: u32,
    pub poll_interval_ms: u64,
    pub completion_display_ms: u64,
    pub top_k: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT.as_secs(),
            api_key: None,
            poll_max_attempts: DEFAULT_MAX_ATTEMPTS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL.as_millis() as u64,
            completion_display_ms: DEFAULT_COMPLETION_DISPLAY.as_millis() as u64,
            top_k: DEFAULT_TOP_K,
        }
    }
}

impl AppConfig {
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::new(self.base_url.clone())
            .with_timeout(Duration::from_secs(self.timeout_secs.max(1)))
            .with_api_key(self.api_key.clone())
    }

    pub fn poll_config(&self) -> PollConfig {
        PollConfig::new(
            self.poll_max_attempts,
            Duration::from_millis(self.poll_interval_ms),
        )
    }

    pub fn completion_display(&self) -> Duration {
        Duration::from_millis(self.completion_display_ms)
    }

    /// Layer environment overrides on top of the stored values. Unparseable
    /// numbers are ignored with a warning.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = lookup(ENV_BASE_URL).filter(|url| !url.trim().is_empty()) {
            self.base_url = url.trim().to_string();
        }
        if let Some(raw) = lookup(ENV_TIMEOUT_SECS) {
            match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => self.timeout_secs = secs,
                _ => warn!(
                    target: "documind::config",
                    value = %raw,
                    "ignoring invalid {ENV_TIMEOUT_SECS}"
                ),
            }
        }
        if let Some(key) = lookup(ENV_API_KEY).filter(|key| !key.trim().is_empty()) {
            self.api_key = Some(key);
        }
        self
    }
}

/// Thread-safe manager responsible for loading and persisting `AppConfig`.
pub struct ConfigManager {
    path: PathBuf,
    state: RwLock<AppConfig>,
}

impl ConfigManager {
    /// Create a manager rooted at `data_dir`. The JSON file will be located at
    /// `<data_dir>/config.json`; a missing or unreadable file yields defaults.
    pub fn load(data_dir: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = data_dir.as_ref().join(CONFIG_FILENAME);
        let config = if path.exists() {
            match fs::read(&path)
                .map_err(|err| err.to_string())
                .and_then(|bytes| {
                    serde_json::from_slice::<AppConfig>(&bytes).map_err(|err| err.to_string())
                }) {
                Ok(config) => config,
                Err(err) => {
                    warn!(
                        target: "documind::config",
                        path = %path.display(),
                        "falling back to defaults: {err}"
                    );
                    AppConfig::default()
                }
            }
        } else {
            AppConfig::default()
        };

        Ok(Self {
            path,
            state: RwLock::new(config),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Snapshot of the stored configuration, without env overrides.
    pub fn current(&self) -> AppConfig {
        self.state.read().clone()
    }

    /// Stored configuration with process environment overrides applied.
    pub fn effective(&self) -> AppConfig {
        self.current()
            .with_overrides(|name| std::env::var(name).ok())
    }

    /// Update the backend base URL and persist to disk.
    pub fn set_base_url(&self, base_url: &str) -> Result<AppConfig, DomainError> {
        let base_url = base_url.trim().trim_end_matches('/');
        let parsed = reqwest::Url::parse(base_url)
            .map_err(|err| DomainError::config(format!("invalid base URL '{base_url}': {err}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(DomainError::config("base URL must use http or https"));
        }

        self.update(|config| config.base_url = base_url.to_string())
    }

    pub fn set_api_key(&self, api_key: Option<String>) -> Result<AppConfig, DomainError> {
        let api_key = api_key.filter(|key| !key.trim().is_empty());
        self.update(|config| config.api_key = api_key)
    }

    fn update(&self, apply: impl FnOnce(&mut AppConfig)) -> Result<AppConfig, DomainError> {
        let mut guard = self.state.write();
        let mut next = guard.clone();
        apply(&mut next);
        self.persist(&next)
            .map_err(|err| DomainError::config(format!("failed to save configuration: {err}")))?;
        *guard = next.clone();
        Ok(next)
    }

    /// Ensure the backing directory exists and write the JSON payload.
    fn persist(&self, config: &AppConfig) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let payload = serde_json::to_vec_pretty(config)?;
        fs::write(&self.path, payload)
    }
}
