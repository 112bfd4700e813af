//! Configuration for the SGChain wallet client

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Primary login bearer token environment variable name.
///
/// The login/OTP flow that produces this token lives elsewhere in the
/// platform; this client only consumes it.
pub const ACCESS_TOKEN_ENV: &str = "SGC_ACCESS_TOKEN";

/// Environment variable names
mod env_vars {
    pub const API_BASE_URL: &str = "SGC_API_BASE_URL";
    pub const STATE_FILE: &str = "SGC_STATE_FILE";
    pub const UNLOCK_WINDOW_MS: &str = "SGC_UNLOCK_WINDOW_MS";
    pub const AUDIT_LOG_PATH: &str = "SGC_AUDIT_LOG_PATH";
}

/// Default API base, matching the platform's local dev server.
const DEFAULT_API_BASE_URL: &str = "http://localhost:3000/api";

/// Default durable state file for the unlock session.
const DEFAULT_STATE_FILE: &str = "wallet-state.json";

/// Unlock window policy for the wallet session
///
/// The window is absolute from the moment of PIN verification. It is a
/// policy constant, never persisted; rehydration recomputes remaining time
/// from the stored unlock timestamp.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct UnlockPolicy {
    /// Grace window after a successful PIN verification (milliseconds)
    pub window_ms: u64,
}

impl Default for UnlockPolicy {
    fn default() -> Self {
        Self {
            window_ms: 300_000, // 5 minutes
        }
    }
}

impl UnlockPolicy {
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }
}

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Platform API base URL
    pub api_base_url: Url,
    /// Path to the durable unlock-state file
    pub state_file: PathBuf,
    /// Unlock window policy
    #[serde(default)]
    pub unlock: UnlockPolicy,
    /// Path to audit log file (JSONL); disabled when absent
    #[serde(default)]
    pub audit_log_path: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: Url::parse(DEFAULT_API_BASE_URL).expect("default URL is valid"),
            state_file: PathBuf::from(DEFAULT_STATE_FILE),
            unlock: UnlockPolicy::default(),
            audit_log_path: None,
        }
    }
}

impl Config {
    /// Build configuration from environment variables, falling back to
    /// defaults for anything unset.
    pub fn from_env() -> Result<Self> {
        let mut config = Config::default();

        if let Ok(url) = std::env::var(env_vars::API_BASE_URL) {
            tracing::debug!("Using SGC_API_BASE_URL for API base");
            config.api_base_url = Url::parse(&url)
                .map_err(|e| Error::Config(format!("invalid {}: {}", env_vars::API_BASE_URL, e)))?;
        }
        if let Ok(path) = std::env::var(env_vars::STATE_FILE) {
            config.state_file = PathBuf::from(path);
        }
        if let Ok(ms) = std::env::var(env_vars::UNLOCK_WINDOW_MS) {
            config.unlock.window_ms = ms.parse().map_err(|e| {
                Error::Config(format!("invalid {}: {}", env_vars::UNLOCK_WINDOW_MS, e))
            })?;
        }
        if let Ok(path) = std::env::var(env_vars::AUDIT_LOG_PATH) {
            config.audit_log_path = Some(path);
        }

        Ok(config)
    }

    /// Load configuration from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| Error::Config(e.to_string()))?;
        serde_json::from_str(&content).map_err(|e| Error::Config(e.to_string()))
    }

    /// Primary login bearer token from the environment, if present.
    pub fn primary_token_from_env() -> Option<String> {
        std::env::var(ACCESS_TOKEN_ENV).ok()
    }
}
