// ============================
// crates/session-lib/src/config.rs
// ============================
//! Configuration management.
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use crate::error::SessionError;

/// Default config file, looked up in the working directory
pub const CONFIG_FILE: &str = "helpdesk.toml";
/// Prefix of environment overrides, e.g. `HELPDESK_API_BASE_URL`
pub const ENV_PREFIX: &str = "HELPDESK_";

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Client settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Root of the helpdesk REST API
    pub api_base_url: String,
    /// Directory holding the stored token and cached profile
    pub data_dir: PathBuf,
    pub log_level: String,
    /// Emit logs as JSON lines
    pub log_json: bool,
    /// Lifetime of a stored token in days
    pub token_ttl_days: u64,
    /// Path the host navigates to after logout
    pub login_path: String,
    pub request_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8080/api".to_string(),
            data_dir: PathBuf::from("data"),
            log_level: "info".to_string(),
            log_json: false,
            token_ttl_days: 7,
            login_path: "/login".to_string(),
            request_timeout_secs: 30,
        }
    }
}

impl Settings {
    /// Defaults, then `helpdesk.toml`, then `HELPDESK_*` variables
    pub fn load() -> Result<Self, SessionError> {
        Self::load_from(CONFIG_FILE)
    }

    /// Same as [`Settings::load`] with an explicit config file
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, SessionError> {
        let settings: Settings = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX))
            .extract()
            .map_err(|e| SessionError::Config(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SessionError> {
        Url::parse(&self.api_base_url).map_err(|e| {
            SessionError::Config(format!("api_base_url {:?} is not a URL: {e}", self.api_base_url))
        })?;
        if !LOG_LEVELS.contains(&self.log_level.to_ascii_lowercase().as_str()) {
            return Err(SessionError::Config(format!(
                "log_level must be one of {LOG_LEVELS:?}, got {:?}",
                self.log_level
            )));
        }
        if self.token_ttl_days == 0 {
            return Err(SessionError::Config("token_ttl_days must be positive".to_string()));
        }
        if self.request_timeout_secs == 0 {
            return Err(SessionError::Config(
                "request_timeout_secs must be positive".to_string(),
            ));
        }
        if !self.login_path.starts_with('/') {
            return Err(SessionError::Config(format!(
                "login_path must start with '/', got {:?}",
                self.login_path
            )));
        }
        Ok(())
    }

    pub fn token_ttl(&self) -> Duration {
        Duration::from_secs(self.token_ttl_days.saturating_mul(24 * 60 * 60))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Directory of the secure token channel
    pub fn token_dir(&self) -> PathBuf {
        self.data_dir.join("secure")
    }

    /// Directory of the cached profile channel
    pub fn profile_dir(&self) -> PathBuf {
        self.data_dir.join("profile")
    }
}
