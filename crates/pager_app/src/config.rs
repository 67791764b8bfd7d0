//! Optional RON configuration for the pager binary.
//!
//! Every field has a default, so a missing file or a partial file is fine.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use engine_logging::{engine_info, LogDestination};
use pager_engine::FetchSettings;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to parse config {path:?}: {message}")]
    Parse { path: PathBuf, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api_base: String,
    pub user_agent: String,
    pub connect_timeout_ms: u64,
    pub request_timeout_ms: u64,
    pub log_file: Option<PathBuf>,
    /// Also log to the terminal when `log_file` is set.
    pub log_to_terminal: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        let fetch = FetchSettings::default();
        Self {
            api_base: fetch.api_base,
            user_agent: fetch.user_agent,
            connect_timeout_ms: millis(fetch.connect_timeout),
            request_timeout_ms: millis(fetch.request_timeout),
            log_file: None,
            log_to_terminal: false,
        }
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

impl AppConfig {
    pub fn log_destination(&self) -> LogDestination {
        match (&self.log_file, self.log_to_terminal) {
            (Some(path), true) => LogDestination::Both(path.clone()),
            (Some(path), false) => LogDestination::File(path.clone()),
            (None, _) => LogDestination::Terminal,
        }
    }

    pub fn fetch_settings(&self) -> FetchSettings {
        FetchSettings {
            api_base: self.api_base.clone(),
            user_agent: self.user_agent.clone(),
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            request_timeout: Duration::from_millis(self.request_timeout_ms),
        }
    }
}

/// Loads the config at `path`, or the defaults when no path is given.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let Some(path) = path else {
        return Ok(AppConfig::default());
    };
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config = ron::from_str(&content).map_err(|err| ConfigError::Parse {
        path: path.to_path_buf(),
        message: err.to_string(),
    })?;
    engine_info!("Loaded config from {:?}", path);
    Ok(config)
}
