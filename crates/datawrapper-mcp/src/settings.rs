//! Process settings read once from the environment at startup.

use std::time::Duration;

use datawrapper_mcp_charts::client::{
    ClientConfig,
    datawrapper::{DEFAULT_API_URL, DEFAULT_TIMEOUT},
};

pub const ACCESS_TOKEN: &str = "DATAWRAPPER_ACCESS_TOKEN";
/// Older name of [`ACCESS_TOKEN`], read only when the canonical one is unset.
pub const LEGACY_ACCESS_TOKEN: &str = "DATAWRAPPER_API_TOKEN";
pub const API_URL: &str = "DATAWRAPPER_API_URL";
pub const TIMEOUT_SECS: &str = "DATAWRAPPER_MCP_TIMEOUT_SECS";
pub const LOG_LEVEL: &str = "DATAWRAPPER_MCP_LOG_LEVEL";
pub const LOG_FORMAT: &str = "DATAWRAPPER_MCP_LOG_FORMAT";

const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SettingsError {
    #[error("{key} must be a positive number of seconds, got '{value}'")]
    InvalidTimeout { key: &'static str, value: String },
    #[error("{key} must be 'text' or 'json', got '{value}'")]
    InvalidLogFormat { key: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub token: Option<String>,
    pub api_url: String,
    pub timeout: Duration,
    pub log_level: String,
    pub log_format: LogFormat,
    /// Problems worth reporting once logging is up.
    pub warnings: Vec<String>,
}

impl Settings {
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds settings from any key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let mut warnings = Vec::new();

        let token = match (read(ACCESS_TOKEN), read(LEGACY_ACCESS_TOKEN)) {
            (Some(token), _) => Some(token),
            (None, Some(token)) => {
                warnings.push(format!("{LEGACY_ACCESS_TOKEN} is deprecated; set {ACCESS_TOKEN} instead"));
                Some(token)
            }
            (None, None) => None,
        };

        let timeout = match read(TIMEOUT_SECS) {
            None => DEFAULT_TIMEOUT,
            Some(value) => match value.parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(SettingsError::InvalidTimeout {
                        key: TIMEOUT_SECS,
                        value,
                    });
                }
            },
        };

        let log_format = match read(LOG_FORMAT) {
            None => LogFormat::default(),
            Some(value) => match value.to_ascii_lowercase().as_str() {
                "text" => LogFormat::Text,
                "json" => LogFormat::Json,
                _ => {
                    return Err(SettingsError::InvalidLogFormat {
                        key: LOG_FORMAT,
                        value,
                    });
                }
            },
        };

        Ok(Self {
            token,
            api_url: read(API_URL)
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            timeout,
            log_level: read(LOG_LEVEL).unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
            log_format,
            warnings,
        })
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.api_url.clone(),
            token: self.token.clone(),
            timeout: self.timeout,
            ..ClientConfig::default()
        }
    }
}
