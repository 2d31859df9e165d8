// Runtime configuration read from the environment

use std::{env, path::PathBuf, str::FromStr, time::Duration};

use thiserror::Error;

use crate::providers::{amadeus::AmadeusCredentials, DEFAULT_REQUEST_TIMEOUT};
use crate::scanner::{ScannerConfig, DEFAULT_ITERATION_TIMEOUT, DEFAULT_PACING};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub amadeus: Option<AmadeusCredentials>,
    pub skyscanner_api_key: Option<String>,
    pub kiwi_api_key: Option<String>,
    pub request_timeout_ms: u64,
    pub pacing_ms: u64,
    pub iteration_timeout_ms: u64,
    /// Local hour of the daily scan
    pub scan_hour: u32,
    pub log_json: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            amadeus: None,
            skyscanner_api_key: None,
            kiwi_api_key: None,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT.as_millis() as u64,
            pacing_ms: DEFAULT_PACING.as_millis() as u64,
            iteration_timeout_ms: DEFAULT_ITERATION_TIMEOUT.as_millis() as u64,
            scan_hour: 6,
            log_json: false,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let amadeus = match (get("AMADEUS_CLIENT_ID"), get("AMADEUS_CLIENT_SECRET")) {
            (Some(client_id), Some(client_secret)) => Some(AmadeusCredentials {
                client_id,
                client_secret,
            }),
            _ => None,
        };

        let config = Self {
            data_dir: get("DEAL_FINDER_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            amadeus,
            skyscanner_api_key: get("SKYSCANNER_API_KEY"),
            kiwi_api_key: get("KIWI_API_KEY"),
            request_timeout_ms: parse_or(
                "DEAL_FINDER_REQUEST_TIMEOUT_MS",
                get("DEAL_FINDER_REQUEST_TIMEOUT_MS"),
                defaults.request_timeout_ms,
            )?,
            pacing_ms: parse_or(
                "DEAL_FINDER_PACING_MS",
                get("DEAL_FINDER_PACING_MS"),
                defaults.pacing_ms,
            )?,
            iteration_timeout_ms: parse_or(
                "DEAL_FINDER_ITERATION_TIMEOUT_MS",
                get("DEAL_FINDER_ITERATION_TIMEOUT_MS"),
                defaults.iteration_timeout_ms,
            )?,
            scan_hour: parse_or(
                "DEAL_FINDER_SCAN_HOUR",
                get("DEAL_FINDER_SCAN_HOUR"),
                defaults.scan_hour,
            )?,
            log_json: parse_or(
                "DEAL_FINDER_LOG_JSON",
                get("DEAL_FINDER_LOG_JSON"),
                defaults.log_json,
            )?,
        };

        if config.scan_hour > 23 {
            return Err(ConfigError::InvalidValue {
                key: "DEAL_FINDER_SCAN_HOUR",
                value: config.scan_hour.to_string(),
            });
        }

        Ok(config)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Budget for one provider call: token request plus search.
    pub fn provider_timeout(&self) -> Duration {
        self.request_timeout() * 2
    }

    pub fn scanner(&self) -> ScannerConfig {
        ScannerConfig {
            pacing: Duration::from_millis(self.pacing_ms),
            iteration_timeout: Duration::from_millis(self.iteration_timeout_ms),
        }
    }
}

fn parse_or<T: FromStr>(
    key: &'static str,
    value: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { key, value: raw }),
    }
}
