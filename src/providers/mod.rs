// Flight data providers. Each adapter hides its provider's response shape and
// hands back normalized `FlightOffer`s.

pub mod amadeus;
pub mod kiwi;
pub mod simulated;
pub mod skyscanner;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{FlightOffer, SearchQuery};

pub use amadeus::AmadeusProvider;
pub use kiwi::KiwiProvider;
pub use simulated::SimulatedFlights;
pub use skyscanner::SkyscannerProvider;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: &'static str, value: String },
}

/// Result of asking one provider for offers.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderOutcome {
    Offers(Vec<FlightOffer>),
    /// Not configured; nothing was attempted
    Unavailable,
    Failed(String),
}

impl ProviderOutcome {
    pub fn from_result(provider: &str, result: Result<Vec<FlightOffer>, ProviderError>) -> Self {
        match result {
            Ok(offers) => ProviderOutcome::Offers(offers),
            Err(e) => {
                tracing::warn!(provider, error = %e, "provider search failed");
                ProviderOutcome::Failed(e.to_string())
            }
        }
    }
}

#[async_trait]
pub trait FlightProvider: Send + Sync {
    fn name(&self) -> &'static str;

    // Configured providers may still fail at request time
    fn is_configured(&self) -> bool;

    async fn search(&self, query: &SearchQuery) -> ProviderOutcome;
}

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

pub(crate) fn http_client(timeout: Duration) -> reqwest::Client {
    // Builder only fails when the TLS backend cannot initialise; the default
    // client carries no timeout, so adapters keep a per-request one as well.
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|e| {
            tracing::error!(error = %e, "falling back to default http client");
            reqwest::Client::new()
        })
}

// "2025-06-13T07:45:00" -> "07:45"
pub(crate) fn clock_time(timestamp: &str) -> Result<String, ProviderError> {
    timestamp
        .split_once('T')
        .and_then(|(_, time)| time.get(..5))
        .map(str::to_string)
        .ok_or_else(|| ProviderError::InvalidValue {
            field: "timestamp",
            value: timestamp.to_string(),
        })
}
