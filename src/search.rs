// Provider fallback chain: real providers in priority order, then simulation

use std::{sync::Arc, time::Duration};

use parking_lot::Mutex;

use crate::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig};
use crate::models::{FlightOffer, SearchQuery};
use crate::providers::{
    FlightProvider, ProviderOutcome, SimulatedFlights, DEFAULT_REQUEST_TIMEOUT,
};

/// Upper bound on one provider call. Amadeus needs a token request before the
/// search itself, so a call may span two HTTP requests.
pub const DEFAULT_PROVIDER_TIMEOUT: Duration =
    Duration::from_secs(2 * DEFAULT_REQUEST_TIMEOUT.as_secs());

struct ProviderSlot {
    provider: Arc<dyn FlightProvider>,
    breaker: Mutex<CircuitBreaker>,
}

pub struct FlightSearch {
    providers: Vec<ProviderSlot>,
    fallback: Arc<dyn FlightProvider>,
    provider_timeout: Duration,
}

impl FlightSearch {
    /// `providers` are tried in the order given.
    pub fn new(providers: Vec<Arc<dyn FlightProvider>>, fallback: Arc<dyn FlightProvider>) -> Self {
        Self::with_breaker_config(providers, fallback, &CircuitBreakerConfig::default())
    }

    pub fn with_breaker_config(
        providers: Vec<Arc<dyn FlightProvider>>,
        fallback: Arc<dyn FlightProvider>,
        config: &CircuitBreakerConfig,
    ) -> Self {
        Self {
            providers: providers
                .into_iter()
                .map(|provider| ProviderSlot {
                    provider,
                    breaker: Mutex::new(CircuitBreaker::new(config)),
                })
                .collect(),
            fallback,
            provider_timeout: DEFAULT_PROVIDER_TIMEOUT,
        }
    }

    pub fn with_provider_timeout(mut self, timeout: Duration) -> Self {
        self.provider_timeout = timeout;
        self
    }

    /// Only simulated data; used when nothing is configured.
    pub fn simulated_only() -> Self {
        Self::new(Vec::new(), Arc::new(SimulatedFlights::new()))
    }

    pub fn provider_status(&self) -> Vec<(&'static str, bool)> {
        self.providers
            .iter()
            .map(|slot| (slot.provider.name(), slot.provider.is_configured()))
            .collect()
    }

    pub fn has_configured_provider(&self) -> bool {
        self.providers.iter().any(|slot| slot.provider.is_configured())
    }

    /// Providers whose circuit is not closed.
    pub fn tripped_providers(&self) -> Vec<&'static str> {
        self.providers
            .iter()
            .filter(|slot| !slot.breaker.lock().is_closed())
            .map(|slot| slot.provider.name())
            .collect()
    }

    /// Longest the real providers can hold a search before the fallback runs.
    pub fn provider_budget(&self) -> Duration {
        self.provider_timeout * self.providers.len() as u32
    }

    async fn ask(&self, slot: &ProviderSlot, query: &SearchQuery) -> ProviderOutcome {
        match tokio::time::timeout(self.provider_timeout, slot.provider.search(query)).await {
            Ok(outcome) => outcome,
            Err(_) => ProviderOutcome::Failed(format!(
                "no answer within {}ms",
                self.provider_timeout.as_millis()
            )),
        }
    }

    /// First provider with a non-empty answer wins. Never fails: when every
    /// provider is unavailable, failing or empty, the fallback generator answers.
    pub async fn search_flights(&self, query: &SearchQuery) -> Vec<FlightOffer> {
        for slot in &self.providers {
            let name = slot.provider.name();

            if !slot.breaker.lock().should_allow_call() {
                tracing::debug!(provider = name, "circuit open, skipping provider");
                continue;
            }

            match self.ask(slot, query).await {
                ProviderOutcome::Offers(offers) => {
                    // An empty answer still proves the provider is reachable
                    slot.breaker.lock().success();
                    if !offers.is_empty() {
                        tracing::debug!(provider = name, count = offers.len(), "provider answered");
                        return offers;
                    }
                    tracing::debug!(
                        provider = name,
                        from = %query.from,
                        to = %query.to,
                        "provider returned no offers"
                    );
                }
                ProviderOutcome::Unavailable => {
                    tracing::debug!(provider = name, "provider not configured");
                }
                ProviderOutcome::Failed(reason) => {
                    slot.breaker.lock().fail();
                    tracing::warn!(provider = name, %reason, "provider failed, falling back");
                }
            }
        }

        tracing::info!(
            from = %query.from,
            to = %query.to,
            "all providers failed, using simulated data"
        );

        match self.fallback.search(query).await {
            ProviderOutcome::Offers(offers) => offers,
            ProviderOutcome::Unavailable => Vec::new(),
            ProviderOutcome::Failed(reason) => {
                tracing::error!(%reason, "fallback provider failed");
                Vec::new()
            }
        }
    }
}
