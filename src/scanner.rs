// Deal scanner: walks every destination x weekend, feeds prices into the
// route history and keeps the offers priced well under the rolling average.

use std::{cmp::Ordering, sync::Arc, time::Duration};

use thiserror::Error;

use crate::history::PriceHistory;
use crate::models::{FlightOffer, SearchQuery, Settings};
use crate::search::FlightSearch;
use crate::weekends::{weekend_windows, WeekendWindow};

/// An offer is a deal when it is below this fraction of the route average.
pub const DEAL_RATIO: f64 = 0.9;

pub const DEFAULT_PACING: Duration = Duration::from_secs(1);
pub const DEFAULT_ITERATION_TIMEOUT: Duration = Duration::from_secs(120);

/// Time left for the simulated fallback once every provider has timed out.
pub const FALLBACK_ALLOWANCE: Duration = Duration::from_secs(5);

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("A scan is already in progress")]
    Busy,

    #[error("Search {route} {depart} timed out after {timeout_ms}ms")]
    Timeout {
        route: String,
        depart: String,
        timeout_ms: u64,
    },

    #[error("Invalid offer {id}: price {price}")]
    InvalidOffer { id: String, price: f64 },
}

#[derive(Debug, Clone)]
pub struct ScannerConfig {
    /// Delay between successive searches
    pub pacing: Duration,
    pub iteration_timeout: Duration,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            pacing: DEFAULT_PACING,
            iteration_timeout: DEFAULT_ITERATION_TIMEOUT,
        }
    }
}

/// Savings fraction for a price against the route average, or `None` when
/// the price is not at least 10% under it.
pub fn deal_score(price: f64, average: f64) -> Option<f64> {
    if average > 0.0 && price < average * DEAL_RATIO {
        Some((average - price) / average)
    } else {
        None
    }
}

/// Best deals first.
pub fn rank_deals(deals: &mut [FlightOffer]) {
    deals.sort_by(|a, b| {
        b.deal_score
            .unwrap_or(0.0)
            .partial_cmp(&a.deal_score.unwrap_or(0.0))
            .unwrap_or(Ordering::Equal)
    });
}

fn within_limits(offer: &FlightOffer, settings: &Settings) -> bool {
    offer.price <= settings.max_price && offer.duration as f64 <= settings.max_flight_minutes()
}

/// Filter `offers` by the settings' limits, record the survivors into the
/// history and return those classified as deals, with their score set.
///
/// The average used for classification includes the offer's own price.
pub fn evaluate_offers(
    offers: Vec<FlightOffer>,
    settings: &Settings,
    history: &PriceHistory,
) -> Result<Vec<FlightOffer>, ScanError> {
    // Validate the batch up front so a bad offer cannot leave a half-recorded route
    if let Some(bad) = offers
        .iter()
        .find(|o| !o.price.is_finite() || o.price < 0.0)
    {
        return Err(ScanError::InvalidOffer {
            id: bad.id.clone(),
            price: bad.price,
        });
    }

    let mut deals = Vec::new();

    for mut offer in offers {
        if !within_limits(&offer, settings) {
            continue;
        }

        let average = history.record(&offer.route(), offer.price);

        if let Some(score) = deal_score(offer.price, average) {
            offer.deal_score = Some(score);
            deals.push(offer);
        }
    }

    Ok(deals)
}

pub struct DealScanner {
    search: Arc<FlightSearch>,
    config: ScannerConfig,
}

impl DealScanner {
    /// An iteration timeout shorter than the provider chain plus the fallback
    /// allowance is raised to that floor.
    pub fn new(search: Arc<FlightSearch>, mut config: ScannerConfig) -> Self {
        let floor = search.provider_budget() + FALLBACK_ALLOWANCE;
        if config.iteration_timeout < floor {
            tracing::warn!(
                configured_ms = config.iteration_timeout.as_millis() as u64,
                raised_ms = floor.as_millis() as u64,
                "iteration timeout would cut off the fallback, raising it"
            );
            config.iteration_timeout = floor;
        }
        Self { search, config }
    }

    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    pub fn search(&self) -> &Arc<FlightSearch> {
        &self.search
    }

    /// Scan the look-ahead horizon from today.
    pub async fn scan(&self, settings: &Settings, history: &PriceHistory) -> Vec<FlightOffer> {
        let weekends = weekend_windows(settings.look_ahead_weeks);
        self.scan_weekends(settings, &weekends, history).await
    }

    // Sequential on purpose: the pacing delay is what bounds the request rate
    pub async fn scan_weekends(
        &self,
        settings: &Settings,
        weekends: &[WeekendWindow],
        history: &PriceHistory,
    ) -> Vec<FlightOffer> {
        tracing::info!(
            base = %settings.base_airport,
            destinations = settings.destinations.len(),
            weekends = weekends.len(),
            "scanning for deals"
        );

        let mut deals = Vec::new();
        let mut first = true;

        for destination in &settings.destinations {
            for weekend in weekends {
                if !first && !self.config.pacing.is_zero() {
                    tokio::time::sleep(self.config.pacing).await;
                }
                first = false;

                match self.scan_one(settings, destination, weekend, history).await {
                    Ok(found) => deals.extend(found),
                    Err(e) => {
                        tracing::warn!(
                            destination = %destination,
                            depart = %weekend.depart,
                            error = %e,
                            "skipping weekend"
                        );
                    }
                }
            }
        }

        tracing::info!(deals = deals.len(), "scan finished");
        deals
    }

    async fn scan_one(
        &self,
        settings: &Settings,
        destination: &str,
        weekend: &WeekendWindow,
        history: &PriceHistory,
    ) -> Result<Vec<FlightOffer>, ScanError> {
        let query = SearchQuery {
            from: settings.base_airport.clone(),
            to: destination.to_string(),
            depart_date: weekend.depart_str(),
            return_date: weekend.return_str(),
        };

        let offers = tokio::time::timeout(
            self.config.iteration_timeout,
            self.search.search_flights(&query),
        )
        .await
        .map_err(|_| ScanError::Timeout {
            route: format!("{}-{}", query.from, query.to),
            depart: query.depart_date.clone(),
            timeout_ms: self.config.iteration_timeout.as_millis() as u64,
        })?;

        evaluate_offers(offers, settings, history)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{FlightProvider, ProviderOutcome, SimulatedFlights};
    use crate::search::stubs::{offer, StubProvider};
    use chrono::NaiveDate;

    fn settings() -> Settings {
        Settings {
            max_price: 300.0,
            max_flight_time: 5.0,
            ..Default::default()
        }
    }

    // Seeds LAX-JFK with `n` observations of `price`
    fn history_with(price: f64, n: usize) -> PriceHistory {
        let history = PriceHistory::new();
        for _ in 0..n {
            history.record("LAX-JFK", price);
        }
        history
    }

    fn fast() -> ScannerConfig {
        ScannerConfig {
            pacing: Duration::ZERO,
            iteration_timeout: Duration::from_secs(5),
        }
    }

    fn single(provider: Arc<StubProvider>) -> FlightSearch {
        FlightSearch::new(
            vec![provider as Arc<dyn FlightProvider>],
            Arc::new(SimulatedFlights::seeded(3)),
        )
    }

    fn weekends(n: u32) -> Vec<WeekendWindow> {
        crate::weekends::weekend_windows_from(NaiveDate::from_ymd_opt(2025, 6, 4).unwrap(), n)
    }

    #[test]
    fn test_deal_boundary_is_strict() {
        assert_eq!(deal_score(180.0, 200.0), None);
        assert_eq!(deal_score(179.0, 200.0), Some(0.105));
        assert_eq!(deal_score(100.0, 0.0), None);
    }

    #[test]
    fn test_cheap_offer_scored_against_post_append_average() {
        // average 200 over 4 points; adding 150 gives (800 + 150) / 5 = 190
        let history = history_with(200.0, 4);
        let deals =
            evaluate_offers(vec![offer("LAX", "JFK", 150.0, 240)], &settings(), &history).unwrap();

        assert_eq!(deals.len(), 1);
        let expected = (190.0 - 150.0) / 190.0;
        assert!((deals[0].deal_score.unwrap() - expected).abs() < 1e-12);
        assert_eq!(history.average("LAX-JFK"), Some(190.0));
    }

    #[test]
    fn test_score_with_long_history_approaches_pre_append_value() {
        // 51 points of 200 then 150: the window stays at 52 and the average
        // barely moves, so the score is close to (200 - 150) / 200 = 0.25
        let history = history_with(200.0, 51);
        let deals =
            evaluate_offers(vec![offer("LAX", "JFK", 150.0, 240)], &settings(), &history).unwrap();

        let average = (200.0 * 51.0 + 150.0) / 52.0;
        let score = deals[0].deal_score.unwrap();
        assert!((score - (average - 150.0) / average).abs() < 1e-12);
        assert!(score > 0.0 && score < 0.25);
    }

    #[test]
    fn test_expensive_offer_recorded_but_not_a_deal() {
        let history = history_with(200.0, 1);
        let deals =
            evaluate_offers(vec![offer("LAX", "JFK", 290.0, 240)], &settings(), &history).unwrap();

        assert!(deals.is_empty());
        assert_eq!(history.get("LAX-JFK").unwrap().prices.len(), 2);
        assert_eq!(history.average("LAX-JFK"), Some(245.0));
    }

    #[test]
    fn test_rejected_offers_leave_history_untouched() {
        let history = history_with(200.0, 1);
        let too_long = offer("LAX", "JFK", 150.0, 320);
        let too_expensive = offer("LAX", "JFK", 301.0, 200);

        let deals = evaluate_offers(vec![too_long, too_expensive], &settings(), &history).unwrap();

        assert!(deals.is_empty());
        assert_eq!(history.get("LAX-JFK").unwrap().prices.len(), 1);
    }

    #[test]
    fn test_limits_are_inclusive() {
        let history = PriceHistory::new();
        evaluate_offers(vec![offer("LAX", "JFK", 300.0, 300)], &settings(), &history).unwrap();
        assert_eq!(history.average("LAX-JFK"), Some(300.0));
    }

    #[test]
    fn test_invalid_price_rejects_whole_batch() {
        let history = PriceHistory::new();
        let result = evaluate_offers(
            vec![offer("LAX", "JFK", 120.0, 200), offer("LAX", "JFK", f64::NAN, 200)],
            &settings(),
            &history,
        );

        assert!(matches!(result, Err(ScanError::InvalidOffer { .. })));
        assert!(history.is_empty());
    }

    #[test]
    fn test_rank_deals_descending() {
        let mut deals = vec![
            FlightOffer { deal_score: Some(0.12), ..offer("LAX", "JFK", 1.0, 1) },
            FlightOffer { deal_score: Some(0.40), ..offer("LAX", "MIA", 1.0, 1) },
            FlightOffer { deal_score: Some(0.25), ..offer("LAX", "SEA", 1.0, 1) },
        ];
        rank_deals(&mut deals);

        let scores: Vec<f64> = deals.iter().map(|d| d.deal_score.unwrap()).collect();
        assert_eq!(scores, vec![0.40, 0.25, 0.12]);
    }

    #[tokio::test]
    async fn test_scan_covers_every_destination_and_weekend() {
        let provider = StubProvider::new(
            "fixed",
            ProviderOutcome::Offers(vec![offer("LAX", "JFK", 250.0, 200)]),
        );
        let scanner = DealScanner::new(Arc::new(single(provider.clone())), fast());

        let settings = Settings {
            destinations: vec!["JFK".to_string(), "MIA".to_string()],
            ..settings()
        };
        let history = PriceHistory::new();

        scanner.scan_weekends(&settings, &weekends(3), &history).await;

        assert_eq!(provider.calls(), 6);
    }

    #[tokio::test]
    async fn test_scan_finds_deals_against_established_history() {
        let provider = StubProvider::new(
            "fixed",
            ProviderOutcome::Offers(vec![offer("LAX", "JFK", 100.0, 200)]),
        );
        let scanner = DealScanner::new(Arc::new(single(provider.clone())), fast());

        let settings = Settings {
            destinations: vec!["JFK".to_string()],
            ..settings()
        };
        let history = history_with(250.0, 10);

        let deals = scanner.scan_weekends(&settings, &weekends(2), &history).await;

        assert_eq!(deals.len(), 2);
        assert!(deals.iter().all(|d| d.deal_score.unwrap() > 0.0));
        assert_eq!(history.get("LAX-JFK").unwrap().prices.len(), 12);
    }

    #[tokio::test]
    async fn test_simulated_scan_keeps_history_invariants() {
        let search = FlightSearch::new(Vec::new(), Arc::new(SimulatedFlights::seeded(11)));
        let scanner = DealScanner::new(Arc::new(search), fast());
        let history = PriceHistory::new();

        let settings = Settings {
            destinations: vec!["JFK".to_string(), "SEA".to_string()],
            ..settings()
        };
        let deals = scanner.scan_weekends(&settings, &weekends(12), &history).await;

        for deal in &deals {
            let score = deal.deal_score.unwrap();
            assert!(score > 0.0 && score < 1.0);
            assert!(deal.price <= 300.0 && deal.duration <= 300);
        }
        for (_, route) in history.snapshot() {
            assert!(route.prices.len() <= crate::history::HISTORY_WINDOW);
        }
    }

    fn jfk_only() -> Settings {
        Settings {
            destinations: vec!["JFK".to_string()],
            ..settings()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_pacing_between_iterations() {
        let provider = StubProvider::new(
            "fixed",
            ProviderOutcome::Offers(vec![offer("LAX", "JFK", 250.0, 200)]),
        );
        let scanner = DealScanner::new(
            Arc::new(single(provider.clone())),
            ScannerConfig {
                pacing: Duration::from_secs(1),
                ..fast()
            },
        );

        let started = tokio::time::Instant::now();
        scanner.scan_weekends(&jfk_only(), &weekends(4), &PriceHistory::new()).await;

        let offsets: Vec<u64> = provider
            .seen()
            .iter()
            .map(|at| at.duration_since(started).as_secs())
            .collect();
        assert_eq!(offsets, vec![0, 1, 2, 3]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_providers_still_reach_fallback() {
        let hung = |name| {
            let failed = ProviderOutcome::Failed("timeout".to_string());
            StubProvider::slow(name, Duration::from_secs(3600), failed) as Arc<dyn FlightProvider>
        };
        let providers = vec![hung("amadeus"), hung("skyscanner"), hung("kiwi")];
        let fallback = StubProvider::new(
            "sim",
            ProviderOutcome::Offers(vec![offer("LAX", "JFK", 250.0, 200)]),
        );
        let search = FlightSearch::new(providers, fallback.clone())
            .with_provider_timeout(Duration::from_secs(15));

        // shorter than the three provider timeouts together
        let scanner = DealScanner::new(
            Arc::new(search),
            ScannerConfig {
                pacing: Duration::ZERO,
                iteration_timeout: Duration::from_secs(30),
            },
        );
        assert_eq!(scanner.config().iteration_timeout, Duration::from_secs(50));

        let history = PriceHistory::new();
        scanner.scan_weekends(&jfk_only(), &weekends(3), &history).await;

        assert_eq!(fallback.calls(), 3);
        assert_eq!(history.get("LAX-JFK").unwrap().prices.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_search_skips_iteration_only() {
        let fallback = StubProvider::slow(
            "sim",
            Duration::from_secs(3600),
            ProviderOutcome::Offers(vec![offer("LAX", "JFK", 250.0, 200)]),
        );
        let search = FlightSearch::new(Vec::new(), fallback.clone());
        let scanner = DealScanner::new(Arc::new(search), fast());
        let history = PriceHistory::new();

        let deals = scanner.scan_weekends(&settings(), &weekends(2), &history).await;

        assert!(deals.is_empty());
        assert!(history.is_empty());
        assert_eq!(fallback.calls(), 2 * settings().destinations.len());
    }
}
