// Synthetic offers used when no real provider answers, so a scan always has
// data to evaluate.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use rand::{rngs::StdRng, Rng, SeedableRng};

use super::{FlightProvider, ProviderOutcome};
use crate::models::{FlightOffer, SearchQuery};

const AIRLINES: [(&str, &str); 7] = [
    ("United", "https://www.united.com"),
    ("American", "https://www.aa.com"),
    ("Delta", "https://www.delta.com"),
    ("Southwest", "https://www.southwest.com"),
    ("JetBlue", "https://www.jetblue.com"),
    ("Alaska", "https://www.alaskaair.com"),
    ("Spirit", "https://www.spirit.com"),
];

const GENERIC_SEARCH_URL: &str = "https://www.google.com/travel/flights";

pub struct SimulatedFlights {
    rng: Mutex<StdRng>,
}

impl Default for SimulatedFlights {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedFlights {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Reproducible offers for tests.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    pub fn generate(&self, query: &SearchQuery) -> Vec<FlightOffer> {
        let mut rng = self.rng.lock();
        let count = rng.gen_range(3..=7);
        let stamp = Utc::now().timestamp_millis();

        (0..count)
            .map(|i| {
                let (airline, _) = AIRLINES[rng.gen_range(0..AIRLINES.len())];
                let price = rng.gen_range(100..400) as f64;
                let duration = rng.gen_range(120..360);

                FlightOffer {
                    id: format!("{}{}{}{}", query.from, query.to, stamp, i),
                    airline: airline.to_string(),
                    flight: format!(
                        "{}{}",
                        airline[..2].to_uppercase(),
                        rng.gen_range(100..1000)
                    ),
                    from: query.from.clone(),
                    to: query.to.clone(),
                    depart_date: query.depart_date.clone(),
                    depart_time: random_clock_time(&mut *rng),
                    return_date: query.return_date.clone(),
                    return_time: random_clock_time(&mut *rng),
                    price,
                    duration,
                    url: booking_url(airline, &query.from, &query.to),
                    deal_score: None,
                }
            })
            .collect()
    }
}

fn random_clock_time<R: Rng>(rng: &mut R) -> String {
    format!("{:02}:{:02}", rng.gen_range(0..24), rng.gen_range(0..60))
}

pub fn booking_url(airline: &str, from: &str, to: &str) -> String {
    let base = AIRLINES
        .iter()
        .find(|(name, _)| *name == airline)
        .map(|(_, url)| *url)
        .unwrap_or(GENERIC_SEARCH_URL);

    format!("{}/flights?q={}%20to%20{}", base, from, to)
}

#[async_trait]
impl FlightProvider for SimulatedFlights {
    fn name(&self) -> &'static str {
        "simulated"
    }

    fn is_configured(&self) -> bool {
        true
    }

    async fn search(&self, query: &SearchQuery) -> ProviderOutcome {
        ProviderOutcome::Offers(self.generate(query))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query() -> SearchQuery {
        SearchQuery::new("LAX", "BOS", "2025-06-13", "2025-06-15")
    }

    #[test]
    fn test_offers_are_in_range() {
        let sim = SimulatedFlights::new();

        for _ in 0..200 {
            let offers = sim.generate(&query());
            assert!((3..=7).contains(&offers.len()));

            for offer in offers {
                assert!(offer.price >= 100.0 && offer.price < 400.0);
                assert!(offer.duration >= 120 && offer.duration < 360);
                assert!(AIRLINES.iter().any(|(name, _)| *name == offer.airline));
                assert!(offer.url.ends_with("/flights?q=LAX%20to%20BOS"));
                assert_eq!(offer.depart_time.len(), 5);
                assert_eq!(offer.route(), "LAX-BOS");
                assert!(offer.deal_score.is_none());
            }
        }
    }

    #[test]
    fn test_seeded_generator_is_reproducible() {
        let a = SimulatedFlights::seeded(42).generate(&query());
        let b = SimulatedFlights::seeded(42).generate(&query());

        let prices = |offers: &[FlightOffer]| offers.iter().map(|o| o.price).collect::<Vec<_>>();
        assert_eq!(prices(&a), prices(&b));
        assert_eq!(
            a.iter().map(|o| &o.flight).collect::<Vec<_>>(),
            b.iter().map(|o| &o.flight).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_booking_url_falls_back_to_generic_search() {
        assert_eq!(
            booking_url("Delta", "LAX", "JFK"),
            "https://www.delta.com/flights?q=LAX%20to%20JFK"
        );
        assert_eq!(
            booking_url("Frontier", "LAX", "JFK"),
            "https://www.google.com/travel/flights/flights?q=LAX%20to%20JFK"
        );
    }

    #[tokio::test]
    async fn test_search_always_has_offers() {
        let sim = SimulatedFlights::seeded(7);
        match sim.search(&query()).await {
            ProviderOutcome::Offers(offers) => assert!(!offers.is_empty()),
            other => panic!("unexpected outcome {:?}", other),
        }
    }
}
