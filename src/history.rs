// Rolling per-route price history used as the baseline for deal scoring

use std::collections::{HashMap, VecDeque};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

/// Number of observations kept per route (roughly a year of weekly scans).
pub const HISTORY_WINDOW: usize = 52;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteHistory {
    pub prices: VecDeque<f64>,
    pub average: f64,
}

impl RouteHistory {
    fn push(&mut self, price: f64) -> f64 {
        self.prices.push_back(price);
        while self.prices.len() > HISTORY_WINDOW {
            self.prices.pop_front();
        }

        self.average = self.prices.iter().sum::<f64>() / self.prices.len() as f64;
        self.average
    }
}

/// Route key ("LAX-JFK") to its rolling window.
#[derive(Debug, Default)]
pub struct PriceHistory {
    routes: DashMap<String, RouteHistory>,
}

impl PriceHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `price` to the route's window and return the recomputed average.
    pub fn record(&self, route: &str, price: f64) -> f64 {
        self.routes.entry(route.to_string()).or_default().push(price)
    }

    pub fn get(&self, route: &str) -> Option<RouteHistory> {
        self.routes.get(route).map(|h| h.value().clone())
    }

    pub fn average(&self, route: &str) -> Option<f64> {
        self.routes.get(route).map(|h| h.average)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn snapshot(&self) -> HashMap<String, RouteHistory> {
        self.routes
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }
}

// Persisted histories may come from an older file with a longer window or a
// stale average, so both are normalized on the way in.
impl From<HashMap<String, RouteHistory>> for PriceHistory {
    fn from(map: HashMap<String, RouteHistory>) -> Self {
        let routes = DashMap::new();

        for (route, mut history) in map {
            while history.prices.len() > HISTORY_WINDOW {
                history.prices.pop_front();
            }
            history.average = if history.prices.is_empty() {
                0.0
            } else {
                history.prices.iter().sum::<f64>() / history.prices.len() as f64
            };
            routes.insert(route, history);
        }

        Self { routes }
    }
}
