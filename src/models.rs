// Shared data types: settings, normalized flight offers and search queries

use serde::{Deserialize, Serialize};

// Process-wide scan configuration. Every field has a default so a partial
// settings file merges over the defaults instead of failing to load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub base_airport: String,
    pub max_price: f64,
    /// Upper bound on the outbound leg, in hours
    pub max_flight_time: f64,
    pub destinations: Vec<String>,
    pub look_ahead_weeks: u32,
    pub deal_threshold: f64,
    pub email: String,
    pub email_enabled: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_airport: "LAX".to_string(),
            max_price: 300.0,
            max_flight_time: 5.0,
            destinations: ["JFK", "MIA", "ORD", "BOS", "SEA", "SFO", "LAS"]
                .iter()
                .map(|d| d.to_string())
                .collect(),
            look_ahead_weeks: 12,
            deal_threshold: 0.7,
            email: String::new(),
            email_enabled: false,
        }
    }
}

impl Settings {
    pub fn max_flight_minutes(&self) -> f64 {
        self.max_flight_time * 60.0
    }

    // Shallow merge: only the fields present in the update are replaced
    pub fn apply(&mut self, update: SettingsUpdate) {
        if let Some(v) = update.base_airport {
            self.base_airport = v;
        }
        if let Some(v) = update.max_price {
            self.max_price = v;
        }
        if let Some(v) = update.max_flight_time {
            self.max_flight_time = v;
        }
        if let Some(v) = update.destinations {
            self.destinations = v;
        }
        if let Some(v) = update.look_ahead_weeks {
            self.look_ahead_weeks = v;
        }
        if let Some(v) = update.deal_threshold {
            self.deal_threshold = v;
        }
        if let Some(v) = update.email {
            self.email = v;
        }
        if let Some(v) = update.email_enabled {
            self.email_enabled = v;
        }
    }
}

/// Partial settings as accepted by the update surface.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SettingsUpdate {
    pub base_airport: Option<String>,
    pub max_price: Option<f64>,
    pub max_flight_time: Option<f64>,
    pub destinations: Option<Vec<String>>,
    pub look_ahead_weeks: Option<u32>,
    pub deal_threshold: Option<f64>,
    pub email: Option<String>,
    pub email_enabled: Option<bool>,
}

/// A single round-trip quote, normalized from whichever provider produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightOffer {
    pub id: String,
    pub airline: String,
    pub flight: String,
    pub from: String,
    pub to: String,
    pub depart_date: String,
    pub depart_time: String,
    pub return_date: String,
    pub return_time: String,
    /// USD
    pub price: f64,
    /// Outbound leg only, in minutes
    pub duration: u32,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deal_score: Option<f64>,
}

impl FlightOffer {
    pub fn route(&self) -> String {
        route_key(&self.from, &self.to)
    }
}

/// History key for an origin/destination pair.
pub fn route_key(from: &str, to: &str) -> String {
    format!("{}-{}", from, to)
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    pub from: String,
    pub to: String,
    pub depart_date: String,
    pub return_date: String,
}

impl SearchQuery {
    pub fn new(from: &str, to: &str, depart_date: &str, return_date: &str) -> Self {
        Self {
            from: from.to_string(),
            to: to.to_string(),
            depart_date: depart_date.to_string(),
            return_date: return_date.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_settings_file_keeps_defaults() {
        let settings: Settings =
            serde_json::from_str(r#"{"baseAirport":"SFO","maxPrice":250}"#).unwrap();

        assert_eq!(settings.base_airport, "SFO");
        assert_eq!(settings.max_price, 250.0);
        assert_eq!(settings.look_ahead_weeks, 12);
        assert_eq!(settings.destinations.len(), 7);
    }

    #[test]
    fn test_apply_is_shallow_merge() {
        let mut settings = Settings::default();
        settings.apply(SettingsUpdate {
            destinations: Some(vec!["DEN".to_string()]),
            email_enabled: Some(true),
            ..Default::default()
        });

        assert_eq!(settings.destinations, vec!["DEN".to_string()]);
        assert!(settings.email_enabled);
        assert_eq!(settings.base_airport, "LAX");
        assert_eq!(settings.max_flight_minutes(), 300.0);
    }

    #[test]
    fn test_offer_omits_missing_deal_score() {
        let offer = FlightOffer {
            id: "1".to_string(),
            airline: "Delta".to_string(),
            flight: "DL100".to_string(),
            from: "LAX".to_string(),
            to: "JFK".to_string(),
            depart_date: "2025-06-06".to_string(),
            depart_time: "08:00".to_string(),
            return_date: "2025-06-08".to_string(),
            return_time: "18:00".to_string(),
            price: 199.0,
            duration: 300,
            url: "https://www.delta.com".to_string(),
            deal_score: None,
        };

        let json = serde_json::to_string(&offer).unwrap();
        assert!(json.contains("\"departDate\":\"2025-06-06\""));
        assert!(!json.contains("dealScore"));
        assert_eq!(offer.route(), "LAX-JFK");
    }
}
