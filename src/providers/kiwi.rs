// Kiwi.com Tequila search (second backup). Times arrive as epoch seconds and
// durations as seconds.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{Local, TimeZone};
use serde::Deserialize;

use super::{http_client, FlightProvider, ProviderError, ProviderOutcome};
use crate::models::{FlightOffer, SearchQuery};

const BASE_URL: &str = "https://api.tequila.kiwi.com/v2";

pub struct KiwiProvider {
    api_key: Option<String>,
    client: reqwest::Client,
    timeout: Duration,
}

impl KiwiProvider {
    pub fn new(api_key: Option<String>, timeout: Duration) -> Self {
        Self {
            api_key,
            client: http_client(timeout),
            timeout,
        }
    }

    async fn fetch(
        &self,
        api_key: &str,
        query: &SearchQuery,
    ) -> Result<Vec<FlightOffer>, ProviderError> {
        let body: SearchResponse = self
            .client
            .get(format!("{}/search", BASE_URL))
            .timeout(self.timeout)
            .header("apikey", api_key)
            .query(&[
                ("fly_from", query.from.as_str()),
                ("fly_to", query.to.as_str()),
                ("date_from", query.depart_date.as_str()),
                ("date_to", query.depart_date.as_str()),
                ("return_from", query.return_date.as_str()),
                ("return_to", query.return_date.as_str()),
                ("flight_type", "round"),
                ("adults", "1"),
                ("curr", "USD"),
                ("max_stopovers", "1"),
                ("limit", "10"),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        body.data
            .into_iter()
            .map(|flight| map_flight(flight, query, &Local))
            .collect()
    }
}

#[async_trait]
impl FlightProvider for KiwiProvider {
    fn name(&self) -> &'static str {
        "kiwi"
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn search(&self, query: &SearchQuery) -> ProviderOutcome {
        let Some(api_key) = self.api_key.as_deref() else {
            return ProviderOutcome::Unavailable;
        };

        ProviderOutcome::from_result(self.name(), self.fetch(api_key, query).await)
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<Flight>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Flight {
    id: String,
    #[serde(default)]
    airlines: Vec<String>,
    #[serde(default)]
    route: Vec<RouteLeg>,
    d_time: i64,
    price: f64,
    duration: FlightDuration,
    #[serde(rename = "deep_link")]
    deep_link: String,
}

#[derive(Debug, Deserialize)]
struct RouteLeg {
    flight_no: u32,
    #[serde(rename = "aTime")]
    a_time: i64,
}

#[derive(Debug, Deserialize)]
struct FlightDuration {
    /// Seconds
    departure: u64,
}

// HH:MM of an epoch timestamp in the given zone
fn epoch_clock_time<Tz: TimeZone>(secs: i64, tz: &Tz) -> Result<String, ProviderError>
where
    Tz::Offset: std::fmt::Display,
{
    tz.timestamp_opt(secs, 0)
        .single()
        .map(|t| t.format("%H:%M").to_string())
        .ok_or_else(|| ProviderError::InvalidValue {
            field: "timestamp",
            value: secs.to_string(),
        })
}

fn map_flight<Tz: TimeZone>(
    flight: Flight,
    query: &SearchQuery,
    tz: &Tz,
) -> Result<FlightOffer, ProviderError>
where
    Tz::Offset: std::fmt::Display,
{
    let airline = flight
        .airlines
        .first()
        .cloned()
        .ok_or(ProviderError::MissingField("airlines"))?;
    let first_leg = flight
        .route
        .first()
        .ok_or(ProviderError::MissingField("route"))?;
    let last_leg = flight
        .route
        .last()
        .ok_or(ProviderError::MissingField("route"))?;

    Ok(FlightOffer {
        id: flight.id,
        flight: format!("{}{}", airline, first_leg.flight_no),
        airline,
        from: query.from.clone(),
        to: query.to.clone(),
        depart_date: query.depart_date.clone(),
        depart_time: epoch_clock_time(flight.d_time, tz)?,
        return_date: query.return_date.clone(),
        return_time: epoch_clock_time(last_leg.a_time, tz)?,
        price: flight.price,
        duration: u32::try_from(flight.duration.departure / 60).map_err(|_| {
            ProviderError::InvalidValue {
                field: "duration.departure",
                value: flight.duration.departure.to_string(),
            }
        })?,
        url: flight.deep_link,
        deal_score: None,
    })
}
