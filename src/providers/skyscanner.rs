// Skyscanner browse-quotes (first backup). Quotes carry price and carrier only,
// so times and duration are filled with fixed estimates.

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use serde::Deserialize;

use super::{http_client, FlightProvider, ProviderError, ProviderOutcome};
use crate::models::{FlightOffer, SearchQuery};

const HOST: &str = "skyscanner-skyscanner-flight-search-v1.p.rapidapi.com";
const BASE_URL: &str =
    "https://skyscanner-skyscanner-flight-search-v1.p.rapidapi.com/apiservices";

const ESTIMATED_DEPART_TIME: &str = "08:00";
const ESTIMATED_RETURN_TIME: &str = "18:00";
const ESTIMATED_DURATION_MINUTES: u32 = 300;

pub struct SkyscannerProvider {
    api_key: Option<String>,
    client: reqwest::Client,
    timeout: Duration,
}

impl SkyscannerProvider {
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
        let url = format!(
            "{}/browsequotes/v1.0/US/USD/en-US/{}/{}/{}",
            BASE_URL, query.from, query.to, query.depart_date
        );

        let body: QuotesResponse = self
            .client
            .get(url)
            .timeout(self.timeout)
            .header("X-RapidAPI-Key", api_key)
            .header("X-RapidAPI-Host", HOST)
            .query(&[("inboundpartialdate", query.return_date.as_str())])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let mut rng = rand::thread_rng();
        body.quotes
            .into_iter()
            .map(|quote| map_quote(quote, query, rng.gen_range(100..1100)))
            .collect()
    }
}

#[async_trait]
impl FlightProvider for SkyscannerProvider {
    fn name(&self) -> &'static str {
        "skyscanner"
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
#[serde(rename_all = "PascalCase")]
struct QuotesResponse {
    #[serde(default)]
    quotes: Vec<Quote>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Quote {
    quote_id: u64,
    min_price: f64,
    outbound_leg: Leg,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Leg {
    #[serde(default)]
    carrier_ids: Vec<u64>,
}

// The flight number is not part of a browse quote
fn map_quote(
    quote: Quote,
    query: &SearchQuery,
    flight_number: u32,
) -> Result<FlightOffer, ProviderError> {
    let carrier = quote
        .outbound_leg
        .carrier_ids
        .first()
        .ok_or(ProviderError::MissingField("OutboundLeg.CarrierIds"))?
        .to_string();

    Ok(FlightOffer {
        id: quote.quote_id.to_string(),
        flight: format!("{}{}", carrier, flight_number),
        airline: carrier,
        from: query.from.clone(),
        to: query.to.clone(),
        depart_date: query.depart_date.clone(),
        depart_time: ESTIMATED_DEPART_TIME.to_string(),
        return_date: query.return_date.clone(),
        return_time: ESTIMATED_RETURN_TIME.to_string(),
        price: quote.min_price,
        duration: ESTIMATED_DURATION_MINUTES,
        url: format!(
            "https://www.skyscanner.com/transport/flights/{}/{}/{}/{}",
            query.from, query.to, query.depart_date, query.return_date
        ),
        deal_score: None,
    })
}
