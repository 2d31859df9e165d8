// Amadeus flight-offers search (primary provider, OAuth2 client credentials)

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use tokio::{sync::Mutex, time::Instant};

use super::{clock_time, http_client, FlightProvider, ProviderError, ProviderOutcome};
use crate::duration::parse_iso_duration;
use crate::models::{FlightOffer, SearchQuery};

const TOKEN_URL: &str = "https://api.amadeus.com/v1/security/oauth2/token";
const BASE_URL: &str = "https://api.amadeus.com/v2";

/// Tokens are refreshed this long before the provider says they expire.
pub const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct AmadeusCredentials {
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Debug, Clone)]
struct AccessToken {
    value: String,
    refresh_at: Instant,
}

impl AccessToken {
    fn issued(value: String, expires_in_secs: u64, now: Instant) -> Self {
        let lifetime = Duration::from_secs(expires_in_secs).saturating_sub(TOKEN_REFRESH_MARGIN);
        Self {
            value,
            refresh_at: now + lifetime,
        }
    }

    fn is_fresh(&self, now: Instant) -> bool {
        now < self.refresh_at
    }
}

pub struct AmadeusProvider {
    credentials: Option<AmadeusCredentials>,
    token_url: String,
    base_url: String,
    client: reqwest::Client,
    timeout: Duration,
    token: Mutex<Option<AccessToken>>,
}

impl AmadeusProvider {
    pub fn new(credentials: Option<AmadeusCredentials>, timeout: Duration) -> Self {
        Self {
            credentials,
            token_url: TOKEN_URL.to_string(),
            base_url: BASE_URL.to_string(),
            client: http_client(timeout),
            timeout,
            token: Mutex::new(None),
        }
    }

    async fn access_token(
        &self,
        credentials: &AmadeusCredentials,
    ) -> Result<String, ProviderError> {
        // Held across the refresh so a burst of searches triggers one token request
        let mut cached = self.token.lock().await;

        if let Some(token) = cached.as_ref() {
            if token.is_fresh(Instant::now()) {
                return Ok(token.value.clone());
            }
        }

        let response = self
            .client
            .post(&self.token_url)
            .timeout(self.timeout)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", credentials.client_id.as_str()),
                ("client_secret", credentials.client_secret.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ProviderError::Auth(format!(
                "token endpoint returned {}",
                response.status()
            )));
        }

        let body: TokenResponse = response.json().await?;
        let token = AccessToken::issued(body.access_token, body.expires_in, Instant::now());
        let value = token.value.clone();
        *cached = Some(token);

        tracing::debug!(expires_in = body.expires_in, "refreshed amadeus token");
        Ok(value)
    }

    async fn fetch(
        &self,
        credentials: &AmadeusCredentials,
        query: &SearchQuery,
    ) -> Result<Vec<FlightOffer>, ProviderError> {
        let token = self.access_token(credentials).await?;

        let response = self
            .client
            .get(format!("{}/shopping/flight-offers", self.base_url))
            .timeout(self.timeout)
            .bearer_auth(token)
            .query(&[
                ("originLocationCode", query.from.as_str()),
                ("destinationLocationCode", query.to.as_str()),
                ("departureDate", query.depart_date.as_str()),
                ("returnDate", query.return_date.as_str()),
                ("adults", "1"),
                ("currencyCode", "USD"),
                ("max", "10"),
            ])
            .send()
            .await?;

        // A revoked or expired token must not be reused on the next search
        if response.status() == StatusCode::UNAUTHORIZED {
            self.token.lock().await.take();
            return Err(ProviderError::Auth("access token rejected".to_string()));
        }

        let body: OffersResponse = response.error_for_status()?.json().await?;
        map_offers(body, query)
    }
}

#[async_trait]
impl FlightProvider for AmadeusProvider {
    fn name(&self) -> &'static str {
        "amadeus"
    }

    fn is_configured(&self) -> bool {
        self.credentials.is_some()
    }

    async fn search(&self, query: &SearchQuery) -> ProviderOutcome {
        let Some(credentials) = self.credentials.as_ref() else {
            return ProviderOutcome::Unavailable;
        };

        ProviderOutcome::from_result(self.name(), self.fetch(credentials, query).await)
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Debug, Deserialize)]
struct OffersResponse {
    #[serde(default)]
    data: Vec<Offer>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Offer {
    id: String,
    #[serde(default)]
    validating_airline_codes: Vec<String>,
    itineraries: Vec<Itinerary>,
    price: OfferPrice,
}

#[derive(Debug, Deserialize)]
struct Itinerary {
    duration: String,
    segments: Vec<Segment>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Segment {
    carrier_code: String,
    number: String,
    departure: Endpoint,
    arrival: Endpoint,
}

#[derive(Debug, Deserialize)]
struct Endpoint {
    at: String,
}

#[derive(Debug, Deserialize)]
struct OfferPrice {
    total: String,
}

fn map_offers(
    body: OffersResponse,
    query: &SearchQuery,
) -> Result<Vec<FlightOffer>, ProviderError> {
    body.data.into_iter().map(|offer| map_offer(offer, query)).collect()
}

fn map_offer(offer: Offer, query: &SearchQuery) -> Result<FlightOffer, ProviderError> {
    let outbound = offer
        .itineraries
        .first()
        .ok_or(ProviderError::MissingField("itineraries[0]"))?;
    let inbound = offer
        .itineraries
        .get(1)
        .ok_or(ProviderError::MissingField("itineraries[1]"))?;
    let first_out = outbound
        .segments
        .first()
        .ok_or(ProviderError::MissingField("itineraries[0].segments"))?;
    let first_in = inbound
        .segments
        .first()
        .ok_or(ProviderError::MissingField("itineraries[1].segments"))?;

    let airline = offer
        .validating_airline_codes
        .first()
        .cloned()
        .unwrap_or_else(|| first_out.carrier_code.clone());

    let price = offer
        .price
        .total
        .parse::<f64>()
        .map_err(|_| ProviderError::InvalidValue {
            field: "price.total",
            value: offer.price.total.clone(),
        })?;

    let duration =
        parse_iso_duration(&outbound.duration).ok_or_else(|| ProviderError::InvalidValue {
            field: "itineraries[0].duration",
            value: outbound.duration.clone(),
        })?;

    Ok(FlightOffer {
        id: offer.id,
        airline,
        flight: format!("{}{}", first_out.carrier_code, first_out.number),
        from: query.from.clone(),
        to: query.to.clone(),
        depart_date: query.depart_date.clone(),
        depart_time: clock_time(&first_out.departure.at)?,
        return_date: query.return_date.clone(),
        return_time: clock_time(&first_in.arrival.at)?,
        price,
        duration,
        url: format!("https://www.amadeus.com/flights/{}/{}", query.from, query.to),
        deal_score: None,
    })
}
