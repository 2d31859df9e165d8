// Deal digest notifications. Rendering and transport live behind `DealNotifier`.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{FlightOffer, Settings};

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Delivery failed: {0}")]
    Delivery(String),
}

#[async_trait]
pub trait DealNotifier: Send + Sync {
    /// `deals` are already filtered and non-empty.
    async fn deliver(&self, deals: &[FlightOffer], settings: &Settings) -> Result<(), NotifyError>;
}

/// Deals whose score reaches the configured threshold.
pub fn notifiable_deals(deals: &[FlightOffer], settings: &Settings) -> Vec<FlightOffer> {
    deals
        .iter()
        .filter(|d| d.deal_score.map_or(false, |s| s >= settings.deal_threshold))
        .cloned()
        .collect()
}

pub fn digest_subject(count: usize, base_airport: &str) -> String {
    format!("Flight Deal Alert: {} deals from {}!", count, base_airport)
}

pub fn digest_line(deal: &FlightOffer) -> String {
    format!(
        "{} -> {} ${:.0} ({}% below average) {} - {} {} ({}) {}",
        deal.from,
        deal.to,
        deal.price,
        (deal.deal_score.unwrap_or(0.0) * 100.0).round(),
        deal.depart_date,
        deal.return_date,
        deal.airline,
        deal.flight,
        deal.url
    )
}

/// Filter and hand the deals to `notifier`. Returns how many were sent; a
/// delivery failure is logged and reported as zero.
pub async fn notify_deals(
    notifier: &dyn DealNotifier,
    deals: &[FlightOffer],
    settings: &Settings,
) -> usize {
    if !settings.email_enabled || settings.email.trim().is_empty() {
        return 0;
    }

    let selected = notifiable_deals(deals, settings);
    if selected.is_empty() {
        return 0;
    }

    match notifier.deliver(&selected, settings).await {
        Ok(()) => {
            tracing::info!(count = selected.len(), to = %settings.email, "deal digest sent");
            selected.len()
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to send deal digest");
            0
        }
    }
}

/// Writes the digest to the log instead of sending mail.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl DealNotifier for LogNotifier {
    async fn deliver(&self, deals: &[FlightOffer], settings: &Settings) -> Result<(), NotifyError> {
        tracing::info!(
            to = %settings.email,
            subject = %digest_subject(deals.len(), &settings.base_airport),
            "deal digest"
        );
        for deal in deals {
            tracing::info!("{}", digest_line(deal));
        }
        Ok(())
    }
}
