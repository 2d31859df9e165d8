// Application state and scan coordination: the single owner of settings,
// price history and the published deal list.

use std::{
    convert::Infallible,
    future::Future,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::history::{PriceHistory, RouteHistory};
use crate::models::{FlightOffer, SearchQuery, Settings, SettingsUpdate};
use crate::notify::{notify_deals, DealNotifier};
use crate::scanner::{rank_deals, DealScanner, ScanError};
use crate::storage::{DealStore, Snapshot};

/// What asked for a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanTrigger {
    Startup,
    Manual,
    Scheduled,
}

#[derive(Debug, Clone)]
pub struct ScanSummary {
    pub trigger: ScanTrigger,
    pub deals: usize,
    pub notified: usize,
    pub persisted: bool,
    pub finished_at: DateTime<Utc>,
}

// Clears the in-progress flag however the scan exits
struct ScanGuard<'a>(&'a AtomicBool);

impl<'a> ScanGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| ScanGuard(flag))
    }
}

impl Drop for ScanGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct DealFinder {
    scanner: DealScanner,
    store: Arc<dyn DealStore>,
    notifier: Arc<dyn DealNotifier>,
    settings: RwLock<Settings>,
    history: PriceHistory,
    deals: RwLock<Vec<FlightOffer>>,
    scanning: AtomicBool,
}

impl DealFinder {
    pub fn new(
        scanner: DealScanner,
        store: Arc<dyn DealStore>,
        notifier: Arc<dyn DealNotifier>,
        snapshot: Snapshot,
    ) -> Self {
        Self {
            scanner,
            store,
            notifier,
            settings: RwLock::new(snapshot.settings),
            history: PriceHistory::from(snapshot.history),
            deals: RwLock::new(snapshot.deals),
            scanning: AtomicBool::new(false),
        }
    }

    /// Build from whatever the store has saved.
    pub async fn restore(
        scanner: DealScanner,
        store: Arc<dyn DealStore>,
        notifier: Arc<dyn DealNotifier>,
    ) -> Self {
        let snapshot = store.load().await;
        tracing::info!(
            deals = snapshot.deals.len(),
            routes = snapshot.history.len(),
            "restored saved state"
        );
        Self::new(scanner, store, notifier, snapshot)
    }

    pub fn settings(&self) -> Settings {
        self.settings.read().clone()
    }

    pub fn deals(&self) -> Vec<FlightOffer> {
        self.deals.read().clone()
    }

    pub fn price_history(&self) -> std::collections::HashMap<String, RouteHistory> {
        self.history.snapshot()
    }

    pub fn is_scanning(&self) -> bool {
        self.scanning.load(Ordering::Acquire)
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            deals: self.deals(),
            history: self.history.snapshot(),
            settings: self.settings(),
        }
    }

    /// Persist current state; failures are logged and reported as `false`.
    pub async fn persist(&self) -> bool {
        match self.store.save(&self.snapshot()).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(error = %e, "failed to save data");
                false
            }
        }
    }

    /// Run a full scan and publish its deals. Only one scan runs at a time;
    /// a request arriving while one is in flight gets `ScanError::Busy`.
    pub async fn run_scan(&self, trigger: ScanTrigger) -> Result<ScanSummary, ScanError> {
        let Some(_guard) = ScanGuard::acquire(&self.scanning) else {
            tracing::warn!(?trigger, "scan already running, request dropped");
            return Err(ScanError::Busy);
        };

        tracing::info!(?trigger, "starting scan");

        // Settings edits made mid-scan apply to the next one
        let settings = self.settings();
        let mut deals = self.scanner.scan(&settings, &self.history).await;
        rank_deals(&mut deals);

        *self.deals.write() = deals.clone();
        let persisted = self.persist().await;

        let notified = if trigger == ScanTrigger::Scheduled {
            notify_deals(self.notifier.as_ref(), &deals, &settings).await
        } else {
            0
        };

        tracing::info!(?trigger, deals = deals.len(), "scan complete");

        Ok(ScanSummary {
            trigger,
            deals: deals.len(),
            notified,
            persisted,
            finished_at: Utc::now(),
        })
    }

    /// Startup trigger: scan only when nothing is published yet.
    pub async fn scan_if_empty(&self) -> Option<Result<ScanSummary, ScanError>> {
        let published = !self.deals.read().is_empty();
        if published {
            return None;
        }
        tracing::info!("no deals found, running initial scan");
        Some(self.run_scan(ScanTrigger::Startup).await)
    }

    /// Shallow-merge `update` into the settings and persist.
    pub async fn update_settings(&self, update: SettingsUpdate) -> Settings {
        let updated = {
            let mut settings = self.settings.write();
            settings.apply(update);
            settings.clone()
        };
        self.persist().await;
        updated
    }

    /// Run the startup scan, then wait for `shutdown`. A shutdown arriving
    /// mid-scan cancels the scan. State is saved before returning.
    pub async fn run_until<F: Future>(&self, shutdown: F) -> F::Output {
        let startup = async {
            match self.scan_if_empty().await {
                Some(Ok(summary)) => tracing::info!(deals = summary.deals, "initial scan complete"),
                Some(Err(e)) => tracing::warn!(error = %e, "initial scan skipped"),
                None => {}
            }
            std::future::pending::<Infallible>().await
        };

        let output = tokio::select! {
            output = shutdown => output,
            never = startup => match never {},
        };

        if !self.persist().await {
            tracing::warn!("final save failed");
        }
        output
    }

    /// Ad-hoc search outside of a scan; does not touch history.
    pub async fn search(&self, query: &SearchQuery) -> Vec<FlightOffer> {
        self.scanner.search().search_flights(query).await
    }
}
