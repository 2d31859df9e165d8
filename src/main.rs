use std::{future::Future, sync::Arc};

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use weekend_deal_finder::{
    notify::LogNotifier,
    providers::{
        AmadeusProvider, FlightProvider, KiwiProvider, SimulatedFlights, SkyscannerProvider,
    },
    scheduler, AppConfig, DealFinder, DealScanner, FlightSearch, JsonFileStore,
};

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("invalid configuration")?;
    init_tracing(config.log_json);

    let timeout = config.request_timeout();
    let providers: Vec<Arc<dyn FlightProvider>> = vec![
        Arc::new(AmadeusProvider::new(config.amadeus.clone(), timeout)),
        Arc::new(SkyscannerProvider::new(config.skyscanner_api_key.clone(), timeout)),
        Arc::new(KiwiProvider::new(config.kiwi_api_key.clone(), timeout)),
    ];
    let search = Arc::new(
        FlightSearch::new(providers, Arc::new(SimulatedFlights::new()))
            .with_provider_timeout(config.provider_timeout()),
    );

    for (name, configured) in search.provider_status() {
        tracing::info!(provider = name, configured, "flight provider");
    }
    if !search.has_configured_provider() {
        tracing::warn!("no flight API configured, using simulated flights");
    }

    let store = JsonFileStore::open(config.data_dir.clone())
        .await
        .with_context(|| format!("cannot open data directory {}", config.data_dir.display()))?;

    let finder = Arc::new(
        DealFinder::restore(
            DealScanner::new(search, config.scanner()),
            Arc::new(store),
            Arc::new(LogNotifier),
        )
        .await,
    );

    let daily = scheduler::spawn_daily(Arc::clone(&finder), config.scan_hour);
    tracing::info!(hour = config.scan_hour, "daily scan scheduled");

    // Handlers are installed before the startup scan so a stop during it
    // still reaches the final save
    let shutdown = shutdown_signal()?;
    let signal = finder.run_until(shutdown).await;

    tracing::info!(signal, "shutting down");
    daily.abort();

    Ok(())
}

#[cfg(unix)]
fn shutdown_signal() -> anyhow::Result<impl Future<Output = &'static str>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate =
        signal(SignalKind::terminate()).context("failed to install SIGTERM handler")?;

    Ok(async move {
        tokio::select! {
            Ok(()) = tokio::signal::ctrl_c() => "SIGINT",
            _ = terminate.recv() => "SIGTERM",
        }
    })
}

#[cfg(not(unix))]
fn shutdown_signal() -> anyhow::Result<impl Future<Output = &'static str>> {
    Ok(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
        "ctrl-c"
    })
}
