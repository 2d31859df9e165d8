// Weekend flight deal finder: provider fallback search, rolling route price
// history and deal scoring

pub mod app;
pub mod circuit_breaker;
pub mod config;
pub mod duration;
pub mod history;
pub mod models;
pub mod notify;
pub mod providers;
pub mod scanner;
pub mod scheduler;
pub mod search;
pub mod storage;
pub mod weekends;

// Re-export key types for convenience
pub use app::{DealFinder, ScanSummary, ScanTrigger};
pub use config::{AppConfig, ConfigError};
pub use history::{PriceHistory, RouteHistory};
pub use models::{FlightOffer, SearchQuery, Settings, SettingsUpdate};
pub use providers::{FlightProvider, ProviderError, ProviderOutcome};
pub use scanner::{DealScanner, ScanError, ScannerConfig};
pub use search::FlightSearch;
pub use storage::{DealStore, JsonFileStore, Snapshot, StoreError};
pub use weekends::{weekend_windows, WeekendWindow};
