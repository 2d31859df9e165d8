// JSON file persistence for deals, price history and settings

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

use crate::history::RouteHistory;
use crate::models::{FlightOffer, Settings};

pub const DEALS_FILE: &str = "deals.json";
pub const HISTORY_FILE: &str = "price-history.json";
pub const SETTINGS_FILE: &str = "settings.json";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Everything that survives a restart.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub deals: Vec<FlightOffer>,
    pub history: HashMap<String, RouteHistory>,
    pub settings: Settings,
}

#[async_trait]
pub trait DealStore: Send + Sync {
    /// Missing or unreadable parts come back as their defaults.
    async fn load(&self) -> Snapshot;

    async fn save(&self, snapshot: &Snapshot) -> Result<(), StoreError>;
}

pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    /// Create the data directory if needed.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|source| StoreError::Io {
                path: dir.clone(),
                source,
            })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn read_or_default<T: DeserializeOwned + Default>(&self, file: &str) -> T {
        let path = self.dir.as_path().join(file);

        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(file, "no saved data, using defaults");
                return T::default();
            }
            Err(e) => {
                tracing::warn!(file, error = %e, "could not read saved data, using defaults");
                return T::default();
            }
        };

        serde_json::from_str(&raw).unwrap_or_else(|e| {
            tracing::warn!(file, error = %e, "corrupt saved data, using defaults");
            T::default()
        })
    }

    // Written to a sibling temp file first so a crash never leaves half a file
    async fn write<T: Serialize + ?Sized>(&self, file: &str, value: &T) -> Result<(), StoreError> {
        let path = self.dir.as_path().join(file);
        let tmp = self.dir.as_path().join(format!("{}.tmp", file));
        let json = serde_json::to_string_pretty(value)?;

        tokio::fs::write(&tmp, json)
            .await
            .map_err(|source| StoreError::Io {
                path: tmp.clone(),
                source,
            })?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|source| StoreError::Io { path, source })
    }
}

#[async_trait]
impl DealStore for JsonFileStore {
    async fn load(&self) -> Snapshot {
        Snapshot {
            deals: self.read_or_default(DEALS_FILE).await,
            history: self.read_or_default(HISTORY_FILE).await,
            settings: self.read_or_default(SETTINGS_FILE).await,
        }
    }

    async fn save(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        self.write(DEALS_FILE, &snapshot.deals).await?;
        self.write(HISTORY_FILE, &snapshot.history).await?;
        self.write(SETTINGS_FILE, &snapshot.settings).await?;
        Ok(())
    }
}
