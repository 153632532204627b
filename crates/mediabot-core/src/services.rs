//! Track search backends and the registry the `sv` command switches between.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::errors::{Error, Result};
use crate::stations::{load_stations, Station};
use crate::track::TrackList;

#[async_trait]
pub trait Service: Send + Sync {
    /// Registry key, lowercase.
    fn name(&self) -> &str;

    /// Resolve a free-form query.  Zero results is `Error::NothingFound`.
    async fn search(&self, query: &str) -> Result<TrackList>;
}

/// Ordered set of services plus the one searches go to.
pub struct ServiceManager {
    available: Vec<Arc<dyn Service>>,
    current: RwLock<usize>,
}

impl ServiceManager {
    /// `default` picks the initial service by name, falling back to the first.
    pub fn new(available: Vec<Arc<dyn Service>>, default: &str) -> anyhow::Result<Self> {
        if available.is_empty() {
            anyhow::bail!("no search services registered");
        }
        let current = match available.iter().position(|s| s.name() == default) {
            Some(index) => index,
            None => {
                warn!(
                    "Unknown default service {:?}, using {:?}",
                    default,
                    available[0].name()
                );
                0
            }
        };
        Ok(Self {
            available,
            current: RwLock::new(current),
        })
    }

    pub async fn current(&self) -> Arc<dyn Service> {
        let index = *self.current.read().await;
        Arc::clone(&self.available[index])
    }

    pub fn names(&self) -> Vec<&str> {
        self.available.iter().map(|s| s.name()).collect()
    }

    /// Switch by case-insensitive name.  Returns false for unknown names.
    pub async fn select(&self, name: &str) -> bool {
        let wanted = name.trim().to_lowercase();
        match self.available.iter().position(|s| s.name() == wanted) {
            Some(index) => {
                *self.current.write().await = index;
                info!("Search service switched to {}", wanted);
                true
            }
            None => false,
        }
    }
}

/// Searches the local station catalogue.  The file is re-read on each
/// search so edits apply without a restart.
pub struct StationService {
    path: PathBuf,
}

impl StationService {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn catalogue(&self) -> Result<Vec<Station>> {
        load_stations(&self.path).map_err(|e| {
            warn!("Failed to load station catalogue {:?}: {}", self.path, e);
            Error::Service(format!("station catalogue unavailable: {e}"))
        })
    }
}

#[async_trait]
impl Service for StationService {
    fn name(&self) -> &str {
        "stations"
    }

    async fn search(&self, query: &str) -> Result<TrackList> {
        let tracks: TrackList = self
            .catalogue()?
            .iter()
            .filter(|s| s.matches(query))
            .map(Station::to_track)
            .collect();
        if tracks.is_empty() {
            return Err(Error::NothingFound);
        }
        Ok(tracks)
    }
}
