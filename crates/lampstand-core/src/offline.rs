//! Offline availability of translations and commentary packages.
//!
//! Transfer is simulated: a ticker task bumps progress by a fixed step on a
//! fixed interval until it reaches 100. Only the status map is persisted;
//! progress lives in memory and starts empty on every load.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::storage::{read_json, write_json, KeyValueStore, OFFLINE_STATUS_KEY};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DownloadStatus {
    #[default]
    NotDownloaded,
    Downloading,
    Downloaded,
    /// Reserved for a network-backed transfer; the simulation never fails.
    Error,
}

/// Progress added per tick, and the tick interval. A zero step counts as 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadSchedule {
    pub step: u8,
    pub interval: Duration,
}

impl Default for DownloadSchedule {
    fn default() -> Self {
        Self {
            step: 10,
            interval: Duration::from_millis(200),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OfflineSnapshot {
    pub statuses: BTreeMap<String, DownloadStatus>,
    pub progress: BTreeMap<String, u8>,
}

impl OfflineSnapshot {
    pub fn status(&self, id: &str) -> DownloadStatus {
        self.statuses.get(id).copied().unwrap_or_default()
    }
}

struct Ticker {
    generation: u64,
    handle: JoinHandle<()>,
}

#[derive(Default)]
struct Inner {
    snapshot: OfflineSnapshot,
    tickers: HashMap<String, Ticker>,
    next_generation: u64,
}

struct Shared {
    store: Arc<dyn KeyValueStore>,
    schedule: DownloadSchedule,
    inner: Mutex<Inner>,
    tx: watch::Sender<OfflineSnapshot>,
}

/// Cheap to clone; clones drive the same state.
#[derive(Clone)]
pub struct OfflineManager {
    shared: Arc<Shared>,
}

impl OfflineManager {
    pub fn load(store: Arc<dyn KeyValueStore>, schedule: DownloadSchedule) -> Self {
        let raw = match read_json::<BTreeMap<String, serde_json::Value>>(
            store.as_ref(),
            OFFLINE_STATUS_KEY,
        ) {
            Ok(Some(raw)) => raw,
            Ok(None) => BTreeMap::new(),
            Err(e) => {
                warn!("Failed to load offline statuses, starting empty: {e}");
                BTreeMap::new()
            }
        };

        // an unrecognised entry only loses that entry
        let mut statuses = BTreeMap::new();
        for (id, value) in raw {
            match serde_json::from_value::<DownloadStatus>(value) {
                Ok(status) => {
                    statuses.insert(id, status);
                }
                Err(e) => warn!(%id, "Ignoring unknown offline status: {e}"),
            }
        }

        // Nothing is transferring at startup.
        for (id, status) in statuses.iter_mut() {
            if *status == DownloadStatus::Downloading {
                info!(%id, "Resetting interrupted download");
                *status = DownloadStatus::NotDownloaded;
            }
        }

        let snapshot = OfflineSnapshot {
            statuses,
            progress: BTreeMap::new(),
        };
        let (tx, _rx) = watch::channel(snapshot.clone());
        Self {
            shared: Arc::new(Shared {
                store,
                schedule,
                inner: Mutex::new(Inner {
                    snapshot,
                    ..Default::default()
                }),
                tx,
            }),
        }
    }

    pub fn status(&self, id: &str) -> DownloadStatus {
        self.shared
            .lock()
            .map(|inner| inner.snapshot.status(id))
            .unwrap_or_default()
    }

    pub fn progress(&self, id: &str) -> Option<u8> {
        self.shared
            .lock()
            .and_then(|inner| inner.snapshot.progress.get(id).copied())
    }

    pub fn is_downloaded(&self, id: &str) -> bool {
        self.status(id) == DownloadStatus::Downloaded
    }

    pub fn snapshot(&self) -> OfflineSnapshot {
        self.shared.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<OfflineSnapshot> {
        self.shared.tx.subscribe()
    }

    /// Begin a download for `id`. Returns `false` without touching anything
    /// if a transfer for `id` is already running.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start_download(&self, id: &str) -> bool {
        let Some(mut inner) = self.shared.lock() else {
            return false;
        };
        if inner.tickers.contains_key(id) {
            debug!(%id, "Download already in flight");
            return false;
        }

        inner.next_generation += 1;
        let generation = inner.next_generation;
        inner
            .snapshot
            .statuses
            .insert(id.to_string(), DownloadStatus::Downloading);
        inner.snapshot.progress.insert(id.to_string(), 0);

        let handle = tokio::spawn(run_ticker(
            Arc::clone(&self.shared),
            id.to_string(),
            generation,
        ));
        inner
            .tickers
            .insert(id.to_string(), Ticker { generation, handle });

        info!(%id, "Download started");
        self.shared.commit(&inner);
        true
    }

    /// Forget `id` regardless of its current state, cancelling any transfer.
    pub fn remove(&self, id: &str) {
        let Some(mut inner) = self.shared.lock() else {
            return;
        };
        if let Some(ticker) = inner.tickers.remove(id) {
            ticker.handle.abort();
            debug!(%id, "Cancelled in-flight download");
        }
        inner
            .snapshot
            .statuses
            .insert(id.to_string(), DownloadStatus::NotDownloaded);
        inner.snapshot.progress.insert(id.to_string(), 0);

        info!(%id, "Offline resource removed");
        self.shared.commit(&inner);
    }
}

impl Shared {
    fn lock(&self) -> Option<MutexGuard<'_, Inner>> {
        match self.inner.lock() {
            Ok(guard) => Some(guard),
            Err(_) => {
                warn!("Offline state lock poisoned");
                None
            }
        }
    }

    /// Persist statuses and publish the snapshot. Called with the lock held
    /// so writes land in call order.
    fn commit(&self, inner: &Inner) {
        let statuses = &inner.snapshot.statuses;
        if let Err(e) = write_json(self.store.as_ref(), OFFLINE_STATUS_KEY, statuses) {
            warn!("Failed to save offline statuses: {e}");
        }
        self.tx.send_replace(inner.snapshot.clone());
    }

    /// Apply one progress step. `None` means the ticker is stale and must
    /// stop; `Some(true)` means the download just completed.
    fn tick(&self, id: &str, generation: u64) -> Option<bool> {
        let mut inner = self.lock()?;
        if inner.tickers.get(id).map(|t| t.generation) != Some(generation) {
            debug!(%id, generation, "Dropping stale download tick");
            return None;
        }

        let current = inner.snapshot.progress.get(id).copied().unwrap_or(0);
        let next = current.saturating_add(self.schedule.step.max(1)).min(100);
        inner.snapshot.progress.insert(id.to_string(), next);

        if next < 100 {
            debug!(%id, progress = next, "Download progress");
            // progress is transient, so only publish
            self.tx.send_replace(inner.snapshot.clone());
            return Some(false);
        }

        inner
            .snapshot
            .statuses
            .insert(id.to_string(), DownloadStatus::Downloaded);
        inner.tickers.remove(id);
        info!(%id, "Download complete");
        self.commit(&inner);
        Some(true)
    }
}

async fn run_ticker(shared: Arc<Shared>, id: String, generation: u64) {
    loop {
        tokio::time::sleep(shared.schedule.interval).await;
        match shared.tick(&id, generation) {
            Some(false) => continue,
            Some(true) | None => return,
        }
    }
}
