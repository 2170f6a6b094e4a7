//! Startup wiring: one storage backend shared by the three stores, the
//! HTTP clients, and fresh reader sessions on demand.

use std::sync::Arc;
use tracing::{info, warn};

use crate::ai::{CommentaryGenerator, GeminiClient};
use crate::chapter::{AlwaysOnline, ChapterClient, Connectivity, Verse};
use crate::commentary::{CommentaryLoader, CommentaryService, DEFAULT_DEBOUNCE};
use crate::config::{Config, StorageBackend};
use crate::highlights::{Highlight, HighlightStore, NewHighlight};
use crate::offline::{DownloadSchedule, OfflineManager};
use crate::session::ReaderSession;
use crate::settings::{Presentation, SettingsStore};
use crate::storage::{FileStore, KeyValueStore, MemoryStore, SqliteStore};

pub struct App {
    pub config: Config,
    pub settings: SettingsStore,
    pub highlights: HighlightStore,
    pub offline: OfflineManager,
    chapters: ChapterClient,
    commentary: Arc<CommentaryService>,
}

impl App {
    pub fn new(config: Config, presentation: Box<dyn Presentation>) -> Self {
        let store = open_store(&config);
        Self::with_store(config, store, presentation, Arc::new(AlwaysOnline))
    }

    pub fn with_store(
        config: Config,
        store: Arc<dyn KeyValueStore>,
        presentation: Box<dyn Presentation>,
        connectivity: Arc<dyn Connectivity>,
    ) -> Self {
        let settings = SettingsStore::load(Arc::clone(&store), presentation);
        let highlights = HighlightStore::load(Arc::clone(&store));
        let offline = OfflineManager::load(store, DownloadSchedule::default());

        let chapters =
            ChapterClient::new(&config.chapter_api_base).with_connectivity(connectivity);

        let generator = config.resolve_api_key().map(|key| {
            let client = GeminiClient::with_endpoint(
                &config.commentary_api_base,
                &key,
                &config.commentary_model,
            );
            info!(model = client.model(), "Commentary enabled");
            Arc::new(client) as Arc<dyn CommentaryGenerator>
        });
        if generator.is_none() {
            warn!("API key is not set. Commentary is unavailable.");
        }

        Self {
            config,
            settings,
            highlights,
            offline,
            chapters,
            commentary: Arc::new(CommentaryService::new(generator)),
        }
    }

    /// A reader session sharing this app's offline state. Call
    /// [`ReaderSession::open`] to load the first chapter.
    pub fn session(&self) -> ReaderSession {
        ReaderSession::new(
            self.chapters.clone(),
            self.offline.clone(),
            CommentaryLoader::new(Arc::clone(&self.commentary), DEFAULT_DEBOUNCE),
        )
    }

    /// Highlight a verse of the chapter shown in `session`. `None` when the
    /// topic is blank.
    pub fn highlight_verse(
        &mut self,
        session: &ReaderSession,
        verse: &Verse,
        topic: &str,
    ) -> Option<Highlight> {
        let new = NewHighlight::for_verse(session.selection().book, verse, topic)?;
        Some(self.highlights.add(new))
    }
}

/// Open the configured backend. A backend that cannot be opened is logged
/// and replaced with in-memory storage so the reader still starts.
pub fn open_store(config: &Config) -> Arc<dyn KeyValueStore> {
    if config.storage == StorageBackend::Memory {
        return Arc::new(MemoryStore::new());
    }

    let data_dir = match config.data_dir() {
        Ok(dir) => dir,
        Err(e) => {
            warn!("No data directory ({e}); using in-memory storage");
            return Arc::new(MemoryStore::new());
        }
    };

    match config.storage {
        StorageBackend::File => {
            info!(dir = %data_dir.display(), "Using file storage");
            Arc::new(FileStore::new(data_dir))
        }
        StorageBackend::Sqlite => {
            let path = data_dir.join("lampstand.db");
            match SqliteStore::open(&path) {
                Ok(store) => {
                    info!(path = %path.display(), "Using sqlite storage");
                    Arc::new(store)
                }
                Err(e) => {
                    warn!("Failed to open sqlite storage ({e}); using in-memory storage");
                    Arc::new(MemoryStore::new())
                }
            }
        }
        StorageBackend::Memory => Arc::new(MemoryStore::new()),
    }
}
