pub mod ai;
pub mod app;
pub mod catalog;
pub mod chapter;
pub mod commentary;
pub mod config;
pub mod error;
pub mod highlights;
pub mod latest;
pub mod logging;
pub mod offline;
pub mod session;
pub mod settings;
pub mod storage;

// Re-export main types for convenience
pub use ai::{CommentaryGenerator, GeminiClient};
pub use app::App;
pub use chapter::{ChapterClient, ChapterResponse, Connectivity, ConnectivityFlag, Verse};
pub use commentary::{
    CommentaryLoader, CommentaryService, CommentarySource, CommentaryState, Reference,
};
pub use config::Config;
pub use error::{ReaderError, StorageError};
pub use highlights::{Highlight, HighlightStore, NewHighlight};
pub use offline::{DownloadStatus, OfflineManager};
pub use session::{ChapterState, ReaderSession, Selection};
pub use settings::{AppSettings, Presentation, SettingsPatch, SettingsStore};
pub use storage::KeyValueStore;
