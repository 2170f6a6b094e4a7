//! Reader session: the current selection and the loaders it drives.
//!
//! Every change of book, chapter, or translation starts a chapter fetch
//! tagged with a fresh generation. A fetch that resolves after the user
//! has moved on is discarded, so the displayed chapter always belongs to
//! the latest selection.

use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::catalog::{
    find_book, find_translation, Book, Translation, BIBLE_BOOKS, JFB_COMMENTARY_ID, TRANSLATIONS,
};
use crate::chapter::{ChapterClient, ChapterResponse};
use crate::commentary::{CommentaryLoader, CommentarySource, CommentaryState, Reference};
use crate::error::ReaderError;
use crate::highlights::Highlight;
use crate::latest::Latest;
use crate::offline::{DownloadStatus, OfflineManager};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub book: &'static Book,
    pub chapter: u32,
    pub translation: &'static Translation,
}

impl Default for Selection {
    fn default() -> Self {
        Self {
            book: &BIBLE_BOOKS[0],
            chapter: 1,
            translation: &TRANSLATIONS[0],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ChapterState {
    #[default]
    Empty,
    Loading {
        selection: Selection,
    },
    Loaded {
        selection: Selection,
        chapter: ChapterResponse,
    },
    Failed {
        selection: Selection,
        message: String,
    },
}

impl ChapterState {
    pub fn is_loading(&self) -> bool {
        matches!(self, ChapterState::Loading { .. })
    }
}

/// What the commentary panel is showing, shared with the offline watcher.
#[derive(Debug, Default)]
struct CommentaryFocus {
    source: CommentarySource,
    reference: String,
    /// Source and reference of the last request; repeats are skipped.
    issued: Option<(CommentarySource, String)>,
}

type SharedFocus = Arc<Mutex<CommentaryFocus>>;

fn lock_focus(focus: &Mutex<CommentaryFocus>) -> MutexGuard<'_, CommentaryFocus> {
    focus.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub struct ReaderSession {
    selection: Selection,
    active_verse: Option<u32>,
    focus: SharedFocus,
    chapters: ChapterClient,
    offline: OfflineManager,
    commentary: CommentaryLoader,
    chapter_state: Arc<Latest<ChapterState>>,
    jfb_watch: Option<JoinHandle<()>>,
}

impl ReaderSession {
    pub fn new(
        chapters: ChapterClient,
        offline: OfflineManager,
        commentary: CommentaryLoader,
    ) -> Self {
        Self {
            selection: Selection::default(),
            active_verse: None,
            focus: SharedFocus::default(),
            chapters,
            offline,
            commentary,
            chapter_state: Arc::new(Latest::new(ChapterState::Empty)),
            jfb_watch: None,
        }
    }

    /// Load the initial selection. Must be called from within a tokio runtime.
    pub fn open(mut self) -> Self {
        self.reload();
        self
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn active_verse(&self) -> Option<u32> {
        self.active_verse
    }

    pub fn offline(&self) -> &OfflineManager {
        &self.offline
    }

    /// Chapter numbers for the selected book.
    pub fn chapter_options(&self) -> Vec<u32> {
        self.selection.book.chapter_options()
    }

    pub fn reference(&self) -> Reference {
        Reference::new(
            self.selection.book.name,
            self.selection.chapter,
            self.active_verse,
        )
    }

    pub fn chapter_state(&self) -> watch::Receiver<ChapterState> {
        self.chapter_state.subscribe()
    }

    pub fn current_chapter(&self) -> ChapterState {
        self.chapter_state.current()
    }

    pub fn commentary_state(&self) -> watch::Receiver<CommentaryState> {
        self.commentary.subscribe()
    }

    /// Switching books always starts at chapter 1.
    pub fn select_book(&mut self, book_id: &str) -> Result<(), ReaderError> {
        let book = find_book(book_id)
            .ok_or_else(|| ReaderError::InvalidSelection(format!("unknown book '{book_id}'")))?;
        self.selection.book = book;
        self.selection.chapter = 1;
        self.reload();
        Ok(())
    }

    pub fn select_chapter(&mut self, chapter: u32) -> Result<(), ReaderError> {
        let book = self.selection.book;
        if !book.has_chapter(chapter) {
            return Err(ReaderError::InvalidSelection(format!(
                "{} has {} chapters, not {chapter}",
                book.name, book.chapters
            )));
        }
        self.selection.chapter = chapter;
        self.reload();
        Ok(())
    }

    pub fn select_translation(&mut self, translation_id: &str) -> Result<(), ReaderError> {
        let translation = find_translation(translation_id).ok_or_else(|| {
            ReaderError::InvalidSelection(format!("unknown translation '{translation_id}'"))
        })?;
        self.selection.translation = translation;
        self.reload();
        Ok(())
    }

    /// Jump to a highlight's chapter (if not already there) and focus its verse.
    pub fn navigate_to(&mut self, highlight: &Highlight) -> Result<(), ReaderError> {
        let book = find_book(&highlight.book_id).ok_or_else(|| {
            ReaderError::InvalidSelection(format!("unknown book '{}'", highlight.book_id))
        })?;
        if !book.has_chapter(highlight.chapter) {
            return Err(ReaderError::InvalidSelection(format!(
                "{} has {} chapters, not {}",
                book.name, book.chapters, highlight.chapter
            )));
        }

        if self.selection.book.id != book.id || self.selection.chapter != highlight.chapter {
            self.selection.book = book;
            self.selection.chapter = highlight.chapter;
            self.reload();
        }
        self.set_active_verse(Some(highlight.verse));
        Ok(())
    }

    pub fn set_active_verse(&mut self, verse: Option<u32>) {
        self.active_verse = verse;
        self.refresh_commentary();
    }

    /// The source in effect. Never reports the offline package once it is
    /// no longer downloaded.
    pub fn commentary_source(&self) -> CommentarySource {
        lock_focus(&self.focus)
            .source
            .effective(self.offline.status(JFB_COMMENTARY_ID))
    }

    pub fn is_source_enabled(&self, source: CommentarySource) -> bool {
        source.is_enabled(self.offline.status(JFB_COMMENTARY_ID))
    }

    /// Returns `false` and changes nothing when `source` is not available.
    pub fn set_commentary_source(&mut self, source: CommentarySource) -> bool {
        if !self.is_source_enabled(source) {
            debug!(?source, "Commentary source not available");
            return false;
        }
        lock_focus(&self.focus).source = source;
        match source {
            CommentarySource::Jfb => self.watch_offline_package(),
            CommentarySource::Ai => self.stop_watching(),
        }
        self.refresh_commentary();
        true
    }

    /// Bring the commentary panel in line with the current reference and
    /// source, falling back to the generative source if the offline package
    /// is no longer downloaded. Nothing is re-issued when neither changed.
    pub fn refresh_commentary(&mut self) {
        let reference = self.reference().to_string();
        let jfb_status = self.offline.status(JFB_COMMENTARY_ID);
        let mut focus = lock_focus(&self.focus);
        focus.reference = reference;
        issue_commentary(&mut focus, jfb_status, &self.commentary);
    }

    /// Follow the offline package while it is the active source, so its
    /// removal switches the panel back to generated commentary.
    fn watch_offline_package(&mut self) {
        if matches!(&self.jfb_watch, Some(handle) if !handle.is_finished()) {
            return;
        }
        let mut statuses = self.offline.subscribe();
        let focus = Arc::clone(&self.focus);
        let commentary = self.commentary.clone();

        self.jfb_watch = Some(tokio::spawn(async move {
            let gone = statuses
                .wait_for(|snap| snap.status(JFB_COMMENTARY_ID) != DownloadStatus::Downloaded)
                .await
                .map(|snap| snap.status(JFB_COMMENTARY_ID));
            let Ok(jfb_status) = gone else {
                return;
            };
            let mut focus = lock_focus(&focus);
            issue_commentary(&mut focus, jfb_status, &commentary);
        }));
    }

    fn stop_watching(&mut self) {
        if let Some(handle) = self.jfb_watch.take() {
            handle.abort();
        }
    }

    /// Fetch the chapter for the current selection.
    pub fn reload(&mut self) {
        let selection = self.selection;
        self.active_verse = None;

        let generation = self
            .chapter_state
            .begin(ChapterState::Loading { selection });
        let available_offline = self.offline.is_downloaded(selection.translation.id);
        let client = self.chapters.clone();
        let latest = Arc::clone(&self.chapter_state);

        tokio::spawn(async move {
            let state = match client
                .fetch_chapter(
                    selection.book.id,
                    selection.chapter,
                    selection.translation.id,
                    available_offline,
                )
                .await
            {
                Ok(chapter) => ChapterState::Loaded { selection, chapter },
                Err(e) => {
                    warn!(
                        book = selection.book.id,
                        chapter = selection.chapter,
                        "Chapter load failed: {e}"
                    );
                    ChapterState::Failed {
                        selection,
                        message: e.to_string(),
                    }
                }
            };
            if !latest.finish(generation, state) {
                debug!(
                    book = selection.book.id,
                    chapter = selection.chapter,
                    "Discarding stale chapter"
                );
            }
        });

        self.refresh_commentary();
    }
}

impl Drop for ReaderSession {
    fn drop(&mut self) {
        self.stop_watching();
    }
}

/// Resolve the effective source and issue commentary for the focused
/// reference unless exactly that was already issued.
fn issue_commentary(
    focus: &mut CommentaryFocus,
    jfb_status: DownloadStatus,
    commentary: &CommentaryLoader,
) {
    let effective = focus.source.effective(jfb_status);
    if effective != focus.source {
        info!("Offline commentary unavailable, switching to AI");
        focus.source = effective;
    }

    let next = (effective, focus.reference.clone());
    if focus.issued.as_ref() == Some(&next) {
        return;
    }
    match effective {
        CommentarySource::Jfb => commentary.show_offline(&focus.reference),
        CommentarySource::Ai => commentary.request(&focus.reference),
    }
    focus.issued = Some(next);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::CommentaryGenerator;
    use crate::chapter::ConnectivityFlag;
    use crate::commentary::{CommentaryService, DEFAULT_DEBOUNCE};
    use crate::offline::DownloadSchedule;
    use crate::storage::MemoryStore;
    use async_trait::async_trait;
    use std::time::Duration;

    #[derive(Default)]
    struct CountingGenerator {
        prompts: Mutex<Vec<String>>,
    }

    impl CountingGenerator {
        fn count(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl CommentaryGenerator for CountingGenerator {
        async fn generate(&self, prompt: &str) -> anyhow::Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok("commentary".to_string())
        }
    }

    fn offline_session(generator: Arc<CountingGenerator>) -> (ReaderSession, OfflineManager) {
        let chapters = ChapterClient::new("http://127.0.0.1:9")
            .with_connectivity(Arc::new(ConnectivityFlag::new(false)));
        let offline =
            OfflineManager::load(Arc::new(MemoryStore::new()), DownloadSchedule::default());
        let service = CommentaryService::new(Some(generator as Arc<dyn CommentaryGenerator>));
        let loader = CommentaryLoader::new(Arc::new(service), DEFAULT_DEBOUNCE);
        (ReaderSession::new(chapters, offline.clone(), loader), offline)
    }

    async fn advance(ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_translation_switch_keeps_commentary() {
        let generator = Arc::new(CountingGenerator::default());
        let (session, _offline) = offline_session(generator.clone());
        let mut session = session.open();
        advance(600).await;
        assert_eq!(generator.count(), 1);

        session.select_translation("web").unwrap();
        session.select_translation("bbe").unwrap();
        advance(600).await;
        assert_eq!(generator.count(), 1);

        // a new reference is requested again
        session.select_chapter(2).unwrap();
        advance(600).await;
        assert_eq!(generator.count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_verse_is_not_requested_twice() {
        let generator = Arc::new(CountingGenerator::default());
        let (mut session, _offline) = offline_session(generator.clone());
        session.set_active_verse(Some(3));
        session.set_active_verse(Some(3));
        advance(600).await;
        assert_eq!(generator.count(), 1);
        assert_eq!(
            session.commentary.state(),
            CommentaryState::Ready {
                reference: "Genesis 1:3".to_string(),
                text: "commentary".to_string(),
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_removed_package_falls_back_without_refresh() {
        let generator = Arc::new(CountingGenerator::default());
        let (mut session, offline) = offline_session(generator.clone());
        offline.start_download(JFB_COMMENTARY_ID);
        advance(2100).await;
        assert!(session.set_commentary_source(CommentarySource::Jfb));
        assert!(matches!(
            session.commentary.state(),
            CommentaryState::Offline { .. }
        ));

        offline.remove(JFB_COMMENTARY_ID);
        advance(600).await;

        assert_eq!(session.commentary_source(), CommentarySource::Ai);
        assert_eq!(lock_focus(&session.focus).source, CommentarySource::Ai);
        assert_eq!(generator.count(), 1);
        assert!(matches!(
            session.commentary.state(),
            CommentaryState::Ready { reference, .. } if reference == "Genesis 1"
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_offline_source_can_be_chosen_again_after_redownload() {
        let generator = Arc::new(CountingGenerator::default());
        let (mut session, offline) = offline_session(generator);
        offline.start_download(JFB_COMMENTARY_ID);
        advance(2100).await;
        assert!(session.set_commentary_source(CommentarySource::Jfb));
        offline.remove(JFB_COMMENTARY_ID);
        advance(10).await;

        offline.start_download(JFB_COMMENTARY_ID);
        advance(2100).await;
        assert!(session.set_commentary_source(CommentarySource::Jfb));
        offline.remove(JFB_COMMENTARY_ID);
        advance(10).await;
        assert_eq!(lock_focus(&session.focus).source, CommentarySource::Ai);
    }
}
