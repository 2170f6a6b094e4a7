//! Commentary for the current reference: generative (online) or the
//! downloadable JFB package (offline).

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::ai::CommentaryGenerator;
use crate::error::ReaderError;
use crate::latest::Latest;
use crate::offline::DownloadStatus;

pub const UNAVAILABLE_MESSAGE: &str = "API Key not configured. Commentary is unavailable.";
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Human-readable locator such as "Genesis 1:3" or "Genesis 1".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub book_name: String,
    pub chapter: u32,
    pub verse: Option<u32>,
}

impl Reference {
    pub fn new(book_name: impl Into<String>, chapter: u32, verse: Option<u32>) -> Self {
        Self {
            book_name: book_name.into(),
            chapter,
            verse,
        }
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.verse {
            Some(verse) => write!(f, "{} {}:{}", self.book_name, self.chapter, verse),
            None => write!(f, "{} {}", self.book_name, self.chapter),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommentarySource {
    #[default]
    Ai,
    Jfb,
}

impl CommentarySource {
    pub fn display_name(&self) -> &'static str {
        match self {
            CommentarySource::Ai => "AI (Online)",
            CommentarySource::Jfb => "JFB (Offline)",
        }
    }

    /// Whether the selector for this source may be used.
    pub fn is_enabled(&self, jfb_status: DownloadStatus) -> bool {
        match self {
            CommentarySource::Ai => true,
            CommentarySource::Jfb => jfb_status == DownloadStatus::Downloaded,
        }
    }

    /// The source actually used: the offline package only when downloaded.
    pub fn effective(self, jfb_status: DownloadStatus) -> Self {
        if self.is_enabled(jfb_status) {
            self
        } else {
            CommentarySource::Ai
        }
    }
}

pub fn commentary_prompt(reference: &str) -> String {
    format!(
        "Provide a brief theological commentary for {reference}. Focus on its historical context, key themes, and significance. Keep the tone academic but accessible. Do not use markdown."
    )
}

pub struct CommentaryService {
    generator: Option<Arc<dyn CommentaryGenerator>>,
}

impl CommentaryService {
    pub fn new(generator: Option<Arc<dyn CommentaryGenerator>>) -> Self {
        Self { generator }
    }

    pub fn is_configured(&self) -> bool {
        self.generator.is_some()
    }

    pub async fn fetch_commentary(&self, reference: &str) -> Result<String, ReaderError> {
        let Some(generator) = &self.generator else {
            return Ok(UNAVAILABLE_MESSAGE.to_string());
        };

        debug!(%reference, "Requesting commentary");
        generator
            .generate(&commentary_prompt(reference))
            .await
            .map_err(|e| {
                warn!(%reference, "Commentary generation failed: {e:#}");
                ReaderError::Generation(e.to_string())
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CommentaryState {
    #[default]
    Idle,
    Loading { reference: String },
    Ready { reference: String, text: String },
    Failed { reference: String, message: String },
    /// The offline source is active; the view shows its static placeholder.
    Offline { reference: String },
}

/// Debounced commentary fetcher holding at most one pending request.
///
/// Clones share the pending request and the published state, so a
/// background task can re-issue commentary on the session's behalf.
#[derive(Clone)]
pub struct CommentaryLoader {
    inner: Arc<LoaderInner>,
}

struct LoaderInner {
    service: Arc<CommentaryService>,
    delay: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
    state: Arc<Latest<CommentaryState>>,
}

impl CommentaryLoader {
    pub fn new(service: Arc<CommentaryService>, delay: Duration) -> Self {
        Self {
            inner: Arc::new(LoaderInner {
                service,
                delay,
                pending: Mutex::new(None),
                state: Arc::new(Latest::new(CommentaryState::Idle)),
            }),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<CommentaryState> {
        self.inner.state.subscribe()
    }

    pub fn state(&self) -> CommentaryState {
        self.inner.state.current()
    }

    /// Replace any pending request with one for `reference`, issued after the
    /// debounce delay. Must be called from within a tokio runtime.
    pub fn request(&self, reference: &str) {
        let mut pending = self.inner.lock_pending();
        if let Some(handle) = pending.take() {
            handle.abort();
        }
        let generation = self.inner.state.begin(CommentaryState::Loading {
            reference: reference.to_string(),
        });

        let service = Arc::clone(&self.inner.service);
        let latest = Arc::clone(&self.inner.state);
        let delay = self.inner.delay;
        let reference = reference.to_string();

        *pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let state = match service.fetch_commentary(&reference).await {
                Ok(text) => CommentaryState::Ready { reference, text },
                Err(e) => CommentaryState::Failed {
                    reference,
                    message: e.to_string(),
                },
            };
            if !latest.finish(generation, state) {
                debug!(generation, "Discarding stale commentary");
            }
        }));
    }

    /// Switch to the offline placeholder for `reference`; no fetch happens.
    pub fn show_offline(&self, reference: &str) {
        self.inner.supersede(CommentaryState::Offline {
            reference: reference.to_string(),
        });
    }

    pub fn cancel(&self) {
        self.inner.supersede(CommentaryState::Idle);
    }
}

impl LoaderInner {
    // a panicked holder leaves at most a stale handle behind
    fn lock_pending(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn supersede(&self, state: CommentaryState) {
        let mut pending = self.lock_pending();
        if let Some(handle) = pending.take() {
            handle.abort();
        }
        self.state.begin(state);
    }
}

impl Drop for LoaderInner {
    fn drop(&mut self) {
        if let Some(handle) = self.lock_pending().take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use async_trait::async_trait;

    #[derive(Default)]
    struct CountingGenerator {
        prompts: Mutex<Vec<String>>,
        fail: bool,
    }

    impl CountingGenerator {
        fn prompts(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CommentaryGenerator for CountingGenerator {
        async fn generate(&self, prompt: &str) -> anyhow::Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            if self.fail {
                return Err(anyhow!("quota exceeded"));
            }
            Ok(format!("commentary for: {prompt}"))
        }
    }

    fn loader_with(generator: Arc<CountingGenerator>) -> CommentaryLoader {
        let service = CommentaryService::new(Some(generator as Arc<dyn CommentaryGenerator>));
        CommentaryLoader::new(Arc::new(service), DEFAULT_DEBOUNCE)
    }

    #[test]
    fn test_reference_display() {
        assert_eq!(Reference::new("Genesis", 1, Some(3)).to_string(), "Genesis 1:3");
        assert_eq!(Reference::new("Genesis", 1, None).to_string(), "Genesis 1");
    }

    #[test]
    fn test_jfb_source_requires_download() {
        assert!(!CommentarySource::Jfb.is_enabled(DownloadStatus::NotDownloaded));
        assert!(!CommentarySource::Jfb.is_enabled(DownloadStatus::Downloading));
        assert!(CommentarySource::Jfb.is_enabled(DownloadStatus::Downloaded));
        assert!(CommentarySource::Ai.is_enabled(DownloadStatus::Error));
        assert_eq!(CommentarySource::Jfb.display_name(), "JFB (Offline)");
        assert_eq!(CommentarySource::Ai.display_name(), "AI (Online)");
    }

    #[test]
    fn test_effective_source_self_corrects_idempotently() {
        let once = CommentarySource::Jfb.effective(DownloadStatus::NotDownloaded);
        assert_eq!(once, CommentarySource::Ai);
        assert_eq!(once.effective(DownloadStatus::NotDownloaded), CommentarySource::Ai);
        assert_eq!(
            CommentarySource::Jfb.effective(DownloadStatus::Downloaded),
            CommentarySource::Jfb
        );
    }

    #[tokio::test]
    async fn test_unconfigured_service_short_circuits() {
        let service = CommentaryService::new(None);
        assert!(!service.is_configured());
        let text = service.fetch_commentary("Genesis 1").await.unwrap();
        assert_eq!(text, UNAVAILABLE_MESSAGE);
    }

    #[tokio::test]
    async fn test_generation_failure_is_wrapped() {
        let generator = Arc::new(CountingGenerator {
            fail: true,
            ..Default::default()
        });
        let service = CommentaryService::new(Some(generator as Arc<dyn CommentaryGenerator>));
        let err = service.fetch_commentary("Genesis 1").await.unwrap_err();
        assert!(matches!(err, ReaderError::Generation(_)));
        assert_eq!(err.to_string(), "Failed to generate commentary: quota exceeded");
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_requests_issue_only_the_last() {
        let generator = Arc::new(CountingGenerator::default());
        let loader = loader_with(generator.clone());

        loader.request("Genesis 1");
        tokio::time::sleep(Duration::from_millis(200)).await;
        loader.request("Genesis 2");
        assert_eq!(
            loader.state(),
            CommentaryState::Loading {
                reference: "Genesis 2".to_string()
            }
        );

        tokio::time::sleep(Duration::from_millis(1000)).await;

        let prompts = generator.prompts();
        assert_eq!(prompts.len(), 1);
        assert_eq!(prompts[0], commentary_prompt("Genesis 2"));
        assert!(matches!(
            loader.state(),
            CommentaryState::Ready { reference, .. } if reference == "Genesis 2"
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_nothing_issued_before_delay() {
        let generator = Arc::new(CountingGenerator::default());
        let loader = loader_with(generator.clone());
        loader.request("Exodus 3");
        tokio::time::sleep(Duration::from_millis(499)).await;
        assert!(generator.prompts().is_empty());
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(generator.prompts().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_show_offline_cancels_pending_request() {
        let generator = Arc::new(CountingGenerator::default());
        let loader = loader_with(generator.clone());
        loader.request("Genesis 1");
        loader.show_offline("Genesis 1");
        tokio::time::sleep(Duration::from_millis(1000)).await;

        assert!(generator.prompts().is_empty());
        assert_eq!(
            loader.state(),
            CommentaryState::Offline {
                reference: "Genesis 1".to_string()
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_surfaces_as_failed_state() {
        let generator = Arc::new(CountingGenerator {
            fail: true,
            ..Default::default()
        });
        let loader = loader_with(generator);
        loader.request("Ruth 1");
        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(
            loader.state(),
            CommentaryState::Failed {
                reference: "Ruth 1".to_string(),
                message: "Failed to generate commentary: quota exceeded".to_string(),
            }
        );
    }
}
