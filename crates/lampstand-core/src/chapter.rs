use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::ReaderError;

pub const DEFAULT_CHAPTER_API_BASE: &str = "https://bible-api.com";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verse {
    pub book_id: String,
    pub book_name: String,
    pub chapter: u32,
    pub verse: u32,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterResponse {
    pub reference: String,
    pub verses: Vec<Verse>,
    #[serde(rename = "text")]
    pub raw_text: String,
    pub translation_id: String,
    #[serde(default)]
    pub translation_name: String,
    #[serde(default)]
    pub translation_note: String,
}

/// Whether the network is reachable right now.
pub trait Connectivity: Send + Sync {
    fn is_online(&self) -> bool;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysOnline;

impl Connectivity for AlwaysOnline {
    fn is_online(&self) -> bool {
        true
    }
}

/// A connectivity signal that the host flips when the OS reports a change.
#[derive(Debug, Clone)]
pub struct ConnectivityFlag {
    online: Arc<AtomicBool>,
}

impl ConnectivityFlag {
    pub fn new(online: bool) -> Self {
        Self {
            online: Arc::new(AtomicBool::new(online)),
        }
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::Release);
    }
}

impl Connectivity for ConnectivityFlag {
    fn is_online(&self) -> bool {
        self.online.load(Ordering::Acquire)
    }
}

#[derive(Clone)]
pub struct ChapterClient {
    client: Client,
    base_url: String,
    connectivity: Arc<dyn Connectivity>,
}

impl ChapterClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            connectivity: Arc::new(AlwaysOnline),
        }
    }

    pub fn with_connectivity(mut self, connectivity: Arc<dyn Connectivity>) -> Self {
        self.connectivity = connectivity;
        self
    }

    pub fn chapter_url(&self, book_id: &str, chapter: u32, translation_id: &str) -> String {
        format!(
            "{}/{}+{}?translation={}&verse_numbers=true",
            self.base_url, book_id, chapter, translation_id
        )
    }

    /// Fetch one chapter. Offline, this serves a placeholder when the
    /// translation is available locally and fails otherwise, without
    /// touching the network.
    pub async fn fetch_chapter(
        &self,
        book_id: &str,
        chapter: u32,
        translation_id: &str,
        available_offline: bool,
    ) -> Result<ChapterResponse, ReaderError> {
        if !self.connectivity.is_online() {
            if available_offline {
                info!(%book_id, chapter, %translation_id, "Serving chapter from offline storage");
                return Ok(offline_placeholder(book_id, chapter, translation_id));
            }
            return Err(ReaderError::Connectivity);
        }

        let url = self.chapter_url(book_id, chapter, translation_id);
        debug!(%url, "Fetching chapter");

        let response = self.client.get(&url).send().await.map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            if status == StatusCode::NOT_FOUND {
                return Err(ReaderError::NotFound {
                    book_id: book_id.to_string(),
                    chapter,
                });
            }
            let body = response.text().await.unwrap_or_default();
            return Err(ReaderError::fetch(
                Some(status.as_u16()),
                status_error_message(status.as_u16(), &body),
            ));
        }

        response
            .json::<ChapterResponse>()
            .await
            .map_err(transport_error)
    }
}

fn transport_error(e: reqwest::Error) -> ReaderError {
    ReaderError::fetch(
        e.status().map(|s| s.as_u16()),
        format!("An error occurred while fetching Bible data: {e}"),
    )
}

/// Prefer the service's own `{"error": ...}` message; otherwise report the
/// status, with the raw body appended when it isn't JSON.
fn status_error_message(status: u16, body: &str) -> String {
    let default = format!("Failed to fetch chapter. Status: {status}.");
    if body.is_empty() {
        return default;
    }
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(json) => json
            .get("error")
            .and_then(|e| e.as_str())
            .map(str::to_string)
            .unwrap_or(default),
        Err(_) => format!("{default} Response: {body}"),
    }
}

/// Stand-in for content read back from local storage.
fn offline_placeholder(book_id: &str, chapter: u32, translation_id: &str) -> ChapterResponse {
    let verse = Verse {
        book_id: book_id.to_string(),
        book_name: book_id.to_string(),
        chapter,
        verse: 1,
        text: "This chapter was loaded from your device while offline.".to_string(),
    };
    ChapterResponse {
        reference: format!("{book_id} {chapter}"),
        raw_text: verse.text.clone(),
        verses: vec![verse],
        translation_id: translation_id.to_string(),
        translation_name: "Offline Version".to_string(),
        translation_note: "This content is being served from local storage.".to_string(),
    }
}
