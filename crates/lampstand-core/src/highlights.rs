use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::catalog::Book;
use crate::chapter::Verse;
use crate::storage::{read_json, write_json, KeyValueStore, HIGHLIGHTS_KEY};

/// A saved verse annotation. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Highlight {
    pub id: String,
    pub book_id: String,
    pub chapter: u32,
    pub verse: u32,
    /// Verse text as it read when the highlight was made.
    pub text: String,
    pub topic: String,
    /// Display string, e.g. "Genesis 1:3".
    pub reference: String,
}

/// Everything a highlight needs except its id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewHighlight {
    pub book_id: String,
    pub chapter: u32,
    pub verse: u32,
    pub text: String,
    pub topic: String,
    pub reference: String,
}

impl NewHighlight {
    /// Highlight a displayed verse under `topic`. A blank topic means the
    /// user cancelled, so nothing is created.
    pub fn for_verse(book: &Book, verse: &Verse, topic: &str) -> Option<Self> {
        let topic = topic.trim();
        if topic.is_empty() {
            return None;
        }
        Some(Self {
            book_id: book.id.to_string(),
            chapter: verse.chapter,
            verse: verse.verse,
            text: verse.text.clone(),
            topic: topic.to_string(),
            reference: format!("{} {}:{}", verse.book_name, verse.chapter, verse.verse),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicGroup<'a> {
    pub topic: &'a str,
    pub highlights: Vec<&'a Highlight>,
}

pub struct HighlightStore {
    store: Arc<dyn KeyValueStore>,
    highlights: Vec<Highlight>,
}

impl HighlightStore {
    pub fn load(store: Arc<dyn KeyValueStore>) -> Self {
        let highlights = match read_json::<Vec<Highlight>>(store.as_ref(), HIGHLIGHTS_KEY) {
            Ok(Some(highlights)) => {
                info!("Loaded {} highlights", highlights.len());
                highlights
            }
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!("Failed to load highlights, starting empty: {e}");
                Vec::new()
            }
        };
        Self { store, highlights }
    }

    /// Append a highlight with a fresh id and persist the collection.
    pub fn add(&mut self, new: NewHighlight) -> Highlight {
        let highlight = Highlight {
            id: Uuid::new_v4().to_string(),
            book_id: new.book_id,
            chapter: new.chapter,
            verse: new.verse,
            text: new.text,
            topic: new.topic,
            reference: new.reference,
        };
        debug!(id = %highlight.id, topic = %highlight.topic, "Adding highlight");
        self.highlights.push(highlight.clone());
        self.persist();
        highlight
    }

    /// Remove by id. Returns whether anything matched; a missing id is not
    /// an error.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.highlights.len();
        self.highlights.retain(|h| h.id != id);
        let removed = self.highlights.len() != before;
        if !removed {
            debug!(%id, "No highlight to remove");
        }
        self.persist();
        removed
    }

    pub fn all(&self) -> &[Highlight] {
        &self.highlights
    }

    pub fn len(&self) -> usize {
        self.highlights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.highlights.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Highlight> {
        self.highlights.iter().find(|h| h.id == id)
    }

    pub fn for_chapter<'a>(
        &'a self,
        book_id: &'a str,
        chapter: u32,
    ) -> impl Iterator<Item = &'a Highlight> + 'a {
        self.highlights
            .iter()
            .filter(move |h| h.book_id == book_id && h.chapter == chapter)
    }

    pub fn is_highlighted(&self, book_id: &str, chapter: u32, verse: u32) -> bool {
        self.for_chapter(book_id, chapter).any(|h| h.verse == verse)
    }

    /// Partition by topic, topics ordered by first appearance.
    pub fn grouped_by_topic(&self) -> Vec<TopicGroup<'_>> {
        let mut groups: Vec<TopicGroup<'_>> = Vec::new();
        for highlight in &self.highlights {
            match groups.iter_mut().find(|g| g.topic == highlight.topic) {
                Some(group) => group.highlights.push(highlight),
                None => groups.push(TopicGroup {
                    topic: &highlight.topic,
                    highlights: vec![highlight],
                }),
            }
        }
        groups
    }

    fn persist(&self) {
        if let Err(e) = write_json(self.store.as_ref(), HIGHLIGHTS_KEY, &self.highlights) {
            warn!("Failed to save highlights: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn new_highlight(verse: u32, topic: &str) -> NewHighlight {
        NewHighlight {
            book_id: "Gen".to_string(),
            chapter: 1,
            verse,
            text: format!("verse {verse}"),
            topic: topic.to_string(),
            reference: format!("Genesis 1:{verse}"),
        }
    }

    #[test]
    fn test_add_then_remove_restores_collection() {
        let store = Arc::new(MemoryStore::new());
        let mut highlights = HighlightStore::load(store);
        highlights.add(new_highlight(1, "Creation"));
        let before = highlights.all().to_vec();

        let added = highlights.add(new_highlight(2, "Light"));
        assert_eq!(highlights.len(), 2);
        assert_eq!(highlights.get(&added.id), Some(&added));
        assert!(highlights.remove(&added.id));
        assert_eq!(highlights.all(), before.as_slice());
    }

    #[test]
    fn test_ids_are_unique() {
        let mut highlights = HighlightStore::load(Arc::new(MemoryStore::new()));
        let a = highlights.add(new_highlight(1, "A"));
        let b = highlights.add(new_highlight(1, "A"));
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_remove_unknown_id_is_noop() {
        let mut highlights = HighlightStore::load(Arc::new(MemoryStore::new()));
        highlights.add(new_highlight(1, "A"));
        assert!(!highlights.remove("no-such-id"));
        assert_eq!(highlights.len(), 1);
    }

    #[test]
    fn test_mutations_persist_and_reload_in_order() {
        let store = Arc::new(MemoryStore::new());
        let mut highlights = HighlightStore::load(store.clone());
        let first = highlights.add(new_highlight(3, "Faith"));
        let second = highlights.add(new_highlight(1, "Hope"));

        let reloaded = HighlightStore::load(store);
        let ids: Vec<_> = reloaded.all().iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec![first.id.as_str(), second.id.as_str()]);
    }

    #[test]
    fn test_persisted_format_is_camel_case() {
        let store = Arc::new(MemoryStore::new());
        let mut highlights = HighlightStore::load(store.clone());
        highlights.add(new_highlight(1, "A"));
        let raw = store.get(HIGHLIGHTS_KEY).unwrap().unwrap();
        assert!(raw.contains("\"bookId\":\"Gen\""));
    }

    #[test]
    fn test_malformed_collection_loads_empty() {
        let store = Arc::new(MemoryStore::new());
        store.set(HIGHLIGHTS_KEY, "{\"oops\":1}").unwrap();
        assert!(HighlightStore::load(store).is_empty());
    }

    #[test]
    fn test_grouping_follows_first_seen_topic() {
        let mut highlights = HighlightStore::load(Arc::new(MemoryStore::new()));
        highlights.add(new_highlight(1, "Light"));
        highlights.add(new_highlight(2, "Creation"));
        highlights.add(new_highlight(3, "Light"));

        let groups = highlights.grouped_by_topic();
        let topics: Vec<_> = groups.iter().map(|g| g.topic).collect();
        assert_eq!(topics, vec!["Light", "Creation"]);
        let light_verses: Vec<_> = groups[0].highlights.iter().map(|h| h.verse).collect();
        assert_eq!(light_verses, vec![1, 3]);
    }

    #[test]
    fn test_for_verse_uses_catalog_id_and_display_reference() {
        let book = crate::catalog::find_book("Gen").unwrap();
        let verse = Verse {
            book_id: "GEN".to_string(),
            book_name: "Genesis".to_string(),
            chapter: 1,
            verse: 3,
            text: "And God said, Let there be light".to_string(),
        };
        let new = NewHighlight::for_verse(book, &verse, "  Light ").unwrap();
        assert_eq!(new.book_id, "Gen");
        assert_eq!(new.topic, "Light");
        assert_eq!(new.reference, "Genesis 1:3");
        assert!(NewHighlight::for_verse(book, &verse, "   ").is_none());
    }

    #[test]
    fn test_chapter_queries() {
        let mut highlights = HighlightStore::load(Arc::new(MemoryStore::new()));
        highlights.add(new_highlight(4, "A"));
        assert!(highlights.is_highlighted("Gen", 1, 4));
        assert!(!highlights.is_highlighted("Gen", 1, 5));
        assert!(!highlights.is_highlighted("Exod", 1, 4));
        assert_eq!(highlights.for_chapter("Gen", 1).count(), 1);
    }
}
