//! Static reference tables: books, translations, downloadable resources,
//! and the font and highlight palettes offered by the settings panel.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Book {
    pub id: &'static str,
    pub name: &'static str,
    pub chapters: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Translation {
    pub id: &'static str,
    pub name: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Translation,
    Commentary,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Translation => "translation",
            ResourceKind::Commentary => "commentary",
        }
    }
}

/// A package that can be made available offline. Translation resources share
/// their id with the matching [`Translation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OfflineResource {
    pub id: &'static str,
    pub name: &'static str,
    pub kind: ResourceKind,
    pub size: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FontOption {
    pub value: &'static str,
    pub label: &'static str,
}

/// Resource id of the offline commentary package.
pub const JFB_COMMENTARY_ID: &str = "jfb";

pub const TRANSLATIONS: &[Translation] = &[
    Translation {
        id: "kjv",
        name: "King James Version",
    },
    Translation {
        id: "web",
        name: "World English Bible",
    },
    Translation {
        id: "bbe",
        name: "Bible in Basic English",
    },
];

pub const FONT_OPTIONS: &[FontOption] = &[
    FontOption {
        value: "'Inter', sans-serif",
        label: "Inter",
    },
    FontOption {
        value: "'Georgia', serif",
        label: "Georgia",
    },
    FontOption {
        value: "'Lato', sans-serif",
        label: "Lato",
    },
    FontOption {
        value: "'Roboto Slab', serif",
        label: "Roboto Slab",
    },
];

pub const HIGHLIGHT_COLORS: &[&str] = &[
    "#fef9c3", // yellow
    "#dbeafe", // blue
    "#dcfce7", // green
    "#fee2e2", // red
    "#f3e8ff", // purple
];

pub const OFFLINE_RESOURCES: &[OfflineResource] = &[
    OfflineResource {
        id: "kjv",
        name: "King James Version",
        kind: ResourceKind::Translation,
        size: "4.2 MB",
    },
    OfflineResource {
        id: "web",
        name: "World English Bible",
        kind: ResourceKind::Translation,
        size: "4.5 MB",
    },
    OfflineResource {
        id: JFB_COMMENTARY_ID,
        name: "JFB Commentary",
        kind: ResourceKind::Commentary,
        size: "10.1 MB",
    },
];

pub const BIBLE_BOOKS: &[Book] = &[
    Book {
        id: "Gen",
        name: "Genesis",
        chapters: 50,
    },
    Book {
        id: "Exod",
        name: "Exodus",
        chapters: 40,
    },
    Book {
        id: "Lev",
        name: "Leviticus",
        chapters: 27,
    },
    Book {
        id: "Num",
        name: "Numbers",
        chapters: 36,
    },
    Book {
        id: "Deut",
        name: "Deuteronomy",
        chapters: 34,
    },
    Book {
        id: "Josh",
        name: "Joshua",
        chapters: 24,
    },
    Book {
        id: "Judg",
        name: "Judges",
        chapters: 21,
    },
    Book {
        id: "Ruth",
        name: "Ruth",
        chapters: 4,
    },
    Book {
        id: "1Sam",
        name: "1 Samuel",
        chapters: 31,
    },
    Book {
        id: "2Sam",
        name: "2 Samuel",
        chapters: 24,
    },
    Book {
        id: "1Kgs",
        name: "1 Kings",
        chapters: 22,
    },
    Book {
        id: "2Kgs",
        name: "2 Kings",
        chapters: 25,
    },
    Book {
        id: "1Chr",
        name: "1 Chronicles",
        chapters: 29,
    },
    Book {
        id: "2Chr",
        name: "2 Chronicles",
        chapters: 36,
    },
    Book {
        id: "Ezra",
        name: "Ezra",
        chapters: 10,
    },
    Book {
        id: "Neh",
        name: "Nehemiah",
        chapters: 13,
    },
    Book {
        id: "Esth",
        name: "Esther",
        chapters: 10,
    },
    Book {
        id: "Job",
        name: "Job",
        chapters: 42,
    },
    Book {
        id: "Ps",
        name: "Psalms",
        chapters: 150,
    },
    Book {
        id: "Prov",
        name: "Proverbs",
        chapters: 31,
    },
    Book {
        id: "Eccl",
        name: "Ecclesiastes",
        chapters: 12,
    },
    Book {
        id: "Song",
        name: "Song of Solomon",
        chapters: 8,
    },
    Book {
        id: "Isa",
        name: "Isaiah",
        chapters: 66,
    },
    Book {
        id: "Jer",
        name: "Jeremiah",
        chapters: 52,
    },
    Book {
        id: "Lam",
        name: "Lamentations",
        chapters: 5,
    },
    Book {
        id: "Ezek",
        name: "Ezekiel",
        chapters: 48,
    },
    Book {
        id: "Dan",
        name: "Daniel",
        chapters: 12,
    },
    Book {
        id: "Hos",
        name: "Hosea",
        chapters: 14,
    },
    Book {
        id: "Joel",
        name: "Joel",
        chapters: 3,
    },
    Book {
        id: "Amos",
        name: "Amos",
        chapters: 9,
    },
    Book {
        id: "Obad",
        name: "Obadiah",
        chapters: 1,
    },
    Book {
        id: "Jonah",
        name: "Jonah",
        chapters: 4,
    },
    Book {
        id: "Mic",
        name: "Micah",
        chapters: 7,
    },
    Book {
        id: "Nah",
        name: "Nahum",
        chapters: 3,
    },
    Book {
        id: "Hab",
        name: "Habakkuk",
        chapters: 3,
    },
    Book {
        id: "Zeph",
        name: "Zephaniah",
        chapters: 3,
    },
    Book {
        id: "Hag",
        name: "Haggai",
        chapters: 2,
    },
    Book {
        id: "Zech",
        name: "Zechariah",
        chapters: 14,
    },
    Book {
        id: "Mal",
        name: "Malachi",
        chapters: 4,
    },
    Book {
        id: "Matt",
        name: "Matthew",
        chapters: 28,
    },
    Book {
        id: "Mark",
        name: "Mark",
        chapters: 16,
    },
    Book {
        id: "Luke",
        name: "Luke",
        chapters: 24,
    },
    Book {
        id: "John",
        name: "John",
        chapters: 21,
    },
    Book {
        id: "Acts",
        name: "Acts",
        chapters: 28,
    },
    Book {
        id: "Rom",
        name: "Romans",
        chapters: 16,
    },
    Book {
        id: "1Cor",
        name: "1 Corinthians",
        chapters: 16,
    },
    Book {
        id: "2Cor",
        name: "2 Corinthians",
        chapters: 13,
    },
    Book {
        id: "Gal",
        name: "Galatians",
        chapters: 6,
    },
    Book {
        id: "Eph",
        name: "Ephesians",
        chapters: 6,
    },
    Book {
        id: "Phil",
        name: "Philippians",
        chapters: 4,
    },
    Book {
        id: "Col",
        name: "Colossians",
        chapters: 4,
    },
    Book {
        id: "1Thess",
        name: "1 Thessalonians",
        chapters: 5,
    },
    Book {
        id: "2Thess",
        name: "2 Thessalonians",
        chapters: 3,
    },
    Book {
        id: "1Tim",
        name: "1 Timothy",
        chapters: 6,
    },
    Book {
        id: "2Tim",
        name: "2 Timothy",
        chapters: 4,
    },
    Book {
        id: "Titus",
        name: "Titus",
        chapters: 3,
    },
    Book {
        id: "Phlm",
        name: "Philemon",
        chapters: 1,
    },
    Book {
        id: "Heb",
        name: "Hebrews",
        chapters: 13,
    },
    Book {
        id: "Jas",
        name: "James",
        chapters: 5,
    },
    Book {
        id: "1Pet",
        name: "1 Peter",
        chapters: 5,
    },
    Book {
        id: "2Pet",
        name: "2 Peter",
        chapters: 3,
    },
    Book {
        id: "1John",
        name: "1 John",
        chapters: 5,
    },
    Book {
        id: "2John",
        name: "2 John",
        chapters: 1,
    },
    Book {
        id: "3John",
        name: "3 John",
        chapters: 1,
    },
    Book {
        id: "Jude",
        name: "Jude",
        chapters: 1,
    },
    Book {
        id: "Rev",
        name: "Revelation",
        chapters: 22,
    },
];

/// Case-insensitive, so ids echoed back by the chapter service ("GEN")
/// resolve too.
pub fn find_book(id: &str) -> Option<&'static Book> {
    BIBLE_BOOKS.iter().find(|b| b.id.eq_ignore_ascii_case(id))
}

pub fn find_translation(id: &str) -> Option<&'static Translation> {
    TRANSLATIONS.iter().find(|t| t.id == id)
}

pub fn find_resource(id: &str) -> Option<&'static OfflineResource> {
    OFFLINE_RESOURCES.iter().find(|r| r.id == id)
}

impl Book {
    /// Chapter numbers offered for this book: exactly `1..=chapters`.
    pub fn chapter_options(&self) -> Vec<u32> {
        (1..=self.chapters).collect()
    }

    pub fn has_chapter(&self, chapter: u32) -> bool {
        (1..=self.chapters).contains(&chapter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_has_full_canon() {
        assert_eq!(BIBLE_BOOKS.len(), 66);
        assert_eq!(BIBLE_BOOKS[0].id, "Gen");
        assert_eq!(BIBLE_BOOKS[65].id, "Rev");
    }

    #[test]
    fn test_chapter_options_match_chapter_count() {
        for book in BIBLE_BOOKS {
            let options = book.chapter_options();
            assert_eq!(options.len() as u32, book.chapters);
            assert_eq!(options.first(), Some(&1));
            assert_eq!(options.last(), Some(&book.chapters));
            assert!(!book.has_chapter(book.chapters + 1));
            assert!(!book.has_chapter(0));
        }
    }

    #[test]
    fn test_lookup_by_id() {
        assert_eq!(find_book("Ps").map(|b| b.chapters), Some(150));
        assert_eq!(find_translation("web").map(|t| t.name), Some("World English Bible"));
        assert_eq!(find_resource("jfb").map(|r| r.kind.as_str()), Some("commentary"));
        assert_eq!(ResourceKind::Translation.as_str(), "translation");
        assert_eq!(find_book("GEN").map(|b| b.id), Some("Gen"));
        assert!(find_book("Tob").is_none());
    }
}
