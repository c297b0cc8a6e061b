//! Domain types for decks, slides, notes and search results.

use serde::{Deserialize, Serialize};

/// An authenticated user session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Bearer credential sent with every request.
    pub token: String,

    /// Display name of the logged-in user.
    pub username: String,
}

impl Session {
    pub fn new(token: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            username: username.into(),
        }
    }
}

/// An uploaded deck as returned by the upload endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deck {
    /// Opaque identifier assigned by the backend.
    pub ppt_id: String,

    /// Number of slides the backend parsed.
    #[serde(rename = "num_slides")]
    pub slide_count: usize,

    /// Original filename, when the backend reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

/// A single slide of a deck.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slide {
    /// 1-based slide number, unique within its deck.
    pub index: u32,

    /// Slide title (may be empty).
    #[serde(default)]
    pub title: String,

    /// Bullet points in reading order.
    #[serde(default)]
    pub bullets: Vec<String>,

    /// Speaker notes, if the deck had any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Slide {
    /// Create a slide with no bullets.
    pub fn new(index: u32, title: impl Into<String>) -> Self {
        Self {
            index,
            title: title.into(),
            bullets: Vec::new(),
            notes: None,
        }
    }

    /// Add a bullet point to this slide.
    pub fn with_bullet(mut self, bullet: impl Into<String>) -> Self {
        self.bullets.push(bullet.into());
        self
    }

    /// Short summary of the first few bullets, for listings.
    pub fn bullet_summary(&self, max: usize) -> String {
        let summary: Vec<&str> = self
            .bullets
            .iter()
            .map(|b| b.trim())
            .filter(|b| !b.is_empty())
            .take(max)
            .collect();
        summary.join(" / ")
    }
}

/// A deck together with the slides listed for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedDeck {
    pub deck: Deck,
    pub slides: Vec<Slide>,
}

impl LoadedDeck {
    pub fn new(deck: Deck, slides: Vec<Slide>) -> Self {
        Self { deck, slides }
    }

    /// Deck identifier.
    pub fn id(&self) -> &str {
        &self.deck.ppt_id
    }

    /// Whether the deck has a slide with this index.
    pub fn contains(&self, index: u32) -> bool {
        self.slides.iter().any(|s| s.index == index)
    }

    /// Look up a slide by index.
    pub fn slide(&self, index: u32) -> Option<&Slide> {
        self.slides.iter().find(|s| s.index == index)
    }

    /// Slides sorted ascending by index.
    pub fn slides_in_order(&self) -> Vec<&Slide> {
        let mut ordered: Vec<&Slide> = self.slides.iter().collect();
        ordered.sort_by_key(|s| s.index);
        ordered
    }
}

/// Generated notes for one slide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    /// Slide index this note belongs to.
    pub index: u32,

    /// Slide title used in the heading.
    pub title: String,

    /// Full display document: heading followed by the generated body.
    pub markdown: String,
}

/// Body of a successful expansion request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpandedSlide {
    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub expanded_markdown: String,
}

/// One ranked result of a keyword search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub slide_index: u32,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub snippet: String,

    /// Backend distance score; lower is closer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

/// Body of a successful login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    #[serde(default)]
    pub username: String,
}

/// The format of a deck file selected for upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeckFormat {
    /// Modern PPTX (Office Open XML).
    Pptx,
    /// Legacy PPT (OLE/CFB binary).
    Ppt,
}

impl DeckFormat {
    /// Detect format from file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "pptx" => Some(Self::Pptx),
            "ppt" => Some(Self::Ppt),
            _ => None,
        }
    }

    /// Detect format from file magic bytes.
    pub fn from_magic(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < 4 {
            return None;
        }

        // PPTX is a ZIP file (PK\x03\x04)
        if bytes.starts_with(&[0x50, 0x4B, 0x03, 0x04]) {
            return Some(Self::Pptx);
        }

        // PPT is an OLE/CFB file (D0 CF 11 E0 A1 B1 1A E1)
        if bytes.len() >= 8
            && bytes.starts_with(&[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1])
        {
            return Some(Self::Ppt);
        }

        None
    }

    /// Whether the backend accepts this format for upload.
    pub fn is_uploadable(self) -> bool {
        matches!(self, Self::Pptx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deck_deserializes_upload_response() {
        let deck: Deck =
            serde_json::from_str(r#"{"ppt_id":"abc123","filename":"intro.pptx","num_slides":12}"#)
                .unwrap();
        assert_eq!(deck.ppt_id, "abc123");
        assert_eq!(deck.slide_count, 12);
        assert_eq!(deck.filename.as_deref(), Some("intro.pptx"));
    }

    #[test]
    fn test_slide_tolerates_missing_fields() {
        let slide: Slide = serde_json::from_str(r#"{"index":3}"#).unwrap();
        assert_eq!(slide, Slide::new(3, ""));
    }

    #[test]
    fn test_bullet_summary_skips_blank_and_limits() {
        let slide = Slide::new(1, "Intro")
            .with_bullet("one")
            .with_bullet("  ")
            .with_bullet("two")
            .with_bullet("three")
            .with_bullet("four");
        assert_eq!(slide.bullet_summary(3), "one / two / three");
    }

    #[test]
    fn test_loaded_deck_orders_slides() {
        let deck = LoadedDeck::new(
            Deck {
                ppt_id: "d".into(),
                slide_count: 3,
                filename: None,
            },
            vec![Slide::new(3, "c"), Slide::new(1, "a"), Slide::new(2, "b")],
        );
        let order: Vec<u32> = deck.slides_in_order().iter().map(|s| s.index).collect();
        assert_eq!(order, vec![1, 2, 3]);
        assert!(deck.contains(2));
        assert!(!deck.contains(4));
        assert_eq!(deck.slide(3).map(|s| s.title.as_str()), Some("c"));
    }

    #[test]
    fn test_format_from_magic() {
        assert_eq!(DeckFormat::from_magic(b"PK\x03\x04rest"), Some(DeckFormat::Pptx));
        assert_eq!(
            DeckFormat::from_magic(&[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1]),
            Some(DeckFormat::Ppt)
        );
        assert_eq!(DeckFormat::from_magic(b"%PDF-1.7"), None);
        assert_eq!(DeckFormat::from_magic(b"PK"), None);
    }

    #[test]
    fn test_only_pptx_is_uploadable() {
        assert!(DeckFormat::from_extension("PPTX").unwrap().is_uploadable());
        assert!(!DeckFormat::Ppt.is_uploadable());
        assert_eq!(DeckFormat::from_extension("key"), None);
    }
}
