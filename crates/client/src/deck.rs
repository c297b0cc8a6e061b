//! Tracks the active deck and its slide list.

use crate::backend::NotesBackend;
use deck_notes_core::{Deck, DeckFormat, Error, LoadedDeck, Result, Slide};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

/// Loads decks from the backend and remembers the current one.
pub struct DeckController {
    backend: Arc<dyn NotesBackend>,
    current: Mutex<Option<LoadedDeck>>,
}

impl DeckController {
    pub fn new(backend: Arc<dyn NotesBackend>) -> Self {
        Self {
            backend,
            current: Mutex::new(None),
        }
    }

    /// The deck loaded most recently, if any.
    pub fn current(&self) -> Option<LoadedDeck> {
        self.lock().clone()
    }

    /// Identifier of the current deck.
    pub fn current_id(&self) -> Option<String> {
        self.lock().as_ref().map(|d| d.id().to_string())
    }

    /// List the slides of `ppt_id` and make it the current deck.
    pub async fn load(&self, ppt_id: &str) -> Result<Vec<Slide>> {
        let ppt_id = ppt_id.trim();
        if ppt_id.is_empty() {
            return Err(Error::validation("a deck id is required"));
        }

        let slides = normalize_slides(self.backend.list_slides(ppt_id).await?);
        log::debug!("Deck {} has {} slides", ppt_id, slides.len());

        let mut current = self.lock();
        let deck = match current.take() {
            Some(prev) if prev.id() == ppt_id => Deck {
                slide_count: slides.len(),
                ..prev.deck
            },
            _ => Deck {
                ppt_id: ppt_id.to_string(),
                slide_count: slides.len(),
                filename: None,
            },
        };
        *current = Some(LoadedDeck::new(deck, slides.clone()));
        Ok(slides)
    }

    /// Validate and upload a local deck file, then load its slides.
    pub async fn upload_file(&self, path: &Path) -> Result<LoadedDeck> {
        let bytes = tokio::fs::read(path).await?;
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("deck.pptx")
            .to_string();
        check_uploadable(&filename, &bytes)?;

        log::info!("Uploading {} ({} bytes)", filename, bytes.len());
        let deck = self.backend.upload_file(&filename, bytes).await?;
        self.adopt(deck).await
    }

    /// Ask the backend to fetch a deck from `url`, then load its slides.
    pub async fn upload_url(&self, url: &str) -> Result<LoadedDeck> {
        let url = url.trim();
        if url.is_empty() {
            return Err(Error::validation("a URL is required"));
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(Error::validation("the URL must start with http:// or https://"));
        }

        log::info!("Uploading deck from {}", url);
        let deck = self.backend.upload_url(url).await?;
        self.adopt(deck).await
    }

    async fn adopt(&self, deck: Deck) -> Result<LoadedDeck> {
        let slides = normalize_slides(self.backend.list_slides(&deck.ppt_id).await?);
        if slides.len() != deck.slide_count {
            log::warn!(
                "Deck {} reported {} slides but lists {}",
                deck.ppt_id,
                deck.slide_count,
                slides.len()
            );
        }
        let loaded = LoadedDeck::new(deck, slides);
        *self.lock() = Some(loaded.clone());
        Ok(loaded)
    }

    fn lock(&self) -> MutexGuard<'_, Option<LoadedDeck>> {
        self.current.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Reject files the backend will not parse.
fn check_uploadable(filename: &str, bytes: &[u8]) -> Result<()> {
    let format = DeckFormat::from_magic(bytes).or_else(|| {
        Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .and_then(DeckFormat::from_extension)
    });

    match format {
        Some(f) if f.is_uploadable() => Ok(()),
        Some(_) => Err(Error::validation(
            "legacy .ppt files are not supported; save the deck as .pptx",
        )),
        None => Err(Error::validation("please choose a .pptx file")),
    }
}

/// Sort by index and drop duplicate indices, keeping the first.
fn normalize_slides(mut slides: Vec<Slide>) -> Vec<Slide> {
    slides.sort_by_key(|s| s.index);
    let before = slides.len();
    slides.dedup_by_key(|s| s.index);
    if slides.len() != before {
        log::warn!("Dropped {} slides with duplicate indices", before - slides.len());
    }
    slides
}
