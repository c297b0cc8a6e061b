//! The operations the generation layer needs from the notes backend.

use async_trait::async_trait;
use deck_notes_core::{Deck, ExpandedSlide, Result, SearchHit, Slide};

/// Deck-scoped backend operations.
///
/// [`crate::ApiClient`] is the HTTP implementation; tests substitute an
/// in-memory one.
#[async_trait]
pub trait NotesBackend: Send + Sync {
    /// Upload a deck file; returns the new deck.
    async fn upload_file(&self, filename: &str, bytes: Vec<u8>) -> Result<Deck>;

    /// Ask the backend to fetch and parse a deck from a URL.
    async fn upload_url(&self, url: &str) -> Result<Deck>;

    /// List the slides of a deck.
    async fn list_slides(&self, ppt_id: &str) -> Result<Vec<Slide>>;

    /// Generate expanded notes for one slide.
    async fn expand_slide(&self, ppt_id: &str, slide_index: u32) -> Result<ExpandedSlide>;

    /// Keyword search within a deck.
    async fn search(&self, ppt_id: &str, query: &str, top_k: usize) -> Result<Vec<SearchHit>>;
}
