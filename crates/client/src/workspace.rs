//! One user's working set: the current deck, its notes, and the generation
//! activity over them.

use crate::backend::NotesBackend;
use crate::config::ClientConfig;
use crate::deck::DeckController;
use crate::generator::{BatchOutcome, Generator, SlideOutcome};
use crate::search;
use deck_notes_core::{
    Error, GenerationEvent, LoadedDeck, Note, OrchestrationState, Result, SearchHit, Slide,
};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

/// Ties the deck controller, generator and search together.
///
/// Loading a different deck cancels any running full-deck generation and
/// clears all notes, since slide indices only mean something within their
/// own deck.
pub struct Workspace {
    backend: Arc<dyn NotesBackend>,
    decks: DeckController,
    generator: Generator,
    batch_token: Mutex<CancellationToken>,
    search_top_k: usize,
}

impl Workspace {
    pub fn new(backend: Arc<dyn NotesBackend>, config: &ClientConfig) -> Self {
        Self {
            decks: DeckController::new(backend.clone()),
            generator: Generator::new(backend.clone())
                .with_idle_reset_delay(config.idle_reset_delay),
            backend,
            batch_token: Mutex::new(CancellationToken::new()),
            search_top_k: config.search_top_k,
        }
    }

    /// Upload a local deck file and make it current.
    pub async fn upload_file(&self, path: &Path) -> Result<LoadedDeck> {
        let loaded = self.decks.upload_file(path).await?;
        self.replace_deck();
        Ok(loaded)
    }

    /// Upload a deck by URL and make it current.
    pub async fn upload_url(&self, url: &str) -> Result<LoadedDeck> {
        let loaded = self.decks.upload_url(url).await?;
        self.replace_deck();
        Ok(loaded)
    }

    /// Open an already-uploaded deck by id.
    pub async fn open(&self, ppt_id: &str) -> Result<Vec<Slide>> {
        let changed = self.decks.current_id().as_deref() != Some(ppt_id.trim());
        let slides = self.decks.load(ppt_id).await?;
        if changed {
            self.replace_deck();
        }
        Ok(slides)
    }

    /// The current deck.
    pub fn deck(&self) -> Option<LoadedDeck> {
        self.decks.current()
    }

    /// Generate notes for every slide of the current deck.
    pub async fn generate_all(&self) -> Result<BatchOutcome> {
        let deck = self.require_deck()?;
        let token = {
            let mut token = self.lock_token();
            if token.is_cancelled() {
                *token = CancellationToken::new();
            }
            token.clone()
        };
        Ok(self.generator.run_all(&deck, &token).await)
    }

    /// Generate notes for one slide of the current deck.
    pub async fn generate_one(&self, index: u32) -> Result<SlideOutcome> {
        let deck = self.require_deck()?;
        self.generator.run_one(&deck, index).await
    }

    /// Search the current deck. `top_k` defaults to the configured value.
    pub async fn search(&self, query: &str, top_k: Option<usize>) -> Result<Vec<SearchHit>> {
        let deck_id = self.decks.current_id();
        search::search(
            self.backend.as_ref(),
            deck_id.as_deref(),
            query,
            top_k.unwrap_or(self.search_top_k),
        )
        .await
    }

    /// Search, then generate notes for the best hit.
    pub async fn search_and_generate(&self, query: &str) -> Result<Option<SlideOutcome>> {
        let hits = self.search(query, None).await?;
        match hits.first() {
            Some(hit) => self.generate_one(hit.slide_index).await.map(Some),
            None => Ok(None),
        }
    }

    /// Token that cancels the running full-deck generation, or the next one
    /// to start.
    pub fn batch_token(&self) -> CancellationToken {
        self.lock_token().clone()
    }

    /// Stop any running full-deck generation.
    pub fn cancel(&self) {
        self.lock_token().cancel();
    }

    pub fn subscribe(&self) -> broadcast::Receiver<GenerationEvent> {
        self.generator.subscribe()
    }

    pub fn state(&self) -> OrchestrationState {
        self.generator.state()
    }

    pub fn notes(&self) -> Vec<Note> {
        self.generator.notes()
    }

    pub fn select(&self, index: u32) -> bool {
        self.generator.select(index)
    }

    pub fn selected_note(&self) -> Option<Note> {
        self.generator
            .with_notes(|store| store.selected_note().cloned())
    }

    pub fn to_markdown(&self) -> String {
        self.generator.to_markdown()
    }

    fn replace_deck(&self) {
        {
            let mut token = self.lock_token();
            token.cancel();
            *token = CancellationToken::new();
        }
        self.generator.reset();
    }

    fn require_deck(&self) -> Result<LoadedDeck> {
        self.decks
            .current()
            .ok_or_else(|| Error::validation("upload or open a deck first"))
    }

    fn lock_token(&self) -> MutexGuard<'_, CancellationToken> {
        self.batch_token
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
