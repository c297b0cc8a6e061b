//! In-memory backend for unit tests.

use crate::backend::NotesBackend;
use async_trait::async_trait;
use deck_notes_core::{ApiError, Deck, ExpandedSlide, Result, SearchHit, Slide};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub(crate) const DECK_ID: &str = "deck-1";

/// Backend whose answers are fixed up front.
#[derive(Default)]
pub(crate) struct ScriptedBackend {
    slides: Vec<Slide>,
    failures: HashMap<u32, String>,
    delays: HashMap<u32, Duration>,
    hanging: HashSet<u32>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    expand_order: Mutex<Vec<u32>>,
}

impl ScriptedBackend {
    pub(crate) fn with_slides(slides: &[(u32, &str)]) -> Self {
        Self {
            slides: slides
                .iter()
                .map(|(idx, title)| Slide::new(*idx, *title).with_bullet(format!("point {}", idx)))
                .collect(),
            ..Self::default()
        }
    }

    /// A deck of `n` slides titled "Slide 1".."Slide n".
    pub(crate) fn with_deck_of(n: u32) -> Self {
        let titles: Vec<String> = (1..=n).map(|i| format!("Slide {}", i)).collect();
        let pairs: Vec<(u32, &str)> = titles
            .iter()
            .enumerate()
            .map(|(i, t)| (i as u32 + 1, t.as_str()))
            .collect();
        Self::with_slides(&pairs)
    }

    /// Expansion of `index` fails with `{"detail": detail}`.
    pub(crate) fn failing(mut self, index: u32, detail: &str) -> Self {
        self.failures.insert(index, detail.to_string());
        self
    }

    /// Expansion of `index` takes `delay`.
    pub(crate) fn delayed(mut self, index: u32, delay: Duration) -> Self {
        self.delays.insert(index, delay);
        self
    }

    /// Expansion of `index` never resolves.
    pub(crate) fn hanging(mut self, index: u32) -> Self {
        self.hanging.insert(index);
        self
    }

    /// Total backend calls of any kind.
    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Slide indices in the order expansion was requested.
    pub(crate) fn expand_order(&self) -> Vec<u32> {
        self.expand_order
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    /// Highest number of expansion requests outstanding at once.
    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn deck(&self, filename: &str) -> Deck {
        Deck {
            ppt_id: DECK_ID.to_string(),
            slide_count: self.slides.len(),
            filename: Some(filename.to_string()),
        }
    }
}

#[async_trait]
impl NotesBackend for ScriptedBackend {
    async fn upload_file(&self, filename: &str, _bytes: Vec<u8>) -> Result<Deck> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.deck(filename))
    }

    async fn upload_url(&self, url: &str) -> Result<Deck> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.deck(url))
    }

    async fn list_slides(&self, ppt_id: &str) -> Result<Vec<Slide>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if ppt_id != DECK_ID {
            return Err(ApiError::new(404, "ppt_id not found").into());
        }
        Ok(self.slides.clone())
    }

    async fn expand_slide(&self, ppt_id: &str, slide_index: u32) -> Result<ExpandedSlide> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.expand_order
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(slide_index);

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if self.hanging.contains(&slide_index) {
            std::future::pending::<()>().await;
        }
        if let Some(delay) = self.delays.get(&slide_index) {
            tokio::time::sleep(*delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if ppt_id != DECK_ID {
            return Err(ApiError::new(404, "ppt_id not found").into());
        }
        if let Some(detail) = self.failures.get(&slide_index) {
            let body = serde_json::json!({ "detail": detail }).to_string();
            return Err(ApiError::from_body(503, &body).into());
        }
        let slide = self
            .slides
            .iter()
            .find(|s| s.index == slide_index)
            .ok_or_else(|| ApiError::new(404, "slide_index not found"))?;

        Ok(ExpandedSlide {
            title: slide.title.clone(),
            expanded_markdown: format!("Expanded notes for slide {}", slide_index),
        })
    }

    async fn search(&self, ppt_id: &str, query: &str, top_k: usize) -> Result<Vec<SearchHit>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if ppt_id != DECK_ID {
            return Err(ApiError::new(404, "ppt_id not found").into());
        }
        let needle = query.to_lowercase();
        Ok(self
            .slides
            .iter()
            .filter(|s| {
                s.title.to_lowercase().contains(&needle)
                    || s.bullets.iter().any(|b| b.to_lowercase().contains(&needle))
            })
            .take(top_k)
            .map(|s| SearchHit {
                slide_index: s.index,
                title: s.title.clone(),
                snippet: format!("{}\n  {}", s.title, s.bullets.join("\n")),
                score: Some(0.5),
            })
            .collect())
    }
}
