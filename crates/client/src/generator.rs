//! Note generation for a whole deck or a single slide.
//!
//! # State progression
//! `Idle → Running → Completed → Idle` for a full-deck run, or
//! `Running → Idle` when the run is cancelled.
//!
//! Full-deck runs request slides one at a time in ascending index order. A
//! failed slide gets a failure-marked note and the run moves on. Full-deck
//! and single-slide generation share one single-flight lock, so a request
//! issued while another is active waits for it to finish instead of
//! interleaving writes to the note store.

use crate::backend::NotesBackend;
use deck_notes_core::{
    Error, ExpandedSlide, GenerationEvent, LoadedDeck, Note, NoteFormatter, NoteStore,
    OrchestrationState, Result,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

/// Buffered events per subscriber before the slowest one starts lagging.
const EVENT_CAPACITY: usize = 256;

/// Summary of one full-deck run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchOutcome {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub cancelled: bool,
}

impl BatchOutcome {
    /// Slides that received a note, generated or failure-marked.
    pub fn processed(&self) -> usize {
        self.succeeded + self.failed
    }
}

/// Result of generating one slide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlideOutcome {
    /// The note that was written.
    pub note: Note,

    /// Failure message when the note is a failure placeholder.
    pub error: Option<String>,
}

impl SlideOutcome {
    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}

/// Drives expansion requests and owns the note store.
pub struct Generator {
    backend: Arc<dyn NotesBackend>,
    notes: Mutex<NoteStore>,
    state: Mutex<OrchestrationState>,
    events: broadcast::Sender<GenerationEvent>,
    flight: tokio::sync::Mutex<()>,
    /// Bumped by every full-deck run; a run only returns the state to idle
    /// if no newer run has started.
    run_epoch: AtomicU64,
    /// Bumped when the note store is reset for a new deck; results from an
    /// older generation are discarded.
    deck_generation: AtomicU64,
    formatter: NoteFormatter,
    idle_reset_delay: Duration,
}

impl Generator {
    pub fn new(backend: Arc<dyn NotesBackend>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            backend,
            notes: Mutex::new(NoteStore::new()),
            state: Mutex::new(OrchestrationState::Idle),
            events,
            flight: tokio::sync::Mutex::new(()),
            run_epoch: AtomicU64::new(0),
            deck_generation: AtomicU64::new(0),
            formatter: NoteFormatter::new(),
            idle_reset_delay: Duration::ZERO,
        }
    }

    /// How long a finished run stays `Completed` before going idle.
    pub fn with_idle_reset_delay(mut self, delay: Duration) -> Self {
        self.idle_reset_delay = delay;
        self
    }

    /// Format notes and failure placeholders with `formatter`.
    ///
    /// Replaces the note store, so call it before generating anything.
    pub fn with_formatter(mut self, formatter: NoteFormatter) -> Self {
        self.notes = Mutex::new(NoteStore::new().with_formatter(formatter.clone()));
        self.formatter = formatter;
        self
    }

    /// Receive every event emitted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<GenerationEvent> {
        self.events.subscribe()
    }

    /// Current orchestration state.
    pub fn state(&self) -> OrchestrationState {
        lock(&self.state).clone()
    }

    /// Notes in ascending index order.
    pub fn notes(&self) -> Vec<Note> {
        lock(&self.notes).get_ordered()
    }

    /// Run `f` with read access to the note store.
    pub fn with_notes<T>(&self, f: impl FnOnce(&NoteStore) -> T) -> T {
        f(&lock(&self.notes))
    }

    /// Move the note selection; no-op for indices without a note.
    pub fn select(&self, index: u32) -> bool {
        lock(&self.notes).select(index)
    }

    /// All notes as one markdown document.
    pub fn to_markdown(&self) -> String {
        lock(&self.notes).to_markdown()
    }

    /// Clear notes because a different deck became current.
    ///
    /// Requests already in flight for the previous deck will not write.
    pub fn reset(&self) {
        self.deck_generation.fetch_add(1, Ordering::SeqCst);
        lock(&self.notes).reset();
    }

    /// Generate notes for every slide of `deck`, in ascending index order.
    ///
    /// Per-slide failures become failure-marked notes and never stop the
    /// run. Cancelling `cancel` stops before the next request, or abandons
    /// the one in flight; no further notes are written. A run still waiting
    /// for the lock when [`reset`](Self::reset) is called ends as cancelled.
    pub async fn run_all(&self, deck: &LoadedDeck, cancel: &CancellationToken) -> BatchOutcome {
        let slides = deck.slides_in_order();
        let total = slides.len();
        let mut outcome = BatchOutcome {
            total,
            ..BatchOutcome::default()
        };
        let generation = self.deck_generation.load(Ordering::SeqCst);

        let flight = self.flight.lock().await;
        if cancel.is_cancelled() {
            outcome.cancelled = true;
            return outcome;
        }
        if self.deck_generation.load(Ordering::SeqCst) != generation {
            log::debug!("Dropping queued run for replaced deck {}", deck.id());
            outcome.cancelled = true;
            return outcome;
        }

        let epoch = self.run_epoch.fetch_add(1, Ordering::SeqCst) + 1;
        lock(&self.notes).reset();
        self.set_state(OrchestrationState::Running {
            completed: 0,
            total,
            current_label: String::new(),
        });
        self.emit(GenerationEvent::BatchStarted { total });
        log::info!("Generating notes for {} slides of deck {}", total, deck.id());

        for (position, slide) in slides.into_iter().enumerate() {
            if cancel.is_cancelled() {
                outcome.cancelled = true;
                break;
            }

            self.set_state(OrchestrationState::Running {
                completed: position,
                total,
                current_label: slide_label(slide.index, &slide.title),
            });
            self.emit(GenerationEvent::SlideStarted {
                position,
                total,
                index: slide.index,
                title: slide.title.clone(),
            });

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                r = self.backend.expand_slide(deck.id(), slide.index) => Some(r),
            };
            let Some(result) = result else {
                outcome.cancelled = true;
                break;
            };

            match self.record(generation, slide.index, &slide.title, result) {
                Some(written) if written.is_failure() => outcome.failed += 1,
                Some(_) => outcome.succeeded += 1,
                None => {
                    outcome.cancelled = true;
                    break;
                }
            }
        }

        if outcome.cancelled {
            log::info!(
                "Generation for deck {} cancelled after {} of {} slides",
                deck.id(),
                outcome.processed(),
                total
            );
            self.set_state(OrchestrationState::Idle);
            self.emit(GenerationEvent::BatchCancelled {
                completed: outcome.processed(),
                total,
            });
            return outcome;
        }

        self.set_state(OrchestrationState::Completed);
        self.emit(GenerationEvent::BatchCompleted {
            total,
            failed: outcome.failed,
        });
        log::info!(
            "Generated {} notes for deck {} ({} failed)",
            total,
            deck.id(),
            outcome.failed
        );
        drop(flight);

        if !self.idle_reset_delay.is_zero() {
            tokio::time::sleep(self.idle_reset_delay).await;
        }
        self.return_to_idle(epoch);
        outcome
    }

    /// Generate notes for one slide of `deck`.
    ///
    /// Waits for any active generation to finish first. A backend failure
    /// is written as a failure-marked note and reported in the outcome; only
    /// client-side validation problems return an error.
    pub async fn run_one(&self, deck: &LoadedDeck, index: u32) -> Result<SlideOutcome> {
        let slide = deck.slide(index).ok_or_else(|| {
            Error::validation(format!("deck {} has no slide {}", deck.id(), index))
        })?;
        let generation = self.deck_generation.load(Ordering::SeqCst);

        let _flight = self.flight.lock().await;
        if self.deck_generation.load(Ordering::SeqCst) != generation {
            return Err(Error::validation("the deck was replaced before generation started"));
        }

        self.emit(GenerationEvent::SingleStarted { index });
        log::debug!("Generating notes for slide {} of deck {}", index, deck.id());
        let result = self.backend.expand_slide(deck.id(), index).await;

        let written = self.record(generation, index, &slide.title, result);
        let error = written.as_ref().and_then(|w| w.error.clone());
        self.emit(GenerationEvent::SingleFinished { index, error });

        written.ok_or_else(|| Error::validation("the deck was replaced during generation"))
    }

    /// Write the note for one request. Returns `None` when the deck changed
    /// while the request was in flight and the result was dropped.
    fn record(
        &self,
        generation: u64,
        index: u32,
        fallback_title: &str,
        result: Result<ExpandedSlide>,
    ) -> Option<SlideOutcome> {
        let mut notes = lock(&self.notes);
        if self.deck_generation.load(Ordering::SeqCst) != generation {
            log::debug!("Dropping result for slide {} from a replaced deck", index);
            return None;
        }

        let (note, error) = match result {
            Ok(expanded) => {
                let title = if expanded.title.trim().is_empty() {
                    fallback_title
                } else {
                    expanded.title.as_str()
                };
                let note = notes.set_note(index, title, &expanded.expanded_markdown).clone();
                (note, None)
            }
            Err(e) => {
                let message = e.message();
                log::warn!("Generation failed for slide {}: {}", index, message);
                let body = self.formatter.failure_body(&message);
                let note = notes.set_note(index, fallback_title, &body).clone();
                (note, Some(message))
            }
        };
        drop(notes);

        self.emit(GenerationEvent::NoteWritten {
            index,
            failed: error.is_some(),
        });
        Some(SlideOutcome { note, error })
    }

    fn return_to_idle(&self, epoch: u64) {
        if self.run_epoch.load(Ordering::SeqCst) != epoch {
            return;
        }
        let mut state = lock(&self.state);
        if *state == OrchestrationState::Completed {
            *state = OrchestrationState::Idle;
            drop(state);
            self.emit(GenerationEvent::Idle);
        }
    }

    fn set_state(&self, state: OrchestrationState) {
        *lock(&self.state) = state;
    }

    fn emit(&self, event: GenerationEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}

fn slide_label(index: u32, title: &str) -> String {
    if title.trim().is_empty() {
        format!("Slide {}", index)
    } else {
        format!("Slide {}: {}", index, title.trim())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
