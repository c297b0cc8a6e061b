//! Core domain types, note store, progress projection and error taxonomy
//! for slide-deck note generation.

pub mod error;
pub mod format;
pub mod normalize;
pub mod notes;
pub mod progress;
pub mod types;

pub use error::{ApiError, Error, Result};
pub use format::{is_failure, NoteFormatter, FAILURE_MARKER};
pub use normalize::TextNormalizer;
pub use notes::NoteStore;
pub use progress::{GenerationEvent, OrchestrationState, Progress, ProgressReporter};
pub use types::{
    Deck, DeckFormat, ExpandedSlide, LoadedDeck, LoginResponse, Note, SearchHit, Session, Slide,
};
