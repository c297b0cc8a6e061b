//! Network-facing half of deck-notes: the HTTP client, session persistence,
//! configuration, and the generation orchestration built on top of them.

pub mod api;
pub mod backend;
pub mod config;
pub mod deck;
pub mod generator;
pub mod search;
pub mod session;
pub mod workspace;

#[cfg(test)]
mod testing;

pub use api::{ApiClient, RequestOptions, ResponseBody};
pub use backend::NotesBackend;
pub use config::ClientConfig;
pub use deck::DeckController;
pub use generator::{BatchOutcome, Generator, SlideOutcome};
pub use session::SessionStore;
pub use workspace::Workspace;
