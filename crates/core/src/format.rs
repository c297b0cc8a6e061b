//! Markdown layout for generated notes.
//!
//! Each note is a level-one heading naming the slide, a blank line, then the
//! generated body. A full-deck export joins notes with a horizontal rule.

use crate::types::Note;

/// Prefix marking a note whose generation failed.
pub const FAILURE_MARKER: &str = "> Generation failed:";

/// Message used when a failure carries no text.
const UNKNOWN_FAILURE: &str = "unknown error";

/// Formatter for note documents.
#[derive(Debug, Clone)]
pub struct NoteFormatter {
    /// Separator placed between notes in an exported document.
    separator: String,
}

impl Default for NoteFormatter {
    fn default() -> Self {
        Self {
            separator: "\n\n---\n\n".to_string(),
        }
    }
}

impl NoteFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a custom separator between exported notes.
    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    /// Heading line for a slide.
    pub fn heading(&self, index: u32, title: &str) -> String {
        format!("# Slide {}: {}", index, title.trim())
    }

    /// Compose a display document from heading and body.
    ///
    /// # Example output
    /// ```text
    /// # Slide 2: Photosynthesis
    ///
    /// Plants convert light into chemical energy...
    /// ```
    pub fn compose(&self, index: u32, title: &str, body: &str) -> String {
        format!("{}\n\n{}", self.heading(index, title), body)
    }

    /// Body used in place of generated text when a request failed.
    pub fn failure_body(&self, message: &str) -> String {
        let message = message.trim();
        let message = if message.is_empty() {
            UNKNOWN_FAILURE
        } else {
            message
        };
        format!("{} {}", FAILURE_MARKER, message)
    }

    /// Join notes into one markdown document, adding a trailing newline.
    pub fn document<'a>(&self, notes: impl IntoIterator<Item = &'a Note>) -> String {
        let parts: Vec<&str> = notes.into_iter().map(|n| n.markdown.trim_end()).collect();
        if parts.is_empty() {
            return String::new();
        }
        format!("{}\n", parts.join(&self.separator))
    }
}

/// Whether a note body carries the failure marker.
pub fn is_failure(markdown: &str) -> bool {
    markdown.contains(FAILURE_MARKER)
}
