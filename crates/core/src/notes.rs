//! Ordered, index-keyed store of generated notes.

use crate::format::NoteFormatter;
use crate::types::Note;
use std::collections::BTreeMap;

/// Generated notes for the current deck, keyed by slide index.
///
/// Iteration is always ascending by index regardless of write order, and a
/// second write for the same index replaces the first.
#[derive(Debug, Clone, Default)]
pub struct NoteStore {
    notes: BTreeMap<u32, Note>,
    selected: Option<u32>,
    formatter: NoteFormatter,
}

impl NoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a custom formatter for composed documents.
    pub fn with_formatter(mut self, formatter: NoteFormatter) -> Self {
        self.formatter = formatter;
        self
    }

    /// Store a note for `index`, replacing any previous one.
    ///
    /// The first note written while nothing is selected becomes the selection.
    pub fn set_note(&mut self, index: u32, title: &str, body: &str) -> &Note {
        let markdown = self.formatter.compose(index, title, body);
        if self.selected.is_none() {
            self.selected = Some(index);
        }
        self.notes.insert(
            index,
            Note {
                index,
                title: title.to_string(),
                markdown,
            },
        );
        &self.notes[&index]
    }

    /// Notes sorted ascending by index.
    pub fn get_ordered(&self) -> Vec<Note> {
        self.notes.values().cloned().collect()
    }

    /// Look up the note for one slide.
    pub fn get(&self, index: u32) -> Option<&Note> {
        self.notes.get(&index)
    }

    /// Move the selection to `index`. Returns false (and changes nothing)
    /// when no note exists for it.
    pub fn select(&mut self, index: u32) -> bool {
        if !self.notes.contains_key(&index) {
            return false;
        }
        self.selected = Some(index);
        true
    }

    /// Currently selected slide index.
    pub fn selected(&self) -> Option<u32> {
        self.selected
    }

    /// The selected note, if any.
    pub fn selected_note(&self) -> Option<&Note> {
        self.selected.and_then(|idx| self.notes.get(&idx))
    }

    /// Drop all notes and the selection.
    pub fn reset(&mut self) {
        self.notes.clear();
        self.selected = None;
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// All notes as one markdown document.
    pub fn to_markdown(&self) -> String {
        self.formatter.document(self.notes.values())
    }
}
