//! Editor abstraction.
//!
//! Playback writes into an [`EditorView`] with
//! [`apply_programmatic`](EditorView::apply_programmatic); those edits are
//! flagged so a recorder listening to the same editor does not capture them
//! again.

use reel_core::{Document, EditOperation};

/// A local edit as seen by the recorder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditEvent {
    pub operation: EditOperation,
    /// Document content immediately before the edit.
    pub prior_content: String,
    /// Set for edits applied by playback rather than typed by the user.
    pub programmatic: bool,
}

impl EditEvent {
    pub fn user(operation: EditOperation, prior_content: impl Into<String>) -> Self {
        Self {
            operation,
            prior_content: prior_content.into(),
            programmatic: false,
        }
    }

    pub fn programmatic(operation: EditOperation, prior_content: impl Into<String>) -> Self {
        Self {
            operation,
            prior_content: prior_content.into(),
            programmatic: true,
        }
    }
}

/// The editor surface driven by playback.
pub trait EditorView {
    fn content(&self) -> String;

    /// Apply an edit on behalf of playback.
    ///
    /// # Errors
    ///
    /// Returns an error if the operation does not fit the current content.
    fn apply_programmatic(&mut self, op: &EditOperation) -> reel_core::Result<()>;
}

/// Headless editor over a [`Document`].
///
/// Every applied edit is queued as an [`EditEvent`] for whoever records the
/// buffer.
#[derive(Debug, Clone, Default)]
pub struct TextBuffer {
    document: Document,
    events: Vec<EditEvent>,
}

impl TextBuffer {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            document: Document::new(content),
            events: Vec::new(),
        }
    }

    pub fn text(&self) -> &str {
        self.document.text()
    }

    /// Apply a user edit and return the event describing it.
    ///
    /// # Errors
    ///
    /// Returns an error if the operation does not fit the current content.
    pub fn edit(&mut self, op: EditOperation) -> reel_core::Result<EditEvent> {
        let event = EditEvent::user(op, self.document.text());
        self.document.apply(&event.operation)?;
        self.events.push(event.clone());
        Ok(event)
    }

    /// Drain the edits applied since the last call, oldest first.
    pub fn take_events(&mut self) -> Vec<EditEvent> {
        std::mem::take(&mut self.events)
    }
}

impl EditorView for TextBuffer {
    fn content(&self) -> String {
        self.document.text().to_string()
    }

    fn apply_programmatic(&mut self, op: &EditOperation) -> reel_core::Result<()> {
        let prior = self.document.text().to_string();
        self.document.apply(op)?;
        self.events.push(EditEvent::programmatic(op.clone(), prior));
        Ok(())
    }
}
