//! Headless text buffer that applies [`EditOperation`]s.
//!
//! Uses the coordinate convention documented in [`crate::operation`].

use crate::error::Error;
use crate::operation::{EditOperation, TextRange};
use crate::result::Result;

/// Plain text document addressed by 1-based line/column positions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    text: String,
}

impl Document {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    /// Number of lines. An empty document has one (empty) line.
    pub fn line_count(&self) -> usize {
        self.text.matches('\n').count().saturating_add(1)
    }

    /// Apply one operation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRange`] if the range does not address positions
    /// inside the document or its end precedes its start.
    pub fn apply(&mut self, op: &EditOperation) -> Result<()> {
        let range = op.range;
        let start = self.byte_offset(range, range.start_line_number, range.start_column)?;
        let end = self.byte_offset(range, range.end_line_number, range.end_column)?;
        if end < start {
            return Err(Error::invalid_range(range, "range ends before it starts"));
        }
        self.text.replace_range(start..end, &op.text);
        Ok(())
    }

    /// Apply operations in order, stopping at the first failure.
    ///
    /// # Errors
    ///
    /// Returns the error of the first operation that cannot be applied.
    pub fn apply_all<'a>(&mut self, ops: impl IntoIterator<Item = &'a EditOperation>) -> Result<()> {
        ops.into_iter().try_for_each(|op| self.apply(op))
    }

    fn byte_offset(&self, range: TextRange, line_number: u32, column: u32) -> Result<usize> {
        let line_index = (line_number as usize)
            .checked_sub(1)
            .ok_or_else(|| Error::invalid_range(range, "line numbers start at 1"))?;
        let column_index = (column as usize)
            .checked_sub(1)
            .ok_or_else(|| Error::invalid_range(range, "columns start at 1"))?;

        let line_start = std::iter::once(0)
            .chain(self.text.match_indices('\n').map(|(i, _)| i.saturating_add(1)))
            .nth(line_index)
            .ok_or_else(|| {
                Error::invalid_range(range, format!("line {line_number} is past the end"))
            })?;

        let rest = self.text.get(line_start..).unwrap_or_default();
        let line = rest.split('\n').next().unwrap_or_default();

        line.char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(line.len()))
            .nth(column_index)
            .map(|offset| line_start.saturating_add(offset))
            .ok_or_else(|| {
                Error::invalid_range(
                    range,
                    format!("column {column} is past the end of line {line_number}"),
                )
            })
    }
}

impl From<&str> for Document {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}
