//! Edit operations and the line/column ranges they address.
//!
//! # Coordinate convention
//!
//! Lines and columns are **1-based**. A range starts at
//! `(start_line_number, start_column)` inclusive and ends at
//! `(end_line_number, end_column)` exclusive, so `{1,1,1,1}` is the empty
//! range at the very start of a document and `{1,3,1,5}` covers the third
//! and fourth characters of the first line. A range that ends at column 1 of
//! the following line includes the newline of the line it starts on.
//!
//! Columns and lengths count Unicode scalar values (Rust `char`s).
//!
//! Ranges always refer to the document *before* the edit is applied.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A span in a document, in the coordinate convention described in the module docs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextRange {
    pub start_line_number: u32,
    pub start_column: u32,
    pub end_line_number: u32,
    pub end_column: u32,
}

impl TextRange {
    /// The empty range at the start of every document.
    pub const ORIGIN: Self = Self::point(1, 1);

    pub const fn new(
        start_line_number: u32,
        start_column: u32,
        end_line_number: u32,
        end_column: u32,
    ) -> Self {
        Self {
            start_line_number,
            start_column,
            end_line_number,
            end_column,
        }
    }

    /// Zero-width range at a single position.
    pub const fn point(line_number: u32, column: u32) -> Self {
        Self::new(line_number, column, line_number, column)
    }

    pub const fn is_single_line(&self) -> bool {
        self.start_line_number == self.end_line_number
    }

    pub const fn is_empty(&self) -> bool {
        self.is_single_line() && self.start_column == self.end_column
    }
}

impl fmt::Display for TextRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}:{} -> {}:{})",
            self.start_line_number, self.start_column, self.end_line_number, self.end_column
        )
    }
}

/// One atomic text mutation: replace `range_length` characters at `range` with `text`.
///
/// `range_length == 0` is a pure insertion, an empty `text` is a pure deletion.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditOperation {
    pub range: TextRange,
    pub range_length: usize,
    pub text: String,
}

impl EditOperation {
    pub fn new(range: TextRange, range_length: usize, text: impl Into<String>) -> Self {
        Self {
            range,
            range_length,
            text: text.into(),
        }
    }

    /// Insert `text` at a position without removing anything.
    pub fn insert(line_number: u32, column: u32, text: impl Into<String>) -> Self {
        Self::new(TextRange::point(line_number, column), 0, text)
    }

    /// Remove the characters `[start_column, end_column)` of a single line.
    pub fn delete_in_line(line_number: u32, start_column: u32, end_column: u32) -> Self {
        let length = end_column.saturating_sub(start_column) as usize;
        Self::new(
            TextRange::new(line_number, start_column, line_number, end_column),
            length,
            String::new(),
        )
    }

    /// Replace the characters `[start_column, end_column)` of a single line with `text`.
    pub fn replace_in_line(
        line_number: u32,
        start_column: u32,
        end_column: u32,
        text: impl Into<String>,
    ) -> Self {
        Self {
            text: text.into(),
            ..Self::delete_in_line(line_number, start_column, end_column)
        }
    }

    pub const fn is_insertion(&self) -> bool {
        self.range_length == 0
    }

    pub fn is_deletion(&self) -> bool {
        self.range_length > 0 && self.text.is_empty()
    }

    /// Number of characters in the replacement text.
    pub fn text_len(&self) -> usize {
        self.text.chars().count()
    }
}
