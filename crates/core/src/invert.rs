//! Computes the operation that undoes a captured edit.
//!
//! Inversion works on exactly one operation at a time, and deletions must
//! stay within a single line. Both limits fail with a descriptive error
//! instead of producing a wrong inverse. Lifting the single-line limit
//! needs a line/column-aware diff of the prior document.

use crate::error::Error;
use crate::operation::{EditOperation, TextRange};
use crate::result::Result;

/// Invert a captured batch, which must contain exactly one operation.
///
/// # Errors
///
/// Returns [`Error::UnsupportedBatch`] for empty or multi-operation batches and
/// any error of [`invert`] otherwise.
pub fn invert_changes(ops: &[EditOperation], prior_content: &str) -> Result<EditOperation> {
    match ops {
        [op] => invert(op, prior_content),
        _ => Err(Error::UnsupportedBatch { count: ops.len() }),
    }
}

/// Produce the operation that restores `prior_content` after `op` was applied to it.
///
/// # Errors
///
/// Returns [`Error::MultiLineDeletion`] when `op` removes text spanning several
/// lines and [`Error::InvalidRange`] when the removed range lies outside
/// `prior_content`.
pub fn invert(op: &EditOperation, prior_content: &str) -> Result<EditOperation> {
    let range = op.range;

    if op.is_insertion() {
        let (end_line_number, end_column) =
            end_of_inserted(range.end_line_number, range.end_column, &op.text);
        return Ok(EditOperation::new(
            TextRange::new(
                range.start_line_number,
                range.start_column,
                end_line_number,
                end_column,
            ),
            op.text_len(),
            String::new(),
        ));
    }

    let removed = removed_text(range, prior_content)?;

    if op.text.is_empty() {
        return Ok(EditOperation::new(
            TextRange::point(range.start_line_number, range.start_column),
            0,
            removed,
        ));
    }

    // Replacement: take the new text out again and put the old text back.
    let (end_line_number, end_column) =
        end_of_inserted(range.start_line_number, range.start_column, &op.text);
    Ok(EditOperation::new(
        TextRange::new(
            range.start_line_number,
            range.start_column,
            end_line_number,
            end_column,
        ),
        op.text_len(),
        removed,
    ))
}

/// Position right after `text` once it is inserted at `(line_number, column)`.
fn end_of_inserted(line_number: u32, column: u32, text: &str) -> (u32, u32) {
    let new_line_inserts = count_u32(text.matches('\n').count());
    let end_line = line_number.saturating_add(new_line_inserts);

    if text.ends_with('\n') {
        return (end_line, 1);
    }

    match text.rsplit_once('\n') {
        Some((_, last_line)) => (
            end_line,
            count_u32(last_line.chars().count()).saturating_add(1),
        ),
        None => (end_line, column.saturating_add(count_u32(text.chars().count()))),
    }
}

/// Text covered by a single-line `range` of `content`.
fn removed_text(range: TextRange, content: &str) -> Result<String> {
    if !range.is_single_line() {
        return Err(Error::MultiLineDeletion {
            start_line: range.start_line_number,
            end_line: range.end_line_number,
        });
    }

    let line = (range.start_line_number as usize)
        .checked_sub(1)
        .and_then(|index| content.split_inclusive('\n').nth(index))
        .ok_or_else(|| {
            Error::invalid_range(
                range,
                format!("line {} is not in the prior content", range.start_line_number),
            )
        })?;

    let start = (range.start_column as usize)
        .checked_sub(1)
        .ok_or_else(|| Error::invalid_range(range, "columns start at 1"))?;
    let end = (range.end_column as usize)
        .checked_sub(1)
        .filter(|end| *end >= start && *end <= line.chars().count())
        .ok_or_else(|| {
            Error::invalid_range(range, format!("columns do not fit line of {line:?}"))
        })?;

    Ok(line.chars().skip(start).take(end.saturating_sub(start)).collect())
}

fn count_u32(count: usize) -> u32 {
    u32::try_from(count).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::document::Document;
    use proptest::prelude::*;

    fn round_trip(op: &EditOperation, prior: &str) -> String {
        let inverse = invert(op, prior).unwrap();
        let mut doc = Document::new(prior);
        doc.apply(op).unwrap();
        doc.apply(&inverse).unwrap();
        doc.text().to_string()
    }

    #[test]
    fn test_single_line_insertion() {
        let op = EditOperation::insert(1, 3, "xyz");
        let inverse = invert(&op, "abcd").unwrap();

        assert_eq!(inverse, EditOperation::new(TextRange::new(1, 3, 1, 6), 3, ""));
    }

    #[test]
    fn test_insertion_ending_in_newline_resets_column() {
        let op = EditOperation::insert(2, 5, "foo\nbar\n");
        let inverse = invert(&op, "line one\nline two").unwrap();

        assert_eq!(inverse.range, TextRange::new(2, 5, 4, 1));
        assert_eq!(inverse.range_length, 8);
        assert!(inverse.text.is_empty());
    }

    #[test]
    fn test_multi_line_insertion_without_trailing_newline() {
        let op = EditOperation::insert(1, 4, "a\nbc");
        let inverse = invert(&op, "fn();").unwrap();

        assert_eq!(inverse.range, TextRange::new(1, 4, 2, 3));
        assert_eq!(round_trip(&op, "fn();"), "fn();");
    }

    #[test]
    fn test_deletion_restores_removed_text() {
        let op = EditOperation::delete_in_line(2, 7, 10);
        let inverse = invert(&op, "const a = 1\nlet b = 22;\n").unwrap();

        assert_eq!(inverse, EditOperation::insert(2, 7, "= 2"));
    }

    #[test]
    fn test_deletion_of_last_line_without_newline() {
        let prior = "first\nsecond";
        let op = EditOperation::delete_in_line(2, 1, 7);
        assert_eq!(invert(&op, prior).unwrap().text, "second");
        assert_eq!(round_trip(&op, prior), prior);
    }

    #[test]
    fn test_replacement_round_trips() {
        let prior = "let value = 10;";
        let op = EditOperation::replace_in_line(1, 13, 15, "42\n");
        let inverse = invert(&op, prior).unwrap();

        assert_eq!(inverse.range, TextRange::new(1, 13, 2, 1));
        assert_eq!(inverse.text, "10");
        assert_eq!(round_trip(&op, prior), prior);
    }

    #[test]
    fn test_full_document_insertion_from_empty() {
        let content = "function hello() {}\n\nhello()";
        let op = EditOperation::insert(1, 1, content);
        assert_eq!(round_trip(&op, ""), "");
    }

    #[test]
    fn test_multi_line_deletion_is_rejected() {
        let op = EditOperation::new(TextRange::new(1, 3, 2, 1), 1, "");
        let result = invert(&op, "ab\ncd");

        assert_eq!(
            result,
            Err(Error::MultiLineDeletion {
                start_line: 1,
                end_line: 2
            })
        );
        assert!(result.unwrap_err().is_unsupported_input());
    }

    #[test]
    fn test_deletion_outside_prior_content_is_rejected() {
        let op = EditOperation::delete_in_line(3, 1, 2);
        assert!(matches!(invert(&op, "one\ntwo"), Err(Error::InvalidRange { .. })));

        let op = EditOperation::delete_in_line(1, 2, 9);
        assert!(matches!(invert(&op, "one\ntwo"), Err(Error::InvalidRange { .. })));
    }

    #[test]
    fn test_batches_must_hold_one_operation() {
        let op = EditOperation::insert(1, 1, "x");

        assert!(invert_changes(std::slice::from_ref(&op), "").is_ok());
        assert_eq!(
            invert_changes(&[op.clone(), op], ""),
            Err(Error::UnsupportedBatch { count: 2 })
        );
        assert_eq!(
            invert_changes(&[], ""),
            Err(Error::UnsupportedBatch { count: 0 })
        );
    }

    fn line_strategy() -> impl Strategy<Value = String> {
        "[a-z ;(){}=é]{0,12}"
    }

    proptest! {
        #[test]
        fn prop_single_line_insertion_round_trips(
            lines in prop::collection::vec(line_strategy(), 1..5),
            line_pick in 0usize..5,
            column_pick in 0usize..13,
            text in line_strategy(),
        ) {
            let prior = lines.join("\n");
            let line_index = line_pick % lines.len();
            let line_len = lines[line_index].chars().count();
            let column = (column_pick % (line_len + 1)) as u32 + 1;
            let op = EditOperation::insert(line_index as u32 + 1, column, text);

            prop_assert_eq!(round_trip(&op, &prior), prior);
        }

        #[test]
        fn prop_single_line_deletion_round_trips(
            lines in prop::collection::vec(line_strategy(), 1..5),
            line_pick in 0usize..5,
            a in 0usize..13,
            b in 0usize..13,
        ) {
            let prior = lines.join("\n");
            let line_index = line_pick % lines.len();
            let line_len = lines[line_index].chars().count();
            let (start, end) = (a % (line_len + 1), b % (line_len + 1));
            let (start, end) = (start.min(end) as u32 + 1, start.max(end) as u32 + 1);
            prop_assume!(start < end);
            let op = EditOperation::delete_in_line(line_index as u32 + 1, start, end);

            prop_assert_eq!(round_trip(&op, &prior), prior);
        }
    }
}
