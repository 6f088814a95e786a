//! Document - lossless, position-aware parse of a workflow text
//!
//! The document keeps three views of the same text:
//! - the lexed lines (formatting tokens included), which serialize back to
//!   the exact source
//! - the node tree, which gives ranges for mappings, sequences and scalars
//! - the `serde_yaml::Value`, which gives the semantic values
//!
//! Edits relex only the rows they touch; every other line's tokens are reused.

use serde_yaml::Value;
use tracing::debug;

use crate::error::{FlowdocError, ParseError, Result};
use crate::span::{Delta, Position, Range};

use super::node::Node;
use super::parser;
use super::token::{lex, Line};

#[derive(Debug, Clone)]
pub struct Document {
    lines: Vec<Line>,
    /// Byte offset of each line start
    line_starts: Vec<usize>,
    text: String,
    root: Node,
    value: Value,
}

impl Document {
    /// Parse a full text
    pub fn parse(text: &str) -> std::result::Result<Self, ParseError> {
        Self::from_lines(lex(text))
    }

    /// Document of an empty text
    pub fn empty() -> Self {
        Self {
            lines: Vec::new(),
            line_starts: Vec::new(),
            text: String::new(),
            root: Node::empty(Position::default()),
            value: Value::Null,
        }
    }

    fn from_lines(lines: Vec<Line>) -> std::result::Result<Self, ParseError> {
        let mut text = String::new();
        let mut line_starts = Vec::with_capacity(lines.len());
        for line in &lines {
            line_starts.push(text.len());
            line.write_to(&mut text);
        }

        let value = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_yaml::from_str::<Value>(&text).map_err(|e| ParseError::from_yaml(&e))?
        };
        let root = parser::build(&lines)?;

        Ok(Self {
            lines,
            line_starts,
            text,
            root,
            value,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Rebuild the text from the token stream
    pub fn serialize(&self) -> String {
        let mut out = String::with_capacity(self.text.len());
        for line in &self.lines {
            line.write_to(&mut out);
        }
        out
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Rows addressable by a cursor; a trailing newline opens one more
    pub fn row_count(&self) -> usize {
        if self.text.is_empty() || self.text.ends_with('\n') {
            self.lines.len() + 1
        } else {
            self.lines.len()
        }
    }

    pub fn end_position(&self) -> Position {
        let last = self.row_count() - 1;
        Position::new(last, self.row_width(last).unwrap_or(0))
    }

    /// Width in chars of a row, newline excluded
    pub fn row_width(&self, row: usize) -> Option<usize> {
        match self.lines.get(row) {
            Some(line) => Some(line.width()),
            None if row < self.row_count() => Some(0),
            None => None,
        }
    }

    /// Byte offset of a position, if it lies inside the text
    pub fn offset_of(&self, position: Position) -> Option<usize> {
        let Some(line) = self.lines.get(position.row) else {
            return (position.row == self.lines.len()
                && position.row < self.row_count()
                && position.column == 0)
                .then_some(self.text.len());
        };
        if position.column > line.width() {
            return None;
        }
        let start = self.line_starts[position.row];
        let raw = &self.text[start..start + line.byte_len()];
        let within = raw
            .char_indices()
            .nth(position.column)
            .map_or(raw.trim_end_matches(['\r', '\n']).len(), |(b, _)| b);
        Some(start + within)
    }

    pub fn slice(&self, range: Range) -> Option<&str> {
        let start = self.offset_of(range.start)?;
        let end = self.offset_of(range.end)?;
        self.text.get(start..end)
    }

    pub fn row_text(&self, row: usize) -> Option<String> {
        self.lines.get(row).map(Line::text)
    }

    /// Range covering whole rows `first..=last`, newline included, for removals
    pub fn rows_range(&self, first: usize, last: usize) -> Range {
        let last = last.min(self.lines.len().saturating_sub(1));
        let has_newline = self.lines.get(last).is_some_and(|l| !l.newline().is_empty());
        if has_newline {
            Range::new(Position::new(first, 0), Position::new(last + 1, 0))
        } else {
            Range::new(
                Position::new(first, 0),
                Position::new(last, self.row_width(last).unwrap_or(0)),
            )
        }
    }

    /// Replace whole rows with a newline-terminated block
    pub fn replace_rows(&self, first: usize, last: usize, block: &str) -> Delta {
        let range = self.rows_range(first, last);
        if range.end.row > last {
            Delta::new(range, block)
        } else {
            Delta::new(range, block.strip_suffix('\n').unwrap_or(block))
        }
    }

    /// Insert a newline-terminated block on the rows after `row`
    pub fn insert_after_row(&self, row: usize, block: &str) -> Delta {
        match self.lines.get(row) {
            Some(line) if !line.newline().is_empty() => {
                Delta::insert(Position::new(row + 1, 0), block)
            }
            Some(line) => {
                let text = format!("\n{}", block.strip_suffix('\n').unwrap_or(block));
                Delta::insert(Position::new(row, line.width()), text)
            }
            None => Delta::insert(self.end_position(), block),
        }
    }

    /// Text this document would have after `delta`, if the delta fits
    pub fn spliced(&self, delta: &Delta) -> Option<String> {
        let start = self.offset_of(delta.range.start)?;
        let end = self.offset_of(delta.range.end)?;
        let mut text = String::with_capacity(self.text.len() + delta.text.len());
        text.push_str(&self.text[..start]);
        text.push_str(&delta.text);
        text.push_str(&self.text[end..]);
        Some(text)
    }

    fn check(&self, position: Position) -> Result<usize> {
        self.offset_of(position)
            .ok_or(FlowdocError::PositionOutOfBounds { position })
    }

    /// Apply one delta, relexing only the rows it touches
    pub fn apply_delta(&self, delta: &Delta) -> Result<Document> {
        let start = self.check(delta.range.start)?;
        let end = self.check(delta.range.end)?;

        let first_row = delta.range.start.row;
        let last_row = delta.range.end.row;
        let segment_start = self
            .line_starts
            .get(first_row)
            .copied()
            .unwrap_or(self.text.len());
        let segment_end = match self.lines.get(last_row) {
            Some(line) => self.line_starts[last_row] + line.byte_len(),
            None => self.text.len(),
        };

        let mut segment = String::with_capacity(segment_end - segment_start + delta.text.len());
        segment.push_str(&self.text[segment_start..start]);
        segment.push_str(&delta.text);
        segment.push_str(&self.text[end..segment_end]);

        let relexed = lex(&segment);
        debug!(
            first_row,
            last_row,
            relexed = relexed.len(),
            "relexing rows touched by delta"
        );

        let keep_head = first_row.min(self.lines.len());
        let keep_tail = (last_row + 1).min(self.lines.len());
        let mut lines = Vec::with_capacity(keep_head + relexed.len() + self.lines.len() - keep_tail);
        lines.extend_from_slice(&self.lines[..keep_head]);
        lines.extend(relexed);
        lines.extend_from_slice(&self.lines[keep_tail..]);

        Ok(Self::from_lines(lines)?)
    }

    /// Apply several non-overlapping edits as one change.
    ///
    /// Returns the new document and the edits in the order they were applied
    /// (last position first), which is also a valid sequential delta list.
    pub fn apply_edits(&self, edits: &[Delta]) -> Result<(Document, Vec<Delta>)> {
        let mut ordered: Vec<Delta> = edits.iter().filter(|d| !d.is_noop()).cloned().collect();
        ordered.sort_by(|a, b| b.range.start.cmp(&a.range.start).then(b.range.end.cmp(&a.range.end)));

        for pair in ordered.windows(2) {
            // pair[0] comes later in the text than pair[1]
            if pair[1].range.end > pair[0].range.start {
                return Err(FlowdocError::OverlappingEdits {
                    position: pair[0].range.start,
                });
            }
        }

        let mut text = self.text.clone();
        for delta in &ordered {
            let start = self.check(delta.range.start)?;
            let end = self.check(delta.range.end)?;
            text.replace_range(start..end, &delta.text);
        }

        Ok((Self::parse(&text)?, ordered))
    }

    /// Indent unit used by the document (first indented line under a parent)
    pub fn indent_unit(&self) -> Option<usize> {
        let mut previous: Option<usize> = None;
        for line in self.lines.iter().filter(|l| l.is_content()) {
            let indent = line.indent().unwrap_or(0);
            if let Some(prev) = previous {
                if indent > prev {
                    return Some(indent - prev);
                }
            }
            previous = Some(indent);
        }
        None
    }
}

impl std::fmt::Display for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}
