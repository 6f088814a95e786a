//! Range - ordered (start, end) pair of positions
//!
//! Invariant: `start <= end`, kept by every constructor and mutator.
//! `apply_edit` moves a range through a [`Delta`] so that ranges stay valid
//! between the keystroke and the next reparse.

use serde::{Deserialize, Serialize};

use super::{Delta, Position};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    /// Build a range; reversed endpoints are swapped
    pub fn new(a: Position, b: Position) -> Self {
        if a <= b {
            Self { start: a, end: b }
        } else {
            Self { start: b, end: a }
        }
    }

    pub fn from_points(a: impl Into<Position>, b: impl Into<Position>) -> Self {
        Self::new(a.into(), b.into())
    }

    pub fn empty_at(at: Position) -> Self {
        Self { start: at, end: at }
    }

    /// Inclusive on both ends: a cursor right after the last char is inside.
    pub fn contains(&self, point: Position) -> bool {
        self.start <= point && point <= self.end
    }

    pub fn contains_range(&self, other: &Range) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    pub fn intersects(&self, other: &Range) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn is_multi_line(&self) -> bool {
        self.start.row != self.end.row
    }

    /// Move the start; an end left behind is pulled along
    pub fn set_start(&mut self, row: usize, column: usize) {
        self.start = Position::new(row, column);
        if self.end < self.start {
            self.end = self.start;
        }
    }

    /// Move the end; a start left ahead is pulled back
    pub fn set_end(&mut self, row: usize, column: usize) {
        self.end = Position::new(row, column);
        if self.start > self.end {
            self.start = self.end;
        }
    }

    /// Shift this range through an edit.
    ///
    /// - endpoints before the edit stay put
    /// - endpoints at or after the edited region move by the edit's extent
    /// - an end inside the removed region collapses onto the inserted text's end,
    ///   a start inside it collapses onto the edit start
    ///
    /// Returns false when the edit replaced the whole range; the range is
    /// still collapsed, but the text it covered no longer exists. Typing over
    /// exactly this range keeps it.
    pub fn apply_edit(&mut self, delta: &Delta) -> bool {
        let edit_start = delta.range.start;
        let edit_end = delta.range.end;
        let new_end = delta.new_end();
        let swallowed = !delta.range.is_empty()
            && edit_start <= self.start
            && self.end <= edit_end
            && self.start < edit_end
            && (delta.text.is_empty() || *self != delta.range);

        let shift = |p: Position| -> Position {
            if p.row == edit_end.row {
                Position::new(new_end.row, new_end.column + (p.column - edit_end.column))
            } else {
                Position::new(p.row - edit_end.row + new_end.row, p.column)
            }
        };

        let start = if self.start < edit_start {
            self.start
        } else if self.start < edit_end {
            edit_start
        } else {
            shift(self.start)
        };
        let end = if self.end < edit_start {
            self.end
        } else if self.end < edit_end {
            new_end
        } else {
            shift(self.end)
        };

        self.start = start;
        self.end = end.max(start);
        !swallowed
    }
}

impl std::fmt::Display for Range {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}
