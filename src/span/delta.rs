//! Delta - one text replacement
//!
//! Editors report inserts and removals; structural edits report replacements.
//! All three are the same thing: replace `range` (in the old text) by `text`.

use serde::{Deserialize, Serialize};

use super::{Position, Range};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delta {
    /// Replaced region, in coordinates of the text before the edit
    pub range: Range,
    /// Inserted content
    pub text: String,
}

impl Delta {
    pub fn new(range: Range, text: impl Into<String>) -> Self {
        Self {
            range,
            text: text.into(),
        }
    }

    pub fn insert(at: Position, text: impl Into<String>) -> Self {
        Self::new(Range::new(at, at), text)
    }

    pub fn remove(range: Range) -> Self {
        Self::new(range, String::new())
    }

    /// Where the inserted text ends once applied
    pub fn new_end(&self) -> Position {
        let mut end = self.range.start;
        for ch in self.text.chars() {
            if ch == '\n' {
                end.row += 1;
                end.column = 0;
            } else {
                end.column += 1;
            }
        }
        end
    }

    /// Number of rows the edit adds (negative when it removes rows)
    pub fn row_delta(&self) -> isize {
        self.new_end().row as isize - self.range.end.row as isize
    }

    pub fn is_noop(&self) -> bool {
        self.range.is_empty() && self.text.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_end_single_line_insert() {
        let delta = Delta::insert(Position::new(2, 4), "abc");
        assert_eq!(delta.new_end(), Position::new(2, 7));
        assert_eq!(delta.row_delta(), 0);
    }

    #[test]
    fn new_end_multi_line_insert() {
        let delta = Delta::insert(Position::new(1, 4), "x\n  yz");
        assert_eq!(delta.new_end(), Position::new(2, 4));
        assert_eq!(delta.row_delta(), 1);
    }

    #[test]
    fn removal_ends_at_start() {
        let delta = Delta::remove(Range::from_points((3, 0), (5, 2)));
        assert_eq!(delta.new_end(), Position::new(3, 0));
        assert_eq!(delta.row_delta(), -2);
        assert!(!delta.is_noop());
    }
}
