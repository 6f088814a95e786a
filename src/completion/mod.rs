//! # Completion Providers
//!
//! Context-aware suggestions for the position under the editor cursor.
//!
//! - [`TaskNameCompletion`] - task names inside `do:` targets
//! - [`ActionCompletion`] - registered action refs inside `action:`
//! - [`VariableCompletion`] - inputs, vars and published names inside `ctx()`
//!
//! Each provider answers only inside its own sector type and filters by the
//! word already typed to the left of the cursor. [`complete`] asks every
//! provider and concatenates the answers.

mod actions;
mod tasks;
mod variables;

pub use actions::{ActionCompletion, CORE_ACTIONS};
pub use tasks::TaskNameCompletion;
pub use variables::VariableCompletion;

use serde::Serialize;

use crate::model::WorkflowModel;
use crate::span::{Position, Range};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Suggestion {
    pub label: String,
    pub detail: String,
    /// Text the suggestion replaces: the word around the cursor
    pub replace: Range,
}

pub trait CompletionProvider: Send + Sync {
    /// Provider name (e.g. "tasks", "actions")
    fn name(&self) -> &str;

    fn complete(&self, model: &WorkflowModel, position: Position) -> Vec<Suggestion>;
}

/// Every built-in provider
pub fn providers() -> Vec<Box<dyn CompletionProvider>> {
    vec![
        Box::new(TaskNameCompletion),
        Box::new(ActionCompletion::default()),
        Box::new(VariableCompletion),
    ]
}

/// Ask every built-in provider
pub fn complete(model: &WorkflowModel, position: Position) -> Vec<Suggestion> {
    providers()
        .iter()
        .flat_map(|p| p.complete(model, position))
        .collect()
}

/// Typed prefix left of the cursor and the range of the whole word, read
/// from the editor's latest text
pub(crate) fn word_at(
    model: &WorkflowModel,
    position: Position,
    is_word: impl Fn(char) -> bool,
) -> Option<(String, Range)> {
    let row = model.editor_row(position.row)?;
    let chars: Vec<char> = row.trim_end_matches(['\r', '\n']).chars().collect();
    let column = position.column.min(chars.len());

    let start = chars[..column]
        .iter()
        .rposition(|c| !is_word(*c))
        .map_or(0, |i| i + 1);
    let end = chars[column..]
        .iter()
        .position(|c| !is_word(*c))
        .map_or(chars.len(), |i| column + i);

    let prefix: String = chars[start..column].iter().collect();
    let range = Range::new(
        Position::new(position.row, start),
        Position::new(position.row, end),
    );
    Some((prefix, range))
}

pub(crate) fn suggestions<'a>(
    candidates: impl IntoIterator<Item = (&'a str, &'a str)>,
    prefix: &str,
    replace: Range,
) -> Vec<Suggestion> {
    let mut out: Vec<Suggestion> = Vec::new();
    for (label, detail) in candidates {
        if label.starts_with(prefix) && !out.iter().any(|s| s.label == label) {
            out.push(Suggestion {
                label: label.to_string(),
                detail: detail.to_string(),
                replace,
            });
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::Delta;

    #[test]
    fn word_at_splits_around_cursor() {
        let model = WorkflowModel::new("tasks:\n  t1:\n    action: core.lo\n").unwrap();
        let is_ref = |c: char| c.is_alphanumeric() || c == '.' || c == '_';
        let (prefix, range) = word_at(&model, Position::new(2, 18), is_ref).unwrap();
        assert_eq!(prefix, "core.l");
        assert_eq!(range, Range::from_points((2, 12), (2, 19)));
        assert!(word_at(&model, Position::new(9, 0), is_ref).is_none());
    }

    #[test]
    fn word_at_reads_pending_edits() {
        let mut model = WorkflowModel::new("tasks:\n  t1:\n    action: core.lo\n").unwrap();
        model.track_edit(&Delta::insert(Position::new(2, 19), "c"));
        let out = ActionCompletion::default().complete(&model, Position::new(2, 20));
        assert_eq!(
            out.iter().map(|s| s.label.as_str()).collect::<Vec<_>>(),
            vec!["core.local", "core.local_sudo"]
        );
        assert_eq!(out[0].replace, Range::from_points((2, 12), (2, 20)));
    }

    #[test]
    fn suggestions_filter_and_dedup() {
        let replace = Range::default();
        let out = suggestions([("a", "x"), ("ab", "y"), ("a", "z"), ("b", "w")], "a", replace);
        let labels: Vec<_> = out.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["a", "ab"]);
    }

    #[test]
    fn complete_outside_any_sector_is_empty() {
        let model = WorkflowModel::new("version: 1.0\ntasks:\n  t1:\n").unwrap();
        assert!(complete(&model, Position::new(0, 3)).is_empty());
        assert_eq!(providers().len(), 3);
    }
}
