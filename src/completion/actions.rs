//! Action refs for `action:` values

use crate::model::WorkflowModel;
use crate::span::{Position, SectorType};

use super::{suggestions, word_at, CompletionProvider, Suggestion};

/// Actions every workflow engine install ships with
pub const CORE_ACTIONS: &[(&str, &str)] = &[
    ("core.local", "Run a shell command on the local host"),
    ("core.local_sudo", "Run a shell command on the local host as root"),
    ("core.remote", "Run a shell command on remote hosts"),
    ("core.http", "Send an HTTP request"),
    ("core.echo", "Print a message"),
    ("core.noop", "Do nothing"),
    ("core.pause", "Wait a number of seconds"),
    ("core.uuid", "Generate a UUID"),
    ("core.sendmail", "Send an email"),
];

/// Inside a `ref` sector: registered actions
#[derive(Debug, Clone)]
pub struct ActionCompletion {
    actions: Vec<(String, String)>,
}

impl ActionCompletion {
    pub fn new<I, R, D>(actions: I) -> Self
    where
        I: IntoIterator<Item = (R, D)>,
        R: Into<String>,
        D: Into<String>,
    {
        Self {
            actions: actions
                .into_iter()
                .map(|(r, d)| (r.into(), d.into()))
                .collect(),
        }
    }

    /// Add a ref (e.g. from an installed pack)
    pub fn register(&mut self, action: impl Into<String>, description: impl Into<String>) {
        self.actions.push((action.into(), description.into()));
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

impl Default for ActionCompletion {
    fn default() -> Self {
        Self::new(CORE_ACTIONS.iter().copied())
    }
}

fn is_ref_char(c: char) -> bool {
    c.is_alphanumeric() || c == '.' || c == '_' || c == '-'
}

impl CompletionProvider for ActionCompletion {
    fn name(&self) -> &str {
        "actions"
    }

    fn complete(&self, model: &WorkflowModel, position: Position) -> Vec<Suggestion> {
        if model.search(position, Some(SectorType::Ref)).is_empty() {
            return Vec::new();
        }
        let Some((prefix, replace)) = word_at(model, position, is_ref_char) else {
            return Vec::new();
        };
        let candidates = self
            .actions
            .iter()
            .map(|(r, d)| (r.as_str(), d.as_str()));
        suggestions(candidates, &prefix, replace)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::Range;

    const WORKFLOW: &str = "tasks:\n  t1:\n    action: core.lo\n  t2:\n    action: mypack.\n";

    #[test]
    fn suggests_core_actions_by_prefix() {
        let model = WorkflowModel::new(WORKFLOW).unwrap();
        let out = ActionCompletion::default().complete(&model, Position::new(2, 19));
        let labels: Vec<_> = out.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["core.local", "core.local_sudo"]);
        assert_eq!(out[0].replace, Range::from_points((2, 12), (2, 19)));
    }

    #[test]
    fn registered_actions_are_offered() {
        let model = WorkflowModel::new(WORKFLOW).unwrap();
        let mut provider = ActionCompletion::new(Vec::<(String, String)>::new());
        assert!(provider.is_empty());
        provider.register("mypack.deploy", "Deploy");
        let out = provider.complete(&model, Position::new(4, 19));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].label, "mypack.deploy");
    }

    #[test]
    fn nothing_outside_ref() {
        let model = WorkflowModel::new(WORKFLOW).unwrap();
        assert!(ActionCompletion::default()
            .complete(&model, Position::new(1, 3))
            .is_empty());
    }
}
