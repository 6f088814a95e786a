//! Task names for `do:` targets

use crate::model::{WorkflowModel, ENGINE_COMMANDS};
use crate::span::{Position, SectorType};

use super::{suggestions, word_at, CompletionProvider, Suggestion};

/// Inside a `do` sector: every task except the rule's own, then engine commands
#[derive(Debug, Clone, Copy, Default)]
pub struct TaskNameCompletion;

fn is_name_char(c: char) -> bool {
    !c.is_whitespace() && !",[]:#'\"".contains(c)
}

impl CompletionProvider for TaskNameCompletion {
    fn name(&self) -> &str {
        "tasks"
    }

    fn complete(&self, model: &WorkflowModel, position: Position) -> Vec<Suggestion> {
        let Some(sector) = model.search(position, Some(SectorType::Do)).into_iter().next() else {
            return Vec::new();
        };
        let owner = sector.task_name();
        let Some((prefix, replace)) = word_at(model, position, is_name_char) else {
            return Vec::new();
        };

        let tasks = model
            .tasks()
            .iter()
            .filter(|t| Some(t.name.as_str()) != owner)
            .map(|t| (t.name.as_str(), t.action().unwrap_or("task")));
        let commands = ENGINE_COMMANDS.iter().map(|c| (*c, "engine command"));
        suggestions(tasks.chain(commands), &prefix, replace)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const WORKFLOW: &str = "\
tasks:
  t1:
    action: core.local
    next:
      - do:
          - fi
  finish:
    action: core.noop
  fix:
";

    #[test]
    fn suggests_other_tasks_by_prefix() {
        let model = WorkflowModel::new(WORKFLOW).unwrap();
        let out = TaskNameCompletion.complete(&model, Position::new(5, 14));
        let labels: Vec<_> = out.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["finish", "fix", "fail"]);
        assert_eq!(out[0].detail, "core.noop");
        assert_eq!(out[1].detail, "task");
        assert_eq!(out[0].replace.start, Position::new(5, 12));
        assert_eq!(out[0].replace.end, Position::new(5, 14));
    }

    #[test]
    fn owner_task_is_excluded() {
        let model = WorkflowModel::new(WORKFLOW).unwrap();
        let out = TaskNameCompletion.complete(&model, Position::new(5, 12));
        assert!(out.iter().all(|s| s.label != "t1"));
        assert!(out.iter().any(|s| s.label == "noop"));
    }

    #[test]
    fn nothing_outside_do() {
        let model = WorkflowModel::new(WORKFLOW).unwrap();
        assert!(TaskNameCompletion.complete(&model, Position::new(2, 14)).is_empty());
    }
}
