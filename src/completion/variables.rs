//! Variable names inside `ctx()` references

use crate::model::WorkflowModel;
use crate::span::{Position, SectorType};

use super::{suggestions, word_at, CompletionProvider, Suggestion};

/// Inside a `variable` sector: inputs, vars, then every published name
#[derive(Debug, Clone, Copy, Default)]
pub struct VariableCompletion;

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

impl CompletionProvider for VariableCompletion {
    fn name(&self) -> &str {
        "variables"
    }

    fn complete(&self, model: &WorkflowModel, position: Position) -> Vec<Suggestion> {
        if model.search(position, Some(SectorType::Variable)).is_empty() {
            return Vec::new();
        }
        let Some((prefix, replace)) = word_at(model, position, is_ident_char) else {
            return Vec::new();
        };

        let meta = model.meta();
        let inputs = meta.input.iter().map(|p| (p.name.as_str(), "input"));
        let vars = meta.vars.iter().map(|p| (p.name.as_str(), "var"));
        let published = model
            .transitions()
            .iter()
            .flat_map(|t| t.publish.iter().map(|p| (p.name.as_str(), t.from.as_str())));
        suggestions(inputs.chain(vars).chain(published), &prefix, replace)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const WORKFLOW: &str = "\
input:
  - host
vars:
  - hits: 0
tasks:
  t1:
    action: core.local
    input:
      cmd: ping <% ctx().h %>
    next:
      - publish:
          - handle: <% result() %>
        do: t2
  t2:
    action: core.echo
";

    #[test]
    fn suggests_declared_and_published_names() {
        let model = WorkflowModel::new(WORKFLOW).unwrap();
        let out = VariableCompletion.complete(&model, Position::new(8, 26));
        let labels: Vec<_> = out.iter().map(|s| (s.label.as_str(), s.detail.as_str())).collect();
        assert_eq!(labels, vec![("host", "input"), ("hits", "var"), ("handle", "t1")]);
        assert_eq!(out[0].replace.start, Position::new(8, 25));
    }

    #[test]
    fn nothing_outside_variable() {
        let model = WorkflowModel::new(WORKFLOW).unwrap();
        assert!(VariableCompletion.complete(&model, Position::new(6, 14)).is_empty());
    }
}
