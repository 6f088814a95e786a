//! Text edits for structural mutations
//!
//! Every function plans deltas against the current document without
//! touching it; the model applies them in one `apply_edits` call. Edits
//! work on whole rows where they can, so surrounding comments and blank
//! lines survive.

use serde_yaml::Value;

use crate::ast::{render, unquote, Document, Entry, Item};
use crate::error::{FlowdocError, Result};
use crate::span::{Delta, Position, TransitionId};

pub(crate) struct Editor<'a> {
    doc: &'a Document,
    unit: usize,
}

impl<'a> Editor<'a> {
    pub fn new(doc: &'a Document, unit: usize) -> Self {
        Self { doc, unit }
    }

    fn tasks_entry(&self) -> Option<&'a Entry> {
        self.doc.root().get("tasks")
    }

    fn task_entries(&self) -> &'a [Entry] {
        self.tasks_entry().map_or(&[], |t| t.value.entries())
    }

    fn task(&self, name: &str) -> Result<&'a Entry> {
        self.tasks_entry()
            .and_then(|t| t.value.get(name))
            .ok_or_else(|| FlowdocError::TaskNotFound {
                name: name.to_string(),
            })
    }

    fn rule(&self, id: &TransitionId) -> Result<(&'a Entry, &'a Item)> {
        let not_found = || FlowdocError::TransitionNotFound {
            from: id.from.clone(),
            index: id.index,
        };
        let next = self.task(&id.from)?.value.get("next").ok_or_else(not_found)?;
        let item = next.value.items().get(id.index).ok_or_else(not_found)?;
        Ok((next, item))
    }

    /// Value of the `do:` of a rule, from the value view
    fn do_value(&self, task: &str, index: usize) -> Option<&'a Value> {
        self.doc
            .value()
            .get("tasks")?
            .get(task)?
            .get("next")?
            .get(index)?
            .get("do")
    }

    fn remove_rows(&self, first: usize, last: usize) -> Delta {
        Delta::remove(self.doc.rows_range(first, last))
    }

    // ═══════════════════════════════════════════
    // TASKS
    // ═══════════════════════════════════════════

    pub fn add_task(&self, name: &str, body: &Value) -> Result<Vec<Delta>> {
        let root = self.doc.root();
        if !root.is_mapping() && !root.is_empty() {
            return Err(FlowdocError::InvalidProperty {
                name: "tasks".to_string(),
                reason: "document root is not a mapping".to_string(),
            });
        }

        let delta = match self.tasks_entry() {
            Some(tasks) if tasks.value.is_mapping() => {
                let column = tasks.value.entries()[0].key_range.start.column;
                let block = render::entry(name, body, column, self.unit);
                self.doc.insert_after_row(tasks.value.range.end.row, &block)
            }
            Some(tasks) if tasks.value.is_empty() => {
                let column = tasks.key_range.start.column + self.unit;
                let block = render::entry(name, body, column, self.unit);
                self.doc.insert_after_row(tasks.key_range.start.row, &block)
            }
            Some(_) => {
                return Err(FlowdocError::InvalidProperty {
                    name: "tasks".to_string(),
                    reason: "expected a mapping of task names".to_string(),
                })
            }
            None => {
                let block = format!("tasks:\n{}", render::entry(name, body, self.unit, self.unit));
                match self.doc.lines().len() {
                    0 => Delta::insert(self.doc.end_position(), block),
                    rows => self.doc.insert_after_row(rows - 1, &block),
                }
            }
        };
        Ok(vec![delta])
    }

    /// Set, replace or (with `Null`) remove one task property
    pub fn set_property(&self, task: &str, key: &str, value: &Value) -> Result<Vec<Delta>> {
        let entry = self.task(task)?;
        let body = &entry.value;

        if body.is_empty() {
            if value.is_null() {
                return Ok(Vec::new());
            }
            let column = entry.key_range.start.column + self.unit;
            let block = render::entry(key, value, column, self.unit);
            return Ok(vec![self.doc.insert_after_row(entry.key_range.start.row, &block)]);
        }
        if !body.is_mapping() {
            return Err(FlowdocError::InvalidProperty {
                name: task.to_string(),
                reason: "task body is not a mapping".to_string(),
            });
        }

        let column = body.entries()[0].key_range.start.column;
        let Some(existing) = body.get(key) else {
            if value.is_null() {
                return Ok(Vec::new());
            }
            let block = render::entry(key, value, column, self.unit);
            let delta = if key == "action" {
                Delta::insert(Position::new(body.range.start.row, 0), block)
            } else {
                self.doc.insert_after_row(body.range.end.row, &block)
            };
            return Ok(vec![delta]);
        };

        let (first, last) = (existing.range.start.row, existing.range.end.row);
        if value.is_null() {
            return Ok(vec![self.remove_rows(first, last)]);
        }

        let inline = !matches!(value, Value::Mapping(m) if !m.is_empty())
            && !matches!(value, Value::Sequence(s) if !s.is_empty());
        let delta = if inline && existing.value.as_scalar().is_some() && first == last {
            Delta::new(existing.value.range, render::scalar(value))
        } else if inline && existing.value.is_empty() {
            Delta::new(existing.value.range, format!(" {}", render::scalar(value)))
        } else {
            let block = render::entry(key, value, existing.key_range.start.column, self.unit);
            self.doc.replace_rows(first, last, &block)
        };
        Ok(vec![delta])
    }

    /// Rewrite the task key and every `do` reference to it
    pub fn rename_task(&self, old: &str, new: &str) -> Result<Vec<Delta>> {
        let entry = self.task(old)?;
        let mut edits = vec![Delta::new(entry.key_range, render::scalar(&Value::from(new)))];

        for task in self.task_entries() {
            let Some(next) = task.value.get("next") else {
                continue;
            };
            for (index, rule) in next.value.items().iter().enumerate() {
                let Some(do_entry) = rule.value.get("do") else {
                    continue;
                };
                if do_entry.value.is_sequence() {
                    for target in do_entry.value.items() {
                        if target.value.as_scalar().map(unquote).as_deref() == Some(old) {
                            edits.push(Delta::new(target.value.range, render::scalar(&Value::from(new))));
                        }
                    }
                    continue;
                }
                let original = self.do_value(&task.key, index);
                let names = do_names(original);
                if names.iter().any(|n| n == old) {
                    let renamed: Vec<String> = names
                        .into_iter()
                        .map(|n| if n == old { new.to_string() } else { n })
                        .collect();
                    edits.push(Delta::new(do_entry.value.range, render_do(original, &renamed)));
                }
            }
        }
        Ok(edits)
    }

    /// Remove a task block and every `do` reference to it. A rule left
    /// without targets goes away, and so does a `next:` left without rules.
    pub fn delete_task(&self, name: &str) -> Result<Vec<Delta>> {
        let entry = self.task(name)?;
        let mut edits = vec![self.remove_rows(entry.range.start.row, entry.range.end.row)];

        for task in self.task_entries().iter().filter(|t| t.key != name) {
            let Some(next) = task.value.get("next") else {
                continue;
            };
            let rules = next.value.items();
            let mut dropped = Vec::new();
            let mut partial = Vec::new();

            for (index, rule) in rules.iter().enumerate() {
                let Some(do_entry) = rule.value.get("do") else {
                    continue;
                };
                let original = self.do_value(&task.key, index);
                let names = do_names(original);
                if !names.iter().any(|n| n == name) {
                    continue;
                }
                let remaining: Vec<String> = names.into_iter().filter(|n| n != name).collect();
                if remaining.is_empty() {
                    dropped.push(rule);
                } else if do_entry.value.is_sequence() {
                    for target in do_entry.value.items() {
                        if target.value.as_scalar().map(unquote).as_deref() == Some(name) {
                            partial.push(self.remove_rows(target.range.start.row, target.range.end.row));
                        }
                    }
                } else {
                    partial.push(Delta::new(do_entry.value.range, render_do(original, &remaining)));
                }
            }

            if !dropped.is_empty() && dropped.len() == rules.len() {
                edits.push(self.remove_rows(next.range.start.row, next.range.end.row));
            } else {
                edits.extend(
                    dropped
                        .iter()
                        .map(|rule| self.remove_rows(rule.range.start.row, rule.range.end.row)),
                );
                edits.extend(partial);
            }
        }
        Ok(edits)
    }

    // ═══════════════════════════════════════════
    // TRANSITIONS
    // ═══════════════════════════════════════════

    /// Append a rule to a task's `next:`, creating the key if needed
    pub fn add_rule(&self, task: &str, rule: &Value) -> Result<Vec<Delta>> {
        let entry = self.task(task)?;
        let body = &entry.value;
        let rules = Value::Sequence(vec![rule.clone()]);

        let delta = if body.is_empty() {
            let column = entry.key_range.start.column + self.unit;
            let block = render::entry("next", &rules, column, self.unit);
            self.doc.insert_after_row(entry.key_range.start.row, &block)
        } else if let Some(next) = body.get("next") {
            if next.value.is_sequence() {
                let column = next.value.items()[0].range.start.column;
                let block = render::item(rule, column, self.unit);
                self.doc.insert_after_row(next.value.range.end.row, &block)
            } else if next.value.is_empty() {
                let column = next.key_range.start.column + self.unit;
                let block = render::item(rule, column, self.unit);
                self.doc.insert_after_row(next.key_range.start.row, &block)
            } else {
                return Err(FlowdocError::InvalidProperty {
                    name: "next".to_string(),
                    reason: "expected a list of rules".to_string(),
                });
            }
        } else if body.is_mapping() {
            let column = body.entries()[0].key_range.start.column;
            let block = render::entry("next", &rules, column, self.unit);
            self.doc.insert_after_row(body.range.end.row, &block)
        } else {
            return Err(FlowdocError::InvalidProperty {
                name: task.to_string(),
                reason: "task body is not a mapping".to_string(),
            });
        };
        Ok(vec![delta])
    }

    pub fn replace_rule(&self, id: &TransitionId, rule: &Value) -> Result<Vec<Delta>> {
        let (_, item) = self.rule(id)?;
        let block = render::item(rule, item.range.start.column, self.unit);
        Ok(vec![self
            .doc
            .replace_rows(item.range.start.row, item.range.end.row, &block)])
    }

    pub fn delete_rule(&self, id: &TransitionId) -> Result<Vec<Delta>> {
        let (next, item) = self.rule(id)?;
        let delta = if next.value.items().len() == 1 {
            self.remove_rows(next.range.start.row, next.range.end.row)
        } else {
            self.remove_rows(item.range.start.row, item.range.end.row)
        };
        Ok(vec![delta])
    }
}

/// Every name in a `do:` value, engine commands included
fn do_names(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Sequence(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        Some(Value::String(list)) => list
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

/// Inline `do:` text in the style of the original value
fn render_do(original: Option<&Value>, names: &[String]) -> String {
    match original {
        Some(Value::String(_)) => render::scalar(&Value::from(names.join(", "))),
        _ => {
            let items: Vec<String> = names
                .iter()
                .map(|n| render::scalar(&Value::from(n.as_str())))
                .collect();
            format!("[{}]", items.join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const WORKFLOW: &str = "\
version: 1.0
tasks:
  t1:
    action: core.local   # run
    next:
      - when: <% succeeded() %>
        do:
          - a
          - b
      - do: a
  a:
    action: core.noop
  b:
    next:
      - do: a, t1
";

    fn apply(text: &str, plan: impl FnOnce(&Editor) -> Result<Vec<Delta>>) -> String {
        let doc = Document::parse(text).unwrap();
        let edits = plan(&Editor::new(&doc, 2)).unwrap();
        let (patched, _) = doc.apply_edits(&edits).unwrap();
        patched.text().to_string()
    }

    #[test]
    fn add_task_appends_after_last_task() {
        let body: Value = serde_yaml::from_str("action: core.echo").unwrap();
        let text = apply(WORKFLOW, |ed| ed.add_task("c", &body));
        assert!(text.ends_with("      - do: a, t1\n  c:\n    action: core.echo\n"));
    }

    #[test]
    fn add_task_creates_tasks_key() {
        let text = apply("version: 1.0", |ed| ed.add_task("t1", &Value::Null));
        assert_eq!(text, "version: 1.0\ntasks:\n  t1:\n");
        let text = apply("", |ed| ed.add_task("t1", &Value::Null));
        assert_eq!(text, "tasks:\n  t1:\n");
        let text = apply("tasks:\n", |ed| ed.add_task("t1", &Value::Null));
        assert_eq!(text, "tasks:\n  t1:\n");
    }

    #[test]
    fn set_property_replaces_scalar_in_place() {
        let text = apply(WORKFLOW, |ed| {
            ed.set_property("t1", "action", &Value::from("core.remote"))
        });
        assert!(text.contains("    action: core.remote   # run\n"));
    }

    #[test]
    fn set_property_inserts_and_removes() {
        let text = apply(WORKFLOW, |ed| ed.set_property("b", "action", &Value::from("core.x")));
        assert!(text.contains("  b:\n    action: core.x\n    next:\n"));

        let input: Value = serde_yaml::from_str("cmd: ls").unwrap();
        let text = apply(WORKFLOW, |ed| ed.set_property("a", "input", &input));
        assert!(text.contains("  a:\n    action: core.noop\n    input:\n      cmd: ls\n  b:\n"));

        let text = apply(WORKFLOW, |ed| ed.set_property("a", "action", &Value::Null));
        assert!(text.contains("  a:\n  b:\n"));
    }

    #[test]
    fn rename_rewrites_key_and_references() {
        let text = apply(WORKFLOW, |ed| ed.rename_task("a", "alpha"));
        assert!(text.contains("  alpha:\n    action: core.noop\n"));
        assert!(text.contains("          - alpha\n          - b\n"));
        assert!(text.contains("      - do: alpha\n"));
        assert!(text.contains("      - do: alpha, t1\n"));
        assert!(!text.contains("  a:\n"));
    }

    #[test]
    fn delete_task_cascades_through_rules() {
        let text = apply(WORKFLOW, |ed| ed.delete_task("a"));
        let expected = "\
version: 1.0
tasks:
  t1:
    action: core.local   # run
    next:
      - when: <% succeeded() %>
        do:
          - b
  b:
    next:
      - do: t1
";
        assert_eq!(text, expected);
    }

    #[test]
    fn delete_task_drops_emptied_next() {
        let text = apply(WORKFLOW, |ed| ed.delete_task("t1"));
        assert!(text.contains("  b:\n    next:\n      - do: a\n"));
        let text = apply("tasks:\n  x:\n    next:\n      - do: [y]\n  y:\n", |ed| {
            ed.delete_task("y")
        });
        assert_eq!(text, "tasks:\n  x:\n");
    }

    #[test]
    fn add_rule_variants() {
        let rule: Value = serde_yaml::from_str("do:\n  - t1\n").unwrap();
        let text = apply(WORKFLOW, |ed| ed.add_rule("a", &rule));
        assert!(text.contains("  a:\n    action: core.noop\n    next:\n      - do:\n          - t1\n  b:\n"));

        let text = apply(WORKFLOW, |ed| ed.add_rule("b", &rule));
        assert!(text.ends_with("      - do: a, t1\n      - do:\n          - t1\n"));
    }

    #[test]
    fn replace_and_delete_rule() {
        let rule: Value = serde_yaml::from_str("when: <% failed() %>\ndo:\n  - b\n").unwrap();
        let text = apply(WORKFLOW, |ed| ed.replace_rule(&TransitionId::new("t1", 1), &rule));
        assert!(text.contains("      - when: <% failed() %>\n        do:\n          - b\n  a:\n"));

        let text = apply(WORKFLOW, |ed| ed.delete_rule(&TransitionId::new("t1", 0)));
        assert!(text.contains("    next:\n      - do: a\n  a:\n"));

        let text = apply(WORKFLOW, |ed| ed.delete_rule(&TransitionId::new("b", 0)));
        assert!(text.ends_with("  b:\n"));

        let doc = Document::parse(WORKFLOW).unwrap();
        let err = Editor::new(&doc, 2)
            .delete_rule(&TransitionId::new("t1", 9))
            .unwrap_err();
        assert!(matches!(err, FlowdocError::TransitionNotFound { index: 9, .. }));
    }
}
