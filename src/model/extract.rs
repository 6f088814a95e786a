//! Extraction of tasks, transitions and sectors from a parsed document
//!
//! Values come from the `serde_yaml::Value` view, ranges from the node tree.
//! Both views describe the same text, so entries line up by key and index.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_yaml::Value;

use crate::ast::{render, unquote, Document, Entry, Node, TokenKind};
use crate::span::{Position, Range, Sector, SectorOwner, SectorType, TransitionId};

use super::meta::{params, WorkflowMeta};
use super::task::{PropertyName, Task, ENGINE_COMMANDS};
use super::transition::{Publish, Transition};

/// `ctx().name`, `ctx(name)`, `ctx('name')`, `ctx("name")`; the name may be
/// missing right after `ctx().` while typing
static VARIABLE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"ctx\(\s*\)\.([A-Za-z_][A-Za-z0-9_]*)?|ctx\(\s*['"]?([A-Za-z_][A-Za-z0-9_]*)['"]?\s*\)"#)
        .unwrap()
});

#[derive(Debug, Default)]
pub(crate) struct Extraction {
    pub tasks: Vec<Task>,
    pub transitions: Vec<Transition>,
    pub meta: WorkflowMeta,
    /// Sectors owned by the workflow itself
    pub sectors: Vec<Sector>,
}

pub(crate) fn extract(doc: &Document) -> Extraction {
    let root = doc.root();
    let value = doc.value();
    let mut out = Extraction {
        meta: meta(root, value),
        ..Extraction::default()
    };

    for key in ["input", "vars"] {
        if let Some(entry) = root.get(key) {
            out.sectors.extend(declarations(&entry.value));
        }
    }

    if let Some(tasks) = root.get("tasks") {
        let bodies = value.get("tasks");
        for entry in tasks.value.entries() {
            let body = bodies.and_then(|b| b.get(entry.key.as_str()));
            let (task, transitions) = task(doc, entry, body);
            out.tasks.push(task);
            out.transitions.extend(transitions);
        }
    }

    variables(doc, &mut out);
    out
}

fn meta(root: &Node, value: &Value) -> WorkflowMeta {
    let raw = |key: &str| {
        root.get(key)
            .and_then(|e| e.value.as_scalar())
            .map(unquote)
    };
    WorkflowMeta {
        version: raw("version"),
        description: value
            .get("description")
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| raw("description")),
        input: params(value.get("input")),
        vars: params(value.get("vars")),
    }
}

/// Range of an entry; an entry without a value runs to the end of its line
fn entry_span(doc: &Document, entry: &Entry) -> Range {
    if entry.value.is_empty() {
        let row = entry.key_range.start.row;
        Range::new(
            entry.range.start,
            Position::new(row, doc.row_width(row).unwrap_or(entry.range.end.column)),
        )
    } else {
        entry.range
    }
}

/// Range of an entry's value; an empty value runs from the colon to the end of line
fn value_span(doc: &Document, entry: &Entry) -> Range {
    if entry.value.is_empty() {
        let anchor = entry.value.range.start;
        Range::new(
            anchor,
            Position::new(anchor.row, doc.row_width(anchor.row).unwrap_or(anchor.column)),
        )
    } else {
        entry.value.range
    }
}

fn declarations(list: &Node) -> Vec<Sector> {
    let mut sectors = Vec::new();
    for item in list.items() {
        if let Some(raw) = item.value.as_scalar() {
            sectors.push(
                Sector::new(SectorType::Variable, item.value.range).with_label(unquote(raw)),
            );
        } else if let Some(first) = item.value.entries().first() {
            sectors.push(Sector::new(SectorType::Variable, first.key_range).with_label(&first.key));
        }
    }
    for entry in list.entries() {
        sectors.push(Sector::new(SectorType::Variable, entry.key_range).with_label(&entry.key));
    }
    sectors
}

fn task(doc: &Document, entry: &Entry, body: Option<&Value>) -> (Task, Vec<Transition>) {
    let name = entry.key.clone();
    let mut task = Task::new(&name);

    if let Some(Value::Mapping(map)) = body {
        for (key, value) in map {
            if let Some(key) = key.as_str() {
                task.properties.set(PropertyName::from(key), value.clone());
            }
        }
    }

    task.set_sector(Sector::new(SectorType::Task, entry_span(doc, entry)));
    task.set_sector(Sector::new(SectorType::Name, entry.key_range));

    let mut transitions = Vec::new();
    for property in entry.value.entries() {
        match property.key.as_str() {
            "action" => task.set_sector(Sector::new(SectorType::Ref, value_span(doc, property))),
            "input" => task.set_sector(Sector::new(SectorType::Input, entry_span(doc, property))),
            "next" => {
                let rules = body
                    .and_then(|b| b.get("next"))
                    .and_then(Value::as_sequence);
                for (index, item) in property.value.items().iter().enumerate() {
                    let rule = rules.and_then(|r| r.get(index));
                    let id = TransitionId::new(&name, index);
                    let range = if item.value.is_empty() {
                        let row = item.range.start.row;
                        Range::new(
                            item.range.start,
                            Position::new(row, doc.row_width(row).unwrap_or(item.range.end.column)),
                        )
                    } else {
                        item.range
                    };
                    transitions.push(transition(doc, id, range, &item.value, rule));
                }
                task.set_sector(
                    Sector::new(SectorType::Property, entry_span(doc, property)).with_label("next"),
                );
            }
            other => task.set_sector(
                Sector::new(SectorType::Property, entry_span(doc, property)).with_label(other),
            ),
        }
    }

    (task, transitions)
}

fn transition(
    doc: &Document,
    id: TransitionId,
    range: Range,
    node: &Node,
    rule: Option<&Value>,
) -> Transition {
    let owner = SectorOwner::Transition(id.clone());
    let mut sectors = vec![Sector::new(SectorType::Transition, range)];
    for entry in node.entries() {
        let sector = match entry.key.as_str() {
            "when" => Sector::new(SectorType::When, value_span(doc, entry)),
            "publish" => Sector::new(SectorType::Publish, entry_span(doc, entry)),
            "do" => Sector::new(SectorType::Do, entry_span(doc, entry)),
            _ => continue,
        };
        sectors.push(sector);
    }
    for sector in &mut sectors {
        sector.owner = owner.clone();
    }

    let condition = rule.and_then(|r| r.get("when")).and_then(|w| match w {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(render::scalar(other)),
    });

    Transition {
        from: id.from.clone(),
        id,
        to: targets(rule.and_then(|r| r.get("do"))),
        condition,
        publish: publish(rule.and_then(|r| r.get("publish"))),
        sectors,
    }
}

/// Task names in a `do:` value, engine commands dropped
pub(crate) fn targets(value: Option<&Value>) -> Vec<String> {
    let names: Vec<String> = match value {
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
    };
    names
        .into_iter()
        .filter(|n| !ENGINE_COMMANDS.contains(&n.as_str()))
        .collect()
}

fn publish(value: Option<&Value>) -> Vec<Publish> {
    let mut out = Vec::new();
    let mut push_map = |map: &serde_yaml::Mapping| {
        for (k, v) in map {
            if let Some(name) = k.as_str() {
                out.push(Publish::new(name, v.clone()));
            }
        }
    };
    match value {
        Some(Value::Sequence(items)) => {
            for item in items {
                match item {
                    Value::Mapping(map) => push_map(map),
                    Value::String(name) => push_map(&{
                        let mut map = serde_yaml::Mapping::new();
                        map.insert(Value::from(name.as_str()), Value::Null);
                        map
                    }),
                    _ => {}
                }
            }
        }
        Some(Value::Mapping(map)) => push_map(map),
        _ => {}
    }
    out
}

/// Variable reference sectors, attached to the innermost owner
fn variables(doc: &Document, out: &mut Extraction) {
    for (row, line) in doc.lines().iter().enumerate() {
        for token in line
            .tokens
            .iter()
            .filter(|t| matches!(t.kind, TokenKind::Scalar | TokenKind::Key))
        {
            for caps in VARIABLE_PATTERN.captures_iter(&token.text) {
                let Some(whole) = caps.get(0) else { continue };
                let name = caps
                    .get(1)
                    .or_else(|| caps.get(2))
                    .map_or("", |m| m.as_str());
                let start = token.column + token.text[..whole.start()].chars().count();
                let end = token.column + token.text[..whole.end()].chars().count();
                let sector = Sector::new(
                    SectorType::Variable,
                    Range::new(Position::new(row, start), Position::new(row, end)),
                )
                .with_label(name);
                attach_variable(out, sector);
            }
        }
    }
}

fn attach_variable(out: &mut Extraction, mut sector: Sector) {
    let at = sector.range.start;
    if let Some(transition) = out.transitions.iter_mut().find(|t| {
        t.get_sector(SectorType::Transition)
            .is_some_and(|s| s.range.contains_range(&sector.range))
    }) {
        sector.owner = SectorOwner::Transition(transition.id.clone());
        transition.sectors.push(sector);
        return;
    }
    if let Some(task) = out.tasks.iter_mut().find(|t| {
        t.get_sector(SectorType::Task)
            .is_some_and(|s| s.range.contains(at))
    }) {
        task.set_sector(sector);
        return;
    }
    out.sectors.push(sector);
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const WORKFLOW: &str = "\
version: 1.0
description: demo
input:
  - name
  - retries: 3
tasks:
  t1:
    action: core.local
    input:
      cmd: echo <% ctx().name %>
    next:
      - when: <% succeeded() and ctx(retries) > 0 %>
        publish:
          - out: <% result() %>
        do:
          - a
          - noop
      - do: a, b
  a:
    action: core.noop
  b:
";

    fn extracted() -> Extraction {
        extract(&Document::parse(WORKFLOW).unwrap())
    }

    #[test]
    fn meta_from_top_level_keys() {
        let meta = extracted().meta;
        assert_eq!(meta.version.as_deref(), Some("1.0"));
        assert_eq!(meta.description.as_deref(), Some("demo"));
        assert_eq!(meta.input.len(), 2);
        assert_eq!(meta.input[1].name, "retries");
    }

    #[test]
    fn tasks_with_properties_and_sectors() {
        let out = extracted();
        let names: Vec<_> = out.tasks.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["t1", "a", "b"]);

        let t1 = &out.tasks[0];
        assert_eq!(t1.action(), Some("core.local"));
        assert_eq!(
            t1.get_sector(SectorType::Ref).unwrap().range,
            Range::from_points((7, 12), (7, 22))
        );
        assert_eq!(
            t1.get_sector(SectorType::Name).unwrap().range,
            Range::from_points((6, 2), (6, 4))
        );
        assert_eq!(
            t1.get_sector(SectorType::Task).unwrap().range,
            Range::from_points((6, 2), (17, 16))
        );
        assert!(out.tasks[2].is_empty());
        assert_eq!(
            out.tasks[2].get_sector(SectorType::Task).unwrap().range,
            Range::from_points((20, 2), (20, 4))
        );
    }

    #[test]
    fn transitions_from_next_rules() {
        let out = extracted();
        assert_eq!(out.transitions.len(), 2);
        let first = &out.transitions[0];
        assert_eq!(first.id, TransitionId::new("t1", 0));
        assert_eq!(first.to, vec!["a"]);
        assert_eq!(
            first.condition.as_deref(),
            Some("<% succeeded() and ctx(retries) > 0 %>")
        );
        assert_eq!(first.publish[0].name, "out");
        assert_eq!(
            first.get_sector(SectorType::Do).unwrap().range,
            Range::from_points((14, 8), (16, 16))
        );
        let second = &out.transitions[1];
        assert_eq!(second.to, vec!["a", "b"]);
        assert_eq!(
            second.get_sector(SectorType::Transition).unwrap().range,
            Range::from_points((17, 6), (17, 16))
        );
    }

    #[test]
    fn variable_sectors_attach_to_innermost_owner() {
        let out = extracted();
        let t1 = &out.tasks[0];
        let var = t1.get_sector(SectorType::Variable).unwrap();
        assert_eq!(var.label.as_deref(), Some("name"));
        assert_eq!(var.range, Range::from_points((9, 19), (9, 29)));

        let in_when = out.transitions[0]
            .sectors()
            .iter()
            .find(|s| s.kind == SectorType::Variable)
            .unwrap();
        assert_eq!(in_when.label.as_deref(), Some("retries"));
        assert_eq!(in_when.owner, SectorOwner::Transition(TransitionId::new("t1", 0)));

        let declared: Vec<_> = out
            .sectors
            .iter()
            .filter_map(|s| s.label.as_deref())
            .collect();
        assert_eq!(declared, vec!["name", "retries"]);
    }

    #[test]
    fn variable_pattern_forms() {
        let names: Vec<_> = VARIABLE_PATTERN
            .captures_iter("ctx().a ctx(b) ctx('c') ctx(\"d\") ctx().")
            .map(|c| c.get(1).or_else(|| c.get(2)).map_or("", |m| m.as_str()).to_string())
            .collect();
        assert_eq!(names, vec!["a", "b", "c", "d", ""]);
    }

    #[test]
    fn targets_accept_lists_and_strings() {
        let list: Value = serde_yaml::from_str("[a, fail, b]").unwrap();
        assert_eq!(targets(Some(&list)), vec!["a", "b"]);
        assert_eq!(targets(Some(&Value::from("a, b ,continue"))), vec!["a", "b"]);
        assert!(targets(None).is_empty());
    }
}
