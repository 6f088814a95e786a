//! Task - one named unit of work, its properties and its sectors

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use crate::error::{FlowdocError, Result};
use crate::graph::Coords;
use crate::span::{Position, Range, Sector, SectorOwner, SectorType};

/// Engine commands allowed in `do:` that are not tasks
pub const ENGINE_COMMANDS: &[&str] = &["fail", "noop", "continue", "retry"];

/// Well-known task property names plus an open extension slot
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PropertyName {
    Action,
    Input,
    Next,
    Join,
    With,
    Retry,
    Delay,
    Other(String),
}

impl PropertyName {
    pub fn as_str(&self) -> &str {
        match self {
            PropertyName::Action => "action",
            PropertyName::Input => "input",
            PropertyName::Next => "next",
            PropertyName::Join => "join",
            PropertyName::With => "with",
            PropertyName::Retry => "retry",
            PropertyName::Delay => "delay",
            PropertyName::Other(name) => name,
        }
    }

    pub fn is_well_known(&self) -> bool {
        !matches!(self, PropertyName::Other(_))
    }

    /// Check a value against the shape the property expects
    pub fn validate(&self, value: &Value) -> Result<()> {
        let ok = match self {
            PropertyName::Action => matches!(value, Value::String(s) if !s.trim().is_empty()),
            PropertyName::Input => matches!(value, Value::Mapping(_) | Value::Null),
            PropertyName::Next => matches!(value, Value::Sequence(_) | Value::Null),
            PropertyName::Join => matches!(value, Value::String(_) | Value::Number(_)),
            PropertyName::With => matches!(value, Value::String(_) | Value::Mapping(_)),
            PropertyName::Retry => matches!(value, Value::Mapping(_)),
            PropertyName::Delay => matches!(value, Value::Number(_) | Value::String(_)),
            PropertyName::Other(name) => {
                if name.trim().is_empty() {
                    return Err(FlowdocError::InvalidProperty {
                        name: name.clone(),
                        reason: "property name is empty".to_string(),
                    });
                }
                true
            }
        };
        if ok {
            Ok(())
        } else {
            Err(FlowdocError::InvalidProperty {
                name: self.as_str().to_string(),
                reason: format!("unexpected value {}", type_name(value)),
            })
        }
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Sequence(_) => "list",
        Value::Mapping(_) => "mapping",
        Value::Tagged(_) => "tagged value",
    }
}

impl From<&str> for PropertyName {
    fn from(name: &str) -> Self {
        match name {
            "action" => PropertyName::Action,
            "input" => PropertyName::Input,
            "next" => PropertyName::Next,
            "join" => PropertyName::Join,
            "with" => PropertyName::With,
            "retry" => PropertyName::Retry,
            "delay" => PropertyName::Delay,
            other => PropertyName::Other(other.to_string()),
        }
    }
}

impl fmt::Display for PropertyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Task properties in source order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskProperties {
    entries: Vec<(PropertyName, Value)>,
}

impl TaskProperties {
    pub fn get(&self, name: &PropertyName) -> Option<&Value> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Replace in place, or append
    pub fn set(&mut self, name: PropertyName, value: Value) {
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn remove(&mut self, name: &PropertyName) -> Option<Value> {
        let index = self.entries.iter().position(|(n, _)| n == name)?;
        Some(self.entries.remove(index).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PropertyName, &Value)> {
        self.entries.iter().map(|(n, v)| (n, v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub name: String,
    pub properties: TaskProperties,
    sectors: Vec<Sector>,
}

impl Task {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: TaskProperties::default(),
            sectors: Vec::new(),
        }
    }

    /// A task block that has been started but has no properties yet
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    pub fn get_property(&self, name: &str) -> Option<&Value> {
        self.properties.get(&PropertyName::from(name))
    }

    pub fn set_property(&mut self, name: &str, value: Value) -> Result<()> {
        let name = PropertyName::from(name);
        name.validate(&value)?;
        self.properties.set(name, value);
        Ok(())
    }

    pub fn action(&self) -> Option<&str> {
        self.get_property("action").and_then(Value::as_str)
    }

    pub fn sectors(&self) -> &[Sector] {
        &self.sectors
    }

    /// First sector of a kind
    pub fn get_sector(&self, kind: SectorType) -> Option<&Sector> {
        self.sectors.iter().find(|s| s.kind == kind)
    }

    pub fn get_labeled_sector(&self, kind: SectorType, label: &str) -> Option<&Sector> {
        self.sectors
            .iter()
            .find(|s| s.kind == kind && s.label.as_deref() == Some(label))
    }

    /// Attach a sector; replaces the one with the same kind and label.
    /// Variable sectors accumulate, one per reference.
    pub fn set_sector(&mut self, mut sector: Sector) {
        sector.owner = SectorOwner::Task(self.name.clone());
        if sector.kind != SectorType::Variable {
            if let Some(existing) = self
                .sectors
                .iter_mut()
                .find(|s| s.kind == sector.kind && s.label == sector.label)
            {
                *existing = sector;
                return;
            }
        }
        self.sectors.push(sector);
    }

    /// Move the start of a sector, opening an empty one if it does not exist
    pub fn start_sector(&mut self, kind: SectorType, row: usize, column: usize) {
        match self.sectors.iter_mut().find(|s| s.kind == kind) {
            Some(sector) => sector.range.set_start(row, column),
            None => {
                let at = Position::new(row, column);
                self.set_sector(Sector::new(kind, Range::empty_at(at)));
            }
        }
    }

    /// Move the end of an existing sector; false when there is none
    pub fn end_sector(&mut self, kind: SectorType, row: usize, column: usize) -> bool {
        match self.sectors.iter_mut().find(|s| s.kind == kind) {
            Some(sector) => {
                sector.range.set_end(row, column);
                true
            }
            None => false,
        }
    }

    pub(crate) fn sectors_mut(&mut self) -> &mut Vec<Sector> {
        &mut self.sectors
    }

    pub fn data(&self) -> TaskData {
        TaskData {
            name: self.name.clone(),
            action: self.action().map(str::to_string),
            input: self.get_property("input").cloned(),
            coords: None,
        }
    }
}

/// Input of `add_task`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskData {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coords: Option<Coords>,
}

impl TaskData {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    pub fn with_coords(mut self, coords: Coords) -> Self {
        self.coords = Some(coords);
        self
    }
}

/// Input of `update_task`; `None` fields are left alone
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub input: Option<Value>,
    #[serde(default)]
    pub coords: Option<Coords>,
}

impl TaskUpdate {
    /// Only layout changes, nothing to write into the text
    pub fn is_layout_only(&self) -> bool {
        self.name.is_none() && self.action.is_none() && self.input.is_none()
    }
}

/// Task names become YAML keys and graph ids
pub fn validate_task_name(name: &str) -> Result<()> {
    let reason = if name.is_empty() {
        Some("name is empty")
    } else if name.chars().any(char::is_whitespace) {
        Some("name contains whitespace")
    } else if name.starts_with('-') {
        Some("name starts with '-'")
    } else if name
        .chars()
        .any(|c| ":#{}[],&*!|>'\"%@`".contains(c))
    {
        Some("name contains a YAML indicator character")
    } else if ENGINE_COMMANDS.contains(&name) {
        Some("name is reserved for an engine command")
    } else {
        None
    };
    match reason {
        Some(reason) => Err(FlowdocError::InvalidTaskName {
            name: name.to_string(),
            reason: reason.to_string(),
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_task_is_empty() {
        let mut task = Task::new("t1");
        assert!(task.is_empty());
        task.set_property("action", Value::from("core.local")).unwrap();
        assert!(!task.is_empty());
        assert_eq!(task.action(), Some("core.local"));
    }

    #[test]
    fn set_property_validates_well_known_shapes() {
        let mut task = Task::new("t1");
        let err = task.set_property("action", Value::from(3)).unwrap_err();
        assert!(matches!(err, FlowdocError::InvalidProperty { .. }));
        let err = task.set_property("input", Value::from("x")).unwrap_err();
        assert!(err.to_string().contains("input"));
        task.set_property("custom", Value::from(true)).unwrap();
        assert_eq!(task.get_property("custom"), Some(&Value::Bool(true)));
    }

    #[test]
    fn properties_keep_insertion_order() {
        let mut props = TaskProperties::default();
        props.set(PropertyName::Action, Value::from("a"));
        props.set(PropertyName::Other("x".into()), Value::from(1));
        props.set(PropertyName::Action, Value::from("b"));
        let names: Vec<_> = props.iter().map(|(n, _)| n.as_str().to_string()).collect();
        assert_eq!(names, vec!["action", "x"]);
        assert_eq!(props.get(&PropertyName::Action), Some(&Value::from("b")));
    }

    #[test]
    fn ref_sector_grows_while_typing() {
        let mut task = Task::new("t1");
        task.start_sector(SectorType::Ref, 2, 12);
        assert!(task.get_sector(SectorType::Ref).unwrap().range.is_empty());
        for column in 13..=16 {
            assert!(task.end_sector(SectorType::Ref, 2, column));
        }
        let sector = task.get_sector(SectorType::Ref).unwrap();
        assert_eq!(sector.range, Range::from_points((2, 12), (2, 16)));
        assert_eq!(sector.task_name(), Some("t1"));
        assert!(!task.end_sector(SectorType::Input, 2, 0));
    }

    #[test]
    fn set_sector_replaces_same_kind_and_label() {
        let mut task = Task::new("t1");
        task.set_sector(Sector::new(SectorType::Property, Range::default()).with_label("join"));
        task.set_sector(Sector::new(SectorType::Property, Range::default()).with_label("with"));
        task.set_sector(
            Sector::new(SectorType::Property, Range::from_points((1, 0), (1, 4))).with_label("join"),
        );
        assert_eq!(task.sectors().len(), 2);
        let join = task.get_labeled_sector(SectorType::Property, "join").unwrap();
        assert_eq!(join.range.end, Position::new(1, 4));
    }

    #[test]
    fn task_name_rules() {
        assert!(validate_task_name("build_1").is_ok());
        assert!(validate_task_name("a.b-c").is_ok());
        for bad in ["", "a b", "a:b", "-x", "t1->a", "noop", "#c"] {
            assert!(validate_task_name(bad).is_err(), "{bad} should be rejected");
        }
    }
}
