//! Sector - a typed range tied to the construct it covers
//!
//! A sector never points at its owner directly; it stores the owner's
//! identity (task name or transition id) which the model resolves.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{Delta, Position, Range};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectorType {
    /// Whole task block (name through last property line)
    Task,
    /// Task name key
    Name,
    /// Action reference value (`action: core.local`)
    Ref,
    /// Task `input:` block
    Input,
    /// Any other task property entry, labelled with its key
    Property,
    /// One `next:` rule
    Transition,
    /// `when:` condition value
    When,
    /// `publish:` block
    Publish,
    /// `do:` target list
    Do,
    /// Variable declaration or `ctx()` reference
    Variable,
}

impl SectorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SectorType::Task => "task",
            SectorType::Name => "name",
            SectorType::Ref => "ref",
            SectorType::Input => "input",
            SectorType::Property => "property",
            SectorType::Transition => "transition",
            SectorType::When => "when",
            SectorType::Publish => "publish",
            SectorType::Do => "do",
            SectorType::Variable => "variable",
        }
    }
}

impl std::fmt::Display for SectorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SectorType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "task" => SectorType::Task,
            "name" => SectorType::Name,
            "ref" | "action" => SectorType::Ref,
            "input" => SectorType::Input,
            "property" => SectorType::Property,
            "transition" => SectorType::Transition,
            "when" => SectorType::When,
            "publish" => SectorType::Publish,
            "do" => SectorType::Do,
            "variable" => SectorType::Variable,
            other => return Err(format!("unknown sector type '{}'", other)),
        })
    }
}

/// Identity of a transition: the task it leaves from and its index under `next:`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TransitionId {
    pub from: String,
    pub index: usize,
}

impl TransitionId {
    pub fn new(from: impl Into<String>, index: usize) -> Self {
        Self {
            from: from.into(),
            index,
        }
    }
}

impl std::fmt::Display for TransitionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.from, self.index)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum SectorOwner {
    #[default]
    Workflow,
    Task(String),
    Transition(TransitionId),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sector {
    #[serde(rename = "type")]
    pub kind: SectorType,
    pub range: Range,
    pub owner: SectorOwner,
    /// Property key for `property` sectors, variable name for `variable` ones
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl Sector {
    pub fn new(kind: SectorType, range: Range) -> Self {
        Self {
            kind,
            range,
            owner: SectorOwner::Workflow,
            label: None,
        }
    }

    pub fn with_task(mut self, name: impl Into<String>) -> Self {
        self.owner = SectorOwner::Task(name.into());
        self
    }

    pub fn with_transition(mut self, id: TransitionId) -> Self {
        self.owner = SectorOwner::Transition(id);
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn set_type(&mut self, kind: SectorType) -> &mut Self {
        self.kind = kind;
        self
    }

    pub fn set_task(&mut self, name: impl Into<String>) -> &mut Self {
        self.owner = SectorOwner::Task(name.into());
        self
    }

    pub fn contains(&self, point: Position) -> bool {
        self.range.contains(point)
    }

    /// Task this sector belongs to, directly or through its transition
    pub fn task_name(&self) -> Option<&str> {
        match &self.owner {
            SectorOwner::Task(name) => Some(name),
            SectorOwner::Transition(id) => Some(&id.from),
            SectorOwner::Workflow => None,
        }
    }

    /// Shift through an edit; false when the edit removed the sector's text
    pub fn apply_edit(&mut self, delta: &Delta) -> bool {
        self.range.apply_edit(delta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fluent_construction() {
        let sector = Sector::new(SectorType::Ref, Range::from_points((3, 12), (3, 22)))
            .with_task("t1");
        assert_eq!(sector.owner, SectorOwner::Task("t1".into()));
        assert_eq!(sector.task_name(), Some("t1"));
        assert!(sector.contains(Position::new(3, 22)));
    }

    #[test]
    fn chained_setters_mutate_in_place() {
        let mut sector = Sector::new(SectorType::Task, Range::default());
        sector.set_type(SectorType::Name).set_task("a");
        assert_eq!(sector.kind, SectorType::Name);
        assert_eq!(sector.task_name(), Some("a"));
    }

    #[test]
    fn transition_owner_resolves_to_source_task() {
        let sector = Sector::new(SectorType::Do, Range::default())
            .with_transition(TransitionId::new("t1", 2));
        assert_eq!(sector.task_name(), Some("t1"));
        assert_eq!(TransitionId::new("t1", 2).to_string(), "t1#2");
    }

    #[test]
    fn sector_type_parses_from_str() {
        assert_eq!("do".parse::<SectorType>(), Ok(SectorType::Do));
        assert_eq!("action".parse::<SectorType>(), Ok(SectorType::Ref));
        assert!("bogus".parse::<SectorType>().is_err());
    }

    #[test]
    fn serializes_type_field() {
        let sector = Sector::new(SectorType::Variable, Range::default()).with_label("x");
        let json = serde_json::to_value(&sector).unwrap();
        assert_eq!(json["type"], "variable");
        assert_eq!(json["label"], "x");
        assert_eq!(json["owner"]["kind"], "workflow");
    }
}
