//! Transition - one `next:` rule routing a task to its successors

use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use crate::graph::edge_id;
use crate::span::{Sector, SectorType, TransitionId};

/// Reference to a task by name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskRef {
    pub name: String,
}

impl From<&str> for TaskRef {
    fn from(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

impl From<String> for TaskRef {
    fn from(name: String) -> Self {
        Self { name }
    }
}

/// One published variable: `- name: <expression>`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Publish {
    pub name: String,
    pub value: Value,
}

impl Publish {
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub id: TransitionId,
    pub from: String,
    /// Target task names in `do:` order; engine commands excluded
    pub to: Vec<String>,
    pub condition: Option<String>,
    pub publish: Vec<Publish>,
    pub(crate) sectors: Vec<Sector>,
}

impl Transition {
    pub fn sectors(&self) -> &[Sector] {
        &self.sectors
    }

    pub fn get_sector(&self, kind: SectorType) -> Option<&Sector> {
        self.sectors.iter().find(|s| s.kind == kind)
    }

    /// Graph edge for the (from, first target) pair
    pub fn edge_id(&self) -> Option<String> {
        self.to.first().map(|to| edge_id(&self.from, to))
    }

    pub fn data(&self) -> TransitionData {
        TransitionData {
            from: TaskRef::from(self.from.as_str()),
            to: self.to.iter().map(|n| TaskRef::from(n.as_str())).collect(),
            condition: self.condition.clone(),
            publish: self.publish.clone(),
        }
    }
}

/// Input of `add_transition`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionData {
    pub from: TaskRef,
    pub to: Vec<TaskRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub publish: Vec<Publish>,
}

impl TransitionData {
    pub fn new(from: impl Into<TaskRef>, to: impl IntoIterator<Item = impl Into<TaskRef>>) -> Self {
        Self {
            from: from.into(),
            to: to.into_iter().map(Into::into).collect(),
            condition: None,
            publish: Vec::new(),
        }
    }

    pub fn when(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    pub fn publish(mut self, publish: Publish) -> Self {
        self.publish.push(publish);
        self
    }

    /// Edge id of the (from, first target) pair
    pub fn edge_id(&self) -> Option<String> {
        self.to.first().map(|to| edge_id(&self.from.name, &to.name))
    }
}

/// Input of `update_transition`; `None` fields are left alone
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransitionUpdate {
    #[serde(default)]
    pub to: Option<Vec<TaskRef>>,
    /// `Some(None)` removes the condition
    #[serde(default)]
    pub condition: Option<Option<String>>,
    #[serde(default)]
    pub publish: Option<Vec<Publish>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_builder_and_edge_id() {
        let data = TransitionData::new("t1", ["a", "b"])
            .when("<% succeeded() %>")
            .publish(Publish::new("out", "<% result() %>"));
        assert_eq!(data.edge_id().as_deref(), Some("t1->a"));
        assert_eq!(data.to.len(), 2);
        assert_eq!(data.publish[0].name, "out");
    }

    #[test]
    fn transition_without_targets_has_no_edge() {
        let transition = Transition {
            id: TransitionId::new("t1", 0),
            from: "t1".into(),
            to: Vec::new(),
            condition: None,
            publish: Vec::new(),
            sectors: Vec::new(),
        };
        assert_eq!(transition.edge_id(), None);
        assert!(transition.data().to.is_empty());
    }

    #[test]
    fn data_deserializes_from_json() {
        let data: TransitionData =
            serde_json::from_str(r#"{"from":{"name":"t1"},"to":[{"name":"a"}]}"#).unwrap();
        assert_eq!(data, TransitionData::new("t1", ["a"]));
    }
}
