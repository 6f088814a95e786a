//! Graph - node/edge projection of tasks and transitions
//!
//! Minimal adjacency bookkeeping:
//! - one element map (id -> node or edge), so every lookup is kind-checked
//! - incidence lists per node (SmallVec: most tasks touch 0-4 edges)
//! - FxHashMap for fast non-crypto hashing, as in the flow graph it came from
//!
//! Edge ids are derived from the endpoints (`from->to`). Transitions that
//! route the same pair share one edge, reference-counted.

use std::collections::BTreeMap;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use smallvec::SmallVec;
use tracing::debug;

use crate::error::{ElementKind, FlowdocError, Result};
use crate::model::{TaskData, TaskUpdate, TransitionData};

/// Stack-allocated incidence: most tasks have 0-4 edges
pub type EdgeVec = SmallVec<[Arc<str>; 4]>;

/// Node attributes derived from task properties (rebuilt on every sync)
const NODE_DERIVED: &[&str] = &["action"];
/// Edge attributes derived from transitions (rebuilt on every sync)
const EDGE_DERIVED: &[&str] = &["when", "publish"];

/// Deterministic edge id for an ordered endpoint pair
pub fn edge_id(from: &str, to: &str) -> String {
    format!("{}->{}", from, to)
}

/// Canvas layout coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coords {
    pub x: f64,
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z: Option<f64>,
}

impl Coords {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y, z: None }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphNode {
    pub id: Arc<str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coords: Option<Coords>,
    pub attrs: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphEdge {
    pub id: Arc<str>,
    pub source: Arc<str>,
    pub target: Arc<str>,
    pub attrs: BTreeMap<String, Value>,
    /// Transitions sharing this edge
    #[serde(skip)]
    refs: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Node(GraphNode),
    Edge(GraphEdge),
}

impl Element {
    pub fn kind(&self) -> ElementKind {
        match self {
            Element::Node(_) => ElementKind::Node,
            Element::Edge(_) => ElementKind::Edge,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Graph {
    elements: FxHashMap<Arc<str>, Element>,
    /// node id -> incident edge ids, in insertion order
    incidence: FxHashMap<Arc<str>, EdgeVec>,
    /// Node ids in insertion order
    order: Vec<Arc<str>>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    // ═══════════════════════════════════════════
    // LOOKUPS
    // ═══════════════════════════════════════════

    /// Resolve an id and confirm its kind. Missing ids map to the
    /// not-found error of the expected kind.
    pub fn check_group(&self, id: &str, expected: ElementKind) -> Result<&Element> {
        match self.elements.get(id) {
            Some(element) if element.kind() == expected => Ok(element),
            Some(element) => Err(wrong_kind(id, expected, element.kind())),
            None => Err(not_found(id, expected)),
        }
    }

    pub fn node(&self, id: &str) -> Result<&GraphNode> {
        match self.elements.get(id) {
            Some(Element::Node(node)) => Ok(node),
            Some(other) => Err(wrong_kind(id, ElementKind::Node, other.kind())),
            None => Err(not_found(id, ElementKind::Node)),
        }
    }

    pub fn edge(&self, id: &str) -> Result<&GraphEdge> {
        match self.elements.get(id) {
            Some(Element::Edge(edge)) => Ok(edge),
            Some(other) => Err(wrong_kind(id, ElementKind::Edge, other.kind())),
            None => Err(not_found(id, ElementKind::Edge)),
        }
    }

    fn node_mut(&mut self, id: &str) -> Result<&mut GraphNode> {
        match self.elements.get_mut(id) {
            Some(Element::Node(node)) => Ok(node),
            Some(other) => Err(wrong_kind(id, ElementKind::Node, other.kind())),
            None => Err(not_found(id, ElementKind::Node)),
        }
    }

    fn edge_mut(&mut self, id: &str) -> Result<&mut GraphEdge> {
        match self.elements.get_mut(id) {
            Some(Element::Edge(edge)) => Ok(edge),
            Some(other) => Err(wrong_kind(id, ElementKind::Edge, other.kind())),
            None => Err(not_found(id, ElementKind::Edge)),
        }
    }

    pub fn contains_node(&self, id: &str) -> bool {
        matches!(self.elements.get(id), Some(Element::Node(_)))
    }

    /// Nodes in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.order.iter().filter_map(|id| match self.elements.get(id) {
            Some(Element::Node(node)) => Some(node),
            _ => None,
        })
    }

    /// Every edge, grouped by source node in insertion order
    pub fn all_edges(&self) -> Vec<&GraphEdge> {
        let mut out = Vec::new();
        for id in &self.order {
            for edge_id in self.incidence.get(id).into_iter().flatten() {
                if let Some(Element::Edge(edge)) = self.elements.get(edge_id) {
                    if edge.source == *id {
                        out.push(edge);
                    }
                }
            }
        }
        out
    }

    pub fn node_count(&self) -> usize {
        self.order.len()
    }

    /// Destination node ids one edge away from `node_id`
    pub fn connections(&self, node_id: &str) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for edge_id in self.incidence.get(node_id).into_iter().flatten() {
            if let Some(Element::Edge(edge)) = self.elements.get(edge_id) {
                if &*edge.source == node_id && !out.contains(&&*edge.target) {
                    out.push(&edge.target);
                }
            }
        }
        out
    }

    /// Ids of edges incident to `node_id` (either direction)
    pub fn edges(&self, node_id: &str) -> Vec<&str> {
        self.incidence
            .get(node_id)
            .map(|ids| ids.iter().map(|id| &**id).collect())
            .unwrap_or_default()
    }

    // ═══════════════════════════════════════════
    // NODES
    // ═══════════════════════════════════════════

    pub fn add_task(&mut self, data: &TaskData) -> Result<()> {
        match self.elements.get(data.name.as_str()) {
            Some(Element::Node(_)) => {
                return Err(FlowdocError::DuplicateTask {
                    name: data.name.clone(),
                })
            }
            Some(Element::Edge(_)) => {
                return Err(wrong_kind(&data.name, ElementKind::Node, ElementKind::Edge))
            }
            None => {}
        }

        let id: Arc<str> = Arc::from(data.name.as_str());
        let mut attrs = BTreeMap::new();
        if let Some(action) = &data.action {
            attrs.insert("action".to_string(), Value::from(action.as_str()));
        }
        self.elements.insert(
            Arc::clone(&id),
            Element::Node(GraphNode {
                id: Arc::clone(&id),
                coords: data.coords,
                attrs,
            }),
        );
        self.incidence.insert(Arc::clone(&id), EdgeVec::new());
        self.order.push(id);
        debug!(task = %data.name, "graph: node added");
        Ok(())
    }

    /// Apply updates to a node; a rename re-keys the node and its edges
    pub fn update_task(&mut self, name: &str, update: &TaskUpdate) -> Result<()> {
        self.node(name)?;
        if let Some(new_name) = update.name.as_deref().filter(|n| *n != name) {
            if let Some(existing) = self.elements.get(new_name) {
                return Err(match existing.kind() {
                    ElementKind::Node => FlowdocError::DuplicateTask {
                        name: new_name.to_string(),
                    },
                    found => wrong_kind(new_name, ElementKind::Node, found),
                });
            }
        }

        let node = self.node_mut(name)?;
        if let Some(action) = &update.action {
            node.attrs
                .insert("action".to_string(), Value::from(action.as_str()));
        }
        if let Some(coords) = update.coords {
            node.coords = Some(coords);
        }

        if let Some(new_name) = update.name.as_deref().filter(|n| *n != name) {
            self.rename_node(name, new_name);
        }
        Ok(())
    }

    pub fn set_task_attr(&mut self, name: &str, key: &str, value: Value) -> Result<()> {
        self.node_mut(name)?.attrs.insert(key.to_string(), value);
        Ok(())
    }

    fn rename_node(&mut self, old: &str, new: &str) {
        let Some(Element::Node(mut node)) = self.elements.remove(old) else {
            return;
        };
        let new_id: Arc<str> = Arc::from(new);
        node.id = Arc::clone(&new_id);
        self.elements.insert(Arc::clone(&new_id), Element::Node(node));
        for id in self.order.iter_mut().filter(|id| &***id == old) {
            *id = Arc::clone(&new_id);
        }

        let incident = self.incidence.remove(old).unwrap_or_default();
        self.incidence.insert(Arc::clone(&new_id), EdgeVec::new());
        for old_edge in incident {
            let Some(Element::Edge(mut edge)) = self.elements.remove(&old_edge) else {
                continue;
            };
            if &*edge.source == old {
                edge.source = Arc::clone(&new_id);
            }
            if &*edge.target == old {
                edge.target = Arc::clone(&new_id);
            }
            let renamed: Arc<str> = Arc::from(edge_id(&edge.source, &edge.target));
            edge.id = Arc::clone(&renamed);
            let other = if edge.source == new_id {
                Arc::clone(&edge.target)
            } else {
                Arc::clone(&edge.source)
            };
            self.elements.insert(Arc::clone(&renamed), Element::Edge(edge));
            if let Some(list) = self.incidence.get_mut(&new_id) {
                if !list.contains(&renamed) {
                    list.push(Arc::clone(&renamed));
                }
            }
            if let Some(list) = self.incidence.get_mut(&other) {
                for id in list.iter_mut().filter(|id| **id == old_edge) {
                    *id = Arc::clone(&renamed);
                }
            }
        }
        debug!(old, new, "graph: node renamed");
    }

    /// Remove a node and every edge touching it
    pub fn delete_task(&mut self, name: &str) -> Result<()> {
        self.node(name)?;
        let incident = self.incidence.remove(name).unwrap_or_default();
        for id in &incident {
            if let Some(Element::Edge(edge)) = self.elements.remove(id) {
                let other = if &*edge.source == name {
                    edge.target
                } else {
                    edge.source
                };
                if let Some(list) = self.incidence.get_mut(&other) {
                    list.retain(|e| e != id);
                }
            }
        }
        self.elements.remove(name);
        self.order.retain(|id| &**id != name);
        debug!(task = name, edges = incident.len(), "graph: node deleted");
        Ok(())
    }

    // ═══════════════════════════════════════════
    // EDGES
    // ═══════════════════════════════════════════

    /// Add the edges of a transition, one per target. Every endpoint is
    /// checked before anything changes.
    pub fn add_transition(&mut self, data: &TransitionData) -> Result<Vec<String>> {
        self.node(&data.from.name)?;
        for to in &data.to {
            self.node(&to.name)?;
            let id = edge_id(&data.from.name, &to.name);
            if let Some(existing) = self.elements.get(id.as_str()) {
                if existing.kind() != ElementKind::Edge {
                    return Err(wrong_kind(&id, ElementKind::Edge, existing.kind()));
                }
            }
        }

        let attrs = transition_attrs(data);
        let mut ids = Vec::with_capacity(data.to.len());
        for to in &data.to {
            let id = edge_id(&data.from.name, &to.name);
            if let Some(Element::Edge(edge)) = self.elements.get_mut(id.as_str()) {
                edge.refs += 1;
                for (key, value) in &attrs {
                    edge.attrs.entry(key.clone()).or_insert_with(|| value.clone());
                }
            } else {
                self.insert_edge(&data.from.name, &to.name, attrs.clone());
            }
            ids.push(id);
        }
        debug!(from = %data.from.name, edges = ?ids, "graph: transition added");
        Ok(ids)
    }

    fn insert_edge(&mut self, from: &str, to: &str, attrs: BTreeMap<String, Value>) {
        let source = self.node_id(from);
        let target = self.node_id(to);
        let id: Arc<str> = Arc::from(edge_id(from, to));
        self.elements.insert(
            Arc::clone(&id),
            Element::Edge(GraphEdge {
                id: Arc::clone(&id),
                source: Arc::clone(&source),
                target: Arc::clone(&target),
                attrs,
                refs: 1,
            }),
        );
        self.incidence
            .entry(Arc::clone(&source))
            .or_default()
            .push(Arc::clone(&id));
        if target != source {
            self.incidence.entry(target).or_default().push(id);
        }
    }

    /// Interned id of an existing node
    fn node_id(&self, name: &str) -> Arc<str> {
        self.elements
            .get_key_value(name)
            .map_or_else(|| Arc::from(name), |(k, _)| Arc::clone(k))
    }

    /// Edge resolved from transition data: the (from, first target) pair
    fn resolve_edge(data: &TransitionData) -> Result<String> {
        data.edge_id().ok_or_else(|| FlowdocError::EdgeNotFound {
            id: format!("{}->", data.from.name),
        })
    }

    pub fn set_transition_property(
        &mut self,
        data: &TransitionData,
        key: &str,
        value: Value,
    ) -> Result<()> {
        let id = Self::resolve_edge(data)?;
        self.edge_mut(&id)?.attrs.insert(key.to_string(), value);
        Ok(())
    }

    pub fn delete_transition_property(&mut self, data: &TransitionData, key: &str) -> Result<()> {
        let id = Self::resolve_edge(data)?;
        self.edge_mut(&id)?.attrs.remove(key);
        Ok(())
    }

    /// Drop one reference to each of the transition's edges; an edge goes
    /// away with its last reference.
    pub fn delete_transition(&mut self, data: &TransitionData) -> Result<()> {
        for to in &data.to {
            self.edge(&edge_id(&data.from.name, &to.name))?;
        }
        for to in &data.to {
            let id = edge_id(&data.from.name, &to.name);
            let Ok(edge) = self.edge_mut(&id) else {
                // duplicate target already removed the shared edge
                continue;
            };
            edge.refs = edge.refs.saturating_sub(1);
            if edge.refs == 0 {
                self.remove_edge(&id);
            }
        }
        debug!(from = %data.from.name, "graph: transition deleted");
        Ok(())
    }

    fn remove_edge(&mut self, id: &str) {
        if let Some(Element::Edge(edge)) = self.elements.remove(id) {
            for end in [&edge.source, &edge.target] {
                if let Some(list) = self.incidence.get_mut(end) {
                    list.retain(|e| &**e != id);
                }
            }
        }
    }

    // ═══════════════════════════════════════════
    // SYNC
    // ═══════════════════════════════════════════

    /// Rebuild from parsed tasks and transitions, keeping layout and
    /// attributes that do not come from the text.
    pub fn rebuild<'a>(
        &self,
        tasks: impl IntoIterator<Item = TaskData>,
        transitions: impl IntoIterator<Item = &'a TransitionData>,
    ) -> Graph {
        let mut next = Graph::new();
        for mut data in tasks {
            if let Ok(previous) = self.node(&data.name) {
                data.coords = data.coords.or(previous.coords);
            }
            if let Err(err) = next.add_task(&data) {
                debug!(task = %data.name, %err, "graph sync: node skipped");
                continue;
            }
            if let Ok(previous) = self.node(&data.name) {
                if let Ok(node) = next.node_mut(&data.name) {
                    for (key, value) in &previous.attrs {
                        if !NODE_DERIVED.contains(&key.as_str()) {
                            node.attrs.insert(key.clone(), value.clone());
                        }
                    }
                }
            }
        }

        for data in transitions {
            let known: Vec<_> = data
                .to
                .iter()
                .filter(|t| next.contains_node(&t.name))
                .cloned()
                .collect();
            if !next.contains_node(&data.from.name) || known.is_empty() {
                continue;
            }
            let partial = TransitionData {
                to: known,
                ..data.clone()
            };
            if let Err(err) = next.add_transition(&partial) {
                debug!(from = %data.from.name, %err, "graph sync: transition skipped");
            }
        }

        for edge in self.elements.values().filter_map(|e| match e {
            Element::Edge(edge) => Some(edge),
            Element::Node(_) => None,
        }) {
            if let Ok(current) = next.edge_mut(&edge.id) {
                for (key, value) in &edge.attrs {
                    if !EDGE_DERIVED.contains(&key.as_str()) {
                        current.attrs.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        next
    }
}

fn wrong_kind(id: &str, expected: ElementKind, found: ElementKind) -> FlowdocError {
    FlowdocError::WrongElementKind {
        id: id.to_string(),
        expected,
        found,
    }
}

fn not_found(id: &str, expected: ElementKind) -> FlowdocError {
    match expected {
        ElementKind::Node => FlowdocError::TaskNotFound {
            name: id.to_string(),
        },
        ElementKind::Edge => FlowdocError::EdgeNotFound { id: id.to_string() },
    }
}

fn transition_attrs(data: &TransitionData) -> BTreeMap<String, Value> {
    let mut attrs = BTreeMap::new();
    if let Some(condition) = &data.condition {
        attrs.insert("when".to_string(), Value::from(condition.as_str()));
    }
    if !data.publish.is_empty() {
        let names = data
            .publish
            .iter()
            .map(|p| Value::from(p.name.as_str()))
            .collect();
        attrs.insert("publish".to_string(), Value::Sequence(names));
    }
    attrs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TaskRef;
    use pretty_assertions::assert_eq;

    fn graph_with(names: &[&str]) -> Graph {
        let mut graph = Graph::new();
        for name in names {
            graph
                .add_task(&TaskData::new(*name).with_action("core.local"))
                .unwrap();
        }
        graph
    }

    #[test]
    fn add_transition_links_existing_tasks() {
        let mut graph = graph_with(&["t1", "a"]);
        let ids = graph
            .add_transition(&TransitionData::new("t1", ["a"]))
            .unwrap();
        assert_eq!(ids, vec!["t1->a".to_string()]);
        assert_eq!(graph.edges("t1"), vec!["t1->a"]);
        assert_eq!(graph.connections("t1"), vec!["a"]);
        assert!(graph.connections("a").is_empty());
        assert_eq!(graph.edges("a"), vec!["t1->a"]);
    }

    #[test]
    fn missing_endpoint_leaves_graph_unchanged() {
        let mut graph = graph_with(&["t1", "a"]);
        graph
            .add_transition(&TransitionData::new("t1", ["a"]))
            .unwrap();
        let before = graph.clone();

        let err = graph
            .add_transition(&TransitionData::new("t1", ["missing"]))
            .unwrap_err();
        assert!(matches!(err, FlowdocError::TaskNotFound { ref name } if name == "missing"));
        let err = graph
            .add_transition(&TransitionData::new("ghost", ["a"]))
            .unwrap_err();
        assert!(matches!(err, FlowdocError::TaskNotFound { .. }));
        let err = graph
            .add_transition(&TransitionData::new("t1", ["a", "missing"]))
            .unwrap_err();
        assert!(matches!(err, FlowdocError::TaskNotFound { .. }));
        assert_eq!(graph, before);
    }

    #[test]
    fn delete_task_cascades_to_edges() {
        let mut graph = graph_with(&["t1", "a", "b"]);
        graph
            .add_transition(&TransitionData::new("t1", ["a", "b"]))
            .unwrap();
        graph.delete_task("a").unwrap();
        assert_eq!(graph.connections("t1"), vec!["b"]);
        assert_eq!(graph.edges("t1"), vec!["t1->b"]);
        assert!(graph.edge("t1->a").is_err());
        graph.delete_task("b").unwrap();
        assert!(graph.connections("t1").is_empty());
        assert!(graph.edges("t1").is_empty());
    }

    #[test]
    fn add_task_rejects_duplicates() {
        let mut graph = graph_with(&["t1"]);
        let err = graph.add_task(&TaskData::new("t1")).unwrap_err();
        assert!(matches!(err, FlowdocError::DuplicateTask { .. }));
    }

    #[test]
    fn kind_checks_fail_loudly() {
        let mut graph = graph_with(&["t1", "a"]);
        graph
            .add_transition(&TransitionData::new("t1", ["a"]))
            .unwrap();

        let err = graph
            .update_task("t1->a", &TaskUpdate::default())
            .unwrap_err();
        assert!(matches!(
            err,
            FlowdocError::WrongElementKind {
                expected: ElementKind::Node,
                found: ElementKind::Edge,
                ..
            }
        ));
        let err = graph.add_task(&TaskData::new("t1->a")).unwrap_err();
        assert!(matches!(err, FlowdocError::WrongElementKind { .. }));
        assert!(matches!(
            graph.check_group("t1", ElementKind::Edge),
            Err(FlowdocError::WrongElementKind { .. })
        ));
        assert!(matches!(
            graph.check_group("nope", ElementKind::Edge),
            Err(FlowdocError::EdgeNotFound { .. })
        ));
    }

    #[test]
    fn transition_properties_set_and_delete() {
        let mut graph = graph_with(&["t1", "a"]);
        let data = TransitionData::new("t1", ["a"]).when("<% succeeded() %>");
        graph.add_transition(&data).unwrap();
        assert_eq!(
            graph.edge("t1->a").unwrap().attrs.get("when"),
            Some(&Value::from("<% succeeded() %>"))
        );
        graph
            .set_transition_property(&data, "label", Value::from("ok"))
            .unwrap();
        graph.delete_transition_property(&data, "when").unwrap();
        let edge = graph.edge("t1->a").unwrap();
        assert_eq!(edge.attrs.len(), 1);
        assert_eq!(edge.attrs.get("label"), Some(&Value::from("ok")));

        let missing = TransitionData::new("a", ["t1"]);
        let err = graph
            .set_transition_property(&missing, "label", Value::Null)
            .unwrap_err();
        assert!(matches!(err, FlowdocError::EdgeNotFound { .. }));
    }

    #[test]
    fn shared_edge_survives_until_last_transition() {
        let mut graph = graph_with(&["t1", "a"]);
        let first = TransitionData::new("t1", ["a"]).when("<% succeeded() %>");
        let second = TransitionData::new("t1", ["a"]).when("<% failed() %>");
        graph.add_transition(&first).unwrap();
        graph.add_transition(&second).unwrap();
        assert_eq!(graph.edges("t1").len(), 1);

        graph.delete_transition(&second).unwrap();
        assert_eq!(graph.connections("t1"), vec!["a"]);
        graph.delete_transition(&first).unwrap();
        assert!(graph.edges("t1").is_empty());
        assert!(matches!(
            graph.delete_transition(&first),
            Err(FlowdocError::EdgeNotFound { .. })
        ));
    }

    #[test]
    fn rename_rekeys_node_and_edges() {
        let mut graph = graph_with(&["t1", "a", "b"]);
        graph
            .add_transition(&TransitionData::new("t1", ["a"]))
            .unwrap();
        graph
            .add_transition(&TransitionData::new("a", ["b"]))
            .unwrap();
        let update = TaskUpdate {
            name: Some("middle".into()),
            coords: Some(Coords::new(10.0, 20.0)),
            ..TaskUpdate::default()
        };
        graph.update_task("a", &update).unwrap();

        assert!(graph.node("a").is_err());
        assert_eq!(graph.node("middle").unwrap().coords, Some(Coords::new(10.0, 20.0)));
        assert_eq!(graph.connections("t1"), vec!["middle"]);
        assert_eq!(graph.connections("middle"), vec!["b"]);
        assert_eq!(graph.edges("b"), vec!["middle->b"]);
        let names: Vec<_> = graph.nodes().map(|n| n.id.to_string()).collect();
        assert_eq!(names, vec!["t1", "middle", "b"]);
    }

    #[test]
    fn self_loop_is_listed_once() {
        let mut graph = graph_with(&["retry_me"]);
        graph
            .add_transition(&TransitionData::new("retry_me", ["retry_me"]))
            .unwrap();
        assert_eq!(graph.edges("retry_me"), vec!["retry_me->retry_me"]);
        graph.delete_task("retry_me").unwrap();
        assert!(graph.edge("retry_me->retry_me").is_err());
    }

    #[test]
    fn rebuild_keeps_layout_and_custom_attrs() {
        let mut graph = graph_with(&["t1", "a"]);
        let data = TransitionData::new("t1", ["a"]);
        graph.add_transition(&data).unwrap();
        graph
            .update_task("t1", &TaskUpdate {
                coords: Some(Coords::new(1.0, 2.0)),
                ..TaskUpdate::default()
            })
            .unwrap();
        graph
            .set_transition_property(&data, "label", Value::from("go"))
            .unwrap();

        let tasks = vec![TaskData::new("t1"), TaskData::new("a"), TaskData::new("b")];
        let transitions = vec![TransitionData {
            to: vec![TaskRef::from("a"), TaskRef::from("unknown")],
            ..data.clone()
        }];
        let rebuilt = graph.rebuild(tasks, &transitions);
        assert_eq!(rebuilt.node("t1").unwrap().coords, Some(Coords::new(1.0, 2.0)));
        assert_eq!(rebuilt.connections("t1"), vec!["a"]);
        assert_eq!(
            rebuilt.edge("t1->a").unwrap().attrs.get("label"),
            Some(&Value::from("go"))
        );
        assert_eq!(rebuilt.node_count(), 3);
    }
}
