//! WorkflowModel - the orchestrator
//!
//! Owns the document, the extracted tasks/transitions/sectors and the graph.
//! Nothing outside the model mutates them.
//!
//! Two ways in:
//! - text edits (`apply_delta`, or `track_edit` + `reparse_generation` from an
//!   editing session): sectors shift at once, the reparse runs later and
//!   either installs a new state (`change`) or keeps the last good one
//!   (`yaml-error`)
//! - structural mutations (`add_task`, `delete_transition`, ...): graph op
//!   and text edit as one unit; on any failure both are left as they were

use serde_yaml::{Mapping, Value};
use tracing::{debug, warn};

use crate::ast::Document;
use crate::config::ModelConfig;
use crate::error::{FlowdocError, ParseError, Result};
use crate::event::{ChangeOrigin, ListenerId, Listeners, ModelEvent, ModelListener};
use crate::graph::Graph;
use crate::span::{Delta, Position, Range, Sector, SectorType, TransitionId};

use super::edit::Editor;
use super::extract::{extract, Extraction};
use super::meta::WorkflowMeta;
use super::task::{validate_task_name, PropertyName, Task, TaskData, TaskUpdate, ENGINE_COMMANDS};
use super::transition::{Publish, Transition, TransitionData, TransitionUpdate};

/// Outcome of a text reparse
#[derive(Debug, Clone, PartialEq)]
pub enum Reparse {
    /// New state installed, `change` emitted
    Applied { generation: u64 },
    /// Text does not parse, `yaml-error` emitted, last good state kept
    Failed(ParseError),
    /// A newer edit exists; nothing applied, nothing emitted
    Stale,
}

pub struct WorkflowModel {
    config: ModelConfig,
    document: Document,
    tasks: Vec<Task>,
    transitions: Vec<Transition>,
    meta: WorkflowMeta,
    sectors: Vec<Sector>,
    graph: Graph,
    listeners: Listeners,
    /// Last generation handed out
    generation: u64,
    /// Generation of the installed document
    applied_generation: u64,
    /// Text edits tracked since the installed document
    unapplied: Vec<Delta>,
    /// Editor text while it differs from the installed document
    editor_text: Option<String>,
    last_errors: Vec<ParseError>,
}

impl WorkflowModel {
    pub fn new(text: &str) -> Result<Self> {
        Self::with_config(text, ModelConfig::default())
    }

    pub fn with_config(text: &str, config: ModelConfig) -> Result<Self> {
        let document = Document::parse(text)?;
        let mut model = Self::empty_with(config);
        model.install(document);
        Ok(model)
    }

    pub fn empty() -> Self {
        Self::empty_with(ModelConfig::default())
    }

    fn empty_with(config: ModelConfig) -> Self {
        Self {
            config,
            document: Document::empty(),
            tasks: Vec::new(),
            transitions: Vec::new(),
            meta: WorkflowMeta::default(),
            sectors: Vec::new(),
            graph: Graph::new(),
            listeners: Listeners::new(),
            generation: 0,
            applied_generation: 0,
            unapplied: Vec::new(),
            editor_text: None,
            last_errors: Vec::new(),
        }
    }

    /// Replace the derived state with what `document` describes
    fn install(&mut self, document: Document) {
        let Extraction {
            tasks,
            transitions,
            meta,
            sectors,
        } = extract(&document);
        let data: Vec<TransitionData> = transitions.iter().map(Transition::data).collect();
        self.graph = self.graph.rebuild(tasks.iter().map(Task::data), &data);
        self.tasks = tasks;
        self.transitions = transitions;
        self.meta = meta;
        self.sectors = sectors;
        self.document = document;
    }

    fn emit(&mut self, event: ModelEvent) {
        debug!(event = event.name(), generation = event.generation(), "model event");
        self.listeners.emit(&event);
    }

    // ═══════════════════════════════════════════
    // ACCESSORS
    // ═══════════════════════════════════════════

    /// Text of the last good document
    pub fn text(&self) -> &str {
        self.document.text()
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn task(&self, name: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.name == name)
    }

    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    pub fn transition(&self, id: &TransitionId) -> Option<&Transition> {
        self.transitions.iter().find(|t| &t.id == id)
    }

    /// Rules of one task, in `next:` order
    pub fn transitions_from<'a>(&'a self, task: &'a str) -> impl Iterator<Item = &'a Transition> {
        self.transitions.iter().filter(move |t| t.from == task)
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn meta(&self) -> &WorkflowMeta {
        &self.meta
    }

    /// Sectors owned by the workflow itself
    pub fn workflow_sectors(&self) -> &[Sector] {
        &self.sectors
    }

    /// Errors of the latest reparse; empty once a parse succeeds
    pub fn last_errors(&self) -> &[ParseError] {
        &self.last_errors
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn applied_generation(&self) -> u64 {
        self.applied_generation
    }

    /// True while tracked edits wait for a successful reparse
    pub fn has_pending(&self) -> bool {
        !self.unapplied.is_empty()
    }

    /// Latest text the editor holds: the installed document plus tracked
    /// edits, or the text of a reparse that failed
    pub fn editor_text(&self) -> &str {
        self.editor_text.as_deref().unwrap_or(self.document.text())
    }

    /// One row of [`editor_text`](Self::editor_text), newline included
    pub fn editor_row(&self, row: usize) -> Option<&str> {
        self.editor_text().split_inclusive('\n').nth(row)
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    fn indent_unit(&self) -> usize {
        self.document.indent_unit().unwrap_or(self.config.indent)
    }

    // ═══════════════════════════════════════════
    // SUBSCRIPTIONS
    // ═══════════════════════════════════════════

    pub fn subscribe(&mut self, listener: impl ModelListener + 'static) -> ListenerId {
        self.listeners.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.listeners.unsubscribe(id)
    }

    /// Detach every listener and drop tracked edits
    pub fn teardown(&mut self) {
        debug!(listeners = self.listeners.len(), "model teardown");
        self.listeners.clear();
        self.unapplied.clear();
        self.editor_text = None;
    }

    // ═══════════════════════════════════════════
    // SEARCH
    // ═══════════════════════════════════════════

    fn all_sectors(&self) -> impl Iterator<Item = &Sector> {
        self.sectors
            .iter()
            .chain(self.tasks.iter().flat_map(|t| t.sectors().iter()))
            .chain(self.transitions.iter().flat_map(|t| t.sectors().iter()))
    }

    /// Sectors containing `position`, innermost first
    pub fn search(&self, position: Position, kind: Option<SectorType>) -> Vec<&Sector> {
        let mut hits: Vec<&Sector> = self
            .all_sectors()
            .filter(|s| s.contains(position))
            .filter(|s| kind.map_or(true, |k| s.kind == k))
            .collect();
        hits.sort_by(|a, b| {
            b.range
                .start
                .cmp(&a.range.start)
                .then(a.range.end.cmp(&b.range.end))
                .then(depth(a.kind).cmp(&depth(b.kind)))
        });
        hits
    }

    // ═══════════════════════════════════════════
    // TEXT EDITS
    // ═══════════════════════════════════════════

    /// Record an editor delta: shift every sector now, reparse later.
    /// Returns the generation the reparse must present.
    /// Sectors whose text the edit removed are dropped until the reparse.
    pub fn track_edit(&mut self, delta: &Delta) -> u64 {
        self.sectors.retain_mut(|s| s.apply_edit(delta));
        for task in self.tasks.iter_mut() {
            task.sectors_mut().retain_mut(|s| s.apply_edit(delta));
        }
        for transition in self.transitions.iter_mut() {
            transition.sectors.retain_mut(|s| s.apply_edit(delta));
        }
        match splice(self.editor_text(), delta) {
            Some(text) => self.editor_text = Some(text),
            None => warn!(range = %delta.range, "tracked edit lies outside the editor text"),
        }
        self.generation += 1;
        self.unapplied.push(delta.clone());
        self.generation
    }

    /// Reparse the editor's full text for `generation`. Older generations
    /// are discarded so observers never see a state go backwards.
    pub fn reparse_generation(&mut self, generation: u64, full_text: &str) -> Reparse {
        if generation < self.generation || generation <= self.applied_generation {
            warn!(
                generation,
                latest = self.generation,
                "discarding stale reparse"
            );
            return Reparse::Stale;
        }

        let parsed = match self.localized(full_text) {
            Some(result) => result,
            None => Document::parse(full_text).map_err(FlowdocError::from),
        };

        match parsed {
            Ok(document) => {
                self.install(document);
                self.applied_generation = generation;
                self.editor_text = None;
                self.last_errors.clear();
                let deltas = std::mem::take(&mut self.unapplied);
                debug!(generation, deltas = deltas.len(), "reparse applied");
                let text = self.document.text().to_string();
                self.emit(ModelEvent::Change {
                    generation,
                    deltas,
                    text,
                    origin: ChangeOrigin::Text,
                });
                Reparse::Applied { generation }
            }
            Err(err) => {
                let error = match err {
                    FlowdocError::Parse(error) => error,
                    other => ParseError::new(other.to_string(), Position::default()),
                };
                debug!(generation, error = %error.message, "reparse failed");
                self.editor_text = Some(full_text.to_string());
                self.last_errors = vec![error.clone()];
                self.emit(ModelEvent::YamlError {
                    generation,
                    errors: vec![error.clone()],
                });
                Reparse::Failed(error)
            }
        }
    }

    /// Relex only the touched rows when the editor text is exactly the last
    /// good document plus the single tracked delta
    fn localized(&self, full_text: &str) -> Option<Result<Document>> {
        let [delta] = self.unapplied.as_slice() else {
            return None;
        };
        if !self.last_errors.is_empty() {
            return None;
        }
        if self.document.spliced(delta).as_deref() == Some(full_text) {
            Some(self.document.apply_delta(delta))
        } else {
            warn!("editor text diverged from tracked delta, reparsing in full");
            None
        }
    }

    /// Track and reparse in one step
    pub fn apply_delta(&mut self, delta: &Delta, full_text: &str) -> Reparse {
        let generation = self.track_edit(delta);
        self.reparse_generation(generation, full_text)
    }

    /// Replace the whole text
    pub fn replace_text(&mut self, text: &str) -> Reparse {
        let all = Range::new(Position::default(), self.document.end_position());
        self.apply_delta(&Delta::new(all, text), text)
    }

    // ═══════════════════════════════════════════
    // STRUCTURAL MUTATIONS
    // ═══════════════════════════════════════════

    /// Run a graph op and its text edits as one unit. The graph is restored
    /// if the op, the planning or the edit fails; the text only changes once
    /// everything has succeeded.
    fn structural<T>(
        &mut self,
        graph_op: impl FnOnce(&mut Graph) -> Result<T>,
        text_op: impl FnOnce(&Editor<'_>) -> Result<Vec<Delta>>,
    ) -> Result<T> {
        let snapshot = self.graph.clone();
        let output = match graph_op(&mut self.graph) {
            Ok(output) => output,
            Err(err) => {
                self.graph = snapshot;
                return Err(err);
            }
        };

        let planned = {
            let editor = Editor::new(&self.document, self.indent_unit());
            text_op(&editor)
        };
        let applied = planned.and_then(|edits| self.document.apply_edits(&edits));
        let (document, deltas) = match applied {
            Ok(result) => result,
            Err(err) => {
                self.graph = snapshot;
                return Err(err);
            }
        };

        self.install(document);
        self.generation += 1;
        self.applied_generation = self.generation;
        self.unapplied.clear();
        self.editor_text = None;
        self.last_errors.clear();
        let generation = self.generation;
        let text = self.document.text().to_string();
        debug!(generation, deltas = deltas.len(), "structural change applied");
        self.emit(ModelEvent::Change {
            generation,
            deltas,
            text,
            origin: ChangeOrigin::Structural,
        });
        Ok(output)
    }

    pub fn add_task(&mut self, data: TaskData) -> Result<()> {
        validate_task_name(&data.name)?;
        let mut body = Mapping::new();
        if let Some(action) = &data.action {
            let action = Value::from(action.as_str());
            PropertyName::Action.validate(&action)?;
            body.insert(Value::from("action"), action);
        }
        if let Some(input) = data.input.clone().filter(|v| !v.is_null()) {
            PropertyName::Input.validate(&input)?;
            body.insert(Value::from("input"), input);
        }
        let body = if body.is_empty() {
            Value::Null
        } else {
            Value::Mapping(body)
        };

        let name = data.name.clone();
        self.structural(
            |graph| graph.add_task(&data),
            |editor| editor.add_task(&name, &body),
        )
    }

    /// Rename, replace action/input, move. A coordinate-only update touches
    /// the graph alone and emits a `change` without deltas.
    pub fn update_task(&mut self, name: &str, update: TaskUpdate) -> Result<()> {
        if let Some(new_name) = &update.name {
            validate_task_name(new_name)?;
        }
        if let Some(action) = &update.action {
            PropertyName::Action.validate(&Value::from(action.as_str()))?;
        }
        if let Some(input) = &update.input {
            PropertyName::Input.validate(input)?;
        }

        if update.is_layout_only() {
            self.graph.update_task(name, &update)?;
            let generation = self.generation;
            let text = self.document.text().to_string();
            self.emit(ModelEvent::Change {
                generation,
                deltas: Vec::new(),
                text,
                origin: ChangeOrigin::Structural,
            });
            return Ok(());
        }

        self.structural(
            |graph| graph.update_task(name, &update),
            |editor| {
                let mut edits = Vec::new();
                if let Some(action) = &update.action {
                    edits.extend(editor.set_property(name, "action", &Value::from(action.as_str()))?);
                }
                if let Some(input) = &update.input {
                    edits.extend(editor.set_property(name, "input", input)?);
                }
                if let Some(new_name) = update.name.as_deref().filter(|n| *n != name) {
                    edits.extend(editor.rename_task(name, new_name)?);
                }
                Ok(edits)
            },
        )
    }

    /// Set one property of a task; `Null` removes it
    pub fn update_task_property(&mut self, name: &str, key: &str, value: Value) -> Result<()> {
        let property = PropertyName::from(key);
        if !value.is_null() {
            property.validate(&value)?;
        }
        self.structural(
            |graph| match property {
                PropertyName::Action if !value.is_null() => {
                    graph.set_task_attr(name, "action", value.clone())
                }
                _ => graph.node(name).map(|_| ()),
            },
            |editor| editor.set_property(name, key, &value),
        )
    }

    /// Remove a task, its edges and every `do` reference to it
    pub fn delete_task(&mut self, name: &str) -> Result<()> {
        self.structural(
            |graph| graph.delete_task(name),
            |editor| editor.delete_task(name),
        )
    }

    /// Append a rule to `from`'s `next:`; returns the edge ids
    pub fn add_transition(&mut self, data: TransitionData) -> Result<Vec<String>> {
        let rule = rule_value(&data);
        self.structural(
            |graph| graph.add_transition(&data),
            |editor| editor.add_rule(&data.from.name, &rule),
        )
    }

    pub fn update_transition(&mut self, id: &TransitionId, update: TransitionUpdate) -> Result<()> {
        let transition = self
            .transition(id)
            .ok_or_else(|| FlowdocError::TransitionNotFound {
                from: id.from.clone(),
                index: id.index,
            })?;
        let old = self.with_known_targets(transition.data());
        let mut new = transition.data();
        if let Some(to) = &update.to {
            new.to = to.clone();
        }
        if let Some(condition) = &update.condition {
            new.condition = condition.clone();
        }
        if let Some(publish) = &update.publish {
            new.publish = publish.clone();
        }
        let rule = self.patched_rule(transition, &update);
        let retarget = update.to.is_some() && new.to != transition.data().to;
        let known = self.with_known_targets(new.clone());

        self.structural(
            |graph| {
                if retarget {
                    graph.delete_transition(&old)?;
                    graph.add_transition(&new)?;
                } else if !known.to.is_empty() {
                    match &known.condition {
                        Some(condition) => graph.set_transition_property(
                            &known,
                            "when",
                            Value::from(condition.as_str()),
                        )?,
                        None => graph.delete_transition_property(&known, "when")?,
                    }
                    if known.publish.is_empty() {
                        graph.delete_transition_property(&known, "publish")?;
                    } else {
                        let names = known.publish.iter().map(|p| Value::from(p.name.as_str()));
                        graph.set_transition_property(&known, "publish", names.collect())?;
                    }
                }
                Ok(())
            },
            |editor| editor.replace_rule(id, &rule),
        )
    }

    pub fn delete_transition(&mut self, id: &TransitionId) -> Result<()> {
        let transition = self
            .transition(id)
            .ok_or_else(|| FlowdocError::TransitionNotFound {
                from: id.from.clone(),
                index: id.index,
            })?;
        let data = self.with_known_targets(transition.data());
        self.structural(
            |graph| graph.delete_transition(&data),
            |editor| editor.delete_rule(id),
        )
    }

    /// Targets the graph holds an edge for; unknown task names never made one
    fn with_known_targets(&self, mut data: TransitionData) -> TransitionData {
        let from = data.from.name.clone();
        data.to
            .retain(|to| self.graph.edge(&crate::graph::edge_id(&from, &to.name)).is_ok());
        data
    }

    /// The rule's current value with the update applied; keys and engine
    /// commands the update does not mention are kept
    fn patched_rule(&self, transition: &Transition, update: &TransitionUpdate) -> Value {
        let original = self
            .document
            .value()
            .get("tasks")
            .and_then(|t| t.get(transition.from.as_str()))
            .and_then(|b| b.get("next"))
            .and_then(|n| n.get(transition.id.index));
        let mut rule = match original {
            Some(Value::Mapping(map)) => map.clone(),
            _ => Mapping::new(),
        };

        if let Some(condition) = &update.condition {
            match condition {
                Some(condition) => {
                    rule.insert(Value::from("when"), Value::from(condition.as_str()));
                }
                None => {
                    rule = without(rule, "when");
                }
            }
        }
        if let Some(publish) = &update.publish {
            if publish.is_empty() {
                rule = without(rule, "publish");
            } else {
                rule.insert(Value::from("publish"), publish_value(publish));
            }
        }
        if let Some(to) = &update.to {
            let commands = engine_commands(original.and_then(|r| r.get("do")));
            let names: Vec<Value> = to
                .iter()
                .map(|t| Value::from(t.name.as_str()))
                .chain(commands.into_iter().map(Value::from))
                .collect();
            if names.is_empty() {
                rule = without(rule, "do");
            } else {
                rule.insert(Value::from("do"), Value::Sequence(names));
            }
        }
        Value::Mapping(rule)
    }
}

impl std::fmt::Debug for WorkflowModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowModel")
            .field("tasks", &self.tasks.len())
            .field("transitions", &self.transitions.len())
            .field("generation", &self.generation)
            .field("applied_generation", &self.applied_generation)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

/// Tie-break for sectors with identical ranges: the more specific first
fn depth(kind: SectorType) -> u8 {
    match kind {
        SectorType::Variable => 0,
        SectorType::Name | SectorType::Ref | SectorType::When => 1,
        SectorType::Do | SectorType::Publish | SectorType::Input | SectorType::Property => 2,
        SectorType::Transition => 3,
        SectorType::Task => 4,
    }
}

/// Byte offset of a char position in raw text
fn offset_in(text: &str, position: Position) -> Option<usize> {
    let mut start = 0;
    for (row, line) in text.split_inclusive('\n').enumerate() {
        if row == position.row {
            let body = line.trim_end_matches(['\r', '\n']);
            return match body.char_indices().nth(position.column) {
                Some((b, _)) => Some(start + b),
                None if position.column == body.chars().count() => Some(start + body.len()),
                None => None,
            };
        }
        start += line.len();
    }
    let rows = text.split_inclusive('\n').count();
    let open_last_row = text.is_empty() || text.ends_with('\n');
    (position.row == rows && open_last_row && position.column == 0).then_some(text.len())
}

/// `text` with `delta` applied
fn splice(text: &str, delta: &Delta) -> Option<String> {
    let start = offset_in(text, delta.range.start)?;
    let end = offset_in(text, delta.range.end)?;
    let mut out = String::with_capacity(text.len() + delta.text.len());
    out.push_str(&text[..start]);
    out.push_str(&delta.text);
    out.push_str(&text[end..]);
    Some(out)
}

/// `{when, publish, do}` for a new rule
fn rule_value(data: &TransitionData) -> Value {
    let mut rule = Mapping::new();
    if let Some(condition) = &data.condition {
        rule.insert(Value::from("when"), Value::from(condition.as_str()));
    }
    if !data.publish.is_empty() {
        rule.insert(Value::from("publish"), publish_value(&data.publish));
    }
    if !data.to.is_empty() {
        let names = data.to.iter().map(|t| Value::from(t.name.as_str()));
        rule.insert(Value::from("do"), names.collect());
    }
    Value::Mapping(rule)
}

/// `- name: value` list
fn publish_value(publish: &[Publish]) -> Value {
    publish
        .iter()
        .map(|p| {
            let mut entry = Mapping::new();
            entry.insert(Value::from(p.name.as_str()), p.value.clone());
            Value::Mapping(entry)
        })
        .collect()
}

/// The mapping minus one key, order kept
fn without(map: Mapping, key: &str) -> Mapping {
    map.into_iter()
        .filter(|(k, _)| k.as_str() != Some(key))
        .collect()
}

fn engine_commands(value: Option<&Value>) -> Vec<String> {
    let names: Vec<String> = match value {
        Some(Value::Sequence(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        Some(Value::String(list)) => list.split(',').map(|s| s.trim().to_string()).collect(),
        _ => Vec::new(),
    };
    names
        .into_iter()
        .filter(|n| ENGINE_COMMANDS.contains(&n.as_str()))
        .collect()
}
