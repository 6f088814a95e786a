//! Model Module - the workflow as tasks, transitions and sectors
//!
//! - `task`: task properties (well-known names plus an open slot) and sectors
//! - `transition`: `next:` rules and the data passed to graph operations
//! - `meta`: version, description, inputs, vars
//! - `extract`: builds all of the above from a parsed document
//! - `edit`: plans the text edits of structural mutations
//! - `workflow`: `WorkflowModel`, the orchestrator owning document and graph

mod edit;
mod extract;
mod meta;
mod task;
mod transition;
mod workflow;

pub use meta::{Param, WorkflowMeta};
pub use task::{
    validate_task_name, PropertyName, Task, TaskData, TaskProperties, TaskUpdate, ENGINE_COMMANDS,
};
pub use transition::{Publish, TaskRef, Transition, TransitionData, TransitionUpdate};
pub use workflow::{Reparse, WorkflowModel};
