//! Flowdoc - position-aware workflow document model
//!
//! Keeps a YAML workflow definition, its tasks and transitions, and a
//! node/edge graph in sync while the text is being edited.
//!
//! ```text
//! editor ──Delta──► session (debounce) ──► WorkflowModel ◄── structural API
//!                                           │    │    │
//!                                  Document ┘  Tasks  └ Graph
//!                                  (ast)     Sectors
//!                                           │
//!                                 change / yaml-error events ──► listeners
//! ```
//!
//! - `span`: positions, ranges, deltas, sectors
//! - `ast`: lossless lexer/parser with localized re-lexing
//! - `model`: tasks, transitions, extraction and the `WorkflowModel`
//! - `graph`: node/edge projection with kind-checked lookups
//! - `event`: observer registry and event recorder
//! - `session`: debounced reparse, sync state machine and tokio driver
//! - `completion`: suggestions for `do:`, `action:` and `ctx()` positions
//! - `util`: bundle pack/unpack at the boundary

pub mod ast;
pub mod completion;
pub mod config;
pub mod error;
pub mod event;
pub mod graph;
pub mod model;
pub mod session;
pub mod span;
pub mod util;

pub use ast::Document;
pub use completion::{CompletionProvider, Suggestion};
pub use config::ModelConfig;
pub use error::{FixSuggestion, FlowdocError, ParseError, Result};
pub use event::{ChangeOrigin, EventLog, ModelEvent, ModelListener};
pub use graph::{Coords, Graph};
pub use model::{
    Publish, Reparse, Task, TaskData, TaskRef, TaskUpdate, Transition, TransitionData,
    TransitionUpdate, WorkflowModel,
};
pub use session::{spawn_session, EditSession, SessionHandle, SessionState};
pub use span::{Delta, Position, Range, Sector, SectorOwner, SectorType, TransitionId};
pub use util::{pack, unpack};
