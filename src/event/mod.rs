//! Event Module - change notifications from the workflow model
//!
//! - `ModelEvent`: `change` and `yaml-error` payloads
//! - `Listeners`: observer registry, synchronous delivery in registration order
//! - `EventLog`: recorder listener, thread-safe append-only log

mod listener;
mod log;

pub use listener::{ListenerId, Listeners, ModelListener};
pub use log::{EventLog, RecordedEvent};

use serde::{Deserialize, Serialize};

use crate::error::ParseError;
use crate::span::Delta;

/// Where a change came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeOrigin {
    /// Editor keystrokes, reparsed
    Text,
    /// Graph/API mutation, text generated by the model
    Structural,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ModelEvent {
    /// New document state; `deltas` lead from the previous state to `text`
    Change {
        generation: u64,
        deltas: Vec<Delta>,
        text: String,
        origin: ChangeOrigin,
    },
    /// The latest text does not parse; the previous state is kept
    YamlError {
        generation: u64,
        errors: Vec<ParseError>,
    },
}

impl ModelEvent {
    pub fn generation(&self) -> u64 {
        match self {
            Self::Change { generation, .. } | Self::YamlError { generation, .. } => *generation,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Change { .. } => "change",
            Self::YamlError { .. } => "yaml-error",
        }
    }

    pub fn is_change(&self) -> bool {
        matches!(self, Self::Change { .. })
    }
}
