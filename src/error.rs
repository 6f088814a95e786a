//! Flowdoc Error Types with Error Codes
//!
//! Error code ranges:
//! - FLOWDOC-000-009: Document/parse errors
//! - FLOWDOC-010-019: Graph element errors
//! - FLOWDOC-020-029: Task/transition model errors
//! - FLOWDOC-030-039: Bundle errors
//! - FLOWDOC-040-049: Config/IO errors
//! - FLOWDOC-050-059: Edit session errors
//!
//! Parse errors coming from interactive typing never surface through here on
//! the editing path (they become `yaml-error` events); everything else is
//! returned synchronously to the caller.

use thiserror::Error;

use crate::span::Position;

pub type Result<T> = std::result::Result<T, FlowdocError>;

/// Trait for errors that provide fix suggestions
pub trait FixSuggestion {
    fn fix_suggestion(&self) -> Option<&str>;
}

/// Kind of a graph element, reported by [`FlowdocError::WrongElementKind`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Node,
    Edge,
}

impl std::fmt::Display for ElementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ElementKind::Node => write!(f, "node"),
            ElementKind::Edge => write!(f, "edge"),
        }
    }
}

/// A structured parse failure: where it happened and what went wrong.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ParseError {
    pub message: String,
    pub position: Position,
}

impl ParseError {
    pub fn new(message: impl Into<String>, position: Position) -> Self {
        Self {
            message: message.into(),
            position,
        }
    }

    /// Convert a serde_yaml error, keeping its location when it has one
    pub fn from_yaml(err: &serde_yaml::Error) -> Self {
        let position = err
            .location()
            .map(|loc| {
                Position::new(
                    loc.line().saturating_sub(1),
                    loc.column().saturating_sub(1),
                )
            })
            .unwrap_or_default();
        Self::new(err.to_string(), position)
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} (line {}, column {})",
            self.message,
            self.position.row + 1,
            self.position.column + 1
        )
    }
}

#[derive(Error, Debug)]
pub enum FlowdocError {
    // ═══════════════════════════════════════════
    // DOCUMENT ERRORS (000-009)
    // ═══════════════════════════════════════════
    #[error("[FLOWDOC-001] Failed to parse workflow: {0}")]
    Parse(ParseError),

    #[error("[FLOWDOC-002] Position {position} is outside the document")]
    PositionOutOfBounds { position: Position },

    #[error("[FLOWDOC-003] Edits overlap at {position}")]
    OverlappingEdits { position: Position },

    // ═══════════════════════════════════════════
    // GRAPH ERRORS (010-019)
    // ═══════════════════════════════════════════
    #[error("[FLOWDOC-010] Element '{id}': expected {expected}, found {found}")]
    WrongElementKind {
        id: String,
        expected: ElementKind,
        found: ElementKind,
    },

    #[error("[FLOWDOC-011] Task '{name}' not found")]
    TaskNotFound { name: String },

    #[error("[FLOWDOC-012] Edge '{id}' not found")]
    EdgeNotFound { id: String },

    #[error("[FLOWDOC-013] Task '{name}' already exists")]
    DuplicateTask { name: String },

    // ═══════════════════════════════════════════
    // MODEL ERRORS (020-029)
    // ═══════════════════════════════════════════
    #[error("[FLOWDOC-020] Transition {index} of task '{from}' not found")]
    TransitionNotFound { from: String, index: usize },

    #[error("[FLOWDOC-021] Invalid value for property '{name}': {reason}")]
    InvalidProperty { name: String, reason: String },

    #[error("[FLOWDOC-022] Invalid task name '{name}': {reason}")]
    InvalidTaskName { name: String, reason: String },

    // ═══════════════════════════════════════════
    // BUNDLE ERRORS (030-039)
    // ═══════════════════════════════════════════
    #[error("[FLOWDOC-030] Malformed bundle: {reason}")]
    MalformedBundle { reason: String },

    // ═══════════════════════════════════════════
    // CONFIG / IO ERRORS (040-049)
    // ═══════════════════════════════════════════
    #[error("[FLOWDOC-040] Configuration error: {reason}")]
    Config { reason: String },

    #[error("[FLOWDOC-041] IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("[FLOWDOC-042] YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    // ═══════════════════════════════════════════
    // SESSION ERRORS (050-059)
    // ═══════════════════════════════════════════
    #[error("[FLOWDOC-050] Edit session is closed")]
    SessionClosed,
}

impl FlowdocError {
    /// Stable error code, e.g. `FLOWDOC-011`
    pub fn code(&self) -> &'static str {
        match self {
            Self::Parse(_) => "FLOWDOC-001",
            Self::PositionOutOfBounds { .. } => "FLOWDOC-002",
            Self::OverlappingEdits { .. } => "FLOWDOC-003",
            Self::WrongElementKind { .. } => "FLOWDOC-010",
            Self::TaskNotFound { .. } => "FLOWDOC-011",
            Self::EdgeNotFound { .. } => "FLOWDOC-012",
            Self::DuplicateTask { .. } => "FLOWDOC-013",
            Self::TransitionNotFound { .. } => "FLOWDOC-020",
            Self::InvalidProperty { .. } => "FLOWDOC-021",
            Self::InvalidTaskName { .. } => "FLOWDOC-022",
            Self::MalformedBundle { .. } => "FLOWDOC-030",
            Self::Config { .. } => "FLOWDOC-040",
            Self::Io(_) => "FLOWDOC-041",
            Self::Yaml(_) => "FLOWDOC-042",
            Self::SessionClosed => "FLOWDOC-050",
        }
    }

    /// Parse errors are recoverable (keep typing); the rest are caller defects
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Parse(_) | Self::MalformedBundle { .. })
    }
}

impl From<ParseError> for FlowdocError {
    fn from(err: ParseError) -> Self {
        Self::Parse(err)
    }
}

impl FixSuggestion for FlowdocError {
    fn fix_suggestion(&self) -> Option<&str> {
        match self {
            Self::Parse(_) => Some("Check YAML syntax: indentation and quoting"),
            Self::PositionOutOfBounds { .. } => {
                Some("Send the editor's full text along with the delta")
            }
            Self::OverlappingEdits { .. } => Some("Merge overlapping edits into one"),
            Self::WrongElementKind { .. } => {
                Some("Task names must not collide with edge ids ('from->to')")
            }
            Self::TaskNotFound { .. } => Some("Verify the task exists under 'tasks:'"),
            Self::EdgeNotFound { .. } => {
                Some("Add the transition before changing its properties")
            }
            Self::DuplicateTask { .. } => Some("Use a unique task name"),
            Self::TransitionNotFound { .. } => {
                Some("Transitions are indexed by their position under 'next:'")
            }
            Self::InvalidProperty { .. } => {
                Some("'action' is a string, 'input' a mapping, 'next' a list")
            }
            Self::InvalidTaskName { .. } => {
                Some("Task names are non-empty and contain no ':' or whitespace")
            }
            Self::MalformedBundle { .. } => None,
            Self::Config { .. } => Some("Check flowdoc.toml syntax and values"),
            Self::Io(_) => Some("Check file path and permissions"),
            Self::Yaml(_) => Some("Check YAML syntax: indentation and quoting"),
            Self::SessionClosed => Some("Open a new session on the model"),
        }
    }
}
