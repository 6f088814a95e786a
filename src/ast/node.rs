//! Node tree built on top of the lexed lines
//!
//! Nodes carry ranges only; the text stays in the token stream, so the tree
//! can be rebuilt cheaply after every edit.

use crate::span::{Position, Range};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Mapping(Vec<Entry>),
    Sequence(Vec<Item>),
    /// Raw source text of the scalar's first line
    Scalar(String),
    /// A key or dash with nothing after it
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub kind: NodeKind,
    pub range: Range,
}

/// `key: value` inside a mapping
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Unquoted key text
    pub key: String,
    pub key_range: Range,
    pub value: Node,
    /// Key start through value end
    pub range: Range,
}

/// `- value` inside a sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub value: Node,
    /// Dash through value end
    pub range: Range,
}

impl Node {
    pub fn empty(at: Position) -> Self {
        Self {
            kind: NodeKind::Empty,
            range: Range::empty_at(at),
        }
    }

    pub fn entries(&self) -> &[Entry] {
        match &self.kind {
            NodeKind::Mapping(entries) => entries,
            _ => &[],
        }
    }

    pub fn items(&self) -> &[Item] {
        match &self.kind {
            NodeKind::Sequence(items) => items,
            _ => &[],
        }
    }

    pub fn get(&self, key: &str) -> Option<&Entry> {
        self.entries().iter().find(|e| e.key == key)
    }

    pub fn as_scalar(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Scalar(raw) => Some(raw),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.kind, NodeKind::Empty)
    }

    pub fn is_mapping(&self) -> bool {
        matches!(self.kind, NodeKind::Mapping(_))
    }

    pub fn is_sequence(&self) -> bool {
        matches!(self.kind, NodeKind::Sequence(_))
    }

    /// Innermost-last chain of nodes whose range contains `point`
    pub fn path_to(&self, point: Position) -> Vec<&Node> {
        let mut path = Vec::new();
        let mut current = self;
        while current.range.contains(point) {
            path.push(current);
            let child = match &current.kind {
                NodeKind::Mapping(entries) => entries
                    .iter()
                    .find(|e| e.range.contains(point))
                    .map(|e| &e.value),
                NodeKind::Sequence(items) => items
                    .iter()
                    .find(|i| i.range.contains(point))
                    .map(|i| &i.value),
                _ => None,
            };
            match child {
                Some(next) => current = next,
                None => break,
            }
        }
        path
    }
}

/// Strip YAML quotes from a key
pub(crate) fn unquote(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.len() >= 2 {
        if trimmed.starts_with('"') && trimmed.ends_with('"') {
            return serde_yaml::from_str::<String>(trimmed)
                .unwrap_or_else(|_| trimmed[1..trimmed.len() - 1].to_string());
        }
        if trimmed.starts_with('\'') && trimmed.ends_with('\'') {
            return trimmed[1..trimmed.len() - 1].replace("''", "'");
        }
    }
    trimmed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unquote_variants() {
        assert_eq!(unquote("plain"), "plain");
        assert_eq!(unquote("\"my task\""), "my task");
        assert_eq!(unquote("'it''s'"), "it's");
        assert_eq!(unquote("\"a\\tb\""), "a\tb");
    }
}
