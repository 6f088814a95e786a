//! AST Module - format-preserving syntax tree for workflow documents
//!
//! - `token`: line-local lexer; formatting tokens are kept so the source
//!   serializes back byte for byte
//! - `node`: mappings, sequences and scalars with their ranges
//! - `parser`: indentation-driven block parser over lexed lines
//! - `document`: the three views (lines, nodes, values) plus localized edits
//! - `render`: block-style text for structural insertions
//!
//! These types represent the text. Tasks, transitions and sectors are
//! extracted from them by the `model` module.

mod document;
mod node;
mod parser;
pub mod render;
mod token;

pub use document::Document;
pub use node::{Entry, Item, Node, NodeKind};
pub use token::{lex, Line, Token, TokenKind};

pub(crate) use node::unquote;
