//! Block-structure parser over lexed lines
//!
//! Builds mappings and sequences from indentation. Scalars that run over
//! several lines (block scalars, quoted strings, flow collections, folded
//! plain text) are absorbed as one node spanning those lines.

use crate::error::ParseError;
use crate::span::{Position, Range};

use super::node::{unquote, Entry, Item, Node, NodeKind};
use super::token::{closing_quote, Line, TokenKind};

/// Build the node tree for a whole document
pub(crate) fn build(lines: &[Line]) -> Result<Node, ParseError> {
    let mut builder = Builder { lines, row: 0 };
    let Some(first) = builder.next_content(0) else {
        return Ok(Node::empty(Position::default()));
    };
    let token = lines[first].first_content().unwrap_or(0);
    let root = builder.node_at(first, token, None)?;
    if let Some(row) = builder.next_content(builder.row) {
        return Err(ParseError::new(
            "unexpected content after document root",
            builder.line_start(row),
        ));
    }
    Ok(root)
}

struct Builder<'a> {
    lines: &'a [Line],
    /// First row not consumed yet
    row: usize,
}

impl<'a> Builder<'a> {
    fn next_content(&self, from: usize) -> Option<usize> {
        (from..self.lines.len()).find(|&r| self.lines[r].is_content())
    }

    fn indent(&self, row: usize) -> usize {
        self.lines[row].indent().unwrap_or(0)
    }

    fn first_kind(&self, row: usize) -> Option<TokenKind> {
        let line = &self.lines[row];
        line.first_content().map(|i| line.tokens[i].kind)
    }

    fn line_start(&self, row: usize) -> Position {
        Position::new(row, self.indent(row))
    }

    fn deeper(&self, row: usize, parent: Option<usize>) -> bool {
        parent.is_none_or(|p| self.indent(row) > p)
    }

    fn node_at(&mut self, row: usize, token: usize, parent: Option<usize>) -> Result<Node, ParseError> {
        let lines = self.lines;
        let tok = &lines[row].tokens[token];
        match tok.kind {
            TokenKind::Dash => self.sequence(row, token, tok.column),
            TokenKind::Key => self.mapping(row, token, tok.column),
            TokenKind::Scalar => Ok(self.scalar(row, token, parent)),
            _ => Err(ParseError::new(
                format!("unexpected '{}'", tok.text),
                Position::new(row, tok.column),
            )),
        }
    }

    /// Value that starts on a following line (after `key:` or a lone `-`)
    fn block(
        &mut self,
        row: usize,
        anchor: Position,
        parent: usize,
        sequence_at_parent: bool,
    ) -> Result<Node, ParseError> {
        if let Some(next) = self.opens_block(row, parent, sequence_at_parent) {
            let token = self.lines[next].first_content().unwrap_or(0);
            return self.node_at(next, token, Some(parent));
        }
        self.row = row + 1;
        Ok(Node::empty(anchor))
    }

    /// First row of a block value nested under `row`, if one follows
    fn opens_block(&self, row: usize, parent: usize, sequence_at_parent: bool) -> Option<usize> {
        let next = self.next_content(row + 1)?;
        let indent = self.indent(next);
        let same_level_seq =
            sequence_at_parent && indent == parent && self.first_kind(next) == Some(TokenKind::Dash);
        (indent > parent || same_level_seq).then_some(next)
    }

    /// `&anchor` / `!tag` alone on the line with the block value below
    fn properties_before_block(
        &self,
        row: usize,
        token: usize,
        parent: usize,
        sequence_at_parent: bool,
    ) -> bool {
        let tok = &self.lines[row].tokens[token];
        tok.kind == TokenKind::Scalar
            && is_node_properties(&tok.text)
            && self.opens_block(row, parent, sequence_at_parent).is_some()
    }

    fn sequence(&mut self, row: usize, token: usize, column: usize) -> Result<Node, ParseError> {
        let lines = self.lines;
        let mut items = Vec::new();
        let (mut r, mut t) = (row, token);
        loop {
            let start = Position::new(r, column);
            let dash_end = Position::new(r, column + 1);
            let value = match lines[r].next_significant(t) {
                Some(next) if self.properties_before_block(r, next, column, false) => {
                    let end = Position::new(r, lines[r].tokens[next].end_column());
                    self.block(r, end, column, false)?
                }
                Some(next) => self.node_at(r, next, Some(column))?,
                None => self.block(r, dash_end, column, false)?,
            };
            let end = if value.is_empty() { dash_end } else { value.range.end };
            items.push(Item {
                value,
                range: Range::new(start, end),
            });

            match self.next_content(self.row) {
                Some(next)
                    if self.indent(next) == column
                        && self.first_kind(next) == Some(TokenKind::Dash) =>
                {
                    r = next;
                    t = self.lines[next].first_content().unwrap_or(0);
                }
                Some(next) if self.indent(next) > column => {
                    return Err(ParseError::new("unexpected indentation", self.line_start(next)));
                }
                _ => break,
            }
        }

        let range = Range::new(items[0].range.start, items[items.len() - 1].range.end);
        Ok(Node {
            kind: NodeKind::Sequence(items),
            range,
        })
    }

    fn mapping(&mut self, row: usize, token: usize, column: usize) -> Result<Node, ParseError> {
        let lines = self.lines;
        let mut entries = Vec::new();
        let (mut r, mut t) = (row, token);
        loop {
            let line = &lines[r];
            let key_token = &line.tokens[t];
            let key_range = Range::new(
                Position::new(r, key_token.column),
                Position::new(r, key_token.end_column()),
            );
            let key = unquote(&key_token.text);

            let colon = line.tokens[t..]
                .iter()
                .position(|tok| tok.kind == TokenKind::Colon)
                .map(|i| i + t)
                .ok_or_else(|| ParseError::new("expected ':' after key", key_range.end))?;
            let colon_end = Position::new(r, line.tokens[colon].end_column());

            let value = match line.next_significant(colon) {
                Some(next) if self.properties_before_block(r, next, column, true) => {
                    let end = Position::new(r, line.tokens[next].end_column());
                    self.block(r, end, column, true)?
                }
                Some(next) if line.tokens[next].kind == TokenKind::Scalar => {
                    self.scalar(r, next, Some(column))
                }
                Some(next) => {
                    return Err(ParseError::new(
                        "nested block value must start on its own line",
                        Position::new(r, line.tokens[next].column),
                    ));
                }
                None => self.block(r, colon_end, column, true)?,
            };
            let end = if value.is_empty() { colon_end } else { value.range.end };
            entries.push(Entry {
                key,
                key_range,
                value,
                range: Range::new(key_range.start, end),
            });

            match self.next_content(self.row) {
                Some(next)
                    if self.indent(next) == column
                        && self.first_kind(next) == Some(TokenKind::Key) =>
                {
                    r = next;
                    t = self.lines[next].first_content().unwrap_or(0);
                }
                Some(next) if self.indent(next) > column => {
                    return Err(ParseError::new("unexpected indentation", self.line_start(next)));
                }
                _ => break,
            }
        }

        let range = Range::new(entries[0].range.start, entries[entries.len() - 1].range.end);
        Ok(Node {
            kind: NodeKind::Mapping(entries),
            range,
        })
    }

    fn scalar(&mut self, row: usize, token: usize, parent: Option<usize>) -> Node {
        let lines = self.lines;
        let tok = &lines[row].tokens[token];
        let raw = tok.text.clone();
        let start = Position::new(row, tok.column);
        let mut end = Position::new(row, tok.end_column());
        let mut last = row;

        let chars: Vec<char> = raw.chars().collect();
        let first = chars.first().copied();

        if matches!(first, Some('|') | Some('>')) {
            let mut r = row + 1;
            while r < self.lines.len() {
                if self.lines[r].is_blank() {
                    r += 1;
                    continue;
                }
                if !self.deeper(r, parent) {
                    break;
                }
                end = Position::new(r, self.lines[r].width());
                last = r;
                r += 1;
            }
        } else if matches!(first, Some('"') | Some('\'')) && closing_quote(&chars, 0).is_none() {
            let quote = first.unwrap_or('"');
            let mut r = row + 1;
            while r < self.lines.len() {
                let text = self.lines[r].text();
                end = Position::new(r, self.lines[r].width());
                last = r;
                if closes_quote(&text, quote) {
                    break;
                }
                r += 1;
            }
        } else if matches!(first, Some('[') | Some('{')) && bracket_depth(&raw) > 0 {
            let mut depth = bracket_depth(&raw);
            let mut r = row + 1;
            while r < self.lines.len() && depth > 0 {
                depth += bracket_depth(&self.lines[r].text());
                end = Position::new(r, self.lines[r].content_end());
                last = r;
                r += 1;
            }
        } else {
            // folded plain scalar: deeper lines without a key or dash
            let mut r = row + 1;
            while let Some(next) = self.next_content(r) {
                if !self.deeper(next, parent) || self.first_kind(next) != Some(TokenKind::Scalar) {
                    break;
                }
                end = Position::new(next, self.lines[next].content_end());
                last = next;
                r = next + 1;
            }
        }

        self.row = last + 1;
        Node {
            kind: NodeKind::Scalar(raw),
            range: Range::new(start, end),
        }
    }
}

/// Only anchors and tags, e.g. `&defaults`, `!!map`, `&a !tag`
fn is_node_properties(text: &str) -> bool {
    let mut words = text.split_whitespace().peekable();
    words.peek().is_some()
        && words.all(|w| w.len() > 1 && (w.starts_with('&') || w.starts_with('!')))
}

/// Whether a continuation line closes an open quoted scalar
fn closes_quote(text: &str, quote: char) -> bool {
    let chars: Vec<char> = text.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if quote == '"' && c == '\\' {
            i += 2;
            continue;
        }
        if c == quote {
            if quote == '\'' && chars.get(i + 1) == Some(&'\'') {
                i += 2;
                continue;
            }
            return true;
        }
        i += 1;
    }
    false
}

/// Open minus closed flow brackets, ignoring quoted text
fn bracket_depth(text: &str) -> i32 {
    let mut depth = 0;
    let mut quote: Option<char> = None;
    for c in text.chars() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"') | (None, '\'') => quote = Some(c),
            (None, '[') | (None, '{') => depth += 1,
            (None, ']') | (None, '}') => depth -= 1,
            _ => {}
        }
    }
    depth
}
