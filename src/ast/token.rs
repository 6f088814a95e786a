//! Line lexer
//!
//! Every line is lexed on its own, without context from neighbouring lines.
//! That keeps relexing after an edit local to the touched rows, and keeps the
//! token stream lossless: concatenating all token texts gives back the source.

/// Token categories; formatting tokens (indent, whitespace, comments,
/// newlines) are kept alongside content tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Indent,
    /// Sequence item marker `-`
    Dash,
    /// Mapping key (plain or quoted, without the colon)
    Key,
    Colon,
    /// Value text up to a trailing comment
    Scalar,
    Comment,
    /// Document marker `---` or `...`
    Marker,
    Whitespace,
    Newline,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    /// Char column where the token starts
    pub column: usize,
}

impl Token {
    pub fn width(&self) -> usize {
        self.text.chars().count()
    }

    pub fn end_column(&self) -> usize {
        self.column + self.width()
    }

    pub fn is_content(&self) -> bool {
        matches!(self.kind, TokenKind::Dash | TokenKind::Key | TokenKind::Scalar)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Line {
    pub tokens: Vec<Token>,
}

impl Line {
    /// Lex one line; `raw` may end with its newline
    pub fn lex(raw: &str) -> Self {
        let (body, newline) = if let Some(body) = raw.strip_suffix("\r\n") {
            (body, "\r\n")
        } else if let Some(body) = raw.strip_suffix('\n') {
            (body, "\n")
        } else {
            (raw, "")
        };

        let mut lexer = LineLexer::new(body);
        lexer.run();
        let mut tokens = lexer.tokens;
        if !newline.is_empty() {
            tokens.push(Token {
                kind: TokenKind::Newline,
                text: newline.to_string(),
                column: lexer.chars.len(),
            });
        }
        Self { tokens }
    }

    /// Column of the first non-indent token, if the line has content or a comment
    pub fn indent(&self) -> Option<usize> {
        self.tokens
            .iter()
            .find(|t| !matches!(t.kind, TokenKind::Indent | TokenKind::Newline))
            .map(|t| t.column)
    }

    /// Index of the first content token
    pub fn first_content(&self) -> Option<usize> {
        self.tokens.iter().position(Token::is_content)
    }

    pub fn is_content(&self) -> bool {
        self.first_content().is_some()
    }

    pub fn is_blank(&self) -> bool {
        self.tokens
            .iter()
            .all(|t| matches!(t.kind, TokenKind::Indent | TokenKind::Whitespace | TokenKind::Newline))
    }

    /// Width in chars, newline excluded
    pub fn width(&self) -> usize {
        self.tokens
            .iter()
            .filter(|t| t.kind != TokenKind::Newline)
            .map(Token::width)
            .sum()
    }

    /// End column of the last content token (comments and trailing spaces excluded)
    pub fn content_end(&self) -> usize {
        self.tokens
            .iter()
            .rev()
            .find(|t| t.is_content() || t.kind == TokenKind::Colon)
            .map_or(0, Token::end_column)
    }

    pub fn newline(&self) -> &str {
        self.tokens
            .last()
            .filter(|t| t.kind == TokenKind::Newline)
            .map_or("", |t| t.text.as_str())
    }

    pub fn write_to(&self, out: &mut String) {
        for token in &self.tokens {
            out.push_str(&token.text);
        }
    }

    pub fn text(&self) -> String {
        let mut out = String::new();
        self.write_to(&mut out);
        out
    }

    pub fn byte_len(&self) -> usize {
        self.tokens.iter().map(|t| t.text.len()).sum()
    }

    /// Next token after `index` that is neither whitespace nor a comment
    pub fn next_significant(&self, index: usize) -> Option<usize> {
        self.tokens
            .iter()
            .enumerate()
            .skip(index + 1)
            .find(|(_, t)| {
                !matches!(
                    t.kind,
                    TokenKind::Whitespace | TokenKind::Comment | TokenKind::Newline
                )
            })
            .map(|(i, _)| i)
    }
}

/// Split text into lexed lines. A trailing newline does not open a new line.
pub fn lex(text: &str) -> Vec<Line> {
    text.split_inclusive('\n').map(Line::lex).collect()
}

struct LineLexer {
    chars: Vec<char>,
    pos: usize,
    tokens: Vec<Token>,
}

impl LineLexer {
    fn new(body: &str) -> Self {
        Self {
            chars: body.chars().collect(),
            pos: 0,
            tokens: Vec::new(),
        }
    }

    fn push(&mut self, kind: TokenKind, from: usize, to: usize) {
        if to > from {
            self.tokens.push(Token {
                kind,
                text: self.chars[from..to].iter().collect(),
                column: from,
            });
        }
    }

    fn at(&self, i: usize) -> Option<char> {
        self.chars.get(i).copied()
    }

    fn is_space(&self, i: usize) -> bool {
        matches!(self.at(i), Some(' ') | Some('\t'))
    }

    fn space_or_end(&self, i: usize) -> bool {
        i >= self.chars.len() || self.is_space(i)
    }

    fn skip_whitespace(&mut self, kind: TokenKind) {
        let start = self.pos;
        while self.is_space(self.pos) {
            self.pos += 1;
        }
        self.push(kind, start, self.pos);
    }

    fn run(&mut self) {
        let len = self.chars.len();

        let start = self.pos;
        while self.at(self.pos) == Some(' ') {
            self.pos += 1;
        }
        self.push(TokenKind::Indent, start, self.pos);
        self.skip_whitespace(TokenKind::Whitespace);
        if self.pos >= len {
            return;
        }

        if self.pos == 0 && self.is_marker() {
            self.push(TokenKind::Marker, 0, 3);
            self.pos = 3;
            self.skip_whitespace(TokenKind::Whitespace);
            self.rest_as_value();
            return;
        }

        while self.at(self.pos) == Some('-') && self.space_or_end(self.pos + 1) {
            self.push(TokenKind::Dash, self.pos, self.pos + 1);
            self.pos += 1;
            self.skip_whitespace(TokenKind::Whitespace);
        }

        if let Some(colon) = self.find_key_colon() {
            let mut key_end = colon;
            while key_end > self.pos && self.is_space(key_end - 1) {
                key_end -= 1;
            }
            self.push(TokenKind::Key, self.pos, key_end);
            self.push(TokenKind::Whitespace, key_end, colon);
            self.push(TokenKind::Colon, colon, colon + 1);
            self.pos = colon + 1;
            self.skip_whitespace(TokenKind::Whitespace);
        }

        self.rest_as_value();
    }

    fn is_marker(&self) -> bool {
        let head: String = self.chars.iter().take(3).collect();
        (head == "---" || head == "...") && self.space_or_end(3)
    }

    /// Remaining text: scalar, trailing spaces, comment
    fn rest_as_value(&mut self) {
        let len = self.chars.len();
        if self.pos >= len {
            return;
        }
        if self.at(self.pos) == Some('#') {
            self.push(TokenKind::Comment, self.pos, len);
            self.pos = len;
            return;
        }

        let comment = self.find_comment(self.pos);
        let value_limit = comment.unwrap_or(len);
        let mut value_end = value_limit;
        while value_end > self.pos && self.is_space(value_end - 1) {
            value_end -= 1;
        }
        self.push(TokenKind::Scalar, self.pos, value_end);
        self.push(TokenKind::Whitespace, value_end, value_limit);
        if let Some(c) = comment {
            self.push(TokenKind::Comment, c, len);
        }
        self.pos = len;
    }

    /// Index of the `:` ending a mapping key that starts at `self.pos`
    fn find_key_colon(&self) -> Option<usize> {
        let first = self.at(self.pos)?;
        match first {
            '"' | '\'' => {
                let close = closing_quote(&self.chars, self.pos)?;
                let colon = close + 1;
                (self.at(colon) == Some(':') && self.space_or_end(colon + 1)).then_some(colon)
            }
            '[' | '{' | '|' | '>' | '!' | '&' | '*' | '%' | '@' | '`' | '#' | '?' => None,
            _ => {
                let mut i = self.pos;
                while i < self.chars.len() {
                    let c = self.chars[i];
                    if c == ':' && self.space_or_end(i + 1) {
                        return Some(i);
                    }
                    if c == '#' && i > self.pos && self.is_space(i - 1) {
                        return None;
                    }
                    i += 1;
                }
                None
            }
        }
    }

    /// Start of a trailing comment: `#` preceded by whitespace, outside quotes
    fn find_comment(&self, from: usize) -> Option<usize> {
        let mut i = from;
        if matches!(self.at(from), Some('"') | Some('\'')) {
            i = closing_quote(&self.chars, from)? + 1;
        }
        while i < self.chars.len() {
            if self.chars[i] == '#' && i > 0 && self.is_space(i - 1) {
                return Some(i);
            }
            i += 1;
        }
        None
    }
}

/// Index of the quote closing the one at `open`, honouring `\"` and `''` escapes
pub(crate) fn closing_quote(chars: &[char], open: usize) -> Option<usize> {
    let quote = *chars.get(open)?;
    let mut i = open + 1;
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
            return Some(i);
        }
        i += 1;
    }
    None
}
