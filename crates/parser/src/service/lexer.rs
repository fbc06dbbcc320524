//! Token buffer over the scanner's units
//!
//! The whole input is tokenized up front. The parser walks the buffer with a
//! cursor and rewinds to saved checkpoints when a speculative parse does not
//! pan out, so the buffer itself never changes after construction.

use super::scanner::{Scanner, Unit};
use svcdef_common::ParseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Ident,
    Comment,
    StringLiteral,
    Whitespace,
    Symbol,
    Eof,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    /// Line the token starts on
    pub line: usize,
    /// Line holding the token's last visible character
    pub end_line: usize,
}

impl Token {
    fn from_unit(unit: Unit) -> Self {
        let kind = classify(&unit.text);
        let end_line = unit.line + visible_newlines(&unit.text);
        Self {
            kind,
            text: unit.text,
            line: unit.line,
            end_line,
        }
    }

    /// True for an identifier or symbol with exactly this text
    pub fn is(&self, text: &str) -> bool {
        matches!(self.kind, TokenKind::Ident | TokenKind::Symbol) && self.text == text
    }

    pub fn is_eof(&self) -> bool {
        self.kind == TokenKind::Eof
    }

    /// Token text as reported in error messages
    pub fn found(&self) -> &str {
        if self.is_eof() {
            "EOF"
        } else {
            &self.text
        }
    }
}

/// Saved cursor position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint(usize);

pub struct Lexer {
    tokens: Vec<Token>,
    pos: usize,
}

impl Lexer {
    /// Tokenize the service definitions in `source`
    pub fn new(source: &str) -> Result<Self, ParseError> {
        Self::from_scanner(Scanner::new(source))
    }

    /// Drain a scanner into a token buffer.
    ///
    /// Only service blocks are kept: everything outside them is skipped with
    /// [`Scanner::fast_forward`].
    pub fn from_scanner(mut scanner: Scanner) -> Result<Self, ParseError> {
        let mut tokens: Vec<Token> = Vec::new();

        scanner.fast_forward()?;
        while let Some(unit) = scanner.read_unit()? {
            push_token(&mut tokens, Token::from_unit(unit));
            if !scanner.in_definition() {
                scanner.fast_forward()?;
            }
        }

        let line = scanner.line();
        tokens.push(Token {
            kind: TokenKind::Eof,
            text: String::new(),
            line,
            end_line: line,
        });

        tracing::trace!(tokens = tokens.len(), "tokenized service definitions");
        Ok(Self { tokens, pos: 0 })
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Next token; at the end of the buffer this keeps returning EOF
    pub fn get_token(&mut self) -> Token {
        let token = self.peek();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    /// Step the cursor back by one token
    pub fn unget_token(&mut self) {
        self.pos = self.pos.saturating_sub(1);
    }

    pub fn peek(&self) -> Token {
        self.tokens[self.pos].clone()
    }

    /// Next token that is not whitespace
    pub fn get_token_ignore_whitespace(&mut self) -> Token {
        loop {
            let token = self.get_token();
            if token.kind != TokenKind::Whitespace {
                return token;
            }
        }
    }

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint(self.pos)
    }

    pub fn seek(&mut self, checkpoint: Checkpoint) {
        self.pos = checkpoint.0.min(self.tokens.len() - 1);
    }
}

/// Append a token, merging comments that are separated only by whitespace
/// without a blank line in between
fn push_token(tokens: &mut Vec<Token>, token: Token) {
    if token.kind == TokenKind::Comment {
        let gap = match tokens.as_slice() {
            [.., prev, ws] if prev.kind == TokenKind::Comment && is_inline_gap(ws) => Some(true),
            [.., prev] if prev.kind == TokenKind::Comment => Some(false),
            _ => None,
        };
        if let Some(has_gap) = gap {
            let separator = if has_gap { tokens.pop() } else { None };
            if let Some(prev) = tokens.last_mut() {
                if let Some(ws) = separator {
                    prev.text.push_str(&ws.text);
                }
                prev.text.push_str(&token.text);
                prev.end_line = token.end_line;
                return;
            }
        }
    }
    tokens.push(token);
}

fn is_inline_gap(token: &Token) -> bool {
    token.kind == TokenKind::Whitespace && !token.text.contains('\n')
}

fn classify(text: &str) -> TokenKind {
    match text.chars().next() {
        None => TokenKind::Eof,
        Some('/') if text.len() > 1 => TokenKind::Comment,
        Some('"') | Some('\'') => TokenKind::StringLiteral,
        Some(c) if c.is_whitespace() => TokenKind::Whitespace,
        Some(c) if c.is_alphanumeric() || c == '_' => TokenKind::Ident,
        Some(_) => TokenKind::Symbol,
    }
}

// A line comment's own trailing newline does not move its end line.
fn visible_newlines(text: &str) -> usize {
    let count = text.matches('\n').count();
    if text.starts_with('/') && text.ends_with('\n') {
        count - 1
    } else {
        count
    }
}

/// Strip comment syntax from a (possibly merged) comment token.
///
/// Handles `//`, `///`, `/* */` and leading `*` on block comment lines; each
/// line is trimmed and blank lines at either end are dropped.
pub fn strip_comment(text: &str) -> String {
    let lines: Vec<String> = text
        .lines()
        .flat_map(|line| split_inline_comments(line.trim()))
        .map(|line| {
            let line = line.trim();
            let line = line
                .strip_prefix("//")
                .map(|rest| rest.trim_start_matches('/'))
                .unwrap_or(line);
            let line = line.strip_prefix("/*").unwrap_or(line);
            let line = line.strip_suffix("*/").unwrap_or(line);
            let line = line.trim();
            let line = if line.starts_with('*') && !line.starts_with("*/") {
                line.trim_start_matches('*')
            } else {
                line
            };
            line.trim().to_string()
        })
        .collect();

    trim_blank_lines(&lines)
}

/// Normalize a comment that already had its syntax removed (for example a
/// descriptor's source info comment): trim lines and drop blank edges.
pub fn clean_description(text: &str) -> String {
    let lines: Vec<String> = text.lines().map(|l| l.trim().to_string()).collect();
    trim_blank_lines(&lines)
}

// `/* a */ /* b */` lands on one line after merging
fn split_inline_comments(line: &str) -> Vec<&str> {
    if !line.starts_with("/*") {
        return vec![line];
    }
    let mut parts = Vec::new();
    let mut rest = line;
    while let Some(end) = rest.find("*/") {
        let (part, tail) = rest.split_at(end + 2);
        parts.push(part);
        rest = tail.trim_start();
    }
    if !rest.is_empty() {
        parts.push(rest);
    }
    parts
}

fn trim_blank_lines(lines: &[String]) -> String {
    let start = lines.iter().position(|l| !l.is_empty());
    let end = lines.iter().rposition(|l| !l.is_empty());
    match (start, end) {
        (Some(start), Some(end)) => lines[start..=end].join("\n"),
        _ => String::new(),
    }
}
