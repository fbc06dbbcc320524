//! Character-level scanner for `.proto` source text
//!
//! Splits the input into raw lexical units: identifier runs, whitespace runs,
//! string literals, comments, and single symbols. The scanner also tracks the
//! current line and brace depth, and whether it is inside a `service` body.

use svcdef_common::ParseError;

/// A raw lexical unit and the 1-based line it starts on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unit {
    pub text: String,
    pub line: usize,
}

/// Scanner position, restorable to push a whole unit back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Mark {
    pos: usize,
    line: usize,
    depth: i64,
    in_definition: bool,
    statement_start: bool,
}

pub struct Scanner {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    depth: i64,
    in_definition: bool,
    /// No significant unit since the start of input or the last `;` or `}`
    statement_start: bool,
}

impl Scanner {
    pub fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            depth: 0,
            in_definition: false,
            statement_start: true,
        }
    }

    pub fn line(&self) -> usize {
        self.line
    }

    /// Current `{`/`}` nesting outside strings and comments
    pub fn depth(&self) -> i64 {
        self.depth
    }

    /// True between a top-level `service` keyword and its closing brace
    pub fn in_definition(&self) -> bool {
        self.in_definition
    }

    /// Read the next unit, or `None` at end of input
    pub fn read_unit(&mut self) -> Result<Option<Unit>, ParseError> {
        let line = self.line;
        let Some(c) = self.read_rune() else {
            return Ok(None);
        };

        let text = match c {
            '/' => match self.read_rune() {
                Some('/') => self.line_comment(),
                Some('*') => self.block_comment(line)?,
                Some(_) => {
                    self.unread_rune();
                    "/".to_string()
                }
                None => "/".to_string(),
            },
            '"' | '\'' => self.string_literal(c, line)?,
            c if c.is_whitespace() => self.run(c, char::is_whitespace),
            c if is_ident_char(c) => {
                let word = self.run(c, is_ident_char);
                if word == "service"
                    && self.depth == 0
                    && self.statement_start
                    && !self.in_definition
                    && !self.dot_follows()?
                {
                    self.in_definition = true;
                }
                word
            }
            '}' => {
                if self.in_definition && self.depth == 0 {
                    self.in_definition = false;
                }
                "}".to_string()
            }
            c => c.to_string(),
        };

        if !is_trivia(&text) {
            self.statement_start = text == ";" || text == "}";
        }
        Ok(Some(Unit { text, line }))
    }

    /// Step back over the last character read, undoing its line and depth
    /// bookkeeping
    pub fn unread_rune(&mut self) {
        if self.pos == 0 {
            return;
        }
        self.pos -= 1;
        match self.chars[self.pos] {
            '\n' => self.line -= 1,
            '{' => self.depth -= 1,
            '}' => self.depth += 1,
            _ => {}
        }
    }

    /// Discard units up to the next top-level `service` keyword and leave it
    /// unread. Does nothing while inside a service body.
    ///
    /// `service` only counts as the keyword when it starts a statement and is
    /// not followed by `.`, so dotted names such as `acme.service.v1` are
    /// skipped like any other content.
    pub fn fast_forward(&mut self) -> Result<(), ParseError> {
        if self.in_definition {
            return Ok(());
        }
        loop {
            let mark = self.mark();
            match self.read_unit()? {
                None => return Ok(()),
                Some(_) if self.in_definition => {
                    self.reset(mark);
                    return Ok(());
                }
                Some(_) => {}
            }
        }
    }

    // Whether the next significant unit is `.`; the scanner is left untouched
    fn dot_follows(&mut self) -> Result<bool, ParseError> {
        let mark = self.mark();
        let next = loop {
            match self.read_unit()? {
                Some(unit) if is_trivia(&unit.text) => continue,
                other => break other,
            }
        };
        self.reset(mark);
        Ok(next.is_some_and(|unit| unit.text == "."))
    }

    fn read_rune(&mut self) -> Option<char> {
        let c = *self.chars.get(self.pos)?;
        self.pos += 1;
        match c {
            '\n' => self.line += 1,
            '{' => self.depth += 1,
            '}' => self.depth -= 1,
            _ => {}
        }
        Some(c)
    }

    // Inside strings and comments braces are text, so only lines are counted.
    fn read_raw(&mut self) -> Option<char> {
        let c = *self.chars.get(self.pos)?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
        }
        Some(c)
    }

    fn run(&mut self, first: char, accept: impl Fn(char) -> bool) -> String {
        let mut text = String::from(first);
        while let Some(c) = self.read_rune() {
            if accept(c) {
                text.push(c);
            } else {
                self.unread_rune();
                break;
            }
        }
        text
    }

    fn line_comment(&mut self) -> String {
        let mut text = String::from("//");
        while let Some(c) = self.read_raw() {
            text.push(c);
            if c == '\n' {
                break;
            }
        }
        text
    }

    fn block_comment(&mut self, line: usize) -> Result<String, ParseError> {
        let mut text = String::from("/*");
        let mut star = false;
        loop {
            let Some(c) = self.read_raw() else {
                return Err(ParseError::new(line, "`*/` closing block comment", "EOF"));
            };
            text.push(c);
            if star && c == '/' {
                return Ok(text);
            }
            star = c == '*';
        }
    }

    fn string_literal(&mut self, quote: char, line: usize) -> Result<String, ParseError> {
        let mut text = String::from(quote);
        loop {
            let Some(c) = self.read_raw() else {
                return Err(ParseError::new(line, format!("closing `{}`", quote), "EOF"));
            };
            text.push(c);
            match c {
                c if c == quote => return Ok(text),
                '\\' => {
                    if let Some(escaped) = self.read_raw() {
                        text.push(escaped);
                    }
                }
                _ => {}
            }
        }
    }

    fn mark(&self) -> Mark {
        Mark {
            pos: self.pos,
            line: self.line,
            depth: self.depth,
            in_definition: self.in_definition,
            statement_start: self.statement_start,
        }
    }

    fn reset(&mut self, mark: Mark) {
        self.pos = mark.pos;
        self.line = mark.line;
        self.depth = mark.depth;
        self.in_definition = mark.in_definition;
        self.statement_start = mark.statement_start;
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn is_trivia(text: &str) -> bool {
    text.starts_with(char::is_whitespace) || text.starts_with("//") || text.starts_with("/*")
}
