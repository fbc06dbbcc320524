//! Recursive-descent parser for service blocks and their HTTP rules
//!
//! Grammar (whitespace and comments between tokens are skipped):
//!
//! ```text
//! service  := "service" IDENT "{" method* "}"
//! method   := "rpc" IDENT "(" ["stream"] TYPE ")" "returns" "(" ["stream"] TYPE ")"
//!             ( ";" | "{" bindings [";"] "}" )
//! bindings := "option" "(" NAME ")" "=" "{" ( field | additional )* "}"
//! additional := "additional_bindings" [":"] "{" field* "}"
//! field    := IDENT ":" STRING | "custom" [":"] "{" IDENT ":" STRING ... "}"
//! ```
//!
//! A comment directly above a declaration (no blank line in between) becomes
//! that declaration's description. A trailing comment at the end of a line is
//! therefore attached to whatever follows on the next line.

use super::lexer::{strip_comment, Lexer, Token, TokenKind};
use svcdef_common::{
    Annotation, CustomHttpPattern, HttpBinding, Method, OptionField, ParseError, Service,
};

/// Outcome of parsing the HTTP annotation of one method body
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Bindings {
    Declared(Vec<HttpBinding>),
    /// The method body closed without any HTTP option. Not an error: the
    /// method keeps its types and gets no HTTP transport.
    NoAnnotation,
}

enum OptionName {
    /// `option (google.api.http) = { ... }`
    Http,
    /// `option (google.api.http).get = "..."`
    HttpField(String),
    Other(String),
}

pub struct ServiceParser {
    lexer: Lexer,
}

impl ServiceParser {
    pub fn new(lexer: Lexer) -> Self {
        Self { lexer }
    }

    pub fn from_source(source: &str) -> Result<Self, ParseError> {
        Ok(Self::new(Lexer::new(source)?))
    }

    /// Parse the service declared in a file, or `None` if there is none.
    ///
    /// A file may declare at most one service.
    pub fn parse_file(&mut self) -> Result<Option<Service>, ParseError> {
        if self.peek_significant().is_eof() {
            return Ok(None);
        }
        let service = self.parse_service()?;
        let trailing = self.next_significant();
        if !trailing.is_eof() {
            return Err(error(&trailing, "end of input (one service per file)"));
        }
        Ok(Some(service))
    }

    pub fn parse_service(&mut self) -> Result<Service, ParseError> {
        self.service().map_err(|e| e.within("service"))
    }

    /// Parse one `rpc` declaration, or `None` when the service body ends
    pub fn parse_method(&mut self) -> Result<Option<Method>, ParseError> {
        self.method().map_err(|e| e.within("rpc"))
    }

    /// Parse the HTTP annotation of a method body, positioned after its `{`
    pub fn parse_http_bindings(&mut self) -> Result<Bindings, ParseError> {
        self.http_bindings().map_err(|e| e.within("http option"))
    }

    /// Parse `kind: "value"` pairs into `binding` up to a closing `}` or an
    /// `additional_bindings` block, neither of which is consumed
    pub fn parse_binding_fields(&mut self, binding: &mut HttpBinding) -> Result<(), ParseError> {
        self.binding_fields(binding, false)
            .map_err(|e| e.within("binding fields"))
    }

    fn service(&mut self) -> Result<Service, ParseError> {
        self.expect("service")?;
        let name = self.expect_ident("service name")?.text;
        self.expect("{")?;

        let mut methods = Vec::new();
        while let Some(method) = self.parse_method()? {
            methods.push(method);
        }
        self.expect("}")?;

        tracing::debug!(service = %name, methods = methods.len(), "parsed service");
        Ok(Service { name, methods })
    }

    fn method(&mut self) -> Result<Option<Method>, ParseError> {
        loop {
            let checkpoint = self.lexer.checkpoint();
            let (description, token) = self.next_with_description();

            if token.is("}") {
                self.lexer.seek(checkpoint);
                return Ok(None);
            }
            if token.is(";") {
                continue;
            }
            if token.is("option") {
                tracing::debug!(line = token.line, "skipping service-level option");
                self.skip_statement()?;
                continue;
            }
            if !token.is("rpc") {
                return Err(error(&token, "`rpc` or `}`"));
            }

            let name = self.expect_ident("method name")?.text;
            self.expect("(")?;
            let (request_streaming, request_type) = self.message_type()?;
            self.expect(")")?;
            self.expect("returns")?;
            self.expect("(")?;
            let (response_streaming, response_type) = self.message_type()?;
            self.expect(")")?;

            let mut method = Method {
                name,
                description,
                request_type,
                response_type,
                request_streaming,
                response_streaming,
                ..Default::default()
            };

            let open = self.next_significant();
            if open.is(";") {
                method.annotation = Annotation::Missing;
                return Ok(Some(method));
            }
            if !open.is("{") {
                return Err(error(&open, "`{` or `;`"));
            }

            match self.parse_http_bindings()? {
                Bindings::Declared(bindings) => method.bindings = bindings,
                Bindings::NoAnnotation => method.annotation = Annotation::Missing,
            }
            self.skip_trailing_options()?;
            self.expect("}")?;
            self.skip_optional(";");

            tracing::debug!(
                method = %method.name,
                bindings = method.bindings.len(),
                "parsed rpc"
            );
            return Ok(Some(method));
        }
    }

    fn http_bindings(&mut self) -> Result<Bindings, ParseError> {
        loop {
            let checkpoint = self.lexer.checkpoint();
            let (description, token) = self.next_with_description();

            if token.is("}") {
                self.lexer.seek(checkpoint);
                return Ok(Bindings::NoAnnotation);
            }
            if token.is(";") {
                continue;
            }
            if token.is("additional_bindings") {
                self.lexer.seek(checkpoint);
                return Ok(Bindings::Declared(vec![self.additional_binding()?]));
            }
            if !token.is("option") {
                return Err(error(&token, "`option` or `}`"));
            }

            match self.option_name()? {
                OptionName::Http => {}
                OptionName::HttpField(kind) => {
                    self.expect("=")?;
                    let value = self.expect_string()?;
                    let mut binding = HttpBinding {
                        description,
                        fields: vec![OptionField::new(kind, value)],
                        ..Default::default()
                    };
                    self.shorthand_fields(&mut binding)?;
                    return Ok(Bindings::Declared(vec![binding]));
                }
                OptionName::Other(name) => {
                    tracing::debug!(option = %name, line = token.line, "skipping method option");
                    self.skip_statement()?;
                    continue;
                }
            }

            self.expect("=")?;
            self.expect("{")?;

            let mut primary = HttpBinding {
                description,
                ..Default::default()
            };
            let mut siblings = Vec::new();
            loop {
                self.parse_binding_fields(&mut primary)?;
                let checkpoint = self.lexer.checkpoint();
                if self.next_significant().is("}") {
                    break;
                }
                // parse_binding_fields only stops at `}` or additional_bindings
                self.lexer.seek(checkpoint);
                siblings.push(self.additional_binding()?);
            }

            let mut bindings = Vec::with_capacity(siblings.len() + 1);
            bindings.push(primary);
            bindings.append(&mut siblings);
            return Ok(Bindings::Declared(bindings));
        }
    }

    /// Later `option (google.api.http).<kind> = "..."` statements in the same
    /// method body extend the binding the first one started
    fn shorthand_fields(&mut self, binding: &mut HttpBinding) -> Result<(), ParseError> {
        loop {
            let checkpoint = self.lexer.checkpoint();
            let (description, token) = self.next_with_description();
            if token.is(";") {
                continue;
            }
            if token.is("option") {
                match self.option_name() {
                    Ok(OptionName::HttpField(kind)) => {
                        self.expect("=")?;
                        let value = self.expect_string()?;
                        binding.fields.push(OptionField {
                            kind,
                            value,
                            description,
                        });
                        continue;
                    }
                    Ok(OptionName::Other(name)) => {
                        tracing::debug!(option = %name, line = token.line, "skipping method option");
                        self.skip_statement()?;
                        continue;
                    }
                    // a second full rule is left for the caller to reject
                    Ok(OptionName::Http) | Err(_) => {}
                }
            }
            self.lexer.seek(checkpoint);
            return Ok(());
        }
    }

    fn additional_binding(&mut self) -> Result<HttpBinding, ParseError> {
        let parse = |parser: &mut Self| -> Result<HttpBinding, ParseError> {
            let (description, token) = parser.next_with_description();
            if !token.is("additional_bindings") {
                return Err(error(&token, "`additional_bindings`"));
            }
            parser.skip_optional(":");
            parser.expect("{")?;

            let mut binding = HttpBinding {
                description,
                ..Default::default()
            };
            parser.parse_binding_fields(&mut binding)?;
            let closing = parser.next_significant();
            if !closing.is("}") {
                return Err(error(&closing, "`}` (additional_bindings do not nest)"));
            }
            Ok(binding)
        };
        parse(self).map_err(|e| e.within("additional_bindings"))
    }

    fn binding_fields(&mut self, binding: &mut HttpBinding, in_custom: bool) -> Result<(), ParseError> {
        loop {
            let checkpoint = self.lexer.checkpoint();
            let (description, token) = self.next_with_description();

            if token.is("}") || (!in_custom && token.is("additional_bindings")) {
                self.lexer.seek(checkpoint);
                return Ok(());
            }
            if token.is(",") || token.is(";") {
                continue;
            }
            if token.kind != TokenKind::Ident {
                return Err(error(&token, "binding field or `}`"));
            }

            let has_colon = self.skip_optional(":");
            let value = self.next_significant();

            if value.is("{") {
                if in_custom || token.text != "custom" {
                    return Err(error(&value, "string literal"));
                }
                let mut inner = HttpBinding::default();
                self.binding_fields(&mut inner, true)
                    .map_err(|e| e.within("custom"))?;
                self.expect("}")?;
                binding.custom = Some(custom_pattern(&inner, token.line)?);
                continue;
            }

            if !has_colon {
                return Err(error(&value, "`:`"));
            }
            if value.kind != TokenKind::StringLiteral {
                return Err(error(&value, "string literal"));
            }
            binding.fields.push(OptionField {
                kind: token.text,
                value: unquote(&value.text),
                description,
            });
        }
    }

    fn option_name(&mut self) -> Result<OptionName, ParseError> {
        let mut name = String::new();
        let first = self.next_significant();
        let extension = first.is("(");

        if extension {
            loop {
                let part = self.next_significant();
                if part.is(")") {
                    break;
                }
                if part.kind != TokenKind::Ident && !part.is(".") {
                    return Err(error(&part, "option name or `)`"));
                }
                name.push_str(&part.text);
            }
        } else if first.kind == TokenKind::Ident {
            name.push_str(&first.text);
        } else {
            return Err(error(&first, "option name"));
        }

        let checkpoint = self.lexer.checkpoint();
        let sub_field = if self.next_significant().is(".") {
            Some(self.expect_ident("option field")?.text)
        } else {
            self.lexer.seek(checkpoint);
            None
        };

        Ok(match (extension && is_http_rule(&name), sub_field) {
            (true, None) => OptionName::Http,
            (true, Some(kind)) => OptionName::HttpField(kind),
            (false, _) => OptionName::Other(name),
        })
    }

    /// `[stream] TYPE`; a type literally named `stream` is still accepted
    fn message_type(&mut self) -> Result<(bool, String), ParseError> {
        let checkpoint = self.lexer.checkpoint();
        if self.next_significant().is("stream") && !self.peek_significant().is(")") {
            return Ok((true, self.type_name()?));
        }
        self.lexer.seek(checkpoint);
        Ok((false, self.type_name()?))
    }

    fn type_name(&mut self) -> Result<String, ParseError> {
        let mut name = String::new();
        let mut token = self.next_significant();
        if token.is(".") {
            name.push('.');
            token = self.next_significant();
        }
        if token.kind != TokenKind::Ident {
            return Err(error(&token, "type name"));
        }
        name.push_str(&token.text);

        loop {
            let checkpoint = self.lexer.checkpoint();
            if !self.next_significant().is(".") {
                self.lexer.seek(checkpoint);
                return Ok(name);
            }
            let part = self.expect_ident("type name")?;
            name.push('.');
            name.push_str(&part.text);
        }
    }

    fn skip_trailing_options(&mut self) -> Result<(), ParseError> {
        loop {
            let checkpoint = self.lexer.checkpoint();
            let token = self.next_significant();
            if token.is(";") {
                continue;
            }
            if token.is("option") {
                tracing::debug!(line = token.line, "skipping method option");
                self.skip_statement()?;
                continue;
            }
            self.lexer.seek(checkpoint);
            return Ok(());
        }
    }

    /// Consume tokens through the `;` ending the current statement
    fn skip_statement(&mut self) -> Result<(), ParseError> {
        let mut depth = 0usize;
        loop {
            let token = self.next_significant();
            if token.is_eof() {
                return Err(error(&token, "`;`"));
            }
            if token.is("{") {
                depth += 1;
            } else if token.is("}") {
                if depth == 0 {
                    return Err(error(&token, "`;`"));
                }
                depth -= 1;
            } else if token.is(";") && depth == 0 {
                return Ok(());
            }
        }
    }

    /// Next token that is neither whitespace nor a comment, plus the
    /// description carried by a comment directly above it
    fn next_with_description(&mut self) -> (String, Token) {
        let mut comment: Option<Token> = None;
        loop {
            let token = self.lexer.get_token_ignore_whitespace();
            if token.kind == TokenKind::Comment {
                comment = Some(token);
                continue;
            }
            let description = match comment {
                Some(c) if token.line <= c.end_line + 1 => strip_comment(&c.text),
                _ => String::new(),
            };
            return (description, token);
        }
    }

    fn next_significant(&mut self) -> Token {
        self.next_with_description().1
    }

    fn peek_significant(&mut self) -> Token {
        let checkpoint = self.lexer.checkpoint();
        let token = self.next_significant();
        self.lexer.seek(checkpoint);
        token
    }

    fn skip_optional(&mut self, text: &str) -> bool {
        let checkpoint = self.lexer.checkpoint();
        if self.next_significant().is(text) {
            true
        } else {
            self.lexer.seek(checkpoint);
            false
        }
    }

    fn expect(&mut self, text: &str) -> Result<Token, ParseError> {
        let token = self.next_significant();
        if token.is(text) {
            Ok(token)
        } else {
            Err(error(&token, format!("`{}`", text)))
        }
    }

    fn expect_ident(&mut self, what: &str) -> Result<Token, ParseError> {
        let token = self.next_significant();
        if token.kind == TokenKind::Ident {
            Ok(token)
        } else {
            Err(error(&token, what))
        }
    }

    fn expect_string(&mut self) -> Result<String, ParseError> {
        let token = self.next_significant();
        if token.kind == TokenKind::StringLiteral {
            Ok(unquote(&token.text))
        } else {
            Err(error(&token, "string literal"))
        }
    }
}

fn error(token: &Token, expected: impl Into<String>) -> ParseError {
    ParseError::new(token.line, expected, token.found())
}

fn is_http_rule(name: &str) -> bool {
    let name = name.trim_start_matches('.');
    name == "http" || name.ends_with(".http")
}

fn custom_pattern(inner: &HttpBinding, line: usize) -> Result<CustomHttpPattern, ParseError> {
    let part = |kind: &str| {
        inner
            .field(kind)
            .map(|f| f.value.clone())
            .ok_or_else(|| ParseError::new(line, format!("`{}` in custom pattern", kind), "}"))
    };
    Ok(CustomHttpPattern {
        kind: part("kind")?,
        path: part("path")?,
    })
}

/// Strip the quotes from a string literal and resolve backslash escapes
fn unquote(literal: &str) -> String {
    let inner = ['"', '\'']
        .iter()
        .find_map(|&quote| literal.strip_prefix(quote)?.strip_suffix(quote))
        .unwrap_or(literal);

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}
