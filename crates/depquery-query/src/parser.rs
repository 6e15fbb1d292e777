//! Selector parser.
//!
//! Turns a query string into an [`Ast`]. Two rewrites run before
//! tokenizing, because `/` and `.` are significant in selector syntax but
//! also appear inside package names and versions:
//!
//! - a `/` right after a `#@scope` id is escaped (`#@x/y` -> `#@x\/y`)
//! - literal dots are escaped: dots inside quoted strings, dots followed by a
//!   digit (`1.2.3`) and dots inside `#name` ids unless they start a class
//!
//! After parsing, quoted strings and quoted attribute values get their dots
//! unescaped again. Everything else reads escapes while tokenizing.
//!
//! Pseudo-selector arguments are parsed as a selector list. When that fails
//! (`:semver(^1.0.0)`, `:published(>=2024-01-01)`) each comma-separated
//! argument is kept as a single tag or string node, so handlers can read
//! the raw argument text from the selector's `source`.

use crate::ast::{Ast, AttributeSelector};
use crate::error::QueryError;
use once_cell::sync::Lazy;
use regex::Regex;

/// Class names recognised after a dot inside an id.
const CLASS_NAMES: &[&str] = &["prod", "dev", "optional", "peer", "workspace"];

static SCOPED_ID_SLASH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(#@[^\s/,>~+:()\[\]{}]+)/").expect("valid regex"));

/// Escape every `.` as `\.`.
pub fn escape_dots(input: &str) -> String {
    input.replace('.', "\\.")
}

/// Turn every `\.` back into `.`.
pub fn unescape_dots(input: &str) -> String {
    input.replace("\\.", ".")
}

/// Parse a selector query.
pub fn parse(query: &str) -> Result<Ast, QueryError> {
    let escaped = escape_literal_dots(&SCOPED_ID_SLASH.replace_all(query, "${1}\\/"));
    let text = QueryText {
        original: query,
        escaped: &escaped,
    };
    let mut parser = Parser::new(&escaped, text, 0);
    let nodes = parser.parse_selector_list()?;
    if let Some(c) = parser.peek() {
        return Err(parser.error(format!("unexpected '{}'", c)));
    }
    let mut root = Ast::Root { nodes };
    unescape_strings(&mut root);
    Ok(root)
}

fn unescape_source(input: &str) -> String {
    unescape_dots(input).replace("\\/", "/")
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '-' | '_' | '@') || !c.is_ascii()
}

fn starts_known_class(rest: &[char]) -> bool {
    let word: String = rest.iter().take_while(|c| is_ident_char(**c)).collect();
    CLASS_NAMES.contains(&word.as_str())
}

fn escape_literal_dots(query: &str) -> String {
    let chars: Vec<char> = query.chars().collect();
    let mut out = String::with_capacity(query.len() + 8);
    let mut quote: Option<char> = None;
    let mut in_id = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c == '\\' {
            out.push(c);
            if let Some(&next) = chars.get(i + 1) {
                out.push(next);
                i += 1;
            }
            i += 1;
            continue;
        }

        if let Some(q) = quote {
            match c {
                '.' => out.push_str("\\."),
                c if c == q => {
                    quote = None;
                    out.push(c);
                }
                c => out.push(c),
            }
            i += 1;
            continue;
        }

        match c {
            '"' | '\'' => {
                quote = Some(c);
                in_id = false;
                out.push(c);
            }
            '#' => {
                in_id = true;
                out.push(c);
            }
            '.' => {
                let digit_follows = chars.get(i + 1).is_some_and(|n| n.is_ascii_digit());
                if digit_follows || (in_id && !starts_known_class(&chars[i + 1..])) {
                    out.push_str("\\.");
                } else {
                    in_id = false;
                    out.push(c);
                }
            }
            c => {
                if in_id && !is_ident_char(c) {
                    in_id = false;
                }
                out.push(c);
            }
        }
        i += 1;
    }
    out
}

/// Post-parse pass: quoted text keeps its escapes until here.
fn unescape_strings(node: &mut Ast) {
    match node {
        Ast::String { value } => *value = unescape_dots(value),
        Ast::Attribute(attr) if attr.quoted => {
            attr.value = attr.value.as_deref().map(unescape_dots);
        }
        _ => {}
    }
    if let Some(children) = node.children_mut() {
        children.iter_mut().for_each(unescape_strings);
    }
}

/// Split pseudo arguments at top-level commas.
fn split_args(raw: &str) -> Vec<&str> {
    let mut args = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut start = 0;

    for (i, c) in raw.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match (quote, c) {
            (_, '\\') => escaped = true,
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '(' | '[') => depth += 1,
            (None, ')' | ']') => depth = depth.saturating_sub(1),
            (None, ',') if depth == 0 => {
                args.push(&raw[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    args.push(&raw[start..]);
    args
}

fn unquote(raw: &str) -> Option<&str> {
    let first = raw.chars().next()?;
    if matches!(first, '"' | '\'') && raw.len() >= 2 && raw.ends_with(first) {
        Some(&raw[1..raw.len() - 1])
    } else {
        None
    }
}

/// The query as written and as tokenized.
#[derive(Debug, Clone, Copy)]
struct QueryText<'q> {
    original: &'q str,
    escaped: &'q str,
}

impl QueryText<'_> {
    /// Map an offset in the escaped text back to the query as written.
    ///
    /// Escaping only inserts backslashes, so every other byte lines up.
    fn original_offset(&self, escaped_offset: usize) -> usize {
        let mut original = self.original.char_indices().peekable();
        for (at, c) in self.escaped.char_indices() {
            if at >= escaped_offset {
                break;
            }
            if original.peek().is_some_and(|&(_, o)| o == c) {
                original.next();
            }
        }
        original
            .peek()
            .map_or(self.original.len(), |&(at, _)| at)
    }
}

struct Parser<'q> {
    input: &'q str,
    text: QueryText<'q>,
    /// Offset of `input` within the escaped query
    base: usize,
    pos: usize,
}

impl<'q> Parser<'q> {
    fn new(input: &'q str, text: QueryText<'q>, base: usize) -> Self {
        Self {
            input,
            text,
            base,
            pos: 0,
        }
    }

    fn error(&self, message: impl Into<String>) -> QueryError {
        let position = self.text.original_offset(self.base + self.pos);
        QueryError::parse(self.text.original, position, message)
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        self.input[self.pos..].chars().nth(1)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    // ------------------------------------------------------------------------
    // Selectors
    // ------------------------------------------------------------------------

    fn parse_selector_list(&mut self) -> Result<Vec<Ast>, QueryError> {
        let mut selectors = Vec::new();
        loop {
            let start = self.pos;
            let nodes = self.parse_selector_nodes()?;
            let source = unescape_source(self.input[start..self.pos].trim());
            selectors.push(Ast::Selector { nodes, source });
            if !self.eat(',') {
                break;
            }
        }
        Ok(selectors)
    }

    fn parse_selector_nodes(&mut self) -> Result<Vec<Ast>, QueryError> {
        let mut nodes: Vec<Ast> = Vec::new();
        let mut pending_space = false;

        loop {
            match self.peek() {
                None | Some(',') | Some(')') => break,
                Some(c) if c.is_whitespace() || c == '{' || c == '}' => {
                    self.bump();
                    pending_space = true;
                }
                Some('/') if self.peek_second() == Some('*') => {
                    nodes.push(self.parse_comment()?);
                }
                Some(c @ ('>' | '~' | '+')) => {
                    self.bump();
                    if matches!(last_significant(&nodes), Some(Ast::Combinator { value }) if value == " ")
                    {
                        remove_last_combinator(&mut nodes);
                    }
                    nodes.push(Ast::Combinator {
                        value: c.to_string(),
                    });
                    pending_space = false;
                }
                Some(_) => {
                    let node = self.parse_simple()?;
                    let after_compound = last_significant(&nodes)
                        .is_some_and(|last| !matches!(last, Ast::Combinator { .. }));
                    // `a { &[x] }` is `a[x]`, not a descendant step
                    if pending_space && after_compound && !matches!(node, Ast::Nesting) {
                        nodes.push(Ast::Combinator {
                            value: " ".to_string(),
                        });
                    }
                    pending_space = false;
                    nodes.push(node);
                }
            }
        }

        if last_significant(&nodes).is_none() {
            return Err(self.error("empty selector"));
        }
        Ok(nodes)
    }

    fn parse_simple(&mut self) -> Result<Ast, QueryError> {
        let Some(c) = self.peek() else {
            return Err(self.error("unexpected end of selector"));
        };
        match c {
            '*' => {
                self.bump();
                Ok(Ast::Universal)
            }
            '&' => {
                self.bump();
                Ok(Ast::Nesting)
            }
            '.' => {
                self.bump();
                let value = self.expect_ident("class name")?;
                Ok(Ast::Class { value })
            }
            '#' => {
                self.bump();
                let value = self.expect_ident("id")?;
                Ok(Ast::Identifier { value })
            }
            '[' => self.parse_attribute(),
            ':' => self.parse_pseudo(),
            '"' | '\'' => {
                let value = self.read_string()?;
                Ok(Ast::String { value })
            }
            c if is_ident_char(c) || c == '\\' => {
                let value = self.read_ident()?;
                Ok(Ast::Tag { value })
            }
            c => Err(self.error(format!("unexpected '{}'", c))),
        }
    }

    fn parse_comment(&mut self) -> Result<Ast, QueryError> {
        self.pos += 2;
        let rest = &self.input[self.pos..];
        let Some(end) = rest.find("*/") else {
            return Err(self.error("unterminated comment"));
        };
        let value = unescape_source(&rest[..end]);
        self.pos += end + 2;
        Ok(Ast::Comment { value })
    }

    // ------------------------------------------------------------------------
    // Tokens
    // ------------------------------------------------------------------------

    fn read_ident(&mut self) -> Result<String, QueryError> {
        let mut value = String::new();
        while let Some(c) = self.peek() {
            if c == '\\' {
                self.bump();
                match self.bump() {
                    Some(escaped) => value.push(escaped),
                    None => return Err(self.error("dangling escape")),
                }
            } else if is_ident_char(c) {
                self.bump();
                value.push(c);
            } else {
                break;
            }
        }
        Ok(value)
    }

    fn expect_ident(&mut self, what: &str) -> Result<String, QueryError> {
        let value = self.read_ident()?;
        if value.is_empty() {
            return Err(self.error(format!("expected {}", what)));
        }
        Ok(value)
    }

    /// Quoted string; escapes are kept verbatim.
    fn read_string(&mut self) -> Result<String, QueryError> {
        let Some(quote) = self.bump() else {
            return Err(self.error("expected string"));
        };
        let mut value = String::new();
        loop {
            match self.bump() {
                None => return Err(self.error("unterminated string")),
                Some('\\') => {
                    value.push('\\');
                    if let Some(c) = self.bump() {
                        value.push(c);
                    }
                }
                Some(c) if c == quote => return Ok(value),
                Some(c) => value.push(c),
            }
        }
    }

    fn parse_attribute(&mut self) -> Result<Ast, QueryError> {
        self.bump();
        self.skip_whitespace();
        let attribute = self.expect_ident("attribute name")?;
        self.skip_whitespace();

        if self.eat(']') {
            return Ok(Ast::Attribute(AttributeSelector {
                attribute,
                operator: None,
                value: None,
                quoted: false,
                insensitive: false,
            }));
        }

        let mut operator = String::new();
        while let Some(c) = self.peek() {
            if !matches!(c, '~' | '|' | '^' | '$' | '*' | '!' | '=' | '<' | '>') {
                break;
            }
            operator.push(c);
            self.bump();
        }
        if operator.is_empty() {
            return Err(self.error("expected attribute operator or ']'"));
        }

        self.skip_whitespace();
        let (value, quoted) = match self.peek() {
            Some('"' | '\'') => (self.read_string()?, true),
            _ => (self.read_attribute_value()?, false),
        };

        self.skip_whitespace();
        let mut insensitive = false;
        if let Some(flag @ ('i' | 'I' | 's' | 'S')) = self.peek() {
            self.bump();
            insensitive = matches!(flag, 'i' | 'I');
            self.skip_whitespace();
        }

        if !self.eat(']') {
            return Err(self.error("unterminated attribute selector"));
        }

        Ok(Ast::Attribute(AttributeSelector {
            attribute,
            operator: Some(operator),
            value: Some(value),
            quoted,
            insensitive,
        }))
    }

    fn read_attribute_value(&mut self) -> Result<String, QueryError> {
        let mut value = String::new();
        while let Some(c) = self.peek() {
            match c {
                '\\' => {
                    self.bump();
                    match self.bump() {
                        Some(escaped) => value.push(escaped),
                        None => return Err(self.error("dangling escape")),
                    }
                }
                ']' => break,
                c if c.is_whitespace() => break,
                c => {
                    self.bump();
                    value.push(c);
                }
            }
        }
        if value.is_empty() {
            return Err(self.error("expected attribute value"));
        }
        Ok(value)
    }

    fn parse_pseudo(&mut self) -> Result<Ast, QueryError> {
        self.bump();
        self.eat(':');
        let value = self.expect_ident("pseudo-class name")?;

        if !self.eat('(') {
            return Ok(Ast::Pseudo {
                value,
                nodes: Vec::new(),
            });
        }

        let start = self.pos;
        let mut depth = 0usize;
        let mut quote: Option<char> = None;
        loop {
            let Some(c) = self.bump() else {
                return Err(self.error(format!("unterminated :{}(", value)));
            };
            match (quote, c) {
                (_, '\\') => {
                    self.bump();
                }
                (Some(q), c) if c == q => quote = None,
                (Some(_), _) => {}
                (None, '"' | '\'') => quote = Some(c),
                (None, '(') => depth += 1,
                (None, ')') if depth == 0 => break,
                (None, ')') => depth -= 1,
                _ => {}
            }
        }
        let raw = &self.input[start..self.pos - 1];
        let nodes = self.parse_arguments(raw, start)?;
        Ok(Ast::Pseudo { value, nodes })
    }

    fn parse_arguments(&self, raw: &str, offset: usize) -> Result<Vec<Ast>, QueryError> {
        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }

        if let Ok(list) = parse_complete(raw, self.text, self.base + offset) {
            return Ok(list);
        }

        Ok(split_args(raw)
            .into_iter()
            .map(|arg| self.fallback_argument(arg, offset))
            .collect())
    }

    /// A single argument that is not valid selector syntax.
    fn fallback_argument(&self, arg: &str, offset: usize) -> Ast {
        let trimmed = arg.trim();
        if let Ok(mut list) = parse_complete(trimmed, self.text, self.base + offset) {
            if list.len() == 1 {
                if let Some(selector) = list.pop() {
                    return selector;
                }
            }
        }

        let source = unescape_source(trimmed);
        let node = match unquote(trimmed) {
            Some(inner) => Ast::String {
                value: inner.to_string(),
            },
            None => Ast::Tag {
                value: source.clone(),
            },
        };
        Ast::Selector {
            nodes: vec![node],
            source,
        }
    }
}

/// Parse `input` as a selector list that must consume all input.
fn parse_complete<'q>(
    input: &'q str,
    text: QueryText<'q>,
    base: usize,
) -> Result<Vec<Ast>, QueryError> {
    let mut parser = Parser::new(input, text, base);
    let list = parser.parse_selector_list()?;
    if let Some(c) = parser.peek() {
        return Err(parser.error(format!("unexpected '{}'", c)));
    }
    Ok(list)
}

fn last_significant(nodes: &[Ast]) -> Option<&Ast> {
    nodes.iter().rev().find(|n| !matches!(n, Ast::Comment { .. }))
}

fn remove_last_combinator(nodes: &mut Vec<Ast>) {
    if let Some(pos) = nodes
        .iter()
        .rposition(|n| matches!(n, Ast::Combinator { .. }))
    {
        nodes.remove(pos);
    }
}
