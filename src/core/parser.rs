//! TL-005: Literal value parsing and command building.
//!
//! Recursive descent over [`lexer`](super::lexer) tokens:
//! - `{k: v, ...}` → mapping with keys lowercased and spaces → underscores
//! - `(a, b)` / `[a, b]` → ordered sequence
//! - quoted text → string, or the nested literal it encodes
//! - bare atoms → float if they contain `.`, else int, else raw string
//! - bare text that carries brackets or colons after its first word
//!   (`copper (II) sulphate`, `shelf: left`) → raw string up to the next
//!   top-level `,` or closer
//!
//! A field whose value fails to parse is dropped from its command with a
//! diagnostic; the rest of the command still builds.

use super::error::{Diagnostic, Stage, TaskError};
use super::lexer::{tokenize, ParseError, Spanned, Token};
use super::scanner::{split_calls, split_top_level};
use super::types::{Command, Value};
use indexmap::IndexMap;
use tracing::{debug, warn};

/// Parse one literal argument string into a [`Value`].
pub fn parse_value(src: &str) -> Result<Value, ParseError> {
    let tokens = tokenize(src)?;
    let mut parser = ValueParser {
        src,
        tokens,
        pos: 0,
    };
    let value = parser.value()?;
    if let Some(extra) = parser.peek() {
        return Err(ParseError::new(
            format!("unexpected trailing {}", extra.token.describe()),
            extra.offset,
        ));
    }
    Ok(value)
}

struct ValueParser<'a> {
    src: &'a str,
    tokens: Vec<Spanned>,
    pos: usize,
}

impl ValueParser<'_> {
    fn peek(&self) -> Option<&Spanned> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Spanned> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn check(&self, token: &Token) -> bool {
        self.peek().is_some_and(|s| &s.token == token)
    }

    fn eof_error(&self) -> ParseError {
        ParseError::new("unexpected end of input", self.src.len())
    }

    fn value(&mut self) -> Result<Value, ParseError> {
        let Some(spanned) = self.next() else {
            return Err(self.eof_error());
        };
        match spanned.token {
            Token::LBrace => self.mapping(),
            Token::LParen => self.sequence(Token::RParen),
            Token::LBracket => self.sequence(Token::RBracket),
            Token::Quoted(text) => Ok(unquote(&text)),
            Token::Atom(text) => Ok(self.bare(&text, spanned.offset)),
            other => Err(ParseError::new(
                format!("unexpected {}", other.describe()),
                spanned.offset,
            )),
        }
    }

    /// Bare text extends over any tokens up to the next `,` or unmatched
    /// closer. A lone atom is a scalar; a longer run is its raw source text.
    fn bare(&mut self, text: &str, start: usize) -> Value {
        let mut depth = 0usize;
        let mut end = None;
        while let Some(s) = self.peek() {
            match s.token {
                Token::Comma if depth == 0 => break,
                Token::RParen | Token::RBracket | Token::RBrace => {
                    if depth == 0 {
                        break;
                    }
                    depth -= 1;
                }
                Token::LParen | Token::LBracket | Token::LBrace => depth += 1,
                _ => {}
            }
            end = Some(s.end);
            self.pos += 1;
        }
        match end {
            Some(end) => Value::Str(self.src[start..end].trim().to_string()),
            None => scalar(text),
        }
    }

    fn sequence(&mut self, close: Token) -> Result<Value, ParseError> {
        let mut items = Vec::new();
        loop {
            if self.check(&close) {
                self.pos += 1;
                break;
            }
            items.push(self.value()?);
            match self.next() {
                Some(Spanned {
                    token: Token::Comma,
                    ..
                }) => continue,
                Some(s) if s.token == close => break,
                Some(s) => {
                    return Err(ParseError::new(
                        format!(
                            "expected ',' or {}, found {}",
                            close.describe(),
                            s.token.describe()
                        ),
                        s.offset,
                    ))
                }
                None => return Err(self.eof_error()),
            }
        }
        Ok(Value::Seq(items))
    }

    fn mapping(&mut self) -> Result<Value, ParseError> {
        let mut map = IndexMap::new();
        loop {
            let Some(spanned) = self.next() else {
                return Err(self.eof_error());
            };
            let key = match spanned.token {
                Token::RBrace => break,
                Token::Atom(k) | Token::Quoted(k) => normalize_key(&k),
                other => {
                    return Err(ParseError::new(
                        format!("expected mapping key, found {}", other.describe()),
                        spanned.offset,
                    ))
                }
            };

            // An item without a colon carries no value; skip it.
            if self.check(&Token::Comma) {
                debug!(key = %key, "mapping item without ':' skipped");
                self.pos += 1;
                continue;
            }
            if self.check(&Token::RBrace) {
                debug!(key = %key, "mapping item without ':' skipped");
                continue;
            }
            match self.next() {
                Some(Spanned {
                    token: Token::Colon,
                    ..
                }) => {}
                Some(s) => {
                    return Err(ParseError::new(
                        format!("expected ':' after key '{}', found {}", key, s.token.describe()),
                        s.offset,
                    ))
                }
                None => return Err(self.eof_error()),
            }

            let value = self.value()?;
            map.insert(key, value);

            match self.next() {
                Some(Spanned {
                    token: Token::Comma,
                    ..
                }) => {}
                Some(Spanned {
                    token: Token::RBrace,
                    ..
                }) => break,
                Some(s) => {
                    return Err(ParseError::new(
                        format!("expected ',' or '}}', found {}", s.token.describe()),
                        s.offset,
                    ))
                }
                None => return Err(self.eof_error()),
            }
        }
        Ok(Value::Map(map))
    }
}

/// Lowercase a mapping key and join its words with underscores.
pub fn normalize_key(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_lowercase()
}

/// A quoted string may itself hold a bracketed literal; parse it if so.
fn unquote(text: &str) -> Value {
    let inner = text.trim();
    let bracketed = matches!(
        (inner.chars().next(), inner.chars().last()),
        (Some('{'), Some('}')) | (Some('('), Some(')')) | (Some('['), Some(']'))
    );
    if bracketed {
        match parse_value(inner) {
            Ok(v) => return v,
            Err(e) => debug!(text = %inner, error = %e, "quoted literal kept as string"),
        }
    }
    Value::Str(inner.to_string())
}

fn scalar(text: &str) -> Value {
    if text.contains('.') {
        if let Ok(f) = text.parse::<f64>() {
            return Value::Float(f);
        }
    } else if let Ok(i) = text.parse::<i64>() {
        return Value::Int(i);
    }
    Value::Str(text.to_string())
}

// ============================================================================
// Command building
// ============================================================================

/// Build a [`Command`] from one raw call-expression.
///
/// Malformed field values are dropped and recorded in `diagnostics`; an
/// expression that is not `name(...)` at all is an error.
pub fn parse_command(raw: &str, diagnostics: &mut Vec<Diagnostic>) -> Result<Command, TaskError> {
    let text = raw.trim();
    let malformed = |reason: &str| TaskError::MalformedCall {
        text: text.to_string(),
        reason: reason.to_string(),
    };

    let name_len = text
        .find(|c: char| !(c.is_ascii_alphabetic() || c == '_'))
        .unwrap_or(text.len());
    if name_len == 0 {
        return Err(malformed("missing command name"));
    }
    let name = &text[..name_len];
    let rest = text[name_len..].trim_start();
    let interior = rest
        .strip_prefix('(')
        .and_then(|r| r.strip_suffix(')'))
        .ok_or_else(|| malformed("expected parenthesized arguments"))?;

    let mut params = IndexMap::new();
    for pair in split_top_level(interior, ',') {
        let Some((key, value)) = pair.split_once('=') else {
            debug!(command = %name, arg = %pair, "positional argument skipped");
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        match parse_value(value) {
            Ok(v) => {
                params.insert(key.to_string(), v);
            }
            Err(e) => {
                warn!(command = %name, field = %key, error = %e, "dropping malformed field");
                diagnostics.push(Diagnostic::new(
                    Stage::Parse,
                    TaskError::MalformedField {
                        field: key.to_string(),
                        reason: e.to_string(),
                    },
                ));
            }
        }
    }

    Ok(Command {
        name: name.to_string(),
        params,
    })
}

/// Commands extracted from instruction text, plus recovered failures.
#[derive(Debug, Default)]
pub struct ParsedInstruction {
    pub commands: Vec<Command>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Split `text` into call-expressions and build a command from each.
pub fn parse_instruction(text: &str) -> ParsedInstruction {
    let mut parsed = ParsedInstruction::default();
    for call in split_calls(text) {
        let result = call.and_then(|raw| parse_command(raw, &mut parsed.diagnostics));
        match result {
            Ok(cmd) => parsed.commands.push(cmd),
            Err(e) => {
                warn!(error = %e, "skipping call-expression");
                parsed.diagnostics.push(Diagnostic::new(Stage::Parse, e));
            }
        }
    }
    debug!(commands = parsed.commands.len(), "instruction parsed");
    parsed
}
