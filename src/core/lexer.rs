//! TL-004: Tokenizer for literal argument text.
//!
//! Produces bracket, separator, quoted-string, and bare-atom tokens. Bare
//! atoms run up to the next delimiter and may contain spaces
//! (`copper sulphate solution`), so unquoted multi-word values survive.
//! A quoted run ends only at a quote followed by a separator, a closer, or
//! the end of input, so `'children's juice'` keeps its apostrophe.

use super::scanner::{closes_quote, opens_quote};
use thiserror::Error;

/// Literal syntax error with a byte offset into the source.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message} at offset {offset}")]
pub struct ParseError {
    pub message: String,
    pub offset: usize,
}

impl ParseError {
    pub fn new(message: impl Into<String>, offset: usize) -> Self {
        Self {
            message: message.into(),
            offset,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Colon,
    /// Interior of a `'...'` or `"..."` run, quotes removed.
    Quoted(String),
    /// Trimmed bare text between delimiters.
    Atom(String),
}

impl Token {
    pub fn describe(&self) -> String {
        match self {
            Self::LParen => "'('".to_string(),
            Self::RParen => "')'".to_string(),
            Self::LBracket => "'['".to_string(),
            Self::RBracket => "']'".to_string(),
            Self::LBrace => "'{'".to_string(),
            Self::RBrace => "'}'".to_string(),
            Self::Comma => "','".to_string(),
            Self::Colon => "':'".to_string(),
            Self::Quoted(s) => format!("string \"{}\"", s),
            Self::Atom(s) => format!("'{}'", s),
        }
    }
}

/// A token and the byte range `offset..end` it covers in the source.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub offset: usize,
    pub end: usize,
}

fn is_delimiter(c: char) -> bool {
    matches!(c, '(' | ')' | '[' | ']' | '{' | '}' | ',' | ':')
}

/// Tokenize `src`. Fails only on an unterminated quoted string.
pub fn tokenize(src: &str) -> Result<Vec<Spanned>, ParseError> {
    let mut tokens = Vec::new();
    let mut chars = src.char_indices().peekable();
    let mut prev: Option<char> = None;

    while let Some(&(offset, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }

        let token = match c {
            '(' => Token::LParen,
            ')' => Token::RParen,
            '[' => Token::LBracket,
            ']' => Token::RBracket,
            '{' => Token::LBrace,
            '}' => Token::RBrace,
            ',' => Token::Comma,
            ':' => Token::Colon,
            '"' | '\'' if opens_quote(prev) => {
                chars.next();
                let mut buf = String::new();
                let mut end = None;
                for (i, ch) in chars.by_ref() {
                    let after = i + ch.len_utf8();
                    if ch == c && closes_quote(&src[after..]) {
                        end = Some(after);
                        break;
                    }
                    buf.push(ch);
                }
                let Some(end) = end else {
                    return Err(ParseError::new("unterminated string literal", offset));
                };
                prev = Some(c);
                tokens.push(Spanned {
                    token: Token::Quoted(buf),
                    offset,
                    end,
                });
                continue;
            }
            _ => {
                let mut end = offset;
                while let Some(&(i, ch)) = chars.peek() {
                    if is_delimiter(ch) {
                        break;
                    }
                    end = i + ch.len_utf8();
                    chars.next();
                }
                let text = src[offset..end].trim_end();
                prev = text.chars().last();
                tokens.push(Spanned {
                    token: Token::Atom(text.to_string()),
                    offset,
                    end: offset + text.len(),
                });
                continue;
            }
        };

        chars.next();
        prev = Some(c);
        tokens.push(Spanned {
            token,
            offset,
            end: offset + c.len_utf8(),
        });
    }

    Ok(tokens)
}
