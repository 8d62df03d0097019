//! TL-003: Call-expression splitting.
//!
//! Finds top-level `name(...)` expressions in free text and splits argument
//! lists on separators that sit outside brackets and quotes. Text that is not
//! call-shaped is skipped without complaint.

use super::error::TaskError;

/// Bracket depth and quote state for a left-to-right scan.
///
/// A quote character only opens a quoted run at the start of a token (after
/// an opening bracket, a separator, or at the very beginning), so apostrophes
/// inside bare words like `children's` stay literal. It closes only on a
/// matching quote that ends the token, so `'children's juice'` is one run.
#[derive(Debug, Default)]
pub(crate) struct Nesting {
    depth: i32,
    quote: Option<char>,
    prev: Option<char>,
}

impl Nesting {
    /// Advance over `c`, with `rest` the text that follows it. Returns true
    /// when `c` is structural, i.e. not part of a quoted run (including its
    /// quote marks).
    pub(crate) fn step(&mut self, c: char, rest: &str) -> bool {
        if let Some(q) = self.quote {
            if c == q && closes_quote(rest) {
                self.quote = None;
                self.prev = Some(c);
            }
            return false;
        }
        let structural = match c {
            '"' | '\'' if opens_quote(self.prev) => {
                self.quote = Some(c);
                false
            }
            '(' | '[' | '{' => {
                self.depth += 1;
                true
            }
            ')' | ']' | '}' => {
                self.depth -= 1;
                true
            }
            _ => true,
        };
        if !c.is_whitespace() {
            self.prev = Some(c);
        }
        structural
    }

    pub(crate) fn depth(&self) -> i32 {
        self.depth
    }
}

/// Whether a quote following `prev` starts a quoted run.
pub(crate) fn opens_quote(prev: Option<char>) -> bool {
    matches!(prev, None | Some('(' | '[' | '{' | ',' | ':' | '='))
}

/// Whether a quote followed by `rest` ends its quoted run: only a separator,
/// a closing bracket, or the end of input may follow.
pub(crate) fn closes_quote(rest: &str) -> bool {
    match rest.trim_start().chars().next() {
        None => true,
        Some(c) => matches!(c, ',' | ':' | '=' | ')' | ']' | '}'),
    }
}

fn is_ident_char(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

/// Split `s` on `sep` wherever it appears at depth zero outside quotes.
/// Parts are trimmed; a blank trailing part is dropped.
pub fn split_top_level(s: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut nesting = Nesting::default();
    let mut start = 0;
    for (i, c) in s.char_indices() {
        let rest = &s[i + c.len_utf8()..];
        if nesting.step(c, rest) && c == sep && nesting.depth() == 0 {
            parts.push(s[start..i].trim());
            start = i + c.len_utf8();
        }
    }
    let tail = s[start..].trim();
    if !tail.is_empty() {
        parts.push(tail);
    }
    parts
}

/// Index of the delimiter closing the bracket opened at `open`.
fn find_close(text: &str, open: usize) -> Option<usize> {
    let mut nesting = Nesting::default();
    let tail = &text[open..];
    for (i, c) in tail.char_indices() {
        let rest = &tail[i + c.len_utf8()..];
        if nesting.step(c, rest) && matches!(c, ')' | ']' | '}') && nesting.depth() <= 0 {
            return Some(open + i);
        }
    }
    None
}

/// Extract every top-level call-expression from `text`, in order.
///
/// An identifier immediately followed (whitespace allowed) by `(` opens a
/// capture that ends when the brackets balance. A capture that never
/// balances is reported as malformed and ends the scan.
pub fn split_calls(text: &str) -> Vec<Result<&str, TaskError>> {
    let bytes = text.as_bytes();
    let n = bytes.len();
    let mut calls = Vec::new();
    let mut i = 0;

    while i < n {
        if !is_ident_char(bytes[i]) {
            i += 1;
            continue;
        }
        let start = i;
        while i < n && is_ident_char(bytes[i]) {
            i += 1;
        }
        let mut j = i;
        while j < n && bytes[j].is_ascii_whitespace() {
            j += 1;
        }
        if j >= n || bytes[j] != b'(' {
            continue;
        }
        match find_close(text, j) {
            Some(end) => {
                calls.push(Ok(&text[start..=end]));
                i = end + 1;
            }
            None => {
                calls.push(Err(TaskError::MalformedCall {
                    text: text[start..].trim().to_string(),
                    reason: "unbalanced delimiters".to_string(),
                }));
                break;
            }
        }
    }

    calls
}
