//! Line and statement preprocessor
//!
//! Turns source text into logical lines and scans every line once into
//! cached statement descriptors, so the executor never re-parses the
//! structure of a line:
//! - physical lines are split outside string literals and `{}` blocks
//! - a line ending in ` _` continues on the next one
//! - text outside literals and blocks is upper-cased for keyword matching
//! - each line is cut into statements with their argument spans

pub mod keywords;
pub mod text;

pub use keywords::Stmt;

use crate::interp::error::ErrorKind;
use crate::span::Span;
use serde::Serialize;
use text::{delim_pos, has_text, skip_spaces, str_pos, trim_spaces};
use tracing::trace;

/// One statement of a line, as byte offsets into the line text
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CachedStatement {
    pub kind: Stmt,
    /// Start of the parameters, right after the keyword
    pub param: usize,
    /// Position of the `&`, `:` or `ELSE` ending the statement
    pub end: usize,
    pub args: Vec<Span>,
    /// Argument error raised when the statement runs
    pub error: Option<ErrorKind>,
}

/// A logical line with its statements
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineOfCode {
    pub text: String,
    /// 1-based physical line the logical line starts on
    pub line_number: usize,
    pub label: Option<String>,
    pub statements: Vec<CachedStatement>,
    /// Header of a block that continues on the following lines
    pub is_multiline: bool,
}

impl LineOfCode {
    pub fn kind(&self) -> Stmt {
        self.statements.first().map_or(Stmt::Unknown, |s| s.kind)
    }

    /// Parameter text of a statement
    pub fn params(&self, index: usize) -> &str {
        match self.statements.get(index) {
            Some(stmt) => self.text.get(stmt.param..stmt.end).unwrap_or(""),
            None => "",
        }
    }

    pub fn arg(&self, stmt: &CachedStatement, index: usize) -> &str {
        stmt.args.get(index).map_or("", |span| span.slice(&self.text))
    }

    pub fn byte_at(&self, pos: usize) -> Option<u8> {
        self.text.as_bytes().get(pos).copied()
    }
}

/// Split, join and scan a source text
pub fn preprocess(source: &str) -> Vec<LineOfCode> {
    let lines: Vec<LineOfCode> = join_continuations(split_lines(source))
        .into_iter()
        .map(|(text, number)| scan_line(prepare(&text), number))
        .collect();
    trace!(lines = lines.len(), "preprocessed");
    lines
}

/// Physical lines with their 1-based numbers, breaks inside literals kept
fn split_lines(source: &str) -> Vec<(String, usize)> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut braces = 0usize;
    let mut line = 1;
    let mut start_line = 1;
    let mut chars = source.chars().filter(|&c| c != '\r').peekable();
    while let Some(c) = chars.next() {
        if c == '\n' {
            line += 1;
            if quote.is_none() && braces == 0 {
                lines.push((trim_spaces(&current).to_string(), start_line));
                current.clear();
                start_line = line;
                continue;
            }
        }
        current.push(c);
        match quote {
            Some(q) if c == q => {
                if chars.peek() == Some(&q) {
                    current.push(q);
                    chars.next();
                } else {
                    quote = None;
                }
            }
            Some(_) => {}
            None => match c {
                '{' => braces += 1,
                '}' => braces = braces.saturating_sub(1),
                '\'' | '"' => quote = Some(c),
                _ => {}
            },
        }
    }
    lines.push((trim_spaces(&current).to_string(), start_line));
    lines
}

fn join_continuations(lines: Vec<(String, usize)>) -> Vec<(String, usize)> {
    let mut out = Vec::with_capacity(lines.len());
    let mut iter = lines.into_iter();
    while let Some((mut text, number)) = iter.next() {
        while text.ends_with(" _") {
            let Some((next, _)) = iter.next() else { break };
            text.pop();
            text.push_str(&next);
        }
        out.push((text, number));
    }
    out
}

/// Upper-case everything outside string literals and `{}` blocks
fn prepare(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut quote: Option<char> = None;
    let mut braces = 0usize;
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match quote {
            Some(q) => {
                out.push(c);
                if c == q {
                    if chars.peek() == Some(&q) {
                        out.push(q);
                        chars.next();
                    } else {
                        quote = None;
                    }
                }
            }
            None => match c {
                '{' => {
                    braces += 1;
                    out.push(c);
                }
                '}' => {
                    braces = braces.saturating_sub(1);
                    out.push(c);
                }
                '\'' | '"' => {
                    quote = Some(c);
                    out.push(c);
                }
                _ if braces == 0 => out.extend(c.to_uppercase()),
                _ => out.push(c),
            },
        }
    }
    out
}

/// Scan one prepared line into its statements
pub fn scan_line(text: String, line_number: usize) -> LineOfCode {
    let statements = scan_statements(&text);
    let is_multiline = match statements.as_slice() {
        [only] => only.kind.ends_at_colon() && text.ends_with(':'),
        _ => false,
    };
    let label = line_label(&text);
    LineOfCode {
        text,
        line_number,
        label,
        statements,
        is_multiline,
    }
}

fn line_label(text: &str) -> Option<String> {
    let rest = trim_spaces(text).strip_prefix(':')?;
    let name = rest.split('&').next().unwrap_or("");
    Some(trim_spaces(name).to_uppercase())
}

fn scan_statements(text: &str) -> Vec<CachedStatement> {
    let len = text.len();
    let bytes = text.as_bytes();
    let mut statements = Vec::new();
    let mut start = skip_spaces(text, 0);
    loop {
        let rest = &text[start..];
        let (mut kind, keyword) = keywords::statement_at(rest);
        let param = match keyword {
            Some(n) => skip_spaces(text, start + n),
            None => start,
        };
        if rest.is_empty() || kind == Stmt::Comment {
            statements.push(statement(text, kind, param, len));
            break;
        }
        let (end, next) = if kind.ends_at_colon() {
            match delim_pos(rest, b':') {
                Some(p) => {
                    let end = start + p;
                    (Some(end), Some(end + 1).filter(|&n| n < len))
                }
                None => (None, None),
            }
        } else if kind == Stmt::Else {
            if param < len {
                let next = if bytes[param] == b':' { param + 1 } else { param };
                (Some(param), Some(next).filter(|&n| n < len))
            } else {
                (None, None)
            }
        } else {
            let amp = delim_pos(rest, b'&').map(|p| start + p);
            let else_word = str_pos(rest, "ELSE", true).map(|p| start + p);
            let found = match (amp, else_word) {
                (Some(a), Some(e)) if e < a => (Some(e), Some(e)),
                (None, Some(e)) => (Some(e), Some(e)),
                (Some(a), _) => (Some(a), Some(a + 1)),
                (None, None) => (None, None),
            };
            if kind == Stmt::Unknown && found.0 != Some(start) {
                let span = &text[start..found.0.unwrap_or(len)];
                kind = if delim_pos(span, b'=').is_some() {
                    Stmt::Set
                } else {
                    Stmt::Implicit
                };
            }
            found
        };
        statements.push(statement(text, kind, param, end.unwrap_or(len)));
        match (end, next) {
            (Some(_), Some(next)) => start = skip_spaces(text, next),
            _ => break,
        }
    }
    // `ELSE IF cond:` opens an else-if branch
    let else_if = matches!(
        statements.as_slice(),
        [first, second] if first.kind == Stmt::Else
            && second.kind == Stmt::If
            && bytes.get(first.param) != Some(&b':')
    );
    if else_if {
        statements.remove(0);
        statements[0].kind = Stmt::ElseIf;
    }
    statements
}

fn statement(text: &str, kind: Stmt, param: usize, end: usize) -> CachedStatement {
    let param = param.min(end);
    let (args, error) = match kind {
        Stmt::Unknown
        | Stmt::Label
        | Stmt::Else
        | Stmt::End
        | Stmt::Comment
        | Stmt::Loop
        | Stmt::For => (Vec::new(), None),
        Stmt::Set | Stmt::Local => set_args(text, param, end),
        _ => regular_args(text, kind, param, end),
    };
    CachedStatement {
        kind,
        param,
        end,
        args,
        error,
    }
}

fn trimmed_span(text: &str, start: usize, end: usize) -> Span {
    let start = skip_spaces(text, start).min(end);
    let mut stop = end;
    while stop > start && text::is_space(text.as_bytes()[stop - 1]) {
        stop -= 1;
    }
    Span::new(start, stop)
}

/// Names, operator and value of an assignment
fn set_args(text: &str, start: usize, end: usize) -> (Vec<Span>, Option<ErrorKind>) {
    let start = skip_spaces(text, start).min(end);
    let bytes = text.as_bytes();
    match delim_pos(&text[start..end], b'=') {
        Some(p) => {
            let eq = start + p;
            let op_start = if eq > start && matches!(bytes[eq - 1], b'+' | b'-' | b'*' | b'/') {
                eq - 1
            } else {
                eq
            };
            let names = trimmed_span(text, start, op_start);
            let values = trimmed_span(text, eq + 1, end);
            let error = (names.is_empty() || values.is_empty()).then_some(ErrorKind::Syntax);
            (vec![names, Span::new(op_start, eq + 1), values], error)
        }
        None => {
            let names = trimmed_span(text, start, end);
            let error = names.is_empty().then_some(ErrorKind::Syntax);
            (vec![names], error)
        }
    }
}

/// Comma-separated arguments, with one pair of outer parentheses removed
fn regular_args(text: &str, kind: Stmt, start: usize, end: usize) -> (Vec<Span>, Option<ErrorKind>) {
    let mut pos = skip_spaces(text, start).min(end);
    let mut stop = end;
    if text.as_bytes().get(pos) == Some(&b'(') && pos < stop {
        match delim_pos(&text[pos..stop], b')') {
            None => return (Vec::new(), Some(ErrorKind::BrackNotFound)),
            Some(p) => {
                let close = pos + p;
                if !has_text(&text[close + 1..stop]) {
                    pos = skip_spaces(text, pos + 1).min(close);
                    stop = close;
                }
            }
        }
    }
    let (min, max) = kind.arity();
    let mut args = Vec::new();
    let mut error = None;
    if pos < stop {
        loop {
            if args.len() >= max {
                error = Some(ErrorKind::ArgsCount);
                break;
            }
            match delim_pos(&text[pos..stop], b',') {
                Some(p) => {
                    args.push(Span::new(pos, pos + p));
                    pos = skip_spaces(text, pos + p + 1).min(stop);
                    if pos >= stop {
                        error = Some(ErrorKind::Syntax);
                        break;
                    }
                }
                None => {
                    args.push(Span::new(pos, stop));
                    break;
                }
            }
        }
    }
    if args.len() < min {
        error = Some(ErrorKind::ArgsCount);
    }
    (args, error)
}
