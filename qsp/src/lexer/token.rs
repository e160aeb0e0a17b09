//! Token definitions

use crate::interp::value::parse_number;
use logos::{Lexer, Logos};

/// Expression token
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n]+")]
pub enum Token {
    // Literals
    #[regex("[0-9]+", |lex| parse_number(lex.slice()))]
    Number(i64),
    #[regex(r"'([^']|'')*'", |lex| unquote(lex.slice()))]
    #[regex(r#""([^"]|"")*""#, |lex| unquote(lex.slice()))]
    Str(String),
    /// `{...}` code literal; braces nest and quotes inside are respected
    #[token("{", lex_code)]
    Code(String),

    /// Variable, function or word operator; classified by the compiler
    #[regex(r#"[^ \t\r\n&'"()\[\]=!<>+\-/*:,{}0-9][^ \t\r\n&'"()\[\]=!<>+\-/*:,{}]*"#, |lex| lex.slice().to_string())]
    Name(String),

    // Arithmetic
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("&")]
    Amp,

    // Comparison
    #[token("=")]
    Eq,
    #[token("<>")]
    #[token("!")]
    NotEq,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("<=")]
    #[token("=<")]
    LtEq,
    #[token(">=")]
    #[token("=>")]
    GtEq,

    // Delimiters
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,
}

/// Strip the surrounding quotes and collapse doubled ones
fn unquote(slice: &str) -> String {
    let quote = &slice[..1];
    let inner = &slice[1..slice.len() - 1];
    inner.replace(&quote.repeat(2), quote)
}

/// Consume a brace-delimited code literal after the opening `{`
fn lex_code(lex: &mut Lexer<Token>) -> Option<String> {
    let rest = lex.remainder();
    let end = find_code_end(rest)?;
    let body = rest[..end].to_string();
    lex.bump(end + 1);
    Some(body)
}

/// Byte offset of the `}` closing a code literal whose `{` was consumed
pub fn find_code_end(text: &str) -> Option<usize> {
    let mut depth = 1usize;
    let mut quote: Option<char> = None;
    let mut chars = text.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        match quote {
            Some(q) if c == q => {
                if chars.peek().map(|&(_, next)| next) == Some(q) {
                    chars.next();
                } else {
                    quote = None;
                }
            }
            Some(_) => {}
            None => match c {
                '\'' | '"' => quote = Some(c),
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(i);
                    }
                }
                _ => {}
            },
        }
    }
    None
}

impl Token {
    /// Token opens a value that may directly follow a word operator
    pub fn starts_expression(&self) -> bool {
        matches!(self, Token::LParen | Token::LBracket | Token::Code(_) | Token::Str(_))
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Number(n) => write!(f, "{n}"),
            Token::Str(s) => write!(f, "'{}'", s.replace('\'', "''")),
            Token::Code(s) => write!(f, "{{{s}}}"),
            Token::Name(s) => write!(f, "{s}"),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Star => write!(f, "*"),
            Token::Slash => write!(f, "/"),
            Token::Amp => write!(f, "&"),
            Token::Eq => write!(f, "="),
            Token::NotEq => write!(f, "<>"),
            Token::Lt => write!(f, "<"),
            Token::Gt => write!(f, ">"),
            Token::LtEq => write!(f, "<="),
            Token::GtEq => write!(f, ">="),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::LBracket => write!(f, "["),
            Token::RBracket => write!(f, "]"),
            Token::Comma => write!(f, ","),
            Token::Colon => write!(f, ":"),
        }
    }
}
