//! Lexer implementation using logos

mod token;

pub use token::{Token, find_code_end};

use crate::error::{CompileError, Result};
use crate::interp::error::ErrorKind;
use crate::span::Span;
use logos::Logos;

/// Tokenize an expression
///
/// An unterminated string or code literal reports QUOTNOTFOUND; any
/// other character the grammar does not know reports SYNTAX.
pub fn tokenize(source: &str) -> Result<Vec<(Token, Span)>> {
    let mut tokens = Vec::new();
    let mut lexer = Token::lexer(source);

    while let Some(result) = lexer.next() {
        let span = Span::new(lexer.span().start, lexer.span().end);
        match result {
            Ok(token) => tokens.push((token, span)),
            Err(_) => {
                let kind = match lexer.slice().chars().next() {
                    Some('\'' | '"' | '{') => ErrorKind::QuotNotFound,
                    _ => ErrorKind::Syntax,
                };
                return Err(CompileError::lexer(kind, span));
            }
        }
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<Token> {
        tokenize(source).unwrap().into_iter().map(|(t, _)| t).collect()
    }

    #[test]
    fn test_tokenize_empty() {
        assert!(tokenize("").unwrap().is_empty());
        assert!(tokenize("  \t ").unwrap().is_empty());
    }

    #[test]
    fn test_tokenize_number_and_names() {
        assert_eq!(
            kinds("42 $name %list @proc x1"),
            vec![
                Token::Number(42),
                Token::Name("$name".into()),
                Token::Name("%list".into()),
                Token::Name("@proc".into()),
                Token::Name("x1".into()),
            ]
        );
    }

    #[test]
    fn test_tokenize_strings() {
        assert_eq!(kinds("'it''s'"), vec![Token::Str("it's".into())]);
        assert_eq!(kinds(r#""say ""hi""""#), vec![Token::Str(r#"say "hi""#.into())]);
        assert_eq!(kinds("''"), vec![Token::Str(String::new())]);
    }

    #[test]
    fn test_tokenize_code_literal() {
        assert_eq!(
            kinds("{a = 1 & if b: {c} & 'x}'}"),
            vec![Token::Code("a = 1 & if b: {c} & 'x}'".into())]
        );
    }

    #[test]
    fn test_tokenize_operators() {
        assert_eq!(
            kinds("+ - * / & = <> ! < > <= =< >= =>"),
            vec![
                Token::Plus,
                Token::Minus,
                Token::Star,
                Token::Slash,
                Token::Amp,
                Token::Eq,
                Token::NotEq,
                Token::NotEq,
                Token::Lt,
                Token::Gt,
                Token::LtEq,
                Token::LtEq,
                Token::GtEq,
                Token::GtEq,
            ]
        );
    }

    #[test]
    fn test_tokenize_spans() {
        let tokens = tokenize("a[1]").unwrap();
        assert_eq!(tokens[0].1, Span::new(0, 1));
        assert_eq!(tokens[2].1, Span::new(2, 3));
    }

    #[test]
    fn test_unterminated_literals() {
        for source in ["'abc", "\"abc", "{abc", "1 + {a {b}"] {
            let err = tokenize(source).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::QuotNotFound, "{source}");
        }
    }

    #[test]
    fn test_find_code_end() {
        assert_eq!(find_code_end("a}b"), Some(1));
        assert_eq!(find_code_end("{x}}"), Some(3));
        assert_eq!(find_code_end("'}'}"), Some(3));
        assert_eq!(find_code_end("abc"), None);
    }
}
