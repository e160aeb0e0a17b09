//! Quote- and bracket-aware scanning over a line of code
//!
//! All positions are byte offsets. Every character the scanners react to
//! is ASCII, so offsets always fall on character boundaries.

/// Characters that end a keyword, a name or an isolated word
pub const DELIMITERS: &[u8] = b" \t&'\"()[]=!<>+-/*:,{}";

pub fn is_delimiter(byte: u8) -> bool {
    DELIMITERS.contains(&byte)
}

pub fn is_space(byte: u8) -> bool {
    byte == b' ' || byte == b'\t'
}

/// First position at or after `from` that is not a space
pub fn skip_spaces(text: &str, from: usize) -> usize {
    let bytes = text.as_bytes();
    let mut pos = from.min(bytes.len());
    while pos < bytes.len() && is_space(bytes[pos]) {
        pos += 1;
    }
    pos
}

pub fn trim_spaces(text: &str) -> &str {
    text.trim_matches(|c| c == ' ' || c == '\t')
}

/// True when the text holds anything besides spaces
pub fn has_text(text: &str) -> bool {
    text.bytes().any(|b| !is_space(b))
}

/// Position right after the string literal opened at `start`
///
/// Doubled quotes are an escaped quote. `None` means the literal is not
/// terminated.
fn skip_quoted(bytes: &[u8], start: usize) -> Option<usize> {
    let quote = bytes[start];
    let mut pos = start + 1;
    while pos < bytes.len() {
        if bytes[pos] == quote {
            if bytes.get(pos + 1) == Some(&quote) {
                pos += 2;
                continue;
            }
            return Some(pos + 1);
        }
        pos += 1;
    }
    None
}

#[derive(Default)]
struct Depth {
    round: usize,
    square: usize,
    brace: usize,
}

impl Depth {
    fn track(&mut self, byte: u8) {
        match byte {
            b'(' => self.round += 1,
            b')' => self.round = self.round.saturating_sub(1),
            b'[' => self.square += 1,
            b']' => self.square = self.square.saturating_sub(1),
            b'{' => self.brace += 1,
            b'}' => self.brace = self.brace.saturating_sub(1),
            _ => {}
        }
    }

    fn is_top(&self) -> bool {
        self.round == 0 && self.square == 0 && self.brace == 0
    }
}

/// First `ch` outside string literals and brackets
///
/// An unterminated literal hides everything after it.
pub fn delim_pos(text: &str, ch: u8) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut depth = Depth::default();
    let mut pos = 0;
    while pos < bytes.len() {
        while bytes[pos] == b'\'' || bytes[pos] == b'"' {
            pos = skip_quoted(bytes, pos)?;
            if pos >= bytes.len() {
                return None;
            }
        }
        let byte = bytes[pos];
        depth.track(byte);
        if depth.is_top() && byte == ch {
            return Some(pos);
        }
        pos += 1;
    }
    None
}

/// First occurrence of `word` outside string literals and brackets
///
/// With `isolated` the match must stand on its own: it follows a
/// delimiter (or the start) and is followed by a delimiter or the end.
pub fn str_pos(text: &str, word: &str, isolated: bool) -> Option<usize> {
    if word.is_empty() {
        return Some(0);
    }
    if text.len() < word.len() || !text.contains(word) {
        return None;
    }
    let bytes = text.as_bytes();
    let pattern = word.as_bytes();
    let last = bytes.len() - pattern.len();
    let mut depth = Depth::default();
    let mut after_delimiter = true;
    let mut pos = 0;
    while pos <= last {
        if bytes[pos] == b'\'' || bytes[pos] == b'"' {
            pos = skip_quoted(bytes, pos)?;
            if pos > last {
                return None;
            }
            after_delimiter = true;
            continue;
        }
        let byte = bytes[pos];
        depth.track(byte);
        if depth.is_top() {
            if !isolated {
                if bytes[pos..].starts_with(pattern) {
                    return Some(pos);
                }
            } else if is_delimiter(byte) {
                after_delimiter = true;
            } else if after_delimiter {
                let end = pos + pattern.len();
                let ends_clean = end >= bytes.len() || is_delimiter(bytes[end]);
                if ends_clean && bytes[pos..].starts_with(pattern) {
                    return Some(pos);
                }
                after_delimiter = false;
            }
        }
        pos += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delim_pos_skips_literals_and_brackets() {
        assert_eq!(delim_pos("A = 1 & B = 2", b'&'), Some(6));
        assert_eq!(delim_pos("P 'a & b' & X", b'&'), Some(10));
        assert_eq!(delim_pos("F(1, 2), 3", b','), Some(7));
        assert_eq!(delim_pos("A[1, 2], 3", b','), Some(7));
        assert_eq!(delim_pos("{a & b} & c", b'&'), Some(8));
        assert_eq!(delim_pos("'it''s' & x", b'&'), Some(8));
        assert_eq!(delim_pos("IF 'a:", b':'), None);
        assert_eq!(delim_pos("abc", b'&'), None);
    }

    #[test]
    fn test_delim_pos_closing_bracket() {
        assert_eq!(delim_pos("(A + (B)) + 1", b')'), Some(8));
    }

    #[test]
    fn test_str_pos_isolated() {
        assert_eq!(str_pos("P 1 ELSE P 2", "ELSE", true), Some(4));
        assert_eq!(str_pos("ELSEWHERE = 1", "ELSE", true), None);
        assert_eq!(str_pos("XELSE = 1", "ELSE", true), None);
        assert_eq!(str_pos("P 'ELSE' & X", "ELSE", true), None);
        assert_eq!(str_pos("P 'A'ELSE", "ELSE", true), Some(5));
        assert_eq!(str_pos("F(ELSE)", "ELSE", true), None);
    }

    #[test]
    fn test_str_pos_plain() {
        assert_eq!(str_pos("a<<b>>c", ">>", false), Some(4));
        assert_eq!(str_pos("'>>'x>>", ">>", false), Some(5));
        assert_eq!(str_pos("abc", "", false), Some(0));
        assert_eq!(str_pos("ab", "abc", false), None);
    }

    #[test]
    fn test_space_helpers() {
        assert_eq!(skip_spaces("  \tx", 0), 3);
        assert_eq!(skip_spaces("ab", 5), 2);
        assert_eq!(trim_spaces("\t a b  "), "a b");
        assert!(!has_text(" \t"));
        assert!(has_text(" x"));
    }
}
