//! Source location tracking

use serde::{Deserialize, Serialize};

/// Byte range inside one line of code or expression text
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// Shift by a base offset, used when a sub-slice is parsed on its own
    pub fn offset(self, base: usize) -> Span {
        Span::new(self.start + base, self.end + base)
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Text covered by the span, empty when it falls outside `source`
    pub fn slice<'a>(&self, source: &'a str) -> &'a str {
        source.get(self.start..self.end).unwrap_or("")
    }
}

impl std::fmt::Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

impl From<Span> for std::ops::Range<usize> {
    fn from(span: Span) -> Self {
        span.start..span.end
    }
}

impl From<std::ops::Range<usize>> for Span {
    fn from(range: std::ops::Range<usize>) -> Self {
        Span::new(range.start, range.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_merge() {
        assert_eq!(Span::new(5, 15).merge(Span::new(10, 20)), Span::new(5, 20));
        assert_eq!(Span::new(10, 20).merge(Span::new(0, 5)), Span::new(0, 20));
    }

    #[test]
    fn test_span_offset_and_slice() {
        let text = "x = 1 + 2";
        let span = Span::new(0, 3).offset(4);
        assert_eq!(span.slice(text), "1 +");
        assert_eq!(Span::new(4, 40).slice(text), "");
        assert!(Span::new(3, 3).is_empty());
    }

    #[test]
    fn test_span_display_and_range() {
        assert_eq!(format!("{}", Span::new(42, 99)), "42..99");
        let range: std::ops::Range<usize> = Span::new(5, 15).into();
        assert_eq!(range, 5..15);
        let back: Span = (10..20usize).into();
        assert_eq!(back, Span::new(10, 20));
    }
}
