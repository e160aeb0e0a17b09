//! Regular expressions used by STRCOMP, STRFIND, STRPOS and ARRCOMP

use super::error::{ErrorKind, InterpResult, RuntimeError};
use regex::Regex;

/// Compiled patterns kept for reuse
const CACHE_SIZE: usize = 10;

/// A pattern compiled both for searching and for whole-string matching
#[derive(Debug, Clone)]
pub struct Pattern {
    search: Regex,
    whole: Regex,
}

impl Pattern {
    pub fn new(source: &str) -> InterpResult<Self> {
        let search = compile(source)?;
        let whole = compile(&format!(r"\A(?:{source})\z"))?;
        Ok(Pattern { search, whole })
    }

    /// True when the pattern matches all of `text`
    pub fn matches(&self, text: &str) -> bool {
        self.whole.is_match(text)
    }

    /// Text of capture `group` in the first match; group 0 is the match
    pub fn find<'t>(&self, text: &'t str, group: usize) -> Option<&'t str> {
        let captures = self.search.captures(text)?;
        captures.get(group).map(|m| m.as_str())
    }

    /// 1-based character position of capture `group` in the first match,
    /// or 0 when there is none
    pub fn position(&self, text: &str, group: usize) -> i64 {
        self.search
            .captures(text)
            .and_then(|captures| captures.get(group))
            .map_or(0, |m| text[..m.start()].chars().count() as i64 + 1)
    }
}

fn compile(source: &str) -> InterpResult<Regex> {
    Regex::new(source).map_err(|err| {
        let detail = err.to_string();
        let summary = detail.lines().last().unwrap_or_default().trim();
        RuntimeError::with_detail(ErrorKind::IncorrectRegExp, summary)
    })
}

/// Small ring of recently compiled patterns, looked up by source text
#[derive(Debug, Default)]
pub struct PatternCache {
    entries: Vec<(String, Pattern)>,
    next: usize,
}

impl PatternCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&mut self, source: &str) -> InterpResult<Pattern> {
        if let Some((_, pattern)) = self.entries.iter().find(|(text, _)| text == source) {
            return Ok(pattern.clone());
        }
        let pattern = Pattern::new(source)?;
        let entry = (source.to_string(), pattern.clone());
        if self.entries.len() < CACHE_SIZE {
            self.entries.push(entry);
        } else {
            self.entries[self.next] = entry;
        }
        self.next = (self.next + 1) % CACHE_SIZE;
        Ok(pattern)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whole_match() {
        let pattern = Pattern::new("a.c").unwrap();
        assert!(pattern.matches("abc"));
        assert!(!pattern.matches("xabc"));
        assert!(!pattern.matches("abcd"));
        let alternation = Pattern::new("ab|cd").unwrap();
        assert!(alternation.matches("cd"));
        assert!(!alternation.matches("abcd"));
    }

    #[test]
    fn test_find_and_position() {
        let pattern = Pattern::new(r"(\d+)-(\d+)").unwrap();
        assert_eq!(pattern.find("room 12-34", 0), Some("12-34"));
        assert_eq!(pattern.find("room 12-34", 2), Some("34"));
        assert_eq!(pattern.find("room 12-34", 3), None);
        assert_eq!(pattern.find("none", 0), None);
        assert_eq!(pattern.position("room 12-34", 0), 6);
        assert_eq!(pattern.position("room 12-34", 2), 9);
        assert_eq!(pattern.position("none", 0), 0);
        assert_eq!(Pattern::new("é").unwrap().position("caféé", 0), 4);
    }

    #[test]
    fn test_bad_pattern() {
        let err = Pattern::new("a(b").unwrap_err();
        assert_eq!(err.kind, ErrorKind::IncorrectRegExp);
        // must not be able to close the anchoring group
        assert!(Pattern::new("a)(b").is_err());
    }

    #[test]
    fn test_cache_reuses_and_rotates() {
        let mut cache = PatternCache::new();
        for i in 0..CACHE_SIZE + 3 {
            cache.get(&format!("x{i}")).unwrap();
        }
        assert_eq!(cache.entries.len(), CACHE_SIZE);
        assert!(cache.entries.iter().any(|(text, _)| text == "x12"));
        assert!(!cache.entries.iter().any(|(text, _)| text == "x0"));
        assert!(cache.get("x12").unwrap().matches("x12"));
        assert!(cache.get("[").is_err());
    }
}
