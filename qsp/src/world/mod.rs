//! Locations of a loaded game
//!
//! The registry is kept sorted by the upper-cased location name so that
//! lookups are a binary search. Source order is remembered separately
//! for "the first location" of a text world.

pub mod state;

use crate::error::{CompileError, Result};
use crate::preprocessor::{LineOfCode, preprocess};
use std::rc::Rc;
use tracing::{debug, warn};

/// Action a location adds every time it is shown
#[derive(Debug, Clone)]
pub struct LocationAction {
    /// May contain `<<expr>>` parts, formatted when the action is added
    pub desc: String,
    pub image: Option<String>,
    pub code: Rc<[LineOfCode]>,
}

#[derive(Debug, Clone)]
pub struct Location {
    pub name: String,
    /// Text written to the main panel on entry, `<<expr>>` formatted
    pub description: String,
    pub actions: Vec<LocationAction>,
    pub on_visit: Rc<[LineOfCode]>,
}

impl Location {
    pub fn new(name: impl Into<String>, code: &str) -> Self {
        Location {
            name: name.into(),
            description: String::new(),
            actions: Vec::new(),
            on_visit: preprocess(code).into(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_action(mut self, desc: impl Into<String>, image: Option<String>, code: &str) -> Self {
        self.actions.push(LocationAction {
            desc: desc.into(),
            image,
            code: preprocess(code).into(),
        });
        self
    }
}

/// Normalized lookup key of a location name
pub fn location_key(name: &str) -> String {
    name.trim_matches(|c| c == ' ' || c == '\t').to_uppercase()
}

#[derive(Debug, Clone, Default)]
pub struct World {
    /// Sorted by key
    locations: Vec<(String, Location)>,
    first: Option<String>,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a location; a location with the same name is replaced
    pub fn add(&mut self, location: Location) {
        let key = location_key(&location.name);
        if self.first.is_none() {
            self.first = Some(location.name.clone());
        }
        match self.locations.binary_search_by(|(k, _)| k.as_str().cmp(&key)) {
            Ok(i) => {
                warn!(location = %location.name, "duplicate location replaced");
                self.locations[i].1 = location;
            }
            Err(i) => self.locations.insert(i, (key, location)),
        }
    }

    pub fn find(&self, name: &str) -> Option<&Location> {
        let key = location_key(name);
        self.locations
            .binary_search_by(|(k, _)| k.as_str().cmp(&key))
            .ok()
            .map(|i| &self.locations[i].1)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    /// Name of the first location added
    pub fn first(&self) -> Option<&str> {
        self.first.as_deref()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.locations.iter().map(|(_, loc)| loc.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    /// Parse the plain-text format
    ///
    /// ```text
    /// # start
    /// *pl 'Hello'
    /// - start
    /// ```
    ///
    /// A `-` line only closes a location when it is outside string
    /// literals and `{}` blocks. A location left open at the end of the
    /// text runs to the end.
    pub fn load_text(source: &str) -> Result<World> {
        let mut world = World::new();
        let mut open: Option<(String, String)> = None;
        let mut tracker = LiteralTracker::default();
        for (i, raw) in source.split('\n').enumerate() {
            let line = raw.strip_suffix('\r').unwrap_or(raw);
            let lead = line.trim_start_matches([' ', '\t']);
            if open.is_some() && tracker.is_outside() && lead.starts_with('-') {
                if let Some((name, code)) = open.take() {
                    world.add(Location::new(name, &code));
                }
                continue;
            }
            match open.as_mut() {
                Some((_, code)) => {
                    code.push_str(line);
                    code.push('\n');
                    tracker.feed(line);
                    tracker.feed("\n");
                }
                None => {
                    if let Some(header) = lead.strip_prefix('#') {
                        let name = header.trim_matches(|c| c == ' ' || c == '\t');
                        if name.is_empty() {
                            return Err(CompileError::world("location header without a name", i + 1));
                        }
                        open = Some((name.to_string(), String::new()));
                        tracker = LiteralTracker::default();
                    }
                }
            }
        }
        if let Some((name, code)) = open {
            world.add(Location::new(name, &code));
        }
        debug!(locations = world.len(), "world loaded");
        Ok(world)
    }
}

/// Follows string literals and `{}` blocks across lines
#[derive(Debug, Default)]
struct LiteralTracker {
    quote: Option<char>,
    braces: usize,
    /// Quote just seen inside a literal, may be the first of a doubled pair
    pending_quote: bool,
}

impl LiteralTracker {
    fn feed(&mut self, text: &str) {
        for c in text.chars() {
            if self.pending_quote {
                self.pending_quote = false;
                if Some(c) == self.quote {
                    continue;
                }
                self.quote = None;
            }
            match self.quote {
                Some(q) if c == q => self.pending_quote = true,
                Some(_) => {}
                None => match c {
                    '{' => self.braces += 1,
                    '}' => self.braces = self.braces.saturating_sub(1),
                    '\'' | '"' => self.quote = Some(c),
                    _ => {}
                },
            }
        }
    }

    fn is_outside(&self) -> bool {
        (self.quote.is_none() || self.pending_quote) && self.braces == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_ignores_case_and_spaces() {
        let mut world = World::new();
        world.add(Location::new("Hall", "p 1"));
        world.add(Location::new("attic", ""));
        assert!(world.contains(" HALL "));
        assert!(world.contains("Attic"));
        assert!(!world.contains("cellar"));
        assert_eq!(world.first(), Some("Hall"));
        assert_eq!(world.names().collect::<Vec<_>>(), vec!["attic", "Hall"]);
    }

    #[test]
    fn test_load_text() {
        let source = "intro text\n# start\n*pl 'hi'\nx = 1\n- start\n\n# next\np 2\n--- next ---\n";
        let world = World::load_text(source).unwrap();
        assert_eq!(world.len(), 2);
        assert_eq!(world.first(), Some("start"));
        let start = world.find("START").unwrap();
        assert_eq!(start.on_visit.len(), 3);
        assert_eq!(start.on_visit[0].text, "*PL 'hi'");
        assert_eq!(start.on_visit[1].line_number, 2);
    }

    #[test]
    fn test_dash_inside_literal_does_not_close() {
        let source = "# a\np 'one\n- two'\n- a\n";
        let world = World::load_text(source).unwrap();
        let a = world.find("a").unwrap();
        assert_eq!(a.on_visit[0].text, "P 'one\n- two'");
    }

    #[test]
    fn test_unclosed_location_runs_to_end() {
        let world = World::load_text("# only\np 1").unwrap();
        assert_eq!(world.find("only").unwrap().on_visit.len(), 2);
    }

    #[test]
    fn test_header_without_name() {
        let err = World::load_text("text\n#  \n").unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }
}
