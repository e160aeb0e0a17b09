//! Player-visible state: text panels, actions and objects
//!
//! Every mutation that changes what a host would display raises the
//! matching dirty flag. The engine hands the flags to the host through
//! read-and-clear queries.

use crate::interp::error::{ErrorKind, InterpResult, RuntimeError};
use crate::preprocessor::LineOfCode;
use std::rc::Rc;

pub const MAX_ACTIONS: usize = 50;
pub const MAX_OBJECTS: usize = 1000;

/// Selectable action of the current screen
#[derive(Debug, Clone)]
pub struct Action {
    pub desc: String,
    pub image: Option<String>,
    pub code: Rc<[LineOfCode]>,
    /// Location whose code added the action
    pub location: Option<String>,
}

/// Inventory object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Object {
    pub name: String,
    pub image: Option<String>,
}

#[derive(Debug, Default)]
pub struct GameState {
    pub main_text: String,
    pub stat_text: String,
    pub user_input: String,
    pub actions: Vec<Action>,
    pub objects: Vec<Object>,
    pub selected_action: Option<usize>,
    pub selected_object: Option<usize>,
    pub current_location: Option<String>,
    pub main_changed: bool,
    pub stat_changed: bool,
    pub actions_changed: bool,
    pub objects_changed: bool,
}

fn quote(text: &str) -> String {
    text.replace('\'', "''")
}

fn same_name(a: &str, b: &str) -> bool {
    a.to_uppercase() == b.to_uppercase()
}

impl GameState {
    pub fn new() -> Self {
        Self::default()
    }

    // Text panels

    pub fn append_main(&mut self, text: &str) {
        if !text.is_empty() {
            self.main_text.push_str(text);
            self.main_changed = true;
        }
    }

    pub fn set_main(&mut self, text: String) {
        self.main_text = text;
        self.main_changed = true;
    }

    pub fn clear_main(&mut self) {
        if !self.main_text.is_empty() {
            self.main_text.clear();
            self.main_changed = true;
        }
    }

    pub fn append_stat(&mut self, text: &str) {
        if !text.is_empty() {
            self.stat_text.push_str(text);
            self.stat_changed = true;
        }
    }

    pub fn clear_stat(&mut self) {
        if !self.stat_text.is_empty() {
            self.stat_text.clear();
            self.stat_changed = true;
        }
    }

    // Actions

    pub fn action_index(&self, desc: &str) -> Option<usize> {
        self.actions.iter().position(|a| same_name(&a.desc, desc))
    }

    /// Add an action unless one with the same description exists
    pub fn add_action(&mut self, action: Action) -> InterpResult<()> {
        if self.action_index(&action.desc).is_some() {
            return Ok(());
        }
        if self.actions.len() >= MAX_ACTIONS {
            return Err(RuntimeError::new(ErrorKind::CantAddAction));
        }
        self.actions.push(action);
        self.actions_changed = true;
        Ok(())
    }

    pub fn remove_action(&mut self, desc: &str) {
        let Some(index) = self.action_index(desc) else {
            return;
        };
        if self.selected_action.is_some_and(|s| s >= index) {
            self.selected_action = None;
        }
        self.actions.remove(index);
        self.actions_changed = true;
    }

    pub fn clear_actions(&mut self) {
        if !self.actions.is_empty() {
            self.actions.clear();
            self.actions_changed = true;
        }
        self.selected_action = None;
    }

    /// Current actions written back as `ACT` statements
    pub fn actions_as_code(&self) -> String {
        let mut out = String::new();
        for action in &self.actions {
            out.push_str("ACT '");
            out.push_str(&quote(&action.desc));
            if let Some(image) = &action.image {
                out.push_str("','");
                out.push_str(&quote(image));
            }
            out.push_str("':");
            match action.code.as_ref() {
                [single] if !single.text.is_empty() => out.push_str(&single.text),
                lines => {
                    if lines.len() >= 2 {
                        out.push('\n');
                        let body: Vec<&str> = lines.iter().map(|l| l.text.as_str()).collect();
                        out.push_str(&body.join("\n"));
                    }
                    out.push_str("\nEND");
                }
            }
            out.push('\n');
        }
        out
    }

    // Objects

    pub fn object_index(&self, name: &str) -> Option<usize> {
        self.objects.iter().position(|o| same_name(&o.name, name))
    }

    /// Insert an object at `position` (end when `None`)
    ///
    /// Returns `false` when the position is out of range and nothing
    /// was added.
    pub fn add_object(&mut self, object: Object, position: Option<usize>) -> InterpResult<bool> {
        let position = position.unwrap_or(self.objects.len());
        if position > self.objects.len() {
            return Ok(false);
        }
        if self.objects.len() >= MAX_OBJECTS {
            return Err(RuntimeError::new(ErrorKind::CantAddObject));
        }
        if self.selected_object.is_some_and(|s| s >= position) {
            self.selected_object = None;
        }
        self.objects.insert(position, object);
        self.objects_changed = true;
        Ok(true)
    }

    pub fn remove_object(&mut self, index: usize) -> Option<Object> {
        if index >= self.objects.len() {
            return None;
        }
        if self.selected_object.is_some_and(|s| s >= index) {
            self.selected_object = None;
        }
        self.objects_changed = true;
        Some(self.objects.remove(index))
    }

    /// Remove every object, returning them in order
    pub fn take_objects(&mut self) -> Vec<Object> {
        if !self.objects.is_empty() {
            self.objects_changed = true;
        }
        self.selected_object = None;
        std::mem::take(&mut self.objects)
    }

    /// Current objects written back as `ADDOBJ` statements
    pub fn objects_as_code(&self) -> String {
        let mut out = String::new();
        for object in &self.objects {
            out.push_str("ADDOBJ '");
            out.push_str(&quote(&object.name));
            if let Some(image) = &object.image {
                out.push_str("','");
                out.push_str(&quote(image));
            }
            out.push_str("'\n");
        }
        out
    }

    /// Forget everything shown to the player
    pub fn reset(&mut self) {
        self.clear_main();
        self.clear_stat();
        self.clear_actions();
        self.take_objects();
        self.user_input.clear();
        self.current_location = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocessor::preprocess;

    fn action(desc: &str, code: &str) -> Action {
        Action {
            desc: desc.to_string(),
            image: None,
            code: preprocess(code).into(),
            location: None,
        }
    }

    fn object(name: &str) -> Object {
        Object {
            name: name.to_string(),
            image: None,
        }
    }

    #[test]
    fn test_duplicate_action_ignored() {
        let mut state = GameState::new();
        state.add_action(action("Go north", "p 1")).unwrap();
        state.add_action(action("GO NORTH", "p 2")).unwrap();
        assert_eq!(state.actions.len(), 1);
        assert!(state.actions_changed);
    }

    #[test]
    fn test_action_limit() {
        let mut state = GameState::new();
        for i in 0..MAX_ACTIONS {
            state.add_action(action(&format!("a{i}"), "")).unwrap();
        }
        let err = state.add_action(action("one more", "")).unwrap_err();
        assert_eq!(err.kind, ErrorKind::CantAddAction);
    }

    #[test]
    fn test_remove_action_resets_selection() {
        let mut state = GameState::new();
        state.add_action(action("a", "")).unwrap();
        state.add_action(action("b", "")).unwrap();
        state.selected_action = Some(1);
        state.remove_action("A");
        assert_eq!(state.selected_action, None);
        assert_eq!(state.actions[0].desc, "b");
    }

    #[test]
    fn test_actions_as_code() {
        let mut state = GameState::new();
        state.add_action(action("Don't", "p 1")).unwrap();
        let mut with_image = action("Look", "p 1\np 2");
        with_image.image = Some("eye.png".into());
        state.add_action(with_image).unwrap();
        pretty_assertions::assert_eq!(
            state.actions_as_code(),
            "ACT 'Don''t':P 1\nACT 'Look','eye.png':\nP 1\nP 2\nEND\n"
        );
    }

    #[test]
    fn test_object_insert_positions() {
        let mut state = GameState::new();
        assert!(state.add_object(object("key"), None).unwrap());
        assert!(state.add_object(object("lamp"), Some(0)).unwrap());
        assert!(!state.add_object(object("rope"), Some(5)).unwrap());
        let names: Vec<&str> = state.objects.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["lamp", "key"]);
        assert_eq!(state.object_index("KEY"), Some(1));
    }

    #[test]
    fn test_objects_as_code() {
        let mut state = GameState::new();
        state.add_object(object("key"), None).unwrap();
        state
            .add_object(
                Object {
                    name: "lamp".into(),
                    image: Some("lamp.png".into()),
                },
                None,
            )
            .unwrap();
        assert_eq!(state.objects_as_code(), "ADDOBJ 'key'\nADDOBJ 'lamp','lamp.png'\n");
    }

    #[test]
    fn test_text_flags() {
        let mut state = GameState::new();
        state.append_main("");
        assert!(!state.main_changed);
        state.append_stat("x");
        assert!(state.stat_changed);
        state.stat_changed = false;
        state.clear_stat();
        assert!(state.stat_changed);
    }
}
