//! Host callbacks
//!
//! Everything that leaves the engine (UI, audio, dialogs, files) goes
//! through [`Host`]. Every method has a no-op default, so an embedder
//! only overrides what it supports. Callbacks return plain values and
//! never fail the running script.

/// Panel a `SHOW*` statement toggles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Window {
    Actions,
    Objects,
    Stat,
    Input,
}

/// One entry of a `MENU` popup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuItem {
    pub name: String,
    pub image: Option<String>,
}

pub trait Host {
    /// Repaint request; `forced` comes from `REFINT` and `WAIT`
    fn refresh(&mut self, _forced: bool) {}

    fn show_window(&mut self, _window: Window, _visible: bool) {}

    fn set_timer(&mut self, _msecs: i64) {}

    /// Mirror of the user input line, cleared by `CMDCLEAR`
    fn set_input_text(&mut self, _text: &str) {}

    /// Current text of the host input line, if the host has one
    fn user_text(&mut self) -> Option<String> {
        None
    }

    fn play(&mut self, _file: &str, _volume: i64) {}

    /// `None` closes every playing file
    fn close_file(&mut self, _file: Option<&str>) {}

    fn is_playing(&mut self, _file: &str) -> bool {
        false
    }

    /// Modal message box
    fn message(&mut self, _text: &str) {}

    /// Modal input box
    fn input(&mut self, _prompt: &str) -> String {
        String::new()
    }

    /// Collects the items of the next [`Host::menu`] call
    fn add_menu_item(&mut self, _item: &MenuItem) {}

    /// Show the collected menu and return the chosen index
    fn menu(&mut self) -> Option<usize> {
        None
    }

    /// Empty path hides the picture
    fn show_picture(&mut self, _path: &str) {}

    fn sleep(&mut self, _msecs: i64) {}

    fn open_game(&mut self, _path: Option<&str>) {}

    fn save_game(&mut self, _path: Option<&str>) {}

    /// `OPENQST` and `INCLIB`; `append` keeps the current world
    fn open_quest(&mut self, _path: &str, _append: bool) {}

    fn exec(&mut self, _command: &str) {}

    /// Milliseconds since start; the engine clock is used when `None`
    fn msecs(&mut self) -> Option<i64> {
        None
    }
}

/// Host that ignores every callback
#[derive(Debug, Default, Clone, Copy)]
pub struct NullHost;

impl Host for NullHost {}
