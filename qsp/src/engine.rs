//! Embedding API
//!
//! [`Engine`] is the one object a host keeps. Every entry point runs to
//! completion before returning; errors come back as [`EngineError`] and
//! are also kept for [`Engine::last_error`].

use crate::config::EngineConfig;
use crate::error::{EngineError, ErrorInfo};
use crate::host::Host;
use crate::interp::error::{ErrorKind, InterpResult, RuntimeError};
use crate::interp::eval::{Interpreter, Site, result_value};
use crate::interp::value::Value;
use crate::interp::vars::VarName;
use crate::preprocessor::preprocess;
use crate::world::World;
use crate::world::state::{Action, Object};
use std::rc::Rc;
use tracing::{debug, warn};

pub struct Engine {
    interp: Interpreter,
    last_error: Option<ErrorInfo>,
}

impl Engine {
    pub fn new(config: EngineConfig, host: Box<dyn Host>) -> Self {
        Engine {
            interp: Interpreter::new(config, host),
            last_error: None,
        }
    }

    /// Replace the world and start a new game
    pub fn load_world(&mut self, world: World) {
        debug!(locations = world.len(), "world loaded");
        self.interp.world = world;
        self.reset();
    }

    pub fn world(&self) -> &World {
        &self.interp.world
    }

    pub fn config(&self) -> &EngineConfig {
        &self.interp.config
    }

    /// Clear variables, texts, actions and objects
    pub fn reset(&mut self) {
        self.interp.reset();
        self.last_error = None;
    }

    /// Run a location like `GOSUB` does
    pub fn run_location(&mut self, name: &str) -> Result<(), EngineError> {
        self.enter(|interp| interp.call_location(name, Vec::new(), false).map(drop))?;
        Ok(())
    }

    /// Navigate to a location like `GOTO` does
    pub fn goto_location(&mut self, name: &str) -> Result<(), EngineError> {
        self.enter(|interp| interp.goto_location(name, Vec::new(), true))?;
        Ok(())
    }

    /// Run a piece of code in the current context
    pub fn run_string(&mut self, code: &str) -> Result<(), EngineError> {
        let lines = preprocess(code);
        self.enter(|interp| interp.with_save_group(|i| i.exec_body(&lines)))?;
        Ok(())
    }

    /// Call a location as a function and return its `RESULT`
    pub fn run_subroutine(&mut self, name: &str, args: Vec<Value>) -> Result<Value, EngineError> {
        let result = self.enter(|interp| interp.call_location(name, args, false))?;
        Ok(result_value(result.flatten(), None))
    }

    pub fn eval_expression(&mut self, source: &str) -> Result<Value, EngineError> {
        let value = self.enter(|interp| interp.eval_str(source))?;
        Ok(value.unwrap_or(Value::Number(0)))
    }

    /// Run the code of the `index`-th action
    pub fn execute_action(&mut self, index: usize) -> Result<(), EngineError> {
        let Some(action) = self.interp.state.actions.get(index).cloned() else {
            return Err(self.fail(RuntimeError::with_detail(ErrorKind::UnknownAction, index)));
        };
        debug!(index, desc = %action.desc, "execute action");
        self.interp.state.selected_action = Some(index);
        self.enter(|interp| {
            let caller = std::mem::replace(
                &mut interp.site,
                Site {
                    location: action.location.clone(),
                    action: Some(index),
                    line: 0,
                },
            );
            let code = Rc::clone(&action.code);
            let result = interp.with_save_group(|i| i.exec_body(&code));
            interp.site = caller;
            result
        })?;
        Ok(())
    }

    /// Select an object and run the `ONOBJSEL` handlers
    ///
    /// Returns `false` when there is no such object.
    pub fn select_object(&mut self, index: usize) -> Result<bool, EngineError> {
        if index >= self.interp.state.objects.len() {
            return Ok(false);
        }
        self.interp.state.selected_object = Some(index);
        self.enter(|interp| interp.run_hooks("ONOBJSEL", Vec::new()))?;
        Ok(true)
    }

    pub fn set_user_input(&mut self, text: &str) {
        self.interp.state.user_input = text.to_string();
    }

    /// Run the `USERCOM` handler for the current user input
    pub fn execute_user_input(&mut self) -> Result<(), EngineError> {
        self.enter(|interp| interp.run_hooks("USERCOM", Vec::new()))?;
        Ok(())
    }

    /// Run the `COUNTER` handler; hosts call this on every timer tick
    pub fn execute_counter(&mut self) -> Result<(), EngineError> {
        self.enter(|interp| interp.run_hooks("COUNTER", Vec::new()))?;
        Ok(())
    }

    // Variables

    /// Read one item; the sigil of `name` selects the slot
    pub fn get_variable(&self, name: &str, index: &Value) -> Value {
        match VarName::parse(name) {
            Ok(var) => self.interp.vars.get(&var, index),
            Err(_) => Value::default_of(crate::interp::ValueType::from_sigil(name.trim())),
        }
    }

    pub fn set_variable(&mut self, name: &str, index: &Value, value: Value) -> Result<(), EngineError> {
        let result = VarName::parse(name).and_then(|var| self.interp.vars.set(&var, index, value));
        result.map_err(|err| self.fail(err))
    }

    /// Number of items in an array
    pub fn variable_size(&self, name: &str) -> usize {
        VarName::parse(name).map_or(0, |var| self.interp.vars.size(&var.key))
    }

    pub fn variable_names(&self) -> Vec<String> {
        self.interp.vars.names()
    }

    // Screen state

    pub fn main_text(&self) -> &str {
        &self.interp.state.main_text
    }

    pub fn stat_text(&self) -> &str {
        &self.interp.state.stat_text
    }

    pub fn actions(&self) -> &[Action] {
        &self.interp.state.actions
    }

    pub fn objects(&self) -> &[Object] {
        &self.interp.state.objects
    }

    pub fn selected_action(&self) -> Option<usize> {
        self.interp.state.selected_action
    }

    pub fn selected_object(&self) -> Option<usize> {
        self.interp.state.selected_object
    }

    pub fn current_location(&self) -> Option<&str> {
        self.interp.state.current_location.as_deref()
    }

    pub fn is_main_desc_changed(&mut self) -> bool {
        std::mem::take(&mut self.interp.state.main_changed)
    }

    pub fn is_vars_desc_changed(&mut self) -> bool {
        std::mem::take(&mut self.interp.state.stat_changed)
    }

    pub fn is_actions_changed(&mut self) -> bool {
        std::mem::take(&mut self.interp.state.actions_changed)
    }

    pub fn is_objects_changed(&mut self) -> bool {
        std::mem::take(&mut self.interp.state.objects_changed)
    }

    // Errors

    pub fn last_error(&self) -> Option<&ErrorInfo> {
        self.last_error.as_ref()
    }

    pub fn clear_error(&mut self) {
        self.last_error = None;
    }

    /// Run an entry point
    ///
    /// `Ok(None)` means the run was cut short because the current
    /// location was replaced.
    fn enter<T, F>(&mut self, f: F) -> Result<Option<T>, EngineError>
    where
        F: FnOnce(&mut Interpreter) -> InterpResult<T>,
    {
        self.interp.error_site = None;
        match f(&mut self.interp) {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.kind.is_control_flow() => Ok(None),
            Err(err) => Err(self.fail(err)),
        }
    }

    fn fail(&mut self, error: RuntimeError) -> EngineError {
        let site = self.interp.error_site.take().unwrap_or_else(|| self.interp.site.clone());
        let info = ErrorInfo {
            code: error.kind.code(),
            location_name: site.location,
            action_index: site.action,
            source_line: site.line,
            message: error.message.clone(),
        };
        warn!(code = info.code, location = ?info.location_name, line = info.source_line, "{}", info.message);
        self.last_error = Some(info.clone());
        EngineError { error, info }
    }
}
