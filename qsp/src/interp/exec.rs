//! Block and call executor
//!
//! Walks preprocessed lines. Multiline `IF`/`ACT`/`LOOP`/`FOR` headers
//! look up their `END` every time they run; the loop then either executes
//! the next line, skips past a handled block, or re-enters at a label.

use super::error::{ErrorKind, InterpResult, RuntimeError};
use super::eval::{Interpreter, STACK_GROW_SIZE, STACK_RED_ZONE, Site};
use super::ops::expect_number;
use super::value::Value;
use super::vars::{AssignOp, Slot, VarName};
use crate::preprocessor::text::{delim_pos, has_text, str_pos, trim_spaces};
use crate::preprocessor::{LineOfCode, Stmt, preprocess, scan_line};
use crate::util::{find_similar_name, format_suggestion_hint};
use crate::world::state::Action;
use std::rc::Rc;
use tracing::{debug, trace};

/// How a run of statements or lines finished
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flow {
    Next,
    /// `EXIT`: leave the running location or code string
    Exit,
    /// `JUMP`: upper-cased label still to be found
    Jump(String),
}

/// Where the line loop continues after a line
enum Cursor {
    Line(usize),
    Leave(Flow),
}

fn leave_or(flow: Flow, next: usize) -> Cursor {
    match flow {
        Flow::Next => Cursor::Line(next),
        other => Cursor::Leave(other),
    }
}

/// Line of the `END` closing the block that starts before `from`
pub fn search_end(lines: &[LineOfCode], from: usize, to: usize) -> Option<usize> {
    let mut depth = 1;
    for (i, line) in lines.iter().enumerate().take(to).skip(from) {
        if line.is_multiline && line.kind().opens_block() {
            depth += 1;
        } else if line.kind() == Stmt::End {
            depth -= 1;
            if depth == 0 {
                return Some(i);
            }
        }
    }
    None
}

/// Next `ELSE`/`ELSEIF` line of the current block
pub fn search_else(lines: &[LineOfCode], from: usize, to: usize) -> Option<usize> {
    let mut depth = 1;
    for (i, line) in lines.iter().enumerate().take(to).skip(from) {
        match line.kind() {
            kind if line.is_multiline && kind.opens_block() => depth += 1,
            Stmt::Else | Stmt::ElseIf if depth == 1 => return Some(i),
            Stmt::End => {
                depth -= 1;
                if depth == 0 {
                    return None;
                }
            }
            _ => {}
        }
    }
    None
}

fn search_label(lines: &[LineOfCode], from: usize, to: usize, label: &str) -> Option<usize> {
    (from..to.min(lines.len())).find(|&i| lines[i].label.as_deref() == Some(label))
}

/// `ELSE` of an inline `IF` among statements `from..to`
fn inline_else(line: &LineOfCode, from: usize, to: usize) -> Option<usize> {
    let mut depth = 1;
    for i in from..to {
        match line.statements[i].kind {
            Stmt::If => depth += 1,
            Stmt::Else => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

fn require_colon(line: &LineOfCode, index: usize) -> InterpResult<()> {
    let stmt = &line.statements[index];
    if line.byte_at(stmt.end) == Some(b':') {
        Ok(())
    } else {
        Err(RuntimeError::new(ErrorKind::ColonNotFound))
    }
}

/// Parameter text of a statement, up to its end
fn header(line: &LineOfCode, index: usize) -> &str {
    line.params(index)
}

/// Split `text` around an isolated keyword
fn split_word<'a>(text: &'a str, word: &str) -> Option<(&'a str, &'a str)> {
    let pos = str_pos(text, word, true)?;
    Some((trim_spaces(&text[..pos]), trim_spaces(&text[pos + word.len()..])))
}

impl Interpreter {
    /// Run lines `start..end`
    ///
    /// A `JUMP` whose label is not in the range propagates to the caller,
    /// except at `top` level where it is an error.
    pub(crate) fn exec_code(
        &mut self,
        lines: &[LineOfCode],
        start: usize,
        end: usize,
        top: bool,
    ) -> InterpResult<Flow> {
        let end = end.min(lines.len());
        let mut i = start;
        while i < end {
            let line = &lines[i];
            self.site.line = line.line_number;
            let cursor = if line.is_multiline {
                self.exec_multiline(lines, i, end)
            } else {
                self.exec_singleline(lines, i, end)
            };
            match cursor.map_err(|err| self.mark_error(err))? {
                Cursor::Line(next) => i = next,
                Cursor::Leave(Flow::Jump(label)) => match search_label(lines, start, end, &label) {
                    Some(target) => {
                        trace!(label = %label, line = lines[target].line_number, "jump");
                        i = target;
                    }
                    None if top => return Err(self.mark_error(RuntimeError::label_not_found(&label))),
                    None => return Ok(Flow::Jump(label)),
                },
                Cursor::Leave(flow) => return Ok(flow),
            }
        }
        Ok(Flow::Next)
    }

    /// Run a whole code body; `EXIT` ends it normally
    pub(crate) fn exec_body(&mut self, lines: &[LineOfCode]) -> InterpResult<()> {
        self.exec_code(lines, 0, lines.len(), true)?;
        Ok(())
    }

    fn exec_multiline(&mut self, lines: &[LineOfCode], i: usize, end: usize) -> InterpResult<Cursor> {
        let line = &lines[i];
        let end_line =
            search_end(lines, i + 1, end).ok_or_else(|| RuntimeError::new(ErrorKind::EndNotFound))?;
        match line.kind() {
            Stmt::If | Stmt::ElseIf => {
                let else_line = search_else(lines, i + 1, end_line);
                if self.condition(line, 0)? {
                    let stop = else_line.unwrap_or(end_line);
                    let flow = self.with_save_group(|s| s.exec_code(lines, i + 1, stop, false))?;
                    return Ok(leave_or(flow, end_line));
                }
                Ok(Cursor::Line(else_line.unwrap_or(end_line)))
            }
            Stmt::Act => {
                self.add_action(line, 0, Rc::from(&lines[i + 1..end_line]))?;
                Ok(Cursor::Line(end_line))
            }
            Stmt::Loop => {
                let flow = self.run_loop(line, 0, |s| s.exec_code(lines, i + 1, end_line, false))?;
                Ok(leave_or(flow, end_line))
            }
            Stmt::For => {
                let flow = self.run_for(line, 0, |s| s.exec_code(lines, i + 1, end_line, false))?;
                Ok(leave_or(flow, end_line))
            }
            _ => self.exec_singleline(lines, i, end),
        }
    }

    fn exec_singleline(&mut self, lines: &[LineOfCode], i: usize, end: usize) -> InterpResult<Cursor> {
        let line = &lines[i];
        let count = line.statements.len();
        match line.kind() {
            Stmt::ElseIf => {
                require_colon(line, 0)?;
                let end_line = search_end(lines, i + 1, end)
                    .ok_or_else(|| RuntimeError::new(ErrorKind::EndNotFound))?;
                if self.condition(line, 0)? {
                    let flow = self.with_save_group(|s| s.exec_statements(line, 1, count))?;
                    return Ok(leave_or(flow, end_line));
                }
                Ok(Cursor::Line(search_else(lines, i + 1, end_line).unwrap_or(end_line)))
            }
            Stmt::Else => {
                let end_line = search_end(lines, i + 1, end)
                    .ok_or_else(|| RuntimeError::new(ErrorKind::EndNotFound))?;
                let flow = if count > 1 {
                    self.with_save_group(|s| s.exec_statements(line, 1, count))?
                } else {
                    let stop = search_else(lines, i + 1, end_line).unwrap_or(end_line);
                    self.with_save_group(|s| s.exec_code(lines, i + 1, stop, false))?
                };
                Ok(leave_or(flow, end_line))
            }
            _ => {
                let flow = self.exec_statements(line, 0, count)?;
                Ok(leave_or(flow, i + 1))
            }
        }
    }

    /// Run statements `from..to` of one line
    pub(crate) fn exec_statements(&mut self, line: &LineOfCode, from: usize, to: usize) -> InterpResult<Flow> {
        let to = to.min(line.statements.len());
        for i in from..to {
            let stmt = &line.statements[i];
            match stmt.kind {
                Stmt::Unknown | Stmt::Label | Stmt::Else | Stmt::End => {}
                Stmt::Comment | Stmt::ElseIf => return Ok(Flow::Next),
                Stmt::If => return self.inline_if(line, i, to),
                Stmt::Act => {
                    self.inline_act(line, i, to)?;
                    return Ok(Flow::Next);
                }
                Stmt::Loop => return self.run_loop(line, i, |s| s.exec_statements(line, i + 1, to)),
                Stmt::For => return self.run_for(line, i, |s| s.exec_statements(line, i + 1, to)),
                Stmt::Set => self.statement_set(line, i)?,
                Stmt::Local => self.statement_local(line, i)?,
                kind => {
                    let args = self.statement_args(line, i)?;
                    let flow = self.run_statement(kind, args)?;
                    if flow != Flow::Next {
                        return Ok(flow);
                    }
                }
            }
        }
        Ok(Flow::Next)
    }

    /// Evaluate the arguments of a statement, coerced to their types
    pub(crate) fn statement_args(&mut self, line: &LineOfCode, index: usize) -> InterpResult<Vec<Value>> {
        let stmt = &line.statements[index];
        if let Some(kind) = &stmt.error {
            return Err(RuntimeError::new(kind.clone()));
        }
        let mut args = Vec::with_capacity(stmt.args.len());
        for (i, span) in stmt.args.iter().enumerate() {
            let value = self.eval_str(span.slice(&line.text))?;
            args.push(super::eval::coerce_arg(value, stmt.kind.arg_type(i))?);
        }
        Ok(args)
    }

    fn condition(&mut self, line: &LineOfCode, index: usize) -> InterpResult<bool> {
        let args = self.statement_args(line, index)?;
        Ok(args.first().and_then(Value::to_number).unwrap_or(0) != 0)
    }

    /// `IF c: a & b ELSE d & e`
    fn inline_if(&mut self, line: &LineOfCode, i: usize, to: usize) -> InterpResult<Flow> {
        require_colon(line, i)?;
        let else_at = inline_else(line, i + 1, to);
        let empty = match else_at {
            Some(e) => e == i + 1 || e + 1 == to,
            None => i + 1 == to,
        };
        if empty {
            return Err(RuntimeError::new(ErrorKind::CodeNotFound));
        }
        if self.condition(line, i)? {
            let stop = else_at.unwrap_or(to);
            self.with_save_group(|s| s.exec_statements(line, i + 1, stop))
        } else if let Some(e) = else_at {
            self.with_save_group(|s| s.exec_statements(line, e + 1, to))
        } else {
            Ok(Flow::Next)
        }
    }

    /// `ACT desc: code` on one line; the code is everything up to `to`
    fn inline_act(&mut self, line: &LineOfCode, i: usize, to: usize) -> InterpResult<()> {
        require_colon(line, i)?;
        if i + 1 >= to {
            return Err(RuntimeError::new(ErrorKind::CodeNotFound));
        }
        let start = line.statements[i].end + 1;
        let mut stop = line.statements[to - 1].end;
        if line.byte_at(stop) == Some(b':') {
            stop += 1;
        }
        let code = line.text.get(start..stop).map(trim_spaces).unwrap_or("");
        let body = scan_line(code.to_string(), line.line_number);
        self.add_action(line, i, Rc::from(vec![body]))
    }

    fn add_action(&mut self, line: &LineOfCode, index: usize, code: Rc<[LineOfCode]>) -> InterpResult<()> {
        let mut args = self.statement_args(line, index)?.into_iter();
        let desc = args.next().map(Value::into_text).unwrap_or_default();
        let image = args.next().map(Value::into_text).filter(|s| !s.is_empty());
        self.state.add_action(Action {
            desc,
            image,
            code,
            location: self.site.location.clone(),
        })
    }

    /// `LOOP [init] WHILE cond [STEP iter]`
    fn run_loop<F>(&mut self, line: &LineOfCode, index: usize, mut body: F) -> InterpResult<Flow>
    where
        F: FnMut(&mut Self) -> InterpResult<Flow>,
    {
        require_colon(line, index)?;
        let (init, rest) = split_word(header(line, index), "WHILE")
            .ok_or_else(|| RuntimeError::new(ErrorKind::LoopWhileNotFound))?;
        let (cond, step) = match split_word(rest, "STEP") {
            Some((cond, step)) => (cond, Some(step)),
            None => (rest, None),
        };
        let init = has_text(init).then(|| scan_line(init.to_string(), line.line_number));
        let step = step.map(|s| scan_line(s.to_string(), line.line_number));
        self.with_save_group(|s| {
            if let Some(init) = &init {
                let flow = s.exec_statements(init, 0, init.statements.len())?;
                if flow != Flow::Next {
                    return Ok(flow);
                }
            }
            loop {
                if !s.eval_condition(cond)? {
                    break;
                }
                let flow = s.with_save_group(&mut body)?;
                if flow != Flow::Next {
                    return Ok(flow);
                }
                if let Some(step) = &step {
                    let flow = s.with_save_group(|s| s.exec_statements(step, 0, step.statements.len()))?;
                    if flow != Flow::Next {
                        return Ok(flow);
                    }
                }
            }
            Ok(Flow::Next)
        })
    }

    /// `FOR name = init TO bound [STEP step]`
    fn run_for<F>(&mut self, line: &LineOfCode, index: usize, mut body: F) -> InterpResult<Flow>
    where
        F: FnMut(&mut Self) -> InterpResult<Flow>,
    {
        require_colon(line, index)?;
        let (assign, rest) = split_word(header(line, index), "TO").ok_or_else(RuntimeError::syntax)?;
        let eq = delim_pos(assign, b'=').ok_or_else(RuntimeError::syntax)?;
        let name = VarName::parse(&assign[..eq])?;
        let init = trim_spaces(&assign[eq + 1..]);
        let (bound, step) = match split_word(rest, "STEP") {
            Some((bound, step)) => (bound, Some(step)),
            None => (rest, None),
        };
        if !has_text(init) || !has_text(bound) || step.is_some_and(|s| !has_text(s)) {
            return Err(RuntimeError::syntax());
        }
        self.with_save_group(|s| {
            let first = s.eval_str(init)?;
            s.saves.localize(&mut s.vars, &name.key)?;
            s.vars.assign(&name, Some(0), AssignOp::Set, first)?;
            loop {
                let limit = s.eval_number(bound)?;
                let step = match step {
                    Some(text) => s.eval_number(text)?,
                    None => 1,
                };
                let current = expect_number(&s.vars.get_at(&name, 0))?;
                let done = if step >= 0 { current > limit } else { current < limit };
                if done {
                    break;
                }
                let flow = s.with_save_group(&mut body)?;
                if flow != Flow::Next {
                    return Ok(flow);
                }
                let current = expect_number(&s.vars.get_at(&name, 0))?;
                s.vars
                    .assign(&name, Some(0), AssignOp::Set, Value::Number(current.wrapping_add(step)))?;
            }
            Ok(Flow::Next)
        })
    }

    fn eval_condition(&mut self, source: &str) -> InterpResult<bool> {
        let value = self.eval_str(source)?;
        super::eval::truth(&value)
    }

    // Frames

    /// Run `f` inside a fresh save group
    ///
    /// The group is restored when `f` succeeds and dropped when it fails.
    pub(crate) fn with_save_group<T, F>(&mut self, f: F) -> InterpResult<T>
    where
        F: FnOnce(&mut Self) -> InterpResult<T>,
    {
        let mark = self.saves.allocate();
        let result = f(self);
        self.saves.release(mark, &mut self.vars, result.is_ok());
        result
    }

    /// Enter a nested call with automatic stack growth
    pub(crate) fn nested<T, F>(&mut self, f: F) -> InterpResult<T>
    where
        F: FnOnce(&mut Self) -> InterpResult<T>,
    {
        if self.call_depth >= self.config.max_call_depth {
            return Err(RuntimeError::stack_overflow());
        }
        self.call_depth += 1;
        let result = stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || f(self));
        self.call_depth -= 1;
        result
    }

    /// Remember where the first error of a run happened
    pub(crate) fn mark_error(&mut self, err: RuntimeError) -> RuntimeError {
        if !err.kind.is_control_flow() && self.error_site.is_none() {
            debug!(code = err.kind.code(), line = self.site.line, "{}", err.message);
            self.error_site = Some(self.site.clone());
        }
        err
    }

    fn missing_location(&self, name: &str) -> RuntimeError {
        let names: Vec<&str> = self.world.names().collect();
        let hint = find_similar_name(name, &names, 3);
        RuntimeError::location_not_found(name, &format_suggestion_hint(hint))
    }

    /// Call a location with `ARGS` and `RESULT` localized
    ///
    /// Returns the first `RESULT` item the location left behind.
    pub(crate) fn call_location(
        &mut self,
        name: &str,
        args: Vec<Value>,
        replace_desc: bool,
    ) -> InterpResult<Option<Slot>> {
        self.nested(|s| {
            s.with_save_group(|s| {
                s.bind_args(args)?;
                s.run_location(name, replace_desc)?;
                Ok(s.vars.slot("RESULT", 0).cloned())
            })
        })
    }

    /// Run a code string like a location call
    pub(crate) fn call_code(&mut self, code: &str, args: Vec<Value>) -> InterpResult<Option<Slot>> {
        let lines = preprocess(code);
        self.nested(|s| {
            s.with_save_group(|s| {
                s.bind_args(args)?;
                s.exec_body(&lines)?;
                Ok(s.vars.slot("RESULT", 0).cloned())
            })
        })
    }

    fn bind_args(&mut self, args: Vec<Value>) -> InterpResult<()> {
        self.saves.localize(&mut self.vars, "ARGS")?;
        self.saves.localize(&mut self.vars, "RESULT")?;
        for (i, arg) in args.into_iter().enumerate() {
            self.vars.put_raw("ARGS", i, arg)?;
        }
        Ok(())
    }

    /// Show a location: description, static actions, then its code
    fn run_location(&mut self, name: &str, replace_desc: bool) -> InterpResult<()> {
        let (loc_name, description, actions, code) = match self.world.find(name) {
            Some(loc) => (
                loc.name.clone(),
                loc.description.clone(),
                loc.actions.clone(),
                Rc::clone(&loc.on_visit),
            ),
            None => return Err(self.missing_location(name)),
        };
        debug!(location = %loc_name, "run location");
        let caller = std::mem::replace(
            &mut self.site,
            Site {
                location: Some(loc_name.clone()),
                action: None,
                line: 0,
            },
        );
        let result = self.show_location(&loc_name, &description, actions, &code, replace_desc);
        self.site = caller;
        result
    }

    fn show_location(
        &mut self,
        name: &str,
        description: &str,
        actions: Vec<crate::world::LocationAction>,
        code: &[LineOfCode],
        replace_desc: bool,
    ) -> InterpResult<()> {
        let text = self.format_text(description).map_err(|err| self.mark_error(err))?;
        if replace_desc {
            self.state.set_main(text);
        } else {
            self.state.append_main(&text);
        }
        for action in actions {
            let desc = self.format_text(&action.desc).map_err(|err| self.mark_error(err))?;
            self.state
                .add_action(Action {
                    desc,
                    image: action.image,
                    code: action.code,
                    location: Some(name.to_string()),
                })
                .map_err(|err| self.mark_error(err))?;
        }
        self.exec_body(code)
    }

    /// Formatted description of a location (`DESC`)
    pub(crate) fn location_description(&mut self, name: &str) -> InterpResult<String> {
        let description = match self.world.find(name) {
            Some(loc) => loc.description.clone(),
            None => return Err(self.missing_location(name)),
        };
        self.format_text(&description)
    }

    /// `GOTO`/`XGOTO`: make `name` the current location
    ///
    /// Every save group is restored first, so the new location starts
    /// from global bindings. The `ONNEWLOC` handlers run afterwards with
    /// the same arguments.
    pub(crate) fn goto_location(&mut self, name: &str, args: Vec<Value>, replace_desc: bool) -> InterpResult<()> {
        let Some(target) = self.world.find(name).map(|loc| loc.name.clone()) else {
            return Err(self.missing_location(name));
        };
        debug!(location = %target, replace_desc, "goto");
        self.saves.restore_all(&mut self.vars);
        self.state.clear_actions();
        if !self.config.keep_stat_text_on_goto {
            self.state.clear_stat();
        }
        self.refresh_count += 1;
        self.state.current_location = Some(target.clone());
        self.call_location(&target, args.clone(), replace_desc)?;
        self.run_hooks("ONNEWLOC", args)
    }

    /// Call every location named in the string array `array`
    pub(crate) fn run_hooks(&mut self, array: &str, args: Vec<Value>) -> InterpResult<()> {
        let stamp = self.refresh_count;
        for i in 0..self.vars.size(array) {
            let target = self.vars.slot(array, i).map(|slot| slot.text.clone()).unwrap_or_default();
            if target.is_empty() {
                continue;
            }
            trace!(hook = array, location = %target, "hook");
            self.call_location(&target, args.clone(), false)?;
            self.check_refresh(stamp)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_end_counts_nested_blocks() {
        let lines = preprocess("if a:\nloop while b:\nend\nact 'x':\np 1\nend\nend\np 2");
        assert_eq!(search_end(&lines, 1, lines.len()), Some(6));
        assert_eq!(search_end(&lines, 2, lines.len()), Some(2));
        assert_eq!(search_end(&lines, 7, lines.len()), None);
    }

    #[test]
    fn test_search_else_stays_at_depth_one() {
        let lines = preprocess("if a:\nif b:\np 1\nelse\np 2\nend\nelseif c:\np 3\nelse\nend");
        assert_eq!(search_else(&lines, 1, lines.len()), Some(6));
        assert_eq!(search_else(&lines, 7, lines.len()), Some(8));
        let no_else = preprocess("if a:\np 1\nend\nelse");
        assert_eq!(search_else(&no_else, 1, no_else.len()), None);
    }

    #[test]
    fn test_inline_else_skips_nested_if() {
        let line = scan_line("IF A: IF B: X = 1 ELSE X = 2 ELSE X = 3".to_string(), 1);
        let kinds: Vec<Stmt> = line.statements.iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![Stmt::If, Stmt::If, Stmt::Set, Stmt::Else, Stmt::Set, Stmt::Else, Stmt::Set]
        );
        assert_eq!(inline_else(&line, 1, line.statements.len()), Some(5));
    }

    #[test]
    fn test_split_word_needs_isolation() {
        assert_eq!(split_word("I = 1 TO 3", "TO"), Some(("I = 1", "3")));
        assert_eq!(split_word("TOTAL = 1", "TO"), None);
        assert_eq!(split_word("X < 'STEP' STEP X += 1", "STEP"), Some(("X < 'STEP'", "X += 1")));
    }
}
