//! Statement handlers
//!
//! `SET` and `LOCAL` read their cached spans directly; every other
//! statement gets its arguments evaluated and coerced first and lands in
//! [`Interpreter::run_statement`].

use super::error::{ErrorKind, InterpResult, RuntimeError};
use super::eval::Interpreter;
use super::exec::Flow;
use super::value::Value;
use super::vars::{AssignOp, VarName};
use crate::host::{MenuItem, Window};
use crate::preprocessor::text::{delim_pos, trim_spaces};
use crate::preprocessor::{LineOfCode, Stmt};
use crate::world::state::Object;
use tracing::{debug, trace};

/// Items a single `MENU` may show
const MAX_MENU_ITEMS: usize = 100;

/// Split a list of names at top-level commas
fn split_names(text: &str) -> InterpResult<Vec<&str>> {
    let mut names = Vec::new();
    let mut rest = text;
    loop {
        let (name, tail) = match delim_pos(rest, b',') {
            Some(p) => (&rest[..p], Some(&rest[p + 1..])),
            None => (rest, None),
        };
        let name = trim_spaces(name);
        if name.is_empty() {
            return Err(RuntimeError::syntax());
        }
        names.push(name);
        match tail {
            Some(tail) => rest = tail,
            None => return Ok(names),
        }
    }
}

fn assign_op(symbol: &str) -> InterpResult<AssignOp> {
    match symbol {
        "=" => Ok(AssignOp::Set),
        "+=" => Ok(AssignOp::Add),
        "-=" => Ok(AssignOp::Sub),
        "*=" => Ok(AssignOp::Mul),
        "/=" => Ok(AssignOp::Div),
        _ => Err(RuntimeError::syntax()),
    }
}

/// Name part of `name[index]`
fn base_name(text: &str) -> &str {
    match text.find('[') {
        Some(p) => trim_spaces(&text[..p]),
        None => trim_spaces(text),
    }
}

/// Optional string argument, `None` when missing or empty
fn opt_text(args: &[Value], index: usize) -> Option<String> {
    args.get(index).map(Value::to_text).filter(|s| !s.is_empty())
}

fn text_arg(args: &[Value], index: usize) -> String {
    args.get(index).map(Value::to_text).unwrap_or_default()
}

fn number_arg(args: &[Value], index: usize) -> Option<i64> {
    args.get(index).and_then(Value::to_number)
}

/// One parsed `MENU` entry: caption, location and image
fn menu_entry(item: &str) -> InterpResult<(String, String, Option<String>)> {
    let last = item
        .rfind(':')
        .ok_or_else(|| RuntimeError::new(ErrorKind::ColonNotFound))?;
    let head = &item[..last];
    let tail = &item[last + 1..];
    Ok(match head.rfind(':') {
        Some(first) => (
            head[..first].to_string(),
            head[first + 1..].to_string(),
            Some(tail.to_string()).filter(|s| !s.is_empty()),
        ),
        None => (head.to_string(), tail.to_string(), None),
    })
}

impl Interpreter {
    /// `[SET] names [op]= value`
    pub(crate) fn statement_set(&mut self, line: &LineOfCode, index: usize) -> InterpResult<()> {
        let stmt = &line.statements[index];
        if let Some(kind) = &stmt.error {
            return Err(RuntimeError::new(kind.clone()));
        }
        if stmt.args.len() < 3 {
            return Err(RuntimeError::new(ErrorKind::EqNotFound));
        }
        let op = assign_op(line.arg(stmt, 1))?;
        let value = self.eval_str(line.arg(stmt, 2))?;
        let names = split_names(line.arg(stmt, 0))?;
        self.set_names(&names, op, value)
    }

    /// `LOCAL names [= value]`
    pub(crate) fn statement_local(&mut self, line: &LineOfCode, index: usize) -> InterpResult<()> {
        let stmt = &line.statements[index];
        if let Some(kind) = &stmt.error {
            return Err(RuntimeError::new(kind.clone()));
        }
        let assignment = if stmt.args.len() > 1 {
            if line.arg(stmt, 1) != "=" {
                return Err(RuntimeError::syntax());
            }
            Some(self.eval_str(line.arg(stmt, 2))?)
        } else {
            None
        };
        let names = split_names(line.arg(stmt, 0))?;
        for name in &names {
            let var = VarName::parse(base_name(name))?;
            self.saves.localize(&mut self.vars, &var.key)?;
        }
        match assignment {
            Some(value) => self.set_names(&names, AssignOp::Set, value),
            None => Ok(()),
        }
    }

    /// Assign to one or more targets
    ///
    /// A tuple spreads over several targets; the last one takes whatever
    /// items remain.
    fn set_names(&mut self, names: &[&str], op: AssignOp, value: Value) -> InterpResult<()> {
        let [first, rest @ ..] = names else {
            return Err(RuntimeError::syntax());
        };
        if rest.is_empty() {
            return self.assign_target(first, op, value);
        }
        let Value::Tuple(items) = value else {
            for name in names {
                self.assign_target(name, op, value.clone())?;
            }
            return Ok(());
        };
        let mut items = items.into_iter();
        let last = names.len() - 1;
        for (i, name) in names.iter().enumerate() {
            let item = if i < last {
                items.next()
            } else {
                let remaining: Vec<Value> = items.by_ref().collect();
                match remaining.len() {
                    0 => None,
                    1 => remaining.into_iter().next(),
                    _ => Some(Value::Tuple(remaining)),
                }
            };
            let item = match item {
                Some(item) => item,
                None => Value::default_of(VarName::parse(base_name(name))?.ty),
            };
            self.assign_target(name, op, item)?;
        }
        Ok(())
    }

    fn assign_target(&mut self, target: &str, op: AssignOp, value: Value) -> InterpResult<()> {
        let (name, index) = self.target_index(target)?;
        trace!(name = %name.key, ?index, op = op.symbol(), "assign");
        match index {
            Some(index) => self.vars.assign_index(&name, &index, op, value),
            None => {
                let size = self.vars.size(&name.key);
                self.vars.assign(&name, Some(size), op, value)
            }
        }
    }

    /// Variable and index addressed by `name` or `name[index]`
    ///
    /// `name[]` has no index and appends. A trailing comma turns the index
    /// into a tuple, the same as in an expression.
    fn target_index(&mut self, target: &str) -> InterpResult<(VarName, Option<Value>)> {
        let Some(open) = target.find('[') else {
            return Ok((VarName::parse(target)?, Some(Value::Number(0))));
        };
        let name = VarName::parse(&target[..open])?;
        let close = delim_pos(&target[open..], b']')
            .map(|p| open + p)
            .ok_or_else(|| RuntimeError::new(ErrorKind::BrackNotFound))?;
        let index = trim_spaces(&target[open + 1..close]);
        if index.is_empty() {
            return Ok((name, None));
        }
        let index = match index.strip_suffix(',') {
            Some(items) if delim_pos(items, b',').is_some() => self.eval_str(items)?,
            Some(item) => Value::Tuple(vec![self.eval_str(item)?]),
            None => self.eval_str(index)?,
        };
        Ok((name, Some(index)))
    }

    /// Run a statement with evaluated arguments
    pub(crate) fn run_statement(&mut self, kind: Stmt, args: Vec<Value>) -> InterpResult<Flow> {
        match kind {
            Stmt::Implicit => {
                let text = text_arg(&args, 0);
                self.state.append_main(&text);
                self.state.append_main("\n");
            }
            Stmt::P => self.state.append_stat(&text_arg(&args, 0)),
            Stmt::Pl => {
                self.state.append_stat(&text_arg(&args, 0));
                self.state.append_stat("\n");
            }
            Stmt::Nl => {
                self.state.append_stat("\n");
                self.state.append_stat(&text_arg(&args, 0));
            }
            Stmt::MP => self.state.append_main(&text_arg(&args, 0)),
            Stmt::MPl => {
                self.state.append_main(&text_arg(&args, 0));
                self.state.append_main("\n");
            }
            Stmt::MNl => {
                self.state.append_main("\n");
                self.state.append_main(&text_arg(&args, 0));
            }
            Stmt::Clear => self.state.clear_stat(),
            Stmt::MClear => self.state.clear_main(),
            Stmt::Cls => {
                self.state.clear_stat();
                self.state.clear_main();
                self.state.user_input.clear();
                self.state.clear_actions();
                self.host.set_input_text("");
            }
            Stmt::CmdClear => {
                self.state.user_input.clear();
                self.host.set_input_text("");
            }
            Stmt::Cla => self.state.clear_actions(),
            Stmt::DelAct => self.state.remove_action(&text_arg(&args, 0)),
            Stmt::AddObj => self.add_object(args)?,
            Stmt::DelObj => {
                if let Some(index) = self.state.object_index(&text_arg(&args, 0)) {
                    self.remove_object(index)?;
                }
            }
            Stmt::KillObj => match number_arg(&args, 0) {
                Some(n) => {
                    if let Ok(index) = usize::try_from(n.saturating_sub(1)) {
                        self.remove_object(index)?;
                    }
                }
                None => self.remove_all_objects()?,
            },
            Stmt::Unselect => self.state.selected_object = None,
            Stmt::KillVar => self.kill_var(&args)?,
            Stmt::KillAll => {
                self.vars.clear();
                self.remove_all_objects()?;
            }
            Stmt::CopyArr => {
                let dest = VarName::parse(&text_arg(&args, 0))?;
                let src = VarName::parse(&text_arg(&args, 1))?;
                let start = number_arg(&args, 2).unwrap_or(0);
                self.vars.copy_array(&dest.key, &src.key, start, number_arg(&args, 3))?;
            }
            Stmt::SetTimer => self.host.set_timer(number_arg(&args, 0).unwrap_or(0).max(0)),
            Stmt::Wait => {
                self.host.refresh(true);
                self.host.sleep(number_arg(&args, 0).unwrap_or(0).max(0));
            }
            Stmt::ShowActs | Stmt::ShowObjs | Stmt::ShowStat | Stmt::ShowInput => {
                let window = match kind {
                    Stmt::ShowActs => Window::Actions,
                    Stmt::ShowObjs => Window::Objects,
                    Stmt::ShowStat => Window::Stat,
                    _ => Window::Input,
                };
                self.host.show_window(window, number_arg(&args, 0).unwrap_or(0) != 0);
            }
            Stmt::RefInt => self.host.refresh(true),
            Stmt::View => self.host.show_picture(&text_arg(&args, 0)),
            Stmt::Msg => self.host.message(&text_arg(&args, 0)),
            Stmt::Menu => self.show_menu(&args)?,
            Stmt::Play => {
                let volume = number_arg(&args, 1).unwrap_or(100).clamp(0, 100);
                self.host.play(&text_arg(&args, 0), volume);
            }
            Stmt::Close => self.host.close_file(opt_text(&args, 0).as_deref()),
            Stmt::CloseAll => self.host.close_file(None),
            Stmt::OpenGame => self.host.open_game(opt_text(&args, 0).as_deref()),
            Stmt::SaveGame => self.host.save_game(opt_text(&args, 0).as_deref()),
            Stmt::OpenQst => self.host.open_quest(&text_arg(&args, 0), false),
            Stmt::IncLib => self.host.open_quest(&text_arg(&args, 0), true),
            Stmt::FreeLib => trace!("FREELIB ignored"),
            Stmt::Exec => self.host.exec(&text_arg(&args, 0)),
            Stmt::Exit => return Ok(Flow::Exit),
            Stmt::Jump => {
                let label = trim_spaces(&text_arg(&args, 0)).to_uppercase();
                return Ok(Flow::Jump(label));
            }
            Stmt::GoSub => {
                let mut args = args.into_iter();
                let name = args.next().map(Value::into_text).unwrap_or_default();
                self.call_location(&name, args.collect(), false)?;
            }
            Stmt::GoTo | Stmt::XGoTo => {
                let mut args = args.into_iter();
                let name = args.next().map(Value::into_text).unwrap_or_default();
                self.goto_location(&name, args.collect(), kind == Stmt::GoTo)?;
                return Err(RuntimeError::aborted());
            }
            Stmt::Dynamic => {
                let mut args = args.into_iter();
                let code = args.next().map(Value::into_text).unwrap_or_default();
                self.call_code(&code, args.collect())?;
            }
            other => {
                debug!(statement = ?other, "statement has no handler");
                return Err(RuntimeError::syntax());
            }
        }
        Ok(Flow::Next)
    }

    fn kill_var(&mut self, args: &[Value]) -> InterpResult<()> {
        if args.is_empty() {
            self.vars.clear();
            return Ok(());
        }
        let name = VarName::parse(&text_arg(args, 0))?;
        match args.get(1) {
            None => self.vars.remove_var(&name.key),
            Some(index) => {
                if let Some(position) = self.vars.find_position(&name.key, index) {
                    self.vars.remove_item(&name.key, position);
                }
            }
        }
        Ok(())
    }

    /// `ADDOBJ name[, image[, position]]`
    fn add_object(&mut self, args: Vec<Value>) -> InterpResult<()> {
        let position = match number_arg(&args, 2) {
            Some(n) => match usize::try_from(n.saturating_sub(1)) {
                Ok(p) => Some(p),
                Err(_) => return Ok(()),
            },
            None => None,
        };
        let object = Object {
            name: text_arg(&args, 0),
            image: opt_text(&args, 1),
        };
        if !self.state.add_object(object, position)? {
            return Ok(());
        }
        let hook_args: Vec<Value> = args.into_iter().take(2).collect();
        self.run_hooks("ONOBJADD", hook_args)
    }

    fn remove_object(&mut self, index: usize) -> InterpResult<()> {
        match self.state.remove_object(index) {
            Some(object) => self.run_hooks("ONOBJDEL", vec![Value::String(object.name)]),
            None => Ok(()),
        }
    }

    fn remove_all_objects(&mut self) -> InterpResult<()> {
        let stamp = self.refresh_count;
        for object in self.state.take_objects() {
            self.run_hooks("ONOBJDEL", vec![Value::String(object.name)])?;
            self.check_refresh(stamp)?;
        }
        Ok(())
    }

    /// `MENU array[, start[, count]]`
    ///
    /// Items read `caption:location` or `caption:location:image`. Reading
    /// stops at the first empty item.
    fn show_menu(&mut self, args: &[Value]) -> InterpResult<()> {
        let name = VarName::parse(&text_arg(args, 0))?;
        let start = usize::try_from(number_arg(args, 1).unwrap_or(0).max(0)).unwrap_or(0);
        let limit = usize::try_from(number_arg(args, 2).unwrap_or(MAX_MENU_ITEMS as i64).max(0)).unwrap_or(0);
        let mut targets = Vec::new();
        let size = self.vars.size(&name.key);
        let mut position = start;
        while position < size && targets.len() < limit {
            let item = match self.vars.slot(&name.key, position) {
                Some(slot) => slot.text.clone(),
                None => break,
            };
            if item.is_empty() {
                break;
            }
            if targets.len() >= MAX_MENU_ITEMS {
                return Err(RuntimeError::new(ErrorKind::CantAddMenuItem));
            }
            let (caption, location, image) = menu_entry(&item)?;
            self.host.add_menu_item(&MenuItem { name: caption, image });
            targets.push(location);
            position += 1;
        }
        if targets.is_empty() {
            return Ok(());
        }
        let Some(choice) = self.host.menu() else {
            return Ok(());
        };
        let Some(location) = targets.get(choice) else {
            return Ok(());
        };
        let location = location.clone();
        debug!(choice, location = %location, "menu");
        self.call_location(&location, vec![Value::Number(choice as i64 + 1)], false)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_names() {
        assert_eq!(split_names("A, $B[1,2] ,C").unwrap(), vec!["A", "$B[1,2]", "C"]);
        assert_eq!(split_names("A,").unwrap_err().kind, ErrorKind::Syntax);
    }

    #[test]
    fn test_menu_entry_forms() {
        assert_eq!(
            menu_entry("Take:take_loc").unwrap(),
            ("Take".to_string(), "take_loc".to_string(), None)
        );
        assert_eq!(
            menu_entry("Look:look:eye.png").unwrap(),
            ("Look".to_string(), "look".to_string(), Some("eye.png".to_string()))
        );
        assert_eq!(menu_entry("no colon").unwrap_err().kind, ErrorKind::ColonNotFound);
    }

    #[test]
    fn test_base_name_strips_index() {
        assert_eq!(base_name(" $ITEMS['a'] "), "$ITEMS");
        assert_eq!(base_name("X"), "X");
    }
}
