//! REPL over a running engine
//!
//! Each input line runs as QSP code in the current game; `?expr` prints
//! the value of an expression. New text and actions are printed after
//! every line.

use crate::Engine;
use crate::interp::Value;
use rustyline::error::ReadlineError;
use rustyline::{DefaultEditor, Result as RlResult};
use std::path::PathBuf;

const PROMPT: &str = "qsp> ";
const HISTORY_FILE: &str = ".qsp_history";

pub struct Repl {
    editor: DefaultEditor,
    engine: Engine,
    history_path: Option<PathBuf>,
}

/// Outcome of a `:` command
#[derive(Debug, PartialEq, Eq)]
enum Command {
    Quit,
    Continue,
}

impl Repl {
    pub fn new(engine: Engine) -> RlResult<Self> {
        let editor = DefaultEditor::new()?;
        let history_path = dirs_home().map(|h| h.join(HISTORY_FILE));
        let mut repl = Repl {
            editor,
            engine,
            history_path,
        };
        if let Some(ref path) = repl.history_path {
            let _ = repl.editor.load_history(path);
        }
        Ok(repl)
    }

    pub fn run(&mut self) -> RlResult<()> {
        println!("QSP REPL {}", env!("CARGO_PKG_VERSION"));
        println!("Type :help for help, :quit to exit.\n");
        self.print_changes();

        loop {
            match self.editor.readline(PROMPT) {
                Ok(line) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    let _ = self.editor.add_history_entry(line);
                    if line.starts_with(':') {
                        if self.handle_command(line) == Command::Quit {
                            break;
                        }
                        continue;
                    }
                    self.eval_input(line);
                }
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                    continue;
                }
                Err(ReadlineError::Eof) => break,
                Err(err) => {
                    eprintln!("Error: {err}");
                    break;
                }
            }
        }

        if let Some(ref path) = self.history_path {
            let _ = self.editor.save_history(path);
        }
        Ok(())
    }

    fn handle_command(&mut self, input: &str) -> Command {
        let (cmd, arg) = match input.split_once(char::is_whitespace) {
            Some((cmd, arg)) => (cmd, arg.trim()),
            None => (input, ""),
        };
        match cmd {
            ":quit" | ":q" | ":exit" => return Command::Quit,
            ":help" | ":h" | ":?" => print_help(),
            ":clear" => print!("\x1B[2J\x1B[1;1H"),
            ":vars" if arg.is_empty() => {
                for name in self.engine.variable_names() {
                    println!("{name}");
                }
            }
            ":vars" => {
                for (i, value) in self.variable_items(arg).iter().enumerate() {
                    println!("{arg}[{i}] = {value}");
                }
            }
            ":goto" if !arg.is_empty() => {
                let result = self.engine.goto_location(arg);
                self.report(result);
            }
            ":act" => match arg.parse::<usize>() {
                Ok(n) if n > 0 => {
                    let result = self.engine.execute_action(n - 1);
                    self.report(result);
                }
                _ => println!("Usage: :act N"),
            },
            _ => {
                println!("Unknown command: {input}");
                println!("Type :help for help.");
            }
        }
        Command::Continue
    }

    /// Every item of an array, read through the sigil of `name`
    fn variable_items(&self, name: &str) -> Vec<Value> {
        (0..self.engine.variable_size(name).max(1))
            .map(|i| self.engine.get_variable(name, &Value::Number(i as i64)))
            .collect()
    }

    fn eval_input(&mut self, input: &str) {
        if let Some(expr) = input.strip_prefix('?') {
            match self.engine.eval_expression(expr) {
                Ok(value) => println!("{value}"),
                Err(err) => eprintln!("Error: {err}"),
            }
            return;
        }
        let result = self.engine.run_string(input);
        self.report(result);
    }

    fn report(&mut self, result: Result<(), crate::EngineError>) {
        if let Err(err) = result {
            eprintln!("Error: {err}");
        }
        self.print_changes();
    }

    fn print_changes(&mut self) {
        if self.engine.is_main_desc_changed() && !self.engine.main_text().is_empty() {
            println!("{}", self.engine.main_text().trim_end());
        }
        if self.engine.is_vars_desc_changed() && !self.engine.stat_text().is_empty() {
            println!("--- stat ---\n{}", self.engine.stat_text().trim_end());
        }
        if self.engine.is_actions_changed() {
            for (i, action) in self.engine.actions().iter().enumerate() {
                println!("  [{}] {}", i + 1, action.desc);
            }
        }
    }
}

fn print_help() {
    println!("QSP REPL Commands:");
    println!("  :help, :h, :?   Show this help");
    println!("  :quit, :q       Exit the REPL");
    println!("  :clear          Clear the screen");
    println!("  :vars [NAME]    List variables, or the items of NAME");
    println!("  :goto LOC       Go to a location");
    println!("  :act N          Run the N-th action");
    println!();
    println!("Any other line runs as QSP code, e.g. *pl 'hello' or x += 1.");
    println!("Prefix an expression with ? to print it: ?len($name)");
}

fn dirs_home() -> Option<PathBuf> {
    #[cfg(windows)]
    {
        std::env::var("USERPROFILE").ok().map(PathBuf::from)
    }
    #[cfg(not(windows))]
    {
        std::env::var("HOME").ok().map(PathBuf::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EngineConfig, Location, NullHost, World};

    fn repl() -> Repl {
        let mut engine = Engine::new(EngineConfig::default(), Box::new(NullHost));
        let mut world = World::new();
        world.add(Location::new("hall", "*pl 'In the hall'\nact 'Wait': x += 1"));
        engine.load_world(world);
        Repl::new(engine).unwrap()
    }

    #[test]
    fn test_quit_commands() {
        let mut repl = repl();
        for cmd in [":quit", ":q", ":exit"] {
            assert_eq!(repl.handle_command(cmd), Command::Quit);
        }
        assert_eq!(repl.handle_command(":help"), Command::Continue);
        assert_eq!(repl.handle_command(":nope"), Command::Continue);
    }

    #[test]
    fn test_code_lines_run_in_engine() {
        let mut repl = repl();
        repl.eval_input("$items[] = 'a' & $items[] = 'b'");
        assert_eq!(
            repl.variable_items("$items"),
            vec![Value::from("a"), Value::from("b")]
        );
        repl.eval_input("?1/0");
    }

    #[test]
    fn test_goto_and_act_commands() {
        let mut repl = repl();
        repl.handle_command(":goto hall");
        assert_eq!(repl.engine.current_location(), Some("hall"));
        repl.handle_command(":act 1");
        assert_eq!(repl.engine.get_variable("x", &Value::Number(0)), Value::Number(1));
    }

    #[test]
    fn test_history_file_name() {
        let repl = repl();
        if let Some(path) = repl.history_path {
            assert!(path.ends_with(HISTORY_FILE));
        }
    }
}
