//! QSP CLI

use clap::{Parser, Subcommand};
use qsp::error::report_error;
use qsp::preprocessor::preprocess;
use qsp::{CompileError, Engine, EngineConfig, NullHost, World};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "qsp", version, about = "QSP interactive fiction engine")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load a world and run a location
    Run {
        /// Plain-text world file
        file: PathBuf,
        /// Location to start in (default: the first one)
        #[arg(long)]
        loc: Option<String>,
        /// Engine configuration (TOML)
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Evaluate one expression
    Eval {
        expr: String,
    },
    /// Dump the preprocessed lines of a code file (debug)
    Lines {
        file: PathBuf,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Interactive loop, optionally over a world file
    Repl {
        file: Option<PathBuf>,
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() {
    qsp::init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Run { file, loc, config } => run_file(&file, loc.as_deref(), config.as_deref()),
        Command::Eval { expr } => eval_expr(&expr),
        Command::Lines { file, json } => dump_lines(&file, json),
        Command::Repl { file, config } => start_repl(file.as_deref(), config.as_deref()),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

type CliResult = Result<(), Box<dyn std::error::Error>>;

fn load_config(path: Option<&Path>) -> Result<EngineConfig, Box<dyn std::error::Error>> {
    match path {
        Some(path) => Ok(EngineConfig::load(path)?),
        None => Ok(EngineConfig::default()),
    }
}

/// Load a world file, reporting format errors with ariadne
fn load_world(path: &Path) -> Result<World, Box<dyn std::error::Error>> {
    let source = std::fs::read_to_string(path)?;
    World::load_text(&source).map_err(|err| reported(&path.display().to_string(), &source, err))
}

/// Print a compile error with its source and hand it back
fn reported(filename: &str, source: &str, err: CompileError) -> Box<dyn std::error::Error> {
    let _ = report_error(filename, source, &err);
    err.into()
}

fn run_file(path: &Path, loc: Option<&str>, config: Option<&Path>) -> CliResult {
    let world = load_world(path)?;
    let start = match loc {
        Some(name) => name.to_string(),
        None => world.first().ok_or("world has no locations")?.to_string(),
    };
    let mut engine = Engine::new(load_config(config)?, Box::new(NullHost));
    engine.load_world(world);
    let result = engine.goto_location(&start);
    print_screen(&engine);
    Ok(result?)
}

fn print_screen(engine: &Engine) {
    let main = engine.main_text().trim_end();
    if !main.is_empty() {
        println!("{main}");
    }
    let stat = engine.stat_text().trim_end();
    if !stat.is_empty() {
        println!("--- stat ---\n{stat}");
    }
    for (i, action) in engine.actions().iter().enumerate() {
        println!("[{}] {}", i + 1, action.desc);
    }
    for object in engine.objects() {
        println!("* {}", object.name);
    }
}

fn eval_expr(source: &str) -> CliResult {
    qsp::expr::compile(source).map_err(|err| reported("<expr>", source, err))?;
    let mut engine = Engine::new(EngineConfig::default(), Box::new(NullHost));
    let value = engine.eval_expression(source)?;
    println!("{value}");
    Ok(())
}

fn dump_lines(path: &Path, json: bool) -> CliResult {
    let source = std::fs::read_to_string(path)?;
    let lines = preprocess(&source);
    if json {
        println!("{}", serde_json::to_string_pretty(&lines)?);
        return Ok(());
    }
    for line in &lines {
        let stmts: Vec<String> = line
            .statements
            .iter()
            .map(|stmt| {
                let args: Vec<&str> = stmt.args.iter().map(|a| a.slice(&line.text)).collect();
                match &stmt.error {
                    Some(kind) => format!("{:?}{args:?}!{kind:?}", stmt.kind),
                    None => format!("{:?}{args:?}", stmt.kind),
                }
            })
            .collect();
        let block = if line.is_multiline { " :" } else { "" };
        println!("{:>4} {}{block}", line.line_number, stmts.join(" "));
    }
    Ok(())
}

fn start_repl(path: Option<&Path>, config: Option<&Path>) -> CliResult {
    let mut engine = Engine::new(load_config(config)?, Box::new(NullHost));
    if let Some(path) = path {
        let world = load_world(path)?;
        let first = world.first().map(str::to_string);
        engine.load_world(world);
        if let Some(first) = first
            && let Err(err) = engine.goto_location(&first)
        {
            eprintln!("Error: {err}");
        }
    }
    qsp::repl::Repl::new(engine)?.run()?;
    Ok(())
}
