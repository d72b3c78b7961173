mod ast;
mod builtin;
mod editing;
mod error;
mod eval;
mod job;
mod parser;
mod redirect;
mod scanner;
mod system;

use std::io::{self, Write};

use clap::Parser;
use rustyline::error::ReadlineError;
use tracing_subscriber::EnvFilter;

use crate::builtin::Flow;
use crate::editing::create_editor;
use crate::eval::Evaluator;
use crate::system::Environment;

/// Environment variable holding the tracing filter, e.g. `TINYSH_LOG=debug`.
const LOG_ENV: &str = "TINYSH_LOG";

/// A small interactive shell.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Run one line of input and exit.
    #[arg(short = 'c', long = "command", value_name = "LINE")]
    command: Option<String>,

    /// Prompt printed before each line.
    #[arg(long, default_value = "$ ")]
    prompt: String,

    /// Disable tab completion of command names.
    #[arg(long)]
    no_completion: bool,
}

fn main() {
    let args = Args::parse();
    init_tracing();

    let evaluator = Evaluator::new(Environment::from_process());
    let code = match run(&args, &evaluator) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{e:#}");
            1
        }
    };
    let _ = io::stdout().flush();
    std::process::exit(code);
}

/// Sends traces to stderr, filtered by `TINYSH_LOG`. Silent by default.
fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("off"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// Runs the session, returning the process exit code.
fn run(args: &Args, evaluator: &Evaluator) -> anyhow::Result<i32> {
    match &args.command {
        Some(command_text) => Ok(eval(evaluator, command_text)?.unwrap_or(0)),
        None => repl(args, evaluator),
    }
}

/// Read, eval, print loop.
fn repl(args: &Args, evaluator: &Evaluator) -> anyhow::Result<i32> {
    let mut editor = create_editor(evaluator.env().paths(), !args.no_completion)?;
    loop {
        match editor.readline(&args.prompt) {
            Ok(command_text) => {
                if command_text.trim().is_empty() {
                    continue;
                }
                editor.add_history_entry(command_text.as_str())?;
                if let Some(code) = eval(evaluator, &command_text)? {
                    return Ok(code);
                }
            }
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => return Ok(0),
            Err(e) => return Err(e.into()),
        }
    }
}

/// Evaluates one line. Returns the exit code if the shell should stop.
fn eval(evaluator: &Evaluator, command_text: &str) -> anyhow::Result<Option<i32>> {
    let command_text = command_text.strip_suffix('\n').unwrap_or(command_text);
    match evaluator.eval_line(command_text)? {
        Flow::Continue => Ok(None),
        Flow::Exit(code) => Ok(Some(code)),
    }
}
