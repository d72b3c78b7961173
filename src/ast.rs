//! Types produced by the parser and consumed by the evaluator.

use std::path::PathBuf;

/// Where a command's standard output goes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputRedirection {
    pub filename: PathBuf,

    /// Open with append instead of truncating.
    pub is_append: bool,
}

/// A shell command: one unit of work on a line.
///
/// The first argument is the command name. A command with redirections but
/// no words has no name.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Command {
    pub args: Vec<String>,
    pub input: Option<PathBuf>,
    pub output: Option<OutputRedirection>,

    /// The line continues without waiting for this command.
    pub background: bool,
}

impl Command {
    /// The program or builtin name.
    pub fn name(&self) -> Option<&str> {
        self.args.first().map(String::as_str)
    }

    /// Whether anything at all has been collected.
    pub fn is_empty(&self) -> bool {
        self.args.is_empty() && self.input.is_none() && self.output.is_none()
    }

    /// Whether any standard stream is redirected to a file.
    pub fn has_redirection(&self) -> bool {
        self.input.is_some() || self.output.is_some()
    }
}
