//! Error types used while scanning, building and evaluating a line.

use std::io;
use std::path::PathBuf;

/// Any failure the shell reports to the user.
///
/// The `Display` text of each variant is the diagnostic printed on stderr.
#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    /// A quote was still open at the end of the line.
    #[error("syntax error: unterminated quote")]
    UnterminatedQuote,

    /// A redirection operator had no word after it.
    #[error("syntax error: expected filename after '{operator}'")]
    MissingRedirectTarget { operator: &'static str },

    /// A `|` was seen. Pipelines are recognized but never connected.
    #[error("warning: pipelines are not supported, '|' ignored")]
    PipeIgnored,

    #[error("{name}: too few arguments")]
    TooFewArguments { name: &'static str },

    #[error("{name}: too many arguments")]
    TooManyArguments { name: &'static str },

    #[error("{0}: command not found")]
    CommandNotFound(String),

    /// A redirection target could not be opened.
    #[error("{}: {source}", path.display())]
    Redirect { path: PathBuf, source: io::Error },

    #[error("fork: {0}")]
    Fork(nix::Error),

    /// `exit` was given something that is not an integer.
    #[error("exit: {0}: numeric argument required")]
    InvalidExitCode(String),

    #[error("cd: {}: {source}", path.display())]
    ChangeDirectory { path: PathBuf, source: io::Error },

    #[error("cd: HOME not set")]
    HomeNotSet,

    /// An argument held a NUL byte and cannot be passed to a program.
    #[error("{0}")]
    Nul(#[from] std::ffi::NulError),

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Sys(#[from] nix::Error),
}

impl ShellError {
    /// Fatal errors end the whole process rather than one command.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ShellError::InvalidExitCode(_))
    }
}

/// Result alias for the shell's library code.
pub type ShellResult<T> = Result<T, ShellError>;
