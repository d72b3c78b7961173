//! A command parser.
//!
//! Groups the scanner's tokens into commands. Each `&` ends a background
//! command; the end of the line ends the last, foreground, command.
//! Redirection targets attach to the command being built.

use std::mem;
use std::path::PathBuf;
use std::vec;

use tracing::debug;

use crate::{
    ast::{Command, OutputRedirection},
    error::{ShellError, ShellResult},
    scanner::*,
};

/// The commands built from one line, plus the recoverable problems found.
#[derive(Debug, Default)]
pub struct Parsed {
    pub commands: Vec<Command>,

    /// Diagnostics that did not stop the build, in the order they occurred.
    pub diagnostics: Vec<ShellError>,
}

/// Tracks and changes the state of the parser.
struct ParserState {
    /// Tokens not yet looked at.
    tokens: vec::IntoIter<Token>,

    /// The current token.
    current: Token,

    /// The command being accumulated.
    command: Command,

    parsed: Parsed,
}

impl ParserState {
    fn new(tokens: Vec<Token>) -> ParserState {
        let mut tokens = tokens.into_iter();
        let current = next_or_end(&mut tokens);
        ParserState {
            tokens,
            current,
            command: Command::default(),
            parsed: Parsed::default(),
        }
    }

    /// Advances to the next token.
    fn advance(&mut self) {
        self.current = next_or_end(&mut self.tokens);
    }

    /// Advances to the next token, returning the current token before the
    /// advance.
    fn advance_keep_current(&mut self) -> Token {
        let next = next_or_end(&mut self.tokens);
        mem::replace(&mut self.current, next)
    }

    /// Consumes a redirection operator and the word after it.
    ///
    /// Returns `None` and records a diagnostic if no word follows. The token
    /// after the operator is left in place so it still gets its own meaning.
    fn redirection_filename(&mut self) -> Option<PathBuf> {
        let operator = self.advance_keep_current();
        if self.current.tag == TokenTag::Word {
            let token = self.advance_keep_current();
            return Some(PathBuf::from(token.lexeme));
        }

        let operator = match operator.tag {
            TokenTag::RedirectIn => "<",
            TokenTag::RedirectOutAppend => ">>",
            _ => ">",
        };
        self.parsed
            .diagnostics
            .push(ShellError::MissingRedirectTarget { operator });
        None
    }

    /// Pushes the accumulated command if it has any content.
    fn finish_command(&mut self, background: bool) {
        let mut command = mem::take(&mut self.command);
        if command.is_empty() {
            return;
        }
        command.background = background;
        self.parsed.commands.push(command);
    }
}

/// Returns the next token, or an end marker once the stream runs out.
fn next_or_end(tokens: &mut vec::IntoIter<Token>) -> Token {
    tokens.next().unwrap_or(Token {
        tag: TokenTag::EndOfCommand,
        lexeme: String::new(),
    })
}

/// Builds commands from a token stream. Never fails; malformed redirections
/// are reported in [`Parsed::diagnostics`] and skipped.
pub fn build(tokens: Vec<Token>) -> Parsed {
    let mut state = ParserState::new(tokens);

    loop {
        match state.current.tag {
            TokenTag::Word => {
                let token = state.advance_keep_current();
                state.command.args.push(token.lexeme);
            }

            TokenTag::RedirectIn => {
                if let Some(filename) = state.redirection_filename() {
                    state.command.input = Some(filename);
                }
            }

            tag @ (TokenTag::RedirectOut | TokenTag::RedirectOutAppend) => {
                if let Some(filename) = state.redirection_filename() {
                    state.command.output = Some(OutputRedirection {
                        filename,
                        is_append: tag == TokenTag::RedirectOutAppend,
                    });
                }
            }

            TokenTag::Background => {
                state.finish_command(true);
                state.advance();
            }

            // Pipelines are not connected: the words on both sides stay in
            // the same command.
            TokenTag::Pipe => {
                state.parsed.diagnostics.push(ShellError::PipeIgnored);
                state.advance();
            }

            TokenTag::EndOfCommand => {
                state.finish_command(false);
                break;
            }
        }
    }

    debug!(commands = ?state.parsed.commands, "built commands");
    state.parsed
}

/// Parses a given command text.
pub fn parse(command_text: &str) -> ShellResult<Parsed> {
    let tokens = tokenize(command_text)?;
    debug!(?tokens, "scanned line");
    Ok(build(tokens))
}
