//! Module used to handle rustyline library.

use rustyline::completion::Candidate;
use rustyline::history::FileHistory;
use rustyline::{
    Completer, CompletionType, Config, Context, Editor, Helper, Highlighter, Hinter, Validator,
};
use std::fs::read_dir;
use std::path::PathBuf;
use tracing::debug;
use trie_rs::TrieBuilder;

use crate::builtin;
use crate::system::is_executable;

pub type ShellEditor = Editor<ShellHelper, FileHistory>;

/// Creates the line editor, with command name completion if `completion`.
pub fn create_editor(paths: &[PathBuf], completion: bool) -> anyhow::Result<ShellEditor> {
    let config = Config::builder()
        .completion_type(CompletionType::List)
        .auto_add_history(false)
        .build();
    let mut editor = Editor::with_config(config)?;
    if completion {
        let completer = ShellCompleter::new(paths.to_vec());
        editor.set_helper(Some(ShellHelper::new(completer)));
    }
    Ok(editor)
}

#[derive(Helper, Completer, Hinter, Highlighter, Validator)]
pub struct ShellHelper {
    #[rustyline(Completer)]
    completer: ShellCompleter,
}

impl ShellHelper {
    fn new(completer: ShellCompleter) -> Self {
        Self { completer }
    }
}

/// Completes the command name from builtins and executables on the path.
pub struct ShellCompleter {
    paths: Vec<PathBuf>,
}

impl ShellCompleter {
    fn new(paths: Vec<PathBuf>) -> Self {
        Self { paths }
    }

    /// Every name that can start a command.
    fn command_names(&self) -> impl Iterator<Item = String> + '_ {
        let executables = self
            .paths
            .iter()
            .filter_map(|dir| read_dir(dir).ok())
            .flatten()
            .filter_map(Result::ok)
            .filter(|entry| is_executable(&entry.path()))
            .filter_map(|entry| entry.file_name().into_string().ok());
        builtin::names().map(String::from).chain(executables)
    }
}

impl rustyline::completion::Completer for ShellCompleter {
    type Candidate = CommandName;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<CommandName>)> {
        let prefix = &line[..pos];

        // Only the command name is completed.
        if prefix.is_empty() || prefix.contains(char::is_whitespace) {
            return Ok((pos, Vec::new()));
        }

        let trie = {
            let mut trie_builder = TrieBuilder::new();
            for name in self.command_names() {
                trie_builder.push(name);
            }
            trie_builder.build()
        };

        // The prefix starts the line, so each candidate replaces it whole.
        let mut completions: Vec<CommandName> = trie
            .postfix_search(prefix)
            .map(|rest: String| CommandName::new(format!("{prefix}{rest}")))
            .collect();
        completions.dedup();
        debug!(prefix, count = completions.len(), "completed command name");

        Ok((0, completions))
    }
}

/// A completed command name followed by the space that ends it.
#[derive(Debug, PartialEq, Eq)]
pub struct CommandName(String);

impl CommandName {
    fn new(mut name: String) -> Self {
        name.push(' ');
        Self(name)
    }
}

impl Candidate for CommandName {
    fn display(&self) -> &str {
        self.0.trim_end()
    }

    fn replacement(&self) -> &str {
        &self.0
    }
}
