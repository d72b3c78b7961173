//! Evaluates the commands of one line.

use std::ffi::CString;
use std::io::{self, Write};
use std::os::unix::ffi::OsStrExt;
use std::path::Path;

use nix::unistd::execv;
use tracing::{debug, trace};

use crate::ast::Command;
use crate::builtin::{self, BuiltinSpec, Flow};
use crate::error::{ShellError, ShellResult};
use crate::job::{self, Roster, CHILD_SETUP_FAILED, EXEC_FAILED};
use crate::parser::parse;
use crate::redirect::{self, RedirectGuard};
use crate::system::Environment;

/// Runs lines of input against a fixed environment.
pub struct Evaluator {
    env: Environment,
}

impl Evaluator {
    pub fn new(env: Environment) -> Self {
        Self { env }
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    /// Parses and evaluates a line.
    ///
    /// Syntax errors and per-command failures are reported on stderr. Only
    /// fatal errors are returned.
    pub fn eval_line(&self, command_text: &str) -> ShellResult<Flow> {
        let parsed = match parse(command_text) {
            Ok(parsed) => parsed,
            Err(e) => {
                eprintln!("{e}");
                return Ok(Flow::Continue);
            }
        };
        for diagnostic in &parsed.diagnostics {
            eprintln!("{diagnostic}");
        }
        self.execute_line(parsed.commands)
    }

    /// Evaluates commands left to right. Every background child is waited
    /// on before this returns, however it returns.
    pub fn execute_line(&self, commands: Vec<Command>) -> ShellResult<Flow> {
        let mut roster = Roster::default();
        let flow = self.dispatch(commands, &mut roster);
        if !roster.is_empty() {
            debug!(pending = roster.len(), "waiting on background children");
        }
        roster.reap();
        flow
    }

    fn dispatch(&self, commands: Vec<Command>, roster: &mut Roster) -> ShellResult<Flow> {
        for command in commands {
            match self.eval_command(&command, roster) {
                Ok(Flow::Continue) => {}
                Ok(Flow::Exit(code)) => return Ok(Flow::Exit(code)),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => eprintln!("{e}"),
            }
        }
        Ok(Flow::Continue)
    }

    /// Evaluates a command.
    fn eval_command(&self, command: &Command, roster: &mut Roster) -> ShellResult<Flow> {
        let Some(name) = command.name() else {
            trace!(?command, "nothing to run");
            return Ok(Flow::Continue);
        };
        debug!(
            name,
            background = command.background,
            redirected = command.has_redirection(),
            "dispatching"
        );

        if let Some(spec) = builtin::lookup(name) {
            spec.check(command.args.len() - 1)?;
            if command.background {
                let pid = job::spawn(|| self.built_in_child(spec, command))?;
                roster.push(pid);
                return Ok(Flow::Continue);
            }
            return self.eval_built_in(spec, command);
        }

        let path = self
            .env
            .search_for_executable_file(name)
            .ok_or_else(|| ShellError::CommandNotFound(name.to_string()))?;
        self.eval_external(&path, command, roster)?;
        Ok(Flow::Continue)
    }

    /// Evaluates a built in command in this process.
    fn eval_built_in(&self, spec: &BuiltinSpec, command: &Command) -> ShellResult<Flow> {
        let _guard = RedirectGuard::apply(command)?;
        let mut stdout = io::stdout().lock();
        builtin::run(spec.built_in, &command.args, &self.env, &mut stdout)
    }

    /// Body of a forked child running a background builtin.
    fn built_in_child(&self, spec: &BuiltinSpec, command: &Command) -> i32 {
        if let Err(e) = redirect::apply_permanently(command) {
            eprintln!("{e}");
            return CHILD_SETUP_FAILED;
        }
        let mut stdout = io::stdout().lock();
        let result = builtin::run(spec.built_in, &command.args, &self.env, &mut stdout);
        let _ = stdout.flush();
        match result {
            Ok(Flow::Continue) => 0,
            Ok(Flow::Exit(code)) => code,
            Err(e) => {
                eprintln!("{e}");
                1
            }
        }
    }

    /// Evaluates an external command in a forked child, waiting for it
    /// unless it runs in the background.
    fn eval_external(
        &self,
        path: &Path,
        command: &Command,
        roster: &mut Roster,
    ) -> ShellResult<()> {
        let program = CString::new(path.as_os_str().as_bytes())?;
        let argv = command
            .args
            .iter()
            .map(|arg| CString::new(arg.as_bytes()))
            .collect::<Result<Vec<_>, _>>()?;

        let pid = job::spawn(|| {
            if let Err(e) = redirect::apply_permanently(command) {
                eprintln!("{e}");
                return CHILD_SETUP_FAILED;
            }
            if let Err(e) = execv(&program, &argv) {
                eprintln!("{}: {e}", path.display());
            }
            EXEC_FAILED
        })?;

        if command.background {
            roster.push(pid);
        } else {
            let status = job::wait_for(pid)?;
            trace!(%pid, status, "child exited");
        }
        Ok(())
    }
}
