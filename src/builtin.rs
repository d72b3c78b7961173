//! Shell builtins: the registry and their bodies.

use std::io::Write;
use std::path::PathBuf;

use bytes::{BufMut, BytesMut};

use crate::error::{ShellError, ShellResult};
use crate::system::Environment;

/// A command implemented inside the shell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BuiltIn {
    /// Changes the working directory to a given path.
    Cd,

    /// Echos back user input.
    Echo,

    /// Exits the shell with a return code.
    Exit,

    /// Prints the working directory.
    Pwd,

    /// Displays the type of command.
    Type,
}

/// Argument count limits for a builtin, not counting the name.
#[derive(Debug, PartialEq, Eq)]
pub struct BuiltinSpec {
    pub built_in: BuiltIn,
    pub name: &'static str,
    pub min_args: usize,

    /// `None` means no upper limit.
    pub max_args: Option<usize>,
}

/// Result of checking an argument count against a [`BuiltinSpec`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArgCount {
    TooFew,
    TooMany,
    Ok,
}

static BUILTINS: [BuiltinSpec; 5] = [
    BuiltinSpec::new(BuiltIn::Echo, "echo", 0, None),
    BuiltinSpec::new(BuiltIn::Type, "type", 0, None),
    BuiltinSpec::new(BuiltIn::Pwd, "pwd", 0, Some(0)),
    BuiltinSpec::new(BuiltIn::Exit, "exit", 0, Some(1)),
    BuiltinSpec::new(BuiltIn::Cd, "cd", 0, Some(1)),
];

/// Finds the builtin called `name`.
pub fn lookup(name: &str) -> Option<&'static BuiltinSpec> {
    BUILTINS.iter().find(|spec| spec.name == name)
}

/// Names of every builtin, for completion.
pub fn names() -> impl Iterator<Item = &'static str> {
    BUILTINS.iter().map(|spec| spec.name)
}

impl BuiltinSpec {
    const fn new(
        built_in: BuiltIn,
        name: &'static str,
        min_args: usize,
        max_args: Option<usize>,
    ) -> Self {
        Self {
            built_in,
            name,
            min_args,
            max_args,
        }
    }

    /// Checks `argc`, the argument count excluding the command name.
    pub fn validate(&self, argc: usize) -> ArgCount {
        if argc < self.min_args {
            return ArgCount::TooFew;
        }
        match self.max_args {
            Some(max) if argc > max => ArgCount::TooMany,
            _ => ArgCount::Ok,
        }
    }

    /// Like [`BuiltinSpec::validate`] but as the error the user sees.
    pub fn check(&self, argc: usize) -> ShellResult<()> {
        match self.validate(argc) {
            ArgCount::Ok => Ok(()),
            ArgCount::TooFew => Err(ShellError::TooFewArguments { name: self.name }),
            ArgCount::TooMany => Err(ShellError::TooManyArguments { name: self.name }),
        }
    }
}

/// What the shell should do after a builtin ran.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit(i32),
}

/// Runs a builtin. `args[0]` is the builtin's own name.
pub fn run(
    built_in: BuiltIn,
    args: &[String],
    env: &Environment,
    stdout: &mut dyn Write,
) -> ShellResult<Flow> {
    let rest = args.get(1..).unwrap_or_default();
    match built_in {
        BuiltIn::Echo => echo(rest, stdout)?,
        BuiltIn::Pwd => pwd(stdout)?,
        BuiltIn::Type => type_builtin(rest, env, stdout)?,
        BuiltIn::Cd => cd(rest.first().map(String::as_str), env)?,
        BuiltIn::Exit => return exit(rest.first().map(String::as_str)).map(Flow::Exit),
    }
    Ok(Flow::Continue)
}

/// Writes the arguments separated by spaces as one buffer.
fn echo(args: &[String], stdout: &mut dyn Write) -> ShellResult<()> {
    let len = args.iter().map(|arg| arg.len() + 1).sum::<usize>().max(1);
    let mut buffer = BytesMut::with_capacity(len);
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            buffer.put_u8(b' ');
        }
        buffer.put_slice(arg.as_bytes());
    }
    buffer.put_u8(b'\n');
    stdout.write_all(&buffer)?;
    Ok(())
}

fn pwd(stdout: &mut dyn Write) -> ShellResult<()> {
    let current_dir = std::env::current_dir()?;
    writeln!(stdout, "{}", current_dir.display())?;
    Ok(())
}

fn type_builtin(args: &[String], env: &Environment, stdout: &mut dyn Write) -> ShellResult<()> {
    for command in args {
        if lookup(command).is_some() {
            writeln!(stdout, "{} is a shell builtin", command)?;
        } else if let Some(path) = env.search_for_executable_file(command) {
            writeln!(stdout, "{} is {}", command, path.display())?;
        } else {
            writeln!(stdout, "{}: not found", command)?;
        }
    }
    Ok(())
}

fn cd(target: Option<&str>, env: &Environment) -> ShellResult<()> {
    let path = match target {
        Some(target) => expand_home(target, env)?,
        None => env.home().ok_or(ShellError::HomeNotSet)?.to_path_buf(),
    };
    env.change_directory(&path)
}

/// Expands a leading `~` when it is the whole word or followed by `/`.
fn expand_home(target: &str, env: &Environment) -> ShellResult<PathBuf> {
    match target.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => {
            let home = env.home().ok_or(ShellError::HomeNotSet)?;
            let mut expanded = home.as_os_str().to_owned();
            expanded.push(rest);
            Ok(PathBuf::from(expanded))
        }
        _ => Ok(PathBuf::from(target)),
    }
}

fn exit(code: Option<&str>) -> ShellResult<i32> {
    match code {
        None => Ok(0),
        Some(code) => code
            .parse()
            .map_err(|_| ShellError::InvalidExitCode(code.to_string())),
    }
}
