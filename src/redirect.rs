//! Retargets standard input and output to files for one command.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};
use std::path::Path;

use nix::fcntl::{fcntl, FcntlArg};
use nix::unistd::dup2;
use tracing::{trace, warn};

use crate::ast::Command;
use crate::error::{ShellError, ShellResult};

const STDIN: RawFd = libc::STDIN_FILENO;
const STDOUT: RawFd = libc::STDOUT_FILENO;

/// Lowest descriptor used when setting a standard stream aside.
const SAVED_FD_FLOOR: RawFd = 10;

/// A standard stream that was set aside.
struct Saved {
    target: RawFd,
    original: OwnedFd,
}

/// Keeps standard input and output redirected while alive.
///
/// Dropping the guard flushes stdout and puts the original descriptors back,
/// on every exit path.
#[must_use = "the redirection is undone when the guard is dropped"]
pub struct RedirectGuard {
    saved: Vec<Saved>,
}

impl RedirectGuard {
    /// Applies the command's redirections, remembering what was replaced.
    pub fn apply(command: &Command) -> ShellResult<RedirectGuard> {
        let files = open_files(command)?;
        let mut guard = RedirectGuard {
            saved: Vec::with_capacity(files.len()),
        };
        for (file, target) in files {
            if target == STDOUT {
                io::stdout().flush()?;
            }
            let original = set_aside(target)?;
            guard.saved.push(Saved { target, original });
            retarget(file, target)?;
        }
        Ok(guard)
    }
}

impl Drop for RedirectGuard {
    fn drop(&mut self) {
        if let Err(e) = io::stdout().flush() {
            warn!("flushing redirected stdout: {e}");
        }
        for saved in self.saved.drain(..).rev() {
            if let Err(e) = dup2(saved.original.as_raw_fd(), saved.target) {
                warn!(fd = saved.target, "restoring descriptor: {e}");
            }
            trace!(fd = saved.target, "restored");
        }
    }
}

/// Applies the command's redirections for good. Used in forked children,
/// which never need the originals back.
pub fn apply_permanently(command: &Command) -> ShellResult<()> {
    for (file, target) in open_files(command)? {
        retarget(file, target)?;
    }
    Ok(())
}

/// Opens every redirection target before touching any descriptor, so a
/// failure leaves the streams as they were.
fn open_files(command: &Command) -> ShellResult<Vec<(File, RawFd)>> {
    let mut files = Vec::with_capacity(2);
    if let Some(path) = &command.input {
        let file = open(path, OpenOptions::new().read(true))?;
        files.push((file, STDIN));
    }
    if let Some(output) = &command.output {
        let mut options = OpenOptions::new();
        options.write(true).create(true);
        if output.is_append {
            options.append(true);
        } else {
            options.truncate(true);
        }
        let file = open(&output.filename, &options)?;
        files.push((file, STDOUT));
    }
    Ok(files)
}

fn open(path: &Path, options: &OpenOptions) -> ShellResult<File> {
    options.open(path).map_err(|source| ShellError::Redirect {
        path: path.to_path_buf(),
        source,
    })
}

/// Duplicates `target` onto a close-on-exec descriptor.
fn set_aside(target: RawFd) -> ShellResult<OwnedFd> {
    let fd = fcntl(target, FcntlArg::F_DUPFD_CLOEXEC(SAVED_FD_FLOOR))?;
    // SAFETY: `fcntl` just returned this descriptor and nothing else owns it.
    Ok(unsafe { OwnedFd::from_raw_fd(fd) })
}

/// Points `target` at `file`. The file's own descriptor is closed when it
/// drops at the end of this call, whether or not `dup2` succeeded.
fn retarget(file: File, target: RawFd) -> ShellResult<()> {
    dup2(file.as_raw_fd(), target)?;
    trace!(fd = target, "redirected");
    Ok(())
}
