//! Forked children and the roster of background work for one line.

use std::io::{self, Write};

use nix::errno::Errno;
use nix::sys::wait::{waitpid, WaitStatus};
use nix::unistd::{fork, ForkResult, Pid};
use tracing::{trace, warn};

use crate::error::{ShellError, ShellResult};

/// Status reported when a child could not even start its work.
pub const CHILD_SETUP_FAILED: i32 = 1;

/// Status reported when replacing the child's image failed.
pub const EXEC_FAILED: i32 = 126;

/// Forks, runs `work` in the new process and exits it with the returned
/// status. Returns the child's pid in the parent.
///
/// Stdout is flushed first so buffered output is not written twice.
pub fn spawn<F>(work: F) -> ShellResult<Pid>
where
    F: FnOnce() -> i32,
{
    io::stdout().flush()?;

    // SAFETY: the shell is single threaded, and the child only runs the
    // closure before `_exit`, never returning into the caller.
    match unsafe { fork() } {
        Ok(ForkResult::Parent { child }) => {
            trace!(%child, "forked");
            Ok(child)
        }
        Ok(ForkResult::Child) => {
            let status = work();
            let _ = io::stdout().flush();
            // SAFETY: `_exit` skips atexit handlers that belong to the parent.
            unsafe { libc::_exit(status) }
        }
        Err(e) => Err(ShellError::Fork(e)),
    }
}

/// Blocks until `pid` terminates and returns its status. Signalled children
/// report 128 plus the signal number.
pub fn wait_for(pid: Pid) -> ShellResult<i32> {
    loop {
        match waitpid(pid, None) {
            Ok(WaitStatus::Exited(_, code)) => return Ok(code),
            Ok(WaitStatus::Signaled(_, signal, _)) => return Ok(128 + signal as i32),
            Ok(_) | Err(Errno::EINTR) => continue,
            Err(e) => return Err(e.into()),
        }
    }
}

/// Background children started while evaluating one line.
///
/// Every child is waited on by [`Roster::reap`], or when the roster drops.
#[derive(Debug, Default)]
pub struct Roster {
    pids: Vec<Pid>,
}

impl Roster {
    pub fn push(&mut self, pid: Pid) {
        self.pids.push(pid);
    }

    pub fn len(&self) -> usize {
        self.pids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pids.is_empty()
    }

    /// Waits on every child and empties the roster.
    pub fn reap(&mut self) {
        for pid in self.pids.drain(..) {
            match wait_for(pid) {
                Ok(status) => trace!(%pid, status, "reaped background child"),
                Err(e) => warn!(%pid, "reaping background child: {e}"),
            }
        }
    }
}

impl Drop for Roster {
    fn drop(&mut self) {
        self.reap();
    }
}
