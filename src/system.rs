//! Contains all code dealing with system access.

use std::env::{split_paths, var_os};
use std::path::{Path, PathBuf};

use nix::unistd::{access, AccessFlags};
use tracing::warn;

use crate::error::{ShellError, ShellResult};

/// The parts of the process environment the shell reads.
///
/// Captured once so the evaluator never reads environment variables directly.
#[derive(Clone, Debug, Default)]
pub struct Environment {
    /// Directories searched for executables, in order.
    paths: Vec<PathBuf>,

    home: Option<PathBuf>,
}

impl Environment {
    pub fn new(paths: Vec<PathBuf>, home: Option<PathBuf>) -> Self {
        Self { paths, home }
    }

    /// Reads `PATH` and `HOME`.
    pub fn from_process() -> Self {
        let paths = match var_os("PATH") {
            Some(path) => split_paths(&path).collect(),
            None => {
                warn!("no PATH environment variable found");
                Vec::new()
            }
        };
        let home = var_os("HOME").map(PathBuf::from);
        Self::new(paths, home)
    }

    /// All directories in the search path.
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// The user's home directory, if known.
    pub fn home(&self) -> Option<&Path> {
        self.home.as_deref()
    }

    /// Searches for an executable file in the search path.
    ///
    /// The first directory holding a regular file named `file_name` that the
    /// current user may execute wins. A name containing `/` is not searched
    /// for; it resolves to itself if executable.
    pub fn search_for_executable_file(&self, file_name: &str) -> Option<PathBuf> {
        if file_name.is_empty() {
            return None;
        }
        if file_name.contains('/') {
            let path = PathBuf::from(file_name);
            return is_executable(&path).then_some(path);
        }
        self.paths
            .iter()
            .map(|dir| dir.join(file_name))
            .find(|candidate| is_executable(candidate))
    }

    /// Changes the current directory.
    pub fn change_directory(&self, path: &Path) -> ShellResult<()> {
        std::env::set_current_dir(path).map_err(|source| ShellError::ChangeDirectory {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Determines if `path` is a regular file the current user may execute.
pub fn is_executable(path: &Path) -> bool {
    path.is_file() && access(path, AccessFlags::X_OK).is_ok()
}
