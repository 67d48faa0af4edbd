//! Pid file registration and exit-time removal.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{info, warn};

use super::PROCESS_TARGET;
use super::exit::{ExitHooks, HookId};
use super::files::atomic_write;
use crate::security::{Permission, PolicyError, PolicyGate};

/// Errors raised while writing the pid file.
#[derive(Debug, Error)]
pub enum PidFileError {
    /// The path was relative.
    #[error("pid file path '{}' must be absolute", path.display())]
    RelativePath {
        /// Offending path.
        path: PathBuf,
    },
    /// The security policy refused the write.
    #[error("pid file '{}' is not writable: {source}", path.display())]
    Policy {
        /// Pid file path.
        path: PathBuf,
        /// Policy decision.
        #[source]
        source: PolicyError,
    },
    /// The parent directory could not be created.
    #[error("failed to create pid file directory '{}': {source}", path.display())]
    CreateParent {
        /// Directory path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Writing the pid failed.
    #[error("failed to write pid file '{}': {source}", path.display())]
    Write {
        /// Pid file path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// A written pid file whose removal is owned by the exit hook registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PidFileHandle {
    path: PathBuf,
    hook: HookId,
}

impl PidFileHandle {
    /// Location of the pid file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Exit hook that removes the file.
    #[must_use]
    pub fn hook(&self) -> HookId {
        self.hook
    }
}

/// Writes the current process id to `path` and schedules its removal.
///
/// The removal hook is registered before anything touches the filesystem so
/// every later exit path cleans up, including a failure half-way through the
/// write.
///
/// # Errors
///
/// Returns [`PidFileError`] when the path is relative, the policy refuses the
/// write, or the filesystem operations fail.
pub fn register_pid_file(
    path: &Path,
    hooks: &ExitHooks,
    gate: &PolicyGate,
) -> Result<PidFileHandle, PidFileError> {
    if !path.is_absolute() {
        return Err(PidFileError::RelativePath {
            path: path.to_path_buf(),
        });
    }

    let owned = path.to_path_buf();
    let hook = hooks.register("pidfile-cleanup", move || remove_pid_file(&owned));

    gate.check(Permission::WriteFile(path))
        .map_err(|source| PidFileError::Policy {
            path: path.to_path_buf(),
            source,
        })?;

    if let Some(parent) = path.parent().filter(|parent| !parent.exists()) {
        fs::create_dir_all(parent).map_err(|source| PidFileError::CreateParent {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let pid = std::process::id();
    atomic_write(path, pid.to_string().as_bytes()).map_err(|source| PidFileError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    info!(
        target: PROCESS_TARGET,
        pid,
        file = %path.display(),
        "pid file written"
    );

    Ok(PidFileHandle {
        path: path.to_path_buf(),
        hook,
    })
}

fn remove_pid_file(path: &Path) {
    match fs::remove_file(path) {
        Err(error) if error.kind() != io::ErrorKind::NotFound => {
            warn!(
                target: PROCESS_TARGET,
                file = %path.display(),
                error = %error,
                "failed to delete pid file"
            );
        }
        _ => {}
    }
}
