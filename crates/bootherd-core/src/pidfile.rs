//! Pid file persistence.
//!
//! A pid file is the on-disk record of the most recently launched instance
//! of a service: a bare decimal pid and a trailing newline, at a well-known
//! path such as `/var/run/dhcpd.pid`.
//!
//! Missing files and unparseable content are normal states (service down,
//! external interference) and are reported as `None`. Anything that points
//! at an unusable directory (permission denied, disk full) is returned as
//! the fatal [`SupervisorError::PidFile`] variant, because a supervisor that
//! cannot persist pids is operating blind.

use std::io::ErrorKind;
use std::path::Path;

use crate::error::{Result, SupervisorError};

/// Reads the recorded pid, if any.
///
/// Returns `Ok(None)` for a missing file and for unparseable content (the
/// content is untrusted after external interference; the stale file will
/// be removed before the next spawn).
///
/// # Errors
/// Returns the fatal [`SupervisorError::PidFile`] if the file exists but
/// cannot be read.
pub fn read_pid(path: &Path) -> Result<Option<u32>> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(SupervisorError::PidFile {
                path: path.to_path_buf(),
                source: e,
            });
        }
    };
    match content.trim().parse::<u32>() {
        Ok(pid) if pid > 0 => Ok(Some(pid)),
        _ => {
            tracing::warn!(path = %path.display(), "ignoring malformed pid file");
            Ok(None)
        }
    }
}

/// Persists a pid, replacing any previous content.
///
/// # Errors
/// Returns the fatal [`SupervisorError::PidFile`] on any write failure.
pub fn write_pid(path: &Path, pid: u32) -> Result<()> {
    std::fs::write(path, format!("{pid}\n")).map_err(|e| SupervisorError::PidFile {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Removes the pid file. Absence is not an error; a stale file left behind
/// would race a subsequent spawn and point at a recycled pid.
///
/// # Errors
/// Returns the fatal [`SupervisorError::PidFile`] on any other failure.
pub fn remove_pid(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(SupervisorError::PidFile {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}
