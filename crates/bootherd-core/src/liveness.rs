//! Liveness checking.
//!
//! Liveness here means existence of the process and nothing more: a daemon
//! that is running but wedged still reads as alive. That is a deliberate,
//! known limitation; protocol-level health checking is explicitly out of
//! scope.

use std::sync::Arc;

use crate::error::Result;
use crate::pidfile;
use crate::process::ProcessController;
use crate::registry::ServiceEntry;

/// Checks whether a service's recorded process still exists.
pub struct LivenessChecker {
    controller: Arc<dyn ProcessController>,
}

impl LivenessChecker {
    /// Creates a checker.
    #[must_use]
    pub fn new(controller: Arc<dyn ProcessController>) -> Self {
        Self { controller }
    }

    /// Returns true if the service's pid file names a live process.
    ///
    /// Self-healing: a stale pid file (file present, process absent) is
    /// deleted on the spot and reported as down; a live pid found on disk
    /// but missing from the handle (supervisor restarted underneath a
    /// running daemon) is adopted.
    ///
    /// # Errors
    /// Returns a fatal error if the pid file cannot be read or removed,
    /// or a probe error if the existence check itself fails.
    pub async fn is_alive(&self, entry: &mut ServiceEntry) -> Result<bool> {
        let Some(pid) = pidfile::read_pid(&entry.spec.pid_file)? else {
            entry.handle.clear();
            return Ok(false);
        };

        if self.controller.process_exists(pid).await? {
            entry.handle.pid = Some(pid);
            Ok(true)
        } else {
            tracing::info!(service = %entry.spec.name, pid, "removing stale pid file");
            pidfile::remove_pid(&entry.spec.pid_file)?;
            entry.handle.clear();
            Ok(false)
        }
    }
}
