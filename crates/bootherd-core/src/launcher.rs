//! Service launching.
//!
//! One launch is: terminate whatever is left of the previous instance,
//! clear its pid file, give the OS a settle delay to release the bound
//! socket, spawn the binary detached, and persist the new pid.

use std::sync::Arc;
use std::time::Duration;

use crate::error::Result;
use crate::pidfile;
use crate::process::ProcessController;
use crate::registry::ServiceEntry;

/// Starts and restarts managed services.
pub struct Launcher {
    controller: Arc<dyn ProcessController>,
    settle_delay: Duration,
}

impl Launcher {
    /// Creates a launcher.
    #[must_use]
    pub fn new(controller: Arc<dyn ProcessController>, settle_delay: Duration) -> Self {
        Self {
            controller,
            settle_delay,
        }
    }

    /// Launches a service, replacing any prior instance.
    ///
    /// Idempotent with respect to a dead predecessor: terminating an
    /// absent pid and removing an absent pid file are both no-ops, so the
    /// result is always exactly one live process and a pid file naming it.
    ///
    /// The pid file is written immediately after spawn confirmation, not
    /// atomically with it. A crash in between leaves a running daemon with
    /// no pid file; the next liveness check then reads the service as down
    /// and re-launches, which can race the orphan. Accepted gap.
    ///
    /// # Errors
    /// Returns a launch error naming the service when the spawn fails, or
    /// a fatal error when the pid file cannot be written.
    pub async fn launch(&self, entry: &mut ServiceEntry) -> Result<()> {
        self.prepare(entry).await?;
        tokio::time::sleep(self.settle_delay).await;
        self.spawn_and_record(entry).await
    }

    /// Terminates any prior instance (best-effort) and removes the stale
    /// pid file. The prior pid may live in the runtime handle, on disk, or
    /// both: a daemon left running by a previous supervisor incarnation is
    /// known only through its pid file, and it must be stopped here or the
    /// fresh spawn loses the port-bind race to it.
    pub(crate) async fn prepare(&self, entry: &mut ServiceEntry) -> Result<()> {
        let mut priors = Vec::new();
        if let Some(pid) = entry.handle.pid.take() {
            priors.push(pid);
        }
        if let Some(pid) = pidfile::read_pid(&entry.spec.pid_file)? {
            if !priors.contains(&pid) {
                priors.push(pid);
            }
        }
        for pid in priors {
            if let Err(e) = self.controller.terminate(pid).await {
                tracing::debug!(service = %entry.spec.name, pid, error = %e,
                    "could not terminate prior instance");
            }
        }
        pidfile::remove_pid(&entry.spec.pid_file)
    }

    /// Spawns the binary and persists the fresh pid.
    pub(crate) async fn spawn_and_record(&self, entry: &mut ServiceEntry) -> Result<()> {
        let pid = self.controller.spawn(&entry.spec).await?;
        entry.handle.record(pid);
        pidfile::write_pid(&entry.spec.pid_file, pid)?;
        tracing::info!(service = %entry.spec.name, pid, "launched");
        Ok(())
    }
}
