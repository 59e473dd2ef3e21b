//! Process-table operations.
//!
//! [`ProcessController`] is the seam between the supervisor and the OS:
//! spawning detached daemons, the non-destructive "does pid N exist" probe,
//! pid-directed termination, and the last-resort kill-by-cmdline-pattern
//! used only by emergency recovery. Everything above this trait is testable
//! without touching the real process table.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::process::Child;
use tokio::sync::Mutex;

use crate::config::ServiceSpec;
use crate::error::{Result, SupervisorError};

/// OS process-table interface used by the launcher and liveness checker.
#[async_trait]
pub trait ProcessController: Send + Sync {
    /// Spawns the service binary detached from the supervisor's own
    /// process group and returns its pid.
    async fn spawn(&self, spec: &ServiceSpec) -> Result<u32>;

    /// Non-destructive existence probe for a pid.
    async fn process_exists(&self, pid: u32) -> Result<bool>;

    /// Sends SIGTERM to an exact pid. A pid that no longer exists is not
    /// an error.
    async fn terminate(&self, pid: u32) -> Result<()>;

    /// Terminates every process whose command line contains `pattern`,
    /// returning how many were signaled.
    ///
    /// Pattern matching can hit unrelated processes sharing a substring;
    /// callers must prefer [`terminate`](Self::terminate) with a recorded
    /// pid and reach for this only on the emergency path.
    async fn kill_matching(&self, pattern: &str) -> Result<usize>;
}

/// Real controller for Unix hosts.
///
/// Keeps handles to the children it spawned so they are reaped promptly;
/// pids read back from pid files (for example after a supervisor restart)
/// are probed with `kill(pid, 0)` instead.
#[cfg(unix)]
pub struct UnixController {
    children: Mutex<HashMap<u32, Child>>,
}

#[cfg(unix)]
impl UnixController {
    /// Creates a new controller.
    #[must_use]
    pub fn new() -> Self {
        Self {
            children: Mutex::new(HashMap::new()),
        }
    }

    /// Reaps children that have already exited, so their pids stop
    /// reading as alive.
    async fn reap_exited(&self) {
        let mut children = self.children.lock().await;
        let exited: Vec<u32> = children
            .iter_mut()
            .filter_map(|(pid, child)| match child.try_wait() {
                Ok(Some(_)) => Some(*pid),
                _ => None,
            })
            .collect();
        for pid in exited {
            children.remove(&pid);
        }
    }

    fn probe(pid: u32) -> Result<bool> {
        use nix::errno::Errno;
        use nix::sys::signal::kill;
        use nix::unistd::Pid;

        match kill(Pid::from_raw(pid as i32), None) {
            Ok(()) => Ok(true),
            Err(Errno::ESRCH) => Ok(false),
            // Exists, but owned by someone else.
            Err(Errno::EPERM) => Ok(true),
            Err(e) => Err(SupervisorError::probe(pid, e.to_string())),
        }
    }
}

#[cfg(unix)]
impl Default for UnixController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(unix)]
#[async_trait]
impl ProcessController for UnixController {
    async fn spawn(&self, spec: &ServiceSpec) -> Result<u32> {
        use std::process::Stdio;
        use tokio::process::Command;

        self.reap_exited().await;

        let child = Command::new(&spec.binary_path)
            .args(&spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            // Own process group: terminal signals aimed at the supervisor
            // must not reach the daemons.
            .process_group(0)
            .spawn()
            .map_err(|e| SupervisorError::launch(spec.name, e.to_string()))?;

        let pid = child
            .id()
            .ok_or_else(|| SupervisorError::launch(spec.name, "exited before pid was read"))?;

        self.children.lock().await.insert(pid, child);
        tracing::debug!(service = %spec.name, pid, "spawned process");
        Ok(pid)
    }

    async fn process_exists(&self, pid: u32) -> Result<bool> {
        {
            let mut children = self.children.lock().await;
            if let Some(child) = children.get_mut(&pid) {
                match child.try_wait() {
                    Ok(Some(_)) => {
                        children.remove(&pid);
                        return Ok(false);
                    }
                    Ok(None) => return Ok(true),
                    // Fall through to the signal probe.
                    Err(_) => {}
                }
            }
        }
        Self::probe(pid)
    }

    async fn terminate(&self, pid: u32) -> Result<()> {
        use nix::errno::Errno;
        use nix::sys::signal::{Signal, kill};
        use nix::unistd::Pid;

        match kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
            Ok(()) | Err(Errno::ESRCH) => Ok(()),
            Err(e) => Err(SupervisorError::probe(pid, e.to_string())),
        }
    }

    #[cfg(target_os = "linux")]
    async fn kill_matching(&self, pattern: &str) -> Result<usize> {
        let own_pid = std::process::id();
        let mut signaled = 0;

        let entries = std::fs::read_dir("/proc")?;
        for entry in entries.flatten() {
            let Some(pid) = entry
                .file_name()
                .to_str()
                .and_then(|name| name.parse::<u32>().ok())
            else {
                continue;
            };
            if pid == own_pid {
                continue;
            }
            // Processes may vanish mid-scan.
            let Ok(raw) = std::fs::read(entry.path().join("cmdline")) else {
                continue;
            };
            let cmdline: String = raw
                .iter()
                .map(|&b| if b == 0 { ' ' } else { b as char })
                .collect();
            if cmdline.contains(pattern) {
                if self.terminate(pid).await.is_ok() {
                    tracing::info!(pid, pattern, "terminated process by pattern");
                    signaled += 1;
                }
            }
        }
        Ok(signaled)
    }

    #[cfg(not(target_os = "linux"))]
    async fn kill_matching(&self, pattern: &str) -> Result<usize> {
        tracing::warn!(pattern, "kill-by-pattern unsupported without /proc");
        Ok(0)
    }
}
