//! Mock implementations for testing.
//!
//! Provides an in-memory [`ProcessController`] with a scriptable process
//! table, so supervisor behavior can be exercised without touching the
//! real OS process table.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use async_trait::async_trait;

use crate::config::ServiceSpec;
use crate::error::{Result, SupervisorError};
use crate::process::ProcessController;
use crate::types::ServiceName;

/// One fake process table row.
#[derive(Debug, Clone)]
struct MockProcess {
    /// Full command line, used for pattern matching.
    cmdline: String,
}

/// Mutable state behind the mock.
#[derive(Debug, Default)]
struct MockTable {
    /// Currently "running" pids.
    alive: HashMap<u32, MockProcess>,
    /// Every spawn, in call order.
    spawn_log: Vec<ServiceName>,
    /// Every spawned pid with its service.
    spawned: Vec<(ServiceName, u32)>,
    /// Pids handed to `terminate`.
    terminated: Vec<u32>,
    /// Patterns handed to `kill_matching`, in call order.
    killed_patterns: Vec<String>,
}

/// In-memory process controller for tests.
pub struct MockController {
    table: parking_lot::Mutex<MockTable>,
    next_pid: AtomicU32,
    fail_next_spawn: AtomicBool,
}

impl MockController {
    /// Creates an empty mock process table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            table: parking_lot::Mutex::new(MockTable::default()),
            next_pid: AtomicU32::new(10_000),
            fail_next_spawn: AtomicBool::new(false),
        }
    }

    /// Makes the next `spawn` call fail. One-shot.
    pub fn fail_next_spawn(&self) {
        self.fail_next_spawn.store(true, Ordering::SeqCst);
    }

    /// Simulates an external kill (crash, OOM, operator).
    pub fn kill(&self, pid: u32) {
        self.table.lock().alive.remove(&pid);
    }

    /// Inserts a process the controller did not spawn, returning its pid.
    /// Models a daemon left over from a previous supervisor incarnation.
    pub fn spawn_external(&self) -> u32 {
        let pid = self.next_pid.fetch_add(1, Ordering::SeqCst);
        self.table.lock().alive.insert(
            pid,
            MockProcess {
                cmdline: "external".to_string(),
            },
        );
        pid
    }

    /// True while the pid is in the fake process table.
    #[must_use]
    pub fn is_alive(&self, pid: u32) -> bool {
        self.table.lock().alive.contains_key(&pid)
    }

    /// Number of live fake processes.
    #[must_use]
    pub fn alive_count(&self) -> usize {
        self.table.lock().alive.len()
    }

    /// Services spawned, in call order.
    #[must_use]
    pub fn spawn_log(&self) -> Vec<ServiceName> {
        self.table.lock().spawn_log.clone()
    }

    /// All pids ever spawned for one service, in spawn order.
    #[must_use]
    pub fn spawned_pids(&self, name: ServiceName) -> Vec<u32> {
        self.table
            .lock()
            .spawned
            .iter()
            .filter(|(n, _)| *n == name)
            .map(|(_, pid)| *pid)
            .collect()
    }

    /// Pids passed to `terminate`, in call order.
    #[must_use]
    pub fn terminated(&self) -> Vec<u32> {
        self.table.lock().terminated.clone()
    }

    /// Patterns passed to `kill_matching`, in call order.
    #[must_use]
    pub fn killed_patterns(&self) -> Vec<String> {
        self.table.lock().killed_patterns.clone()
    }
}

impl Default for MockController {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProcessController for MockController {
    async fn spawn(&self, spec: &ServiceSpec) -> Result<u32> {
        if self.fail_next_spawn.swap(false, Ordering::SeqCst) {
            return Err(SupervisorError::launch(spec.name, "simulated spawn failure"));
        }
        let pid = self.next_pid.fetch_add(1, Ordering::SeqCst);
        let mut cmdline = spec.binary_path.display().to_string();
        for arg in &spec.args {
            cmdline.push(' ');
            cmdline.push_str(arg);
        }
        let mut table = self.table.lock();
        table.alive.insert(pid, MockProcess { cmdline });
        table.spawn_log.push(spec.name);
        table.spawned.push((spec.name, pid));
        Ok(pid)
    }

    async fn process_exists(&self, pid: u32) -> Result<bool> {
        Ok(self.table.lock().alive.contains_key(&pid))
    }

    async fn terminate(&self, pid: u32) -> Result<()> {
        let mut table = self.table.lock();
        table.terminated.push(pid);
        table.alive.remove(&pid);
        Ok(())
    }

    async fn kill_matching(&self, pattern: &str) -> Result<usize> {
        let mut table = self.table.lock();
        table.killed_patterns.push(pattern.to_string());
        let victims: Vec<u32> = table
            .alive
            .iter()
            .filter(|(_, proc)| proc.cmdline.contains(pattern))
            .map(|(pid, _)| *pid)
            .collect();
        for pid in &victims {
            table.alive.remove(pid);
        }
        Ok(victims.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(name: ServiceName, binary: &str) -> ServiceSpec {
        ServiceSpec::new(name, binary)
    }

    #[tokio::test]
    async fn test_spawn_and_probe() {
        let ctl = MockController::new();
        let pid = ctl.spawn(&spec(ServiceName::Dhcp, "/usr/sbin/dhcpd")).await.unwrap();

        assert!(ctl.process_exists(pid).await.unwrap());
        assert_eq!(ctl.spawn_log(), vec![ServiceName::Dhcp]);

        ctl.kill(pid);
        assert!(!ctl.process_exists(pid).await.unwrap());
    }

    #[tokio::test]
    async fn test_fail_next_spawn_is_one_shot() {
        let ctl = MockController::new();
        ctl.fail_next_spawn();

        let err = ctl
            .spawn(&spec(ServiceName::Tftp, "/usr/sbin/in.tftpd"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("tftp"));

        assert!(ctl.spawn(&spec(ServiceName::Tftp, "/usr/sbin/in.tftpd")).await.is_ok());
    }

    #[tokio::test]
    async fn test_kill_matching_by_cmdline() {
        let ctl = MockController::new();
        let dhcp = ctl.spawn(&spec(ServiceName::Dhcp, "/usr/sbin/dhcpd")).await.unwrap();
        let tftp = ctl.spawn(&spec(ServiceName::Tftp, "/usr/sbin/in.tftpd")).await.unwrap();

        let killed = ctl.kill_matching("dhcpd").await.unwrap();
        assert_eq!(killed, 1);
        assert!(!ctl.is_alive(dhcp));
        assert!(ctl.is_alive(tftp));
        assert_eq!(ctl.killed_patterns(), vec!["dhcpd"]);
    }

    #[tokio::test]
    async fn test_terminate_records_pid() {
        let ctl = MockController::new();
        let pid = ctl.spawn(&spec(ServiceName::Dhcp, "/usr/sbin/dhcpd")).await.unwrap();

        ctl.terminate(pid).await.unwrap();
        assert_eq!(ctl.terminated(), vec![pid]);
        assert!(!ctl.is_alive(pid));
    }
}
