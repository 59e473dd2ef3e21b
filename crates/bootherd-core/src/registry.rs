//! The fixed table of managed services.
//!
//! Built once from configuration and owned exclusively by the supervisor
//! control task; nothing else mutates it. Order is preserved from the
//! configuration because it is also the startup order.

use std::time::Instant;

use crate::config::ServiceSpec;
use crate::error::{Result, SupervisorError};
use crate::types::ServiceName;

/// Runtime state of one service's most recent launch attempt.
///
/// `pid` is present only while the process is believed alive; it is
/// cleared when the liveness check reports death or before a restart.
#[derive(Debug, Default)]
pub struct ProcessHandle {
    /// Pid of the running instance, if any.
    pub pid: Option<u32>,
    /// When the instance was last spawned.
    pub last_started: Option<Instant>,
}

impl ProcessHandle {
    /// Records a fresh spawn.
    pub fn record(&mut self, pid: u32) {
        self.pid = Some(pid);
        self.last_started = Some(Instant::now());
    }

    /// Forgets the process (death observed or restart pending).
    pub fn clear(&mut self) {
        self.pid = None;
    }
}

/// One registry row: launch spec plus runtime handle.
#[derive(Debug)]
pub struct ServiceEntry {
    /// Static launch specification.
    pub spec: ServiceSpec,
    /// Runtime state.
    pub handle: ProcessHandle,
}

/// Ordered `name → entry` table for the managed service set.
#[derive(Debug)]
pub struct ServiceRegistry {
    entries: Vec<ServiceEntry>,
}

impl ServiceRegistry {
    /// Builds the registry from the configured service table.
    ///
    /// # Errors
    /// Returns a configuration error on duplicate names.
    pub fn from_specs(specs: Vec<ServiceSpec>) -> Result<Self> {
        let mut entries: Vec<ServiceEntry> = Vec::with_capacity(specs.len());
        for spec in specs {
            if entries.iter().any(|e| e.spec.name == spec.name) {
                return Err(SupervisorError::config(format!(
                    "duplicate service: {}",
                    spec.name
                )));
            }
            entries.push(ServiceEntry {
                spec,
                handle: ProcessHandle::default(),
            });
        }
        Ok(Self { entries })
    }

    /// Looks up a service. Asking for a name outside the configured table
    /// is a programmer error and fails loudly.
    pub fn get(&self, name: ServiceName) -> Result<&ServiceEntry> {
        self.entries
            .iter()
            .find(|e| e.spec.name == name)
            .ok_or(SupervisorError::UnknownService(name))
    }

    /// Mutable lookup; same contract as [`get`](Self::get).
    pub fn get_mut(&mut self, name: ServiceName) -> Result<&mut ServiceEntry> {
        self.entries
            .iter_mut()
            .find(|e| e.spec.name == name)
            .ok_or(SupervisorError::UnknownService(name))
    }

    /// All service names in startup order.
    #[must_use]
    pub fn names(&self) -> Vec<ServiceName> {
        self.entries.iter().map(|e| e.spec.name).collect()
    }

    /// Names of monitored services, in order.
    #[must_use]
    pub fn monitored(&self) -> Vec<ServiceName> {
        self.entries
            .iter()
            .filter(|e| e.spec.monitored)
            .map(|e| e.spec.name)
            .collect()
    }

    /// Iterates entries in startup order.
    pub fn iter(&self) -> impl Iterator<Item = &ServiceEntry> {
        self.entries.iter()
    }

    /// Number of managed services.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SupervisorConfig;

    fn default_registry() -> ServiceRegistry {
        ServiceRegistry::from_specs(SupervisorConfig::default().services).unwrap()
    }

    #[test]
    fn test_order_preserved() {
        let registry = default_registry();
        assert_eq!(
            registry.names(),
            vec![ServiceName::Chrony, ServiceName::Dhcp, ServiceName::Tftp]
        );
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_monitored_subset() {
        let registry = default_registry();
        assert_eq!(
            registry.monitored(),
            vec![ServiceName::Dhcp, ServiceName::Tftp]
        );
    }

    #[test]
    fn test_unknown_name_is_loud() {
        let registry = default_registry();
        let err = registry.get(ServiceName::Firewalld).unwrap_err();
        assert!(matches!(
            err,
            SupervisorError::UnknownService(ServiceName::Firewalld)
        ));
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut specs = SupervisorConfig::default().services;
        specs.push(specs[0].clone());
        assert!(ServiceRegistry::from_specs(specs).is_err());
    }

    #[test]
    fn test_handle_lifecycle() {
        let mut registry = default_registry();
        let entry = registry.get_mut(ServiceName::Dhcp).unwrap();
        assert!(entry.handle.pid.is_none());
        assert!(entry.handle.last_started.is_none());

        entry.handle.record(1234);
        assert_eq!(entry.handle.pid, Some(1234));
        assert!(entry.handle.last_started.is_some());

        entry.handle.clear();
        assert!(entry.handle.pid.is_none());
        // last_started survives a clear: it records the launch attempt.
        assert!(entry.handle.last_started.is_some());
    }
}
