//! Core types for network-boot service supervision.
//!
//! The managed service set is closed: the supervisor knows exactly which
//! daemons it may be asked to run, so service identity is an enum rather
//! than a free-form string.

use serde::{Deserialize, Serialize};

/// Identity of a managed service.
///
/// Only [`Dhcp`](Self::Dhcp) and [`Tftp`](Self::Tftp) are monitored and
/// auto-restarted; the rest are auxiliary services started once at boot
/// and then left alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ServiceName {
    /// ISC DHCP server (`dhcpd`), serves PXE boot offers on UDP/67.
    Dhcp,
    /// TFTP server (`in.tftpd`), serves boot images on UDP/69.
    Tftp,
    /// Time synchronization (`chronyd`), auxiliary.
    Chrony,
    /// Firewall daemon, auxiliary.
    Firewalld,
    /// Foreman/Katello stack, auxiliary (managed externally, never polled).
    ForemanStack,
}

impl ServiceName {
    /// Canonical lowercase name, as used in configuration and logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Dhcp => "dhcp",
            Self::Tftp => "tftp",
            Self::Chrony => "chrony",
            Self::Firewalld => "firewalld",
            Self::ForemanStack => "foreman-stack",
        }
    }

    /// Returns true if this service is subject to liveness polling and
    /// automatic restart.
    #[must_use]
    pub const fn is_monitored(&self) -> bool {
        matches!(self, Self::Dhcp | Self::Tftp)
    }
}

impl std::fmt::Display for ServiceName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-tick liveness snapshot of the monitored pair.
///
/// Derived fresh each poll cycle and never persisted. The whole snapshot
/// is taken before any restart action runs, so the recovery decision for
/// a tick is based on a single consistent observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LivenessSnapshot {
    /// DHCP server process exists.
    pub dhcp: bool,
    /// TFTP server process exists.
    pub tftp: bool,
}

impl LivenessSnapshot {
    /// Both monitored services are up.
    #[must_use]
    pub const fn all_alive(&self) -> bool {
        self.dhcp && self.tftp
    }

    /// Both monitored services are down at once.
    #[must_use]
    pub const fn all_down(&self) -> bool {
        !self.dhcp && !self.tftp
    }
}

/// Recovery decision for one poll tick.
///
/// Produced by [`RecoveryPolicy::plan`](crate::policy::RecoveryPolicy::plan)
/// as a pure function of the liveness snapshot. A simultaneous double
/// failure gets the aggressive [`EmergencyReset`](Self::EmergencyReset)
/// path; a single failure gets a direct relaunch of that service only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryPlan {
    /// Nothing to do this tick.
    None,
    /// Re-launch exactly one service, leaving the other untouched.
    Relaunch(ServiceName),
    /// Both monitored services are down: kill lingering processes by
    /// name pattern, reset both pid files, settle, re-launch both.
    EmergencyReset,
}

impl RecoveryPlan {
    /// Returns true if the plan performs no process-table mutation.
    #[must_use]
    pub const fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Returns true if the plan re-launches the given service.
    #[must_use]
    pub fn restarts(&self, name: ServiceName) -> bool {
        match self {
            Self::None => false,
            Self::Relaunch(n) => *n == name,
            Self::EmergencyReset => name.is_monitored(),
        }
    }
}

/// Behavior at supervisor shutdown. An explicit configuration choice,
/// never an accident of process-group inheritance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum OnExitPolicy {
    /// Leave the daemons running when the supervisor exits.
    #[default]
    Detach,
    /// Send SIGTERM to every recorded pid before exiting.
    Terminate,
}
