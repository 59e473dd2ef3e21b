//! Error types for bootherd-core.
//!
//! Almost nothing here is fatal to the supervisor itself: launch and probe
//! failures are logged and retried on the next poll tick. The one hard
//! exception is an unusable pid-file directory (permission denied, disk
//! full): continuing without pid persistence would mean supervising blind,
//! so those errors are classified fatal and terminate the process with a
//! distinct exit status.

use std::path::PathBuf;

use crate::types::ServiceName;

/// Result type alias for supervisor operations.
pub type Result<T> = std::result::Result<T, SupervisorError>;

/// Error type covering all supervisor failure modes.
#[derive(Debug, thiserror::Error)]
pub enum SupervisorError {
    /// Configuration error at load or validation time.
    #[error("configuration error: {0}")]
    Config(String),

    /// A service name was used that is not in the registry. Programmer
    /// error: the service table is fixed at startup.
    #[error("unknown service: {0}")]
    UnknownService(ServiceName),

    /// Spawning a service binary failed (missing binary, OS rejection).
    #[error("failed to launch {service}: {reason}")]
    Launch {
        /// The service that could not be started.
        service: ServiceName,
        /// What went wrong.
        reason: String,
    },

    /// A process-table probe failed for a reason other than "no such
    /// process".
    #[error("failed to probe pid {pid}: {reason}")]
    Probe {
        /// The pid that was probed.
        pid: u32,
        /// What went wrong.
        reason: String,
    },

    /// The pid-file directory is unusable. Fatal: see module docs.
    #[error("pid file {path} is unusable: {source}")]
    PidFile {
        /// The pid file that could not be read or written.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Signal handler installation failed.
    #[error("signal error: {0}")]
    Signal(String),

    /// Other I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SupervisorError {
    /// Creates a configuration error.
    #[must_use]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates a launch error for the given service.
    #[must_use]
    pub fn launch(service: ServiceName, reason: impl Into<String>) -> Self {
        Self::Launch {
            service,
            reason: reason.into(),
        }
    }

    /// Creates a probe error for the given pid.
    #[must_use]
    pub fn probe(pid: u32, reason: impl Into<String>) -> Self {
        Self::Probe {
            pid,
            reason: reason.into(),
        }
    }

    /// Returns true if the supervisor must exit rather than keep polling.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::PidFile { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SupervisorError::config("no services defined");
        assert_eq!(err.to_string(), "configuration error: no services defined");

        let err = SupervisorError::launch(ServiceName::Dhcp, "binary missing");
        assert_eq!(err.to_string(), "failed to launch dhcp: binary missing");
    }

    #[test]
    fn test_fatal_classification() {
        let err = SupervisorError::PidFile {
            path: PathBuf::from("/var/run/dhcpd.pid"),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        };
        assert!(err.is_fatal());

        assert!(!SupervisorError::launch(ServiceName::Tftp, "spawn rejected").is_fatal());
        assert!(!SupervisorError::probe(42, "EINVAL").is_fatal());
        assert!(!SupervisorError::config("bad").is_fatal());
    }

    #[test]
    fn test_unknown_service_display() {
        let err = SupervisorError::UnknownService(ServiceName::ForemanStack);
        assert_eq!(err.to_string(), "unknown service: foreman-stack");
    }
}
