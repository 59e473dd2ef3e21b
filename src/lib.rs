//! Bootherd: supervisor for network-boot infrastructure daemons.
//!
//! Keeps DHCP and TFTP alive on a provisioning host. The engine lives in
//! [`bootherd_core`]; this crate re-exports it and ships the `bootherd`
//! binary.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use bootherd::prelude::*;
//! ```

pub use bootherd_core as core;

/// Prelude module for common imports.
pub mod prelude {
    pub use bootherd_core::{
        LivenessChecker, OnExitPolicy, ProcessController, RecoveryPlan, RecoveryPolicy, Result,
        ServiceName, ServiceSpec, Supervisor, SupervisorConfig, SupervisorError, SupervisorHandle,
    };
    #[cfg(unix)]
    pub use bootherd_core::UnixController;
}
