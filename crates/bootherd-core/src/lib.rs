//! Core supervision engine for network-boot infrastructure daemons.
//!
//! Keeps a small fixed set of services (DHCP and TFTP, plus unmonitored
//! auxiliaries) running on a provisioning host: launch them in order,
//! poll their pid files for liveness, relaunch whichever died, and
//! escalate to a pattern-based emergency reset when both boot-critical
//! daemons are down at once.
//!
//! # Architecture
//!
//! - [`config`] for the TOML-loadable service table and tunables
//! - [`process`] for the [`process::ProcessController`] OS seam
//! - [`pidfile`] for plain-text pid file persistence
//! - [`registry`] for the ordered table of services and runtime handles
//! - [`launcher`] for the kill-settle-spawn-record launch sequence
//! - [`liveness`] for pid-file existence probing with stale-file cleanup
//! - [`policy`] for pure snapshot-to-plan recovery decisions
//! - [`supervisor`] for the control loop tying it all together
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use bootherd_core::config::SupervisorConfig;
//! use bootherd_core::process::UnixController;
//! use bootherd_core::supervisor::Supervisor;
//!
//! # async fn run() -> bootherd_core::error::Result<()> {
//! let config = SupervisorConfig::default();
//! let controller = Arc::new(UnixController::new());
//! let (mut supervisor, _handle) = Supervisor::new(config, controller)?;
//! supervisor.run().await
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::float_cmp
    )
)]

pub mod config;
pub mod error;
pub mod launcher;
pub mod liveness;
pub mod pidfile;
pub mod policy;
pub mod process;
pub mod registry;
pub mod supervisor;
pub mod types;

#[cfg(test)]
pub mod tests;

pub use config::{ServiceSpec, SupervisorConfig};
pub use error::{Result, SupervisorError};
pub use launcher::Launcher;
pub use liveness::LivenessChecker;
pub use policy::RecoveryPolicy;
pub use process::ProcessController;
#[cfg(unix)]
pub use process::UnixController;
pub use registry::{ProcessHandle, ServiceEntry, ServiceRegistry};
pub use supervisor::{Supervisor, SupervisorHandle};
pub use types::{LivenessSnapshot, OnExitPolicy, RecoveryPlan, ServiceName};
