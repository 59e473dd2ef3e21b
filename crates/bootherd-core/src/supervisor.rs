//! The supervisor control loop.
//!
//! One task owns everything: start the service table in order, then poll.
//! Each tick takes a complete liveness snapshot of the monitored pair
//! before any restart action runs, feeds it to the recovery policy, and
//! applies the resulting plan. SIGTERM and SIGINT exit the loop at the
//! next wake point; what happens to the daemons then is a configuration
//! choice, not an accident.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::config::SupervisorConfig;
use crate::error::{Result, SupervisorError};
use crate::launcher::Launcher;
use crate::liveness::LivenessChecker;
use crate::policy::RecoveryPolicy;
use crate::process::ProcessController;
use crate::registry::ServiceRegistry;
use crate::types::{LivenessSnapshot, OnExitPolicy, RecoveryPlan, ServiceName};

/// Handle for requesting a clean shutdown from outside the loop.
#[derive(Clone, Debug)]
pub struct SupervisorHandle {
    shutdown_tx: mpsc::Sender<()>,
}

impl SupervisorHandle {
    /// Requests shutdown. The loop exits at its next wake point.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.try_send(());
    }
}

/// The top-level control loop.
pub struct Supervisor {
    poll_interval: Duration,
    settle_delay: Duration,
    on_exit: OnExitPolicy,
    policy: RecoveryPolicy,
    registry: ServiceRegistry,
    controller: Arc<dyn ProcessController>,
    launcher: Launcher,
    checker: LivenessChecker,
    shutdown_rx: Option<mpsc::Receiver<()>>,
    // Keeps the channel open even if every external handle is dropped.
    _shutdown_tx: mpsc::Sender<()>,
}

impl Supervisor {
    /// Builds a supervisor from validated configuration.
    ///
    /// # Errors
    /// Returns a configuration error if the config or service table is
    /// invalid.
    pub fn new(
        config: SupervisorConfig,
        controller: Arc<dyn ProcessController>,
    ) -> Result<(Self, SupervisorHandle)> {
        config.validate()?;
        let registry = ServiceRegistry::from_specs(config.services)?;
        let launcher = Launcher::new(Arc::clone(&controller), config.settle_delay);
        let checker = LivenessChecker::new(Arc::clone(&controller));
        let (shutdown_tx, shutdown_rx) = mpsc::channel(4);

        let handle = SupervisorHandle {
            shutdown_tx: shutdown_tx.clone(),
        };
        let supervisor = Self {
            poll_interval: config.poll_interval,
            settle_delay: config.settle_delay,
            on_exit: config.on_exit,
            policy: RecoveryPolicy::new(config.restart_tftp),
            registry,
            controller,
            launcher,
            checker,
            shutdown_rx: Some(shutdown_rx),
            _shutdown_tx: shutdown_tx,
        };
        Ok((supervisor, handle))
    }

    /// Runs the supervisor until a termination signal or a fatal error.
    ///
    /// # Errors
    /// Returns a fatal error (unusable pid-file directory) or a signal
    /// installation failure; everything else is logged and retried.
    pub async fn run(&mut self) -> Result<()> {
        use tokio::signal::unix::{SignalKind, signal};

        let mut shutdown_rx = self
            .shutdown_rx
            .take()
            .ok_or_else(|| SupervisorError::Signal("supervisor already ran".to_string()))?;

        let mut sigterm = signal(SignalKind::terminate())
            .map_err(|e| SupervisorError::Signal(e.to_string()))?;
        let mut sigint = signal(SignalKind::interrupt())
            .map_err(|e| SupervisorError::Signal(e.to_string()))?;

        self.start_all().await?;

        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick fires immediately; the services were just
        // started, so consume it and begin polling one interval later.
        ticker.tick().await;

        tracing::info!(interval = ?self.poll_interval, "entering poll loop");
        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    tracing::info!("shutdown requested");
                    break;
                }
                _ = sigterm.recv() => {
                    tracing::info!("received SIGTERM");
                    break;
                }
                _ = sigint.recv() => {
                    tracing::info!("received SIGINT");
                    break;
                }
                _ = ticker.tick() => {
                    self.tick().await?;
                }
            }
        }

        self.finish().await
    }

    /// Startup sequencing: every configured service in table order,
    /// auxiliaries first by convention of the default table. Nothing here
    /// aborts startup except a fatal pid-file error; a monitored service
    /// that fails to start is picked up by the first poll tick.
    pub(crate) async fn start_all(&mut self) -> Result<()> {
        for name in self.registry.names() {
            {
                let entry = self.registry.get(name)?;
                if !entry.spec.binary_path.exists() {
                    tracing::warn!(service = %name, path = %entry.spec.binary_path.display(),
                        "binary not found");
                }
                if let Some(config_file) = &entry.spec.config_file {
                    if !config_file.exists() {
                        tracing::warn!(service = %name, path = %config_file.display(),
                            "daemon config file not found");
                    }
                }
            }
            let entry = self.registry.get_mut(name)?;
            let monitored = entry.spec.monitored;
            match self.launcher.launch(entry).await {
                Ok(()) => {}
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) if monitored => {
                    tracing::error!(service = %name, error = %e,
                        "monitored service failed to start; poll loop will retry");
                }
                Err(e) => {
                    tracing::warn!(service = %name, error = %e,
                        "auxiliary service failed to start");
                }
            }
        }
        Ok(())
    }

    /// One poll cycle: snapshot, decide, act.
    pub(crate) async fn tick(&mut self) -> Result<()> {
        let snapshot = self.observe().await?;
        let plan = self.policy.plan(snapshot);
        if !plan.is_none() {
            tracing::warn!(dhcp = snapshot.dhcp, tftp = snapshot.tftp, plan = ?plan,
                "recovery needed");
        }
        self.apply(plan).await
    }

    /// Takes the liveness snapshot for this tick. All monitored services
    /// are checked before any action runs, so the plan is computed from a
    /// consistent observation.
    pub(crate) async fn observe(&mut self) -> Result<LivenessSnapshot> {
        let dhcp = self.check(ServiceName::Dhcp).await?;
        let tftp = self.check(ServiceName::Tftp).await?;
        Ok(LivenessSnapshot { dhcp, tftp })
    }

    async fn check(&mut self, name: ServiceName) -> Result<bool> {
        let entry = self.registry.get_mut(name)?;
        match self.checker.is_alive(entry).await {
            Ok(alive) => Ok(alive),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                // An uncertain probe must not trigger a restart.
                tracing::warn!(service = %name, error = %e,
                    "liveness probe failed; treating as alive this tick");
                Ok(true)
            }
        }
    }

    /// Applies a recovery plan.
    pub(crate) async fn apply(&mut self, plan: RecoveryPlan) -> Result<()> {
        match plan {
            RecoveryPlan::None => Ok(()),
            RecoveryPlan::Relaunch(name) => self.relaunch(name).await,
            RecoveryPlan::EmergencyReset => self.emergency_reset().await,
        }
    }

    async fn relaunch(&mut self, name: ServiceName) -> Result<()> {
        let entry = self.registry.get_mut(name)?;
        match self.launcher.launch(entry).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                tracing::error!(service = %name, error = %e,
                    "relaunch failed; will retry next tick");
                Ok(())
            }
        }
    }

    /// The aggressive both-down path: kill lingering processes by exact
    /// recorded pid and then by cmdline pattern, reset both pid files,
    /// settle once, re-launch both.
    async fn emergency_reset(&mut self) -> Result<()> {
        let monitored = self.registry.monitored();

        for name in monitored.iter().copied() {
            let entry = self.registry.get_mut(name)?;
            let pattern = entry.spec.pattern();
            self.launcher.prepare(entry).await?;
            match self.controller.kill_matching(&pattern).await {
                Ok(0) => {}
                Ok(count) => {
                    tracing::info!(service = %name, count, "killed lingering processes");
                }
                Err(e) => {
                    tracing::warn!(service = %name, error = %e, "pattern kill failed");
                }
            }
        }

        tokio::time::sleep(self.settle_delay).await;

        for name in monitored {
            let entry = self.registry.get_mut(name)?;
            match self.launcher.spawn_and_record(entry).await {
                Ok(()) => {}
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    tracing::error!(service = %name, error = %e,
                        "relaunch failed; will retry next tick");
                }
            }
        }
        Ok(())
    }

    /// Shutdown behavior, per the configured [`OnExitPolicy`].
    async fn finish(&mut self) -> Result<()> {
        match self.on_exit {
            OnExitPolicy::Detach => {
                tracing::info!("exiting; managed daemons left running");
            }
            OnExitPolicy::Terminate => {
                for name in self.registry.names() {
                    let entry = self.registry.get_mut(name)?;
                    let Some(pid) = entry.handle.pid.take() else {
                        continue;
                    };
                    if let Err(e) = self.controller.terminate(pid).await {
                        tracing::warn!(service = %name, pid, error = %e,
                            "failed to terminate on shutdown");
                    } else {
                        tracing::info!(service = %name, pid, "terminated on shutdown");
                    }
                }
            }
        }
        Ok(())
    }

    /// Read access to the registry, mostly for inspection in tests and
    /// status reporting.
    #[must_use]
    pub fn registry(&self) -> &ServiceRegistry {
        &self.registry
    }
}
