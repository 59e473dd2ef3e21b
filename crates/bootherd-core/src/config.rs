//! Supervisor configuration.
//!
//! Configuration is validated at load time, with defaults that produce the
//! canonical network-boot table: `chrony` (auxiliary), `dhcp`, `tftp`.
//!
//! ```toml
//! poll_interval = "30s"
//! settle_delay = "2s"
//! restart_tftp = true
//! on_exit = "detach"
//!
//! [[services]]
//! name = "dhcp"
//! binary_path = "/usr/sbin/dhcpd"
//! args = ["-f", "-cf", "/etc/dhcp/dhcpd.conf"]
//! pid_file = "/var/run/dhcpd.pid"
//! monitored = true
//! config_file = "/etc/dhcp/dhcpd.conf"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SupervisorError};
use crate::types::{OnExitPolicy, ServiceName};

/// Static launch specification for one managed service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceSpec {
    /// Service identity (closed set).
    pub name: ServiceName,

    /// Path to the daemon binary.
    pub binary_path: PathBuf,

    /// Command-line arguments, in order.
    #[serde(default)]
    pub args: Vec<String>,

    /// Where the spawned pid is persisted.
    pub pid_file: PathBuf,

    /// Whether the service is polled and auto-restarted.
    #[serde(default)]
    pub monitored: bool,

    /// Substring matched against `/proc/*/cmdline` by the emergency
    /// recovery path. Defaults to the binary file name.
    #[serde(default)]
    pub match_pattern: Option<String>,

    /// Configuration file the daemon reads, if any. Checked (warn only)
    /// at startup; generating its content is someone else's job.
    #[serde(default)]
    pub config_file: Option<PathBuf>,
}

impl ServiceSpec {
    /// Creates a spec with required fields; the pid file defaults to
    /// `/var/run/<binary>.pid`.
    #[must_use]
    pub fn new(name: ServiceName, binary_path: impl Into<PathBuf>) -> Self {
        let binary_path = binary_path.into();
        let file_name = binary_path
            .file_name()
            .map_or_else(|| name.as_str().to_string(), |f| f.to_string_lossy().into_owned());
        Self {
            name,
            pid_file: PathBuf::from(format!("/var/run/{file_name}.pid")),
            binary_path,
            args: vec![],
            monitored: name.is_monitored(),
            match_pattern: None,
            config_file: None,
        }
    }

    /// Sets the launch arguments.
    #[must_use]
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the pid file path.
    #[must_use]
    pub fn with_pid_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.pid_file = path.into();
        self
    }

    /// Sets the daemon configuration file to check at startup.
    #[must_use]
    pub fn with_config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_file = Some(path.into());
        self
    }

    /// The cmdline pattern used by emergency kill-by-name. Falls back to
    /// the binary file name when not configured explicitly.
    #[must_use]
    pub fn pattern(&self) -> String {
        self.match_pattern.clone().unwrap_or_else(|| {
            self.binary_path
                .file_name()
                .map_or_else(|| self.name.as_str().to_string(), |f| f.to_string_lossy().into_owned())
        })
    }

    fn validate(&self) -> Result<()> {
        if self.binary_path.as_os_str().is_empty() {
            return Err(SupervisorError::config(format!(
                "{}: binary_path cannot be empty",
                self.name
            )));
        }
        if self.pid_file.as_os_str().is_empty() {
            return Err(SupervisorError::config(format!(
                "{}: pid_file cannot be empty",
                self.name
            )));
        }
        if self.monitored && !self.name.is_monitored() {
            return Err(SupervisorError::config(format!(
                "{}: only dhcp and tftp may be monitored",
                self.name
            )));
        }
        Ok(())
    }
}

/// Top-level supervisor configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupervisorConfig {
    /// Sleep between liveness polls.
    #[serde(default = "default_poll_interval")]
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,

    /// Pause after terminating an old process and before spawning its
    /// replacement, so the OS can release the bound port.
    #[serde(default = "default_settle_delay")]
    #[serde(with = "humantime_serde")]
    pub settle_delay: Duration,

    /// Whether a tftp-only failure triggers a restart. Some deployments
    /// prefer to leave a dead tftp alone; restarting is the default.
    #[serde(default = "default_true")]
    pub restart_tftp: bool,

    /// What to do with the daemons when the supervisor itself exits.
    #[serde(default)]
    pub on_exit: OnExitPolicy,

    /// The managed service table, in startup order.
    #[serde(default = "default_services")]
    pub services: Vec<ServiceSpec>,
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(30)
}

fn default_settle_delay() -> Duration {
    Duration::from_secs(2)
}

fn default_true() -> bool {
    true
}

fn default_services() -> Vec<ServiceSpec> {
    vec![
        ServiceSpec::new(ServiceName::Chrony, "/usr/sbin/chronyd")
            .with_pid_file("/var/run/bootherd-chronyd.pid"),
        ServiceSpec::new(ServiceName::Dhcp, "/usr/sbin/dhcpd")
            .with_args(["-f", "-cf", "/etc/dhcp/dhcpd.conf"])
            .with_pid_file("/var/run/dhcpd.pid")
            .with_config_file("/etc/dhcp/dhcpd.conf"),
        ServiceSpec::new(ServiceName::Tftp, "/usr/sbin/in.tftpd")
            .with_args(["-L", "-s", "/var/lib/tftpboot"])
            .with_pid_file("/var/run/in.tftpd.pid"),
    ]
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            poll_interval: default_poll_interval(),
            settle_delay: default_settle_delay(),
            restart_tftp: true,
            on_exit: OnExitPolicy::default(),
            services: default_services(),
        }
    }
}

impl SupervisorConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    /// Returns an error if the service table is empty, contains duplicate
    /// names, marks an auxiliary service as monitored, or lacks the
    /// monitored dhcp/tftp pair.
    pub fn validate(&self) -> Result<()> {
        if self.services.is_empty() {
            return Err(SupervisorError::config("no services defined"));
        }
        for spec in &self.services {
            spec.validate()?;
        }
        let mut seen = Vec::new();
        for spec in &self.services {
            if seen.contains(&spec.name) {
                return Err(SupervisorError::config(format!(
                    "duplicate service: {}",
                    spec.name
                )));
            }
            seen.push(spec.name);
        }
        for required in [ServiceName::Dhcp, ServiceName::Tftp] {
            let present = self
                .services
                .iter()
                .any(|s| s.name == required && s.monitored);
            if !present {
                return Err(SupervisorError::config(format!(
                    "monitored service {required} must be configured"
                )));
            }
        }
        Ok(())
    }

    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, parsed, or validated.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| SupervisorError::config(format!("failed to read config: {e}")))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| SupervisorError::config(format!("failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }
}

/// Serde helper for humantime durations.
mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    /// Serializes a duration as a human-readable string.
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    /// Deserializes a duration from a human-readable string.
    ///
    /// # Errors
    /// Returns an error if the string cannot be parsed.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}
