//! The `bootherd` binary.
//!
//! Loads configuration, wires the OS process controller into the
//! supervisor, and runs until SIGTERM or SIGINT.
//!
//! Exit codes: 0 on clean shutdown, 1 on bad arguments, bad
//! configuration, or a runtime error, 2 on a fatal pid-file error.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use bootherd_core::config::SupervisorConfig;
use bootherd_core::process::{ProcessController, UnixController};
use bootherd_core::supervisor::Supervisor;

const USAGE: &str = "\
bootherd - supervisor for network-boot daemons (DHCP/TFTP)

USAGE:
    bootherd [OPTIONS]

OPTIONS:
    -c, --config <PATH>    Load configuration from a TOML file
                           (built-in service table is used otherwise)
    -h, --help             Print this help
    -V, --version          Print version
";

struct Args {
    config_path: Option<PathBuf>,
}

enum Parsed {
    Run(Args),
    Exit(ExitCode),
}

fn parse_args() -> Parsed {
    let mut config_path = None;
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-c" | "--config" => match args.next() {
                Some(path) => config_path = Some(PathBuf::from(path)),
                None => {
                    eprintln!("error: {arg} requires a path");
                    return Parsed::Exit(ExitCode::FAILURE);
                }
            },
            "-h" | "--help" => {
                print!("{USAGE}");
                return Parsed::Exit(ExitCode::SUCCESS);
            }
            "-V" | "--version" => {
                println!("bootherd {}", env!("CARGO_PKG_VERSION"));
                return Parsed::Exit(ExitCode::SUCCESS);
            }
            other => {
                eprintln!("error: unknown argument: {other}");
                eprint!("{USAGE}");
                return Parsed::Exit(ExitCode::FAILURE);
            }
        }
    }
    Parsed::Run(Args { config_path })
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = match parse_args() {
        Parsed::Run(args) => args,
        Parsed::Exit(code) => return code,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = match &args.config_path {
        Some(path) => match SupervisorConfig::load(path) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded configuration");
                config
            }
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "failed to load configuration");
                return ExitCode::FAILURE;
            }
        },
        None => SupervisorConfig::default(),
    };

    let controller: Arc<dyn ProcessController> = Arc::new(UnixController::new());
    let (mut supervisor, _handle) = match Supervisor::new(config, controller) {
        Ok(pair) => pair,
        Err(e) => {
            tracing::error!(error = %e, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "bootherd starting");
    match supervisor.run().await {
        Ok(()) => {
            tracing::info!("bootherd stopped");
            ExitCode::SUCCESS
        }
        Err(e) if e.is_fatal() => {
            tracing::error!(error = %e, "fatal error");
            ExitCode::from(2)
        }
        Err(e) => {
            tracing::error!(error = %e, "supervisor error");
            ExitCode::FAILURE
        }
    }
}
