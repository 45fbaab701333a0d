//! The `status` command: inspects the runtime files of an installation.

use std::fmt;

use keeper_config::{LayoutProvider, RuntimeFiles};

use crate::exit::ExitStatus;

use super::errors::LaunchError;
use super::guard::{process_alive, read_health, read_pid};
use super::launch::InstallationTarget;

/// What the run directory says about the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerStatus {
    /// A live process owns the run directory.
    Running {
        /// Recorded pid.
        pid: u32,
        /// Status from the health snapshot, when readable.
        health: Option<String>,
        /// Port recorded in the coordination file, when present.
        shutdown_port: Option<u16>,
    },
    /// A pid file names a process that no longer exists.
    Stale {
        /// Recorded pid.
        pid: u32,
    },
    /// No pid file.
    Stopped,
}

impl ServerStatus {
    /// Exit status reported by `keeperd status`.
    #[must_use]
    pub fn exit_status(&self) -> ExitStatus {
        match self {
            Self::Running { .. } => ExitStatus::Success,
            Self::Stale { .. } | Self::Stopped => ExitStatus::Failure,
        }
    }
}

impl fmt::Display for ServerStatus {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running {
                pid,
                health,
                shutdown_port,
            } => {
                write!(formatter, "running (pid {pid}")?;
                if let Some(health) = health {
                    write!(formatter, ", {health}")?;
                }
                if let Some(port) = shutdown_port {
                    write!(formatter, ", shutdown port {port}")?;
                }
                formatter.write_str(")")
            }
            Self::Stale { pid } => write!(formatter, "not running (stale pid {pid})"),
            Self::Stopped => formatter.write_str("not running"),
        }
    }
}

/// Reports the state of the server using `target`'s run directory.
pub fn run_status(target: &InstallationTarget) -> Result<ServerStatus, LaunchError> {
    let files = RuntimeFiles::in_run_dir(target.layout().run_dir());
    let Some(pid) = read_pid(files.pid_path()) else {
        return Ok(ServerStatus::Stopped);
    };
    if !process_alive(pid)? {
        return Ok(ServerStatus::Stale { pid });
    }
    let health = read_health(files.health_path()).map(|snapshot| snapshot.status);
    let shutdown_port = files.coordination().read_port().ok().flatten();
    Ok(ServerStatus::Running {
        pid,
        health,
        shutdown_port,
    })
}
