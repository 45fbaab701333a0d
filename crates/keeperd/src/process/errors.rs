//! Defines the unified error surface for `keeperd` commands.

use std::io;
use std::path::PathBuf;
use std::time::SystemTimeError;

use thiserror::Error;

use crate::exit::ExitStatus;
use crate::lifecycle::LifecycleError;
use crate::shutdown::ShutdownError;
use crate::telemetry::TelemetryError;

/// Errors surfaced by the `start`, `stop` and `status` commands.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// A lifecycle phase failed.
    #[error("lifecycle failed: {source}")]
    Lifecycle {
        /// Underlying lifecycle error.
        #[source]
        source: LifecycleError,
    },
    /// The shutdown channel failed.
    #[error("shutdown channel failed: {source}")]
    Shutdown {
        /// Underlying shutdown error.
        #[source]
        source: ShutdownError,
    },
    /// Telemetry could not be installed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
    /// The run directory could not be created.
    #[error("failed to prepare run directory '{path}': {source}")]
    RuntimeDirectory {
        /// Directory that could not be created.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The startup lock could not be created.
    #[error("failed to create lock file '{path}': {source}")]
    LockCreate {
        /// Lock file path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Another launch holds the startup lock but has not recorded its pid.
    #[error("server launch already in progress (lock: '{lock}')")]
    StartupInProgress {
        /// Lock file held by the other launch.
        lock: PathBuf,
    },
    /// A live process already owns the run directory.
    #[error("server already running with pid {pid}")]
    AlreadyRunning {
        /// PID recorded in the existing lock file.
        pid: u32,
    },
    /// Removing a stale runtime artefact failed.
    #[error("failed to remove stale file '{path}': {source}")]
    Cleanup {
        /// Path of the artefact that could not be removed.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Writing the PID file failed.
    #[error("failed to write pid file '{path}': {source}")]
    PidWrite {
        /// PID file path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Writing the health snapshot failed.
    #[error("failed to write health snapshot '{path}': {source}")]
    HealthWrite {
        /// Health file path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Serialising the health snapshot failed.
    #[error("failed to serialise health snapshot: {source}")]
    HealthSerialise {
        /// Underlying serialisation error.
        #[from]
        source: serde_json::Error,
    },
    /// Obtaining the current timestamp failed.
    #[error("failed to read system time: {source}")]
    Clock {
        /// Underlying system time error.
        #[source]
        source: SystemTimeError,
    },
    /// Probing a recorded PID failed.
    #[cfg(unix)]
    #[error("failed to check process {pid}: {source}")]
    CheckProcess {
        /// PID that failed to probe.
        pid: u32,
        /// Underlying OS error.
        source: nix::errno::Errno,
    },
    /// Health updates were attempted before writing the PID file.
    #[error("pid must be written before updating health state")]
    MissingPid,
}

impl LaunchError {
    /// Process exit status for this failure.
    #[must_use]
    pub fn exit_status(&self) -> ExitStatus {
        match self {
            Self::Lifecycle { source } => source.exit_status(),
            Self::Shutdown { source } => source.exit_status(),
            _ => ExitStatus::Failure,
        }
    }
}

impl From<LifecycleError> for LaunchError {
    fn from(source: LifecycleError) -> Self {
        Self::Lifecycle { source }
    }
}

impl From<ShutdownError> for LaunchError {
    fn from(source: ShutdownError) -> Self {
        Self::Shutdown { source }
    }
}

impl From<TelemetryError> for LaunchError {
    fn from(source: TelemetryError) -> Self {
        Self::Telemetry { source }
    }
}
