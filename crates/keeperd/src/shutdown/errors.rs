use std::io;
use std::path::PathBuf;

use keeper_config::CoordinationError;
use thiserror::Error;

use crate::exit::ExitStatus;

/// Errors raised by the shutdown listener and sender.
#[derive(Debug, Error)]
pub enum ShutdownError {
    /// The coordination file could not be cleared or written.
    #[error("failed to prepare the shutdown coordination file: {source}")]
    Coordination {
        #[source]
        source: CoordinationError,
    },
    /// Every loopback port at or above the base port is taken.
    #[error("no free loopback port at or above {base_port}")]
    NoAvailablePort { base_port: u16 },
    /// Binding the loopback listener failed for a reason other than the port
    /// being taken.
    #[error("failed to bind shutdown listener on 127.0.0.1:{port}: {source}")]
    Bind {
        port: u16,
        #[source]
        source: io::Error,
    },
    /// Accepting a connection failed with a non-transient error.
    #[error("shutdown listener on port {port} failed to accept: {source}")]
    Accept {
        port: u16,
        #[source]
        source: io::Error,
    },
    /// No coordination file exists, so no server is listening.
    #[error("server does not appear to be running: no shutdown port file at '{path}'")]
    NotRunning { path: PathBuf },
    /// The coordination file exists but could not be read.
    #[error("failed to read the shutdown port: {source}")]
    PortFile {
        #[source]
        source: CoordinationError,
    },
    /// Connecting to the listener failed.
    #[error("failed to connect to the shutdown listener on port {port}: {source}")]
    Connect {
        port: u16,
        #[source]
        source: io::Error,
    },
    /// Writing the command failed.
    #[error("failed to send the shutdown command to port {port}: {source}")]
    Send {
        port: u16,
        #[source]
        source: io::Error,
    },
}

impl ShutdownError {
    /// Process exit status for this failure.
    #[must_use]
    pub fn exit_status(&self) -> ExitStatus {
        match self {
            Self::Coordination { .. } | Self::NoAvailablePort { .. } | Self::Bind { .. } => {
                ExitStatus::ListenerSetup
            }
            Self::Accept { .. } => ExitStatus::Accept,
            Self::NotRunning { .. }
            | Self::PortFile { .. }
            | Self::Connect { .. }
            | Self::Send { .. } => ExitStatus::Failure,
        }
    }
}
