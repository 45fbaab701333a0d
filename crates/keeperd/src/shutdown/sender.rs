//! Client side of the shutdown channel, used by `keeperd stop`.

use std::io::{self, Write};
use std::net::{Ipv4Addr, Shutdown, SocketAddr, TcpStream};
use std::path::Path;
use std::time::Duration;

use keeper_config::{CoordinationFile, SHUTDOWN_COMMAND};
use tracing::{debug, info};

use super::SHUTDOWN_TARGET;
use super::errors::ShutdownError;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Sends the shutdown token to the listener recorded for a run directory.
#[derive(Debug, Clone)]
pub struct ShutdownClient {
    coordination: CoordinationFile,
    port: Option<u16>,
}

impl ShutdownClient {
    /// Client that discovers the port from `run_dir`'s coordination file.
    #[must_use]
    pub fn new(run_dir: &Path) -> Self {
        Self {
            coordination: CoordinationFile::in_run_dir(run_dir),
            port: None,
        }
    }

    /// Uses `port` instead of reading the coordination file.
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Connects to the listener and writes the token, returning the port
    /// used.
    ///
    /// Fails with [`ShutdownError::NotRunning`] before any connection attempt
    /// when the port is unknown and no coordination file exists.
    pub fn send_shutdown_command(&self) -> Result<u16, ShutdownError> {
        let port = self.resolve_port()?;
        let address = SocketAddr::from((Ipv4Addr::LOCALHOST, port));
        let mut stream = TcpStream::connect_timeout(&address, CONNECT_TIMEOUT)
            .map_err(|source| ShutdownError::Connect { port, source })?;
        let written = write_token(&mut stream);
        match stream.shutdown(Shutdown::Both) {
            Err(error) if error.kind() != io::ErrorKind::NotConnected => debug!(
                target: SHUTDOWN_TARGET,
                error = %error,
                "failed to shut down client socket"
            ),
            _ => {}
        }
        drop(stream);
        written.map_err(|source| ShutdownError::Send { port, source })?;
        info!(target: SHUTDOWN_TARGET, port, "shutdown command sent");
        Ok(port)
    }

    fn resolve_port(&self) -> Result<u16, ShutdownError> {
        if let Some(port) = self.port {
            return Ok(port);
        }
        self.coordination
            .read_port()
            .map_err(|source| ShutdownError::PortFile { source })?
            .ok_or_else(|| ShutdownError::NotRunning {
                path: self.coordination.path().to_path_buf(),
            })
    }
}

fn write_token(stream: &mut TcpStream) -> io::Result<()> {
    for byte in SHUTDOWN_COMMAND.bytes() {
        stream.write_all(&[byte])?;
    }
    stream.flush()
}
