//! Loopback listener that blocks until the shutdown token arrives.

use std::io;
use std::net::{Ipv4Addr, Shutdown, SocketAddr, TcpListener, TcpStream};
use std::path::Path;
use std::time::Duration;

use keeper_config::{CoordinationFile, DEFAULT_SHUTDOWN_BASE_PORT};
use rand::rngs::StdRng;
use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use tracing::{debug, info, warn};

use super::SHUTDOWN_TARGET;
use super::cleanup::{CoordinationGuard, TerminationCleanup};
use super::command::{budget_rng, byte_budget, is_transient_accept_error, read_command};
use super::errors::ShutdownError;

/// Read timeout applied to every accepted connection.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(10);

const LISTEN_BACKLOG: i32 = 1;

/// Tunables for the shutdown listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownSettings {
    base_port: u16,
    read_timeout: Duration,
}

impl ShutdownSettings {
    /// Settings with an explicit base port. `0` lets the OS pick a port.
    #[must_use]
    pub fn with_base_port(mut self, base_port: u16) -> Self {
        self.base_port = base_port;
        self
    }

    /// Settings with an explicit per-connection read timeout.
    #[must_use]
    pub fn with_read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = read_timeout;
        self
    }

    /// First port tried when searching for a free one.
    #[must_use]
    pub fn base_port(&self) -> u16 {
        self.base_port
    }

    /// Per-connection read timeout.
    #[must_use]
    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }
}

impl Default for ShutdownSettings {
    fn default() -> Self {
        Self {
            base_port: DEFAULT_SHUTDOWN_BASE_PORT,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }
}

/// Outcome of a completed wait.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShutdownReport {
    port: u16,
    rejected: Vec<String>,
}

impl ShutdownReport {
    /// Port the listener was bound to.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Commands received and rejected before the token arrived, in order.
    #[must_use]
    pub fn rejected(&self) -> &[String] {
        &self.rejected
    }
}

/// Bound shutdown listener with its coordination file in place.
///
/// Dropping the listener, whether or not [`Self::await_command`] ran, closes
/// the socket and removes the coordination file.
#[derive(Debug)]
pub struct ShutdownListener {
    listener: TcpListener,
    port: u16,
    read_timeout: Duration,
    rng: StdRng,
    guard: CoordinationGuard,
    _cleanup: Option<TerminationCleanup>,
}

impl ShutdownListener {
    /// Binds the first free loopback port at or above the base port and
    /// records it in the run directory's coordination file.
    ///
    /// A coordination file already present is stale and is replaced.
    pub fn bind(run_dir: &Path, settings: &ShutdownSettings) -> Result<Self, ShutdownError> {
        let coordination = CoordinationFile::in_run_dir(run_dir);
        if coordination.exists() {
            warn!(
                target: SHUTDOWN_TARGET,
                file = %coordination.path().display(),
                "shutdown port file already exists; server already running or previous exit was unclean"
            );
            coordination
                .remove()
                .map_err(|source| ShutdownError::Coordination { source })?;
        }

        let (listener, port) = bind_loopback(settings.base_port)?;
        coordination
            .write_port(port)
            .map_err(|source| ShutdownError::Coordination { source })?;
        let guard = CoordinationGuard::new(coordination.clone());
        let cleanup = match TerminationCleanup::install(coordination) {
            Ok(cleanup) => Some(cleanup),
            Err(error) => {
                warn!(
                    target: SHUTDOWN_TARGET,
                    error = %error,
                    "termination cleanup unavailable"
                );
                None
            }
        };
        info!(
            target: SHUTDOWN_TARGET,
            port,
            "shutdown listener bound"
        );
        Ok(Self {
            listener,
            port,
            read_timeout: settings.read_timeout,
            rng: budget_rng(),
            guard,
            _cleanup: cleanup,
        })
    }

    /// Binds and waits in one step.
    pub fn listen(run_dir: &Path, settings: &ShutdownSettings) -> Result<ShutdownReport, ShutdownError> {
        Self::bind(run_dir, settings)?.await_command()
    }

    /// Port the listener is bound to.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Accepts connections one at a time until one carries the shutdown
    /// token. Rejected commands are logged and the wait continues.
    pub fn await_command(mut self) -> Result<ShutdownReport, ShutdownError> {
        let mut rejected = Vec::new();
        loop {
            match self.listener.accept() {
                Ok((stream, peer)) => {
                    let budget = byte_budget(&mut self.rng);
                    if self.handle_connection(stream, peer, budget, &mut rejected) {
                        break;
                    }
                }
                Err(error) if is_transient_accept_error(&error) => {
                    warn!(
                        target: SHUTDOWN_TARGET,
                        error = %error,
                        "transient accept failure; retrying"
                    );
                }
                Err(source) => {
                    return Err(ShutdownError::Accept {
                        port: self.port,
                        source,
                    });
                }
            }
        }

        let Self {
            listener,
            port,
            guard,
            ..
        } = self;
        drop(listener);
        if let Err(error) = guard.release() {
            warn!(
                target: SHUTDOWN_TARGET,
                error = %error,
                "failed to remove coordination file"
            );
        }
        info!(
            target: SHUTDOWN_TARGET,
            port,
            rejected = rejected.len(),
            "shutdown command accepted"
        );
        Ok(ShutdownReport { port, rejected })
    }

    fn handle_connection(
        &self,
        stream: TcpStream,
        peer: SocketAddr,
        budget: usize,
        rejected: &mut Vec<String>,
    ) -> bool {
        if let Err(error) = stream.set_read_timeout(Some(self.read_timeout)) {
            debug!(
                target: SHUTDOWN_TARGET,
                error = %error,
                "failed to set read timeout"
            );
        }
        let received = read_command(&stream, budget);
        close_connection(&stream);
        drop(stream);

        if received.is_shutdown() {
            return true;
        }
        warn!(
            target: SHUTDOWN_TARGET,
            %peer,
            command = received.text(),
            termination = ?received.termination(),
            "rejected shutdown command"
        );
        rejected.push(received.into_text());
        false
    }
}

fn close_connection(stream: &TcpStream) {
    match stream.shutdown(Shutdown::Both) {
        Err(error) if error.kind() != io::ErrorKind::NotConnected => debug!(
            target: SHUTDOWN_TARGET,
            error = %error,
            "failed to close shutdown connection"
        ),
        _ => {}
    }
}

fn bind_loopback(base_port: u16) -> Result<(TcpListener, u16), ShutdownError> {
    if base_port == 0 {
        let listener = try_bind(0).map_err(|source| ShutdownError::Bind { port: 0, source })?;
        let port = listener
            .local_addr()
            .map_err(|source| ShutdownError::Bind { port: 0, source })?
            .port();
        return Ok((listener, port));
    }
    for port in base_port..=u16::MAX {
        match try_bind(port) {
            Ok(listener) => return Ok((listener, port)),
            Err(error) if is_port_taken(&error) => {
                debug!(target: SHUTDOWN_TARGET, port, "port in use; trying next");
            }
            Err(source) => return Err(ShutdownError::Bind { port, source }),
        }
    }
    Err(ShutdownError::NoAvailablePort { base_port })
}

fn try_bind(port: u16) -> io::Result<TcpListener> {
    let socket = Socket::new(Domain::IPV4, Type::STREAM, Some(Protocol::TCP))?;
    #[cfg(unix)]
    socket.set_reuse_address(true)?;
    let address = SockAddr::from(SocketAddr::from((Ipv4Addr::LOCALHOST, port)));
    socket.bind(&address)?;
    socket.listen(LISTEN_BACKLOG)?;
    Ok(socket.into())
}

fn is_port_taken(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::AddrInUse | io::ErrorKind::PermissionDenied
    )
}
