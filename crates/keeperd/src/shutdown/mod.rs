//! Local shutdown channel.
//!
//! A running daemon binds a loopback listener, records its port in the
//! `shutdownPort` coordination file and blocks until a connection delivers the
//! `SHUTDOWN` token. A separate `keeperd stop` invocation reads the port back
//! and sends the token. Any other payload is logged and ignored.

mod cleanup;
mod command;
mod errors;
mod listener;
mod sender;
mod signal;

pub use errors::ShutdownError;
pub use listener::{DEFAULT_READ_TIMEOUT, ShutdownListener, ShutdownReport, ShutdownSettings};
pub use sender::ShutdownClient;
pub use signal::{CommandShutdownSignal, ShutdownSignal};

pub(crate) const SHUTDOWN_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::shutdown");
