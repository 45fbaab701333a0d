//! Reading a single administrative command from an accepted connection.

use std::io::{self, Read};
use std::time::{SystemTime, UNIX_EPOCH};

use keeper_config::SHUTDOWN_COMMAND;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Minimum number of bytes read from a connection before giving up.
pub(crate) const BASE_BYTE_BUDGET: usize = 1024;

/// Upper bound (exclusive) on the random slack added to the budget.
pub(crate) const MAX_BYTE_SLACK: usize = 1024;

/// How the read of a command ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Termination {
    /// A carriage return or line feed.
    LineEnd,
    /// Any other byte below the space character.
    ControlByte(u8),
    /// The peer closed its side.
    EndOfStream,
    /// The read timed out or failed.
    ReadFailed,
    /// The byte budget ran out.
    BudgetExhausted,
}

/// Bytes collected from one connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ReceivedCommand {
    text: String,
    termination: Termination,
}

impl ReceivedCommand {
    pub(crate) fn text(&self) -> &str {
        self.text.as_str()
    }

    pub(crate) fn into_text(self) -> String {
        self.text
    }

    pub(crate) fn termination(&self) -> Termination {
        self.termination
    }

    /// Whether the connection carried exactly the shutdown token.
    pub(crate) fn is_shutdown(&self) -> bool {
        self.text == SHUTDOWN_COMMAND
            && matches!(
                self.termination,
                Termination::LineEnd | Termination::EndOfStream | Termination::ReadFailed
            )
    }
}

/// Reads printable bytes until a control byte, the end of the stream, a read
/// failure, or `budget` bytes have been consumed.
pub(crate) fn read_command<R: Read>(reader: R, budget: usize) -> ReceivedCommand {
    let mut buffer = Vec::with_capacity(SHUTDOWN_COMMAND.len());
    let mut termination = None;
    for byte in reader.bytes().take(budget) {
        match byte {
            Ok(b'\r' | b'\n') => termination = Some(Termination::LineEnd),
            Ok(byte) if byte < b' ' => termination = Some(Termination::ControlByte(byte)),
            Ok(byte) => {
                buffer.push(byte);
                continue;
            }
            Err(_) => termination = Some(Termination::ReadFailed),
        }
        break;
    }
    let termination = termination.unwrap_or(if buffer.len() >= budget {
        Termination::BudgetExhausted
    } else {
        Termination::EndOfStream
    });
    ReceivedCommand {
        text: String::from_utf8_lossy(&buffer).into_owned(),
        termination,
    }
}

/// Generator for per-connection byte budgets, seeded from the clock.
pub(crate) fn budget_rng() -> StdRng {
    let seed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs() ^ u64::from(elapsed.subsec_nanos()))
        .unwrap_or_default();
    StdRng::seed_from_u64(seed)
}

/// Budget for the next connection: the base plus a random slack.
pub(crate) fn byte_budget(rng: &mut StdRng) -> usize {
    BASE_BYTE_BUDGET + rng.gen_range(0..MAX_BYTE_SLACK)
}

/// Accept failures that leave the listening socket usable.
pub(crate) fn is_transient_accept_error(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::Interrupted
            | io::ErrorKind::PermissionDenied
    )
}
