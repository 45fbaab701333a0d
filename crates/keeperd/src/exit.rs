//! Stable process exit statuses, one per fatal condition.

use std::process::ExitCode;

use strum::Display;

/// Exit status reported by the `keeperd` binary.
///
/// Operators script against these values, so each code is fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum ExitStatus {
    /// The command completed.
    #[strum(to_string = "success")]
    Success,
    /// A failure without a dedicated status, such as a stop request against
    /// an instance that is not running.
    #[strum(to_string = "failure")]
    Failure,
    /// The application descriptor could not be loaded.
    #[strum(to_string = "configuration load failed")]
    ConfigurationLoad,
    /// A named application type could not be resolved.
    #[strum(to_string = "type not found")]
    TypeLookup,
    /// An application type failed to construct an instance.
    #[strum(to_string = "instantiation failed")]
    Instantiation,
    /// The application's `init` hook failed.
    #[strum(to_string = "initialization failed")]
    Initialization,
    /// The application's `start` hook failed.
    #[strum(to_string = "start failed")]
    Start,
    /// The application's `stop` or `destroy` hook failed.
    #[strum(to_string = "stop failed")]
    Stop,
    /// The shutdown listener could not be established.
    #[strum(to_string = "shutdown listener setup failed")]
    ListenerSetup,
    /// The shutdown listener failed while accepting connections.
    #[strum(to_string = "shutdown listener accept failed")]
    Accept,
    /// The command line could not be parsed.
    #[strum(to_string = "usage error")]
    Usage,
}

impl ExitStatus {
    /// Numeric process exit code.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Success => 0,
            Self::Failure => 1,
            Self::ConfigurationLoad => 2,
            Self::TypeLookup => 3,
            Self::Instantiation => 4,
            Self::Initialization => 5,
            Self::Start => 6,
            Self::Stop => 7,
            Self::ListenerSetup => 8,
            Self::Accept => 9,
            Self::Usage => 64,
        }
    }
}

impl From<ExitStatus> for ExitCode {
    fn from(status: ExitStatus) -> Self {
        Self::from(status.code())
    }
}
