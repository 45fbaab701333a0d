use crate::logging::LogFormat;

/// First port probed when the shutdown listener searches for a free port.
pub const DEFAULT_SHUTDOWN_BASE_PORT: u16 = 30003;

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Environment variable naming the installation base directory.
pub const HOME_ENV_VAR: &str = "KEEPER_HOME";

/// Environment variable overriding the run directory of an installation.
pub const RUN_DIR_ENV_VAR: &str = "KEEPER_RUN_DIR";

/// Environment variable carrying the log filter expression.
pub const LOG_FILTER_ENV_VAR: &str = "KEEPER_LOG_FILTER";

/// Environment variable selecting the log output format.
pub const LOG_FORMAT_ENV_VAR: &str = "KEEPER_LOG_FORMAT";

/// Default logging format for the binaries.
#[must_use]
pub fn default_log_format() -> LogFormat {
    LogFormat::Compact
}
