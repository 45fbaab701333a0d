//! Shared configuration surface for the Keeper bootstrapper.
//!
//! The daemon process and the short-lived `stop`/`status` invocations must
//! agree on where an installation keeps its descriptor, libraries and runtime
//! artefacts. This crate owns that agreement: the [`InstallationLayout`]
//! provider, the [`ApplicationDescriptor`] naming the pluggable application,
//! the shutdown [`CoordinationFile`], the pid and health [`RuntimeFiles`] and
//! the logging settings shared by every entry point.

mod coordination;
mod defaults;
mod descriptor;
mod files;
mod layout;
mod logging;
mod runtime;

pub use coordination::{
    CoordinationError, CoordinationFile, SHUTDOWN_COMMAND, SHUTDOWN_PORT_FILE,
};
pub use defaults::{
    DEFAULT_LOG_FILTER, DEFAULT_SHUTDOWN_BASE_PORT, HOME_ENV_VAR, LOG_FILTER_ENV_VAR,
    LOG_FORMAT_ENV_VAR, RUN_DIR_ENV_VAR, default_log_format,
};
pub use descriptor::{ApplicationDescriptor, DescriptorError, START_TYPE_KEY, STOP_TYPE_KEY};
pub use layout::{
    BOOTSTRAP_CONFIGURATION_FILE, InstallationLayout, LayoutError, LayoutProvider,
    LIBRARY_EXTENSION,
};
pub use logging::{LogFormat, LoggingSettings};
pub use runtime::{HEALTH_FILE, LOCK_FILE, PID_FILE, RuntimeFiles};
