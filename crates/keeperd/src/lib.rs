//! Bootstrapper and lifecycle controller for long-running server processes.
//!
//! `keeperd start` loads the application descriptor of an installation,
//! resolves the named application type inside an isolated
//! [`ExecutionBoundary`] built from the installation's libraries, and drives it
//! through `init` and `start`. The process then blocks on the local shutdown
//! channel until `keeperd stop`, run from another shell, delivers the
//! `SHUTDOWN` token over loopback; `stop` and `destroy` follow.
//!
//! Every fatal condition is a typed error carrying a stable [`ExitStatus`].
//! Only [`run`] turns those into a process exit code, so the lifecycle and the
//! shutdown channel can be exercised in-process.

use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use clap::error::ErrorKind;
use tracing::error;

mod application;
mod boundary;
mod builtin;
mod cli;
mod exit;
mod health;
mod lifecycle;
mod process;
mod shutdown;
mod telemetry;

pub use application::{ApplicationError, DaemonApplication, PhaseContext};
pub use boundary::{ApplicationRegistry, ApplicationType, ExecutionBoundary, Resolution};
pub use builtin::{IDLE_APPLICATION, IdleApplication, builtin_registry};
pub use exit::ExitStatus;
pub use health::{HealthReporter, StructuredHealthReporter};
pub use lifecycle::{LifecycleController, LifecycleError, LifecycleState, Phase};
pub use process::{
    InstallationTarget, LaunchError, ServerStatus, run_start, run_status, run_stop,
};
pub use shutdown::{
    CommandShutdownSignal, DEFAULT_READ_TIMEOUT, ShutdownClient, ShutdownError, ShutdownListener,
    ShutdownReport, ShutdownSettings, ShutdownSignal,
};
pub use telemetry::{TelemetryError, TelemetryHandle};

use cli::{Cli, CliCommand};
use process::PROCESS_TARGET;

/// Runs `keeperd` with the given arguments and application registry.
///
/// This is the only place a fatal error becomes a process exit code.
#[must_use]
pub fn run<I, W, E>(
    args: I,
    registry: ApplicationRegistry,
    stdout: &mut W,
    stderr: &mut E,
) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(error) => return report_usage(&error, stdout, stderr).into(),
    };
    if let Err(source) = telemetry::initialise(&cli.logging()) {
        let _ = writeln!(stderr, "{source}");
        return ExitStatus::Failure.into();
    }

    let status = match dispatch(cli.command, Arc::new(registry), stdout) {
        Ok(status) => status,
        Err(launch_error) => {
            let status = launch_error.exit_status();
            error!(
                target: PROCESS_TARGET,
                %status,
                code = status.code(),
                error = %launch_error,
                "keeperd failed"
            );
            let _ = writeln!(stderr, "{launch_error}");
            status
        }
    };
    status.into()
}

fn dispatch<W: Write>(
    command: CliCommand,
    registry: Arc<ApplicationRegistry>,
    stdout: &mut W,
) -> Result<ExitStatus, LaunchError> {
    match command {
        CliCommand::Start(start) => {
            let settings = ShutdownSettings::default().with_base_port(start.shutdown_port);
            run_start(&start.installation.target(), settings, start.args, registry)?;
            Ok(ExitStatus::Success)
        }
        CliCommand::Stop(stop) => {
            let port = run_stop(&stop.installation.target(), stop.port)?;
            let _ = writeln!(stdout, "shutdown command sent to port {port}");
            Ok(ExitStatus::Success)
        }
        CliCommand::Status(installation) => {
            let status = run_status(&installation.target())?;
            let _ = writeln!(stdout, "{status}");
            Ok(status.exit_status())
        }
    }
}

fn report_usage<W: Write, E: Write>(
    error: &clap::Error,
    stdout: &mut W,
    stderr: &mut E,
) -> ExitStatus {
    match error.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
            let _ = write!(stdout, "{error}");
            ExitStatus::Success
        }
        _ => {
            let _ = write!(stderr, "{error}");
            ExitStatus::Usage
        }
    }
}

#[cfg(test)]
mod tests;
