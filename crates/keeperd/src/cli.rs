//! Command-line interface definitions for `keeperd`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use keeper_config::{
    DEFAULT_LOG_FILTER, DEFAULT_SHUTDOWN_BASE_PORT, HOME_ENV_VAR, LOG_FILTER_ENV_VAR,
    LOG_FORMAT_ENV_VAR, LogFormat, LoggingSettings, RUN_DIR_ENV_VAR,
};

use crate::process::InstallationTarget;

/// Bootstraps a pluggable server application and controls its lifecycle.
#[derive(Parser, Debug)]
#[command(name = "keeperd", version, disable_help_subcommand = true)]
pub(crate) struct Cli {
    /// Log filter expression.
    #[arg(long, global = true, env = LOG_FILTER_ENV_VAR, default_value = DEFAULT_LOG_FILTER)]
    pub(crate) log_filter: String,
    /// Log output format.
    #[arg(long, global = true, env = LOG_FORMAT_ENV_VAR, default_value_t = LogFormat::Compact)]
    pub(crate) log_format: LogFormat,
    #[command(subcommand)]
    pub(crate) command: CliCommand,
}

impl Cli {
    pub(crate) fn logging(&self) -> LoggingSettings {
        LoggingSettings::new(self.log_filter.clone(), self.log_format)
    }
}

#[derive(Subcommand, Debug)]
pub(crate) enum CliCommand {
    /// Runs the server in the foreground until a shutdown command arrives.
    Start(StartArgs),
    /// Sends the shutdown command to a running server.
    Stop(StopArgs),
    /// Reports whether a server is running.
    Status(InstallationArgs),
}

#[derive(Args, Debug)]
pub(crate) struct InstallationArgs {
    /// Installation base directory.
    #[arg(long, env = HOME_ENV_VAR)]
    pub(crate) home: PathBuf,
    /// Directory for runtime files, defaulting to `<home>/run`.
    #[arg(long, env = RUN_DIR_ENV_VAR)]
    pub(crate) run_dir: Option<PathBuf>,
}

impl InstallationArgs {
    pub(crate) fn target(&self) -> InstallationTarget {
        InstallationTarget::new(&self.home).with_run_dir(self.run_dir.clone())
    }
}

#[derive(Args, Debug)]
pub(crate) struct StartArgs {
    #[command(flatten)]
    pub(crate) installation: InstallationArgs,
    /// First port tried for the shutdown listener; 0 picks any free port.
    #[arg(long, default_value_t = DEFAULT_SHUTDOWN_BASE_PORT)]
    pub(crate) shutdown_port: u16,
    /// Arguments handed to the application's `init` and `stop` hooks.
    #[arg(last = true, value_name = "ARG")]
    pub(crate) args: Vec<String>,
}

#[derive(Args, Debug)]
pub(crate) struct StopArgs {
    #[command(flatten)]
    pub(crate) installation: InstallationArgs,
    /// Shutdown port, read from the run directory when omitted.
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use clap::CommandFactory;
    use rstest::rstest;

    use super::*;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn start_collects_trailing_arguments() {
        let cli = Cli::try_parse_from([
            "keeperd",
            "start",
            "--home",
            "/opt/keeper",
            "--shutdown-port",
            "0",
            "--",
            "--verbose",
            "alpha",
        ])
        .expect("parse start");
        let CliCommand::Start(start) = cli.command else {
            panic!("expected start command");
        };
        assert_eq!(start.installation.home, Path::new("/opt/keeper"));
        assert_eq!(start.shutdown_port, 0);
        assert_eq!(start.args, vec!["--verbose".to_owned(), "alpha".to_owned()]);
    }

    #[rstest]
    #[case::json("json", LogFormat::Json)]
    #[case::compact("compact", LogFormat::Compact)]
    fn parses_log_formats(#[case] value: &str, #[case] expected: LogFormat) {
        let cli = Cli::try_parse_from([
            "keeperd",
            "--log-format",
            value,
            "status",
            "--home",
            "/opt/keeper",
        ])
        .expect("parse status");
        assert_eq!(cli.logging().format(), expected);
    }

    #[test]
    fn stop_accepts_an_explicit_port() {
        let cli = Cli::try_parse_from([
            "keeperd",
            "stop",
            "--home",
            "/opt/keeper",
            "--run-dir",
            "/var/run/keeper",
            "--port",
            "30007",
        ])
        .expect("parse stop");
        let CliCommand::Stop(stop) = cli.command else {
            panic!("expected stop command");
        };
        assert_eq!(stop.port, Some(30007));
        assert_eq!(
            stop.installation.run_dir.as_deref(),
            Some(Path::new("/var/run/keeper"))
        );
    }
}
