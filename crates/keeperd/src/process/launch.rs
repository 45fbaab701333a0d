//! Sequences the `start` and `stop` commands.

use std::path::PathBuf;
use std::sync::Arc;

use keeper_config::{InstallationLayout, LayoutProvider, RuntimeFiles};
use tracing::info;

use crate::boundary::{ApplicationRegistry, ExecutionBoundary};
use crate::health::{HealthReporter, StructuredHealthReporter};
use crate::lifecycle::LifecycleController;
use crate::shutdown::{CommandShutdownSignal, ShutdownClient, ShutdownSettings, ShutdownSignal};

use super::PROCESS_TARGET;
use super::errors::LaunchError;
use super::guard::{HealthState, RuntimeGuard};

/// Installation a command operates on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallationTarget {
    home: PathBuf,
    run_dir: Option<PathBuf>,
}

impl InstallationTarget {
    /// Targets the installation rooted at `home`.
    #[must_use]
    pub fn new(home: impl Into<PathBuf>) -> Self {
        Self {
            home: home.into(),
            run_dir: None,
        }
    }

    /// Overrides the run directory.
    #[must_use]
    pub fn with_run_dir(mut self, run_dir: Option<PathBuf>) -> Self {
        self.run_dir = run_dir;
        self
    }

    /// Layout described by this target.
    #[must_use]
    pub fn layout(&self) -> InstallationLayout {
        let layout = InstallationLayout::new(&self.home);
        match &self.run_dir {
            Some(run_dir) => layout.with_run_dir(run_dir),
            None => layout,
        }
    }
}

/// Service dependencies for the lifecycle.
pub(crate) struct ServiceDeps {
    pub(crate) registry: Arc<ApplicationRegistry>,
    pub(crate) reporter: Arc<dyn HealthReporter>,
}

/// Collaborators required to run a server.
pub(crate) struct LaunchPlan<S> {
    pub(crate) layout: Arc<dyn LayoutProvider>,
    pub(crate) services: ServiceDeps,
    pub(crate) shutdown: S,
    pub(crate) args: Vec<String>,
}

/// Runs a server in the foreground until the shutdown token arrives.
pub fn run_start(
    target: &InstallationTarget,
    settings: ShutdownSettings,
    args: Vec<String>,
    registry: Arc<ApplicationRegistry>,
) -> Result<(), LaunchError> {
    let layout = target.layout();
    let shutdown = CommandShutdownSignal::new(layout.run_dir(), settings);
    let plan = LaunchPlan {
        layout: Arc::new(layout),
        services: ServiceDeps {
            registry,
            reporter: Arc::new(StructuredHealthReporter::new()),
        },
        shutdown,
        args,
    };
    run_start_with(plan)
}

/// Runs the full lifecycle with injected collaborators.
pub(crate) fn run_start_with<S>(plan: LaunchPlan<S>) -> Result<(), LaunchError>
where
    S: ShutdownSignal,
{
    let LaunchPlan {
        layout,
        services,
        shutdown,
        args,
    } = plan;
    let ServiceDeps { registry, reporter } = services;

    info!(
        target: PROCESS_TARGET,
        home = %layout.home_dir().display(),
        "starting server"
    );
    let files = RuntimeFiles::from_layout(layout.as_ref());
    let mut controller = LifecycleController::new(registry, reporter);
    controller.configure_with(layout)?;

    let mut guard = RuntimeGuard::acquire(files)?;
    guard.write_pid(std::process::id())?;
    guard.write_health(HealthState::Starting)?;

    controller.bind_boundary(ExecutionBoundary::system())?;
    controller.initialize_application(&args)?;
    controller.start_application()?;
    guard.write_health(HealthState::Ready)?;

    shutdown.wait()?;

    guard.write_health(HealthState::Stopping)?;
    controller.stop_application(&args)?;
    controller.destroy_application()?;
    info!(
        target: PROCESS_TARGET,
        "shutdown sequence completed"
    );
    Ok(())
}

/// Asks the server running against `target` to shut down, returning the port
/// the token was sent to.
pub fn run_stop(target: &InstallationTarget, port: Option<u16>) -> Result<u16, LaunchError> {
    let client = ShutdownClient::new(&target.layout().run_dir());
    let client = match port {
        Some(port) => client.with_port(port),
        None => client,
    };
    Ok(client.send_shutdown_command()?)
}
