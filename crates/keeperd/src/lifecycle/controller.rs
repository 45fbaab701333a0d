//! Sequencing of the application lifecycle phases.

use std::path::Path;
use std::sync::Arc;

use keeper_config::{ApplicationDescriptor, InstallationLayout, LayoutProvider};
use tracing::{debug, info};

use crate::application::{DaemonApplication, PhaseContext};
use crate::boundary::{ApplicationRegistry, ExecutionBoundary};
use crate::health::HealthReporter;

use super::errors::LifecycleError;
use super::state::{LifecycleState, Phase};

const LIFECYCLE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::lifecycle");

/// Instance a stop request is delivered to.
enum StopInstance {
    /// Start and stop types match; the start instance is reused.
    Shared,
    /// A separate instance built from the stop type.
    Dedicated {
        type_name: String,
        instance: Box<dyn DaemonApplication>,
    },
}

/// Drives a pluggable application through its lifecycle.
///
/// Each operation must be called in order exactly once. A failed phase
/// leaves the controller [`LifecycleState::Aborted`]; the caller decides how
/// to terminate.
pub struct LifecycleController {
    registry: Arc<ApplicationRegistry>,
    reporter: Arc<dyn HealthReporter>,
    state: LifecycleState,
    layout: Option<Arc<dyn LayoutProvider>>,
    descriptor: Option<ApplicationDescriptor>,
    caller_boundary: Option<Arc<ExecutionBoundary>>,
    boundary: Option<Arc<ExecutionBoundary>>,
    start_instance: Option<Box<dyn DaemonApplication>>,
    stop_instance: Option<StopInstance>,
}

impl LifecycleController {
    /// Creates an unconfigured controller resolving types from `registry`.
    #[must_use]
    pub fn new(registry: Arc<ApplicationRegistry>, reporter: Arc<dyn HealthReporter>) -> Self {
        Self {
            registry,
            reporter,
            state: LifecycleState::Unconfigured,
            layout: None,
            descriptor: None,
            caller_boundary: None,
            boundary: None,
            start_instance: None,
            stop_instance: None,
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Boundary owned by the caller, as recorded by [`Self::bind_boundary`].
    ///
    /// Phase calls never replace it.
    #[must_use]
    pub fn active_boundary(&self) -> Option<&Arc<ExecutionBoundary>> {
        self.caller_boundary.as_ref()
    }

    /// Boundary every application hook runs in.
    #[must_use]
    pub fn application_boundary(&self) -> Option<&Arc<ExecutionBoundary>> {
        self.boundary.as_ref()
    }

    /// Layout resolved by [`Self::configure`].
    #[must_use]
    pub fn layout(&self) -> Option<&Arc<dyn LayoutProvider>> {
        self.layout.as_ref()
    }

    /// Descriptor loaded by [`Self::configure`].
    #[must_use]
    pub fn descriptor(&self) -> Option<&ApplicationDescriptor> {
        self.descriptor.as_ref()
    }

    /// Resolves the installation rooted at `installation_base` and loads its
    /// descriptor.
    pub fn configure(&mut self, installation_base: &Path) -> Result<(), LifecycleError> {
        self.configure_with(Arc::new(InstallationLayout::new(installation_base)))
    }

    /// Verifies `layout` and loads the descriptor it points at.
    ///
    /// Verification failures are reported but do not stop the phase.
    pub fn configure_with(&mut self, layout: Arc<dyn LayoutProvider>) -> Result<(), LifecycleError> {
        self.run_phase(Phase::Configure, move |controller| {
            if let Err(error) = layout.verify() {
                controller.reporter.verification_failed(&error);
            }
            let path = layout.bootstrap_configuration_file();
            let descriptor = ApplicationDescriptor::load(&path)
                .map_err(|source| LifecycleError::Configuration { path, source })?;
            info!(
                target: LIFECYCLE_TARGET,
                home = %layout.home_dir().display(),
                start_type = descriptor.start_type(),
                stop_type = descriptor.stop_type(),
                "application descriptor loaded"
            );
            controller.layout = Some(layout);
            controller.descriptor = Some(descriptor);
            Ok(())
        })
    }

    /// Builds the application boundary under `parent` from the layout's
    /// library artifacts.
    pub fn bind_boundary(&mut self, parent: Arc<ExecutionBoundary>) -> Result<(), LifecycleError> {
        self.run_phase(Phase::Bind, |controller| {
            let layout = controller.require_layout(Phase::Bind)?;
            let boundary = ExecutionBoundary::create(Arc::clone(&parent), layout.library_artifacts());
            controller.caller_boundary = Some(parent);
            controller.boundary = Some(Arc::new(boundary));
            Ok(())
        })
    }

    /// Resolves and instantiates the start type, then calls `init`.
    pub fn initialize_application(&mut self, args: &[String]) -> Result<(), LifecycleError> {
        self.run_phase(Phase::Init, |controller| {
            let (layout, boundary) = controller.require_bound(Phase::Init)?;
            let type_name = controller.require_descriptor(Phase::Init)?.start_type().to_owned();
            let mut instance = controller.instantiate(&boundary, &type_name)?;
            let context = PhaseContext::new(&boundary, layout.as_ref());
            debug!(target: LIFECYCLE_TARGET, args = ?args, "calling init");
            instance
                .init(&context, args)
                .map_err(|source| LifecycleError::Hook {
                    phase: Phase::Init,
                    type_name,
                    source,
                })?;
            controller.start_instance = Some(instance);
            Ok(())
        })
    }

    /// Calls `start` on the start instance.
    pub fn start_application(&mut self) -> Result<(), LifecycleError> {
        self.run_phase(Phase::Start, |controller| {
            let (layout, boundary) = controller.require_bound(Phase::Start)?;
            let type_name = controller.require_descriptor(Phase::Start)?.start_type().to_owned();
            let context = PhaseContext::new(&boundary, layout.as_ref());
            let state = controller.state;
            let instance = controller
                .start_instance
                .as_mut()
                .ok_or_else(|| out_of_order(Phase::Start, state))?;
            instance
                .start(&context)
                .map_err(|source| LifecycleError::Hook {
                    phase: Phase::Start,
                    type_name,
                    source,
                })
        })
    }

    /// Calls `stop`, reusing the start instance when the descriptor names the
    /// same type for both roles.
    pub fn stop_application(&mut self, args: &[String]) -> Result<(), LifecycleError> {
        self.run_phase(Phase::Stop, |controller| {
            let (layout, boundary) = controller.require_bound(Phase::Stop)?;
            let descriptor = controller.require_descriptor(Phase::Stop)?;
            let stop_instance = if descriptor.shares_instance() && controller.start_instance.is_some()
            {
                debug!(target: LIFECYCLE_TARGET, "reusing start instance for stop");
                StopInstance::Shared
            } else {
                let type_name = descriptor.stop_type().to_owned();
                let instance = controller.instantiate(&boundary, &type_name)?;
                StopInstance::Dedicated {
                    type_name,
                    instance,
                }
            };
            controller.stop_instance = Some(stop_instance);

            let context = PhaseContext::new(&boundary, layout.as_ref());
            let (type_name, instance) = controller.stop_target(Phase::Stop)?;
            debug!(target: LIFECYCLE_TARGET, args = ?args, "calling stop");
            instance
                .stop(&context, args)
                .map_err(|source| LifecycleError::Hook {
                    phase: Phase::Stop,
                    type_name,
                    source,
                })
        })
    }

    /// Calls `destroy` on the stop instance.
    pub fn destroy_application(&mut self) -> Result<(), LifecycleError> {
        self.run_phase(Phase::Destroy, |controller| {
            let (layout, boundary) = controller.require_bound(Phase::Destroy)?;
            let context = PhaseContext::new(&boundary, layout.as_ref());
            let (type_name, instance) = controller.stop_target(Phase::Destroy)?;
            instance
                .destroy(&context)
                .map_err(|source| LifecycleError::Hook {
                    phase: Phase::Destroy,
                    type_name,
                    source,
                })
        })
    }

    fn run_phase<F>(&mut self, phase: Phase, body: F) -> Result<(), LifecycleError>
    where
        F: FnOnce(&mut Self) -> Result<(), LifecycleError>,
    {
        if self.state != phase.required_state() {
            return Err(out_of_order(phase, self.state));
        }
        self.reporter.phase_starting(phase);
        match body(self) {
            Ok(()) => {
                self.state = phase.resulting_state();
                self.reporter.phase_completed(phase);
                Ok(())
            }
            Err(error) => {
                self.state = LifecycleState::Aborted;
                self.reporter.phase_failed(phase, &error);
                Err(error)
            }
        }
    }

    fn instantiate(
        &self,
        boundary: &ExecutionBoundary,
        type_name: &str,
    ) -> Result<Box<dyn DaemonApplication>, LifecycleError> {
        let resolution = boundary.resolve(type_name, &self.registry).ok_or_else(|| {
            LifecycleError::TypeNotFound {
                type_name: type_name.to_owned(),
            }
        })?;
        debug!(
            target: LIFECYCLE_TARGET,
            type_name,
            origin = ?resolution.origin(),
            "application type resolved"
        );
        resolution
            .application_type()
            .instantiate()
            .map_err(|source| LifecycleError::Instantiation {
                type_name: type_name.to_owned(),
                source,
            })
    }

    fn stop_target(
        &mut self,
        phase: Phase,
    ) -> Result<(String, &mut Box<dyn DaemonApplication>), LifecycleError> {
        let state = self.state;
        match self.stop_instance.as_mut() {
            Some(StopInstance::Dedicated {
                type_name,
                instance,
            }) => Ok((type_name.clone(), instance)),
            Some(StopInstance::Shared) => {
                let type_name = self
                    .descriptor
                    .as_ref()
                    .map(|descriptor| descriptor.start_type().to_owned())
                    .unwrap_or_default();
                let instance = self
                    .start_instance
                    .as_mut()
                    .ok_or_else(|| out_of_order(phase, state))?;
                Ok((type_name, instance))
            }
            None => Err(out_of_order(phase, state)),
        }
    }

    fn require_layout(&self, phase: Phase) -> Result<Arc<dyn LayoutProvider>, LifecycleError> {
        self.layout
            .clone()
            .ok_or_else(|| out_of_order(phase, self.state))
    }

    fn require_descriptor(&self, phase: Phase) -> Result<&ApplicationDescriptor, LifecycleError> {
        self.descriptor
            .as_ref()
            .ok_or_else(|| out_of_order(phase, self.state))
    }

    fn require_bound(
        &self,
        phase: Phase,
    ) -> Result<(Arc<dyn LayoutProvider>, Arc<ExecutionBoundary>), LifecycleError> {
        let layout = self.require_layout(phase)?;
        let boundary = self
            .boundary
            .clone()
            .ok_or_else(|| out_of_order(phase, self.state))?;
        Ok((layout, boundary))
    }
}

impl std::fmt::Debug for LifecycleController {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("LifecycleController")
            .field("state", &self.state)
            .field("descriptor", &self.descriptor)
            .field("boundary", &self.boundary.as_ref().map(|boundary| boundary.label()))
            .finish_non_exhaustive()
    }
}

fn out_of_order(phase: Phase, state: LifecycleState) -> LifecycleError {
    LifecycleError::OutOfOrder { phase, state }
}
