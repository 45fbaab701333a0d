//! The contract between the bootstrapper and a pluggable application.

use std::fmt;

use keeper_config::LayoutProvider;
use thiserror::Error;

use crate::boundary::ExecutionBoundary;

/// Lifecycle hooks implemented by a pluggable application.
///
/// The bootstrapper drives an instance through `init`, `start`, `stop` and
/// `destroy` exactly once each, in that order. Every call receives the
/// [`PhaseContext`] describing the execution boundary the application was
/// resolved from, so applications look up their own collaborators there
/// instead of relying on ambient state.
pub trait DaemonApplication: Send {
    /// Prepares the application using the installation layout and arguments.
    fn init(&mut self, context: &PhaseContext<'_>, args: &[String]) -> Result<(), ApplicationError>;

    /// Starts serving. Must return once the application is running.
    fn start(&mut self, context: &PhaseContext<'_>) -> Result<(), ApplicationError>;

    /// Stops serving.
    fn stop(&mut self, context: &PhaseContext<'_>, args: &[String]) -> Result<(), ApplicationError>;

    /// Releases every resource held by the application.
    fn destroy(&mut self, context: &PhaseContext<'_>) -> Result<(), ApplicationError>;
}

/// Borrowed view of the environment handed to each lifecycle hook.
#[derive(Clone, Copy)]
pub struct PhaseContext<'a> {
    boundary: &'a ExecutionBoundary,
    layout: &'a dyn LayoutProvider,
}

impl<'a> PhaseContext<'a> {
    /// Builds a context for one phase invocation.
    #[must_use]
    pub fn new(boundary: &'a ExecutionBoundary, layout: &'a dyn LayoutProvider) -> Self {
        Self { boundary, layout }
    }

    /// Boundary active for this invocation.
    #[must_use]
    pub fn boundary(&self) -> &'a ExecutionBoundary {
        self.boundary
    }

    /// Installation layout.
    #[must_use]
    pub fn layout(&self) -> &'a dyn LayoutProvider {
        self.layout
    }
}

impl fmt::Debug for PhaseContext<'_> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("PhaseContext")
            .field("boundary", &self.boundary.label())
            .field("home", &self.layout.home_dir())
            .finish()
    }
}

/// Failure raised by an application hook or factory.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ApplicationError {
    message: String,
}

impl ApplicationError {
    /// Builds an error from a human-readable message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
