//! Applications shipped with the bootstrapper itself.

use tracing::info;

use crate::application::{ApplicationError, DaemonApplication, PhaseContext};
use crate::boundary::ApplicationRegistry;

/// System type name of [`IdleApplication`].
pub const IDLE_APPLICATION: &str = "idle";

const BUILTIN_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::builtin");

/// Application that serves nothing and simply waits to be stopped.
#[derive(Debug, Default)]
pub struct IdleApplication {
    args: Vec<String>,
}

impl DaemonApplication for IdleApplication {
    fn init(&mut self, context: &PhaseContext<'_>, args: &[String]) -> Result<(), ApplicationError> {
        self.args = args.to_vec();
        info!(
            target: BUILTIN_TARGET,
            home = %context.layout().home_dir().display(),
            boundary = context.boundary().label(),
            args = ?self.args,
            "idle application initialised"
        );
        Ok(())
    }

    fn start(&mut self, _context: &PhaseContext<'_>) -> Result<(), ApplicationError> {
        info!(target: BUILTIN_TARGET, "idle application started");
        Ok(())
    }

    fn stop(&mut self, _context: &PhaseContext<'_>, _args: &[String]) -> Result<(), ApplicationError> {
        info!(target: BUILTIN_TARGET, "idle application stopped");
        Ok(())
    }

    fn destroy(&mut self, _context: &PhaseContext<'_>) -> Result<(), ApplicationError> {
        self.args.clear();
        Ok(())
    }
}

/// Registry holding the applications shipped with `keeperd`.
#[must_use]
pub fn builtin_registry() -> ApplicationRegistry {
    let mut registry = ApplicationRegistry::new();
    registry.register_system(IDLE_APPLICATION, || Ok(Box::new(IdleApplication::default())));
    registry
}
