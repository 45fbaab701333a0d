//! Shared doubles and fixtures for the daemon test suites.

mod application;
mod install_tree;
mod reporter;
mod signal;

pub use application::{ApplicationProbe, Hook};
pub use install_tree::{TestInstallation, installation};
pub use reporter::{HealthEvent, RecordingHealthReporter};
pub use signal::ImmediateShutdownSignal;
