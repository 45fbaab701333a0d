mod errors;
mod guard;
pub(crate) mod launch;
mod status;

pub use errors::LaunchError;
pub use launch::{InstallationTarget, run_start, run_stop};
pub use status::{ServerStatus, run_status};

pub(crate) const PROCESS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::process");
