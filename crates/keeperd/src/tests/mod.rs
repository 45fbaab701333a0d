//! Test suites for the bootstrapper.

mod process_behaviour;
mod shutdown_behaviour;
mod support;
