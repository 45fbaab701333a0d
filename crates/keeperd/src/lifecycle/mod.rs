//! Lifecycle sequencing for the pluggable application.
//!
//! The controller moves through `configure`, `bind`, `init`, `start`, `stop`
//! and `destroy` in strict order. Each hook runs against the application
//! boundary passed explicitly in a [`PhaseContext`](crate::application::PhaseContext),
//! so the caller's boundary is never swapped out. Failures surface as typed
//! [`LifecycleError`] values and the process entry point maps them to exit
//! statuses.

mod controller;
mod errors;
mod state;

pub use controller::LifecycleController;
pub use errors::LifecycleError;
pub use state::{LifecycleState, Phase};
