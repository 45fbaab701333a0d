use std::sync::atomic::{AtomicUsize, Ordering};

use crate::shutdown::{ShutdownError, ShutdownSignal};

/// Shutdown signal that releases the lifecycle immediately.
#[derive(Debug, Default)]
pub struct ImmediateShutdownSignal {
    waits: AtomicUsize,
}

impl ImmediateShutdownSignal {
    /// Number of times the lifecycle waited on this signal.
    pub fn waits(&self) -> usize {
        self.waits.load(Ordering::SeqCst)
    }
}

impl ShutdownSignal for &ImmediateShutdownSignal {
    fn wait(&self) -> Result<(), ShutdownError> {
        self.waits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
