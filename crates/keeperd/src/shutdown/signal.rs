use std::path::PathBuf;

use super::errors::ShutdownError;
use super::listener::{ShutdownListener, ShutdownSettings};

/// Blocks the lifecycle thread between `start` and `stop`.
pub trait ShutdownSignal: Send + Sync {
    /// Blocks until shutdown should proceed.
    fn wait(&self) -> Result<(), ShutdownError>;
}

/// Waits for the shutdown token on the loopback channel.
#[derive(Debug, Clone)]
pub struct CommandShutdownSignal {
    run_dir: PathBuf,
    settings: ShutdownSettings,
}

impl CommandShutdownSignal {
    /// Listens using the coordination file in `run_dir`.
    #[must_use]
    pub fn new(run_dir: PathBuf, settings: ShutdownSettings) -> Self {
        Self { run_dir, settings }
    }
}

impl ShutdownSignal for CommandShutdownSignal {
    fn wait(&self) -> Result<(), ShutdownError> {
        ShutdownListener::listen(&self.run_dir, &self.settings).map(|_| ())
    }
}
