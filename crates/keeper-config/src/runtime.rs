//! Derives runtime artefact paths shared by the daemon and `status` command.
//!
//! The run directory houses the startup lock, pid file and health snapshot
//! next to the shutdown coordination file, so every invocation against the same layout
//! agrees on where to look.

use std::path::{Path, PathBuf};

use crate::coordination::CoordinationFile;
use crate::layout::LayoutProvider;

/// File name of the lock guarding singleton startup.
pub const LOCK_FILE: &str = "server.lock";

/// File name of the process id file.
pub const PID_FILE: &str = "server.pid";

/// File name of the health snapshot.
pub const HEALTH_FILE: &str = "server.health";

/// Canonical paths for runtime artefacts written by the daemon.
#[derive(Debug, Clone)]
pub struct RuntimeFiles {
    run_dir: PathBuf,
    lock_path: PathBuf,
    pid_path: PathBuf,
    health_path: PathBuf,
    coordination: CoordinationFile,
}

impl RuntimeFiles {
    /// Derives runtime paths from an installation layout.
    #[must_use]
    pub fn from_layout(layout: &dyn LayoutProvider) -> Self {
        Self::in_run_dir(layout.run_dir())
    }

    /// Runtime paths inside an explicit run directory.
    #[must_use]
    pub fn in_run_dir(run_dir: PathBuf) -> Self {
        Self {
            lock_path: run_dir.join(LOCK_FILE),
            pid_path: run_dir.join(PID_FILE),
            health_path: run_dir.join(HEALTH_FILE),
            coordination: CoordinationFile::in_run_dir(&run_dir),
            run_dir,
        }
    }

    /// Directory holding runtime artefacts.
    #[must_use]
    pub fn run_dir(&self) -> &Path {
        self.run_dir.as_path()
    }

    /// Path to the lock file created exclusively by a starting server.
    #[must_use]
    pub fn lock_path(&self) -> &Path {
        self.lock_path.as_path()
    }

    /// Path to the pid file.
    #[must_use]
    pub fn pid_path(&self) -> &Path {
        self.pid_path.as_path()
    }

    /// Path to the health snapshot.
    #[must_use]
    pub fn health_path(&self) -> &Path {
        self.health_path.as_path()
    }

    /// The shutdown coordination file.
    #[must_use]
    pub fn coordination(&self) -> &CoordinationFile {
        &self.coordination
    }
}
