//! The shutdown coordination file shared by the listener and the sender.
//!
//! The listening daemon records its shutdown port in `shutdownPort` under the
//! run directory. A later `stop` invocation reads the port back to locate the
//! listener. The file doubles as a presence marker: if it exists when a new
//! listener starts, the previous instance exited without cleaning up.

use std::fs;
use std::io;
use std::num::ParseIntError;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::files::{atomic_write, remove_if_present};

/// Command token accepted by the shutdown listener.
pub const SHUTDOWN_COMMAND: &str = "SHUTDOWN";

/// File name of the coordination file inside the run directory.
pub const SHUTDOWN_PORT_FILE: &str = "shutdownPort";

/// Errors raised while reading or writing the coordination file.
#[derive(Debug, Error)]
pub enum CoordinationError {
    /// Reading the file failed.
    #[error("failed to read shutdown port file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The file did not contain a decimal port number.
    #[error("shutdown port file '{path}' does not contain a valid port: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseIntError,
    },
    /// Writing the file failed.
    #[error("failed to write shutdown port file '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// Deleting the file failed.
    #[error("failed to remove shutdown port file '{path}': {source}")]
    Remove {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Location of the `shutdownPort` file for one run directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinationFile {
    path: PathBuf,
}

impl CoordinationFile {
    /// Coordination file inside the given run directory.
    #[must_use]
    pub fn in_run_dir(run_dir: &Path) -> Self {
        Self {
            path: run_dir.join(SHUTDOWN_PORT_FILE),
        }
    }

    /// Full path of the file.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    /// Whether the file is currently present.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Reads the recorded port, returning `None` when the file is absent.
    pub fn read_port(&self) -> Result<Option<u16>, CoordinationError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(CoordinationError::Read {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        let line = content.lines().next().unwrap_or_default();
        line.trim()
            .parse::<u16>()
            .map(Some)
            .map_err(|source| CoordinationError::Parse {
                path: self.path.clone(),
                source,
            })
    }

    /// Records the port as the sole line of the file.
    pub fn write_port(&self, port: u16) -> Result<(), CoordinationError> {
        atomic_write(&self.path, format!("{port}\n").as_bytes()).map_err(|source| {
            CoordinationError::Write {
                path: self.path.clone(),
                source,
            }
        })
    }

    /// Deletes the file, returning whether it was present.
    pub fn remove(&self) -> Result<bool, CoordinationError> {
        remove_if_present(&self.path).map_err(|source| CoordinationError::Remove {
            path: self.path.clone(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_port_through_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let file = CoordinationFile::in_run_dir(dir.path());
        file.write_port(30005).expect("write port");

        let content = fs::read_to_string(file.path()).expect("read file");
        assert_eq!(content, "30005\n");
        assert_eq!(file.read_port().expect("read port"), Some(30005));
    }

    #[test]
    fn missing_file_reads_as_none() {
        let dir = tempfile::tempdir().expect("temp dir");
        let file = CoordinationFile::in_run_dir(dir.path());
        assert!(!file.exists());
        assert_eq!(file.read_port().expect("read port"), None);
    }

    #[test]
    fn garbage_content_is_a_parse_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let file = CoordinationFile::in_run_dir(dir.path());
        fs::write(file.path(), "not-a-port\n").expect("write garbage");
        let error = file.read_port().expect_err("garbage should fail");
        assert!(matches!(error, CoordinationError::Parse { .. }));
    }

    #[test]
    fn write_creates_missing_run_directory() {
        let dir = tempfile::tempdir().expect("temp dir");
        let run_dir = dir.path().join("run");
        let file = CoordinationFile::in_run_dir(&run_dir);
        file.write_port(30003).expect("write port");
        assert!(file.exists());
    }

    #[test]
    fn remove_reports_presence() {
        let dir = tempfile::tempdir().expect("temp dir");
        let file = CoordinationFile::in_run_dir(dir.path());
        file.write_port(30003).expect("write port");
        assert!(file.remove().expect("first remove"));
        assert!(!file.remove().expect("second remove"));
    }
}
