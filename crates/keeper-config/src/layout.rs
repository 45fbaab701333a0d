//! Installation layout: where an installation keeps its configuration,
//! libraries and runtime artefacts.
//!
//! ```text
//! ${home}
//! |-- conf/keeper.conf
//! |-- lib/*.so
//! |   `-- ext/*.so
//! `-- run/
//! ```

use std::env::consts::DLL_EXTENSION;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// File name of the bootstrap descriptor inside the configuration directory.
pub const BOOTSTRAP_CONFIGURATION_FILE: &str = "keeper.conf";

/// Extension identifying library artifacts in the library directories.
pub const LIBRARY_EXTENSION: &str = DLL_EXTENSION;

const CONF_DIRNAME: &str = "conf";
const LIB_DIRNAME: &str = "lib";
const EXT_DIRNAME: &str = "ext";
const RUN_DIRNAME: &str = "run";

/// Errors raised while verifying or preparing an installation.
#[derive(Debug, Error)]
pub enum LayoutError {
    /// A required path does not exist.
    #[error("'{path}' does not exist")]
    Missing { path: PathBuf },
    /// A required directory is a file.
    #[error("'{path}' is a file when it should be a directory")]
    NotDirectory { path: PathBuf },
    /// A required file is a directory.
    #[error("'{path}' is a directory when it should be a file")]
    NotFile { path: PathBuf },
    /// A required directory is not writable by the current user.
    #[error("'{path}' is write protected from the current user")]
    NotWritable { path: PathBuf },
    /// A required file is not readable by the current user.
    #[error("'{path}' is not readable by the current user")]
    NotReadable { path: PathBuf },
    /// Creating a directory failed.
    #[error("failed to create directory '{path}': {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Supplies the paths an installation exposes to the bootstrapper.
pub trait LayoutProvider: Send + Sync {
    /// Root of the installation.
    fn home_dir(&self) -> &Path;

    /// Directory holding the descriptor and application configuration.
    fn configuration_dir(&self) -> PathBuf;

    /// Directory holding library artifacts.
    fn library_dir(&self) -> PathBuf;

    /// Directory holding runtime artefacts such as the coordination file.
    fn run_dir(&self) -> PathBuf;

    /// Path of the bootstrap descriptor.
    fn bootstrap_configuration_file(&self) -> PathBuf {
        self.configuration_dir().join(BOOTSTRAP_CONFIGURATION_FILE)
    }

    /// Library artifacts in lookup precedence order.
    fn library_artifacts(&self) -> Vec<PathBuf>;

    /// Checks that the expected directories and files are usable.
    fn verify(&self) -> Result<(), LayoutError>;
}

/// Default on-disk layout rooted at an installation base directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallationLayout {
    home: PathBuf,
    run_dir: Option<PathBuf>,
}

impl InstallationLayout {
    /// Layout rooted at `home`.
    #[must_use]
    pub fn new(home: impl Into<PathBuf>) -> Self {
        Self {
            home: home.into(),
            run_dir: None,
        }
    }

    /// Places runtime artefacts outside the installation tree.
    #[must_use]
    pub fn with_run_dir(mut self, run_dir: impl Into<PathBuf>) -> Self {
        self.run_dir = Some(run_dir.into());
        self
    }

    /// Directory scanned after the library directory.
    #[must_use]
    pub fn extensions_dir(&self) -> PathBuf {
        self.library_dir().join(EXT_DIRNAME)
    }

    /// Creates the directory skeleton of the installation.
    pub fn prepare(&self) -> Result<(), LayoutError> {
        for dir in self.required_dirs() {
            fs::create_dir_all(&dir).map_err(|source| LayoutError::Create { path: dir, source })?;
        }
        let ext = self.extensions_dir();
        fs::create_dir_all(&ext).map_err(|source| LayoutError::Create { path: ext, source })
    }

    fn required_dirs(&self) -> [PathBuf; 4] {
        [
            self.home.clone(),
            self.configuration_dir(),
            self.library_dir(),
            self.run_dir(),
        ]
    }
}

impl LayoutProvider for InstallationLayout {
    fn home_dir(&self) -> &Path {
        self.home.as_path()
    }

    fn configuration_dir(&self) -> PathBuf {
        self.home.join(CONF_DIRNAME)
    }

    fn library_dir(&self) -> PathBuf {
        self.home.join(LIB_DIRNAME)
    }

    fn run_dir(&self) -> PathBuf {
        self.run_dir
            .clone()
            .unwrap_or_else(|| self.home.join(RUN_DIRNAME))
    }

    fn library_artifacts(&self) -> Vec<PathBuf> {
        let mut artifacts = list_libraries(&self.library_dir());
        artifacts.extend(list_libraries(&self.extensions_dir()));
        artifacts
    }

    fn verify(&self) -> Result<(), LayoutError> {
        for dir in self.required_dirs() {
            verify_dir(&dir)?;
        }
        verify_file(&self.bootstrap_configuration_file())
    }
}

fn list_libraries(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut libraries: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| {
            path.extension()
                .is_some_and(|extension| extension == LIBRARY_EXTENSION)
        })
        .collect();
    libraries.sort();
    libraries
}

fn verify_dir(path: &Path) -> Result<(), LayoutError> {
    let metadata = fs::metadata(path).map_err(|_| LayoutError::Missing {
        path: path.to_path_buf(),
    })?;
    if !metadata.is_dir() {
        return Err(LayoutError::NotDirectory {
            path: path.to_path_buf(),
        });
    }
    if !is_writable(path, &metadata) {
        return Err(LayoutError::NotWritable {
            path: path.to_path_buf(),
        });
    }
    Ok(())
}

fn verify_file(path: &Path) -> Result<(), LayoutError> {
    let metadata = fs::metadata(path).map_err(|_| LayoutError::Missing {
        path: path.to_path_buf(),
    })?;
    if metadata.is_dir() {
        return Err(LayoutError::NotFile {
            path: path.to_path_buf(),
        });
    }
    if fs::File::open(path).is_err() {
        return Err(LayoutError::NotReadable {
            path: path.to_path_buf(),
        });
    }
    Ok(())
}

#[cfg(unix)]
fn is_writable(path: &Path, _metadata: &fs::Metadata) -> bool {
    use nix::unistd::{AccessFlags, access};

    access(path, AccessFlags::W_OK).is_ok()
}

#[cfg(not(unix))]
fn is_writable(_path: &Path, metadata: &fs::Metadata) -> bool {
    !metadata.permissions().readonly()
}
