//! Temporary installation trees.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use keeper_config::{
    InstallationLayout, LIBRARY_EXTENSION, LayoutProvider, START_TYPE_KEY, STOP_TYPE_KEY,
};
use rstest::fixture;
use tempfile::TempDir;

/// Installation rooted in a temporary directory with a prepared skeleton.
pub struct TestInstallation {
    _dir: TempDir,
    layout: InstallationLayout,
}

impl TestInstallation {
    /// Creates the skeleton without a descriptor.
    #[must_use]
    pub fn empty() -> Self {
        let dir = TempDir::new().expect("create installation dir");
        let layout = InstallationLayout::new(dir.path().join("keeper"));
        layout.prepare().expect("prepare installation");
        Self { _dir: dir, layout }
    }

    /// Creates the skeleton and a descriptor naming the given types.
    #[must_use]
    pub fn with_types(start_type: &str, stop_type: &str) -> Self {
        let installation = Self::empty();
        installation.write_descriptor(&format!(
            "# generated for tests\n{START_TYPE_KEY}={start_type}\n{STOP_TYPE_KEY}={stop_type}\n"
        ));
        installation
    }

    /// Replaces the descriptor contents.
    pub fn write_descriptor(&self, content: &str) {
        fs::write(self.layout.bootstrap_configuration_file(), content).expect("write descriptor");
    }

    /// Creates an empty library artifact and returns its file name.
    pub fn add_library(&self, stem: &str) -> String {
        let name = format!("{stem}.{LIBRARY_EXTENSION}");
        fs::write(self.layout.library_dir().join(&name), b"").expect("write library");
        name
    }

    #[must_use]
    pub fn home(&self) -> &Path {
        self.layout.home_dir()
    }

    #[must_use]
    pub fn run_dir(&self) -> PathBuf {
        self.layout.run_dir()
    }

    #[must_use]
    pub fn layout(&self) -> Arc<dyn LayoutProvider> {
        Arc::new(self.layout.clone())
    }
}

/// Installation whose start and stop types are both `server`.
#[fixture]
pub fn installation() -> TestInstallation {
    TestInstallation::with_types("server", "server")
}
