use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use keeper_config::RuntimeFiles;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::PROCESS_TARGET;
use super::errors::LaunchError;

/// Owns the startup lock, pid and health files for the lifetime of a running
/// server.
#[derive(Debug)]
pub(super) struct RuntimeGuard {
    files: RuntimeFiles,
    _lock: File,
    pid: Option<u32>,
}

impl RuntimeGuard {
    /// Prepares the run directory and takes the startup lock, refusing when a
    /// live server already holds it.
    pub(super) fn acquire(files: RuntimeFiles) -> Result<Self, LaunchError> {
        fs::create_dir_all(files.run_dir()).map_err(|source| LaunchError::RuntimeDirectory {
            path: files.run_dir().to_path_buf(),
            source,
        })?;
        let lock = acquire_lock(&files)?;
        Ok(Self {
            files,
            _lock: lock,
            pid: None,
        })
    }

    pub(super) fn write_pid(&mut self, pid: u32) -> Result<(), LaunchError> {
        let path = self.files.pid_path();
        let mut file = open_private(path).map_err(|source| LaunchError::PidWrite {
            path: path.to_path_buf(),
            source,
        })?;
        writeln!(file, "{pid}")
            .and_then(|()| file.sync_all())
            .map_err(|source| LaunchError::PidWrite {
                path: path.to_path_buf(),
                source,
            })?;
        self.pid = Some(pid);
        info!(
            target: PROCESS_TARGET,
            pid,
            file = %path.display(),
            "pid file written"
        );
        Ok(())
    }

    pub(super) fn write_health(&self, status: HealthState) -> Result<(), LaunchError> {
        let pid = self.pid.ok_or(LaunchError::MissingPid)?;
        let path = self.files.health_path();
        let snapshot = HealthSnapshot::new(status, pid)?;
        let mut payload = serde_json::to_vec(&snapshot)?;
        payload.push(b'\n');
        open_private(path)
            .and_then(|mut file| {
                file.write_all(&payload)?;
                file.sync_all()
            })
            .map_err(|source| LaunchError::HealthWrite {
                path: path.to_path_buf(),
                source,
            })?;
        info!(
            target: PROCESS_TARGET,
            status = %status,
            file = %path.display(),
            "health snapshot updated"
        );
        Ok(())
    }
}

impl Drop for RuntimeGuard {
    fn drop(&mut self) {
        for path in [
            self.files.pid_path(),
            self.files.health_path(),
            self.files.lock_path(),
        ] {
            match fs::remove_file(path) {
                Err(error) if error.kind() != io::ErrorKind::NotFound => {
                    warn!(
                        target: PROCESS_TARGET,
                        file = %path.display(),
                        error = %error,
                        "failed to remove runtime file"
                    );
                }
                _ => {}
            }
        }
    }
}

/// Coarse server state published in the health file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub(crate) enum HealthState {
    Starting,
    Ready,
    Stopping,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct HealthSnapshot {
    pub(crate) status: String,
    pub(crate) pid: u32,
    pub(crate) timestamp: u64,
}

impl HealthSnapshot {
    fn new(state: HealthState, pid: u32) -> Result<Self, LaunchError> {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|source| LaunchError::Clock { source })?
            .as_secs();
        Ok(Self {
            status: state.to_string(),
            pid,
            timestamp,
        })
    }
}

fn acquire_lock(files: &RuntimeFiles) -> Result<File, LaunchError> {
    let lock_path = files.lock_path();
    let file = match create_lock(lock_path) {
        Err(error) if error.kind() == io::ErrorKind::AlreadyExists => {
            reclaim_stale_lock(files)?;
            create_lock(lock_path)
        }
        other => other,
    };
    match file {
        Ok(file) => {
            info!(
                target: PROCESS_TARGET,
                file = %lock_path.display(),
                "acquired startup lock"
            );
            Ok(file)
        }
        Err(error) if error.kind() == io::ErrorKind::AlreadyExists => {
            Err(LaunchError::StartupInProgress {
                lock: lock_path.to_path_buf(),
            })
        }
        Err(source) => Err(LaunchError::LockCreate {
            path: lock_path.to_path_buf(),
            source,
        }),
    }
}

fn create_lock(path: &Path) -> io::Result<File> {
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    let written = writeln!(file, "{}", std::process::id()).and_then(|()| file.sync_all());
    if let Err(error) = written {
        let _ = fs::remove_file(path);
        return Err(error);
    }
    Ok(file)
}

fn reclaim_stale_lock(files: &RuntimeFiles) -> Result<(), LaunchError> {
    let Some(pid) = read_pid(files.lock_path()) else {
        return Err(LaunchError::StartupInProgress {
            lock: files.lock_path().to_path_buf(),
        });
    };
    if process_alive(pid)? {
        info!(
            target: PROCESS_TARGET,
            pid,
            "refusing to start: existing server alive"
        );
        return Err(LaunchError::AlreadyRunning { pid });
    }
    warn!(
        target: PROCESS_TARGET,
        pid,
        "existing server not detected; cleaning stale files"
    );
    remove_file(files.pid_path())?;
    remove_file(files.health_path())?;
    remove_file(files.lock_path())
}

fn open_private(path: &Path) -> io::Result<File> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    options.open(path)
}

pub(super) fn read_pid(path: &Path) -> Option<u32> {
    let content = fs::read_to_string(path).ok()?;
    content.trim().parse::<u32>().ok()
}

pub(super) fn read_health(path: &Path) -> Option<HealthSnapshot> {
    let content = fs::read_to_string(path).ok()?;
    serde_json::from_str(content.trim()).ok()
}

fn remove_file(path: &Path) -> Result<(), LaunchError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(LaunchError::Cleanup {
            path: path.to_path_buf(),
            source,
        }),
    }
}

#[cfg(unix)]
pub(super) fn process_alive(pid: u32) -> Result<bool, LaunchError> {
    use nix::errno::Errno;
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    let Ok(raw) = i32::try_from(pid) else {
        return Ok(false);
    };
    if raw == 0 {
        return Ok(false);
    }
    match kill(Pid::from_raw(raw), None) {
        Ok(()) | Err(Errno::EPERM) => Ok(true),
        Err(Errno::ESRCH) => Ok(false),
        Err(errno) => Err(LaunchError::CheckProcess { pid, source: errno }),
    }
}

#[cfg(not(unix))]
pub(super) fn process_alive(_pid: u32) -> Result<bool, LaunchError> {
    Ok(true)
}
