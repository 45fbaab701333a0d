//! Removal of the coordination file on every listener exit path.

#[cfg(not(unix))]
use std::io;

use keeper_config::{CoordinationError, CoordinationFile};
use tracing::{debug, warn};

use super::SHUTDOWN_TARGET;

/// Deletes the coordination file when dropped unless already released.
#[derive(Debug)]
pub(crate) struct CoordinationGuard {
    file: CoordinationFile,
    armed: bool,
}

impl CoordinationGuard {
    pub(crate) fn new(file: CoordinationFile) -> Self {
        Self { file, armed: true }
    }

    /// Deletes the file now, reporting whether it was still present.
    pub(crate) fn release(mut self) -> Result<bool, CoordinationError> {
        self.armed = false;
        self.file.remove()
    }
}

impl Drop for CoordinationGuard {
    fn drop(&mut self) {
        if self.armed {
            remove_quietly(&self.file);
        }
    }
}

fn remove_quietly(file: &CoordinationFile) {
    match file.remove() {
        Ok(true) => debug!(
            target: SHUTDOWN_TARGET,
            file = %file.path().display(),
            "coordination file removed"
        ),
        Ok(false) => {}
        Err(error) => warn!(
            target: SHUTDOWN_TARGET,
            error = %error,
            "failed to remove coordination file"
        ),
    }
}

#[cfg(unix)]
mod termination {
    use std::collections::HashMap;
    use std::io;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
    use std::thread;

    use keeper_config::CoordinationFile;
    use once_cell::sync::OnceCell;
    use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGQUIT, SIGTERM};
    use signal_hook::iterator::Signals;
    use signal_hook::low_level::emulate_default_handler;
    use tracing::{info, warn};

    use super::{SHUTDOWN_TARGET, remove_quietly};

    type Registered = Arc<Mutex<HashMap<u64, CoordinationFile>>>;

    /// Process-wide thread owning the termination signals.
    ///
    /// The signal handlers stay installed for the rest of the process once
    /// spawned, so every delivery ends with the signal's default effect,
    /// whether or not a coordination file is registered at the time.
    struct Dispatcher {
        registered: Registered,
        next_id: AtomicU64,
    }

    static DISPATCHER: OnceCell<Dispatcher> = OnceCell::new();

    impl Dispatcher {
        fn spawn() -> io::Result<Self> {
            let mut signals = Signals::new([SIGTERM, SIGINT, SIGQUIT, SIGHUP])?;
            let registered = Registered::default();
            let files = Arc::clone(&registered);
            thread::Builder::new()
                .name("keeperd-termination-cleanup".to_owned())
                .spawn(move || {
                    for signal in signals.forever() {
                        terminate(&files, signal);
                    }
                })?;
            Ok(Self {
                registered,
                next_id: AtomicU64::new(0),
            })
        }
    }

    fn lock(
        registered: &Mutex<HashMap<u64, CoordinationFile>>,
    ) -> MutexGuard<'_, HashMap<u64, CoordinationFile>> {
        registered.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn terminate(registered: &Mutex<HashMap<u64, CoordinationFile>>, signal: i32) {
        let files: Vec<CoordinationFile> = lock(registered).drain().map(|(_, file)| file).collect();
        info!(
            target: SHUTDOWN_TARGET,
            signal,
            files = files.len(),
            "termination signal received"
        );
        for file in &files {
            remove_quietly(file);
        }
        if let Err(error) = emulate_default_handler(signal) {
            warn!(
                target: SHUTDOWN_TARGET,
                signal,
                error = %error,
                "failed to re-raise termination signal"
            );
        }
    }

    /// Registration of a coordination file for removal when a termination
    /// signal arrives. Dropping it withdraws the file; the signal keeps its
    /// default effect.
    #[derive(Debug)]
    pub(crate) struct TerminationCleanup {
        id: u64,
    }

    impl TerminationCleanup {
        pub(crate) fn install(file: CoordinationFile) -> io::Result<Self> {
            let dispatcher = DISPATCHER.get_or_try_init(Dispatcher::spawn)?;
            let id = dispatcher.next_id.fetch_add(1, Ordering::Relaxed);
            lock(&dispatcher.registered).insert(id, file);
            Ok(Self { id })
        }

        #[cfg(test)]
        pub(crate) fn is_registered(&self) -> bool {
            DISPATCHER
                .get()
                .is_some_and(|dispatcher| lock(&dispatcher.registered).contains_key(&self.id))
        }
    }

    impl Drop for TerminationCleanup {
        fn drop(&mut self) {
            if let Some(dispatcher) = DISPATCHER.get() {
                lock(&dispatcher.registered).remove(&self.id);
            }
        }
    }
}

#[cfg(unix)]
pub(crate) use termination::TerminationCleanup;

#[cfg(not(unix))]
#[derive(Debug)]
pub(crate) struct TerminationCleanup;

#[cfg(not(unix))]
impl TerminationCleanup {
    pub(crate) fn install(_file: CoordinationFile) -> io::Result<Self> {
        Ok(Self)
    }
}
