//! Application double that records each hook call and the boundary it ran in.

use std::sync::{Arc, Mutex};

use crate::application::{ApplicationError, DaemonApplication, PhaseContext};
use crate::boundary::ExecutionBoundary;

/// Lifecycle hook identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hook {
    Init,
    Start,
    Stop,
    Destroy,
}

/// One recorded hook invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookCall {
    /// Serial number of the instance, starting at 1 per probe.
    pub instance: usize,
    pub hook: Hook,
    /// Address of the boundary handed to the hook.
    pub boundary: usize,
    pub boundary_label: String,
    pub args: Vec<String>,
}

#[derive(Default)]
struct ProbeState {
    instances: usize,
    calls: Vec<HookCall>,
    failing_hook: Option<Hook>,
    failing_construction: bool,
}

/// Factory source whose instances report into a shared log.
#[derive(Clone, Default)]
pub struct ApplicationProbe {
    state: Arc<Mutex<ProbeState>>,
}

impl ApplicationProbe {
    /// Makes every instance fail the given hook.
    pub fn fail_on(&self, hook: Hook) {
        self.lock().failing_hook = Some(hook);
    }

    /// Makes the factory fail.
    pub fn fail_construction(&self) {
        self.lock().failing_construction = true;
    }

    /// Number of instances constructed so far.
    #[must_use]
    pub fn instances(&self) -> usize {
        self.lock().instances
    }

    /// Every hook call recorded so far.
    #[must_use]
    pub fn calls(&self) -> Vec<HookCall> {
        self.lock().calls.clone()
    }

    /// Factory suitable for [`crate::ApplicationRegistry`].
    pub fn factory(
        &self,
    ) -> impl Fn() -> Result<Box<dyn DaemonApplication>, ApplicationError> + Send + Sync + 'static
    {
        let probe = self.clone();
        move || {
            let mut state = probe.lock();
            if state.failing_construction {
                return Err(ApplicationError::new("constructor refused"));
            }
            state.instances += 1;
            let instance = state.instances;
            drop(state);
            Ok(Box::new(ProbeApplication {
                instance,
                probe: probe.clone(),
            }) as Box<dyn DaemonApplication>)
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ProbeState> {
        self.state.lock().expect("probe mutex poisoned")
    }
}

struct ProbeApplication {
    instance: usize,
    probe: ApplicationProbe,
}

impl ProbeApplication {
    fn record(
        &self,
        hook: Hook,
        context: &PhaseContext<'_>,
        args: &[String],
    ) -> Result<(), ApplicationError> {
        let boundary: &ExecutionBoundary = context.boundary();
        let mut state = self.probe.lock();
        state.calls.push(HookCall {
            instance: self.instance,
            hook,
            boundary: std::ptr::from_ref(boundary) as usize,
            boundary_label: boundary.label().to_owned(),
            args: args.to_vec(),
        });
        if state.failing_hook == Some(hook) {
            return Err(ApplicationError::new(format!("{hook:?} refused")));
        }
        Ok(())
    }
}

impl DaemonApplication for ProbeApplication {
    fn init(&mut self, context: &PhaseContext<'_>, args: &[String]) -> Result<(), ApplicationError> {
        self.record(Hook::Init, context, args)
    }

    fn start(&mut self, context: &PhaseContext<'_>) -> Result<(), ApplicationError> {
        self.record(Hook::Start, context, &[])
    }

    fn stop(&mut self, context: &PhaseContext<'_>, args: &[String]) -> Result<(), ApplicationError> {
        self.record(Hook::Stop, context, args)
    }

    fn destroy(&mut self, context: &PhaseContext<'_>) -> Result<(), ApplicationError> {
        self.record(Hook::Destroy, context, &[])
    }
}
