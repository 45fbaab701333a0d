//! Health reporter double that records every lifecycle event.

use std::sync::Mutex;

use keeper_config::LayoutError;

use crate::exit::ExitStatus;
use crate::health::HealthReporter;
use crate::lifecycle::{LifecycleError, Phase};

/// Records health events for assertions.
#[derive(Default)]
pub struct RecordingHealthReporter {
    events: Mutex<Vec<HealthEvent>>,
}

impl RecordingHealthReporter {
    /// Captures a copy of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<HealthEvent> {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .clone()
    }

    fn record(&self, event: HealthEvent) {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .push(event);
    }
}

impl HealthReporter for RecordingHealthReporter {
    fn phase_starting(&self, phase: Phase) {
        self.record(HealthEvent::PhaseStarting(phase));
    }

    fn phase_completed(&self, phase: Phase) {
        self.record(HealthEvent::PhaseCompleted(phase));
    }

    fn phase_failed(&self, phase: Phase, error: &LifecycleError) {
        self.record(HealthEvent::PhaseFailed(phase, error.exit_status()));
    }

    fn verification_failed(&self, error: &LayoutError) {
        self.record(HealthEvent::VerificationFailed(error.to_string()));
    }
}

/// Structured health events tracked during tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthEvent {
    PhaseStarting(Phase),
    PhaseCompleted(Phase),
    PhaseFailed(Phase, ExitStatus),
    VerificationFailed(String),
}
