//! Structured health reporting for lifecycle events.

use std::sync::Arc;

use keeper_config::LayoutError;

use crate::lifecycle::{LifecycleError, Phase};

const HEALTH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::health");

/// Observer trait used to surface lifecycle events to telemetry sinks.
pub trait HealthReporter: Send + Sync {
    /// Invoked before a phase runs.
    fn phase_starting(&self, phase: Phase);

    /// Invoked after a phase completes.
    fn phase_completed(&self, phase: Phase);

    /// Invoked when a phase fails fatally.
    fn phase_failed(&self, phase: Phase, error: &LifecycleError);

    /// Invoked when installation verification fails. Startup continues.
    fn verification_failed(&self, error: &LayoutError);
}

impl<T> HealthReporter for Arc<T>
where
    T: HealthReporter + ?Sized,
{
    fn phase_starting(&self, phase: Phase) {
        (**self).phase_starting(phase);
    }

    fn phase_completed(&self, phase: Phase) {
        (**self).phase_completed(phase);
    }

    fn phase_failed(&self, phase: Phase, error: &LifecycleError) {
        (**self).phase_failed(phase, error);
    }

    fn verification_failed(&self, error: &LayoutError) {
        (**self).verification_failed(error);
    }
}

/// Default reporter that records lifecycle events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredHealthReporter;

impl StructuredHealthReporter {
    /// Builds a new reporter.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl HealthReporter for StructuredHealthReporter {
    fn phase_starting(&self, phase: Phase) {
        tracing::debug!(
            target: HEALTH_TARGET,
            event = "phase_starting",
            %phase,
            "lifecycle phase starting"
        );
    }

    fn phase_completed(&self, phase: Phase) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "phase_completed",
            %phase,
            "lifecycle phase completed"
        );
    }

    fn phase_failed(&self, phase: Phase, error: &LifecycleError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "phase_failed",
            %phase,
            status = %error.exit_status(),
            error = %error,
            "lifecycle phase failed"
        );
    }

    fn verification_failed(&self, error: &LayoutError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "verification_failed",
            error = %error,
            "installation verification failure"
        );
    }
}
