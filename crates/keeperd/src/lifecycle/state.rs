use strum::Display;

/// Position of the controller in its strictly linear lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "lowercase")]
pub enum LifecycleState {
    /// Nothing has run yet.
    Unconfigured,
    /// Layout resolved and descriptor loaded.
    Configured,
    /// Application boundary built.
    Bound,
    /// Start instance created and `init` succeeded.
    Initialized,
    /// `start` succeeded; the application is serving.
    Started,
    /// `stop` succeeded.
    Stopped,
    /// `destroy` succeeded. Terminal.
    Destroyed,
    /// A phase failed fatally. Terminal.
    Aborted,
}

/// The controller operations, each moving the lifecycle one step forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Phase {
    /// Load the layout and descriptor.
    Configure,
    /// Build the application boundary.
    Bind,
    /// Resolve, instantiate and `init` the start type.
    Init,
    /// Call `start`.
    Start,
    /// Resolve the stop instance and call `stop`.
    Stop,
    /// Call `destroy`.
    Destroy,
}

impl Phase {
    /// State the controller must be in before this phase runs.
    #[must_use]
    pub const fn required_state(self) -> LifecycleState {
        match self {
            Self::Configure => LifecycleState::Unconfigured,
            Self::Bind => LifecycleState::Configured,
            Self::Init => LifecycleState::Bound,
            Self::Start => LifecycleState::Initialized,
            Self::Stop => LifecycleState::Started,
            Self::Destroy => LifecycleState::Stopped,
        }
    }

    /// State reached when this phase succeeds.
    #[must_use]
    pub const fn resulting_state(self) -> LifecycleState {
        match self {
            Self::Configure => LifecycleState::Configured,
            Self::Bind => LifecycleState::Bound,
            Self::Init => LifecycleState::Initialized,
            Self::Start => LifecycleState::Started,
            Self::Stop => LifecycleState::Stopped,
            Self::Destroy => LifecycleState::Destroyed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phases_chain_without_gaps() {
        let phases = [
            Phase::Configure,
            Phase::Bind,
            Phase::Init,
            Phase::Start,
            Phase::Stop,
            Phase::Destroy,
        ];
        assert_eq!(phases[0].required_state(), LifecycleState::Unconfigured);
        for pair in phases.windows(2) {
            assert_eq!(pair[0].resulting_state(), pair[1].required_state());
        }
        assert_eq!(
            Phase::Destroy.resulting_state(),
            LifecycleState::Destroyed
        );
    }

    #[test]
    fn labels_are_lowercase() {
        assert_eq!(LifecycleState::Initialized.to_string(), "initialized");
        assert_eq!(Phase::Destroy.to_string(), "destroy");
    }
}
