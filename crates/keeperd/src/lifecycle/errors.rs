//! Fatal lifecycle failures and their exit statuses.

use std::path::PathBuf;

use keeper_config::DescriptorError;
use thiserror::Error;

use crate::application::ApplicationError;
use crate::exit::ExitStatus;

use super::state::{LifecycleState, Phase};

/// Errors that abort the lifecycle. None of them is recoverable.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// The application descriptor could not be loaded.
    #[error("failed while loading '{path}': {source}")]
    Configuration {
        /// Descriptor file path.
        path: PathBuf,
        /// Underlying descriptor error.
        #[source]
        source: DescriptorError,
    },
    /// No boundary in the chain exports the named type.
    #[error("could not find application type '{type_name}'")]
    TypeNotFound {
        /// Requested type name.
        type_name: String,
    },
    /// The type's factory failed.
    #[error("could not instantiate application type '{type_name}': {source}")]
    Instantiation {
        /// Requested type name.
        type_name: String,
        /// Factory error.
        #[source]
        source: ApplicationError,
    },
    /// A lifecycle hook failed.
    #[error("failed on {type_name}.{phase}(): {source}")]
    Hook {
        /// Phase whose hook failed.
        phase: Phase,
        /// Type the failing instance was built from.
        type_name: String,
        /// Hook error.
        #[source]
        source: ApplicationError,
    },
    /// An operation was invoked from the wrong state.
    #[error("cannot run {phase} while the lifecycle is {state}")]
    OutOfOrder {
        /// Requested phase.
        phase: Phase,
        /// Current state.
        state: LifecycleState,
    },
}

impl LifecycleError {
    /// Process exit status for this failure.
    #[must_use]
    pub fn exit_status(&self) -> ExitStatus {
        match self {
            Self::Configuration { .. } => ExitStatus::ConfigurationLoad,
            Self::TypeNotFound { .. } => ExitStatus::TypeLookup,
            Self::Instantiation { .. } => ExitStatus::Instantiation,
            Self::Hook { phase, .. } => match phase {
                Phase::Init => ExitStatus::Initialization,
                Phase::Start => ExitStatus::Start,
                Phase::Stop | Phase::Destroy => ExitStatus::Stop,
                Phase::Configure | Phase::Bind => ExitStatus::Failure,
            },
            Self::OutOfOrder { .. } => ExitStatus::Failure,
        }
    }
}
