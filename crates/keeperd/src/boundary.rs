//! Execution boundaries: explicit resolution scopes for application types.
//!
//! A boundary owns an ordered list of library locations and an optional
//! parent. Resolving a type name walks the local libraries in insertion order,
//! asking the [`ApplicationRegistry`] what each library exports; the first
//! library that exports the name wins. On a local miss the parent boundary is
//! consulted, and the root boundary finally falls back to the registry's
//! system exports. Boundaries are immutable once built.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::application::{ApplicationError, DaemonApplication};

const BOUNDARY_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::boundary");

type Factory =
    dyn Fn() -> Result<Box<dyn DaemonApplication>, ApplicationError> + Send + Sync + 'static;

/// A named application type together with the factory that builds it.
#[derive(Clone)]
pub struct ApplicationType {
    name: String,
    factory: Arc<Factory>,
}

impl ApplicationType {
    /// Wraps a factory under the given type name.
    pub fn new<F>(name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Result<Box<dyn DaemonApplication>, ApplicationError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            factory: Arc::new(factory),
        }
    }

    /// Name the type is registered under.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Constructs a fresh instance.
    pub fn instantiate(&self) -> Result<Box<dyn DaemonApplication>, ApplicationError> {
        (self.factory)()
    }
}

impl fmt::Debug for ApplicationType {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ApplicationType")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Catalogue of application types exported by library artifacts.
///
/// Libraries are keyed by artifact file name, so the same registry serves any
/// installation directory that ships those artifacts.
#[derive(Debug, Default, Clone)]
pub struct ApplicationRegistry {
    libraries: HashMap<String, BTreeMap<String, ApplicationType>>,
    system: BTreeMap<String, ApplicationType>,
}

impl ApplicationRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares that the library artifact `library` exports `type_name`.
    pub fn register_library<F>(&mut self, library: &str, type_name: &str, factory: F) -> &mut Self
    where
        F: Fn() -> Result<Box<dyn DaemonApplication>, ApplicationError> + Send + Sync + 'static,
    {
        self.libraries
            .entry(library.to_owned())
            .or_default()
            .insert(type_name.to_owned(), ApplicationType::new(type_name, factory));
        self
    }

    /// Registers a type visible from the root boundary without any library.
    pub fn register_system<F>(&mut self, type_name: &str, factory: F) -> &mut Self
    where
        F: Fn() -> Result<Box<dyn DaemonApplication>, ApplicationError> + Send + Sync + 'static,
    {
        self.system
            .insert(type_name.to_owned(), ApplicationType::new(type_name, factory));
        self
    }

    fn exported_by(&self, library: &Path, type_name: &str) -> Option<&ApplicationType> {
        let key = library.file_name()?.to_str()?;
        self.libraries.get(key)?.get(type_name)
    }

    fn system_type(&self, type_name: &str) -> Option<&ApplicationType> {
        self.system.get(type_name)
    }
}

/// Outcome of resolving a type name through a boundary.
#[derive(Debug, Clone)]
pub struct Resolution {
    application_type: ApplicationType,
    origin: Option<PathBuf>,
}

impl Resolution {
    /// The resolved type.
    #[must_use]
    pub fn application_type(&self) -> &ApplicationType {
        &self.application_type
    }

    /// Library that exported the type, or `None` for system exports.
    #[must_use]
    pub fn origin(&self) -> Option<&Path> {
        self.origin.as_deref()
    }
}

/// An isolation context limiting where application types resolve from.
#[derive(Debug)]
pub struct ExecutionBoundary {
    label: String,
    libraries: Vec<PathBuf>,
    parent: Option<Arc<ExecutionBoundary>>,
}

impl ExecutionBoundary {
    /// The root boundary, which resolves only system exports.
    #[must_use]
    pub fn system() -> Arc<Self> {
        Arc::new(Self {
            label: "system".to_owned(),
            libraries: Vec::new(),
            parent: None,
        })
    }

    /// Builds an application boundary over `libraries`, nested under `parent`.
    ///
    /// Every location is kept in the order supplied; earlier locations take
    /// precedence when several export the same name.
    #[must_use]
    pub fn create(parent: Arc<Self>, libraries: Vec<PathBuf>) -> Self {
        debug!(
            target: BOUNDARY_TARGET,
            parent = %parent.label,
            libraries = ?libraries,
            "application boundary created"
        );
        Self {
            label: "application".to_owned(),
            libraries,
            parent: Some(parent),
        }
    }

    /// Short name used in diagnostics.
    #[must_use]
    pub fn label(&self) -> &str {
        self.label.as_str()
    }

    /// Library locations owned by this boundary, in precedence order.
    #[must_use]
    pub fn libraries(&self) -> &[PathBuf] {
        &self.libraries
    }

    /// Boundary consulted on a local miss.
    #[must_use]
    pub fn parent(&self) -> Option<&Arc<Self>> {
        self.parent.as_ref()
    }

    /// Resolves `type_name`, consulting local libraries before the parent.
    #[must_use]
    pub fn resolve(&self, type_name: &str, registry: &ApplicationRegistry) -> Option<Resolution> {
        let local = self.libraries.iter().find_map(|library| {
            registry
                .exported_by(library, type_name)
                .map(|application_type| Resolution {
                    application_type: application_type.clone(),
                    origin: Some(library.clone()),
                })
        });
        if local.is_some() {
            return local;
        }
        match &self.parent {
            Some(parent) => parent.resolve(type_name, registry),
            None => registry
                .system_type(type_name)
                .map(|application_type| Resolution {
                    application_type: application_type.clone(),
                    origin: None,
                }),
        }
    }
}
