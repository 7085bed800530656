//! Launcher support for applications that ship generated initializers.
//!
//! At startup an application picks one of three modes: run with the
//! generated initializer, run the AOT process, or run normally. Generated
//! initializers are found through an explicit registry keyed by a stable
//! hash of the application name rather than by symbol lookup.

use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;

use crate::codegen::INITIALIZER_SUFFIX;
use crate::naming::NamingRegistry;
use crate::types::{ClassName, TypeError};

/// Environment variable that switches an application to its generated artifacts.
pub const AOT_ENABLED_ENV: &str = "NATIVEX_AOT_ENABLED";

/// The single argument that requests AOT processing.
pub const GENERATE_AOT_ARG: &str = "generateAot";

/// Decides whether generated artifacts should be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AotDetector {
    enabled: bool,
}

impl AotDetector {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    /// Read the decision from [`AOT_ENABLED_ENV`].
    pub fn from_env() -> Self {
        let enabled = std::env::var(AOT_ENABLED_ENV).is_ok_and(|value| is_truthy(&value));
        Self { enabled }
    }

    pub fn use_generated_artifacts(self) -> bool {
        self.enabled
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes"
    )
}

/// How an application starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchMode {
    /// Use the generated initializer.
    Optimized,
    /// Run the AOT process and exit.
    GenerateAot,
    /// Discover and wire the graph at runtime.
    Regular,
}

impl LaunchMode {
    /// Pick the mode from the program arguments (without the program name).
    pub fn select<S: AsRef<str>>(args: &[S], detector: AotDetector) -> Self {
        if detector.use_generated_artifacts() {
            Self::Optimized
        } else if let [only] = args {
            if only.as_ref() == GENERATE_AOT_ARG {
                Self::GenerateAot
            } else {
                Self::Regular
            }
        } else {
            Self::Regular
        }
    }
}

impl fmt::Display for LaunchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Optimized => write!(f, "Run optimized application"),
            Self::GenerateAot => write!(f, "Optimizing application for Native"),
            Self::Regular => write!(f, "Run regular application"),
        }
    }
}

/// Registry key of the initializer generated for `application`.
pub fn initializer_key(application: &ClassName) -> String {
    let digest = Sha256::digest(application.canonical_name().as_bytes());
    hex::encode(digest)
}

/// Name of the first initializer generated for `application`.
pub fn initializer_name(application: &ClassName) -> Result<ClassName, TypeError> {
    NamingRegistry::new().generate_name(application, INITIALIZER_SUFFIX)
}

type Factory<T> = Box<dyn Fn() -> T + Send + Sync>;

/// Maps application keys to initializer factories.
pub struct InitializerRegistry<T> {
    factories: HashMap<String, Factory<T>>,
}

impl<T> Default for InitializerRegistry<T> {
    fn default() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }
}

impl<T> fmt::Debug for InitializerRegistry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&String> = self.factories.keys().collect();
        keys.sort();
        f.debug_struct("InitializerRegistry")
            .field("keys", &keys)
            .finish()
    }
}

impl<T> InitializerRegistry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the initializer factory of `application`, returning its key.
    ///
    /// A second registration for the same application replaces the first.
    pub fn register<F>(&mut self, application: &ClassName, factory: F) -> String
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        let key = initializer_key(application);
        self.factories.insert(key.clone(), Box::new(factory));
        key
    }

    /// Create the initializer registered for `application`.
    pub fn create(&self, application: &ClassName) -> Option<T> {
        self.create_by_key(&initializer_key(application))
    }

    /// Create the initializer registered under `key`.
    pub fn create_by_key(&self, key: &str) -> Option<T> {
        self.factories.get(key).map(|factory| factory())
    }

    pub fn contains(&self, application: &ClassName) -> bool {
        self.factories.contains_key(&initializer_key(application))
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}
