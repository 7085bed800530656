//! Ahead-of-time processing for statically initialized applications.
//!
//! This crate turns a resolved object graph into:
//! - A generated `ApplicationContextInitializer` that replays the graph without discovery
//! - Runtime hints for every dynamic access the generated code (or its launcher) performs
//! - Compiled classes, produced by a single host compiler invocation
//! - A `META-INF/native-image` configuration tree for a closed-world native compiler
//!
//! The pipeline is driven by [`AotProcess`]:
//!
//! ```text
//! ResolvedGraph → Generator → Writer → SourceCompiler → Writer (hints, args) → Collector
//! ```

pub mod codegen;
pub mod collect;
pub mod compiler;
pub mod context;
pub mod graph;
pub mod hint;
pub mod naming;
pub mod process;
pub mod settings;
pub mod startup;
pub mod types;
pub mod writer;

pub use codegen::{GeneratedUnit, GeneratedUnits, GenerationError, Generator};
pub use collect::{CollectError, Collector};
pub use compiler::{
    CompileError, CompileRequest, Diagnostic, Diagnostics, HostCompiler, Javac, Severity,
    SourceCompiler,
};
pub use context::GenerationContext;
pub use graph::{
    Argument, ConstructionStep, ContributedHint, GraphError, Injection, Literal, ResolvedGraph,
    Visibility,
};
pub use hint::{AccessKind, HintEntry, HintRegistry, Member, Mode, Subject};
pub use naming::NamingRegistry;
pub use process::{AotProcess, ProcessError, ProcessOutcome, ProcessState, Stage};
pub use settings::{ConfigurationError, ProcessConfig, ProcessSettings};
pub use startup::{initializer_key, AotDetector, InitializerRegistry, LaunchMode};
pub use types::{ClassName, TypeError};
pub use writer::{StartupArguments, WriteError};

use thiserror::Error;

/// Crate version, reported by the CLI.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Any error raised by a pipeline stage.
#[derive(Debug, Error)]
pub enum AotError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Write(#[from] WriteError),

    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Collect(#[from] CollectError),
}
