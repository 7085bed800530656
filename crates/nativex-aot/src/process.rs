//! The AOT pipeline orchestrator.
//!
//! One [`AotProcess`] performs one run:
//!
//! ```text
//! Idle → Generating → SourcesWritten → Compiled → HintsWritten
//!      → PropertiesWritten → ArtifactsCollected → Done
//! ```
//!
//! The first failing stage moves the process to `Failed` and the run ends
//! there. A generation failure happens before anything is written; a compile
//! failure happens before anything is collected.

use log::info;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::codegen::{GeneratedUnits, Generator};
use crate::collect::Collector;
use crate::compiler::{discover_sources, Diagnostics, HostCompiler, Javac, SourceCompiler};
use crate::context::GenerationContext;
use crate::graph::ResolvedGraph;
use crate::hint::HintRegistry;
use crate::settings::{ConfigurationError, ProcessSettings};
use crate::writer::{self, StartupArguments};
use crate::AotError;

/// A pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Configuration,
    Generation,
    SourceWriting,
    Compilation,
    HintWriting,
    StartupArguments,
    ArtifactCollection,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Configuration => "configuration",
            Self::Generation => "code generation",
            Self::SourceWriting => "source writing",
            Self::Compilation => "compilation",
            Self::HintWriting => "hint writing",
            Self::StartupArguments => "startup arguments",
            Self::ArtifactCollection => "artifact collection",
        };
        f.write_str(name)
    }
}

/// Where a process is in its run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    Idle,
    Generating,
    SourcesWritten,
    Compiled,
    HintsWritten,
    PropertiesWritten,
    ArtifactsCollected,
    Done,
    Failed(Stage),
}

impl ProcessState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed(_))
    }
}

/// A failed run, naming the stage that failed.
#[derive(Error, Debug)]
#[error("{stage} failed: {source}")]
pub struct ProcessError {
    pub stage: Stage,
    pub source: AotError,
}

/// Everything a successful run produced.
#[derive(Debug)]
pub struct ProcessOutcome {
    pub units: GeneratedUnits,
    pub hints: HintRegistry,
    pub sources: Vec<PathBuf>,
    pub diagnostics: Diagnostics,
    pub hint_files: Vec<PathBuf>,
    pub startup_arguments: StartupArguments,
    pub collected: Vec<PathBuf>,
}

/// Runs the AOT pipeline for one application.
#[derive(Debug)]
pub struct AotProcess<H: HostCompiler = Javac> {
    settings: ProcessSettings,
    compiler: SourceCompiler<H>,
    state: ProcessState,
}

impl AotProcess<Javac> {
    /// A process compiling with `javac` as configured in `settings`.
    pub fn new(settings: ProcessSettings) -> Self {
        let javac = Javac::from_settings(&settings);
        Self::with_compiler(settings, javac)
    }
}

impl<H: HostCompiler> AotProcess<H> {
    /// A process compiling with `host`.
    pub fn with_compiler(settings: ProcessSettings, host: H) -> Self {
        Self {
            settings,
            compiler: SourceCompiler::new(host),
            state: ProcessState::Idle,
        }
    }

    pub fn settings(&self) -> &ProcessSettings {
        &self.settings
    }

    pub fn state(&self) -> ProcessState {
        self.state
    }

    pub fn compiler(&self) -> &SourceCompiler<H> {
        &self.compiler
    }

    /// Run every stage for `graph`.
    pub fn run(&mut self, graph: &ResolvedGraph) -> Result<ProcessOutcome, ProcessError> {
        if self.state != ProcessState::Idle {
            return Err(ProcessError {
                stage: Stage::Configuration,
                source: ConfigurationError::Reused.into(),
            });
        }

        let settings = self.settings.clone();
        let checked = settings.check_application(&graph.application);
        self.finish(Stage::Configuration, checked, ProcessState::Idle)?;

        info!("generating code for {}", graph.application);
        self.state = ProcessState::Generating;
        let mut context = GenerationContext::new();
        let generated = Generator::new().generate(graph, &mut context);
        let units = self.finish(Stage::Generation, generated, ProcessState::Generating)?;

        info!("writing {} source file(s)", units.len());
        let written = writer::write_sources(&units, &settings.source_output);
        self.finish(Stage::SourceWriting, written, ProcessState::SourcesWritten)?;

        let sources = discover_sources(&settings.source_output);
        let sources = self.finish(Stage::Compilation, sources, ProcessState::SourcesWritten)?;
        let compiled = self.compiler.compile(&sources, &settings.class_output);
        let diagnostics = self.finish(Stage::Compilation, compiled, ProcessState::Compiled)?;

        info!("writing hints for {}:{}", settings.group_id, settings.artifact_id);
        let hints = context.into_hints();
        let hint_files = writer::write_hints(
            &hints,
            &settings.resource_output,
            &settings.group_id,
            &settings.artifact_id,
        );
        let hint_files = self.finish(Stage::HintWriting, hint_files, ProcessState::HintsWritten)?;

        let startup = writer::write_startup_arguments(&settings);
        let startup_arguments =
            self.finish(Stage::StartupArguments, startup, ProcessState::PropertiesWritten)?;

        info!("collecting artifacts into {}", settings.classpath_dir.display());
        let collected = Collector::new(&settings.classpath_dir)
            .collect(&[settings.resource_output.as_path(), settings.class_output.as_path()]);
        let collected =
            self.finish(Stage::ArtifactCollection, collected, ProcessState::ArtifactsCollected)?;

        self.state = ProcessState::Done;
        info!(
            "AOT processing complete: {} source(s), {} hint file(s), {} collected file(s)",
            sources.len(),
            hint_files.len(),
            collected.len()
        );
        Ok(ProcessOutcome {
            units,
            hints,
            sources,
            diagnostics,
            hint_files,
            startup_arguments,
            collected,
        })
    }

    /// Record the outcome of a stage: advance to `next` or fail the process.
    fn finish<T, E: Into<AotError>>(
        &mut self,
        stage: Stage,
        result: Result<T, E>,
        next: ProcessState,
    ) -> Result<T, ProcessError> {
        match result {
            Ok(value) => {
                self.state = next;
                Ok(value)
            }
            Err(err) => {
                self.state = ProcessState::Failed(stage);
                Err(ProcessError {
                    stage,
                    source: err.into(),
                })
            }
        }
    }
}
