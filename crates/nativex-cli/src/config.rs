//! Layered configuration shared by every subcommand.
//!
//! Layers, lowest first: Maven conventions, `nativex.toml`, command-line flags.

use anyhow::{bail, Context, Result};
use clap::Args;
use nativex_aot::settings::{CompilerConfig, NativeImageConfig, OutputConfig, ProjectConfig, CONFIG_FILE};
use nativex_aot::{ClassName, ProcessConfig, ProcessSettings, ResolvedGraph};
use std::env;
use std::path::{Path, PathBuf};

#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// Project directory; relative paths are resolved against it
    #[arg(long)]
    pub dir: Option<PathBuf>,

    /// Configuration file (defaults to nativex.toml in the project directory).
    /// Its graph and compiler classpath are relative to the file; output
    /// directories are relative to the project directory
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Resolved graph file (.toml or .json)
    #[arg(long)]
    pub graph: Option<PathBuf>,

    /// Application type, e.g. com.example.App
    #[arg(long)]
    pub application: Option<ClassName>,

    /// Project group id used in the hint directory layout
    #[arg(long)]
    pub group_id: Option<String>,

    /// Project artifact id used in the hint directory layout
    #[arg(long)]
    pub artifact_id: Option<String>,

    /// Generated source output directory
    #[arg(long)]
    pub source_output: Option<PathBuf>,

    /// Generated resource output directory
    #[arg(long)]
    pub resource_output: Option<PathBuf>,

    /// Compiled class output directory
    #[arg(long)]
    pub class_output: Option<PathBuf>,

    /// Directory receiving the collected artifacts
    #[arg(long)]
    pub classpath_dir: Option<PathBuf>,

    /// Host compiler program
    #[arg(long)]
    pub javac: Option<String>,

    /// Rewrite native-image.properties even if it already exists
    #[arg(long)]
    pub overwrite_startup_arguments: bool,
}

impl ConfigArgs {
    /// The directory relative paths are resolved against.
    pub fn working_dir(&self) -> Result<PathBuf> {
        let current = env::current_dir().context("Failed to get current directory")?;
        Ok(match &self.dir {
            Some(dir) => current.join(dir),
            None => current,
        })
    }

    /// Merge every configuration layer.
    pub fn load(&self, working_dir: &Path) -> Result<ProcessConfig> {
        let file = match &self.config {
            Some(path) => {
                let path = working_dir.join(path);
                if !path.is_file() {
                    bail!("Configuration file `{}` not found", path.display());
                }
                Some(path)
            }
            None => Some(working_dir.join(CONFIG_FILE)).filter(|path| path.is_file()),
        };

        let mut config = ProcessConfig::maven_conventions();
        if let Some(path) = file {
            log::debug!("loading configuration from {}", path.display());
            let layer = ProcessConfig::from_path(&path)
                .with_context(|| format!("Failed to load `{}`", path.display()))?;
            let base = path.parent().unwrap_or(working_dir);
            config = config.merge(layer.inputs_relative_to(base));
        }
        Ok(config.merge(self.overrides()))
    }

    /// Resolve complete settings for the pipeline.
    pub fn settings(&self) -> Result<ProcessSettings> {
        let working_dir = self.working_dir()?;
        self.load(&working_dir)?
            .resolve(&working_dir)
            .context("Invalid configuration")
    }

    /// Load the graph named by the configuration.
    pub fn graph(&self) -> Result<ResolvedGraph> {
        let working_dir = self.working_dir()?;
        let config = self.load(&working_dir)?;
        let Some(path) = config.graph.as_ref().map(|path| working_dir.join(path)) else {
            bail!("No graph given; pass --graph or set `graph` in {CONFIG_FILE}");
        };
        let graph = ResolvedGraph::from_path(&path)
            .with_context(|| format!("Failed to load graph `{}`", path.display()))?;

        if let Some(application) = &config.application {
            if application != &graph.application {
                bail!(
                    "Graph `{}` is for {}, but the configured application is {}",
                    path.display(),
                    graph.application,
                    application
                );
            }
        }
        Ok(graph)
    }

    fn overrides(&self) -> ProcessConfig {
        ProcessConfig {
            application: self.application.clone(),
            graph: self.graph.clone(),
            project: ProjectConfig {
                group_id: self.group_id.clone(),
                artifact_id: self.artifact_id.clone(),
            },
            output: OutputConfig {
                sources: self.source_output.clone(),
                resources: self.resource_output.clone(),
                classes: self.class_output.clone(),
                classpath: self.classpath_dir.clone(),
            },
            compiler: CompilerConfig {
                program: self.javac.clone(),
                classpath: None,
                options: None,
            },
            native_image: NativeImageConfig {
                overwrite_startup_arguments: self.overwrite_startup_arguments.then_some(true),
            },
        }
    }
}
