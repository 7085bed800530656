//! Process configuration (`nativex.toml`) parsing and resolution.
//!
//! A configuration file only needs to name what differs from the Maven
//! layout:
//!
//! ```toml
//! application = "com.example.nativex.sample.basic.BasicApplication"
//! graph = "graph.toml"
//!
//! [project]
//! group-id = "com.example"
//! artifact-id = "basic-native-sample"
//! ```
//!
//! [`ProcessConfig::resolve`] turns the layered configuration into immutable
//! [`ProcessSettings`] with every path made absolute.

use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

use crate::types::ClassName;

/// Default configuration file name.
pub const CONFIG_FILE: &str = "nativex.toml";

/// Default host compiler program.
pub const DEFAULT_COMPILER: &str = "javac";

/// Errors that can occur when loading or resolving configuration.
#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("failed to read configuration file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("missing required setting: {0}")]
    MissingField(&'static str),

    #[error("invalid {field} '{value}': {reason}")]
    InvalidValue {
        field: &'static str,
        value: String,
        reason: &'static str,
    },

    #[error("an AOT process can only run once; create a new one for each run")]
    Reused,

    #[error("graph application {graph} does not match configured application {configured}")]
    ApplicationMismatch {
        configured: ClassName,
        graph: ClassName,
    },
}

/// The contents of a `nativex.toml` file, every field optional so that
/// layers can be merged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProcessConfig {
    /// The application type whose graph is processed.
    #[serde(default)]
    pub application: Option<ClassName>,

    /// Path of the resolved graph file.
    #[serde(default)]
    pub graph: Option<PathBuf>,

    #[serde(default)]
    pub project: ProjectConfig,

    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub compiler: CompilerConfig,

    #[serde(default, rename = "native-image")]
    pub native_image: NativeImageConfig,
}

/// Project coordinates used in the hint directory layout.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct ProjectConfig {
    #[serde(default)]
    pub group_id: Option<String>,
    #[serde(default)]
    pub artifact_id: Option<String>,
}

/// Output directories.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    /// Generated source root.
    #[serde(default)]
    pub sources: Option<PathBuf>,
    /// Generated resource root (hint files, properties).
    #[serde(default)]
    pub resources: Option<PathBuf>,
    /// Compiled class output.
    #[serde(default)]
    pub classes: Option<PathBuf>,
    /// Directory packaged into the application classpath.
    #[serde(default)]
    pub classpath: Option<PathBuf>,
}

/// Host compiler invocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompilerConfig {
    /// Compiler program, `javac` by default.
    #[serde(default)]
    pub program: Option<String>,
    /// Classpath entries the generated code compiles against.
    #[serde(default)]
    pub classpath: Option<Vec<PathBuf>>,
    /// Extra compiler options.
    #[serde(default)]
    pub options: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct NativeImageConfig {
    /// Rewrite `native-image.properties` even when it already exists.
    #[serde(default)]
    pub overwrite_startup_arguments: Option<bool>,
}

impl ProcessConfig {
    /// The standard Maven layout produced by the AOT build plugin.
    pub fn maven_conventions() -> Self {
        Self {
            output: OutputConfig {
                sources: Some(PathBuf::from("target/spring-aot/main/sources")),
                resources: Some(PathBuf::from("target/spring-aot/main/resources")),
                classes: Some(PathBuf::from("target/spring-aot/main/classes")),
                classpath: Some(PathBuf::from("target/classes")),
            },
            compiler: CompilerConfig {
                program: Some(String::from(DEFAULT_COMPILER)),
                classpath: None,
                options: None,
            },
            native_image: NativeImageConfig {
                overwrite_startup_arguments: Some(false),
            },
            ..Self::default()
        }
    }

    /// Parse a configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self, ConfigurationError> {
        Ok(toml::from_str(content)?)
    }

    /// Load a configuration file. Relative paths inside it stay relative;
    /// they are resolved by [`Self::resolve`].
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigurationError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigurationError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    /// Resolve the inputs named by a configuration file (`graph` and the
    /// compiler classpath) against `dir`, normally the file's directory.
    /// Output directories stay relative to the working directory.
    #[must_use]
    pub fn inputs_relative_to(mut self, dir: &Path) -> Self {
        self.graph = self.graph.map(|graph| dir.join(graph));
        if let Some(classpath) = &mut self.compiler.classpath {
            for entry in classpath.iter_mut() {
                *entry = dir.join(&*entry);
            }
        }
        self
    }

    /// Overlay `other` on top of `self`; values set in `other` win.
    #[must_use]
    pub fn merge(mut self, other: Self) -> Self {
        fn overlay<T>(base: &mut Option<T>, top: Option<T>) {
            if top.is_some() {
                *base = top;
            }
        }

        overlay(&mut self.application, other.application);
        overlay(&mut self.graph, other.graph);
        overlay(&mut self.project.group_id, other.project.group_id);
        overlay(&mut self.project.artifact_id, other.project.artifact_id);
        overlay(&mut self.output.sources, other.output.sources);
        overlay(&mut self.output.resources, other.output.resources);
        overlay(&mut self.output.classes, other.output.classes);
        overlay(&mut self.output.classpath, other.output.classpath);
        overlay(&mut self.compiler.program, other.compiler.program);
        overlay(&mut self.compiler.classpath, other.compiler.classpath);
        overlay(&mut self.compiler.options, other.compiler.options);
        overlay(
            &mut self.native_image.overwrite_startup_arguments,
            other.native_image.overwrite_startup_arguments,
        );
        self
    }

    /// Validate the configuration and resolve every path against `working_dir`.
    pub fn resolve(self, working_dir: &Path) -> Result<ProcessSettings, ConfigurationError> {
        let application = self
            .application
            .ok_or(ConfigurationError::MissingField("application"))?;
        let group_id = self
            .project
            .group_id
            .ok_or(ConfigurationError::MissingField("project.group-id"))?;
        validate_coordinate("project.group-id", &group_id)?;
        let artifact_id = self
            .project
            .artifact_id
            .ok_or(ConfigurationError::MissingField("project.artifact-id"))?;
        validate_coordinate("project.artifact-id", &artifact_id)?;

        let dir = |value: Option<PathBuf>, field: &'static str| {
            value
                .map(|path| working_dir.join(path))
                .ok_or(ConfigurationError::MissingField(field))
        };
        let source_output = dir(self.output.sources, "output.sources")?;
        let resource_output = dir(self.output.resources, "output.resources")?;
        let class_output = dir(self.output.classes, "output.classes")?;
        let classpath_dir = dir(self.output.classpath, "output.classpath")?;

        let compiler = self
            .compiler
            .program
            .unwrap_or_else(|| String::from(DEFAULT_COMPILER));
        if compiler.trim().is_empty() {
            return Err(ConfigurationError::InvalidValue {
                field: "compiler.program",
                value: compiler,
                reason: "program cannot be empty",
            });
        }

        Ok(ProcessSettings {
            application,
            graph: self.graph.map(|path| working_dir.join(path)),
            source_output,
            resource_output,
            class_output,
            classpath_dir,
            group_id,
            artifact_id,
            compiler,
            compiler_classpath: self
                .compiler
                .classpath
                .unwrap_or_default()
                .into_iter()
                .map(|path| working_dir.join(path))
                .collect(),
            compiler_options: self.compiler.options.unwrap_or_default(),
            overwrite_startup_arguments: self
                .native_image
                .overwrite_startup_arguments
                .unwrap_or(false),
        })
    }
}

/// Group and artifact ids become directory names under `META-INF`.
fn validate_coordinate(field: &'static str, value: &str) -> Result<(), ConfigurationError> {
    let invalid = |reason| ConfigurationError::InvalidValue {
        field,
        value: value.to_string(),
        reason,
    };

    if value.trim().is_empty() {
        return Err(invalid("value cannot be empty"));
    }
    let mut components = Path::new(value).components();
    let single_normal = matches!(components.next(), Some(Component::Normal(_)))
        && components.next().is_none();
    if !single_normal || value.contains(['/', '\\']) {
        return Err(invalid("value must be a single path segment"));
    }
    Ok(())
}

/// Fully resolved, immutable settings for one process run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessSettings {
    pub application: ClassName,
    pub graph: Option<PathBuf>,
    pub source_output: PathBuf,
    pub resource_output: PathBuf,
    pub class_output: PathBuf,
    pub classpath_dir: PathBuf,
    pub group_id: String,
    pub artifact_id: String,
    pub compiler: String,
    pub compiler_classpath: Vec<PathBuf>,
    pub compiler_options: Vec<String>,
    pub overwrite_startup_arguments: bool,
}

impl ProcessSettings {
    /// Settings for `application` using the Maven layout under `working_dir`.
    pub fn maven(
        application: ClassName,
        group_id: &str,
        artifact_id: &str,
        working_dir: &Path,
    ) -> Result<Self, ConfigurationError> {
        ProcessConfig {
            application: Some(application),
            project: ProjectConfig {
                group_id: Some(group_id.to_string()),
                artifact_id: Some(artifact_id.to_string()),
            },
            ..ProcessConfig::maven_conventions()
        }
        .resolve(working_dir)
    }

    /// The directory receiving hint files and `native-image.properties`.
    pub fn native_image_dir(&self) -> PathBuf {
        crate::writer::native_image_dir(&self.resource_output, &self.group_id, &self.artifact_id)
    }

    /// Fail if a graph was resolved for a different application.
    pub fn check_application(&self, graph_application: &ClassName) -> Result<(), ConfigurationError> {
        if &self.application != graph_application {
            return Err(ConfigurationError::ApplicationMismatch {
                configured: self.application.clone(),
                graph: graph_application.clone(),
            });
        }
        Ok(())
    }
}
