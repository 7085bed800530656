//! Compiling generated sources with the host compiler.
//!
//! All sources of a run are compiled by a single host invocation. The run
//! fails when the host reports failure or when any error diagnostic was
//! emitted, whichever comes first; warnings and notes never fail a build.

use log::{debug, info};
use regex::Regex;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::OnceLock;
use thiserror::Error;

use crate::settings::{ProcessSettings, DEFAULT_COMPILER};
use crate::types::SOURCE_EXT;

/// Errors raised by the compile step.
#[derive(Error, Debug)]
pub enum CompileError {
    #[error("compilation failed:{report}")]
    Failed {
        report: String,
        diagnostics: Diagnostics,
    },

    #[error("failed to launch host compiler '{program}': {source}")]
    Launch {
        program: String,
        source: std::io::Error,
    },

    #[error("failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Severity of a compiler message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Note,
}

impl Severity {
    fn parse(s: &str) -> Self {
        match s {
            "error" => Self::Error,
            "warning" => Self::Warning,
            _ => Self::Note,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Note => write!(f, "note"),
        }
    }
}

/// One compiler message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub source: Option<PathBuf>,
    pub line: Option<u32>,
    pub column: Option<u32>,
}

impl Diagnostic {
    /// A diagnostic without a source location.
    pub fn general(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            source: None,
            line: None,
            column: None,
        }
    }

    /// A diagnostic attached to `source` at `line` (and optionally `column`).
    pub fn located(
        severity: Severity,
        message: impl Into<String>,
        source: impl Into<PathBuf>,
        line: u32,
        column: Option<u32>,
    ) -> Self {
        Self {
            severity,
            message: message.into(),
            source: Some(source.into()),
            line: Some(line),
            column,
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(source) = &self.source {
            write!(f, " {}", source.display())?;
        }
        match (self.line, self.column) {
            (Some(line), Some(column)) => write!(f, " {line}:{column}"),
            (Some(line), None) => write!(f, " {line}"),
            _ => Ok(()),
        }
    }
}

/// The messages of one compiler invocation, in emission order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.entries.push(diagnostic);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter().filter(|diagnostic| diagnostic.is_error())
    }

    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// One line per error: message, source and `line:column`.
    pub fn error_report(&self) -> String {
        self.errors().map(|error| format!("\n{error}")).collect()
    }

    fn last_mut(&mut self) -> Option<&mut Diagnostic> {
        self.entries.last_mut()
    }
}

/// The inputs of one host invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileRequest {
    pub sources: Vec<PathBuf>,
    pub class_output: PathBuf,
}

/// What the host reported.
#[derive(Debug, Clone, Default)]
pub struct HostOutput {
    pub success: bool,
    pub diagnostics: Diagnostics,
    /// Output lines that could not be attributed to a diagnostic.
    pub unparsed: Vec<String>,
}

/// A compiler the pipeline can hand sources to.
pub trait HostCompiler {
    /// Program name used in messages.
    fn program(&self) -> &str;

    /// Compile every source of `request` in one invocation.
    fn invoke(&self, request: &CompileRequest) -> Result<HostOutput, CompileError>;
}

/// The JDK `javac` compiler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Javac {
    pub program: String,
    pub classpath: Vec<PathBuf>,
    pub options: Vec<String>,
}

impl Default for Javac {
    fn default() -> Self {
        Self {
            program: String::from(DEFAULT_COMPILER),
            classpath: Vec::new(),
            options: Vec::new(),
        }
    }
}

impl Javac {
    /// A compiler configured from resolved settings.
    pub fn from_settings(settings: &ProcessSettings) -> Self {
        Self {
            program: settings.compiler.clone(),
            classpath: settings.compiler_classpath.clone(),
            options: settings.compiler_options.clone(),
        }
    }

    /// Check that the program can be launched.
    pub fn is_available(&self) -> bool {
        Command::new(&self.program)
            .arg("-version")
            .output()
            .is_ok_and(|output| output.status.success())
    }

    fn command(&self, request: &CompileRequest) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg("-d").arg(&request.class_output);
        if !self.classpath.is_empty() {
            let separator = if cfg!(windows) { ";" } else { ":" };
            let classpath: Vec<String> = self
                .classpath
                .iter()
                .map(|entry| entry.to_string_lossy().into_owned())
                .collect();
            cmd.arg("-cp").arg(classpath.join(separator));
        }
        cmd.args(&self.options);
        cmd.args(&request.sources);
        cmd
    }
}

impl HostCompiler for Javac {
    fn program(&self) -> &str {
        &self.program
    }

    fn invoke(&self, request: &CompileRequest) -> Result<HostOutput, CompileError> {
        let output = self
            .command(request)
            .output()
            .map_err(|source| CompileError::Launch {
                program: self.program.clone(),
                source,
            })?;

        // javac reports on stderr; some wrappers use stdout.
        let mut text = String::from_utf8_lossy(&output.stderr).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stdout));
        let (diagnostics, unparsed) = parse_javac_output(&text);
        Ok(HostOutput {
            success: output.status.success(),
            diagnostics,
            unparsed,
        })
    }
}

fn located_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^(.+\.java):(\d+): (error|warning|note): (.*)$").ok())
        .as_ref()
}

fn general_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^(error|warning|Note): (.*)$").ok())
        .as_ref()
}

fn summary_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^\d+ (errors?|warnings?)$").ok())
        .as_ref()
}

/// What the previous line told us about the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Expect {
    Header,
    SourceEcho,
    Caret,
    Detail,
}

/// Parse javac output into diagnostics.
///
/// Located messages are followed by an echo of the source line and a caret
/// line marking the column; indented lines after that are message details.
pub fn parse_javac_output(text: &str) -> (Diagnostics, Vec<String>) {
    let mut diagnostics = Diagnostics::new();
    let mut unparsed = Vec::new();
    let mut expect = Expect::Header;

    for line in text.lines() {
        if line.trim().is_empty() {
            continue;
        }

        if let Some(caps) = located_pattern().and_then(|re| re.captures(line)) {
            let line_number = caps[2].parse().unwrap_or(0);
            diagnostics.push(Diagnostic::located(
                Severity::parse(&caps[3]),
                &caps[4],
                &caps[1],
                line_number,
                None,
            ));
            expect = Expect::SourceEcho;
            continue;
        }
        if let Some(caps) = general_pattern().and_then(|re| re.captures(line)) {
            let severity = Severity::parse(&caps[1].to_lowercase());
            diagnostics.push(Diagnostic::general(severity, &caps[2]));
            expect = Expect::Detail;
            continue;
        }
        if summary_pattern().is_some_and(|re| re.is_match(line)) {
            expect = Expect::Header;
            continue;
        }

        match expect {
            Expect::SourceEcho => expect = Expect::Caret,
            Expect::Caret if line.trim() == "^" => {
                if let Some(last) = diagnostics.last_mut() {
                    last.column = u32::try_from(caret_column(line)).ok();
                }
                expect = Expect::Detail;
            }
            Expect::Caret | Expect::Detail if line.starts_with(char::is_whitespace) => {
                if let Some(last) = diagnostics.last_mut() {
                    last.message.push('\n');
                    last.message.push_str(line.trim());
                }
                expect = Expect::Detail;
            }
            _ => {
                unparsed.push(line.to_string());
                expect = Expect::Header;
            }
        }
    }

    (diagnostics, unparsed)
}

/// Tab stops used by javac when it reports columns.
const TAB_WIDTH: usize = 8;

/// The 1-based column marked by a caret line, with tabs expanded to the next
/// tab stop as javac counts them.
fn caret_column(line: &str) -> usize {
    let offset = line.chars().take_while(|c| *c != '^').fold(0, |column, c| {
        if c == '\t' {
            (column / TAB_WIDTH + 1) * TAB_WIDTH
        } else {
            column + 1
        }
    });
    offset + 1
}

/// All `.java` files under `root`, sorted. A missing root yields no sources.
pub fn discover_sources(root: &Path) -> Result<Vec<PathBuf>, CompileError> {
    if !root.is_dir() {
        return Ok(Vec::new());
    }
    let pattern = format!(
        "{}/**/*.{SOURCE_EXT}",
        glob::Pattern::escape(&root.to_string_lossy())
    );
    let entries = glob::glob(&pattern).map_err(|err| CompileError::Io {
        path: root.to_path_buf(),
        source: std::io::Error::new(std::io::ErrorKind::InvalidInput, err.to_string()),
    })?;

    let mut sources = Vec::new();
    for entry in entries {
        let path = entry.map_err(|err| CompileError::Io {
            path: err.path().to_path_buf(),
            source: err.into_error(),
        })?;
        if path.is_file() {
            sources.push(path);
        }
    }
    sources.sort();
    Ok(sources)
}

/// Drives a [`HostCompiler`] and gates on its diagnostics.
#[derive(Debug, Clone, Default)]
pub struct SourceCompiler<H: HostCompiler = Javac> {
    host: H,
}

impl<H: HostCompiler> SourceCompiler<H> {
    pub fn new(host: H) -> Self {
        Self { host }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    /// Compile `sources` into `class_output`.
    ///
    /// An empty source set succeeds without invoking the host.
    pub fn compile(&self, sources: &[PathBuf], class_output: &Path) -> Result<Diagnostics, CompileError> {
        if sources.is_empty() {
            debug!("no sources to compile");
            return Ok(Diagnostics::new());
        }

        std::fs::create_dir_all(class_output).map_err(|source| CompileError::Io {
            path: class_output.to_path_buf(),
            source,
        })?;

        info!(
            "compiling {} source(s) with {}",
            sources.len(),
            self.host.program()
        );
        let request = CompileRequest {
            sources: sources.to_vec(),
            class_output: class_output.to_path_buf(),
        };
        let output = self.host.invoke(&request)?;

        for diagnostic in output.diagnostics.iter() {
            debug!("{}: {diagnostic}", diagnostic.severity);
        }

        if output.success && !output.diagnostics.has_errors() {
            return Ok(output.diagnostics);
        }

        let mut report = output.diagnostics.error_report();
        if report.is_empty() {
            report = format!("\n{} exited with a failure status", self.host.program());
            for line in &output.unparsed {
                report.push('\n');
                report.push_str(line);
            }
        }
        Err(CompileError::Failed {
            report,
            diagnostics: output.diagnostics,
        })
    }
}
