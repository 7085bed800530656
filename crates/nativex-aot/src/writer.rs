//! Writing generated artifacts to disk.
//!
//! Sources go under the source output root, hint files and the
//! `native-image.properties` startup arguments go under
//! `META-INF/native-image/<group>/<artifact>/` in the resource output root.
//! Nothing is rolled back on failure; the orchestrator stops at the first
//! error.

use log::{debug, warn};
use std::io::Write as _;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::codegen::GeneratedUnits;
use crate::hint::config::NativeConfiguration;
use crate::hint::HintRegistry;
use crate::settings::ProcessSettings;

/// File holding the native compiler's startup arguments.
pub const STARTUP_ARGUMENTS_FILE: &str = "native-image.properties";

/// Fixed native compiler arguments following `-H:Class=<application>`.
pub const STARTUP_ARGUMENTS: &[&str] = &[
    "--allow-incomplete-classpath",
    "--report-unsupported-elements-at-runtime",
    "--no-fallback",
    "--install-exit-handlers",
];

/// Errors raised while writing artifacts.
#[derive(Error, Debug)]
pub enum WriteError {
    #[error("failed to write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to serialize hint configuration: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl WriteError {
    fn io(path: &Path) -> impl FnOnce(std::io::Error) -> Self + '_ {
        move |source| Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// What happened to `native-image.properties`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartupArguments {
    /// The file did not exist and was written.
    Written,
    /// The file existed with the expected content.
    Kept,
    /// The file existed with different content and was left alone.
    Stale,
    /// The file existed with different content and was rewritten.
    Refreshed,
}

/// Write every unit to `source_dir/<package path>/<Simple>.java`.
///
/// Returns the written paths, main unit first.
pub fn write_sources(units: &GeneratedUnits, source_dir: &Path) -> Result<Vec<PathBuf>, WriteError> {
    let mut written = Vec::with_capacity(units.len());
    for unit in units.iter() {
        let path = source_dir.join(unit.name.relative_source_path());
        write_file(&path, &unit.body)?;
        debug!("wrote source {}", path.display());
        written.push(path);
    }
    Ok(written)
}

/// Write one configuration file per non-empty hint category.
///
/// Returns the written paths in category order.
pub fn write_hints(
    hints: &HintRegistry,
    resource_dir: &Path,
    group_id: &str,
    artifact_id: &str,
) -> Result<Vec<PathBuf>, WriteError> {
    let dir = native_image_dir(resource_dir, group_id, artifact_id);
    let configuration = NativeConfiguration::from_registry(hints)?;

    let mut written = Vec::new();
    for file in configuration.files() {
        let path = dir.join(file.name);
        write_file(&path, &file.contents)?;
        debug!("wrote hints {}", path.display());
        written.push(path);
    }
    Ok(written)
}

/// Write `native-image.properties` for the configured application.
///
/// An existing file is only replaced when the settings ask for it.
pub fn write_startup_arguments(settings: &ProcessSettings) -> Result<StartupArguments, WriteError> {
    let path = settings.native_image_dir().join(STARTUP_ARGUMENTS_FILE);
    let expected = startup_arguments(&settings.application.canonical_name());

    if path.exists() {
        let existing = std::fs::read_to_string(&path).map_err(WriteError::io(&path))?;
        if existing == expected {
            debug!("startup arguments up to date at {}", path.display());
            return Ok(StartupArguments::Kept);
        }
        if !settings.overwrite_startup_arguments {
            warn!(
                "{} differs from the generated arguments and was kept; set native-image.overwrite-startup-arguments to refresh it",
                path.display()
            );
            return Ok(StartupArguments::Stale);
        }
        write_file(&path, &expected)?;
        debug!("refreshed startup arguments at {}", path.display());
        return Ok(StartupArguments::Refreshed);
    }

    write_file(&path, &expected)?;
    debug!("wrote startup arguments {}", path.display());
    Ok(StartupArguments::Written)
}

/// Render the properties file content for `application`.
pub fn startup_arguments(application: &str) -> String {
    let mut out = String::new();
    out.push_str(&format!("Args = -H:Class={application}"));
    for argument in STARTUP_ARGUMENTS {
        out.push_str(" \\\n");
        out.push_str(argument);
    }
    out.push('\n');
    out
}

/// `META-INF/native-image/<group>/<artifact>` under `resource_dir`.
pub fn native_image_dir(resource_dir: &Path, group_id: &str, artifact_id: &str) -> PathBuf {
    resource_dir
        .join("META-INF")
        .join("native-image")
        .join(group_id)
        .join(artifact_id)
}

fn write_file(path: &Path, contents: &str) -> Result<(), WriteError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(WriteError::io(parent))?;
    }
    let mut file = std::fs::File::create(path).map_err(WriteError::io(path))?;
    file.write_all(contents.as_bytes())
        .map_err(WriteError::io(path))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::GeneratedUnit;
    use crate::hint::{Member, Mode};
    use crate::types::ClassName;
    use tempfile::TempDir;

    fn name(s: &str) -> ClassName {
        ClassName::parse(s).unwrap()
    }

    fn settings(root: &Path) -> ProcessSettings {
        ProcessSettings::maven(
            name("com.example.nativex.sample.basic.BasicApplication"),
            "com.example",
            "basic-native-sample",
            root,
        )
        .unwrap()
    }

    #[test]
    fn sources_follow_package_layout() {
        let temp = TempDir::new().unwrap();
        let units = GeneratedUnits {
            main: GeneratedUnit {
                name: name("com.example.App__ApplicationContextInitializer"),
                body: String::from("class A {}\n"),
            },
            supporting: vec![GeneratedUnit {
                name: name("com.example.App__ReflectiveAccess"),
                body: String::from("class B {}\n"),
            }],
        };

        let written = write_sources(&units, temp.path()).unwrap();
        assert_eq!(
            written,
            vec![
                temp.path().join("com/example/App__ApplicationContextInitializer.java"),
                temp.path().join("com/example/App__ReflectiveAccess.java"),
            ]
        );
        assert_eq!(std::fs::read_to_string(&written[1]).unwrap(), "class B {}\n");
    }

    #[test]
    fn hints_are_written_per_category() {
        let temp = TempDir::new().unwrap();
        let mut hints = HintRegistry::new();
        hints.register_reflection(
            name("com.example.App__ApplicationContextInitializer"),
            Member::constructor(Vec::new()),
            Mode::Invoke,
            Some(name("com.example.App")),
        );

        let written = write_hints(&hints, temp.path(), "com.example", "app").unwrap();
        assert_eq!(
            written,
            vec![temp
                .path()
                .join("META-INF/native-image/com.example/app/reflect-config.json")]
        );

        let empty = write_hints(&HintRegistry::new(), temp.path(), "com.example", "other").unwrap();
        assert!(empty.is_empty());
        assert!(!temp.path().join("META-INF/native-image/com.example/other").exists());
    }

    #[test]
    fn startup_arguments_content() {
        assert_eq!(
            startup_arguments("com.example.App"),
            "Args = -H:Class=com.example.App \\\n--allow-incomplete-classpath \\\n--report-unsupported-elements-at-runtime \\\n--no-fallback \\\n--install-exit-handlers\n"
        );
    }

    #[test]
    fn startup_arguments_are_idempotent() {
        let temp = TempDir::new().unwrap();
        let settings = settings(temp.path());
        let path = settings.native_image_dir().join(STARTUP_ARGUMENTS_FILE);

        assert_eq!(write_startup_arguments(&settings).unwrap(), StartupArguments::Written);
        let first = std::fs::read(&path).unwrap();
        assert_eq!(write_startup_arguments(&settings).unwrap(), StartupArguments::Kept);
        assert_eq!(std::fs::read(&path).unwrap(), first);
    }

    #[test]
    fn stale_startup_arguments_are_kept_unless_overwrite_is_set() {
        let temp = TempDir::new().unwrap();
        let mut settings = settings(temp.path());
        let path = settings.native_image_dir().join(STARTUP_ARGUMENTS_FILE);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "Args = -H:Class=com.example.Old\n").unwrap();

        assert_eq!(write_startup_arguments(&settings).unwrap(), StartupArguments::Stale);
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "Args = -H:Class=com.example.Old\n"
        );

        settings.overwrite_startup_arguments = true;
        assert_eq!(write_startup_arguments(&settings).unwrap(), StartupArguments::Refreshed);
        assert!(std::fs::read_to_string(&path)
            .unwrap()
            .starts_with("Args = -H:Class=com.example.nativex.sample.basic.BasicApplication \\\n"));
    }

    #[test]
    fn unwritable_target_reports_path() {
        let temp = TempDir::new().unwrap();
        let blocker = temp.path().join("blocked");
        std::fs::write(&blocker, "file, not a directory").unwrap();

        let units = GeneratedUnits {
            main: GeneratedUnit {
                name: name("com.example.App__ApplicationContextInitializer"),
                body: String::new(),
            },
            supporting: Vec::new(),
        };
        match write_sources(&units, &blocker) {
            Err(WriteError::Io { path, .. }) => assert!(path.starts_with(&blocker)),
            other => panic!("expected an io error, got {other:?}"),
        }
    }
}
