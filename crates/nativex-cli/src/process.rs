//! `nativex process`: run the whole pipeline.

use anyhow::{Context, Result};
use log::{info, warn};
use nativex_aot::{AotProcess, StartupArguments};

use crate::config::ConfigArgs;

pub fn run(args: &ConfigArgs) -> Result<()> {
    let settings = args.settings()?;
    let graph = args.graph()?;

    let mut process = AotProcess::new(settings);
    let outcome = process
        .run(&graph)
        .with_context(|| format!("AOT processing of {} failed", graph.application))?;

    for warning in outcome.diagnostics.iter().filter(|d| !d.is_error()) {
        warn!("{}: {warning}", warning.severity);
    }
    if outcome.startup_arguments == StartupArguments::Stale {
        warn!("native-image.properties was left unchanged; pass --overwrite-startup-arguments to refresh it");
    }

    info!(
        "generated {} for {}",
        outcome.units.main.name,
        graph.application
    );
    println!(
        "{} source(s) compiled, {} hint file(s) written, {} file(s) collected into {}",
        outcome.sources.len(),
        outcome.hint_files.len(),
        outcome.collected.len(),
        process.settings().classpath_dir.display()
    );
    Ok(())
}
