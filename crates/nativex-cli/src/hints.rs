//! `nativex hints`: print the native-image configuration a graph produces.

use anyhow::{Context, Result};
use nativex_aot::hint::config::NativeConfiguration;
use nativex_aot::{GenerationContext, Generator};

use crate::config::ConfigArgs;

pub fn run(args: &ConfigArgs) -> Result<()> {
    let graph = args.graph()?;
    let mut context = GenerationContext::new();
    Generator::new()
        .generate(&graph, &mut context)
        .with_context(|| format!("Failed to generate code for {}", graph.application))?;

    let configuration = NativeConfiguration::from_registry(context.hints())
        .context("Failed to render hint configuration")?;
    for file in configuration.files() {
        println!("// {}", file.name);
        print!("{}", file.contents);
    }
    Ok(())
}
