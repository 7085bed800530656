//! `nativex generate`: print the generated sources.

use anyhow::{Context, Result};
use nativex_aot::{GenerationContext, Generator};

use crate::config::ConfigArgs;

pub fn run(args: &ConfigArgs) -> Result<()> {
    let graph = args.graph()?;
    let mut context = GenerationContext::new();
    let units = Generator::new()
        .generate(&graph, &mut context)
        .with_context(|| format!("Failed to generate code for {}", graph.application))?;

    for unit in units.iter() {
        println!("// {}", unit.name.relative_source_path().display());
        print!("{}", unit.body);
        println!();
    }
    Ok(())
}
