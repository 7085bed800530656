//! nativex CLI - ahead-of-time processing for statically initialized applications

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};

mod config;
mod generate;
mod hints;
mod process;

use config::ConfigArgs;

#[derive(Parser)]
#[command(name = "nativex")]
#[command(version = nativex_aot::VERSION)]
#[command(about = "Ahead-of-time processing for native images", long_about = None)]
struct Cli {
    /// Increase log output (-v for debug, -vv for trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline: generate, compile, write hints and collect artifacts
    Process {
        #[command(flatten)]
        config: ConfigArgs,
    },

    /// Print the generated sources without writing anything
    Generate {
        #[command(flatten)]
        config: ConfigArgs,
    },

    /// Print the native-image configuration files the graph produces
    Hints {
        #[command(flatten)]
        config: ConfigArgs,
    },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Process { config } => process::run(&config),
        Commands::Generate { config } => generate::run(&config),
        Commands::Hints { config } => hints::run(&config),
    }
}
