use std::env;
use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::Parser;
use strata_config::ConfigReader;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Assemble and resolve a layered configuration file
#[derive(Parser, Debug)]
#[command(name = "resolve-config")]
#[command(about = "Assemble and resolve layered JSON configuration files", long_about = None)]
struct Args {
    /// Path to the root configuration file
    #[arg(long, value_name = "FILE")]
    input: PathBuf,

    /// Node path to extract from the resolved configuration
    #[arg(long, value_name = "PATH", default_value = "/")]
    source_node: String,

    /// Node path the extracted node is wrapped under
    #[arg(long, value_name = "PATH", default_value = "/")]
    destination_node: String,

    /// Maximum number of reference resolution cycles
    #[arg(long, value_name = "N", default_value_t = 100,
          value_parser = clap::value_parser!(u32).range(1..))]
    max_cycles: u32,

    /// Print compact JSON instead of pretty-printed output
    #[arg(long)]
    compact: bool,
}

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = run() {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let args = Args::parse();

    let working_dir = env::current_dir().context("Failed to determine the current directory")?;

    let mut reader = ConfigReader::new();
    reader.set_reference_resolution_max_cycles(args.max_cycles);

    let resolved = reader
        .read(
            &args.input,
            &working_dir,
            &args.source_node,
            &args.destination_node,
        )
        .with_context(|| format!("Failed to read configuration from {}", args.input.display()))?;

    let json = resolved
        .to_json()
        .context("resolved configuration still contains unresolved nodes")?;

    let output = if args.compact {
        serde_json::to_string(&json)?
    } else {
        serde_json::to_string_pretty(&json)?
    };
    println!("{output}");

    Ok(())
}
