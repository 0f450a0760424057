use anyhow::{Context, Result};
use bdg_replication::{cli::Cli, pipeline};
use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber; `--debug` raises everything to TRACE
fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into())
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.debug);

    let config = args
        .analysis_config()
        .context("Failed to load analysis configuration")?;
    let report = pipeline::run(&config).context("Replication pipeline failed")?;

    println!("{}", report.display());
    Ok(())
}
