mod cli;
mod data;
mod engine;
mod error;
mod metrics;
mod model;
mod orchestrator;
mod storage;
#[cfg(test)]
mod test_support;
mod text_summary;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: bool) {
    let default = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();
    init_tracing(args.verbose);
    let is_json = args.json && !args.text;

    match cli::run(args).await {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            if is_json {
                // Keep stdout machine-readable on failure too.
                println!("{}", serde_json::json!({ "error": format!("{e:#}") }));
                std::process::exit(1);
            } else {
                Err(e)
            }
        }
    }
}
