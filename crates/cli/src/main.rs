//! searchhop CLI — the main entry point.
//!
//! Runs one research query through the multi-hop search agent and prints
//! the answer. With `--print-config` it prints a starter config file
//! instead.

use clap::Parser;

mod commands;

/// Asked when no query is given on the command line.
const DEFAULT_QUERY: &str = "Using the most recent 10-Q reports in 2025, which line of item contribute to the most expense for Alphabet Inc ?";

#[derive(Parser)]
#[command(
    name = "searchhop",
    about = "searchhop: answer questions by searching the web in several hops",
    version,
    author
)]
struct Cli {
    /// The question to research
    query: Option<String>,

    /// Override the hop budget from the config file
    #[arg(long)]
    max_hops: Option<u32>,

    /// Print a default config file and exit
    #[arg(long)]
    print_config: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Credentials may live in a .env file next to the binary's working dir
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    if cli.print_config {
        commands::config_cmd::print_default();
        return Ok(());
    }

    let query = cli.query.unwrap_or_else(|| DEFAULT_QUERY.to_string());
    commands::agent::run(&query, cli.max_hops).await?;
    Ok(())
}
