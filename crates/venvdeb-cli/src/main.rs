//! venvdeb CLI - package Python virtualenvs as Debian packages

use clap::{Parser, Subcommand};
use miette::Result;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;

/// venvdeb - package Python virtualenvs as Debian packages and publish them
#[derive(Debug, Parser)]
#[command(name = "venvdeb")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Build a .deb from a virtual environment
    Package(commands::package::PackageArgs),

    /// Publish a built .deb to the repository host
    Publish(commands::publish::PublishArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let default_filter = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    // Config and artifacts live in the invocation directory
    let working_dir = std::env::current_dir()
        .ok()
        .and_then(|p| camino::Utf8PathBuf::try_from(p).ok())
        .unwrap_or_else(|| camino::Utf8PathBuf::from("."));

    match cli.command {
        Commands::Package(args) => commands::package::run(&working_dir, args).await,
        Commands::Publish(args) => commands::publish::run(&working_dir, args).await,
    }
}
