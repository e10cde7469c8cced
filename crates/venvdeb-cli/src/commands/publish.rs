//! Publish command implementation

use camino::{Utf8Path, Utf8PathBuf};
use clap::Args;
use miette::{IntoDiagnostic, Result};
use venvdeb_core::config::Config;
use venvdeb_core::publish::Publisher;

/// Arguments for the publish command
#[derive(Debug, Args)]
pub struct PublishArgs {
    /// Path of the built .deb archive
    pub filename: Utf8PathBuf,

    /// Release name (e.g. "trusty")
    pub release: String,

    /// Component name (e.g. "main")
    pub component: String,
}

/// Run the publish command
pub async fn run(working_dir: &Utf8Path, args: PublishArgs) -> Result<()> {
    let config = Config::load(working_dir).into_diagnostic()?;

    let publisher = Publisher::new(&config.publish);
    publisher
        .publish(&args.filename, &args.release, &args.component)
        .await
        .into_diagnostic()?;

    Ok(())
}
