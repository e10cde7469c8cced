//! Package command implementation

use camino::{Utf8Path, Utf8PathBuf};
use clap::Args;
use miette::{IntoDiagnostic, Result};
use tokio::signal::unix::{signal, SignalKind};
use venvdeb_core::config::Config;
use venvdeb_core::package::{PackageOptions, Packager};

/// Arguments for the package command
#[derive(Debug, Args)]
pub struct PackageArgs {
    /// Root of the built virtual environment
    pub env_root: Utf8PathBuf,

    /// Package name (default: the project's declared name)
    pub name: Option<String>,

    /// Additional arguments forwarded verbatim to fpm
    #[arg(last = true)]
    pub fpm_args: Vec<String>,
}

/// Run the package command
pub async fn run(working_dir: &Utf8Path, args: PackageArgs) -> Result<()> {
    let config = Config::load(working_dir).into_diagnostic()?;
    let packager = Packager::new(&config.package, working_dir.to_path_buf());

    let options = PackageOptions {
        name: args.name,
        extra_fpm_args: args.fpm_args,
    };

    // SIGINT and SIGTERM cancel the pipeline future; the rewrite guard
    // inside it is dropped on cancellation and restores the environment's
    // build paths before the process exits
    let mut sigterm = signal(SignalKind::terminate()).into_diagnostic()?;
    let deb = tokio::select! {
        result = packager.run(&args.env_root, &options) => result.into_diagnostic()?,
        _ = tokio::signal::ctrl_c() => {
            return Err(miette::miette!("Interrupted; environment restored"));
        }
        _ = sigterm.recv() => {
            return Err(miette::miette!("Terminated; environment restored"));
        }
    };

    println!("{}", deb);
    Ok(())
}
