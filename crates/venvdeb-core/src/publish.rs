//! Publishing built packages to the remote apt repository
//!
//! The repository is an architecture-partitioned pool on a remote host. A
//! run makes exactly two remote-administration invocations over ssh: one
//! before the upload (idempotently creates the pool directories) and one
//! after (signs the new package and rebuilds the index metadata). The
//! archive itself is transferred once per architecture with rsync.

use camino::{Utf8Path, Utf8PathBuf};
use tokio::process::Command;

use crate::command::run_logged;
use crate::config::PublishConfig;
use crate::{Error, Result};

/// Pool directory for one release/component/architecture,
/// `<pool_root>/dists/<release>/<component>/binary-<arch>/`
pub fn pool_dir(pool_root: &Utf8Path, release: &str, component: &str, arch: &str) -> Utf8PathBuf {
    pool_root
        .join("dists")
        .join(release)
        .join(component)
        .join(format!("binary-{}", arch))
}

/// Argument list for the remote repository-administration command.
///
/// The same invocation runs before and after the upload; the remote command
/// both ensures the pool layout exists and re-signs/re-indexes it.
pub fn admin_args(config: &PublishConfig, release: &str, component: &str) -> Vec<String> {
    vec![
        config.admin_command.clone(),
        "--pool".into(),
        config.pool_root.to_string(),
        "--release".into(),
        release.into(),
        "--component".into(),
        component.into(),
        "--architectures".into(),
        config.architectures.join(","),
        "--sign".into(),
    ]
}

/// rsync destination for one architecture's pool directory
pub fn rsync_destination(
    config: &PublishConfig,
    release: &str,
    component: &str,
    arch: &str,
) -> String {
    format!(
        "{}:{}/",
        config.host,
        pool_dir(&config.pool_root, release, component, arch)
    )
}

/// The publishing pipeline
pub struct Publisher<'a> {
    config: &'a PublishConfig,
}

impl<'a> Publisher<'a> {
    /// Create a publisher for the configured repository host
    pub fn new(config: &'a PublishConfig) -> Self {
        Self { config }
    }

    /// Upload an archive under the given release and component and leave the
    /// remote repository metadata consistent. Fail-fast: the first failing
    /// remote operation aborts the run, with no retries.
    pub async fn publish(&self, deb: &Utf8Path, release: &str, component: &str) -> Result<()> {
        if !deb.is_file() {
            return Err(Error::publish(
                format!("{} does not exist", deb),
                "Pass the path of a built .deb archive",
            ));
        }

        tracing::info!(
            release = release,
            component = component,
            "Publishing {} to {}",
            deb,
            self.config.host
        );

        // First admin pass creates the pool directories for every architecture
        self.remote_admin(release, component).await?;

        for arch in &self.config.architectures {
            let dest = rsync_destination(self.config, release, component, arch);
            tracing::info!("Uploading to {}", dest);

            let mut cmd = Command::new("rsync");
            cmd.args(["-av", deb.as_str(), &dest]);
            run_logged(&mut cmd, &format!("rsync to binary-{}", arch)).await?;
        }

        // Second admin pass signs the new package and rebuilds the indexes
        self.remote_admin(release, component).await?;

        tracing::info!("Publish complete");
        Ok(())
    }

    async fn remote_admin(&self, release: &str, component: &str) -> Result<()> {
        let mut cmd = Command::new("ssh");
        cmd.arg(&self.config.host)
            .args(admin_args(self.config, release, component));
        run_logged(&mut cmd, "remote repository admin").await
    }
}
