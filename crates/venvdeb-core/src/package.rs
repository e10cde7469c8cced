//! Debian package assembly
//!
//! This module orchestrates the packaging pipeline: metadata collection,
//! stale artifact removal, the reversible prefix rewrite, test bundling and
//! the fpm invocation. The hand-off to the publisher is the produced `.deb`
//! file in the working directory.

use camino::{Utf8Path, Utf8PathBuf};
use chrono::Local;
use tokio::process::Command;

use crate::command::run_logged;
use crate::config::PackageConfig;
use crate::provenance::GitInfo;
use crate::rewrite::PathRewrite;
use crate::sdist;
use crate::venv::{render_build_info, write_build_info, ProjectMetadata, VirtualEnv, BUILD_INFO_FILE};
use crate::{Error, Result};

/// Payload paths packaged relative to the environment root
const PAYLOAD_PATHS: &[&str] = &["bin", "lib", "test", BUILD_INFO_FILE];

/// Options for a packaging run
#[derive(Debug, Default)]
pub struct PackageOptions {
    /// Package name override; defaults to the project's declared name
    pub name: Option<String>,

    /// Additional arguments forwarded verbatim to fpm
    pub extra_fpm_args: Vec<String>,
}

/// Inputs to the fpm invocation, kept as plain data so the argument list
/// can be built and tested without running anything
#[derive(Debug)]
pub struct FpmInvocation<'a> {
    pub name: &'a str,
    pub version: &'a str,
    pub iteration: &'a str,
    pub license: &'a str,
    pub vendor: &'a str,
    pub maintainer: &'a str,
    pub url: &'a str,
    pub commit: &'a str,
    pub description: &'a str,
    pub prefix: &'a Utf8Path,
    pub env_root: &'a Utf8Path,
    pub after_install: Option<&'a Utf8Path>,
    pub extra_args: &'a [String],
}

/// Build the complete fpm argument list for a dir -> deb package
pub fn build_fpm_args(inv: &FpmInvocation<'_>) -> Vec<String> {
    let mut args: Vec<String> = vec![
        "-s".into(),
        "dir".into(),
        "-t".into(),
        "deb".into(),
        "-n".into(),
        inv.name.into(),
        "-v".into(),
        inv.version.into(),
        "--iteration".into(),
        inv.iteration.into(),
        "--license".into(),
        inv.license.into(),
        "--vendor".into(),
        inv.vendor.into(),
        "--maintainer".into(),
        inv.maintainer.into(),
        "--url".into(),
        inv.url.into(),
        "--deb-field".into(),
        format!("Commit: {}", inv.commit),
        "--description".into(),
        inv.description.into(),
        "--prefix".into(),
        inv.prefix.to_string(),
        "-C".into(),
        inv.env_root.to_string(),
    ];

    if let Some(hook) = inv.after_install {
        args.push("--after-install".into());
        args.push(hook.to_string());
    }

    args.extend(inv.extra_args.iter().cloned());
    args.extend(PAYLOAD_PATHS.iter().map(|p| p.to_string()));

    args
}

/// The packaging pipeline
pub struct Packager<'a> {
    config: &'a PackageConfig,
    working_dir: Utf8PathBuf,
}

impl<'a> Packager<'a> {
    /// Create a packager producing artifacts in `working_dir`
    pub fn new(config: &'a PackageConfig, working_dir: Utf8PathBuf) -> Self {
        Self {
            config,
            working_dir,
        }
    }

    /// Run the full pipeline and return the path of the produced `.deb`.
    ///
    /// The environment directory is left in its pre-run state: the prefix
    /// rewrite is guarded and restored on every exit route, including
    /// cancellation of this future.
    pub async fn run(&self, env_root: &Utf8Path, options: &PackageOptions) -> Result<Utf8PathBuf> {
        let env = VirtualEnv::open(env_root)?;

        let metadata = env
            .project_metadata(&self.config.fallback_maintainer)
            .await?;
        let name = options.name.clone().unwrap_or_else(|| metadata.name.clone());

        let git = GitInfo::collect(&env.root).await?;

        let prefix = self.config.prefix_root.join(&name);
        let now = Local::now();
        let version = now.format("%Y%m%d%H%M%S").to_string();
        let packaged_on = now.format("%Y-%m-%d %H:%M:%S").to_string();

        let description = format!(
            "{}\n{}\ncommit: {}\nbranch: {}",
            metadata.description, metadata.long_description, git.commit, git.branch
        );

        tracing::info!(
            name = %name,
            version = %version,
            iteration = %git.short_commit,
            "Packaging {}",
            env.root
        );

        let info = render_build_info(&name, &version, &packaged_on, &git, &description);
        write_build_info(&env, &info)?;

        for stale in remove_stale_debs(&self.working_dir, &name)? {
            tracing::info!("Removed stale artifact {}", stale);
        }

        // Everything between apply and restore runs with install paths baked
        // into the environment; the guard undoes that on any exit
        let mut guard = PathRewrite::apply(&env.root, env.root.as_str(), prefix.as_str())?;

        let fpm_result = self
            .assemble(
                &env,
                &metadata,
                &name,
                &git,
                &version,
                &prefix,
                &description,
                options,
            )
            .await;

        // Restore before inspecting the fpm result so a packaging failure
        // still leaves the environment with build-time paths
        let restore_result = guard.restore();
        fpm_result?;
        restore_result?;

        let deb = find_output_deb(&self.working_dir, &name)?;
        tracing::info!("Built {}", deb);
        Ok(deb)
    }

    /// Steps that run while the rewrite is applied: test bundling and fpm
    #[allow(clippy::too_many_arguments)]
    async fn assemble(
        &self,
        env: &VirtualEnv,
        metadata: &ProjectMetadata,
        package_name: &str,
        git: &GitInfo,
        version: &str,
        prefix: &Utf8Path,
        description: &str,
        options: &PackageOptions,
    ) -> Result<()> {
        let dist_dir = env.root.join(&self.config.dist_dir);
        let zip = sdist::ensure_sdist(env, &dist_dir, &metadata.name).await?;
        sdist::unpack_into(&zip, &env.root.join("test"))?;

        let hook = self.post_install_hook(package_name);
        if let Some(ref hook) = hook {
            tracing::info!("Using post-install hook {}", hook);
        }

        let args = build_fpm_args(&FpmInvocation {
            name: package_name,
            version,
            iteration: &git.short_commit,
            license: &self.config.license,
            vendor: &self.config.vendor,
            maintainer: &metadata.maintainer,
            url: &git.remote_url,
            commit: &git.commit,
            description,
            prefix,
            env_root: &env.root,
            after_install: hook.as_deref(),
            extra_args: &options.extra_fpm_args,
        });

        let mut cmd = Command::new("fpm");
        cmd.args(&args).current_dir(&self.working_dir);
        run_logged(&mut cmd, "fpm").await
    }

    /// Path of the post-install hook for this package, if one exists under
    /// the scripts directory convention `<scripts_dir>/<name>/post_install`
    fn post_install_hook(&self, name: &str) -> Option<Utf8PathBuf> {
        let scripts_dir = if self.config.scripts_dir.is_absolute() {
            self.config.scripts_dir.clone()
        } else {
            self.working_dir.join(&self.config.scripts_dir)
        };

        let hook = scripts_dir.join(name).join("post_install");
        hook.is_file().then_some(hook)
    }
}

/// Remove every `<name>*.deb` in the working directory, returning the
/// removed paths. Leaves no ambiguity about which file the run produced.
pub fn remove_stale_debs(working_dir: &Utf8Path, name: &str) -> Result<Vec<Utf8PathBuf>> {
    let mut removed = Vec::new();

    for entry in working_dir.read_dir_utf8()? {
        let entry = entry?;
        if entry.file_type()?.is_file() && matches_deb(entry.file_name(), name) {
            std::fs::remove_file(entry.path())?;
            removed.push(entry.path().to_path_buf());
        }
    }

    removed.sort();
    Ok(removed)
}

/// Resolve the produced archive: exactly one `<name>*.deb` must exist.
pub fn find_output_deb(working_dir: &Utf8Path, name: &str) -> Result<Utf8PathBuf> {
    let mut matches = Vec::new();

    for entry in working_dir.read_dir_utf8()? {
        let entry = entry?;
        if entry.file_type()?.is_file() && matches_deb(entry.file_name(), name) {
            matches.push(entry.path().to_path_buf());
        }
    }

    match matches.len() {
        0 => Err(Error::package(
            format!("fpm produced no {}*.deb in {}", name, working_dir),
            "Check the fpm output for errors",
        )),
        1 => Ok(matches.remove(0)),
        _ => {
            matches.sort();
            Err(Error::package(
                format!(
                    "Multiple archives match {}*.deb in {}: {}",
                    name,
                    working_dir,
                    matches
                        .iter()
                        .map(|p| p.file_name().unwrap_or(p.as_str()))
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
                "Remove the extra archives and repackage",
            ))
        }
    }
}

fn matches_deb(file_name: &str, name: &str) -> bool {
    file_name.starts_with(name) && file_name.ends_with(".deb")
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8Path;

    #[test]
    fn test_build_fpm_args_basic() {
        let args = build_fpm_args(&FpmInvocation {
            name: "app",
            version: "20260830120000",
            iteration: "deadbee",
            license: "MIT",
            vendor: "acme",
            maintainer: "ops@acme.example",
            url: "git@example.com:acme/app.git",
            commit: "deadbeefdeadbeef",
            description: "An app",
            prefix: Utf8Path::new("/opt/app"),
            env_root: Utf8Path::new("/build/app-venv"),
            after_install: None,
            extra_args: &[],
        });

        assert_eq!(&args[..4], &["-s", "dir", "-t", "deb"]);
        assert!(args.windows(2).any(|w| w == ["-n", "app"]));
        assert!(args.windows(2).any(|w| w == ["--iteration", "deadbee"]));
        assert!(args.windows(2).any(|w| w == ["--prefix", "/opt/app"]));
        assert!(args.windows(2).any(|w| w == ["-C", "/build/app-venv"]));
        assert!(args
            .windows(2)
            .any(|w| w == ["--deb-field", "Commit: deadbeefdeadbeef"]));
        assert!(!args.iter().any(|a| a == "--after-install"));

        // Payload paths come last
        assert_eq!(&args[args.len() - 4..], &["bin", "lib", "test", "build_info.txt"]);
    }

    #[test]
    fn test_build_fpm_args_hook_and_extras() {
        let extra = vec!["--deb-no-default-config-files".to_string()];
        let args = build_fpm_args(&FpmInvocation {
            name: "app",
            version: "1",
            iteration: "a",
            license: "MIT",
            vendor: "acme",
            maintainer: "m",
            url: "u",
            commit: "c",
            description: "d",
            prefix: Utf8Path::new("/opt/app"),
            env_root: Utf8Path::new("/build/app-venv"),
            after_install: Some(Utf8Path::new("/build/scripts/app/post_install")),
            extra_args: &extra,
        });

        assert!(args
            .windows(2)
            .any(|w| w == ["--after-install", "/build/scripts/app/post_install"]));

        // Extra args are forwarded verbatim, before the payload paths
        let extra_pos = args
            .iter()
            .position(|a| a == "--deb-no-default-config-files")
            .unwrap();
        assert!(extra_pos < args.len() - 4);
    }

    #[test]
    fn test_remove_stale_debs() {
        let temp_dir = tempfile::tempdir().unwrap();
        let dir = Utf8Path::from_path(temp_dir.path()).unwrap();
        std::fs::write(dir.join("app_1.0_amd64.deb"), "").unwrap();
        std::fs::write(dir.join("app_2.0_amd64.deb"), "").unwrap();
        std::fs::write(dir.join("other_1.0_amd64.deb"), "").unwrap();
        std::fs::write(dir.join("app.tar.gz"), "").unwrap();

        let removed = remove_stale_debs(dir, "app").unwrap();

        assert_eq!(removed.len(), 2);
        assert!(!dir.join("app_1.0_amd64.deb").exists());
        assert!(!dir.join("app_2.0_amd64.deb").exists());
        // Non-matching files stay
        assert!(dir.join("other_1.0_amd64.deb").exists());
        assert!(dir.join("app.tar.gz").exists());
    }

    #[test]
    fn test_find_output_deb_exactly_one() {
        let temp_dir = tempfile::tempdir().unwrap();
        let dir = Utf8Path::from_path(temp_dir.path()).unwrap();
        std::fs::write(dir.join("app_1.0_amd64.deb"), "").unwrap();

        let deb = find_output_deb(dir, "app").unwrap();
        assert_eq!(deb.file_name(), Some("app_1.0_amd64.deb"));
    }

    #[test]
    fn test_find_output_deb_zero_is_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        let dir = Utf8Path::from_path(temp_dir.path()).unwrap();

        let err = find_output_deb(dir, "app").unwrap_err();
        assert!(matches!(err, Error::Package { .. }));
    }

    #[test]
    fn test_find_output_deb_multiple_is_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        let dir = Utf8Path::from_path(temp_dir.path()).unwrap();
        std::fs::write(dir.join("app_1.0_amd64.deb"), "").unwrap();
        std::fs::write(dir.join("app_2.0_amd64.deb"), "").unwrap();

        let err = find_output_deb(dir, "app").unwrap_err();
        assert!(matches!(err, Error::Package { .. }));
    }

    #[test]
    fn test_post_install_hook_detection() {
        let temp_dir = tempfile::tempdir().unwrap();
        let dir = Utf8Path::from_path(temp_dir.path()).unwrap();
        let config = crate::config::PackageConfig::default();
        let packager = Packager::new(&config, dir.to_path_buf());

        assert!(packager.post_install_hook("app").is_none());

        let hook_dir = dir.join("scripts/app");
        std::fs::create_dir_all(&hook_dir).unwrap();
        std::fs::write(hook_dir.join("post_install"), "#!/bin/sh\n").unwrap();

        let hook = packager.post_install_hook("app").unwrap();
        assert!(hook.as_str().ends_with("scripts/app/post_install"));
    }
}
