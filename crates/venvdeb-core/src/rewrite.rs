//! Reversible install-prefix rewriting
//!
//! fpm copies file contents verbatim, so console entry-point scripts and
//! `.pth` path-configuration files must carry the final install prefix while
//! the package is assembled. The environment has to stay usable for local
//! testing afterwards, so the rewrite is a scoped mutation: applying it
//! returns a guard whose `Drop` restores the build-time paths on every exit
//! route, including errors, panics and cancellation.
//!
//! **Note**: two concurrent runs against the same environment directory are
//! not supported; no locking is provided.

use camino::{Utf8Path, Utf8PathBuf};
use walkdir::WalkDir;

use crate::{Error, Result};

/// Guard over the prefix rewrite applied to an environment root.
///
/// Only files that actually contained the build path are recorded, so
/// `restore` touches exactly the files `apply` changed.
#[derive(Debug)]
pub struct PathRewrite {
    build_path: String,
    install_prefix: String,
    rewritten: Vec<Utf8PathBuf>,
    restored: bool,
}

impl PathRewrite {
    /// Rewrite the build-time path to the install prefix in every console
    /// script under `bin/` and every `.pth` file under `lib/`.
    pub fn apply(env_root: &Utf8Path, build_path: &str, install_prefix: &str) -> Result<Self> {
        let mut guard = Self {
            build_path: build_path.to_string(),
            install_prefix: install_prefix.to_string(),
            rewritten: Vec::new(),
            restored: false,
        };

        for path in candidate_files(env_root)? {
            if guard.substitute(&path, build_path, install_prefix)? {
                tracing::debug!(file = %path, "Rewrote install prefix");
                guard.rewritten.push(path);
            }
        }

        tracing::info!(
            files = guard.rewritten.len(),
            "Rewrote {} -> {}",
            build_path,
            install_prefix
        );

        Ok(guard)
    }

    /// Reverse the substitution on every rewritten file.
    ///
    /// Idempotent: a second call is a no-op, so an explicit restore followed
    /// by the guard dropping does not double-substitute.
    pub fn restore(&mut self) -> Result<()> {
        if self.restored {
            return Ok(());
        }

        let build_path = self.build_path.clone();
        let install_prefix = self.install_prefix.clone();

        for path in std::mem::take(&mut self.rewritten) {
            self.substitute(&path, &install_prefix, &build_path)?;
            tracing::debug!(file = %path, "Restored build path");
        }

        self.restored = true;
        Ok(())
    }

    /// Files changed by the rewrite (for reporting and tests)
    pub fn rewritten_files(&self) -> &[Utf8PathBuf] {
        &self.rewritten
    }

    fn substitute(&self, path: &Utf8Path, from: &str, to: &str) -> Result<bool> {
        // Non-UTF-8 files under bin/ (compiled helpers) are left untouched
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::InvalidData => return Ok(false),
            Err(e) => return Err(e.into()),
        };

        if !content.contains(from) {
            return Ok(false);
        }

        let replaced = content.replace(from, to);
        std::fs::write(path, replaced).map_err(|e| {
            Error::rewrite(
                format!("Failed to write {}: {}", path, e),
                "Check permissions on the environment directory",
            )
        })?;

        Ok(true)
    }
}

impl Drop for PathRewrite {
    fn drop(&mut self) {
        if let Err(e) = self.restore() {
            tracing::error!(
                "Failed to restore build paths: {}; the environment may still \
                 contain {} in its scripts",
                e,
                self.install_prefix
            );
        }
    }
}

/// Collect rewrite candidates: regular files directly under `bin/` and
/// `.pth` files anywhere under `lib/`.
fn candidate_files(env_root: &Utf8Path) -> Result<Vec<Utf8PathBuf>> {
    let mut files = Vec::new();

    let bin_dir = env_root.join("bin");
    if bin_dir.is_dir() {
        for entry in bin_dir.read_dir_utf8()? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                files.push(entry.path().to_path_buf());
            }
        }
    }

    let lib_dir = env_root.join("lib");
    if lib_dir.is_dir() {
        for entry in WalkDir::new(&lib_dir).follow_links(false) {
            let entry = entry.map_err(|e| {
                Error::rewrite(
                    format!("Failed to read directory entry: {}", e),
                    "Check permissions on the environment directory",
                )
            })?;

            if !entry.file_type().is_file() {
                continue;
            }

            let path = Utf8Path::from_path(entry.path()).ok_or_else(|| {
                Error::rewrite(
                    format!("Path is not valid UTF-8: {:?}", entry.path()),
                    "Ensure all file paths contain only valid UTF-8 characters",
                )
            })?;

            if path.extension() == Some("pth") {
                files.push(path.to_path_buf());
            }
        }
    }

    files.sort();
    Ok(files)
}
