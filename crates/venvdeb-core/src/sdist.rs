//! Source distribution bundling
//!
//! Integration tests ship inside the deployed artifact: the project's
//! zip-format source distribution is unpacked into a `test` subdirectory of
//! the environment root before packaging. The sdist is built on demand via
//! the project's packaging entry point when the dist directory has none.

use camino::{Utf8Path, Utf8PathBuf};
use tokio::process::Command;

use crate::command::run_logged;
use crate::venv::VirtualEnv;
use crate::{Error, Result};

/// Locate the project's sdist zip in the dist directory.
///
/// Returns `Ok(None)` when no `<name>*.zip` exists. More than one match is
/// an error: silently picking one would make it ambiguous which sources
/// ship as the test payload.
pub fn find_zip(dist_dir: &Utf8Path, name: &str) -> Result<Option<Utf8PathBuf>> {
    if !dist_dir.is_dir() {
        return Ok(None);
    }

    let mut matches = Vec::new();
    for entry in dist_dir.read_dir_utf8()? {
        let entry = entry?;
        let file_name = entry.file_name();
        if entry.file_type()?.is_file()
            && file_name.starts_with(name)
            && file_name.ends_with(".zip")
        {
            matches.push(entry.path().to_path_buf());
        }
    }

    match matches.len() {
        0 => Ok(None),
        1 => Ok(Some(matches.remove(0))),
        _ => {
            matches.sort();
            Err(Error::sdist(
                format!(
                    "Multiple source distributions match {}*.zip in {}: {}",
                    name,
                    dist_dir,
                    matches
                        .iter()
                        .map(|p| p.file_name().unwrap_or(p.as_str()))
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
                "Remove stale zips from the dist directory",
            ))
        }
    }
}

/// Locate the sdist zip, building it first if the dist directory has none.
pub async fn ensure_sdist(env: &VirtualEnv, dist_dir: &Utf8Path, name: &str) -> Result<Utf8PathBuf> {
    if let Some(zip) = find_zip(dist_dir, name)? {
        tracing::debug!(zip = %zip, "Using existing source distribution");
        return Ok(zip);
    }

    tracing::info!("Building source distribution for {}", name);

    let mut cmd = Command::new(env.python());
    cmd.args(["setup.py", "sdist", "--formats=zip"])
        .current_dir(&env.root);
    run_logged(&mut cmd, "setup.py sdist").await?;

    find_zip(dist_dir, name)?.ok_or_else(|| {
        Error::sdist(
            format!("setup.py sdist produced no {}*.zip in {}", name, dist_dir),
            "Check the sdist output for errors",
        )
    })
}

/// Unpack the sdist zip into the test directory.
///
/// Any existing test directory is removed first: the shipped tests are a
/// clean overwrite of the previous contents, never a merge.
pub fn unpack_into(zip: &Utf8Path, test_dir: &Utf8Path) -> Result<()> {
    if test_dir.exists() {
        std::fs::remove_dir_all(test_dir)?;
    }
    std::fs::create_dir_all(test_dir)?;

    let file = std::fs::File::open(zip)?;
    let mut archive = zip::ZipArchive::new(file).map_err(|e| {
        Error::sdist(
            format!("Failed to read {}: {}", zip, e),
            "The source distribution is not a valid zip archive",
        )
    })?;

    archive.extract(test_dir).map_err(|e| {
        Error::sdist(
            format!("Failed to unpack {} into {}: {}", zip, test_dir, e),
            "The source distribution is not a valid zip archive",
        )
    })?;

    tracing::debug!(zip = %zip, "Unpacked source distribution into {}", test_dir);
    Ok(())
}
