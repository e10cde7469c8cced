//! Virtual environment validation and project metadata queries
//!
//! The environment root is the directory tree containing the isolated
//! interpreter, installed libraries and console entry-point scripts for one
//! application, with the project's `setup.py` at its root.

use camino::{Utf8Path, Utf8PathBuf};
use tokio::process::Command;

use crate::command::run_capture;
use crate::provenance::GitInfo;
use crate::{Error, Result};

/// Name of the metadata file shipped inside the package
pub const BUILD_INFO_FILE: &str = "build_info.txt";

/// A validated Python virtual environment
#[derive(Debug, Clone)]
pub struct VirtualEnv {
    /// Canonicalized environment root
    pub root: Utf8PathBuf,
}

/// Project metadata queried from the environment's interpreter
#[derive(Debug, Clone)]
pub struct ProjectMetadata {
    pub name: String,
    pub version: String,
    pub description: String,
    pub long_description: String,
    pub maintainer: String,
}

impl VirtualEnv {
    /// Open and validate a virtual environment.
    ///
    /// Fails without side effects if the path is missing, not a directory,
    /// or does not contain an interpreter at `bin/python`.
    pub fn open(root: &Utf8Path) -> Result<Self> {
        if !root.is_dir() {
            return Err(Error::venv(
                format!("{} is not a directory", root),
                "Pass the root of a built virtual environment",
            ));
        }

        let root = root.canonicalize_utf8().map_err(|e| {
            Error::venv(
                format!("Failed to canonicalize {}: {}", root, e),
                "Ensure the path exists and is accessible",
            )
        })?;

        let python = root.join("bin").join("python");
        if !python.is_file() {
            return Err(Error::venv(
                format!("{} has no bin/python interpreter", root),
                "Pass the root of a built virtual environment",
            ));
        }

        Ok(Self { root })
    }

    /// Path to the environment's interpreter
    pub fn python(&self) -> Utf8PathBuf {
        self.root.join("bin").join("python")
    }

    /// Query a single `setup.py --<field>` value from the project
    pub async fn query_setup(&self, field: &str) -> Result<String> {
        let mut cmd = Command::new(self.python());
        cmd.arg("setup.py")
            .arg(format!("--{}", field))
            .current_dir(&self.root);

        run_capture(&mut cmd, &format!("setup.py --{}", field))
            .await
            .map_err(|e| {
                Error::metadata(
                    format!("Failed to query project {}: {}", field, e),
                    "Ensure setup.py is present in the environment root",
                )
            })
    }

    /// Query the project's declared name
    pub async fn project_name(&self) -> Result<String> {
        let name = self.query_setup("name").await?;
        if name.is_empty() {
            return Err(Error::metadata(
                "Project declares an empty name",
                "Set the name field in setup.py",
            ));
        }
        Ok(name)
    }

    /// Query the full project metadata used for the package fields
    pub async fn project_metadata(&self, fallback_maintainer: &str) -> Result<ProjectMetadata> {
        let name = self.project_name().await?;
        let version = self.query_setup("version").await?;
        let description = self.query_setup("description").await?;
        let long_description = self.query_setup("long-description").await?;

        let maintainer = match self.query_setup("maintainer").await {
            Ok(m) if !m.is_empty() && m != "UNKNOWN" => m,
            _ => fallback_maintainer.to_string(),
        };

        Ok(ProjectMetadata {
            name,
            version,
            description,
            long_description,
            maintainer,
        })
    }
}

/// Render the build_info.txt contents shipped inside the package.
///
/// Field names are fixed: Name, Version, Packaged on, Repository,
/// Description. Description goes last because it may span multiple lines.
pub fn render_build_info(
    name: &str,
    version: &str,
    packaged_on: &str,
    git: &GitInfo,
    description: &str,
) -> String {
    format!(
        "Name: {}\nVersion: {}\nPackaged on: {}\nRepository: {}\nDescription: {}\n",
        name, version, packaged_on, git.remote_url, description
    )
}

/// Write build_info.txt into the environment root
pub fn write_build_info(env: &VirtualEnv, contents: &str) -> Result<Utf8PathBuf> {
    let path = env.root.join(BUILD_INFO_FILE);
    std::fs::write(&path, contents)?;
    Ok(path)
}
