//! Source-control provenance queries
//!
//! Package version iteration, origin URL and description fields are derived
//! from the local git state at packaging time.

use camino::Utf8Path;
use tokio::process::Command;

use crate::command::run_capture;
use crate::Result;

/// Git state captured at packaging time
#[derive(Debug, Clone)]
pub struct GitInfo {
    /// Remote origin URL, recorded in build_info.txt and the package url field
    pub remote_url: String,
    /// Full commit hash
    pub commit: String,
    /// Short commit hash, used as the package iteration
    pub short_commit: String,
    /// Currently checked out branch
    pub branch: String,
}

impl GitInfo {
    /// Collect provenance from the repository containing `dir`
    pub async fn collect(dir: &Utf8Path) -> Result<Self> {
        let remote_url = git_query(dir, &["config", "--get", "remote.origin.url"]).await?;
        let commit = git_query(dir, &["rev-parse", "HEAD"]).await?;
        let short_commit = git_query(dir, &["rev-parse", "--short", "HEAD"]).await?;
        let branch = git_query(dir, &["rev-parse", "--abbrev-ref", "HEAD"]).await?;

        Ok(Self {
            remote_url,
            commit,
            short_commit,
            branch,
        })
    }
}

async fn git_query(dir: &Utf8Path, args: &[&str]) -> Result<String> {
    let mut cmd = Command::new("git");
    cmd.args(args).current_dir(dir);
    run_capture(&mut cmd, &format!("git {}", args.join(" "))).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8Path;

    #[tokio::test]
    async fn test_collect_outside_repository_fails() {
        let temp_dir = tempfile::tempdir().unwrap();
        let dir = Utf8Path::from_path(temp_dir.path()).unwrap();

        // tempdir is not a git repository, so every query must fail
        let err = GitInfo::collect(dir).await.unwrap_err();
        assert!(matches!(err, crate::Error::Command { .. }));
    }

    #[tokio::test]
    async fn test_collect_from_repository() {
        let temp_dir = tempfile::tempdir().unwrap();
        let dir = Utf8Path::from_path(temp_dir.path()).unwrap();

        let git = |args: &[&str]| {
            let out = std::process::Command::new("git")
                .args(args)
                .current_dir(dir)
                .env("GIT_AUTHOR_NAME", "test")
                .env("GIT_AUTHOR_EMAIL", "test@example.com")
                .env("GIT_COMMITTER_NAME", "test")
                .env("GIT_COMMITTER_EMAIL", "test@example.com")
                .output()
                .unwrap();
            assert!(out.status.success(), "git {:?} failed", args);
        };

        git(&["init", "-b", "main"]);
        git(&["remote", "add", "origin", "git@example.com:acme/app.git"]);
        std::fs::write(dir.join("file"), "content").unwrap();
        git(&["add", "file"]);
        git(&["commit", "-m", "initial"]);

        let info = GitInfo::collect(dir).await.unwrap();

        assert_eq!(info.remote_url, "git@example.com:acme/app.git");
        assert_eq!(info.branch, "main");
        assert!(info.commit.starts_with(&info.short_commit));
        assert!(info.short_commit.len() < info.commit.len());
    }
}
