//! Git mirror operations shelled out to the `git` CLI.
//!
//! Mirrors are plain `git clone --mirror` bare repositories: every ref the
//! origin exposes is fetched, and `git remote update` keeps them current.
//! File reads at a revision go through `git cat-file`, which gives precise
//! blob/tree discrimination without checking anything out.

use std::path::Path;
use std::process::Command;

use tracing::{debug, trace, warn};

use crate::error::{Result, VcsError};
use crate::types::{FileKind, VcsBackend};

/// Git backend: mirrors and reads via the `git` executable.
#[derive(Debug, Default, Clone, Copy)]
pub struct GitBackend;

impl GitBackend {
    /// Construct a new backend. Stateless; every call shells out fresh.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn parse_clone_error(stderr: &str, url: &str) -> VcsError {
        let lower = stderr.to_lowercase();
        if lower.contains("repository not found") || lower.contains("could not read from remote") || lower.contains("does not exist") {
            VcsError::RepositoryNotFound { url: url.to_string() }
        } else {
            VcsError::clone_failed(url, stderr.trim(), lower.contains("could not resolve host") || lower.contains("timed out"))
        }
    }
}

impl VcsBackend for GitBackend {
    fn short_name(&self) -> &'static str {
        "git"
    }

    fn mirror_clone(&self, clone_url: &str, dir: &Path) -> Result<()> {
        debug!(url = clone_url, dir = %dir.display(), "git mirror-clone");
        let output = Command::new("git")
            .args(["clone", "--mirror", clone_url])
            .arg(dir)
            .output()
            .map_err(|e| VcsError::Command {
                command: "git clone --mirror".to_string(),
                message: e.to_string(),
                exit_code: None,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(url = clone_url, %stderr, "git mirror-clone failed");
            return Err(Self::parse_clone_error(&stderr, clone_url));
        }
        Ok(())
    }

    fn mirror_update(&self, dir: &Path) -> Result<()> {
        debug!(dir = %dir.display(), "git mirror-update");
        let output = Command::new("git")
            .args(["--git-dir"])
            .arg(dir)
            .args(["remote", "update", "--prune"])
            .output()
            .map_err(|e| VcsError::Command {
                command: "git remote update".to_string(),
                message: e.to_string(),
                exit_code: None,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(dir = %dir.display(), %stderr, "git mirror-update failed");
            return Err(VcsError::UpdateFailed {
                remote: dir.display().to_string(),
                reason: stderr.trim().to_string(),
                retryable: stderr.to_lowercase().contains("could not resolve host"),
            });
        }
        Ok(())
    }

    fn open(&self, dir: &Path) -> Result<()> {
        if !dir.is_dir() || !dir.join("HEAD").exists() {
            return Err(VcsError::NotRepository { path: dir.to_path_buf() });
        }
        Ok(())
    }

    fn read_file_at_revision(&self, dir: &Path, path: &str, revision: &str) -> Result<(Vec<u8>, FileKind)> {
        let object = format!("{revision}:{path}");
        trace!(object, "git cat-file -t");

        let type_output = Command::new("git")
            .args(["--git-dir"])
            .arg(dir)
            .args(["cat-file", "-t", &object])
            .output()
            .map_err(|e| VcsError::Command {
                command: "git cat-file -t".to_string(),
                message: e.to_string(),
                exit_code: None,
            })?;

        if !type_output.status.success() {
            let stderr = String::from_utf8_lossy(&type_output.stderr);
            if stderr.contains("invalid object name") {
                return Err(VcsError::Command {
                    command: "git cat-file -t".to_string(),
                    message: stderr.trim().to_string(),
                    exit_code: type_output.status.code(),
                });
            }
            return Err(VcsError::NotFound {
                what: format!("{path} at revision {revision}"),
            });
        }

        let kind = String::from_utf8_lossy(&type_output.stdout).trim().to_string();
        match kind.as_str() {
            "blob" => {
                let output = Command::new("git")
                    .args(["--git-dir"])
                    .arg(dir)
                    .args(["cat-file", "-p", &object])
                    .output()
                    .map_err(|e| VcsError::Command {
                        command: "git cat-file -p".to_string(),
                        message: e.to_string(),
                        exit_code: None,
                    })?;
                if !output.status.success() {
                    let stderr = String::from_utf8_lossy(&output.stderr);
                    return Err(VcsError::Command {
                        command: "git cat-file -p".to_string(),
                        message: stderr.trim().to_string(),
                        exit_code: output.status.code(),
                    });
                }
                Ok((output.stdout, FileKind::File))
            }
            "tree" => {
                let output = Command::new("git")
                    .args(["--git-dir"])
                    .arg(dir)
                    .args(["ls-tree", "--name-only", &object])
                    .output()
                    .map_err(|e| VcsError::Command {
                        command: "git ls-tree".to_string(),
                        message: e.to_string(),
                        exit_code: None,
                    })?;
                if !output.status.success() {
                    let stderr = String::from_utf8_lossy(&output.stderr);
                    return Err(VcsError::Command {
                        command: "git ls-tree".to_string(),
                        message: stderr.trim().to_string(),
                        exit_code: output.status.code(),
                    });
                }
                Ok((output.stdout, FileKind::Dir))
            }
            other => Err(VcsError::git(format!("unexpected object type {other} for {object}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_name_is_git() {
        assert_eq!(GitBackend::new().short_name(), "git");
    }

    #[test]
    fn open_rejects_missing_directory() {
        let err = GitBackend::new().open(Path::new("/nonexistent/does/not/exist"));
        assert!(matches!(err, Err(VcsError::NotRepository { .. })));
    }

    #[test]
    fn parse_clone_error_flags_repository_not_found() {
        let err = GitBackend::parse_clone_error("remote: Repository not found.", "git://example.com/r");
        assert!(matches!(err, VcsError::RepositoryNotFound { .. }));
    }

    #[test]
    fn parse_clone_error_falls_back_to_clone_failed() {
        let err = GitBackend::parse_clone_error("fatal: read error", "git://example.com/r");
        assert!(matches!(err, VcsError::CloneFailed { .. }));
    }

    /// Builds a bare mirror with a single commit adding `present.txt`, for
    /// tests that need a real `git cat-file` to classify errors against.
    fn bare_fixture() -> tempfile::TempDir {
        let bare = tempfile::tempdir().unwrap();
        let work = tempfile::tempdir().unwrap();

        Command::new("git").args(["init", "--bare"]).arg(bare.path()).output().unwrap();
        Command::new("git").arg("init").arg(work.path()).output().unwrap();
        std::fs::write(work.path().join("present.txt"), b"hello\n").unwrap();
        Command::new("git").current_dir(work.path()).args(["add", "present.txt"]).output().unwrap();
        Command::new("git")
            .current_dir(work.path())
            .args(["-c", "user.email=t@example.com", "-c", "user.name=t", "commit", "-m", "init"])
            .output()
            .unwrap();
        Command::new("git")
            .current_dir(work.path())
            .args(["push", bare.path().to_str().unwrap(), "HEAD:refs/heads/master"])
            .output()
            .unwrap();

        bare
    }

    #[test]
    fn missing_revision_is_not_not_found() {
        let bare = bare_fixture();
        let err = GitBackend::new().read_file_at_revision(bare.path(), "present.txt", "deadbeefdeadbeefdeadbeefdeadbeefdeadbeef").unwrap_err();
        assert!(!err.is_not_found(), "missing revision must not surface as not-found: {err}");
    }

    #[test]
    fn missing_path_at_valid_revision_is_not_found() {
        let bare = bare_fixture();
        let err = GitBackend::new().read_file_at_revision(bare.path(), "absent.txt", "master").unwrap_err();
        assert!(err.is_not_found());
    }
}
