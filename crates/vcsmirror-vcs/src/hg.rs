//! Mercurial mirror operations via the `hg` CLI.
//!
//! Mercurial has no exact analogue of a Git bare mirror, so the mirror is a
//! `hg clone --noupdate` repository: full history, no working copy.
//! `hg pull` keeps it current. Reads at a revision go through `hg cat`,
//! falling back to `hg files` to produce a directory listing.

use std::path::Path;
use std::process::Command;

use tracing::{debug, warn};

use crate::error::{Result, VcsError};
use crate::types::{FileKind, VcsBackend};

/// Mercurial backend: mirrors and reads via the `hg` executable.
#[derive(Debug, Default, Clone, Copy)]
pub struct HgBackend;

impl HgBackend {
    /// Construct a new backend. Stateless; every call shells out fresh.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn parse_error(stderr: &str, context: &str) -> VcsError {
        let lower = stderr.to_lowercase();
        if lower.contains("not found") || lower.contains("no such file") || lower.contains("unknown revision") {
            VcsError::NotFound { what: context.to_string() }
        } else if lower.contains("authorization failed") || lower.contains("authentication") {
            VcsError::Mercurial {
                message: format!("authentication failed: {}", stderr.trim()),
            }
        } else {
            VcsError::Mercurial { message: stderr.trim().to_string() }
        }
    }
}

impl VcsBackend for HgBackend {
    fn short_name(&self) -> &'static str {
        "hg"
    }

    fn mirror_clone(&self, clone_url: &str, dir: &Path) -> Result<()> {
        debug!(url = clone_url, dir = %dir.display(), "hg mirror-clone");
        let output = Command::new("hg")
            .args(["clone", "--noupdate", clone_url])
            .arg(dir)
            .output()
            .map_err(|e| VcsError::Command {
                command: "hg clone --noupdate".to_string(),
                message: e.to_string(),
                exit_code: None,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(url = clone_url, %stderr, "hg mirror-clone failed");
            if stderr.to_lowercase().contains("not found") || stderr.to_lowercase().contains("404") {
                return Err(VcsError::RepositoryNotFound { url: clone_url.to_string() });
            }
            return Err(VcsError::clone_failed(clone_url, stderr.trim(), false));
        }
        Ok(())
    }

    fn mirror_update(&self, dir: &Path) -> Result<()> {
        debug!(dir = %dir.display(), "hg mirror-update");
        let output = Command::new("hg")
            .args(["--repository"])
            .arg(dir)
            .arg("pull")
            .output()
            .map_err(|e| VcsError::Command {
                command: "hg pull".to_string(),
                message: e.to_string(),
                exit_code: None,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(dir = %dir.display(), %stderr, "hg mirror-update failed");
            return Err(VcsError::UpdateFailed {
                remote: dir.display().to_string(),
                reason: stderr.trim().to_string(),
                retryable: false,
            });
        }
        Ok(())
    }

    fn open(&self, dir: &Path) -> Result<()> {
        if !dir.join(".hg").is_dir() {
            return Err(VcsError::NotRepository { path: dir.to_path_buf() });
        }
        Ok(())
    }

    fn read_file_at_revision(&self, dir: &Path, path: &str, revision: &str) -> Result<(Vec<u8>, FileKind)> {
        let rev_path = format!("path:{path}");
        let output = Command::new("hg")
            .args(["--repository"])
            .arg(dir)
            .args(["cat", "--rev", revision, &rev_path])
            .output()
            .map_err(|e| VcsError::Command {
                command: "hg cat".to_string(),
                message: e.to_string(),
                exit_code: None,
            })?;

        if output.status.success() && !output.stdout.is_empty() {
            return Ok((output.stdout, FileKind::File));
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let context = format!("{path} at revision {revision}");
        if !output.status.success() && !stderr.to_lowercase().contains("no such file") {
            return Err(Self::parse_error(&stderr, &context));
        }

        let listing = Command::new("hg")
            .args(["--repository"])
            .arg(dir)
            .args(["files", "--rev", revision, &rev_path])
            .output()
            .map_err(|e| VcsError::Command {
                command: "hg files".to_string(),
                message: e.to_string(),
                exit_code: None,
            })?;

        if listing.status.success() && !listing.stdout.is_empty() {
            return Ok((listing.stdout, FileKind::Dir));
        }

        Err(VcsError::NotFound { what: context })
    }
}
