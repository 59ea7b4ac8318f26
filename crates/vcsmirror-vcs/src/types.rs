//! Core VCS types and the backend capability trait.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::{Result, VcsError};

/// The two version-control systems this mirror understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VcsKind {
    /// Git.
    Git,
    /// Mercurial.
    Hg,
}

impl VcsKind {
    /// The token used in request paths and storage layout (`"git"`/`"hg"`).
    #[must_use]
    pub const fn short_name(self) -> &'static str {
        match self {
            Self::Git => "git",
            Self::Hg => "hg",
        }
    }
}

impl fmt::Display for VcsKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

impl FromStr for VcsKind {
    type Err = VcsError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "git" => Ok(Self::Git),
            "hg" => Ok(Self::Hg),
            other => Err(VcsError::git(format!("unknown vcs kind: {other}"))),
        }
    }
}

/// Whether a path read at a revision names a regular file or a directory
/// listing, mirroring the upstream `ReadFileAtRevision` filetype tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// A regular file; bytes are its raw content.
    File,
    /// A directory; bytes are a listing.
    Dir,
}

/// The narrow capability surface the dispatcher depends on.
///
/// Two concrete backends exist ([`crate::git::GitBackend`],
/// [`crate::hg::HgBackend`]) but callers holding a `&dyn VcsBackend` never
/// need to know which.
pub trait VcsBackend: fmt::Debug + Send + Sync {
    /// The short name used in paths and storage layout.
    fn short_name(&self) -> &'static str;

    /// Create a bare mirror of `clone_url` at `dir`, which must not yet exist.
    ///
    /// # Errors
    /// Returns [`VcsError::CloneFailed`] or [`VcsError::RepositoryNotFound`]
    /// on failure.
    fn mirror_clone(&self, clone_url: &str, dir: &Path) -> Result<()>;

    /// Refresh an existing mirror at `dir` from its origin.
    ///
    /// # Errors
    /// Returns [`VcsError::UpdateFailed`] on failure.
    fn mirror_update(&self, dir: &Path) -> Result<()>;

    /// Verify `dir` looks like a mirror this backend created.
    ///
    /// # Errors
    /// Returns [`VcsError::NotRepository`] if it does not.
    fn open(&self, dir: &Path) -> Result<()>;

    /// Read `path` as it existed at `revision` inside the mirror at `dir`.
    ///
    /// # Errors
    /// Returns [`VcsError::NotFound`] if the path or revision doesn't exist,
    /// or [`VcsError::Command`]/[`VcsError::Io`] for any other failure.
    fn read_file_at_revision(&self, dir: &Path, path: &str, revision: &str) -> Result<(Vec<u8>, FileKind)>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_name_matches_path_token() {
        assert_eq!(VcsKind::Git.short_name(), "git");
        assert_eq!(VcsKind::Hg.short_name(), "hg");
    }

    #[test]
    fn from_str_accepts_only_the_closed_set() {
        assert_eq!("git".parse::<VcsKind>().unwrap(), VcsKind::Git);
        assert_eq!("hg".parse::<VcsKind>().unwrap(), VcsKind::Hg);
        assert!("svn".parse::<VcsKind>().is_err());
    }

    #[test]
    fn display_round_trips_through_from_str() {
        for kind in [VcsKind::Git, VcsKind::Hg] {
            assert_eq!(kind.to_string().parse::<VcsKind>().unwrap(), kind);
        }
    }
}
