//! Mirror-clone, mirror-update, and at-revision file access for Git and
//! Mercurial.
//!
//! This crate provides the narrow capability surface the dispatcher
//! depends on: mirror-clone, mirror-update, open, read-file-at-revision,
//! and short-name, exposed through the [`VcsBackend`] trait so the
//! dispatcher never has to branch on VCS kind itself.
//!
//! # Quick start
//!
//! ```no_run
//! use vcsmirror_vcs::{GitBackend, VcsBackend};
//! use std::path::Path;
//!
//! # fn main() -> vcsmirror_vcs::Result<()> {
//! let backend = GitBackend::new();
//! backend.mirror_clone("https://github.com/example/repo.git", Path::new("/tmp/mirror"))?;
//! backend.mirror_update(Path::new("/tmp/mirror"))?;
//! let (bytes, _kind) = backend.read_file_at_revision(Path::new("/tmp/mirror"), "README.md", "master")?;
//! println!("{} bytes", bytes.len());
//! # Ok(())
//! # }
//! ```
//!
//! # Module structure
//!
//! - [`error`]: `VcsError` taxonomy for VCS-layer failures
//! - [`types`]: `VcsKind`, `FileKind`, and the `VcsBackend` trait
//! - [`git`]: Git mirror operations via the `git` CLI
//! - [`hg`]: Mercurial mirror operations via the `hg` CLI

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod git;
pub mod hg;
pub mod types;

pub use error::{Result, VcsError};
pub use git::GitBackend;
pub use hg::HgBackend;
pub use types::{FileKind, VcsBackend, VcsKind};
