//! Deterministic mapping from (VCS-kind, canonical URI) to a mirror directory.

use std::path::{Path, PathBuf};

use vcsmirror_vcs::VcsKind;

/// The local mirror directory for `uri` (`host/repo-path`) under `vcs`.
///
/// Layout: `<storage-root>/<vcs-short-name>/<uri>`. When `offline` is set, a
/// trailing `.git` is additionally stripped to tolerate mirrors created
/// under the legacy bare-repository naming convention before offline mode
/// was introduced.
#[must_use]
pub fn repo_dir(storage_root: &Path, vcs: VcsKind, uri: &str, offline: bool) -> PathBuf {
    let uri = if offline { uri.strip_suffix(".git").unwrap_or(uri) } else { uri };
    storage_root.join(vcs.short_name()).join(uri)
}
