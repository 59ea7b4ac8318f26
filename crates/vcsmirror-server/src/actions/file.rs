//! Single-file read action (`/v/<revision>/<path>`).

use std::path::Path;

use tracing::warn;

use vcsmirror_core::HttpError;
use vcsmirror_vcs::{FileKind, VcsBackend};

/// A successful single-file read.
#[derive(Debug, Clone)]
pub struct FileResponse {
    /// Raw file (or directory listing) bytes.
    pub body: Vec<u8>,
    /// Content-Type override; set only for directory listings.
    pub content_type: Option<&'static str>,
}

/// Serve the `/v/<revision>/<path>` action against an already-refreshed
/// mirror at `dir`.
///
/// # Errors
/// - `not-found` (404) if `extra_path` carries no `/`-separated revision and
///   path, or if that path doesn't exist at that revision.
/// - `internal` (500) if the mirror can't be opened, or the read fails for
///   any other reason.
pub fn serve(vcs: &dyn VcsBackend, dir: &Path, extra_path: &str) -> Result<FileResponse, HttpError> {
    let rest = extra_path.strip_prefix("/v/").unwrap_or(extra_path);
    let (revision, path) = rest.split_once('/').ok_or_else(|| HttpError::not_found("bad file path"))?;

    vcs.open(dir).map_err(|e| {
        warn!(error = %e, dir = %dir.display(), "failed to open repository");
        HttpError::internal("failed to open repository")
    })?;

    let (body, kind) = vcs.read_file_at_revision(dir, path, revision).map_err(|e| {
        if e.is_not_found() {
            HttpError::not_found("not found")
        } else {
            warn!(error = %e, path, revision, "failed to read file at revision");
            HttpError::internal("failed to read file at revision")
        }
    })?;

    let content_type = matches!(kind, FileKind::Dir).then_some("application/x-directory");
    Ok(FileResponse { body, content_type })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use vcsmirror_vcs::VcsError;

    #[derive(Debug, Default)]
    struct FakeBackend {
        files: std::collections::HashMap<(String, String), (Vec<u8>, FileKind)>,
    }

    impl VcsBackend for FakeBackend {
        fn short_name(&self) -> &'static str {
            "fake"
        }
        fn mirror_clone(&self, _clone_url: &str, _dir: &Path) -> vcsmirror_vcs::Result<()> {
            Ok(())
        }
        fn mirror_update(&self, _dir: &Path) -> vcsmirror_vcs::Result<()> {
            Ok(())
        }
        fn open(&self, _dir: &Path) -> vcsmirror_vcs::Result<()> {
            Ok(())
        }
        fn read_file_at_revision(&self, _dir: &Path, path: &str, revision: &str) -> vcsmirror_vcs::Result<(Vec<u8>, FileKind)> {
            self.files
                .get(&(revision.to_string(), path.to_string()))
                .cloned()
                .ok_or_else(|| VcsError::NotFound { what: format!("{path} at {revision}") })
        }
    }

    #[test]
    fn reads_file_content_at_revision() {
        let mut backend = FakeBackend::default();
        backend.files.insert(("master".into(), "foo/bar.txt".into()), (b"hello".to_vec(), FileKind::File));

        let resp = serve(&backend, &PathBuf::from("/mirrors/git/example.com/r"), "/v/master/foo/bar.txt").unwrap();
        assert_eq!(resp.body, b"hello");
        assert_eq!(resp.content_type, None);
    }

    #[test]
    fn directory_listing_sets_content_type() {
        let mut backend = FakeBackend::default();
        backend.files.insert(("master".into(), "foo".into()), (b"bar.txt\n".to_vec(), FileKind::Dir));

        let resp = serve(&backend, &PathBuf::from("/mirrors/git/example.com/r"), "/v/master/foo").unwrap();
        assert_eq!(resp.content_type, Some("application/x-directory"));
    }

    #[test]
    fn missing_revision_separator_is_not_found() {
        let backend = FakeBackend::default();
        let err = serve(&backend, &PathBuf::from("/mirrors/git/example.com/r"), "/v/master-only").unwrap_err();
        assert_eq!(err.status(), 404);
    }

    #[test]
    fn missing_file_at_revision_is_not_found() {
        let backend = FakeBackend::default();
        let err = serve(&backend, &PathBuf::from("/mirrors/git/example.com/r"), "/v/master/nope.txt").unwrap_err();
        assert_eq!(err.status(), 404);
    }
}
