//! First-exist batch-file read action (`/v-batch/<revision>?file=...&return=first-exist`).

use std::path::Path;

use tracing::warn;

use vcsmirror_core::HttpError;
use vcsmirror_vcs::VcsBackend;

const RETURN_FIRST_EXIST: &str = "first-exist";

/// A successful batch-file read: the content of the first candidate that
/// existed at the revision.
#[derive(Debug, Clone)]
pub struct BatchFileResponse {
    /// Raw content of whichever candidate was found first.
    pub body: Vec<u8>,
}

/// Serve the `/v-batch/<revision>` action, trying each `file` query
/// parameter in order and returning the first that exists.
///
/// # Errors
/// - `bad-request` (400) if `return` isn't `first-exist`, or no `file`
///   parameters were given.
/// - `not-found` (404) if none of the candidates exist at the revision.
/// - `internal` (500) if the mirror can't be opened, or a read fails for a
///   reason other than non-existence.
pub fn serve(vcs: &dyn VcsBackend, dir: &Path, extra_path: &str, query: &[(String, String)]) -> Result<BatchFileResponse, HttpError> {
    let revision = extra_path.strip_prefix("/v-batch/").unwrap_or(extra_path);

    let returns = query.iter().find(|(k, _)| k == "return").map(|(_, v)| v.as_str());
    if returns != Some(RETURN_FIRST_EXIST) {
        return Err(HttpError::bad_request("unrecognized ?returns param"));
    }

    let candidates: Vec<&str> = query.iter().filter(|(k, _)| k == "file").map(|(_, v)| v.as_str()).collect();
    if candidates.is_empty() {
        return Err(HttpError::bad_request("no files specified"));
    }

    vcs.open(dir).map_err(|e| {
        warn!(error = %e, dir = %dir.display(), "failed to open repository");
        HttpError::internal("failed to open repository")
    })?;

    for path in candidates {
        match vcs.read_file_at_revision(dir, path, revision) {
            Ok((body, _kind)) => return Ok(BatchFileResponse { body }),
            Err(e) if e.is_not_found() => continue,
            Err(e) => {
                warn!(error = %e, path, revision, "failed to read file at revision");
                return Err(HttpError::internal("failed to read file at revision"));
            }
        }
    }

    Err(HttpError::not_found("not found"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use vcsmirror_vcs::{FileKind, VcsError};

    #[derive(Debug, Default)]
    struct FakeBackend {
        files: std::collections::HashMap<(String, String), Vec<u8>>,
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
                .map(|b| (b, FileKind::File))
                .ok_or_else(|| VcsError::NotFound { what: format!("{path} at {revision}") })
        }
    }

    fn q(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect()
    }

    #[test]
    fn returns_first_existing_candidate() {
        let mut backend = FakeBackend::default();
        backend.files.insert(("master".into(), "b.txt".into()), b"second".to_vec());

        let query = q(&[("file", "a.txt"), ("file", "b.txt"), ("return", "first-exist")]);
        let resp = serve(&backend, &PathBuf::from("/mirrors/git/r"), "/v-batch/master", &query).unwrap();
        assert_eq!(resp.body, b"second");
    }

    #[test]
    fn rejects_non_first_exist_return_param() {
        let backend = FakeBackend::default();
        let query = q(&[("file", "a.txt"), ("return", "all")]);
        let err = serve(&backend, &PathBuf::from("/mirrors/git/r"), "/v-batch/master", &query).unwrap_err();
        assert_eq!(err.status(), 400);
    }

    #[test]
    fn rejects_missing_file_params() {
        let backend = FakeBackend::default();
        let query = q(&[("return", "first-exist")]);
        let err = serve(&backend, &PathBuf::from("/mirrors/git/r"), "/v-batch/master", &query).unwrap_err();
        assert_eq!(err.status(), 400);
    }

    #[test]
    fn not_found_when_no_candidate_exists() {
        let backend = FakeBackend::default();
        let query = q(&[("file", "a.txt"), ("file", "b.txt"), ("return", "first-exist")]);
        let err = serve(&backend, &PathBuf::from("/mirrors/git/r"), "/v-batch/master", &query).unwrap_err();
        assert_eq!(err.status(), 404);
    }
}
