//! Whole-repository blame action (`/api/blame?v=<revision>`).
//!
//! Blames every tracked file in the tree at `v` (defaulting to `HEAD`),
//! skipping paths that match [`BLAME_IGNORES`], and returns the union of
//! commits touched and the line ranges they're each responsible for.

use std::collections::HashMap;
use std::path::Path;

use git2::{ObjectType, Repository, TreeWalkMode, TreeWalkResult};
use serde::Serialize;
use tracing::warn;

use vcsmirror_core::HttpError;

/// Path substrings excluded from blame, mirroring the upstream ignore list
/// for generated/vendored trees that are expensive to blame and rarely
/// interesting.
const BLAME_IGNORES: &[&str] = &[
    "node_modules",
    "bower_components",
    "doc",
    "docs",
    "build",
    "vendor",
    ".min.js",
    "-min.js",
    ".optimized.js",
    "-optimized.js",
    "dist",
    "assets",
];

/// A commit touched by the blame, keyed by its ID in [`BlameResponse::hunks`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Commit {
    pub commit_id: String,
    pub author_date: String,
    pub author: Author,
    pub message: String,
}

/// A commit's author identity.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Author {
    pub name: String,
    pub email: String,
}

/// A contiguous line range in one file attributed to one commit.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Hunk {
    pub commit_id: String,
    pub file: String,
    pub start: usize,
    pub end: usize,
}

/// The JSON body returned by the blame action.
#[derive(Debug, Clone, Serialize, Default)]
#[serde(rename_all = "PascalCase")]
pub struct BlameResponse {
    pub commits: Vec<Commit>,
    pub hunks: Vec<Hunk>,
}

fn is_ignored(path: &str) -> bool {
    BLAME_IGNORES.iter().any(|pattern| path.contains(pattern))
}

/// Blame every eligible file in the mirror at `dir`, as of `revision`.
///
/// # Errors
/// `internal` (500) if the mirror can't be opened, the revision can't be
/// resolved, or the tree can't be walked.
pub fn blame_repository(dir: &Path, revision: &str) -> Result<BlameResponse, HttpError> {
    let repo = Repository::open_bare(dir).or_else(|_| Repository::open(dir)).map_err(|e| {
        warn!(error = %e, dir = %dir.display(), "failed to open repository for blame");
        HttpError::internal("failed to blame repository")
    })?;

    let rev = if revision.is_empty() { "HEAD" } else { revision };
    let commit = repo
        .revparse_single(rev)
        .and_then(|obj| obj.peel_to_commit())
        .map_err(|e| {
            warn!(error = %e, rev, "failed to resolve revision for blame");
            HttpError::internal("failed to blame repository")
        })?;
    let tree = commit.tree().map_err(|_| HttpError::internal("failed to blame repository"))?;

    let mut files = Vec::new();
    tree.walk(TreeWalkMode::PreOrder, |root, entry| {
        if entry.kind() == Some(ObjectType::Blob) {
            let path = format!("{root}{}", entry.name().unwrap_or_default());
            if !is_ignored(&path) {
                files.push(path);
            }
        }
        TreeWalkResult::Ok
    })
    .map_err(|_| HttpError::internal("failed to blame repository"))?;

    let mut commits: HashMap<String, Commit> = HashMap::new();
    let mut hunks = Vec::new();

    for file in files {
        let mut opts = git2::BlameOptions::new();
        opts.newest_commit(commit.id());
        let Ok(blame) = repo.blame_file(Path::new(&file), Some(&mut opts)) else {
            continue;
        };

        for hunk in blame.iter() {
            let commit_id = hunk.final_commit_id();
            let id_str = commit_id.to_string();
            commits.entry(id_str.clone()).or_insert_with(|| {
                let found = repo.find_commit(commit_id);
                found.map_or_else(
                    |_| Commit {
                        commit_id: id_str.clone(),
                        author_date: String::new(),
                        author: Author {
                            name: String::new(),
                            email: String::new(),
                        },
                        message: String::new(),
                    },
                    |c| Commit {
                        commit_id: id_str.clone(),
                        author_date: c.author().when().seconds().to_string(),
                        author: Author {
                            name: c.author().name().unwrap_or_default().to_string(),
                            email: c.author().email().unwrap_or_default().to_string(),
                        },
                        message: c.message().unwrap_or_default().to_string(),
                    },
                )
            });

            let start = hunk.final_start_line();
            let end = start + hunk.lines_in_hunk().saturating_sub(1);
            hunks.push(Hunk {
                commit_id: id_str,
                file: file.clone(),
                start,
                end,
            });
        }
    }

    Ok(BlameResponse {
        commits: commits.into_values().collect(),
        hunks,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ignored_paths_are_filtered() {
        assert!(is_ignored("vendor/lib.go"));
        assert!(is_ignored("dist/app.min.js"));
        assert!(!is_ignored("src/main.rs"));
    }

    #[test]
    fn blames_a_single_commit_repository() {
        let tmp = tempfile::tempdir().unwrap();
        let repo = Repository::init(tmp.path()).unwrap();
        std::fs::write(tmp.path().join("hello.txt"), "line one\nline two\n").unwrap();

        let mut index = repo.index().unwrap();
        index.add_path(Path::new("hello.txt")).unwrap();
        let tree_id = index.write_tree().unwrap();
        index.write().unwrap();
        let tree = repo.find_tree(tree_id).unwrap();
        let sig = git2::Signature::now("Test Author", "author@example.com").unwrap();
        repo.commit(Some("HEAD"), &sig, &sig, "initial", &tree, &[]).unwrap();

        let result = blame_repository(tmp.path(), "HEAD").unwrap();
        assert_eq!(result.commits.len(), 1);
        assert_eq!(result.commits[0].author.email, "author@example.com");
        assert!(result.hunks.iter().any(|h| h.file == "hello.txt"));
    }
}
