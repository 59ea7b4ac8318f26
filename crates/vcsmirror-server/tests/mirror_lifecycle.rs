//! Exercises the coordinator against the real `GitBackend`, cloning and
//! updating a local filesystem repository instead of a network remote.

use std::sync::Arc;

use vcsmirror_server::coordinator::Coordinator;
use vcsmirror_server::locks::LockRegistry;
use vcsmirror_server::storage::repo_dir;
use vcsmirror_vcs::{GitBackend, VcsKind};

fn init_source_repo(dir: &std::path::Path) {
    let repo = git2::Repository::init(dir).expect("init source repo");
    std::fs::write(dir.join("README.md"), "hello\n").unwrap();
    let mut index = repo.index().unwrap();
    index.add_path(std::path::Path::new("README.md")).unwrap();
    let tree_id = index.write_tree().unwrap();
    index.write().unwrap();
    let tree = repo.find_tree(tree_id).unwrap();
    let sig = git2::Signature::now("Test", "test@example.com").unwrap();
    repo.commit(Some("HEAD"), &sig, &sig, "initial", &tree, &[]).unwrap();
}

#[test]
fn ensure_fresh_clones_once_and_only_updates_when_asked() {
    let tmp = tempfile::tempdir().unwrap();
    let source = tmp.path().join("source");
    std::fs::create_dir_all(&source).unwrap();
    init_source_repo(&source);

    let storage_root = tmp.path().join("mirrors");
    let dir = repo_dir(&storage_root, VcsKind::Git, "example.com/r", false);

    let coordinator = Coordinator::new(Arc::new(LockRegistry::new()));
    let backend = GitBackend;
    let clone_url = source.display().to_string();

    coordinator.ensure_fresh("example.com/r", &dir, &backend, &clone_url, false, false).unwrap();
    assert!(dir.join("HEAD").exists(), "mirror clone should produce a bare repo layout");
    assert_eq!(coordinator.action_count("clone", &clone_url), 1);

    coordinator.ensure_fresh("example.com/r", &dir, &backend, &clone_url, false, false).unwrap();
    assert_eq!(coordinator.action_count("clone", &clone_url), 1, "repeat calls without force_update must not re-clone");

    coordinator.ensure_fresh("example.com/r", &dir, &backend, &clone_url, true, false).unwrap();
    assert_eq!(coordinator.action_count("update", &clone_url), 1);
}

#[test]
fn offline_mode_never_touches_the_filesystem() {
    let tmp = tempfile::tempdir().unwrap();
    let storage_root = tmp.path().join("mirrors");
    let dir = repo_dir(&storage_root, VcsKind::Git, "example.com/r", true);

    let coordinator = Coordinator::new(Arc::new(LockRegistry::new()));
    let backend = GitBackend;

    coordinator.ensure_fresh("example.com/r", &dir, &backend, "git://example.com/r", true, true).unwrap();
    assert!(!dir.exists());
}
