//! Single-flight clone/update coordinator.
//!
//! Coalesces concurrent requests for the same repository key into one
//! clone or update, and synchronizes readers with any refresh in flight for
//! that key. Leader/waiter rendezvous uses a registry of
//! `Vec<oneshot::Sender<...>>` guarded by a [`parking_lot::Mutex`], matching
//! the blocking-rendezvous character the dispatcher is specified with.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use vcsmirror_core::HttpError;
use vcsmirror_vcs::VcsBackend;

use crate::locks::LockRegistry;

type RefreshResult = Result<(), HttpError>;

/// Coordinates clone/update admission for every repository key in the
/// process.
#[derive(Debug)]
pub struct Coordinator {
    waiters: Mutex<HashMap<String, Vec<oneshot::Sender<RefreshResult>>>>,
    locks: Arc<LockRegistry>,
    actions: Mutex<HashMap<String, u64>>,
}

impl Coordinator {
    /// Create a coordinator sharing the given per-repository lock registry.
    #[must_use]
    pub fn new(locks: Arc<LockRegistry>) -> Self {
        Self {
            waiters: Mutex::new(HashMap::new()),
            locks,
            actions: Mutex::new(HashMap::new()),
        }
    }

    /// Ensure the mirror at `dir` reflects `clone_url`, cloning it if it
    /// doesn't exist yet and updating it if `force_update` is set.
    ///
    /// Blocking: this function performs filesystem and subprocess I/O and
    /// must be called from a blocking context (e.g. inside
    /// `tokio::task::spawn_blocking`).
    ///
    /// # Errors
    /// Returns `internal` on any clone/update failure, or the mirror
    /// directory existing as a non-directory.
    pub fn ensure_fresh(&self, key: &str, dir: &Path, vcs: &dyn VcsBackend, clone_url: &str, force_update: bool, offline: bool) -> RefreshResult {
        if offline {
            return Ok(());
        }

        let rx = {
            let mut waiters = self.waiters.lock();
            if waiters.contains_key(key) {
                let (tx, rx) = oneshot::channel();
                waiters.get_mut(key).expect("just checked contains_key").push(tx);
                Some(rx)
            } else {
                waiters.insert(key.to_string(), Vec::new());
                None
            }
        };

        let Some(rx) = rx else {
            return self.lead_refresh(key, dir, vcs, clone_url, force_update);
        };

        debug!(key, "coordinator: joined as waiter");
        rx.blocking_recv()
            .unwrap_or_else(|_| Err(HttpError::internal("coordinator leader dropped without a result")))
            .map_err(|e| e.after_waiting())
    }

    fn lead_refresh(&self, key: &str, dir: &Path, vcs: &dyn VcsBackend, clone_url: &str, force_update: bool) -> RefreshResult {
        debug!(key, "coordinator: became leader");
        let repo_mutex = self.locks.mutex_for(dir);
        let _guard = repo_mutex.lock();

        let result = self.refresh(dir, vcs, clone_url, force_update);

        let waiters = {
            let mut all = self.waiters.lock();
            all.remove(key).unwrap_or_default()
        };
        for tx in waiters {
            let _ = tx.send(result.clone());
        }

        result
    }

    fn refresh(&self, dir: &Path, vcs: &dyn VcsBackend, clone_url: &str, force_update: bool) -> RefreshResult {
        match std::fs::metadata(dir) {
            Ok(meta) if !meta.is_dir() => Err(HttpError::internal("repo path is not directory")),
            Ok(_meta) => {
                if force_update {
                    self.record("update", clone_url);
                    vcs.mirror_update(dir).map_err(|e| {
                        warn!(error = %e, dir = %dir.display(), "error updating mirror");
                        HttpError::internal("error updating mirror")
                    })
                } else {
                    Ok(())
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                if let Some(parent) = dir.parent() {
                    std::fs::create_dir_all(parent).map_err(|_| HttpError::internal("error creating repo parent directory"))?;
                    #[cfg(unix)]
                    {
                        use std::os::unix::fs::PermissionsExt;
                        let _ = std::fs::set_permissions(parent, std::fs::Permissions::from_mode(0o700));
                    }
                }
                self.record("clone", clone_url);
                vcs.mirror_clone(clone_url, dir).map_err(|e| {
                    warn!(error = %e, url = clone_url, "error cloning mirror");
                    HttpError::internal("error cloning mirror")
                })
            }
            Err(_) => Err(HttpError::internal("error opening repo directory")),
        }
    }

    fn record(&self, action: &str, clone_url: &str) {
        let key = format!("{action}:{clone_url}");
        debug!(%key, "coordinator: recording action");
        *self.actions.lock().entry(key).or_insert(0) += 1;
    }

    /// How many times `"{action}:{clone_url}"` has been recorded. Testing hook.
    #[must_use]
    pub fn action_count(&self, action: &str, clone_url: &str) -> u64 {
        *self.actions.lock().get(&format!("{action}:{clone_url}")).unwrap_or(&0)
    }
}
