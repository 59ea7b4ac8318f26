//! Per-repository mutex registry.
//!
//! A lazily populated keyed-lock table: `mutex_for(key)` creates a mutex for
//! a repository key on first demand and hands back the same `Arc` on every
//! later call. Coordinator leaders hold it around clone/update; action
//! handlers hold it around reads, so the two are mutually exclusive.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

/// Registry of per-repository-directory mutexes, retained for the life of
/// the process.
#[derive(Debug, Default)]
pub struct LockRegistry {
    repo_access: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl LockRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create the mutex guarding `dir`.
    #[must_use]
    pub fn mutex_for(&self, dir: &Path) -> Arc<Mutex<()>> {
        let mut map = self.repo_access.lock();
        map.entry(dir.to_path_buf()).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
    }

    /// Number of distinct repositories with a registered mutex. Testing hook.
    #[must_use]
    pub fn len(&self) -> usize {
        self.repo_access.lock().len()
    }

    /// Whether the registry has no entries yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn same_key_returns_the_same_mutex() {
        let registry = LockRegistry::new();
        let a = registry.mutex_for(&PathBuf::from("/repo/one"));
        let b = registry.mutex_for(&PathBuf::from("/repo/one"));
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn distinct_keys_get_distinct_mutexes() {
        let registry = LockRegistry::new();
        let a = registry.mutex_for(&PathBuf::from("/repo/one"));
        let b = registry.mutex_for(&PathBuf::from("/repo/two"));
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn mutex_is_actually_held_exclusively() {
        let registry = LockRegistry::new();
        let mu = registry.mutex_for(&PathBuf::from("/repo/one"));
        let _guard = mu.lock();
        assert!(mu.try_lock().is_none());
    }
}
