//! storage::memory
//!
//! In-memory repository storage for deterministic testing.
//!
//! # Design
//!
//! [`MemoryStorage`] keeps repositories as maps from ref name to target and
//! records every storage call in an operation log. Failures can be injected
//! per operation (and per reference for deletions) to exercise error paths.
//! Clones share state, so a test can keep one clone for inspection while
//! the pruner works with another.
//!
//! # Example
//!
//! ```
//! use nsprune::core::types::{Oid, RefName, RepositoryId};
//! use nsprune::storage::{MemoryStorage, RepositoryHandle, RepositoryStorage, StorageOp};
//!
//! let repo = RepositoryId::new("z3").unwrap();
//! let storage = MemoryStorage::new();
//! storage.insert_ref(&repo, RefName::new("refs/heads/main").unwrap(), Oid::new("a".repeat(40)).unwrap());
//!
//! let mut handle = storage.open(&repo).unwrap();
//! assert_eq!(handle.references().unwrap().count(), 1);
//! handle.compact().unwrap();
//!
//! assert_eq!(storage.compactions(&repo), 1);
//! assert!(matches!(storage.operations().last(), Some(StorageOp::Compact { .. })));
//! ```

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use super::{ReferenceIter, RepositoryHandle, RepositoryStorage, StorageError};
use crate::core::types::{Oid, RefName, Reference, RepositoryId, Target};

/// In-memory storage root.
///
/// Thread-safe via internal `Arc<Mutex<...>>` wrapping.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    inner: Arc<Mutex<MemoryStorageInner>>,
}

#[derive(Debug, Default)]
struct MemoryStorageInner {
    repositories: HashMap<RepositoryId, MemoryRepository>,
    fail_on: Vec<FailOn>,
    operations: Vec<StorageOp>,
}

#[derive(Debug, Default)]
struct MemoryRepository {
    refs: BTreeMap<RefName, Target>,
    compactions: usize,
}

/// Configuration for which operation should fail.
#[derive(Debug, Clone)]
pub enum FailOn {
    /// Fail `references` with the given error.
    References(StorageError),
    /// Fail `delete_reference` for one name with the given error.
    Delete(RefName, StorageError),
    /// Fail `compact` with the given error.
    Compact(StorageError),
}

/// A recorded storage call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageOp {
    /// `open` was called.
    Open { repo: RepositoryId },
    /// `references` was called.
    References { repo: RepositoryId },
    /// `delete_reference` was called.
    Delete { repo: RepositoryId, name: RefName },
    /// `compact` was called.
    Compact { repo: RepositoryId },
}

impl MemoryStorage {
    /// Create an empty storage root.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryStorageInner> {
        // A panic while holding the lock only happens inside a failing test.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Create an empty repository. Existing repositories are left as is.
    pub fn create_repository(&self, repo: &RepositoryId) {
        self.lock().repositories.entry(repo.clone()).or_default();
    }

    /// Insert or overwrite a direct ref, creating the repository if needed.
    pub fn insert_ref(&self, repo: &RepositoryId, name: RefName, oid: Oid) {
        self.insert_target(repo, name, Target::Direct(oid));
    }

    /// Insert or overwrite a ref with any target.
    pub fn insert_target(&self, repo: &RepositoryId, name: RefName, target: Target) {
        self.lock()
            .repositories
            .entry(repo.clone())
            .or_default()
            .refs
            .insert(name, target);
    }

    /// Snapshot of a repository's refs, sorted by name.
    pub fn refs(&self, repo: &RepositoryId) -> Vec<Reference> {
        self.lock()
            .repositories
            .get(repo)
            .map(|r| {
                r.refs
                    .iter()
                    .map(|(name, target)| Reference {
                        name: name.clone(),
                        target: target.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of successful compactions of a repository.
    pub fn compactions(&self, repo: &RepositoryId) -> usize {
        self.lock()
            .repositories
            .get(repo)
            .map_or(0, |r| r.compactions)
    }

    /// Inject a failure.
    pub fn fail_on(&self, fail: FailOn) {
        self.lock().fail_on.push(fail);
    }

    /// Remove all injected failures.
    pub fn clear_failures(&self) {
        self.lock().fail_on.clear();
    }

    /// All recorded storage calls, in order.
    pub fn operations(&self) -> Vec<StorageOp> {
        self.lock().operations.clone()
    }
}

impl RepositoryStorage for MemoryStorage {
    type Handle = MemoryHandle;

    fn open(&self, id: &RepositoryId) -> Result<MemoryHandle, StorageError> {
        let mut inner = self.lock();
        inner.operations.push(StorageOp::Open { repo: id.clone() });

        if !inner.repositories.contains_key(id) {
            return Err(StorageError::RepositoryNotFound {
                id: id.to_string(),
                path: PathBuf::from(id.as_str()),
            });
        }

        Ok(MemoryHandle {
            storage: self.clone(),
            repo: id.clone(),
        })
    }
}

/// Handle to one in-memory repository.
#[derive(Debug, Clone)]
pub struct MemoryHandle {
    storage: MemoryStorage,
    repo: RepositoryId,
}

impl RepositoryHandle for MemoryHandle {
    fn references(&self) -> Result<ReferenceIter<'_>, StorageError> {
        let mut inner = self.storage.lock();
        inner.operations.push(StorageOp::References {
            repo: self.repo.clone(),
        });

        if let Some(err) = inner.fail_on.iter().find_map(|f| match f {
            FailOn::References(err) => Some(err.clone()),
            _ => None,
        }) {
            return Err(err);
        }

        let refs: Vec<Reference> = inner
            .repositories
            .get(&self.repo)
            .map(|r| {
                r.refs
                    .iter()
                    .map(|(name, target)| Reference {
                        name: name.clone(),
                        target: target.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(Box::new(refs.into_iter().map(Ok)))
    }

    fn delete_reference(&mut self, name: &RefName) -> Result<(), StorageError> {
        let mut inner = self.storage.lock();
        inner.operations.push(StorageOp::Delete {
            repo: self.repo.clone(),
            name: name.clone(),
        });

        if let Some(err) = inner.fail_on.iter().find_map(|f| match f {
            FailOn::Delete(n, err) if n == name => Some(err.clone()),
            _ => None,
        }) {
            return Err(err);
        }

        let removed = inner
            .repositories
            .get_mut(&self.repo)
            .and_then(|r| r.refs.remove(name));

        match removed {
            Some(_) => Ok(()),
            None => Err(StorageError::Delete {
                refname: name.to_string(),
                message: "reference not found".to_string(),
            }),
        }
    }

    fn compact(&mut self) -> Result<(), StorageError> {
        let mut inner = self.storage.lock();
        inner.operations.push(StorageOp::Compact {
            repo: self.repo.clone(),
        });

        if let Some(err) = inner.fail_on.iter().find_map(|f| match f {
            FailOn::Compact(err) => Some(err.clone()),
            _ => None,
        }) {
            return Err(err);
        }

        if let Some(repo) = inner.repositories.get_mut(&self.repo) {
            repo.compactions += 1;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo() -> RepositoryId {
        RepositoryId::new("z3").unwrap()
    }

    fn name(s: &str) -> RefName {
        RefName::new(s).unwrap()
    }

    fn oid(c: char) -> Oid {
        Oid::new(c.to_string().repeat(40)).unwrap()
    }

    #[test]
    fn open_unknown_repository_fails() {
        let storage = MemoryStorage::new();
        let err = storage.open(&repo()).unwrap_err();
        assert!(matches!(err, StorageError::RepositoryNotFound { .. }));
        assert_eq!(storage.operations(), vec![StorageOp::Open { repo: repo() }]);
    }

    #[test]
    fn delete_removes_only_named_ref() {
        let storage = MemoryStorage::new();
        storage.insert_ref(&repo(), name("refs/heads/a"), oid('a'));
        storage.insert_ref(&repo(), name("refs/heads/b"), oid('b'));

        let mut handle = storage.open(&repo()).unwrap();
        handle.delete_reference(&name("refs/heads/a")).unwrap();

        let refs = storage.refs(&repo());
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].name, name("refs/heads/b"));
        assert_eq!(refs[0].target, Target::Direct(oid('b')));
    }

    #[test]
    fn delete_missing_ref_fails() {
        let storage = MemoryStorage::new();
        storage.create_repository(&repo());
        let mut handle = storage.open(&repo()).unwrap();
        let err = handle.delete_reference(&name("refs/heads/gone")).unwrap_err();
        assert!(matches!(err, StorageError::Delete { .. }));
    }

    #[test]
    fn injected_failures_apply() {
        let storage = MemoryStorage::new();
        storage.insert_ref(&repo(), name("refs/heads/a"), oid('a'));
        storage.fail_on(FailOn::Delete(
            name("refs/heads/a"),
            StorageError::LockContention {
                resource: "refs/heads/a".into(),
                message: "held".into(),
            },
        ));
        storage.fail_on(FailOn::Compact(StorageError::Compaction {
            message: "disk full".into(),
        }));

        let mut handle = storage.open(&repo()).unwrap();
        assert!(handle
            .delete_reference(&name("refs/heads/a"))
            .unwrap_err()
            .is_retryable());
        assert!(handle.compact().is_err());
        assert_eq!(storage.refs(&repo()).len(), 1);
        assert_eq!(storage.compactions(&repo()), 0);

        storage.clear_failures();
        handle.delete_reference(&name("refs/heads/a")).unwrap();
        handle.compact().unwrap();
        assert_eq!(storage.compactions(&repo()), 1);
    }

    #[test]
    fn references_failure() {
        let storage = MemoryStorage::new();
        storage.create_repository(&repo());
        storage.fail_on(FailOn::References(StorageError::Read {
            message: "corrupt".into(),
        }));
        let handle = storage.open(&repo()).unwrap();
        assert!(handle.references().is_err());
    }
}
