//! engine::prune
//!
//! Namespace pruning: Locate -> Enumerate -> Filter -> Delete -> Compact.
//!
//! # Lifecycle
//!
//! ```text
//! Idle -> Enumerating -> Filtering -> Deleting(0..n) -> Compacting -> Done
//! ```
//!
//! Locate and enumerate failures abort the run: without a reference set
//! there is nothing meaningful to report. Once the matched set is known
//! the run is best effort. Each deletion is attempted independently and
//! reported, and compaction runs exactly once afterwards whatever the
//! deletions did, including when nothing matched.
//!
//! # Invariants
//!
//! - After a run in which every deletion succeeded, no reference in the
//!   repository matches the namespace pattern
//! - References outside the pattern are never passed to the store
//! - Compaction failure never undoes a completed deletion
//!
//! # Example
//!
//! ```
//! use nsprune::core::types::{Oid, PeerId, RefName, RepositoryId};
//! use nsprune::engine::prune::prune_namespace;
//! use nsprune::storage::MemoryStorage;
//!
//! let repo = RepositoryId::new("z3").unwrap();
//! let storage = MemoryStorage::new();
//! let oid = Oid::new("a".repeat(40)).unwrap();
//! storage.insert_ref(&repo, RefName::new("refs/namespaces/p1/refs/heads/main").unwrap(), oid.clone());
//! storage.insert_ref(&repo, RefName::new("refs/heads/master").unwrap(), oid);
//!
//! let report = prune_namespace(&storage, &repo, &PeerId::new("p1").unwrap()).unwrap();
//! assert_eq!(report.deleted().len(), 1);
//! assert!(report.compaction.is_completed());
//! assert_eq!(storage.refs(&repo).len(), 1);
//! ```

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::core::namespace::{filter_namespace, NamespacePattern};
use crate::core::types::{PeerId, RefName, Reference, RepositoryId, Target};
use crate::storage::{RepositoryHandle, RepositoryStorage, StorageError};

/// Errors that abort a run before any reference is touched.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PruneError {
    /// The repository could not be located.
    #[error(transparent)]
    Locate(StorageError),

    /// The repository's references could not be enumerated.
    #[error(transparent)]
    Enumerate(StorageError),
}

impl PruneError {
    /// The underlying storage error.
    pub fn storage_error(&self) -> &StorageError {
        match self {
            PruneError::Locate(err) | PruneError::Enumerate(err) => err,
        }
    }

    /// Whether re-running may succeed.
    pub fn is_retryable(&self) -> bool {
        self.storage_error().is_retryable()
    }
}

/// Stage of a pruning run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Nothing has happened yet.
    Idle,
    /// Reading the repository's references.
    Enumerating,
    /// Selecting the peer's references.
    Filtering,
    /// Deleting matched references one at a time.
    Deleting,
    /// Running the compaction pass.
    Compacting,
    /// The run is over.
    Done,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Idle => "idle",
            Stage::Enumerating => "enumerating",
            Stage::Filtering => "filtering",
            Stage::Deleting => "deleting",
            Stage::Compacting => "compacting",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}

/// Options for a pruning run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PruneOptions {
    /// Report matches without deleting or compacting.
    pub dry_run: bool,
}

/// Outcome of one deletion attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeletionStatus {
    /// The reference was deleted.
    Deleted,
    /// The store refused the deletion.
    Failed(StorageError),
    /// Dry run: the reference would have been deleted.
    Planned,
}

/// One matched reference and what happened to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deletion {
    /// Name of the matched reference
    pub name: RefName,
    /// Its target when it was enumerated
    pub target: Target,
    /// Result of the attempt
    pub status: DeletionStatus,
}

impl Deletion {
    /// Whether the reference was actually deleted.
    pub fn is_deleted(&self) -> bool {
        matches!(self.status, DeletionStatus::Deleted)
    }

    /// The failure, if the deletion failed.
    pub fn error(&self) -> Option<&StorageError> {
        match &self.status {
            DeletionStatus::Failed(err) => Some(err),
            _ => None,
        }
    }
}

/// Outcome of the compaction pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Compaction {
    /// Compaction ran and succeeded.
    Completed,
    /// Compaction ran and failed. Prior deletions stand.
    Failed(StorageError),
    /// Dry run: compaction was not invoked.
    Skipped,
}

impl Compaction {
    /// Whether compaction ran successfully.
    pub fn is_completed(&self) -> bool {
        matches!(self, Compaction::Completed)
    }

    /// Compaction outcome as a `Result`. A skipped pass counts as success.
    pub fn result(&self) -> Result<(), &StorageError> {
        match self {
            Compaction::Failed(err) => Err(err),
            Compaction::Completed | Compaction::Skipped => Ok(()),
        }
    }
}

/// Result of a pruning run that reached the deletion stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PruneReport {
    /// The repository that was pruned
    pub repository: RepositoryId,
    /// The peer whose namespace was pruned
    pub peer: PeerId,
    /// One entry per matched reference, in attempt order
    pub deletions: Vec<Deletion>,
    /// Outcome of the compaction pass
    pub compaction: Compaction,
}

impl PruneReport {
    /// Names of the references that were deleted.
    pub fn deleted(&self) -> Vec<&RefName> {
        self.deletions
            .iter()
            .filter(|d| d.is_deleted())
            .map(|d| &d.name)
            .collect()
    }

    /// Deletion attempts that failed.
    pub fn failures(&self) -> impl Iterator<Item = &Deletion> {
        self.deletions.iter().filter(|d| d.error().is_some())
    }

    /// Whether every deletion and the compaction succeeded.
    pub fn is_success(&self) -> bool {
        self.failures().next().is_none() && self.compaction.result().is_ok()
    }

    /// Whether every failure in the run is retryable.
    ///
    /// False when the run succeeded.
    pub fn is_retryable(&self) -> bool {
        let errors: Vec<&StorageError> = self
            .failures()
            .filter_map(Deletion::error)
            .chain(self.compaction.result().err())
            .collect();
        !errors.is_empty() && errors.iter().all(|e| e.is_retryable())
    }
}

/// Delete every reference in a peer's namespace, then compact.
///
/// Equivalent to [`prune_namespace_with`] with default options and no
/// per-deletion callback.
pub fn prune_namespace<S: RepositoryStorage>(
    storage: &S,
    repository: &RepositoryId,
    peer: &PeerId,
) -> Result<PruneReport, PruneError> {
    prune_namespace_with(storage, repository, peer, PruneOptions::default(), |_| {})
}

/// Delete every reference in a peer's namespace, then compact.
///
/// `on_deletion` is called once per matched reference, right after its
/// deletion was attempted (or planned, in a dry run).
///
/// # Errors
///
/// - [`PruneError::Locate`] if the repository cannot be opened
/// - [`PruneError::Enumerate`] if its references cannot be read
///
/// Per-reference and compaction failures do not abort the run; they are
/// recorded in the returned [`PruneReport`].
pub fn prune_namespace_with<S, F>(
    storage: &S,
    repository: &RepositoryId,
    peer: &PeerId,
    options: PruneOptions,
    mut on_deletion: F,
) -> Result<PruneReport, PruneError>
where
    S: RepositoryStorage,
    F: FnMut(&Deletion),
{
    let mut stage = Stage::Idle;
    debug!(%repository, %peer, %stage, dry_run = options.dry_run, "pruning namespace");

    let mut handle = storage.open(repository).map_err(PruneError::Locate)?;

    advance(&mut stage, Stage::Enumerating);
    let references = enumerate(&handle).map_err(PruneError::Enumerate)?;
    debug!(count = references.len(), "enumerated references");

    advance(&mut stage, Stage::Filtering);
    let pattern = NamespacePattern::for_peer(peer);
    let matched = filter_namespace(references, &pattern);
    debug!(prefix = %pattern.prefix(), count = matched.len(), "matched references");

    advance(&mut stage, Stage::Deleting);
    let mut deletions = Vec::with_capacity(matched.len());
    for reference in matched {
        let status = if options.dry_run {
            DeletionStatus::Planned
        } else {
            match handle.delete_reference(&reference.name) {
                Ok(()) => {
                    info!(name = %reference.name, "deleted reference");
                    DeletionStatus::Deleted
                }
                Err(err) => {
                    warn!(name = %reference.name, error = %err, "failed to delete reference");
                    DeletionStatus::Failed(err)
                }
            }
        };

        let deletion = Deletion {
            name: reference.name,
            target: reference.target,
            status,
        };
        on_deletion(&deletion);
        deletions.push(deletion);
    }

    let compaction = if options.dry_run {
        Compaction::Skipped
    } else {
        advance(&mut stage, Stage::Compacting);
        match handle.compact() {
            Ok(()) => Compaction::Completed,
            Err(err) => {
                warn!(error = %err, "compaction failed");
                Compaction::Failed(err)
            }
        }
    };

    advance(&mut stage, Stage::Done);

    Ok(PruneReport {
        repository: repository.clone(),
        peer: peer.clone(),
        deletions,
        compaction,
    })
}

fn enumerate<H: RepositoryHandle>(handle: &H) -> Result<Vec<Reference>, StorageError> {
    handle.references()?.collect()
}

fn advance(stage: &mut Stage, next: Stage) {
    debug!(from = %stage, to = %next, "stage");
    *stage = next;
}
