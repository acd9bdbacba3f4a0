//! storage
//!
//! Repository storage API consumed by the pruner.
//!
//! # Architecture
//!
//! The pruner never talks to git directly. It locates a repository through
//! [`RepositoryStorage::open`] and then works only with the returned
//! [`RepositoryHandle`]: enumerate references, delete them one at a time,
//! compact. Every operation takes the handle explicitly; nothing depends on
//! the process working directory.
//!
//! Backends:
//! - [`git::GitStorage`] - git2-backed storage root (the production backend)
//! - [`memory::MemoryStorage`] - in-memory storage with failure injection
//!
//! # Error Handling
//!
//! Storage failures are categorized so the pruner can decide what is fatal:
//! - [`StorageError::RepositoryNotFound`]: no repository at the location
//! - [`StorageError::Read`]: the reference store cannot be read
//! - [`StorageError::Delete`]: a single reference could not be deleted
//! - [`StorageError::LockContention`]: another process holds a store lock
//! - [`StorageError::Compaction`]: the compaction pass failed

pub mod git;
pub mod memory;

use std::path::PathBuf;

use thiserror::Error;

use crate::core::types::{RefName, Reference, RepositoryId};

pub use git::{GitHandle, GitStorage};
pub use memory::{MemoryHandle, MemoryStorage, StorageOp};

/// Errors from storage operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    /// No repository exists for the identifier.
    #[error("repository '{id}' not found at {}", path.display())]
    RepositoryNotFound {
        /// The identifier that was looked up
        id: String,
        /// Where the repository was expected
        path: PathBuf,
    },

    /// The reference store could not be read.
    #[error("failed to read references: {message}")]
    Read {
        /// Description of the failure
        message: String,
    },

    /// A reference could not be deleted.
    #[error("{message}")]
    Delete {
        /// The reference being deleted
        refname: String,
        /// Description of the failure
        message: String,
    },

    /// Another process holds a lock on part of the store.
    ///
    /// Retryable: re-running the operation later may succeed.
    #[error("{resource} is locked: {message}")]
    LockContention {
        /// What was locked (a ref name or the repository)
        resource: String,
        /// Description from the store
        message: String,
    },

    /// Compaction of the object store failed.
    #[error("compaction failed: {message}")]
    Compaction {
        /// Description of the failure
        message: String,
    },
}

impl StorageError {
    /// Whether retrying the failed operation may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StorageError::LockContention { .. })
    }
}

/// Single-pass sequence of references in store order.
pub type ReferenceIter<'a> = Box<dyn Iterator<Item = Result<Reference, StorageError>> + 'a>;

/// A root under which repositories are stored.
pub trait RepositoryStorage {
    /// Handle to one opened repository.
    type Handle: RepositoryHandle;

    /// Locate and open a repository.
    ///
    /// Has no side effects on the repository.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::RepositoryNotFound`] if no repository exists
    /// for `id`.
    fn open(&self, id: &RepositoryId) -> Result<Self::Handle, StorageError>;
}

/// Operations on one opened repository.
pub trait RepositoryHandle {
    /// Enumerate all references currently stored.
    ///
    /// Order is whatever the store yields and carries no meaning.
    fn references(&self) -> Result<ReferenceIter<'_>, StorageError>;

    /// Atomically delete one reference.
    fn delete_reference(&mut self, name: &RefName) -> Result<(), StorageError>;

    /// Reclaim space in the repository's object store.
    fn compact(&mut self) -> Result<(), StorageError>;
}
