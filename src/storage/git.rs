//! storage::git
//!
//! Repository storage backed by git2.
//!
//! Each repository lives at `<root>/<repository-id>` and is usually bare.
//! Reference enumeration and deletion go through libgit2, so pruning a
//! namespace spawns no process per reference. libgit2 has no garbage
//! collector, so compaction runs `git gc` against the repository's git
//! directory.
//!
//! # Error Handling
//!
//! git2 errors are normalized into [`StorageError`]:
//! - `ErrorCode::Locked` becomes [`StorageError::LockContention`]
//! - `ErrorCode::NotFound` on open becomes [`StorageError::RepositoryNotFound`]
//! - anything else becomes the failure category of the operation
//!
//! # Example
//!
//! ```no_run
//! use nsprune::core::config::StorageConfig;
//! use nsprune::core::types::RepositoryId;
//! use nsprune::storage::{GitStorage, RepositoryHandle, RepositoryStorage};
//!
//! let storage = GitStorage::new(StorageConfig::new("/srv/storage"));
//! let handle = storage.open(&RepositoryId::new("z3gqc").unwrap())?;
//! for reference in handle.references()? {
//!     let reference = reference?;
//!     println!("{} {}", reference.target, reference.name);
//! }
//! # Ok::<(), nsprune::storage::StorageError>(())
//! ```

use std::borrow::Cow;
use std::cell::RefCell;
use std::collections::HashMap;
use std::ffi::OsString;
use std::path::Path;
use std::process::Command;

use tracing::{debug, warn};

use super::{ReferenceIter, RepositoryHandle, RepositoryStorage, StorageError};
use crate::core::config::StorageConfig;
use crate::core::types::{Oid, RefName, Reference, RepositoryId, Target};

/// Storage root holding git repositories.
#[derive(Debug, Clone)]
pub struct GitStorage {
    config: StorageConfig,
    git_program: OsString,
}

impl GitStorage {
    /// Create storage over a resolved configuration.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            git_program: OsString::from("git"),
        }
    }

    /// Use a different `git` executable for compaction.
    pub fn with_git_program(mut self, program: impl Into<OsString>) -> Self {
        self.git_program = program.into();
        self
    }
}

impl RepositoryStorage for GitStorage {
    type Handle = GitHandle;

    fn open(&self, id: &RepositoryId) -> Result<GitHandle, StorageError> {
        let path = self.config.repository_path(id);
        let not_found = || StorageError::RepositoryNotFound {
            id: id.to_string(),
            path: path.clone(),
        };

        if !path.is_dir() {
            return Err(not_found());
        }

        // `open` does not search parent directories, so a stray directory
        // under the root is never resolved to an enclosing repository.
        let repo = git2::Repository::open(&path).map_err(|e| match e.code() {
            git2::ErrorCode::NotFound => not_found(),
            git2::ErrorCode::Locked => lock_contention(e, &path.display().to_string()),
            _ => StorageError::Read {
                message: format!("cannot open {}: {}", path.display(), e.message()),
            },
        })?;

        debug!(repository = %id, path = %repo.path().display(), "opened repository");

        Ok(GitHandle {
            repo,
            git_program: self.git_program.clone(),
            raw_names: RefCell::default(),
        })
    }
}

/// An opened git repository.
pub struct GitHandle {
    repo: git2::Repository,
    git_program: OsString,
    /// Raw names of enumerated refs that are not UTF-8, keyed by their
    /// lossy rendering.
    raw_names: RefCell<HashMap<RefName, Vec<Vec<u8>>>>,
}

impl std::fmt::Debug for GitHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHandle")
            .field("path", &self.repo.path())
            .finish()
    }
}

impl GitHandle {
    /// Path to the repository's git directory.
    pub fn git_dir(&self) -> &Path {
        self.repo.path()
    }

    /// Delete a ref whose name is not UTF-8.
    ///
    /// libgit2 can only look refs up by `&str`, so the store is scanned for
    /// the exact raw name and the match is deleted through its handle.
    fn delete_raw(&self, raw: &[u8], name: &RefName) -> Result<(), StorageError> {
        let references = self.repo.references().map_err(|e| delete_error(e, name))?;
        for reference in references {
            let mut reference = reference.map_err(|e| delete_error(e, name))?;
            if reference.name_bytes() == raw {
                return reference.delete().map_err(|e| delete_error(e, name));
            }
        }
        Err(StorageError::Delete {
            refname: name.to_string(),
            message: "reference not found".to_string(),
        })
    }
}

impl RepositoryHandle for GitHandle {
    fn references(&self) -> Result<ReferenceIter<'_>, StorageError> {
        let references = self.repo.references().map_err(read_error)?;
        self.raw_names.borrow_mut().clear();

        Ok(Box::new(references.filter_map(move |reference| {
            let reference = match reference {
                Ok(reference) => reference,
                Err(e) => return Some(Err(read_error(e))),
            };
            match to_reference(&reference) {
                Ok(Some((converted, raw))) => {
                    if let Some(raw) = raw {
                        self.raw_names
                            .borrow_mut()
                            .entry(converted.name.clone())
                            .or_default()
                            .push(raw);
                    }
                    Some(Ok(converted))
                }
                Ok(None) => None,
                Err(e) => Some(Err(e)),
            }
        })))
    }

    fn delete_reference(&mut self, name: &RefName) -> Result<(), StorageError> {
        if let Some(raw) = self.raw_names.get_mut().get_mut(name).and_then(Vec::pop) {
            return self.delete_raw(&raw, name);
        }

        let mut reference = self
            .repo
            .find_reference(name.as_str())
            .map_err(|e| delete_error(e, name))?;

        reference.delete().map_err(|e| delete_error(e, name))
    }

    fn compact(&mut self) -> Result<(), StorageError> {
        let git_dir = self.repo.path().to_path_buf();
        debug!(git_dir = %git_dir.display(), "running git gc");

        let output = Command::new(&self.git_program)
            .arg("--git-dir")
            .arg(&git_dir)
            .args(["gc", "--quiet"])
            .output()
            .map_err(|e| StorageError::Compaction {
                message: format!("failed to run git gc: {e}"),
            })?;

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        Err(classify_gc_failure(&git_dir, stderr))
    }
}

/// Convert a git2 reference.
///
/// A name that is not UTF-8 is rendered lossily and returned together with
/// its raw bytes, so the ref still takes part in matching and deletion.
fn to_reference(
    reference: &git2::Reference<'_>,
) -> Result<Option<(Reference, Option<Vec<u8>>)>, StorageError> {
    let bytes = reference.name_bytes();
    let (rendered, raw) = match reference.name() {
        Some(name) => (Cow::Borrowed(name), None),
        None => (String::from_utf8_lossy(bytes), Some(bytes.to_vec())),
    };

    let name = match RefName::new(rendered.as_ref()) {
        Ok(name) => name,
        Err(e) => {
            warn!(name = %rendered, error = %e, "skipping reference with invalid name");
            return Ok(None);
        }
    };

    let target = match reference.kind() {
        Some(git2::ReferenceType::Direct) => {
            let Some(oid) = reference.target() else {
                return Ok(None);
            };
            let oid = Oid::new(oid.to_string()).map_err(|e| StorageError::Read {
                message: format!("{}: {}", name, e),
            })?;
            Target::Direct(oid)
        }
        Some(git2::ReferenceType::Symbolic) => {
            let Some(target) = reference.symbolic_target_bytes() else {
                return Ok(None);
            };
            let target = String::from_utf8_lossy(target);
            let target = RefName::new(target.as_ref()).map_err(|e| StorageError::Read {
                message: format!("{}: {}", name, e),
            })?;
            Target::Symbolic(target)
        }
        None => return Ok(None),
    };

    Ok(Some((Reference { name, target }, raw)))
}

fn lock_contention(err: git2::Error, resource: &str) -> StorageError {
    StorageError::LockContention {
        resource: resource.to_string(),
        message: err.message().to_string(),
    }
}

fn read_error(err: git2::Error) -> StorageError {
    match err.code() {
        git2::ErrorCode::Locked => lock_contention(err, "reference store"),
        _ => StorageError::Read {
            message: err.message().to_string(),
        },
    }
}

fn delete_error(err: git2::Error, name: &RefName) -> StorageError {
    match err.code() {
        git2::ErrorCode::Locked => lock_contention(err, name.as_str()),
        git2::ErrorCode::NotFound => StorageError::Delete {
            refname: name.to_string(),
            message: "reference not found".to_string(),
        },
        _ => StorageError::Delete {
            refname: name.to_string(),
            message: err.message().to_string(),
        },
    }
}

/// Markers `git gc` prints when another process holds a lock it needs.
const GC_LOCK_MARKERS: [&str; 2] = ["gc is already running", ".lock': File exists"];

fn classify_gc_failure(git_dir: &Path, stderr: String) -> StorageError {
    if GC_LOCK_MARKERS.iter().any(|marker| stderr.contains(marker)) {
        StorageError::LockContention {
            resource: git_dir.display().to_string(),
            message: stderr,
        }
    } else if stderr.is_empty() {
        StorageError::Compaction {
            message: "git gc exited unsuccessfully".to_string(),
        }
    } else {
        StorageError::Compaction { message: stderr }
    }
}
