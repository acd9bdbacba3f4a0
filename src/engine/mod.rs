//! engine
//!
//! Orchestrates a pruning run: Locate -> Enumerate -> Filter -> Delete -> Compact.
//!
//! # Architecture
//!
//! The engine sits between the CLI and storage. It knows nothing about git
//! or the filesystem; everything it touches goes through the
//! [`crate::storage::RepositoryStorage`] API, so the same run can be driven
//! against git repositories or the in-memory store.
//!
//! # Invariants
//!
//! - Runs are strictly sequential; compaction starts only after the last
//!   deletion attempt returned
//! - Only locate and enumerate failures abort a run
//! - Every deletion attempt is reported

pub mod prune;

pub use prune::{
    prune_namespace, prune_namespace_with, Compaction, Deletion, DeletionStatus, PruneError,
    PruneOptions, PruneReport, Stage,
};

use std::path::PathBuf;

/// Execution context for a run.
///
/// Contains global settings derived from CLI flags.
#[derive(Debug, Clone, Default)]
pub struct Context {
    /// Storage root override.
    pub storage: Option<PathBuf>,
    /// Debug logging enabled.
    pub debug: bool,
    /// Quiet mode (minimal output).
    pub quiet: bool,
    /// Emit the report as JSON.
    pub json: bool,
    /// Report matches without mutating storage.
    pub dry_run: bool,
}

impl Context {
    /// Pruning options implied by this context.
    pub fn prune_options(&self) -> PruneOptions {
        PruneOptions {
            dry_run: self.dry_run,
        }
    }
}
