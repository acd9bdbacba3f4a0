//! ui::output
//!
//! Output formatting and display.
//!
//! # Design
//!
//! stdout carries results only: one `Deleted <name>` line per deleted
//! reference (`Would delete <name>` in a dry run), or a single JSON object
//! when `--json` is enabled. Everything else goes to stderr. Errors are
//! always shown; informational notes respect the quiet flag.

use std::fmt::Display;
use std::io::{self, Write};

use serde_json::{json, Value};

use crate::core::types::{PeerId, RepositoryId};
use crate::engine::{Compaction, Deletion, DeletionStatus, PruneError, PruneReport};

/// Output verbosity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// Quiet mode - minimal output
    Quiet,
    /// Normal mode - standard output
    Normal,
    /// Debug mode - verbose output
    Debug,
}

impl Verbosity {
    /// Create verbosity from flags.
    pub fn from_flags(quiet: bool, debug: bool) -> Self {
        if quiet {
            Verbosity::Quiet
        } else if debug {
            Verbosity::Debug
        } else {
            Verbosity::Normal
        }
    }
}

/// Print an error message (always shown).
pub fn error(err: &mut dyn Write, message: impl Display) -> io::Result<()> {
    writeln!(err, "error: {}", message)
}

/// Print an informational note (respects quiet mode).
pub fn note(err: &mut dyn Write, message: impl Display, verbosity: Verbosity) -> io::Result<()> {
    if verbosity != Verbosity::Quiet {
        writeln!(err, "{}", message)?;
    }
    Ok(())
}

/// The stdout line for a deletion attempt, if it has one.
///
/// Failed deletions have no stdout line; they are reported on stderr.
pub fn deletion_line(deletion: &Deletion) -> Option<String> {
    match deletion.status {
        DeletionStatus::Deleted => Some(format!("Deleted {}", deletion.name)),
        DeletionStatus::Planned => Some(format!("Would delete {}", deletion.name)),
        DeletionStatus::Failed(_) => None,
    }
}

/// Print one deletion attempt as it happens.
pub fn deletion(out: &mut dyn Write, err: &mut dyn Write, deletion: &Deletion) -> io::Result<()> {
    if let Some(line) = deletion_line(deletion) {
        writeln!(out, "{}", line)?;
    }
    if let Some(e) = deletion.error() {
        error(err, format_args!("failed to delete {}: {}", deletion.name, e))?;
    }
    Ok(())
}

/// Render a report as a JSON value.
pub fn report_json(report: &PruneReport) -> Value {
    let deletions: Vec<Value> = report
        .deletions
        .iter()
        .map(|d| {
            let (status, error) = match &d.status {
                DeletionStatus::Deleted => ("deleted", None),
                DeletionStatus::Planned => ("planned", None),
                DeletionStatus::Failed(e) => ("failed", Some(e.to_string())),
            };
            json!({
                "name": d.name,
                "target": d.target.to_string(),
                "status": status,
                "error": error,
                "retryable": d.error().is_some_and(|e| e.is_retryable()),
            })
        })
        .collect();

    let compaction = match &report.compaction {
        Compaction::Completed => json!({ "status": "completed" }),
        Compaction::Skipped => json!({ "status": "skipped" }),
        Compaction::Failed(e) => json!({
            "status": "failed",
            "error": e.to_string(),
            "retryable": e.is_retryable(),
        }),
    };

    json!({
        "repository": report.repository,
        "peer": report.peer,
        "deleted": report.deleted(),
        "deletions": deletions,
        "compaction": compaction,
        "success": report.is_success(),
    })
}

/// Render a run that aborted before deletion as a JSON value.
pub fn error_json(repository: &RepositoryId, peer: &PeerId, err: &PruneError) -> Value {
    let stage = match err {
        PruneError::Locate(_) => "locate",
        PruneError::Enumerate(_) => "enumerate",
    };
    json!({
        "repository": repository,
        "peer": peer,
        "error": {
            "stage": stage,
            "message": err.to_string(),
            "retryable": err.is_retryable(),
        },
        "success": false,
    })
}
