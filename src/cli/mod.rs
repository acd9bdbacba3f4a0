//! cli
//!
//! Command-line interface layer for nsprune.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and flags
//! - Resolve the storage root and open storage
//! - Delegate to [`crate::engine::prune`] and render its report
//!
//! # Exit Status
//!
//! - `0`: every deletion and the compaction succeeded
//! - `1`: usage error (nothing was opened), fatal storage error, or any
//!   per-reference or compaction failure
//!
//! # Architecture
//!
//! The CLI layer is thin. Storage is injected through [`run_with`] so the
//! whole command, argument parsing included, can be exercised against the
//! in-memory store.

pub mod args;

pub use args::Cli;

use std::ffi::OsString;
use std::io::{self, Write};

use anyhow::{Context as _, Result};
use clap::error::ErrorKind;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::core::config::StorageConfig;
use crate::core::types::{PeerId, RepositoryId};
use crate::engine::{self, Compaction, Context};
use crate::storage::{GitStorage, RepositoryStorage, StorageError};
use crate::ui::output::{self, Verbosity};

const RETRY_HINT: &str =
    "hint: another process holds a lock on the repository; re-run the command to retry";

/// How the process should exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    /// Everything succeeded.
    Success,
    /// Arguments were missing or invalid. Storage was not touched.
    Usage,
    /// The run failed or partially failed.
    Failure,
}

impl ExitStatus {
    /// The process exit code.
    pub fn code(self) -> u8 {
        match self {
            ExitStatus::Success => 0,
            ExitStatus::Usage | ExitStatus::Failure => 1,
        }
    }
}

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub fn run() -> ExitStatus {
    let stdout = io::stdout();
    let stderr = io::stderr();
    run_with(
        std::env::args_os(),
        GitStorage::new,
        &mut stdout.lock(),
        &mut stderr.lock(),
    )
}

/// Run the CLI with explicit arguments, storage and output streams.
///
/// `open_storage` is called only once arguments are valid and the storage
/// root has been resolved.
pub fn run_with<I, T, S, F>(
    args: I,
    open_storage: F,
    out: &mut dyn Write,
    err: &mut dyn Write,
) -> ExitStatus
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
    S: RepositoryStorage,
    F: FnOnce(StorageConfig) -> S,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(e) => return usage(e, out, err),
    };

    init_logging(cli.debug);

    match execute(&cli.context(), &cli.repository, &cli.peer, open_storage, out, err) {
        Ok(status) => status,
        Err(e) => {
            // Output streams may be gone; nothing more to report to.
            let _ = output::error(err, format_args!("{:#}", e));
            ExitStatus::Failure
        }
    }
}

fn usage(e: clap::Error, out: &mut dyn Write, err: &mut dyn Write) -> ExitStatus {
    match e.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
            let _ = write!(out, "{}", e.render());
            ExitStatus::Success
        }
        _ => {
            let _ = write!(err, "{}", e.render());
            ExitStatus::Usage
        }
    }
}

fn execute<S, F>(
    ctx: &Context,
    repository: &RepositoryId,
    peer: &PeerId,
    open_storage: F,
    out: &mut dyn Write,
    err: &mut dyn Write,
) -> Result<ExitStatus>
where
    S: RepositoryStorage,
    F: FnOnce(StorageConfig) -> S,
{
    let verbosity = Verbosity::from_flags(ctx.quiet, ctx.debug);
    let config = StorageConfig::load(ctx.storage.clone()).context("cannot resolve storage root")?;
    let storage = open_storage(config);

    let mut write_failure = None;
    let result = engine::prune_namespace_with(
        &storage,
        repository,
        peer,
        ctx.prune_options(),
        |deletion| {
            if ctx.json || write_failure.is_some() {
                return;
            }
            if let Err(e) = output::deletion(out, err, deletion) {
                write_failure = Some(e);
            }
        },
    );
    if let Some(e) = write_failure {
        return Err(e).context("cannot write output");
    }

    let report = match result {
        Ok(report) => report,
        Err(e) => {
            if ctx.json {
                serde_json::to_writer_pretty(
                    &mut *out,
                    &output::error_json(repository, peer, &e),
                )?;
                writeln!(out)?;
            }
            output::error(err, &e)?;
            if e.is_retryable() && !ctx.json {
                output::note(err, RETRY_HINT, verbosity)?;
            }
            return Ok(ExitStatus::Failure);
        }
    };

    if ctx.json {
        serde_json::to_writer_pretty(&mut *out, &output::report_json(&report))?;
        writeln!(out)?;
    } else {
        match &report.compaction {
            Compaction::Completed => {
                output::note(err, format_args!("Compacted {}", repository), verbosity)?
            }
            Compaction::Failed(e @ StorageError::Compaction { .. }) => output::error(err, e)?,
            Compaction::Failed(e) => output::error(err, format_args!("compaction failed: {}", e))?,
            Compaction::Skipped => {}
        }
    }

    if report.is_success() {
        return Ok(ExitStatus::Success);
    }
    if report.is_retryable() && !ctx.json {
        output::note(err, RETRY_HINT, verbosity)?;
    }
    Ok(ExitStatus::Failure)
}

/// Install the stderr log subscriber.
///
/// `RUST_LOG` wins over `--debug`. Calling this more than once is harmless.
fn init_logging(debug: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if debug { "nsprune=debug" } else { "error" })
    });
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{Oid, RefName};
    use crate::storage::memory::FailOn;
    use crate::storage::MemoryStorage;

    fn seeded() -> MemoryStorage {
        let storage = MemoryStorage::new();
        let repo = RepositoryId::new("z3").unwrap();
        let oid = Oid::new("a".repeat(40)).unwrap();
        for name in [
            "namespaces/p1/heads/main",
            "namespaces/p2/heads/main",
            "refs/heads/master",
        ] {
            storage.insert_ref(&repo, RefName::new(name).unwrap(), oid.clone());
        }
        storage
    }

    fn run_args(args: &[&str], storage: &MemoryStorage) -> (ExitStatus, String, String) {
        let mut out = Vec::new();
        let mut err = Vec::new();
        let mut argv = vec!["nsprune", "--storage", "/unused"];
        argv.extend_from_slice(args);
        let status = run_with(argv, |_| storage.clone(), &mut out, &mut err);
        (
            status,
            String::from_utf8(out).unwrap(),
            String::from_utf8(err).unwrap(),
        )
    }

    #[test]
    fn missing_arguments_never_open_storage() {
        for args in [&[][..], &["z3"][..]] {
            let storage = seeded();
            let mut opened = false;
            let mut out = Vec::new();
            let mut err = Vec::new();
            let mut argv = vec!["nsprune"];
            argv.extend_from_slice(args);

            let status = run_with(
                argv,
                |_| {
                    opened = true;
                    storage.clone()
                },
                &mut out,
                &mut err,
            );

            assert_eq!(status, ExitStatus::Usage);
            assert_eq!(status.code(), 1);
            assert!(!opened);
            assert!(storage.operations().is_empty());
            assert!(String::from_utf8(err).unwrap().contains("Usage:"));
        }
    }

    #[test]
    fn prints_one_line_per_deleted_reference() {
        let storage = seeded();
        let (status, out, err) = run_args(&["z3", "p1"], &storage);

        assert_eq!(status, ExitStatus::Success);
        assert_eq!(out, "Deleted namespaces/p1/heads/main\n");
        assert_eq!(err, "Compacted z3\n");
    }

    #[test]
    fn quiet_keeps_deleted_lines() {
        let storage = seeded();
        let (status, out, err) = run_args(&["-q", "z3", "p1"], &storage);

        assert_eq!(status, ExitStatus::Success);
        assert_eq!(out, "Deleted namespaces/p1/heads/main\n");
        assert!(err.is_empty());
    }

    #[test]
    fn unknown_repository_fails() {
        let storage = seeded();
        let (status, out, err) = run_args(&["nope", "p1"], &storage);

        assert_eq!(status, ExitStatus::Failure);
        assert!(out.is_empty());
        assert!(err.starts_with("error: repository 'nope' not found"));
    }

    #[test]
    fn failures_exit_nonzero_after_finishing() {
        let storage = seeded();
        storage.fail_on(FailOn::Compact(StorageError::LockContention {
            resource: "z3".into(),
            message: "gc is already running".into(),
        }));
        let (status, out, err) = run_args(&["z3", "p1"], &storage);

        assert_eq!(status, ExitStatus::Failure);
        assert_eq!(out, "Deleted namespaces/p1/heads/main\n");
        assert!(err.contains("error: compaction failed: z3 is locked"));
        assert!(err.contains(RETRY_HINT));
    }

    #[test]
    fn dry_run_lists_matches() {
        let storage = seeded();
        let (status, out, _) = run_args(&["--dry-run", "z3", "p1"], &storage);

        assert_eq!(status, ExitStatus::Success);
        assert_eq!(out, "Would delete namespaces/p1/heads/main\n");
        assert_eq!(
            storage.refs(&RepositoryId::new("z3").unwrap()).len(),
            3
        );
    }

    #[test]
    fn json_output() {
        let storage = seeded();
        let (status, out, _) = run_args(&["--json", "z3", "p1"], &storage);

        assert_eq!(status, ExitStatus::Success);
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["deleted"][0], "namespaces/p1/heads/main");
        assert_eq!(value["compaction"]["status"], "completed");
    }

    #[test]
    fn json_output_for_unknown_repository() {
        let storage = seeded();
        let (status, out, err) = run_args(&["--json", "nope", "p1"], &storage);

        assert_eq!(status, ExitStatus::Failure);
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["error"]["stage"], "locate");
        assert_eq!(value["success"], false);
        assert!(err.starts_with("error: repository 'nope' not found"));
    }

    #[test]
    fn help_exits_zero() {
        let storage = seeded();
        let mut out = Vec::new();
        let mut err = Vec::new();
        let status = run_with(["nsprune", "--help"], |_| storage.clone(), &mut out, &mut err);

        assert_eq!(status, ExitStatus::Success);
        assert!(String::from_utf8(out).unwrap().contains("<REPOSITORY>"));
    }
}
