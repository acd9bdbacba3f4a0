//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Arguments
//!
//! - `<REPOSITORY>`: repository identifier under the storage root
//! - `<PEER>`: peer whose namespace is pruned
//!
//! # Flags
//!
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--storage <path>`: Storage root (overrides `$NSPRUNE_STORAGE`)
//! - `--dry-run`: Report matches without deleting or compacting
//! - `--json`: Print the report as JSON
//! - `--debug`: Enable debug logging
//! - `--quiet` / `-q`: Minimal output

use clap::Parser;
use std::path::PathBuf;

use crate::core::types::{PeerId, RepositoryId};
use crate::engine::Context;

/// nsprune - Remove a peer's reference namespace from a repository and compact it
#[derive(Parser, Debug)]
#[command(name = "nsprune")]
#[command(author, version, about, long_about = None)]
#[command(
    after_help = "\
EXAMPLES:
    # Remove everything a peer published into a repository
    nsprune z3gqcJUoA1n9HaHKufZs5FCSGazv5 z6MknSLrJoTcukLrE435hVNQT4JUhbvWLX4kUzqkEStBU8Vi

    # See what would be removed first
    nsprune --dry-run z3gqcJUoA1n9HaHKufZs5FCSGazv5 z6MknSLr...

ENVIRONMENT:
    NSPRUNE_STORAGE    Storage root (default: ~/.radicle/storage)
    RUST_LOG           Log filter (overrides --debug)"
)]
pub struct Cli {
    /// Repository identifier (directory name under the storage root)
    #[arg(value_name = "REPOSITORY")]
    pub repository: RepositoryId,

    /// Peer whose refs/namespaces/<PEER>/ references are removed
    #[arg(value_name = "PEER")]
    pub peer: PeerId,

    /// Storage root holding the repositories
    #[arg(long, value_name = "PATH")]
    pub storage: Option<PathBuf>,

    /// Show what would be deleted without changing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Print the report as a JSON object
    #[arg(long)]
    pub json: bool,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Minimal output
    #[arg(short, long)]
    pub quiet: bool,
}

impl Cli {
    /// Build the execution context from the parsed flags.
    pub fn context(&self) -> Context {
        Context {
            storage: self.storage.clone(),
            debug: self.debug,
            quiet: self.quiet,
            json: self.json,
            dry_run: self.dry_run,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn parses_positionals() {
        let cli = Cli::try_parse_from(["nsprune", "z3", "p1"]).unwrap();
        assert_eq!(cli.repository.as_str(), "z3");
        assert_eq!(cli.peer.as_str(), "p1");
        assert!(!cli.dry_run);
    }

    #[test]
    fn parses_flags() {
        let cli = Cli::try_parse_from([
            "nsprune",
            "--storage",
            "/srv",
            "--dry-run",
            "--json",
            "-q",
            "z3",
            "p1",
        ])
        .unwrap();
        let ctx = cli.context();
        assert_eq!(ctx.storage, Some(PathBuf::from("/srv")));
        assert!(ctx.dry_run && ctx.json && ctx.quiet);
        assert!(!ctx.debug);
    }

    #[test]
    fn missing_arguments_rejected() {
        let err = Cli::try_parse_from(["nsprune"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);

        let err = Cli::try_parse_from(["nsprune", "z3"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn invalid_identifiers_rejected() {
        let err = Cli::try_parse_from(["nsprune", "../etc", "p1"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValueValidation);

        let err = Cli::try_parse_from(["nsprune", "z3", "a/b"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValueValidation);
    }

    #[test]
    fn clap_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
