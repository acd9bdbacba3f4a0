//! nsprune - Remove a peer's reference namespace from a repository
//!
//! In a git-based collaboration network each peer's references live under
//! `refs/namespaces/<peer>/` inside a shared repository. nsprune deletes
//! every reference in one peer's namespace and then compacts the
//! repository's object store.
//!
//! # Architecture
//!
//! The codebase follows a strict layered architecture:
//!
//! - [`cli`] - Command-line interface layer (parses args, delegates to engine)
//! - [`engine`] - Runs the Locate → Enumerate → Filter → Delete → Compact pipeline
//! - [`core`] - Domain types, namespace matching, configuration
//! - [`storage`] - Repository storage API and its git2 and in-memory backends
//! - [`ui`] - Output formatting
//!
//! # Correctness Invariants
//!
//! 1. Only references inside the peer's namespace are ever deleted
//! 2. References outside the namespace keep their names and targets
//! 3. Compaction runs exactly once per run that reaches the deletion stage
//! 4. Every deletion attempt is reported, successful or not

pub mod cli;
pub mod core;
pub mod engine;
pub mod storage;
pub mod ui;
