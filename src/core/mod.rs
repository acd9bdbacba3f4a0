//! core
//!
//! Core domain types, matching rules and configuration for nsprune.
//!
//! # Modules
//!
//! - [`types`] - Strong types: RepositoryId, PeerId, Oid, RefName, Reference
//! - [`namespace`] - Peer namespace pattern and filter
//! - [`config`] - Storage root resolution
//!
//! # Design Principles
//!
//! - Strong typing prevents invalid states at compile time
//! - Matching is pure and independent of any storage backend

pub mod config;
pub mod namespace;
pub mod types;
