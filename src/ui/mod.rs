//! ui
//!
//! User-facing output.
//!
//! # Modules
//!
//! - [`output`] - Output formatting and display
//!
//! # Design
//!
//! All terminal output goes through this module so the stdout contract
//! (one line per deleted reference) stays in one place.

pub mod output;
