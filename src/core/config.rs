//! core::config
//!
//! Storage root resolution.
//!
//! # Overview
//!
//! nsprune reads no configuration file. The only setting is the storage
//! root, the directory under which every repository known to the local
//! node lives (one subdirectory per repository identifier).
//!
//! # Precedence
//!
//! Resolved in this order (first match wins):
//! 1. Explicit value (the `--storage` flag)
//! 2. `$NSPRUNE_STORAGE` if set and non-empty
//! 3. `~/.radicle/storage`
//!
//! # Example
//!
//! ```
//! use nsprune::core::config::StorageConfig;
//! use std::path::{Path, PathBuf};
//!
//! let config = StorageConfig::resolve(
//!     None,
//!     Some("/srv/storage".into()),
//!     Some(PathBuf::from("/home/alice")),
//! )
//! .unwrap();
//! assert_eq!(config.root(), Path::new("/srv/storage"));
//! ```

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::core::types::RepositoryId;

/// Environment variable naming the storage root.
pub const STORAGE_ENV: &str = "NSPRUNE_STORAGE";

/// Default storage root, relative to the home directory.
pub const DEFAULT_STORAGE_DIR: &str = ".radicle/storage";

/// Errors from configuration resolution.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("home directory not found; set {STORAGE_ENV} to the storage root")]
    NoHomeDir,
}

/// Resolved storage configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    root: PathBuf,
}

impl StorageConfig {
    /// Create a configuration for a known root.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve the storage root from the process environment.
    ///
    /// `explicit` takes precedence over `$NSPRUNE_STORAGE`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoHomeDir`] if neither an explicit root nor
    /// the environment variable is given and the home directory is unknown.
    pub fn load(explicit: Option<PathBuf>) -> Result<Self, ConfigError> {
        Self::resolve(explicit, std::env::var_os(STORAGE_ENV), dirs::home_dir())
    }

    /// Resolve the storage root from explicit inputs.
    ///
    /// Empty values are treated as unset.
    pub fn resolve(
        explicit: Option<PathBuf>,
        env: Option<OsString>,
        home: Option<PathBuf>,
    ) -> Result<Self, ConfigError> {
        if let Some(root) = explicit.filter(|p| !p.as_os_str().is_empty()) {
            return Ok(Self::new(root));
        }
        if let Some(root) = env.filter(|v| !v.is_empty()) {
            return Ok(Self::new(root));
        }
        home.map(|home| Self::new(home.join(DEFAULT_STORAGE_DIR)))
            .ok_or(ConfigError::NoHomeDir)
    }

    /// The storage root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Location of a repository under the root.
    pub fn repository_path(&self, id: &RepositoryId) -> PathBuf {
        self.root.join(id.as_str())
    }
}
