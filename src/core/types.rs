//! core::types
//!
//! Strong types for the identifiers and names the pruner works with.
//!
//! # Types
//!
//! - [`RepositoryId`] - Key of a repository directory under the storage root
//! - [`PeerId`] - Key of a peer namespace inside a repository
//! - [`Oid`] - Git object identifier (SHA-1 or SHA-256)
//! - [`RefName`] - Validated Git reference name, viewed as path segments
//! - [`Target`] - What a reference points at
//! - [`Reference`] - A named reference and its target
//!
//! # Validation
//!
//! These types enforce validity at construction time. An identifier that
//! could escape the storage root or a peer key that could span several
//! ref components cannot be represented.
//!
//! # Examples
//!
//! ```
//! use nsprune::core::types::{PeerId, RefName, RepositoryId};
//!
//! let repo = RepositoryId::new("z3gqcJUoA1n9HaHKufZs5FCSGazv5").unwrap();
//! let peer = PeerId::new("z6MknSLrJoTcukLrE435hVNQT4JUhbvWLX4kUzqkEStBU8Vi").unwrap();
//! let name = RefName::new("refs/namespaces/abc/refs/heads/main").unwrap();
//!
//! assert_eq!(repo.as_str(), "z3gqcJUoA1n9HaHKufZs5FCSGazv5");
//! assert!(peer.as_str().starts_with("z6Mk"));
//! assert_eq!(name.segments().count(), 6);
//!
//! // Path traversal and multi-component peers are rejected
//! assert!(RepositoryId::new("../etc").is_err());
//! assert!(PeerId::new("abc/def").is_err());
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid repository identifier: {0}")]
    InvalidRepositoryId(String),

    #[error("invalid peer identifier: {0}")]
    InvalidPeerId(String),

    #[error("invalid object id: {0}")]
    InvalidOid(String),

    #[error("invalid ref name: {0}")]
    InvalidRefName(String),
}

/// Identifier of a repository within the storage root.
///
/// The identifier names a directory directly below the root, so it must be
/// a single path component.
///
/// # Example
///
/// ```
/// use nsprune::core::types::RepositoryId;
///
/// assert!(RepositoryId::new("z3gqcJUoA1n9HaHKufZs5FCSGazv5").is_ok());
/// assert!(RepositoryId::new("").is_err());
/// assert!(RepositoryId::new("..").is_err());
/// assert!(RepositoryId::new("a/b").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RepositoryId(String);

impl RepositoryId {
    /// Create a new validated repository identifier.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidRepositoryId` if the identifier is empty,
    /// is `.` or `..`, contains a path separator, or contains control
    /// characters.
    pub fn new(id: impl Into<String>) -> Result<Self, TypeError> {
        let id = id.into();
        Self::validate(&id)?;
        Ok(Self(id))
    }

    fn validate(id: &str) -> Result<(), TypeError> {
        if id.is_empty() {
            return Err(TypeError::InvalidRepositoryId(
                "repository identifier cannot be empty".into(),
            ));
        }
        if id == "." || id == ".." {
            return Err(TypeError::InvalidRepositoryId(format!(
                "'{id}' is not a repository identifier"
            )));
        }
        if id.contains('/') || id.contains('\\') {
            return Err(TypeError::InvalidRepositoryId(
                "repository identifier cannot contain path separators".into(),
            ));
        }
        if id.chars().any(|c| c.is_ascii_control()) {
            return Err(TypeError::InvalidRepositoryId(
                "repository identifier cannot contain control characters".into(),
            ));
        }
        Ok(())
    }

    /// Get the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RepositoryId {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<RepositoryId> for String {
    fn from(id: RepositoryId) -> Self {
        id.0
    }
}

impl std::fmt::Display for RepositoryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for RepositoryId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Identifier of a peer whose references live under
/// `refs/namespaces/<peer>/`.
///
/// A peer identifier is exactly one ref path component, so it must obey
/// git's component rules and cannot contain `/`.
///
/// # Example
///
/// ```
/// use nsprune::core::types::PeerId;
///
/// assert!(PeerId::new("abc").is_ok());
/// assert!(PeerId::new("").is_err());
/// assert!(PeerId::new("a/b").is_err());
/// assert!(PeerId::new(".hidden").is_err());
/// assert!(PeerId::new("peer.lock").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PeerId(String);

impl PeerId {
    /// Create a new validated peer identifier.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidPeerId` if the identifier is not a valid
    /// single ref component.
    pub fn new(id: impl Into<String>) -> Result<Self, TypeError> {
        let id = id.into();
        if id.contains('/') {
            return Err(TypeError::InvalidPeerId(
                "peer identifier cannot contain '/'".into(),
            ));
        }
        // Stands in for undecodable bytes in stored ref names.
        if id.contains(char::REPLACEMENT_CHARACTER) {
            return Err(TypeError::InvalidPeerId(
                "peer identifier cannot contain U+FFFD".into(),
            ));
        }
        validate_component(&id).map_err(TypeError::InvalidPeerId)?;
        Ok(Self(id))
    }

    /// Get the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for PeerId {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<PeerId> for String {
    fn from(id: PeerId) -> Self {
        id.0
    }
}

impl std::fmt::Display for PeerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for PeerId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// A Git object identifier (SHA-1 or SHA-256).
///
/// OIDs are normalized to lowercase for consistency.
///
/// # Example
///
/// ```
/// use nsprune::core::types::Oid;
///
/// let oid = Oid::new("ABC123DEF4567890ABC123DEF4567890ABC12345").unwrap();
/// assert_eq!(oid.as_str(), "abc123def4567890abc123def4567890abc12345");
/// assert!(Oid::new("not-a-sha").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Oid(String);

impl Oid {
    /// Create a new validated object id.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidOid` if the string is not a 40 or 64
    /// character hex string.
    pub fn new(oid: impl Into<String>) -> Result<Self, TypeError> {
        let oid = oid.into().to_ascii_lowercase();
        if oid.len() != 40 && oid.len() != 64 {
            return Err(TypeError::InvalidOid(format!(
                "expected 40 or 64 hex characters, got {}",
                oid.len()
            )));
        }
        if !oid.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(TypeError::InvalidOid(
                "object id must be hexadecimal".into(),
            ));
        }
        Ok(Self(oid))
    }

    /// Get the object id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Oid {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<Oid> for String {
    fn from(oid: Oid) -> Self {
        oid.0
    }
}

impl std::fmt::Display for Oid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A validated Git reference name.
///
/// The name is stored as written (`refs/namespaces/abc/refs/heads/main`)
/// and is matched structurally through [`RefName::segments`].
///
/// # Example
///
/// ```
/// use nsprune::core::types::RefName;
///
/// let name = RefName::new("refs/namespaces/abc/refs/heads/main").unwrap();
/// let segments: Vec<&str> = name.segments().collect();
/// assert_eq!(segments, ["refs", "namespaces", "abc", "refs", "heads", "main"]);
///
/// assert!(RefName::new("refs//heads").is_err());
/// assert!(RefName::new("refs/heads/").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RefName(String);

impl RefName {
    /// Create a new validated ref name.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidRefName` if the name violates Git's refname rules.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        Self::validate(&name)?;
        Ok(Self(name))
    }

    fn validate(name: &str) -> Result<(), TypeError> {
        if name.is_empty() {
            return Err(TypeError::InvalidRefName("ref name cannot be empty".into()));
        }
        if name == "@" {
            return Err(TypeError::InvalidRefName(
                "ref name cannot be '@' (reserved)".into(),
            ));
        }
        if name.ends_with('.') {
            return Err(TypeError::InvalidRefName(
                "ref name cannot end with '.'".into(),
            ));
        }
        if name.starts_with('/') || name.ends_with('/') {
            return Err(TypeError::InvalidRefName(
                "ref name cannot start or end with '/'".into(),
            ));
        }
        for component in name.split('/') {
            if component.is_empty() {
                return Err(TypeError::InvalidRefName(
                    "ref name cannot contain '//'".into(),
                ));
            }
            validate_component(component).map_err(TypeError::InvalidRefName)?;
        }
        Ok(())
    }

    /// Iterate over the `/`-separated path segments of the name.
    pub fn segments(&self) -> std::str::Split<'_, char> {
        self.0.split('/')
    }

    /// Get the ref name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RefName {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<RefName> for String {
    fn from(name: RefName) -> Self {
        name.0
    }
}

impl AsRef<str> for RefName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RefName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a reference points at.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    /// Points directly at an object.
    Direct(Oid),
    /// Points at another reference (e.g. a namespaced `HEAD`).
    Symbolic(RefName),
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Target::Direct(oid) => write!(f, "{}", oid),
            Target::Symbolic(name) => write!(f, "ref: {}", name),
        }
    }
}

/// A reference as stored in a repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Reference {
    /// The full ref name
    pub name: RefName,
    /// What the ref points at
    pub target: Target,
}

impl Reference {
    /// Create a reference pointing directly at an object.
    pub fn direct(name: RefName, oid: Oid) -> Self {
        Self {
            name,
            target: Target::Direct(oid),
        }
    }
}

/// Validate one `/`-free ref component (see `git check-ref-format`).
fn validate_component(component: &str) -> Result<(), String> {
    if component.is_empty() {
        return Err("component cannot be empty".into());
    }
    if component.starts_with('.') {
        return Err("component cannot start with '.'".into());
    }
    if component.ends_with(".lock") {
        return Err("component cannot end with '.lock'".into());
    }
    if component.contains("..") {
        return Err("component cannot contain '..'".into());
    }
    if component.contains("@{") {
        return Err("component cannot contain '@{'".into());
    }
    const INVALID_CHARS: [char; 8] = [' ', '~', '^', ':', '\\', '?', '*', '['];
    if let Some(c) = component.chars().find(|c| INVALID_CHARS.contains(c)) {
        return Err(format!("component cannot contain '{c}'"));
    }
    if component.chars().any(|c| c.is_ascii_control()) {
        return Err("component cannot contain control characters".into());
    }
    Ok(())
}
