//! core::namespace
//!
//! Peer namespace matching over structured reference names.
//!
//! A peer's references live under `refs/namespaces/<peer>/`. Matching is
//! done segment by segment rather than by string prefix or glob, so a peer
//! named `abc` never claims the references of a peer named `abcd`.
//!
//! # Example
//!
//! ```
//! use nsprune::core::namespace::NamespacePattern;
//! use nsprune::core::types::{PeerId, RefName};
//!
//! let pattern = NamespacePattern::for_peer(&PeerId::new("abc").unwrap());
//!
//! assert!(pattern.matches(&RefName::new("refs/namespaces/abc/refs/heads/main").unwrap()));
//! assert!(pattern.matches(&RefName::new("namespaces/abc/heads/main").unwrap()));
//! assert!(!pattern.matches(&RefName::new("refs/namespaces/abcd/refs/heads/main").unwrap()));
//! assert!(!pattern.matches(&RefName::new("refs/heads/abc").unwrap()));
//! ```

use crate::core::types::{PeerId, RefName, Reference};

/// The path segment that introduces a namespace.
pub const NAMESPACES: &str = "namespaces";

/// Segment-prefix pattern selecting one peer's references.
///
/// A name matches when, after an optional leading `refs` segment, it starts
/// with `namespaces/<peer>` and has at least one more segment after that.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespacePattern {
    peer: PeerId,
}

impl NamespacePattern {
    /// Derive the pattern for a peer.
    pub fn for_peer(peer: &PeerId) -> Self {
        Self { peer: peer.clone() }
    }

    /// The canonical prefix this pattern covers, for display.
    pub fn prefix(&self) -> String {
        format!("refs/{}/{}/", NAMESPACES, self.peer)
    }

    /// Check whether a reference name falls inside the peer's namespace.
    pub fn matches(&self, name: &RefName) -> bool {
        let mut segments = name.segments().peekable();
        if segments.peek() == Some(&"refs") {
            segments.next();
        }
        segments.next() == Some(NAMESPACES)
            && segments.next() == Some(self.peer.as_str())
            && segments.next().is_some()
    }
}

/// Select the references that belong to the pattern's namespace.
///
/// Total over any input, including an empty one. Order is preserved.
pub fn filter_namespace<I>(references: I, pattern: &NamespacePattern) -> Vec<Reference>
where
    I: IntoIterator<Item = Reference>,
{
    references
        .into_iter()
        .filter(|reference| pattern.matches(&reference.name))
        .collect()
}
