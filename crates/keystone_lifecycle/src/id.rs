//! Resource identifiers.

use core::borrow::Borrow;
use core::fmt;
use std::sync::Arc;

/// Unique identifier for a resource in a resource graph.
///
/// Identifiers are plain strings chosen by whoever defines the graph. Cloning is
/// cheap (the string is reference counted), and maps keyed by `ResourceId` can be
/// queried with a `&str` directly.
///
/// # Example
///
/// ```
/// use keystone_lifecycle::id::ResourceId;
///
/// let id = ResourceId::new("db");
/// assert_eq!(id, "db");
/// assert_eq!(id.to_string(), "db");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(Arc<str>);

impl ResourceId {
    /// Creates a `ResourceId` from any string-like value.
    #[must_use]
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for ResourceId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ResourceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ResourceId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ResourceId {
    fn from(id: String) -> Self {
        Self::new(id)
    }
}

impl From<&ResourceId> for ResourceId {
    fn from(id: &ResourceId) -> Self {
        id.clone()
    }
}

impl PartialEq<str> for ResourceId {
    fn eq(&self, other: &str) -> bool {
        &*self.0 == other
    }
}

impl PartialEq<&str> for ResourceId {
    fn eq(&self, other: &&str) -> bool {
        &*self.0 == *other
    }
}
