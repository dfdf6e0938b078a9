//! Injection scopes.
//!
//! A [`SystemScope`] marks a position in the consumer tree. Scopes form a parent
//! chain, and any scope can carry an explicit system that overrides the managed
//! one for its whole subtree. This is how tests and previews hand a fixed system
//! to consumers without running any lifecycle.
//!
//! ```text
//! SystemScope::root()
//!    │
//!    └── provide(mock)            (override: mock)
//!           │
//!           ├── child()           sees mock
//!           │
//!           └── provide(other)    (override: other)
//!                  │
//!                  └── child()    sees other (closest wins)
//! ```
//!
//! Scopes have no lifecycle responsibilities. Providing a system never starts or
//! halts it.

use core::fmt;
use std::sync::Arc;

use keystone_lifecycle::system::StartedSystem;

use crate::fault::Fault;

/// A node in the consumer tree that may inject a system into its subtree.
///
/// # Ownership Model
///
/// ```text
/// SystemScope<'parent>
/// ├── parent: Option<&'parent SystemScope>  (read-only parent access)
/// └── system: Option<Arc<StartedSystem>>     (this node's override)
/// ```
#[derive(Default)]
pub struct SystemScope<'parent> {
    parent: Option<&'parent SystemScope<'parent>>,
    system: Option<Arc<StartedSystem>>,
}

impl<'parent> SystemScope<'parent> {
    /// Creates a root scope with no override.
    #[must_use]
    pub fn root() -> Self {
        Self::default()
    }

    /// Creates a root scope that injects `system`.
    #[must_use]
    pub fn with_system(system: Arc<StartedSystem>) -> Self {
        Self {
            parent: None,
            system: Some(system),
        }
    }

    /// Creates a child scope that injects `system` into its subtree.
    ///
    /// The override shadows any override provided further up the chain.
    #[must_use]
    pub fn provide(&'parent self, system: Arc<StartedSystem>) -> SystemScope<'parent> {
        SystemScope {
            parent: Some(self),
            system: Some(system),
        }
    }

    /// Creates a plain child scope that inherits this scope's override.
    #[must_use]
    pub fn child(&'parent self) -> SystemScope<'parent> {
        SystemScope {
            parent: Some(self),
            system: None,
        }
    }

    /// Returns the closest injected system, walking up the parent chain.
    #[must_use]
    pub fn injected(&self) -> Option<&Arc<StartedSystem>> {
        if let Some(system) = &self.system {
            return Some(system);
        }
        self.parent.and_then(SystemScope::injected)
    }

    /// Returns true if a system is injected here or in any ancestor.
    #[must_use]
    pub fn has_override(&self) -> bool {
        self.injected().is_some()
    }

    /// Returns the number of ancestors above this scope.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.parent.map_or(0, |parent| parent.depth() + 1)
    }

    /// Returns the injected system without consulting any manager.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::MissingProvider`] when no ancestor provides a system.
    pub fn require_system(&self) -> Result<Arc<StartedSystem>, Fault> {
        self.injected().cloned().ok_or(Fault::MissingProvider)
    }
}

impl fmt::Debug for SystemScope<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SystemScope")
            .field("depth", &self.depth())
            .field("provides", &self.system.is_some())
            .field("has_override", &self.has_override())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn system(value: i32) -> Arc<StartedSystem> {
        Arc::new(StartedSystem::new().with("a", value))
    }

    #[test]
    fn root_has_no_override() {
        let root = SystemScope::root();
        assert!(!root.has_override());
        assert_eq!(root.depth(), 0);
        assert!(matches!(root.require_system(), Err(Fault::MissingProvider)));
    }

    #[test]
    fn children_inherit_override() {
        let injected = system(1);
        let root = SystemScope::root();
        let provided = root.provide(Arc::clone(&injected));
        let child = provided.child();
        let grandchild = child.child();

        assert_eq!(grandchild.depth(), 3);
        assert!(Arc::ptr_eq(grandchild.injected().unwrap(), &injected));
        assert!(Arc::ptr_eq(&grandchild.require_system().unwrap(), &injected));
    }

    #[test]
    fn closest_override_wins() {
        let outer = system(1);
        let inner = system(2);
        let root = SystemScope::with_system(Arc::clone(&outer));
        let nested = root.provide(Arc::clone(&inner));
        let leaf = nested.child();

        assert!(Arc::ptr_eq(root.injected().unwrap(), &outer));
        assert!(Arc::ptr_eq(leaf.injected().unwrap(), &inner));
    }

    #[test]
    fn siblings_are_isolated() {
        let root = SystemScope::root();
        let provided = root.provide(system(1));
        let sibling = root.child();

        assert!(provided.has_override());
        assert!(!sibling.has_override());
    }
}
