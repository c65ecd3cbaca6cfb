//! Set of identities currently bound to a live group.
//!
//! Each engine instance owns its own registry, so independent engines (one
//! per test, for example) never see each other's members. The handle is
//! cheap to clone; clones share the same set. Callers outside the cycle
//! driver get a [`RegistryView`], which can only read.
use std::collections::HashSet;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::types::MatchError;

/// Enforces at most one live group per identity.
///
/// Mutation is confined to the cycle driver; other holders should only read.
#[derive(Debug, Clone, Default)]
pub struct MembershipRegistry {
    inner: Arc<RwLock<HashSet<String>>>,
}

impl MembershipRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `identity` to a live group, failing if it is already bound.
    pub fn register(&self, identity: &str) -> Result<(), MatchError> {
        if self.write().insert(identity.to_string()) {
            Ok(())
        } else {
            Err(MatchError::DuplicateMember(identity.to_string()))
        }
    }

    /// Release one identity. Returns whether it was registered.
    pub fn release(&self, identity: &str) -> bool {
        self.write().remove(identity)
    }

    /// Release every identity of an expiring group under one lock.
    pub fn release_all<'a, I>(&self, identities: I) -> usize
    where
        I: IntoIterator<Item = &'a String>,
    {
        let mut guard = self.write();
        identities
            .into_iter()
            .filter(|id| guard.remove(id.as_str()))
            .count()
    }

    pub fn contains(&self, identity: &str) -> bool {
        self.read().contains(identity)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Read-only handle sharing this registry's set.
    pub fn view(&self) -> RegistryView {
        RegistryView {
            inner: Arc::clone(&self.inner),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, HashSet<String>> {
        read_set(&self.inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashSet<String>> {
        self.inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Shared, read-only view of a [`MembershipRegistry`].
///
/// Observes the live set without being able to bind or release anyone:
///
/// ```compile_fail
/// use matcher::MembershipRegistry;
///
/// let registry = MembershipRegistry::new();
/// registry.register("a").unwrap();
/// registry.view().release("a");
/// ```
#[derive(Debug, Clone)]
pub struct RegistryView {
    inner: Arc<RwLock<HashSet<String>>>,
}

impl RegistryView {
    pub fn contains(&self, identity: &str) -> bool {
        read_set(&self.inner).contains(identity)
    }

    pub fn len(&self) -> usize {
        read_set(&self.inner).len()
    }

    pub fn is_empty(&self) -> bool {
        read_set(&self.inner).is_empty()
    }
}

fn read_set(inner: &RwLock<HashSet<String>>) -> RwLockReadGuard<'_, HashSet<String>> {
    inner
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_registration_fails() {
        let registry = MembershipRegistry::new();
        registry.register("a").unwrap();
        assert_eq!(
            registry.register("a"),
            Err(MatchError::DuplicateMember("a".into()))
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn release_allows_resubmission() {
        let registry = MembershipRegistry::new();
        registry.register("a").unwrap();
        assert!(registry.release("a"));
        assert!(!registry.release("a"));
        assert!(registry.register("a").is_ok());
    }

    #[test]
    fn clones_share_state_but_instances_do_not() {
        let registry = MembershipRegistry::new();
        let view = registry.clone();
        let other = MembershipRegistry::new();

        registry.register("a").unwrap();
        assert!(view.contains("a"));
        assert!(!other.contains("a"));
    }

    #[test]
    fn release_all_counts_released() {
        let registry = MembershipRegistry::new();
        for id in ["a", "b"] {
            registry.register(id).unwrap();
        }
        let members = vec!["a".to_string(), "b".to_string(), "zz".to_string()];
        assert_eq!(registry.release_all(&members), 2);
        assert!(registry.is_empty());
    }

    #[test]
    fn view_follows_registry_changes() {
        let registry = MembershipRegistry::new();
        let view = registry.view();
        assert!(view.is_empty());

        registry.register("a").unwrap();
        assert!(view.contains("a"));
        assert_eq!(view.len(), 1);

        registry.release("a");
        assert!(!view.contains("a"));
        assert!(view.is_empty());
    }
}
