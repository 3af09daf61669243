//! Capability Registry: startup snapshot of a capability surface.
//!
//! The registry is built once from a [`CapabilitySurface`] and never mutated
//! afterwards. Lookup is by request path (`/<name>`), case-insensitive.

use std::collections::HashMap;

use super::capability::{CapabilityEntry, Member};

/// Anything that can declare a flat list of members.
///
/// Implementations are stateless from the registry's point of view: the
/// member list is read exactly once, in [`CapabilityRegistry::load`].
pub trait CapabilitySurface {
    fn members(&self) -> Vec<Member>;
}

impl CapabilitySurface for Vec<Member> {
    fn members(&self) -> Vec<Member> {
        self.clone()
    }
}

/// All routable entries of a capability surface, in declaration order.
#[derive(Debug, Default)]
pub struct CapabilityRegistry {
    entries: Vec<CapabilityEntry>,

    /// Lowercase route -> position in `entries`
    by_route: HashMap<String, usize>,
}

impl CapabilityRegistry {
    /// Create an empty registry (no capability routes).
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot every exposed member of `surface`.
    ///
    /// Internal and synthesized members are skipped. On a name collision
    /// (case-insensitive) the first declaration wins.
    pub fn load(surface: &dyn CapabilitySurface) -> Self {
        let mut registry = Self::new();
        for member in surface.members() {
            if !member.is_exposed() {
                tracing::trace!(member = %member.name, "Skipping non-public member");
                continue;
            }
            let entry = CapabilityEntry::from(member);
            let key = entry.route_key();
            if registry.by_route.contains_key(&key) {
                tracing::warn!(
                    category = "warning",
                    member = %entry.name,
                    "Duplicate capability name, keeping the first declaration"
                );
                continue;
            }
            registry.by_route.insert(key, registry.entries.len());
            registry.entries.push(entry);
        }
        tracing::debug!(count = registry.entries.len(), "Capability registry loaded");
        registry
    }

    /// Entry addressed by `path` (`/<name>`, any case).
    pub fn lookup(&self, path: &str) -> Option<&CapabilityEntry> {
        self.by_route
            .get(&path.to_lowercase())
            .map(|&position| &self.entries[position])
    }

    /// Routes of every entry, case preserved, in declaration order.
    pub fn routes(&self) -> impl Iterator<Item = String> + '_ {
        self.entries.iter().map(CapabilityEntry::route)
    }

    pub fn entries(&self) -> &[CapabilityEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
