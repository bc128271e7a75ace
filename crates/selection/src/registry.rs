//! Registry of mounted page text containers

use crate::host::{ContainerId, MarkerId};

/// A mounted container and its end-of-content marker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryEntry {
    pub container: ContainerId,
    pub end_marker: MarkerId,
}

/// Containers in mount order
#[derive(Debug, Clone, Default)]
pub struct ContainerRegistry {
    entries: Vec<RegistryEntry>,
}

impl ContainerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a container. Re-registering replaces its marker.
    pub fn insert(&mut self, container: ContainerId, end_marker: MarkerId) {
        match self.entries.iter_mut().find(|entry| entry.container == container) {
            Some(entry) => entry.end_marker = end_marker,
            None => self.entries.push(RegistryEntry { container, end_marker }),
        }
    }

    pub fn remove(&mut self, container: ContainerId) -> Option<RegistryEntry> {
        let index = self.entries.iter().position(|entry| entry.container == container)?;
        Some(self.entries.remove(index))
    }

    pub fn get(&self, container: ContainerId) -> Option<&RegistryEntry> {
        self.entries.iter().find(|entry| entry.container == container)
    }

    pub fn marker_for(&self, container: ContainerId) -> Option<MarkerId> {
        self.get(container).map(|entry| entry.end_marker)
    }

    pub fn contains(&self, container: ContainerId) -> bool {
        self.get(container).is_some()
    }

    /// Copy of the entries, safe to iterate while the host mutates.
    pub fn snapshot(&self) -> Vec<RegistryEntry> {
        self.entries.clone()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
