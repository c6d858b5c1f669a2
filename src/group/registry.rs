//! Group Registry Module
//!
//! Name -> group lookup owned by the application and handed to whatever
//! needs to resolve groups by name (the HTTP handlers, mostly).

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{info, warn};

use crate::group::{Group, Loader};

// == Group Registry ==
/// Concurrent readers, serialized writers. Entries are never removed.
#[derive(Debug, Default)]
pub struct GroupRegistry {
    groups: RwLock<HashMap<String, Group>>,
}

impl GroupRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // == New Group ==
    /// Creates a group and registers it under `name`.
    ///
    /// A group already registered under the same name is replaced.
    pub fn new_group<L>(&self, name: impl Into<String>, cache_bytes: usize, loader: L) -> Group
    where
        L: Loader + 'static,
    {
        let group = Group::new(name, cache_bytes, Arc::new(loader));
        self.register(group.clone());
        group
    }

    /// Registers an existing group under its own name.
    pub fn register(&self, group: Group) {
        let name = group.name().to_string();
        let mut groups = self.groups.write();
        if groups.insert(name.clone(), group).is_some() {
            warn!(group = %name, "replaced existing group");
        } else {
            info!(group = %name, "group registered");
        }
    }

    // == Get Group ==
    /// Looks up a group by name.
    pub fn get_group(&self, name: &str) -> Option<Group> {
        self.groups.read().get(name).cloned()
    }

    /// All registered groups, sorted by name.
    pub fn groups(&self) -> Vec<Group> {
        let mut groups: Vec<Group> = self.groups.read().values().cloned().collect();
        groups.sort_by(|a, b| a.name().cmp(b.name()));
        groups
    }

    pub fn len(&self) -> usize {
        self.groups.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.read().is_empty()
    }
}
