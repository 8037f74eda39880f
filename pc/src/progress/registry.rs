//! Stage identity to FilterId mapping

use std::collections::HashMap;

use tracing::debug;

use crate::domain::{FilterId, ObjectKey};

/// Maps in-process stage objects to the `FilterId` they report under
///
/// Registration is insert-or-overwrite. There is no removal; the map is
/// bounded by the number of stages in one update.
#[derive(Debug, Default)]
pub struct ObjectRegistry {
    entries: HashMap<ObjectKey, FilterId>,
}

impl ObjectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Associate `key` with `id`, replacing any earlier association
    pub fn register(&mut self, key: ObjectKey, id: FilterId) {
        debug!(key = key.raw(), %id, "ObjectRegistry::register: called");
        if let Some(previous) = self.entries.insert(key, id)
            && previous != id
        {
            debug!(key = key.raw(), %previous, %id, "ObjectRegistry::register: overwrote entry");
        }
    }

    /// `None` for objects never registered in this process
    pub fn lookup(&self, key: ObjectKey) -> Option<FilterId> {
        self.entries.get(&key).copied()
    }

    /// Whether any local stage currently reports under `id`
    pub fn knows(&self, id: FilterId) -> bool {
        self.entries.values().any(|&registered| registered == id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
