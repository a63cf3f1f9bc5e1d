use parking_lot::RwLock;
use std::collections::HashMap;

use crate::model::{UnitPreference, UserId};

/// Per-user unit preferences.
///
/// Lives for the lifetime of the process and is never written to disk; a restart resets
/// everyone to [`UnitPreference::Metric`]. Concurrent writes for the same user resolve
/// last-write-wins.
#[derive(Debug, Default)]
pub struct PreferenceStore {
    units: RwLock<HashMap<UserId, UnitPreference>>,
}

impl PreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, user: UserId) -> UnitPreference {
        self.units.read().get(&user).copied().unwrap_or_default()
    }

    pub fn set(&self, user: UserId, units: UnitPreference) {
        self.units.write().insert(user, units);
    }

    /// Flip the user's preference and return the new value.
    pub fn toggle(&self, user: UserId) -> UnitPreference {
        let mut units = self.units.write();
        let next = units.get(&user).copied().unwrap_or_default().toggled();
        units.insert(user, next);
        next
    }

    pub fn len(&self) -> usize {
        self.units.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
