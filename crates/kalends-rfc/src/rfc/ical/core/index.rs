//! Dual-keyed EXDATE and RECURRENCE-ID indices.
//!
//! Every entry is stored under its date key (`YYYY-MM-DD`) and, for
//! DATE-TIME values, also under its full-instant key. Both keys share one
//! `Arc`, so a lookup by either key yields the same record.

use std::collections::HashMap;
use std::sync::Arc;

use super::component::Component;
use super::time::TimeValue;

/// Excluded occurrences (EXDATE).
#[derive(Debug, Clone, Default)]
pub struct ExceptionIndex {
    entries: HashMap<String, Arc<TimeValue>>,
}

impl ExceptionIndex {
    /// Inserts an exclusion under both of its keys.
    pub fn insert(&mut self, value: TimeValue) {
        let value = Arc::new(value);
        if let Some(key) = value.instant_key() {
            self.entries.insert(key, Arc::clone(&value));
        }
        self.entries.insert(value.date_key(), value);
    }

    /// Returns the exclusion stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Arc<TimeValue>> {
        self.entries.get(key)
    }

    /// Returns true if `key` is excluded.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Copies every entry of `other` into this index.
    pub fn extend(&mut self, other: &Self) {
        for (key, value) in &other.entries {
            self.entries.insert(key.clone(), Arc::clone(value));
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over distinct exclusions.
    pub fn values(&self) -> impl Iterator<Item = &TimeValue> {
        self.entries
            .iter()
            .filter(|(key, value)| **key == value.instant_key().unwrap_or_else(|| value.date_key()))
            .map(|(_, value)| value.as_ref())
    }
}

/// Outcome of offering an override record to an [`OverrideIndex`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverrideInsert {
    /// Stored under its own key (the instant key for date-times, the date
    /// key for dates).
    Accepted,
    /// An existing record with a higher SEQUENCE kept the record's own key.
    Stale,
}

/// Per-instance replacements (RECURRENCE-ID).
#[derive(Debug, Clone, Default)]
pub struct OverrideIndex {
    entries: HashMap<String, Arc<Component>>,
}

impl OverrideIndex {
    /// Inserts an override under each of its keys.
    ///
    /// Per key, a higher SEQUENCE wins; on a tie the incoming record wins.
    /// Records without a RECURRENCE-ID are ignored.
    pub fn insert(&mut self, component: Component) -> OverrideInsert {
        let Some(recurrence_id) = component.recurrence_id.clone() else {
            return OverrideInsert::Stale;
        };
        let component = Arc::new(component);
        let primary = recurrence_id
            .instant_key()
            .unwrap_or_else(|| recurrence_id.date_key());
        let keys = std::iter::once(recurrence_id.date_key()).chain(recurrence_id.instant_key());

        let mut outcome = OverrideInsert::Accepted;
        for key in keys {
            match self.entries.get(&key) {
                Some(existing) if existing.sequence > component.sequence => {
                    // Another instance on the same day may hold the date key.
                    if key == primary {
                        outcome = OverrideInsert::Stale;
                    }
                }
                _ => {
                    self.entries.insert(key, Arc::clone(&component));
                }
            }
        }
        outcome
    }

    /// Returns the override stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Arc<Component>> {
        self.entries.get(key)
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Merges `other` into this index with the SEQUENCE tie-break.
    pub fn merge(&mut self, other: &Self) {
        for (key, incoming) in &other.entries {
            match self.entries.get(key) {
                Some(existing) if existing.sequence > incoming.sequence => {}
                _ => {
                    self.entries.insert(key.clone(), Arc::clone(incoming));
                }
            }
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over distinct override records.
    pub fn values(&self) -> impl Iterator<Item = &Component> {
        self.entries
            .iter()
            .filter(|(key, component)| {
                component
                    .recurrence_id
                    .as_ref()
                    .is_some_and(|rid| **key == rid.instant_key().unwrap_or_else(|| rid.date_key()))
            })
            .map(|(_, component)| component.as_ref())
    }
}
