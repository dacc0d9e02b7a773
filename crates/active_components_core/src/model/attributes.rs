//! Attribute storage with a persisted snapshot.
//!
//! # Responsibility
//! - Hold current attribute values for one model instance.
//! - Keep the last known persisted snapshot for insert/update decisions and
//!   update diffing.
//!
//! # Invariants
//! - The snapshot only changes on storage hydration or after a successful
//!   persist (`replace_from_storage`, `refresh_snapshot`).
//! - `non_null()` never yields `Null` entries.

use crate::model::value::{AttributeMap, AttributeValue};

static NULL_VALUE: AttributeValue = AttributeValue::Null;

/// Current attribute values plus the persisted snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeStore {
    values: AttributeMap,
    snapshot: AttributeMap,
}

impl AttributeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns one attribute value, `Null` when it was never set.
    pub fn get(&self, name: &str) -> &AttributeValue {
        self.values.get(name).unwrap_or(&NULL_VALUE)
    }

    /// Sets one value; text is trimmed.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<AttributeValue>) {
        self.values.insert(name.into(), value.into().trimmed());
    }

    /// Returns every stored entry, including `Null` ones.
    pub fn all(&self) -> &AttributeMap {
        &self.values
    }

    /// Returns the persistence payload: every entry whose value is not `Null`.
    pub fn non_null(&self) -> AttributeMap {
        self.values
            .iter()
            .filter(|(_, value)| !value.is_null())
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }

    /// Returns non-null entries that differ from the snapshot.
    pub fn changed(&self) -> AttributeMap {
        changed_against(&self.non_null(), &self.snapshot)
    }

    pub fn snapshot(&self) -> &AttributeMap {
        &self.snapshot
    }

    /// Returns whether the snapshot holds no truthy value.
    pub fn snapshot_is_empty(&self) -> bool {
        !self.snapshot.values().any(AttributeValue::is_truthy)
    }

    /// Replaces values and snapshot with a row loaded from storage.
    pub fn replace_from_storage(&mut self, row: AttributeMap) {
        self.snapshot = row.clone();
        self.values = row;
    }

    /// Copies the persistence payload into the snapshot.
    pub fn refresh_snapshot(&mut self) {
        self.snapshot = self.non_null();
    }

    /// Replaces current values and drops the snapshot.
    pub fn reset(&mut self, values: AttributeMap) {
        self.values = values;
        self.snapshot.clear();
    }
}

/// Returns entries of `current` whose value is absent from or different in
/// `snapshot`.
pub fn changed_against(current: &AttributeMap, snapshot: &AttributeMap) -> AttributeMap {
    current
        .iter()
        .filter(|(name, value)| snapshot.get(name.as_str()) != Some(*value))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}
