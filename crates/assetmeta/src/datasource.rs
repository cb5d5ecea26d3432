//! Datasources: the controlled vocabulary behind enum and set fields
//!
//! Entries move one way, `active -> inactive`. Nothing reactivates an entry
//! and nothing removes one: assets tagged with an entry keep pointing at a
//! record that still exists.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Lifecycle state of a datasource entry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryState {
    #[default]
    Active,
    Inactive,
}

impl EntryState {
    pub fn is_active(&self) -> bool {
        matches!(self, EntryState::Active)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EntryState::Active => "active",
            EntryState::Inactive => "inactive",
        }
    }
}

impl fmt::Display for EntryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Datasource entry as stored by the server
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DataSourceEntry {
    pub external_id: String,
    pub value: String,
    #[serde(default)]
    pub state: EntryState,
}

/// Datasource entry as submitted by the client.
///
/// Carries no state, so submitting an entry never changes whether it is active.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct EntryParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    pub value: String,
}

impl EntryParams {
    /// Entry whose id is assigned by the server
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            external_id: None,
            value: value.into(),
        }
    }

    /// Entry with a client supplied id
    pub fn with_id(value: impl Into<String>, external_id: impl Into<String>) -> Self {
        Self {
            external_id: Some(external_id.into()),
            value: value.into(),
        }
    }
}

/// Datasource payload for field creation and entry upserts
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct DataSourceParams {
    pub values: Vec<EntryParams>,
}

impl DataSourceParams {
    pub fn new(values: impl IntoIterator<Item = EntryParams>) -> Self {
        Self {
            values: values.into_iter().collect(),
        }
    }

    /// Rejects empty ids and ids repeated within the same payload
    pub fn check(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for id in self.values.iter().filter_map(|e| e.external_id.as_deref()) {
            if id.is_empty() {
                return Err(Error::InvalidArgument {
                    name: "datasource",
                    reason: "entry external_id must not be empty".to_string(),
                });
            }
            if !seen.insert(id) {
                return Err(Error::InvalidArgument {
                    name: "datasource",
                    reason: format!("duplicate entry external_id `{}`", id),
                });
            }
        }
        Ok(())
    }
}

impl FromIterator<EntryParams> for DataSourceParams {
    fn from_iter<I: IntoIterator<Item = EntryParams>>(iter: I) -> Self {
        Self::new(iter)
    }
}

/// Ordered datasource entries of one field
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct DataSource {
    #[serde(default)]
    pub values: Vec<DataSourceEntry>,
}

impl DataSource {
    /// Builds a new datasource, every entry starting out active
    pub fn from_params<F>(params: DataSourceParams, next_id: F) -> Self
    where
        F: FnMut() -> String,
    {
        let mut datasource = DataSource::default();
        datasource.upsert(params.values, next_id);
        datasource
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, external_id: &str) -> Option<&DataSourceEntry> {
        self.values.iter().find(|e| e.external_id == external_id)
    }

    pub fn active(&self) -> impl Iterator<Item = &DataSourceEntry> {
        self.values.iter().filter(|e| e.state.is_active())
    }

    /// Upsert by external id.
    ///
    /// A matching entry gets the new value and keeps its state. Anything else
    /// is appended as active, under its own id or one drawn from `next_id`.
    pub fn upsert<F>(&mut self, entries: Vec<EntryParams>, mut next_id: F) -> &[DataSourceEntry]
    where
        F: FnMut() -> String,
    {
        for entry in entries {
            let position = entry
                .external_id
                .as_deref()
                .and_then(|id| self.values.iter().position(|e| e.external_id == id));

            match position {
                Some(i) => self.values[i].value = entry.value,
                None => self.values.push(DataSourceEntry {
                    external_id: entry.external_id.unwrap_or_else(|| next_id()),
                    value: entry.value,
                    state: EntryState::Active,
                }),
            }
        }
        &self.values
    }

    /// Soft-deletes the named entries and returns them in their new state.
    ///
    /// Already inactive entries are returned unchanged; unknown ids are skipped.
    pub fn deactivate(&mut self, external_ids: &[String]) -> Vec<DataSourceEntry> {
        self.values
            .iter_mut()
            .filter(|e| external_ids.contains(&e.external_id))
            .map(|e| {
                e.state = EntryState::Inactive;
                e.clone()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sequence() -> impl FnMut() -> String {
        let mut n = 0;
        move || {
            n += 1;
            format!("generated_{}", n)
        }
    }

    fn colors() -> DataSource {
        DataSource::from_params(
            DataSourceParams::new([
                EntryParams::with_id("blue", "external_id_1"),
                EntryParams::with_id("yellow", "external_id_2"),
            ]),
            sequence(),
        )
    }

    #[test]
    fn test_entry_params_wire_shape() {
        assert_eq!(
            serde_json::to_value(EntryParams::new("green")).unwrap(),
            json!({"value": "green"})
        );
        assert_eq!(
            serde_json::to_value(EntryParams::with_id("gold", "external_id_1")).unwrap(),
            json!({"external_id": "external_id_1", "value": "gold"})
        );
    }

    #[test]
    fn test_state_defaults_to_active() {
        let entry: DataSourceEntry =
            serde_json::from_value(json!({"external_id": "a", "value": "blue"})).unwrap();
        assert_eq!(entry.state, EntryState::Active);

        let entry: DataSourceEntry =
            serde_json::from_value(json!({"external_id": "a", "value": "blue", "state": "inactive"}))
                .unwrap();
        assert!(!entry.state.is_active());
    }

    #[test]
    fn test_upsert_updates_and_appends() {
        let mut ds = colors();
        let entries = ds
            .upsert(
                vec![EntryParams::new("green"), EntryParams::with_id("gold", "external_id_1")],
                sequence(),
            )
            .to_vec();

        assert_eq!(entries.len(), 3);
        assert_eq!(ds.get("external_id_1").unwrap().value, "gold");
        let appended = ds.get("generated_1").unwrap();
        assert_eq!(appended.value, "green");
        assert_eq!(appended.state, EntryState::Active);
    }

    #[test]
    fn test_upsert_keeps_client_supplied_new_id() {
        let mut ds = colors();
        ds.upsert(vec![EntryParams::with_id("red", "external_id_3")], sequence());
        assert_eq!(ds.len(), 3);
        assert_eq!(ds.values[2].external_id, "external_id_3");
    }

    #[test]
    fn test_upsert_does_not_reactivate() {
        let mut ds = colors();
        ds.deactivate(&["external_id_2".to_string()]);
        ds.upsert(vec![EntryParams::with_id("amber", "external_id_2")], sequence());

        let entry = ds.get("external_id_2").unwrap();
        assert_eq!(entry.value, "amber");
        assert_eq!(entry.state, EntryState::Inactive);
    }

    #[test]
    fn test_deactivate_returns_targeted_subset() {
        let mut ds = colors();
        let targeted = ds.deactivate(&["external_id_2".to_string(), "missing".to_string()]);

        assert_eq!(targeted.len(), 1);
        assert_eq!(targeted[0].state, EntryState::Inactive);
        assert_eq!(ds.active().count(), 1);

        // idempotent
        let again = ds.deactivate(&["external_id_2".to_string()]);
        assert_eq!(again, targeted);
    }

    #[test]
    fn test_params_check() {
        assert!(DataSourceParams::new([EntryParams::new("a"), EntryParams::new("b")])
            .check()
            .is_ok());
        assert!(DataSourceParams::new([
            EntryParams::with_id("a", "x"),
            EntryParams::with_id("b", "x"),
        ])
        .check()
        .unwrap_err()
        .is_invalid_argument());
        assert!(DataSourceParams::new([EntryParams::with_id("a", "")]).check().is_err());
    }
}
