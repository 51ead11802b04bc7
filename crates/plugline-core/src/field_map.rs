//! Renaming tables from raw plug keys to metric tag and field names.
//!
//! The defaults are `const` tables and never change at runtime. Per-plug
//! overrides from the configuration are merged into an owned copy via
//! [`FieldMap::with_overrides`].

use indexmap::IndexMap;

use crate::error::EmptyDataError;
use crate::model::{Reading, ReadingKind};

/// Default tags taken from the system info reading.
pub const DEFAULT_TAGS: &[(&str, &str)] = &[("alias", "dev_alias")];

/// Default fields taken from the energy reading (milli-units).
pub const ENERGY_FIELDS: &[(&str, &str)] = &[
    ("voltage_mv", "voltage"),
    ("current_ma", "current"),
    ("power_mw", "power"),
];

/// Default fields taken from the system info reading.
pub const INFO_FIELDS: &[(&str, &str)] = &[
    ("relay_state", "relay_state"),
    ("on_time", "on_time"),
    ("rssi", "rssi"),
];

/// Ordered raw key -> output name mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMap {
    entries: IndexMap<String, String>,
}

impl FieldMap {
    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        Self {
            entries: pairs
                .iter()
                .map(|(raw, name)| ((*raw).to_owned(), (*name).to_owned()))
                .collect(),
        }
    }

    pub fn default_tags() -> Self {
        Self::from_pairs(DEFAULT_TAGS)
    }

    pub fn energy_fields() -> Self {
        Self::from_pairs(ENERGY_FIELDS)
    }

    pub fn info_fields() -> Self {
        Self::from_pairs(INFO_FIELDS)
    }

    /// Copy of this map with `overrides` merged in.
    ///
    /// Existing raw keys keep their position; new ones are appended. An
    /// override with an empty output name removes the raw key.
    pub fn with_overrides(&self, overrides: &IndexMap<String, String>) -> Self {
        let mut entries = self.entries.clone();
        for (raw, name) in overrides {
            if name.is_empty() {
                entries.shift_remove(raw);
            } else {
                entries.insert(raw.clone(), name.clone());
            }
        }
        Self { entries }
    }

    /// Output name for a raw key, if mapped.
    pub fn get(&self, raw: &str) -> Option<&str> {
        self.entries.get(raw).map(String::as_str)
    }

    /// `(raw, name)` pairs in declared order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(raw, name)| (raw.as_str(), name.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keep only mapped keys, renamed, in map order. Values are untouched.
    ///
    /// An empty `reading` is an error: it means the device returned nothing,
    /// which is different from returning data we don't map.
    pub fn extract(&self, reading: &Reading, kind: ReadingKind) -> Result<Reading, EmptyDataError> {
        if reading.is_empty() {
            return Err(EmptyDataError { kind });
        }
        Ok(self
            .entries
            .iter()
            .filter_map(|(raw, name)| reading.get(raw).map(|value| (name.clone(), value.clone())))
            .collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::FieldValue;
    use pretty_assertions::assert_eq;

    fn energy_reading() -> Reading {
        [
            ("current_ma", FieldValue::Integer(500)),
            ("err_code", FieldValue::Integer(0)),
            ("power_mw", FieldValue::Integer(115_000)),
            ("total_wh", FieldValue::Integer(9_001)),
            ("voltage_mv", FieldValue::Integer(230_000)),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_owned(), v))
        .collect()
    }

    #[test]
    fn extract_renames_and_drops_unmapped() {
        let out = FieldMap::energy_fields()
            .extract(&energy_reading(), ReadingKind::Energy)
            .expect("non-empty");

        let keys: Vec<&str> = out.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["voltage", "current", "power"]);
        assert_eq!(out["power"], FieldValue::Integer(115_000));
        assert!(!out.contains_key("err_code"));
    }

    #[test]
    fn extract_preserves_value_types() {
        let mut reading = Reading::new();
        reading.insert("voltage_mv".into(), FieldValue::Float(229_512.5));
        reading.insert("power_mw".into(), FieldValue::from("n/a"));

        let out = FieldMap::energy_fields()
            .extract(&reading, ReadingKind::Energy)
            .expect("non-empty");
        assert_eq!(out["voltage"], FieldValue::Float(229_512.5));
        assert_eq!(out["power"], FieldValue::from("n/a"));
    }

    #[test]
    fn extract_rejects_empty_reading() {
        let err = FieldMap::info_fields()
            .extract(&Reading::new(), ReadingKind::SystemInfo)
            .unwrap_err();
        assert_eq!(err.kind, ReadingKind::SystemInfo);
    }

    #[test]
    fn unmapped_only_reading_is_not_an_error() {
        let mut reading = Reading::new();
        reading.insert("model".into(), FieldValue::from("HS110(EU)"));

        let out = FieldMap::info_fields()
            .extract(&reading, ReadingKind::SystemInfo)
            .expect("non-empty");
        assert!(out.is_empty());
    }

    #[test]
    fn overrides_merge_into_a_copy() {
        let defaults = FieldMap::energy_fields();
        let overrides: IndexMap<String, String> = [
            ("power_mw".to_owned(), "watts_milli".to_owned()),
            ("total_wh".to_owned(), "total".to_owned()),
            ("current_ma".to_owned(), String::new()),
        ]
        .into_iter()
        .collect();

        let merged = defaults.with_overrides(&overrides);

        let pairs: Vec<(&str, &str)> = merged.iter().collect();
        assert_eq!(
            pairs,
            vec![
                ("voltage_mv", "voltage"),
                ("power_mw", "watts_milli"),
                ("total_wh", "total"),
            ]
        );
        assert_eq!(defaults, FieldMap::energy_fields());
    }
}
