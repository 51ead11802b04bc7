//! Calculated fields: values derived from a plug's readings by conditions.
//!
//! A [`CalculatedField`] tests one source field against ordered groups of
//! comparisons and emits the candidate whose group matches. A
//! [`CalculatedFieldCollection`] holds the fields configured for one plug and
//! evaluates them in registration order.

mod field;

use indexmap::IndexMap;

use crate::config::CalculatedFieldConfig;
use crate::error::CalculatedFieldCollectionError;
use crate::line::{escape_key, format_field_value};
use crate::model::{FieldValue, Reading};

pub use field::{CalculatedField, Condition, FieldType, NoMatchPolicy, Operator};

/// Named calculated fields in registration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CalculatedFieldCollection {
    fields: IndexMap<String, CalculatedField>,
}

impl CalculatedFieldCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a field. A field already registered under the same name is
    /// replaced in place and returned.
    pub fn add(&mut self, field: CalculatedField) -> Option<CalculatedField> {
        self.fields.insert(field.name().to_owned(), field)
    }

    /// Build a field from configuration and register it.
    pub fn add_from_config(
        &mut self,
        name: &str,
        config: &CalculatedFieldConfig,
    ) -> Result<(), CalculatedFieldCollectionError> {
        let field = CalculatedField::from_config(name, config).map_err(|source| {
            CalculatedFieldCollectionError::Add {
                field: name.to_owned(),
                source,
            }
        })?;
        self.add(field);
        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> Option<CalculatedField> {
        self.fields.shift_remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&CalculatedField> {
        self.fields.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Evaluate every field against `data`, stopping at the first failure.
    pub fn evaluate_all(&self, data: &Reading) -> Result<Vec<(String, FieldValue)>, CalculatedFieldCollectionError> {
        self.fields
            .values()
            .map(|field| {
                field
                    .evaluate(data)
                    .map_err(|source| CalculatedFieldCollectionError::Evaluate {
                        field: field.name().to_owned(),
                        source,
                    })
            })
            .collect()
    }

    /// Evaluate and render as a line-protocol field fragment
    /// `name=value[,name=value]*`.
    pub fn render(&self, data: &Reading) -> Result<String, CalculatedFieldCollectionError> {
        let fragments: Vec<String> = self
            .evaluate_all(data)?
            .iter()
            .map(|(name, value)| format!("{}={}", escape_key(name), format_field_value(value)))
            .collect();
        Ok(fragments.join(","))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::CalculatedFieldError;
    use pretty_assertions::assert_eq;

    // ── Helpers ──────────────────────────────────────────────────────

    fn threshold_field(name: &str, source: &str, threshold: i64) -> CalculatedField {
        CalculatedField::new(
            name,
            source,
            FieldType::Integer,
            FieldValue::Integer(0),
            IndexMap::from([("1".to_owned(), vec![Condition::new(Operator::Gt, threshold)])]),
        )
        .unwrap()
    }

    fn reading(pairs: &[(&str, i64)]) -> Reading {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), FieldValue::Integer(*v)))
            .collect()
    }

    // ── Tests ────────────────────────────────────────────────────────

    #[test]
    fn evaluates_in_registration_order() {
        let mut fields = CalculatedFieldCollection::new();
        fields.add(threshold_field("is_on", "power", 1000));
        fields.add(threshold_field("high_voltage", "voltage", 240_000));

        let data = reading(&[("power", 5000), ("voltage", 230_000)]);
        assert_eq!(
            fields.evaluate_all(&data).unwrap(),
            vec![
                ("is_on".to_owned(), FieldValue::Integer(1)),
                ("high_voltage".to_owned(), FieldValue::Integer(0)),
            ]
        );
        assert_eq!(fields.render(&data).unwrap(), "is_on=1i,high_voltage=0i");
    }

    #[test]
    fn last_registration_wins_and_keeps_position() {
        let mut fields = CalculatedFieldCollection::new();
        fields.add(threshold_field("a", "power", 1));
        fields.add(threshold_field("b", "power", 1));
        let replaced = fields.add(threshold_field("a", "power", 100));

        assert_eq!(replaced.unwrap().condition_count(), 1);
        assert_eq!(fields.len(), 2);
        assert_eq!(fields.names().collect::<Vec<_>>(), ["a", "b"]);
        assert_eq!(fields.evaluate_all(&reading(&[("power", 50)])).unwrap()[0].1, FieldValue::Integer(0));
    }

    #[test]
    fn remove_preserves_remaining_order() {
        let mut fields = CalculatedFieldCollection::new();
        for name in ["a", "b", "c"] {
            fields.add(threshold_field(name, "power", 1));
        }
        assert!(fields.remove("b").is_some());
        assert!(fields.remove("b").is_none());
        assert_eq!(fields.names().collect::<Vec<_>>(), ["a", "c"]);
        assert!(fields.get("c").is_some());
    }

    #[test]
    fn first_failure_aborts_and_names_field() {
        let mut fields = CalculatedFieldCollection::new();
        fields.add(threshold_field("ok", "power", 1));
        fields.add(threshold_field("broken", "missing", 1));

        let err = fields.render(&reading(&[("power", 5)])).unwrap_err();
        assert_eq!(err.field(), "broken");
        assert!(matches!(
            err,
            CalculatedFieldCollectionError::Evaluate {
                source: CalculatedFieldError::MissingField { .. },
                ..
            }
        ));
    }

    #[test]
    fn empty_collection_renders_nothing() {
        let fields = CalculatedFieldCollection::new();
        assert!(fields.is_empty());
        assert_eq!(fields.render(&Reading::new()).unwrap(), "");
    }

    #[test]
    fn add_from_config_wraps_construction_errors() {
        let config: CalculatedFieldConfig =
            serde_json::from_str(r#"{ "default": 0, "field": "power", "conditions": {} }"#).unwrap();

        let mut fields = CalculatedFieldCollection::new();
        let err = fields.add_from_config("empty", &config).unwrap_err();
        assert_eq!(err.field(), "empty");
        assert!(matches!(
            err,
            CalculatedFieldCollectionError::Add {
                source: CalculatedFieldError::NoConditions { .. },
                ..
            }
        ));
        assert!(fields.is_empty());
    }
}
