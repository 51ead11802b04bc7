// ── Calculated field ──
//
// A field derived from another field's value: the first (and only) candidate
// whose conditions all hold decides the output. Candidate keys that parse to
// the same value ("1" and "01") form one candidate whose conditions must all
// hold.

use std::cmp::Ordering;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tracing::warn;

use crate::config::CalculatedFieldConfig;
use crate::error::CalculatedFieldError;
use crate::model::{FieldValue, Reading};

/// Comparison operator of a condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
pub enum Operator {
    #[strum(to_string = "=")]
    Eq,
    #[strum(to_string = ">")]
    Gt,
    #[strum(to_string = "<")]
    Lt,
    #[strum(to_string = ">=")]
    Ge,
    #[strum(to_string = "<=")]
    Le,
}

impl Operator {
    /// Evaluate `lhs <op> rhs`.
    ///
    /// Numbers compare numerically, strings lexicographically, booleans as
    /// `false < true`. Values of different kinds are never equal and cannot
    /// be ordered: `=` yields `false`, the ordering operators return `None`.
    pub fn compare(self, lhs: &FieldValue, rhs: &FieldValue) -> Option<bool> {
        let ordering = match (lhs, rhs) {
            (FieldValue::Integer(a), FieldValue::Integer(b)) => Some(a.cmp(b)),
            (FieldValue::String(a), FieldValue::String(b)) => Some(a.cmp(b)),
            (FieldValue::Boolean(a), FieldValue::Boolean(b)) => Some(a.cmp(b)),
            _ => match (lhs.as_f64(), rhs.as_f64()) {
                (Some(a), Some(b)) => match a.partial_cmp(&b) {
                    Some(ordering) => Some(ordering),
                    // NaN: no comparison holds.
                    None => return Some(false),
                },
                _ => None,
            },
        };

        match (self, ordering) {
            (Self::Eq, None) => Some(false),
            (_, None) => None,
            (Self::Eq, Some(o)) => Some(o == Ordering::Equal),
            (Self::Gt, Some(o)) => Some(o == Ordering::Greater),
            (Self::Lt, Some(o)) => Some(o == Ordering::Less),
            (Self::Ge, Some(o)) => Some(o != Ordering::Less),
            (Self::Le, Some(o)) => Some(o != Ordering::Greater),
        }
    }
}

/// Declared output type of a calculated field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
pub enum FieldType {
    #[default]
    #[strum(to_string = "Integer", serialize = "integer")]
    Integer,
    #[strum(to_string = "Float", serialize = "float")]
    Float,
    #[strum(to_string = "String", serialize = "string")]
    String,
}

impl FieldType {
    /// Parse a candidate key into a value of this type.
    pub fn parse_candidate(self, raw: &str) -> Option<FieldValue> {
        match self {
            Self::Integer => raw.trim().parse::<i64>().ok().map(FieldValue::Integer),
            Self::Float => raw
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .map(FieldValue::Float),
            Self::String => Some(FieldValue::String(raw.to_owned())),
        }
    }

    /// Zero value of this type: `0`, `0.0` or `""`.
    pub fn zero(self) -> FieldValue {
        match self {
            Self::Integer => FieldValue::Integer(0),
            Self::Float => FieldValue::Float(0.0),
            Self::String => FieldValue::String(String::new()),
        }
    }
}

/// What a calculated field emits when no candidate matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoMatchPolicy {
    /// The configured default value.
    #[default]
    Default,
    /// The zero value of the declared type.
    Zero,
}

/// One `<operator> <threshold>` test against the source field.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub operator: Operator,
    pub threshold: FieldValue,
}

impl Condition {
    pub fn new(operator: Operator, threshold: impl Into<FieldValue>) -> Self {
        Self {
            operator,
            threshold: threshold.into(),
        }
    }
}

/// A candidate output with its merged condition group.
#[derive(Debug, Clone, PartialEq)]
struct Candidate {
    /// First key in the definition that parsed to `output`.
    key: String,
    output: FieldValue,
    conditions: Vec<Condition>,
}

/// A validated calculated field definition.
#[derive(Debug, Clone, PartialEq)]
pub struct CalculatedField {
    name: String,
    field: String,
    field_type: FieldType,
    default: FieldValue,
    no_match: NoMatchPolicy,
    candidates: Vec<Candidate>,
}

impl CalculatedField {
    /// Build a field, checking every part of the definition.
    pub fn new(
        name: impl Into<String>,
        field: impl Into<String>,
        field_type: FieldType,
        default: FieldValue,
        conditions: IndexMap<String, Vec<Condition>>,
    ) -> Result<Self, CalculatedFieldError> {
        let name = name.into();
        let field = field.into();

        if name.is_empty() {
            return Err(CalculatedFieldError::EmptyName);
        }
        if field.is_empty() {
            return Err(CalculatedFieldError::EmptySourceField { name });
        }
        if conditions.is_empty() {
            return Err(CalculatedFieldError::NoConditions { name });
        }

        let mut candidates: Vec<Candidate> = Vec::with_capacity(conditions.len());
        for (key, group) in conditions {
            if group.is_empty() {
                return Err(CalculatedFieldError::EmptyConditionGroup { name, candidate: key });
            }
            let Some(output) = field_type.parse_candidate(&key) else {
                return Err(CalculatedFieldError::InvalidCandidate {
                    name,
                    candidate: key,
                    field_type: field_type.to_string(),
                });
            };
            match candidates.iter_mut().find(|c| c.output == output) {
                Some(existing) => existing.conditions.extend(group),
                None => candidates.push(Candidate {
                    key,
                    output,
                    conditions: group,
                }),
            }
        }

        Ok(Self {
            name,
            field,
            field_type,
            default,
            no_match: NoMatchPolicy::default(),
            candidates,
        })
    }

    /// Build a field from its configuration form.
    pub fn from_config(name: &str, config: &CalculatedFieldConfig) -> Result<Self, CalculatedFieldError> {
        let field_type = config
            .field_type
            .parse::<FieldType>()
            .map_err(|_| CalculatedFieldError::InvalidType {
                name: name.to_owned(),
                field_type: config.field_type.clone(),
            })?;

        let mut conditions = IndexMap::with_capacity(config.conditions.len());
        for (candidate, tests) in &config.conditions {
            let mut group = Vec::with_capacity(tests.len());
            for (operator, threshold) in tests {
                let operator = operator
                    .trim()
                    .parse::<Operator>()
                    .map_err(|_| CalculatedFieldError::InvalidOperator {
                        name: name.to_owned(),
                        operator: operator.clone(),
                    })?;
                group.push(Condition::new(operator, threshold.clone()));
            }
            conditions.insert(candidate.clone(), group);
        }

        Ok(Self::new(name, config.field.as_str(), field_type, config.default.clone(), conditions)?
            .with_no_match(config.no_match))
    }

    /// Set the zero-match fallback.
    #[must_use]
    pub fn with_no_match(mut self, policy: NoMatchPolicy) -> Self {
        self.no_match = policy;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the field the conditions are tested against.
    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    pub fn default_value(&self) -> &FieldValue {
        &self.default
    }

    pub fn no_match(&self) -> NoMatchPolicy {
        self.no_match
    }

    /// Total number of comparisons across all candidates.
    pub fn condition_count(&self) -> usize {
        self.candidates.iter().map(|c| c.conditions.len()).sum()
    }

    /// Evaluate against `data`, returning `(name, value)`.
    pub fn evaluate(&self, data: &Reading) -> Result<(String, FieldValue), CalculatedFieldError> {
        let value = data
            .get(&self.field)
            .ok_or_else(|| CalculatedFieldError::MissingField {
                name: self.name.clone(),
                field: self.field.clone(),
            })?;

        let mut matched: Vec<&FieldValue> = Vec::new();
        for candidate in &self.candidates {
            if self.group_holds(value, &candidate.conditions)? {
                matched.push(&candidate.output);
            }
        }

        let result = match matched.as_slice() {
            [] => match self.no_match {
                NoMatchPolicy::Default => self.default.clone(),
                NoMatchPolicy::Zero => self.field_type.zero(),
            },
            [only] => (*only).clone(),
            many => {
                warn!(
                    field = %self.name,
                    source = %self.field,
                    matches = many.len(),
                    "field matched multiple conditions, using default value"
                );
                self.default.clone()
            }
        };
        Ok((self.name.clone(), result))
    }

    /// Convert back to the configuration form.
    pub fn to_config(&self) -> CalculatedFieldConfig {
        CalculatedFieldConfig {
            default: self.default.clone(),
            field: self.field.clone(),
            field_type: self.field_type.to_string(),
            conditions: self
                .candidates
                .iter()
                .map(|candidate| {
                    let tests = candidate
                        .conditions
                        .iter()
                        .map(|c| (c.operator.to_string(), c.threshold.clone()))
                        .collect();
                    (candidate.key.clone(), tests)
                })
                .collect(),
            no_match: self.no_match,
        }
    }

    fn group_holds(&self, value: &FieldValue, group: &[Condition]) -> Result<bool, CalculatedFieldError> {
        for condition in group {
            let holds = condition
                .operator
                .compare(value, &condition.threshold)
                .ok_or_else(|| CalculatedFieldError::Incomparable {
                    name: self.name.clone(),
                    operator: condition.operator.to_string(),
                    value: value.to_string(),
                    threshold: condition.threshold.to_string(),
                })?;
            if !holds {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    // ── Helpers ──────────────────────────────────────────────────────

    fn data(power: impl Into<FieldValue>) -> Reading {
        let mut reading = Reading::new();
        reading.insert("power".into(), power.into());
        reading
    }

    fn on_off(threshold: i64) -> CalculatedField {
        CalculatedField::new(
            "is_on",
            "power",
            FieldType::Integer,
            FieldValue::Integer(-1),
            IndexMap::from([
                ("0".to_owned(), vec![Condition::new(Operator::Le, threshold)]),
                ("1".to_owned(), vec![Condition::new(Operator::Gt, threshold)]),
            ]),
        )
        .unwrap()
    }

    // ── Operators ────────────────────────────────────────────────────

    #[test]
    fn operators_parse_from_symbols() {
        for (symbol, op) in [
            ("=", Operator::Eq),
            (">", Operator::Gt),
            ("<", Operator::Lt),
            (">=", Operator::Ge),
            ("<=", Operator::Le),
        ] {
            assert_eq!(symbol.parse::<Operator>().unwrap(), op);
            assert_eq!(op.to_string(), symbol);
        }
        assert!("!=".parse::<Operator>().is_err());
        assert!("==".parse::<Operator>().is_err());
    }

    #[test]
    fn mixed_numeric_comparison() {
        let five = FieldValue::Integer(5);
        assert_eq!(Operator::Gt.compare(&five, &FieldValue::Float(4.5)), Some(true));
        assert_eq!(Operator::Eq.compare(&five, &FieldValue::Float(5.0)), Some(true));
        assert_eq!(Operator::Le.compare(&FieldValue::Float(f64::NAN), &five), Some(false));
    }

    #[test]
    fn mismatched_kinds_are_unequal_and_unordered() {
        let text = FieldValue::from("on");
        let one = FieldValue::Integer(1);
        assert_eq!(Operator::Eq.compare(&text, &one), Some(false));
        assert_eq!(Operator::Gt.compare(&text, &one), None);
        assert_eq!(Operator::Lt.compare(&text, &FieldValue::from("pn")), Some(true));
    }

    // ── Field types ──────────────────────────────────────────────────

    #[test]
    fn field_type_spellings() {
        assert_eq!("Integer".parse::<FieldType>().unwrap(), FieldType::Integer);
        assert_eq!("integer".parse::<FieldType>().unwrap(), FieldType::Integer);
        assert_eq!("float".parse::<FieldType>().unwrap(), FieldType::Float);
        assert_eq!("String".parse::<FieldType>().unwrap(), FieldType::String);
        assert!("Bool".parse::<FieldType>().is_err());
    }

    #[test]
    fn candidates_parse_strictly() {
        assert_eq!(FieldType::Integer.parse_candidate("12"), Some(FieldValue::Integer(12)));
        assert_eq!(FieldType::Integer.parse_candidate("1.5"), None);
        assert_eq!(FieldType::Float.parse_candidate("1.5"), Some(FieldValue::Float(1.5)));
        assert_eq!(FieldType::Float.parse_candidate("inf"), None);
        assert_eq!(FieldType::String.parse_candidate("high"), Some(FieldValue::from("high")));
    }

    // ── Evaluation ───────────────────────────────────────────────────

    #[test]
    fn single_match_wins() {
        let field = on_off(100_000);
        assert_eq!(field.evaluate(&data(50_000_i64)).unwrap().1, FieldValue::Integer(0));
        assert_eq!(field.evaluate(&data(150_000_i64)).unwrap().1, FieldValue::Integer(1));
        assert_eq!(field.evaluate(&data(100_000_i64)).unwrap().1, FieldValue::Integer(0));
    }

    #[test]
    fn overlapping_groups_fall_back_to_default() {
        let field = CalculatedField::new(
            "band",
            "power",
            FieldType::Integer,
            FieldValue::Integer(9),
            IndexMap::from([
                ("0".to_owned(), vec![Condition::new(Operator::Ge, 0_i64)]),
                ("1".to_owned(), vec![Condition::new(Operator::Ge, 10_i64)]),
            ]),
        )
        .unwrap();

        assert_eq!(field.evaluate(&data(50_i64)).unwrap(), ("band".to_owned(), FieldValue::Integer(9)));
        assert_eq!(field.evaluate(&data(5_i64)).unwrap().1, FieldValue::Integer(0));
    }

    #[test]
    fn all_conditions_of_a_group_must_hold() {
        let field = CalculatedField::new(
            "level",
            "power",
            FieldType::String,
            FieldValue::from("unknown"),
            IndexMap::from([
                (
                    "mid".to_owned(),
                    vec![Condition::new(Operator::Gt, 10_i64), Condition::new(Operator::Lt, 20_i64)],
                ),
                ("high".to_owned(), vec![Condition::new(Operator::Ge, 20_i64)]),
            ]),
        )
        .unwrap();

        assert_eq!(field.evaluate(&data(15_i64)).unwrap().1, FieldValue::from("mid"));
        assert_eq!(field.evaluate(&data(25_i64)).unwrap().1, FieldValue::from("high"));
        assert_eq!(field.evaluate(&data(5_i64)).unwrap().1, FieldValue::from("unknown"));
        assert_eq!(field.condition_count(), 3);
    }

    #[test]
    fn same_valued_candidates_merge_their_conditions() {
        let field = CalculatedField::new(
            "band",
            "power",
            FieldType::Integer,
            FieldValue::Integer(-1),
            IndexMap::from([
                ("1".to_owned(), vec![Condition::new(Operator::Gt, 10_i64)]),
                ("01".to_owned(), vec![Condition::new(Operator::Lt, 20_i64)]),
            ]),
        )
        .unwrap();

        assert_eq!(field.evaluate(&data(15_i64)).unwrap().1, FieldValue::Integer(1));
        // Only one half of the merged group holds.
        assert_eq!(field.evaluate(&data(25_i64)).unwrap().1, FieldValue::Integer(-1));
        assert_eq!(field.evaluate(&data(5_i64)).unwrap().1, FieldValue::Integer(-1));
        assert_eq!(field.condition_count(), 2);

        let config = field.to_config();
        assert_eq!(config.conditions.keys().collect::<Vec<_>>(), ["1"]);
        assert_eq!(config.conditions["1"].len(), 2);
    }

    #[test]
    fn zero_policy_emits_typed_zero() {
        let field = CalculatedField::new(
            "ratio",
            "power",
            FieldType::Float,
            FieldValue::Float(-1.0),
            IndexMap::from([("0.5".to_owned(), vec![Condition::new(Operator::Eq, 7_i64)])]),
        )
        .unwrap()
        .with_no_match(NoMatchPolicy::Zero);

        assert_eq!(field.evaluate(&data(1_i64)).unwrap().1, FieldValue::Float(0.0));
        assert_eq!(field.evaluate(&data(7_i64)).unwrap().1, FieldValue::Float(0.5));
    }

    #[test]
    fn missing_source_field_is_an_error() {
        let err = on_off(1).evaluate(&Reading::new()).unwrap_err();
        assert_eq!(
            err,
            CalculatedFieldError::MissingField {
                name: "is_on".into(),
                field: "power".into(),
            }
        );
    }

    #[test]
    fn ordering_a_string_against_a_number_is_an_error() {
        let err = on_off(1).evaluate(&data("lots")).unwrap_err();
        assert!(matches!(err, CalculatedFieldError::Incomparable { .. }));
    }

    // ── Construction ─────────────────────────────────────────────────

    #[test]
    fn construction_rejects_malformed_definitions() {
        let group = || vec![Condition::new(Operator::Eq, 1_i64)];

        let err = CalculatedField::new("", "p", FieldType::Integer, 0_i64.into(), IndexMap::new()).unwrap_err();
        assert_eq!(err, CalculatedFieldError::EmptyName);

        let err = CalculatedField::new("x", "", FieldType::Integer, 0_i64.into(), IndexMap::new()).unwrap_err();
        assert!(matches!(err, CalculatedFieldError::EmptySourceField { .. }));

        let err = CalculatedField::new("x", "p", FieldType::Integer, 0_i64.into(), IndexMap::new()).unwrap_err();
        assert!(matches!(err, CalculatedFieldError::NoConditions { .. }));

        let err = CalculatedField::new(
            "x",
            "p",
            FieldType::Integer,
            0_i64.into(),
            IndexMap::from([("1".to_owned(), Vec::new())]),
        )
        .unwrap_err();
        assert!(matches!(err, CalculatedFieldError::EmptyConditionGroup { .. }));

        let err = CalculatedField::new(
            "x",
            "p",
            FieldType::Integer,
            0_i64.into(),
            IndexMap::from([("one".to_owned(), group())]),
        )
        .unwrap_err();
        assert!(matches!(err, CalculatedFieldError::InvalidCandidate { .. }));
    }

    #[test]
    fn from_config_validates_type_and_operator() {
        let mut config: CalculatedFieldConfig = serde_json::from_str(
            r#"{ "default": 0, "field": "power", "type": "integer", "conditions": { "1": { ">": 5 } } }"#,
        )
        .unwrap();
        let field = CalculatedField::from_config("on", &config).unwrap();
        assert_eq!(field.field_type(), FieldType::Integer);
        assert_eq!(field.to_config().field_type, "Integer");

        config.field_type = "Decimal".into();
        assert!(matches!(
            CalculatedField::from_config("on", &config).unwrap_err(),
            CalculatedFieldError::InvalidType { .. }
        ));

        config.field_type = "Integer".into();
        config.conditions = IndexMap::from([("1".to_owned(), IndexMap::from([("!=".to_owned(), 5_i64.into())]))]);
        assert!(matches!(
            CalculatedField::from_config("on", &config).unwrap_err(),
            CalculatedFieldError::InvalidOperator { .. }
        ));
    }
}
