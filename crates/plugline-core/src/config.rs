// ── Configuration model ──
//
// Deserialized shape of a plugline configuration document:
// measurement -> plug -> plug settings. Both levels keep document order.
// Loading from disk lives in `plugline-config`.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::calculated::NoMatchPolicy;
use crate::model::FieldValue;

/// All measurements, each with its plugs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MeasurementsConfig {
    pub measurements: IndexMap<String, IndexMap<String, PlugConfig>>,
}

impl MeasurementsConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a plug under a measurement, creating the measurement if needed.
    pub fn insert(&mut self, measurement: impl Into<String>, plug: impl Into<String>, config: PlugConfig) {
        self.measurements
            .entry(measurement.into())
            .or_default()
            .insert(plug.into(), config);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &IndexMap<String, PlugConfig>)> {
        self.measurements.iter().map(|(name, plugs)| (name.as_str(), plugs))
    }

    /// Number of plugs across all measurements, enabled or not.
    pub fn plug_count(&self) -> usize {
        self.measurements.values().map(IndexMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.measurements.is_empty()
    }
}

/// Settings for one plug.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlugConfig {
    #[serde(default)]
    pub address: String,

    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Poll timeout in seconds, overriding the run-wide timeout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<f64>,

    /// Extra tags appended after the device tags.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub tags: IndexMap<String, FieldValue>,

    #[serde(default)]
    pub fields: FieldOverrides,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub calculated_fields: IndexMap<String, CalculatedFieldConfig>,
}

fn default_enabled() -> bool {
    true
}

impl PlugConfig {
    pub fn with_address(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            enabled: true,
            timeout: None,
            tags: IndexMap::new(),
            fields: FieldOverrides::default(),
            calculated_fields: IndexMap::new(),
        }
    }
}

/// Per-plug renames `raw key -> output name`; an empty name drops the key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldOverrides {
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub energy: IndexMap<String, String>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub info: IndexMap<String, String>,
}

/// A calculated field as written in the configuration.
///
/// `conditions` maps each candidate output value to `operator -> threshold`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculatedFieldConfig {
    pub default: FieldValue,
    pub field: String,
    #[serde(rename = "type", default = "default_field_type")]
    pub field_type: String,
    pub conditions: IndexMap<String, IndexMap<String, FieldValue>>,
    #[serde(default)]
    pub no_match: NoMatchPolicy,
}

fn default_field_type() -> String {
    "Integer".to_owned()
}
