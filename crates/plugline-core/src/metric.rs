// ── Metric assembly ──
//
// Turns one plug's (sysinfo, energy) readings into one line:
//
//   <measurement>,plug=<name>[,<default tags>][,<custom tags>] <energy>,<info>[,<calculated>]

use indexmap::IndexMap;
use tracing::{debug, trace};

use crate::cache::PollCache;
use crate::calculated::CalculatedFieldCollection;
use crate::clock::Clock;
use crate::config::PlugConfig;
use crate::device::Device;
use crate::error::{CalculatedFieldCollectionError, PlugError};
use crate::field_map::FieldMap;
use crate::line::{LineBuilder, MetricLine};
use crate::model::{FieldValue, Reading, ReadingKind};

/// Everything about a plug that shapes its line, resolved from config once.
#[derive(Debug, Clone, PartialEq)]
pub struct PlugSetup {
    pub tag_map: FieldMap,
    pub energy_map: FieldMap,
    pub info_map: FieldMap,
    pub custom_tags: IndexMap<String, String>,
    pub calculated_fields: CalculatedFieldCollection,
}

impl Default for PlugSetup {
    fn default() -> Self {
        Self {
            tag_map: FieldMap::default_tags(),
            energy_map: FieldMap::energy_fields(),
            info_map: FieldMap::info_fields(),
            custom_tags: IndexMap::new(),
            calculated_fields: CalculatedFieldCollection::new(),
        }
    }
}

impl PlugSetup {
    /// Resolve field overrides, custom tags and calculated fields of a plug.
    pub fn from_config(config: &PlugConfig) -> Result<Self, CalculatedFieldCollectionError> {
        let mut calculated_fields = CalculatedFieldCollection::new();
        for (name, field) in &config.calculated_fields {
            calculated_fields.add_from_config(name, field)?;
        }

        Ok(Self {
            tag_map: FieldMap::default_tags(),
            energy_map: FieldMap::energy_fields().with_overrides(&config.fields.energy),
            info_map: FieldMap::info_fields().with_overrides(&config.fields.info),
            custom_tags: config
                .tags
                .iter()
                .map(|(key, value)| (key.clone(), value.to_string()))
                .collect(),
            calculated_fields,
        })
    }
}

/// Builds lines for the plugs of one measurement.
#[derive(Debug, Clone)]
pub struct MetricAssembler {
    measurement: String,
    setup: PlugSetup,
}

impl MetricAssembler {
    pub fn new(measurement: impl Into<String>, setup: PlugSetup) -> Self {
        Self {
            measurement: measurement.into(),
            setup,
        }
    }

    pub fn measurement(&self) -> &str {
        &self.measurement
    }

    pub fn setup(&self) -> &PlugSetup {
        &self.setup
    }

    /// Read the plug through its cache and assemble its line.
    pub async fn poll<D: Device, C: Clock>(&self, cache: &mut PollCache<D, C>) -> Result<MetricLine, PlugError> {
        let plug = cache.name().to_owned();
        let (sysinfo, energy) = cache.read().await?;
        self.assemble(&plug, sysinfo, energy)
    }

    /// Assemble a line from already-polled readings.
    pub fn assemble(&self, plug: &str, sysinfo: &Reading, energy: &Reading) -> Result<MetricLine, PlugError> {
        let setup = &self.setup;
        let mut builder = LineBuilder::new(&self.measurement);

        // ── Tags ──
        builder.tag("plug", plug);
        for (raw, name) in setup.tag_map.iter() {
            match sysinfo.get(raw) {
                Some(value) => {
                    builder.tag(name, &value.to_string());
                }
                None => trace!(plug, tag = raw, "tag not present in system info"),
            }
        }
        for (key, value) in &setup.custom_tags {
            builder.tag(key, value);
        }

        // ── Fields ──
        let empty_data = |source| PlugError::EmptyData {
            plug: plug.to_owned(),
            source,
        };
        let energy_fields = coerce(setup.energy_map.extract(energy, ReadingKind::Energy).map_err(empty_data)?);
        let info_fields = coerce(setup.info_map.extract(sysinfo, ReadingKind::SystemInfo).map_err(empty_data)?);

        builder.fields(&energy_fields).fields(&info_fields);

        if !setup.calculated_fields.is_empty() {
            let mut combined = energy_fields;
            combined.extend(info_fields);
            let calculated = setup
                .calculated_fields
                .evaluate_all(&combined)
                .map_err(|source| PlugError::CalculatedFields {
                    plug: plug.to_owned(),
                    source,
                })?;
            for (name, value) in calculated {
                builder.field(&name, value);
            }
        }

        let line = builder.build().ok_or_else(|| PlugError::NoFields { plug: plug.to_owned() })?;
        debug!(measurement = %self.measurement, plug, fields = line.fields().len(), "assembled line");
        Ok(line)
    }
}

fn coerce(reading: Reading) -> Reading {
    reading
        .into_iter()
        .map(|(key, value)| (key, FieldValue::coerce_integer(value)))
        .collect()
}
