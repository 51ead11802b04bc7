//! Smart-plug polling and line-protocol assembly for plugline.
//!
//! The pipeline for one run:
//!
//! - **[`runner::run`]**: Walks every measurement in configuration order and
//!   spawns one task per enabled plug. Tasks of a measurement are joined
//!   before the next measurement starts.
//!
//! - **[`PollCache`]**: Per-plug cache in front of a [`Device`]. Readings are
//!   reused for [`POLL_TTL`] after a successful poll; failures are never
//!   cached.
//!
//! - **[`MetricAssembler`]**: Maps raw readings through [`FieldMap`]s,
//!   evaluates [`CalculatedFieldCollection`]s and builds a [`MetricLine`].
//!
//! - **[`line`]**: InfluxDB line-protocol escaping and formatting.

pub mod cache;
pub mod calculated;
pub mod clock;
pub mod config;
pub mod device;
pub mod error;
pub mod field_map;
pub mod line;
pub mod metric;
pub mod model;
pub mod runner;

#[cfg(test)]
mod testing;

pub use cache::{POLL_TTL, PollCache};
pub use calculated::{CalculatedField, CalculatedFieldCollection, Condition, FieldType, NoMatchPolicy, Operator};
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use config::{CalculatedFieldConfig, FieldOverrides, MeasurementsConfig, PlugConfig};
pub use device::Device;
pub use error::{CalculatedFieldCollectionError, CalculatedFieldError, EmptyDataError, PlugError, PollError, RunError};
pub use field_map::FieldMap;
pub use line::{LineBuilder, MetricLine};
pub use metric::{MetricAssembler, PlugSetup};
pub use model::{FieldValue, Reading, ReadingKind};
pub use runner::{PlugFailure, RunOptions, RunReport, run};
