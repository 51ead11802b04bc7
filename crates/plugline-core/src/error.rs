// ── Core error types ──
//
// Every failure the core can produce while turning one plug into one line.
// Transport errors from `plugline-api` never escape raw: they are boxed into
// `PollError::Device` together with the plug name.

use thiserror::Error;

use crate::model::ReadingKind;

/// Boxed transport-layer cause.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Polling a plug failed or produced nothing usable.
#[derive(Debug, Error)]
pub enum PollError {
    #[error("Error polling plug {plug}: {source}")]
    Device {
        plug: String,
        #[source]
        source: BoxError,
    },

    #[error("Plug {plug} returned no {section}.{method} object")]
    MalformedResponse {
        plug: String,
        section: &'static str,
        method: &'static str,
    },

    #[error("Plug {plug} reported error code {code} for {kind}: {message}")]
    DeviceReported {
        plug: String,
        kind: ReadingKind,
        code: i64,
        message: String,
    },

    #[error("{kind} data empty for plug {plug}")]
    EmptyReading { plug: String, kind: ReadingKind },
}

impl PollError {
    pub fn device(plug: &str, source: impl Into<BoxError>) -> Self {
        Self::Device {
            plug: plug.to_owned(),
            source: source.into(),
        }
    }

    /// Name of the plug the error belongs to.
    pub fn plug(&self) -> &str {
        match self {
            Self::Device { plug, .. }
            | Self::MalformedResponse { plug, .. }
            | Self::DeviceReported { plug, .. }
            | Self::EmptyReading { plug, .. } => plug,
        }
    }
}

/// Field extraction was handed an empty reading.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{kind} reading is empty")]
pub struct EmptyDataError {
    pub kind: ReadingKind,
}

/// A calculated field definition is malformed or could not be evaluated.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CalculatedFieldError {
    // ── Construction ─────────────────────────────────────────────────
    #[error("Calculated field name must not be empty")]
    EmptyName,

    #[error("Calculated field {name} has no source field")]
    EmptySourceField { name: String },

    #[error("Invalid type {field_type} for calculated field {name}, expected Integer, Float or String")]
    InvalidType { name: String, field_type: String },

    #[error("Calculated field {name} has no conditions")]
    NoConditions { name: String },

    #[error("Calculated field {name}, condition value {candidate} has no conditions")]
    EmptyConditionGroup { name: String, candidate: String },

    #[error("Invalid operator {operator} for calculated field {name}, operator must be one of: =,>,<,>=,<=")]
    InvalidOperator { name: String, operator: String },

    #[error("Calculated field {name}: condition value {candidate} is not a valid {field_type}")]
    InvalidCandidate {
        name: String,
        candidate: String,
        field_type: String,
    },

    // ── Evaluation ───────────────────────────────────────────────────
    #[error("Calculated field {name} refers to field {field}, which is not in the data")]
    MissingField { name: String, field: String },

    #[error("Calculated field {name} cannot compare {value} {operator} {threshold}")]
    Incomparable {
        name: String,
        operator: String,
        value: String,
        threshold: String,
    },
}

/// A field inside a collection failed; names the field.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CalculatedFieldCollectionError {
    #[error("Error occurred evaluating calculated field {field}: {source}")]
    Evaluate {
        field: String,
        #[source]
        source: CalculatedFieldError,
    },

    #[error("Cannot register calculated field {field}: {source}")]
    Add {
        field: String,
        #[source]
        source: CalculatedFieldError,
    },
}

impl CalculatedFieldCollectionError {
    pub fn field(&self) -> &str {
        match self {
            Self::Evaluate { field, .. } | Self::Add { field, .. } => field,
        }
    }
}

/// Anything that stops one plug worker from producing its line.
#[derive(Debug, Error)]
pub enum PlugError {
    #[error(transparent)]
    Poll(#[from] PollError),

    #[error("Plug {plug}: {source}")]
    EmptyData {
        plug: String,
        #[source]
        source: EmptyDataError,
    },

    #[error("Plug {plug}: {source}")]
    CalculatedFields {
        plug: String,
        #[source]
        source: CalculatedFieldCollectionError,
    },

    #[error("Plug {plug} produced no fields")]
    NoFields { plug: String },

    #[error("Worker for plug {plug} failed: {message}")]
    Worker { plug: String, message: String },
}

/// A run aborted by stop-on-error mode.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("Measurement {measurement}, plug {plug} failed: {source}")]
    PlugFailed {
        measurement: String,
        plug: String,
        #[source]
        source: PlugError,
    },
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn poll_error_carries_plug_name() {
        let err = PollError::device("kitchen", "connection refused");
        assert_eq!(err.plug(), "kitchen");
        assert_eq!(err.to_string(), "Error polling plug kitchen: connection refused");
    }

    #[test]
    fn empty_data_message_names_reading() {
        let err = EmptyDataError {
            kind: ReadingKind::Energy,
        };
        assert_eq!(err.to_string(), "energy reading is empty");
    }

    #[test]
    fn collection_error_names_field() {
        let err = CalculatedFieldCollectionError::Evaluate {
            field: "load".into(),
            source: CalculatedFieldError::MissingField {
                name: "load".into(),
                field: "power".into(),
            },
        };
        assert_eq!(err.field(), "load");
        assert!(err.to_string().contains("calculated field load"));
    }
}
