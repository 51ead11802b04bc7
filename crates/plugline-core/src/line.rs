//! InfluxDB line-protocol formatting.
//!
//! ```text
//! <measurement>[,<tag>=<value>]* <field>=<value>[,<field>=<value>]*
//! ```
//!
//! - Tag values, tag keys and field keys escape space, comma and `=`.
//! - Measurement names escape space and comma.
//! - Integers carry an `i` suffix, strings are double-quoted, floats and
//!   booleans are written as-is.

use std::fmt;

use crate::model::FieldValue;

/// Backslash-escape every space, comma and `=` in a tag value.
pub fn escape_tag_value(value: &str) -> String {
    escape(value, &[' ', ',', '='])
}

/// Backslash-escape a tag or field key. Same rules as tag values.
pub fn escape_key(key: &str) -> String {
    escape_tag_value(key)
}

/// Backslash-escape every space and comma in a measurement name.
pub fn escape_measurement(name: &str) -> String {
    escape(name, &[' ', ','])
}

/// Render a field value for the field set.
pub fn format_field_value(value: &FieldValue) -> String {
    match value {
        FieldValue::Integer(i) => format!("{i}i"),
        FieldValue::String(s) => format!("\"{}\"", escape(s, &['"', '\\'])),
        FieldValue::Float(_) | FieldValue::Boolean(_) => value.to_string(),
    }
}

fn escape(value: &str, special: &[char]) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if special.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

// ── MetricLine ───────────────────────────────────────────────────────

/// One fully escaped line-protocol record.
///
/// Built through [`LineBuilder`]; the only way to change a line afterwards is
/// [`with_field`](MetricLine::with_field), which consumes it.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricLine {
    measurement: String,
    tags: Vec<(String, String)>,
    fields: Vec<(String, FieldValue)>,
}

impl MetricLine {
    pub fn measurement(&self) -> &str {
        &self.measurement
    }

    /// Escaped `(key, value)` tag pairs, in emission order.
    pub fn tags(&self) -> &[(String, String)] {
        &self.tags
    }

    /// Escaped field keys with their unformatted values, in emission order.
    pub fn fields(&self) -> &[(String, FieldValue)] {
        &self.fields
    }

    /// Return a copy of this line with one more field appended.
    #[must_use]
    pub fn with_field(mut self, key: &str, value: impl Into<FieldValue>) -> Self {
        self.fields.push((escape_key(key), value.into()));
        self
    }
}

impl fmt::Display for MetricLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.measurement)?;
        for (key, value) in &self.tags {
            write!(f, ",{key}={value}")?;
        }
        f.write_str(" ")?;
        for (i, (key, value)) in self.fields.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{key}={}", format_field_value(value))?;
        }
        Ok(())
    }
}

/// Accumulates escaped tags and fields for a [`MetricLine`].
#[derive(Debug, Clone)]
pub struct LineBuilder {
    measurement: String,
    tags: Vec<(String, String)>,
    fields: Vec<(String, FieldValue)>,
}

impl LineBuilder {
    pub fn new(measurement: &str) -> Self {
        Self {
            measurement: escape_measurement(measurement),
            tags: Vec::new(),
            fields: Vec::new(),
        }
    }

    /// Append a tag. Empty values are skipped: the protocol has no empty tags.
    pub fn tag(&mut self, key: &str, value: &str) -> &mut Self {
        if !value.is_empty() {
            self.tags.push((escape_key(key), escape_tag_value(value)));
        }
        self
    }

    pub fn field(&mut self, key: &str, value: impl Into<FieldValue>) -> &mut Self {
        self.fields.push((escape_key(key), value.into()));
        self
    }

    pub fn fields<'a>(&mut self, fields: impl IntoIterator<Item = (&'a String, &'a FieldValue)>) -> &mut Self {
        for (key, value) in fields {
            self.field(key, value.clone());
        }
        self
    }

    pub fn has_fields(&self) -> bool {
        !self.fields.is_empty()
    }

    /// Finish the line. A line without fields is not valid line protocol.
    pub fn build(self) -> Option<MetricLine> {
        if self.fields.is_empty() {
            return None;
        }
        Some(MetricLine {
            measurement: self.measurement,
            tags: self.tags,
            fields: self.fields,
        })
    }
}
