//! Slot values, data-source records and the field projection contract

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A value held in a slot (numbers, text, or whole result lists).
pub type SlotValue = Value;

/// One record returned by the data source: field name to value.
pub type Record = serde_json::Map<String, Value>;

/// Render a slot value the way it should be spoken.
///
/// Strings are spoken verbatim, integral numbers without a fraction,
/// everything else as compact JSON.
pub fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => i.to_string(),
            (None, Some(f)) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
                (f as i64).to_string()
            }
            _ => n.to_string(),
        },
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Read a record field as spoken text. Missing fields render empty.
pub fn field_text(record: &Record, field: &str) -> String {
    record.get(field).map(render_value).unwrap_or_default()
}

/// Projection contract between scripts and the data source.
///
/// Entity and field names carry a trailing marker (`Lead*`, `Name*`). The
/// marker is stripped before talking to the store; when fields of interest are
/// declared for an entity, records are cut down to those fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldProjection {
    /// Marker character
    #[serde(default = "default_marker")]
    pub marker: char,
    /// Entity (marked) to fields of interest (marked)
    #[serde(default)]
    pub fields_of_interest: HashMap<String, Vec<String>>,
}

fn default_marker() -> char {
    '*'
}

impl Default for FieldProjection {
    fn default() -> Self {
        Self {
            marker: default_marker(),
            fields_of_interest: HashMap::new(),
        }
    }
}

impl FieldProjection {
    pub fn new(marker: char) -> Self {
        Self {
            marker,
            fields_of_interest: HashMap::new(),
        }
    }

    /// Declare fields of interest for an entity
    pub fn with_fields(mut self, entity: impl Into<String>, fields: &[&str]) -> Self {
        let entity = self.strip(&entity.into()).into_owned();
        self.fields_of_interest
            .insert(entity, fields.iter().map(|f| f.to_string()).collect());
        self
    }

    /// Remove the marker from every path segment (`Who*.Name*` -> `Who.Name`)
    pub fn strip<'a>(&self, name: &'a str) -> std::borrow::Cow<'a, str> {
        if !name.contains(self.marker) {
            return std::borrow::Cow::Borrowed(name);
        }
        std::borrow::Cow::Owned(
            name.split('.')
                .map(|segment| segment.trim_end_matches(self.marker))
                .collect::<Vec<_>>()
                .join("."),
        )
    }

    /// Strip markers from the keys of a field map
    pub fn strip_fields(&self, fields: &Record) -> Record {
        fields
            .iter()
            .map(|(k, v)| (self.strip(k).into_owned(), v.clone()))
            .collect()
    }

    /// Top-level fields kept for an entity, or `None` to keep all of them
    pub fn kept_fields(&self, entity: &str) -> Option<Vec<String>> {
        let entity = self.strip(entity);
        let declared = self
            .fields_of_interest
            .iter()
            .find(|(name, _)| self.strip(name) == entity)
            .map(|(_, fields)| fields)?;

        let mut kept: Vec<String> = Vec::with_capacity(declared.len() + 1);
        for field in declared {
            let stripped = self.strip(field);
            let top = stripped.split('.').next().unwrap_or_default().to_string();
            if !kept.contains(&top) {
                kept.push(top);
            }
        }
        Some(kept)
    }

    /// Cut a record down to the fields of interest of its entity
    pub fn project(&self, entity: &str, record: &Record) -> Record {
        match self.kept_fields(entity) {
            Some(kept) => record
                .iter()
                .filter(|(k, _)| kept.iter().any(|f| f == *k) || k.as_str() == "Id")
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            None => record.clone(),
        }
    }
}
