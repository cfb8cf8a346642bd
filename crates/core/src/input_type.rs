//! Input Type Registry
//!
//! Named slot types used to validate and coerce text captured by a template.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::SlotCoercionError;
use crate::value::SlotValue;

/// Input type kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum InputKind {
    /// Integer or decimal
    Number,
    /// Free text; sample values are authoring hints
    Literal,
}

impl TryFrom<String> for InputKind {
    type Error = String;

    /// Accepts bare names and platform-prefixed ones (`AMAZON.LITERAL`).
    fn try_from(value: String) -> Result<Self, Self::Error> {
        let upper = value.trim().to_ascii_uppercase();
        let bare = upper.rsplit('.').next().unwrap_or_default();
        match bare {
            "NUMBER" => Ok(InputKind::Number),
            "LITERAL" => Ok(InputKind::Literal),
            _ => Err(format!("unsupported input type `{}`", value)),
        }
    }
}

impl From<InputKind> for String {
    fn from(kind: InputKind) -> Self {
        match kind {
            InputKind::Number => "NUMBER".to_string(),
            InputKind::Literal => "LITERAL".to_string(),
        }
    }
}

/// Declaration as written by a script: a bare type name or a detailed form.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InputTypeSpec {
    Kind(InputKind),
    Detailed {
        #[serde(rename = "type")]
        kind: InputKind,
        #[serde(default, rename = "sampleValues")]
        sample_values: Vec<String>,
        #[serde(default)]
        closed: bool,
    },
}

/// A registered slot type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputType {
    pub name: String,
    pub kind: InputKind,
    /// Ordered sample values (LITERAL only)
    pub sample_values: Vec<String>,
    /// When set, a LITERAL only accepts its sample values
    pub closed: bool,
}

impl InputType {
    pub fn number(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: InputKind::Number,
            sample_values: Vec::new(),
            closed: false,
        }
    }

    pub fn literal<S: Into<String>>(name: impl Into<String>, samples: impl IntoIterator<Item = S>) -> Self {
        Self {
            name: name.into(),
            kind: InputKind::Literal,
            sample_values: samples.into_iter().map(Into::into).collect(),
            closed: false,
        }
    }

    /// Restrict a LITERAL to its sample values
    pub fn closed(mut self) -> Self {
        self.closed = true;
        self
    }

    pub fn from_spec(name: impl Into<String>, spec: InputTypeSpec) -> Self {
        let name = name.into();
        match spec {
            InputTypeSpec::Kind(kind) => Self {
                name,
                kind,
                sample_values: Vec::new(),
                closed: false,
            },
            InputTypeSpec::Detailed { kind, sample_values, closed } => Self {
                name,
                kind,
                sample_values: if kind == InputKind::Literal { sample_values } else { Vec::new() },
                closed: closed && kind == InputKind::Literal,
            },
        }
    }

    /// Validate and coerce raw captured text
    pub fn coerce(&self, raw: &str) -> Result<SlotValue, SlotCoercionError> {
        let raw = raw.trim();
        match self.kind {
            InputKind::Number => parse_number(raw).ok_or_else(|| SlotCoercionError::NotANumber {
                slot: self.name.clone(),
                raw: raw.to_string(),
            }),
            InputKind::Literal => {
                if self.closed
                    && !self.sample_values.iter().any(|s| s.eq_ignore_ascii_case(raw))
                {
                    return Err(SlotCoercionError::NotInClosedSet {
                        slot: self.name.clone(),
                        raw: raw.to_string(),
                    });
                }
                Ok(Value::String(raw.to_string()))
            }
        }
    }
}

const NUMBER_WORDS: [(&str, i64); 21] = [
    ("zero", 0), ("one", 1), ("two", 2), ("three", 3), ("four", 4),
    ("five", 5), ("six", 6), ("seven", 7), ("eight", 8), ("nine", 9),
    ("ten", 10), ("eleven", 11), ("twelve", 12), ("thirteen", 13), ("fourteen", 14),
    ("fifteen", 15), ("sixteen", 16), ("seventeen", 17), ("eighteen", 18), ("nineteen", 19),
    ("twenty", 20),
];

fn parse_number(raw: &str) -> Option<SlotValue> {
    let clean = raw.replace(',', "");
    if let Ok(i) = clean.parse::<i64>() {
        return Some(Value::from(i));
    }
    if let Ok(f) = clean.parse::<f64>() {
        return serde_json::Number::from_f64(f).map(Value::Number);
    }
    let lower = raw.to_lowercase();
    NUMBER_WORDS
        .iter()
        .find(|(word, _)| *word == lower)
        .map(|(_, n)| Value::from(*n))
}

/// Registry of slot types, keyed by slot name
#[derive(Debug, Clone, Default)]
pub struct InputTypeRegistry {
    types: HashMap<String, InputType>,
}

impl InputTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a type
    pub fn add(&mut self, input_type: InputType) {
        tracing::debug!(name = %input_type.name, kind = ?input_type.kind, "Registered input type");
        self.types.insert(input_type.name.clone(), input_type);
    }

    /// Register a script-style mapping of name to declaration
    pub fn add_specs(&mut self, specs: impl IntoIterator<Item = (String, InputTypeSpec)>) {
        for (name, spec) in specs {
            self.add(InputType::from_spec(name, spec));
        }
    }

    pub fn get(&self, name: &str) -> Option<&InputType> {
        self.types.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Coerce raw text captured for `slot`
    pub fn coerce(&self, slot: &str, raw: &str) -> Result<SlotValue, SlotCoercionError> {
        self.types
            .get(slot)
            .ok_or_else(|| SlotCoercionError::UnknownType { slot: slot.to_string() })?
            .coerce(raw)
    }
}
