//! Data source configuration
//!
//! Call timeout, the field-of-interest projection and optional fixture
//! records for the in-memory data source.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use voice_intent_core::{FieldProjection, Record};

use crate::ConfigError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSourceSettings {
    /// Per-call timeout (milliseconds)
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Marker closing entity and field names (`Lead*`)
    #[serde(default = "default_field_marker")]
    pub field_marker: char,

    /// Entity to fields of interest, both marked
    #[serde(default)]
    pub fields_of_interest: HashMap<String, Vec<String>>,

    /// YAML file with records for the in-memory data source
    #[serde(default)]
    pub fixtures_path: Option<String>,
}

fn default_timeout_ms() -> u64 {
    5_000
}

fn default_field_marker() -> char {
    '*'
}

impl Default for DataSourceSettings {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            field_marker: default_field_marker(),
            fields_of_interest: HashMap::new(),
            fixtures_path: None,
        }
    }
}

impl DataSourceSettings {
    /// Projection contract derived from these settings
    pub fn projection(&self) -> FieldProjection {
        FieldProjection {
            marker: self.field_marker,
            fields_of_interest: self.fields_of_interest.clone(),
        }
    }

    /// Load the configured fixture file, if any
    pub fn load_fixtures(&self) -> Result<Option<Fixtures>, ConfigError> {
        match &self.fixtures_path {
            Some(path) => Fixtures::from_yaml_file(path).map(Some),
            None => Ok(None),
        }
    }
}

/// Records seeded into the in-memory data source
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Fixtures {
    /// Entity (unmarked) to records
    #[serde(default)]
    pub entities: HashMap<String, Vec<Record>>,
    /// Canned answers for raw filters
    #[serde(default)]
    pub views: Vec<FixtureView>,
}

/// Records returned for one raw filter on one entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureView {
    pub entity: String,
    pub filter: String,
    #[serde(default)]
    pub records: Vec<Record>,
}

impl Fixtures {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;

        serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}
