//! In-memory collaborators
//!
//! - `InMemorySessionStore` - sessions in a HashMap, lost on restart
//! - `InMemoryDataSource` - records seeded in code or from a fixture file

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;

use voice_intent_config::Fixtures;
use voice_intent_core::{
    field_text, DataSource, DataSourceError, Record, Session, SessionStore, SessionStoreError,
    SlotValue,
};

/// Process-local session store
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, Session>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, id: &str) -> Result<Option<Session>, SessionStoreError> {
        Ok(self.sessions.read().get(id).cloned())
    }

    async fn put(&self, session: Session) -> Result<(), SessionStoreError> {
        self.sessions.write().insert(session.id.clone(), session);
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), SessionStoreError> {
        self.sessions.write().remove(id);
        Ok(())
    }

    async fn list_ids(&self) -> Result<Vec<String>, SessionStoreError> {
        Ok(self.sessions.read().keys().cloned().collect())
    }

    fn is_distributed(&self) -> bool {
        false
    }
}

/// Record store backed by HashMaps.
///
/// Raw filters cannot be evaluated here; each one the scripts use has to be
/// registered as a view with its canned result.
#[derive(Default)]
pub struct InMemoryDataSource {
    entities: RwLock<HashMap<String, Vec<Record>>>,
    /// (entity, lowercased filter) to records
    views: HashMap<(String, String), Vec<Record>>,
    latency: Option<Duration>,
    failure: Option<DataSourceError>,
}

impl InMemoryDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fixtures(fixtures: Fixtures) -> Self {
        let mut source = Self::new();
        for (entity, records) in fixtures.entities {
            source = source.with_entity(entity, records);
        }
        for view in fixtures.views {
            source = source.with_view(view.entity, &view.filter, view.records);
        }
        tracing::info!(
            entities = source.entities.read().len(),
            views = source.views.len(),
            "Loaded data source fixtures"
        );
        source
    }

    pub fn with_entity(self, entity: impl Into<String>, records: Vec<Record>) -> Self {
        self.entities.write().insert(entity.into(), records);
        self
    }

    /// Canned answer for `load(entity, .., raw_filter)`
    pub fn with_view(mut self, entity: impl Into<String>, filter: &str, records: Vec<Record>) -> Self {
        let entity = entity.into();
        self.entities.write().entry(entity.clone()).or_default();
        self.views.insert((entity, filter.trim().to_lowercase()), records);
        self
    }

    /// Delay every call, for timeout handling
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Fail every call with the given error
    pub fn with_failure(mut self, error: DataSourceError) -> Self {
        self.failure = Some(error);
        self
    }

    /// Records currently stored for an entity
    pub fn records(&self, entity: &str) -> Vec<Record> {
        self.entities.read().get(entity).cloned().unwrap_or_default()
    }

    async fn enter(&self, entity: &str) -> Result<(), DataSourceError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if let Some(error) = &self.failure {
            return Err(error.clone());
        }
        if !self.entities.read().contains_key(entity) {
            return Err(DataSourceError::UnknownEntity(entity.to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl DataSource for InMemoryDataSource {
    async fn search(&self, entity_type: &str, term: &str) -> Result<Vec<Record>, DataSourceError> {
        self.enter(entity_type).await?;
        let needle = term.to_lowercase();

        let entities = self.entities.read();
        let found = entities
            .get(entity_type)
            .map(|records| {
                records
                    .iter()
                    .filter(|r| {
                        r.values().any(|v| match v {
                            SlotValue::String(s) => s.to_lowercase().contains(&needle),
                            _ => false,
                        })
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(found)
    }

    async fn load(
        &self,
        entity_type: &str,
        filter_field: Option<&str>,
        filter_value: Option<&str>,
        raw_filter: Option<&str>,
    ) -> Result<Vec<Record>, DataSourceError> {
        self.enter(entity_type).await?;

        if let Some(filter) = raw_filter {
            let key = (entity_type.to_string(), filter.trim().to_lowercase());
            return self.views.get(&key).cloned().ok_or_else(|| {
                DataSourceError::Rejected(format!("no view for `{}` on {}", filter, entity_type))
            });
        }

        let entities = self.entities.read();
        let records = entities.get(entity_type).cloned().unwrap_or_default();
        Ok(match (filter_field, filter_value) {
            (Some(field), Some(value)) => records
                .into_iter()
                .filter(|r| field_text(r, field).eq_ignore_ascii_case(value))
                .collect(),
            _ => records,
        })
    }

    async fn store(&self, entity_type: &str, mut fields: Record) -> Result<Record, DataSourceError> {
        self.enter(entity_type).await?;

        if !fields.contains_key("Id") {
            fields.insert(
                "Id".to_string(),
                SlotValue::String(uuid::Uuid::new_v4().to_string()),
            );
        }
        self.entities
            .write()
            .entry(entity_type.to_string())
            .or_default()
            .push(fields.clone());

        tracing::debug!(entity = entity_type, "Stored record");
        Ok(fields)
    }

    fn name(&self) -> &str {
        "in-memory"
    }
}
