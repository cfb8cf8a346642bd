//! Application State
//!
//! Shared state across all handlers.

use std::sync::Arc;

use voice_intent_agent::{ConversationEngine, InMemoryDataSource, InMemorySessionStore};
use voice_intent_config::Settings;
use voice_intent_core::{DataSource, SessionStore};

use crate::scripts;
use crate::ServerError;

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Settings>,
    pub engine: Arc<ConversationEngine>,
    pub session_store: Arc<dyn SessionStore>,
}

impl AppState {
    /// Demo scripts over an in-memory session store and data source.
    ///
    /// Records come from `data_source.fixtures_path` when set, otherwise from
    /// the built-in sample records.
    pub fn new(mut config: Settings) -> Result<Self, ServerError> {
        if config.data_source.fields_of_interest.is_empty() {
            config.data_source.fields_of_interest = scripts::fields_of_interest();
        }

        let data_source: Arc<dyn DataSource> = match config.data_source.load_fixtures()? {
            Some(fixtures) => Arc::new(InMemoryDataSource::from_fixtures(fixtures)),
            None => {
                tracing::info!("No fixtures configured, using sample records");
                Arc::new(scripts::sample_data_source())
            }
        };

        Self::with_collaborators(config, Arc::new(InMemorySessionStore::new()), data_source)
    }

    /// Demo scripts over the given collaborators
    pub fn with_collaborators(
        config: Settings,
        session_store: Arc<dyn SessionStore>,
        data_source: Arc<dyn DataSource>,
    ) -> Result<Self, ServerError> {
        let model = scripts::demo_model(&config.engine)?;
        let engine = ConversationEngine::with_settings(
            Arc::new(model),
            Arc::clone(&session_store),
            data_source,
            &config.engine,
            &config.data_source,
        );

        tracing::info!(
            distributed = session_store.is_distributed(),
            timeout_ms = config.data_source.timeout_ms,
            "Initialized application state"
        );

        Ok(Self {
            config: Arc::new(config),
            engine: Arc::new(engine),
            session_store,
        })
    }
}
