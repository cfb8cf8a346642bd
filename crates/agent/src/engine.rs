//! Conversation engine
//!
//! Runs one turn per utterance:
//!
//! ```text
//! lock session -> load/create -> resolve -> run handler -> commit -> prompt
//! ```
//!
//! Turns of one session are serialized by a per-session async lock; turns of
//! different sessions run concurrently. A handler's mutations are committed
//! only when it returns `Ok`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::OwnedMutexGuard;

use voice_intent_config::{DataSourceSettings, EngineSettings, FallbackTemplates, Settings};
use voice_intent_core::{
    DataSource, FieldProjection, IndexError, NoMatchError, Session, SessionStore,
};

use crate::model::{BindingScope, ConversationModel};
use crate::resolver::IntentResolver;
use crate::response::Response;
use crate::{EngineError, TurnError};

type TurnLocks = Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>;

/// Holds a session's turn lock; the map entry goes away with the last holder
struct TurnGuard<'e> {
    locks: &'e TurnLocks,
    session_id: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for TurnGuard<'_> {
    fn drop(&mut self) {
        let mut locks = self.locks.lock();
        self.guard.take();
        if locks
            .get(&self.session_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.session_id);
        }
    }
}

/// Result of one turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnOutcome {
    /// Text to speak back
    pub spoken_output: String,
    /// Whether a handler ran and its mutations were committed
    pub session_updated: bool,
    /// Where the winning binding was registered, if any
    pub matched: Option<BindingScope>,
}

pub struct ConversationEngine {
    model: Arc<ConversationModel>,
    sessions: Arc<dyn SessionStore>,
    data_source: Arc<dyn DataSource>,
    projection: Arc<FieldProjection>,
    fallback: FallbackTemplates,
    call_timeout: Duration,
    turn_locks: TurnLocks,
}

impl ConversationEngine {
    /// Engine with default settings
    pub fn new(
        model: Arc<ConversationModel>,
        sessions: Arc<dyn SessionStore>,
        data_source: Arc<dyn DataSource>,
    ) -> Self {
        let defaults = Settings::default();
        Self::with_settings(model, sessions, data_source, &defaults.engine, &defaults.data_source)
    }

    pub fn with_settings(
        model: Arc<ConversationModel>,
        sessions: Arc<dyn SessionStore>,
        data_source: Arc<dyn DataSource>,
        engine: &EngineSettings,
        data: &DataSourceSettings,
    ) -> Self {
        Self {
            model,
            sessions,
            data_source,
            projection: Arc::new(data.projection()),
            fallback: engine.fallback.clone(),
            call_timeout: Duration::from_millis(data.timeout_ms),
            turn_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn model(&self) -> &Arc<ConversationModel> {
        &self.model
    }

    /// Current state of a session
    pub async fn session(&self, session_id: &str) -> Result<Option<Session>, EngineError> {
        Ok(self.sessions.get(session_id).await?)
    }

    /// Process one utterance for a session
    pub async fn handle_utterance(
        &self,
        session_id: &str,
        text: &str,
    ) -> Result<TurnOutcome, EngineError> {
        let _turn = self.begin_turn(session_id).await;

        let mut session = match self.sessions.get(session_id).await? {
            Some(session) => session,
            None => {
                tracing::info!(session_id, "Session created");
                Session::new(session_id)
            }
        };

        let resolver = IntentResolver::new(&self.model);
        let found = match resolver.resolve(text, &session) {
            Ok(found) => found,
            Err(no_match) => {
                let spoken_output = self.reprompt(&mut session, &no_match);
                self.finish(session).await?;
                return Ok(TurnOutcome {
                    spoken_output,
                    session_updated: false,
                    matched: None,
                });
            }
        };

        tracing::debug!(
            session_id,
            scope = %found.scope,
            template = found.binding.matcher.template(),
            slots = found.slots.len(),
            "Utterance resolved"
        );

        let handler = found.binding.handler.clone();
        let scope = found.scope;
        let mut response = Response::new(
            &session,
            found.slots,
            Arc::clone(&self.model),
            Arc::clone(&self.data_source),
            Arc::clone(&self.projection),
            self.call_timeout,
        );
        if let BindingScope::Goal(goal_id) = &scope {
            if response.complete_goal(goal_id) {
                tracing::debug!(session_id, goal = %goal_id, "Goal completed");
            }
        }

        let result = handler.run(&mut response).await;
        let effects = response.into_effects();

        if let Err(error) = result {
            tracing::warn!(session_id, scope = %scope, error = %error, "Handler failed");
            let spoken_output = if effects.speech.is_empty() {
                self.apology(&error)
            } else {
                effects.speech.join(" ")
            };
            self.finish(session).await?;
            return Ok(TurnOutcome {
                spoken_output,
                session_updated: false,
                matched: Some(scope),
            });
        }

        session.slot_values = effects.values;
        session.goal_stack = effects.goal_stack;

        let mut speech = effects.speech;
        let prompt = self.next_prompt(&mut session);
        if !prompt.is_empty() {
            speech.push(prompt);
        }

        self.finish(session).await?;

        Ok(TurnOutcome {
            spoken_output: speech.join(" "),
            session_updated: true,
            matched: Some(scope),
        })
    }

    /// Drop a session. Waits for a turn in progress on it to finish first.
    pub async fn end_session(&self, session_id: &str) -> Result<(), EngineError> {
        let _turn = self.begin_turn(session_id).await;
        self.sessions.delete(session_id).await?;
        tracing::info!(session_id, "Session ended");
        Ok(())
    }

    async fn begin_turn(&self, session_id: &str) -> TurnGuard<'_> {
        let lock = {
            let mut locks = self.turn_locks.lock();
            Arc::clone(locks.entry(session_id.to_string()).or_default())
        };
        TurnGuard {
            locks: &self.turn_locks,
            session_id: session_id.to_string(),
            guard: Some(lock.lock_owned().await),
        }
    }

    /// Prompt of the active goal, advancing its rotation
    fn next_prompt(&self, session: &mut Session) -> String {
        let Some(top) = session.goal_stack.top_mut() else {
            return String::new();
        };
        let prompt = self
            .model
            .goal(&top.id)
            .map(|goal| goal.prompt(top.prompts_issued).to_string())
            .unwrap_or_default();
        top.prompts_issued += 1;
        prompt
    }

    fn reprompt(&self, session: &mut Session, no_match: &NoMatchError) -> String {
        tracing::info!(
            session_id = %session.id,
            goal = ?no_match.active_goal,
            utterance = %no_match.utterance,
            "No binding matched"
        );

        if session.goal_stack.is_empty() {
            return self.fallback.not_understood.clone();
        }

        let prompt = self.next_prompt(session);
        if prompt.is_empty() {
            self.fallback.not_understood.clone()
        } else {
            format!("{} {}", self.fallback.reprompt_prefix, prompt)
        }
    }

    fn apology(&self, error: &TurnError) -> String {
        let fallback = &self.fallback;
        match error {
            TurnError::DataSource { operation, entity, .. } => FallbackTemplates::fill(
                &fallback.data_source_failure,
                &[("operation", operation.to_string().as_str()), ("entity", entity.as_str())],
            ),
            TurnError::Index(IndexError::NotListed { items }) => {
                FallbackTemplates::fill(&fallback.nothing_listed, &[("items", items.as_str())])
            }
            TurnError::Index(IndexError::OutOfRange { item, index, .. }) => FallbackTemplates::fill(
                &fallback.item_not_found,
                &[("item", item.as_str()), ("index", index.to_string().as_str())],
            ),
            TurnError::Index(IndexError::NotANumber { item, raw }) => FallbackTemplates::fill(
                &fallback.item_not_found,
                &[("item", item.as_str()), ("index", raw.as_str())],
            ),
            _ => fallback.technical_issue.clone(),
        }
    }

    async fn finish(&self, mut session: Session) -> Result<(), EngineError> {
        session.turn_count += 1;
        session.touch();
        self.sessions.put(session).await?;
        Ok(())
    }
}
