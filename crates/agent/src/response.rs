//! Response Context
//!
//! The turn-scoped object a handler works on. Every mutation lands on a
//! working copy of the session; the engine commits the copy only when the
//! handler returns `Ok`. Data-source calls take `&mut self`, so a handler can
//! have at most one in flight and they complete in issue order.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use voice_intent_core::{
    render_value, DataSource, DataSourceError, FieldProjection, GoalStack, Record, Session,
    SlotValue,
};

use crate::model::ConversationModel;
use crate::TurnError;

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[\[\s*([\w.]+)\s*\]\]|\{\{\s*([\w.]+)\s*\}\}").expect("placeholder pattern")
});

/// Data-source operation, used to word apologies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataOperation {
    Search,
    Load,
    Store,
}

impl fmt::Display for DataOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DataOperation::Search => "search",
            DataOperation::Load => "look up",
            DataOperation::Store => "save",
        })
    }
}

/// What a finished handler leaves behind
#[derive(Debug)]
pub(crate) struct TurnEffects {
    pub speech: Vec<String>,
    pub values: HashMap<String, SlotValue>,
    pub goal_stack: GoalStack,
}

pub struct Response {
    session_id: String,
    model: Arc<ConversationModel>,
    data_source: Arc<dyn DataSource>,
    projection: Arc<FieldProjection>,
    call_timeout: Duration,
    /// Values extracted from this turn's utterance
    turn_slots: HashMap<String, SlotValue>,
    /// Working copy of the session values
    values: HashMap<String, SlotValue>,
    goal_stack: GoalStack,
    speech: Vec<String>,
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("session_id", &self.session_id)
            .field("data_source", &self.data_source.name())
            .field("turn_slots", &self.turn_slots)
            .field("goals", &self.goal_stack.ids())
            .field("speech", &self.speech)
            .finish()
    }
}

impl Response {
    pub(crate) fn new(
        session: &Session,
        turn_slots: HashMap<String, SlotValue>,
        model: Arc<ConversationModel>,
        data_source: Arc<dyn DataSource>,
        projection: Arc<FieldProjection>,
        call_timeout: Duration,
    ) -> Self {
        Self {
            session_id: session.id.clone(),
            model,
            data_source,
            projection,
            call_timeout,
            turn_slots,
            values: session.slot_values.clone(),
            goal_stack: session.goal_stack.clone(),
            speech: Vec::new(),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Append to the speech buffer.
    ///
    /// `[[slot]]` is replaced with this turn's value (or the session value),
    /// `{{slot}}` with the session value (or this turn's value). Runs of
    /// whitespace collapse to one space.
    pub fn say(&mut self, text: &str) {
        let filled = PLACEHOLDER.replace_all(text, |caps: &Captures| {
            let value = match (caps.get(1), caps.get(2)) {
                (Some(name), _) => self
                    .turn_slots
                    .get(name.as_str())
                    .or_else(|| self.values.get(name.as_str())),
                (None, Some(name)) => self
                    .values
                    .get(name.as_str())
                    .or_else(|| self.turn_slots.get(name.as_str())),
                (None, None) => None,
            };
            value.map(render_value).unwrap_or_default()
        });

        let fragment = filled.split_whitespace().collect::<Vec<_>>().join(" ");
        if !fragment.is_empty() {
            self.speech.push(fragment);
        }
    }

    /// Speech buffered so far
    pub fn spoken(&self) -> String {
        self.speech.join(" ")
    }

    /// Value of a slot: this turn's extraction first, then the session
    pub fn get(&self, slot: &str) -> Option<&SlotValue> {
        self.turn_slots.get(slot).or_else(|| self.values.get(slot))
    }

    /// Slot value rendered as text
    pub fn get_str(&self, slot: &str) -> Option<String> {
        self.get(slot).map(render_value)
    }

    pub fn require_str(&self, slot: &str) -> Result<String, TurnError> {
        self.get_str(slot)
            .ok_or_else(|| TurnError::MissingSlot(slot.to_string()))
    }

    /// Slot value as an integer; whole decimals count
    pub fn get_i64(&self, slot: &str) -> Option<i64> {
        let value = self.get(slot)?;
        value
            .as_i64()
            .or_else(|| value.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
    }

    /// Persist a value in the session
    pub fn set(&mut self, slot: impl Into<String>, value: impl Into<SlotValue>) {
        self.values.insert(slot.into(), value.into());
    }

    /// Push a goal; the current goal is suspended beneath it
    pub fn add_goal(&mut self, goal_id: &str) -> Result<(), TurnError> {
        self.goal_stack.push(self.model.as_ref(), goal_id)?;
        tracing::debug!(session_id = %self.session_id, goal = goal_id, "Goal added");
        Ok(())
    }

    pub fn active_goal(&self) -> Option<&str> {
        self.goal_stack.top().map(|g| g.id.as_str())
    }

    /// Drop the goal whose binding is being handled. Goals the handler adds
    /// afterwards go on top of the goal that was beneath it.
    pub(crate) fn complete_goal(&mut self, goal_id: &str) -> bool {
        if self.active_goal() != Some(goal_id) {
            return false;
        }
        self.goal_stack.pop();
        true
    }

    /// Full-text search on an entity
    pub async fn search(&mut self, entity: &str, term: &str) -> Result<Vec<Record>, TurnError> {
        let entity_name = self.projection.strip(entity).into_owned();
        let source = Arc::clone(&self.data_source);
        let records = self
            .call(DataOperation::Search, &entity_name, source.search(&entity_name, term))
            .await?;
        Ok(self.project_all(entity, records))
    }

    /// Load records by field equality or by a raw filter understood by the source
    pub async fn load(
        &mut self,
        entity: &str,
        filter_field: Option<&str>,
        filter_value: Option<&str>,
        raw_filter: Option<&str>,
    ) -> Result<Vec<Record>, TurnError> {
        let entity_name = self.projection.strip(entity).into_owned();
        let field = filter_field.map(|f| self.projection.strip(f).into_owned());
        let source = Arc::clone(&self.data_source);
        let records = self
            .call(
                DataOperation::Load,
                &entity_name,
                source.load(&entity_name, field.as_deref(), filter_value, raw_filter),
            )
            .await?;
        Ok(self.project_all(entity, records))
    }

    /// Create a record; field names may carry the marker
    pub async fn store(&mut self, entity: &str, fields: Record) -> Result<Record, TurnError> {
        let entity_name = self.projection.strip(entity).into_owned();
        let fields = self.projection.strip_fields(&fields);
        let source = Arc::clone(&self.data_source);
        self.call(DataOperation::Store, &entity_name, source.store(&entity_name, fields))
            .await
    }

    async fn call<T>(
        &mut self,
        operation: DataOperation,
        entity: &str,
        request: impl std::future::Future<Output = Result<T, DataSourceError>>,
    ) -> Result<T, TurnError> {
        tracing::debug!(
            session_id = %self.session_id,
            source = self.data_source.name(),
            entity,
            operation = %operation,
            "Data source call"
        );

        let result = match tokio::time::timeout(self.call_timeout, request).await {
            Ok(result) => result,
            Err(_) => Err(DataSourceError::Timeout(self.call_timeout.as_millis() as u64)),
        };

        result.map_err(|source| {
            tracing::warn!(
                session_id = %self.session_id,
                entity,
                operation = %operation,
                error = %source,
                "Data source call failed"
            );
            TurnError::DataSource {
                operation,
                entity: entity.to_string(),
                source,
            }
        })
    }

    fn project_all(&self, entity: &str, records: Vec<Record>) -> Vec<Record> {
        records
            .iter()
            .map(|r| self.projection.project(entity, r))
            .collect()
    }

    pub(crate) fn into_effects(self) -> TurnEffects {
        TurnEffects {
            speech: self.speech,
            values: self.values,
            goal_stack: self.goal_stack,
        }
    }
}
