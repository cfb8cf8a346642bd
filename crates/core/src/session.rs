//! Session state: slot values and the goal stack

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::GoalError;
use crate::value::SlotValue;

/// Anything that knows which goal ids were registered at startup.
pub trait GoalCatalog {
    fn has_goal(&self, goal_id: &str) -> bool;
}

/// A live goal on a session's stack
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalInstance {
    /// Registered goal id
    pub id: String,
    /// Number of prompt cycles issued for this instance
    #[serde(default)]
    pub prompts_issued: usize,
}

impl GoalInstance {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            prompts_issued: 0,
        }
    }
}

/// Per-session stack of pending goals. The last entry is active.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalStack {
    entries: Vec<GoalInstance>,
}

impl GoalStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a registered goal; the previous top is suspended beneath it
    pub fn push(&mut self, catalog: &impl GoalCatalog, goal_id: &str) -> Result<(), GoalError> {
        if !catalog.has_goal(goal_id) {
            return Err(GoalError::Unknown(goal_id.to_string()));
        }
        self.entries.push(GoalInstance::new(goal_id));
        Ok(())
    }

    pub fn pop(&mut self) -> Option<GoalInstance> {
        self.entries.pop()
    }

    pub fn top(&self) -> Option<&GoalInstance> {
        self.entries.last()
    }

    pub fn top_mut(&mut self) -> Option<&mut GoalInstance> {
        self.entries.last_mut()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Goal ids from bottom to top
    pub fn ids(&self) -> Vec<&str> {
        self.entries.iter().map(|g| g.id.as_str()).collect()
    }
}

/// Conversation state for one session id
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    /// Values persisted across turns
    #[serde(default)]
    pub slot_values: HashMap<String, SlotValue>,
    #[serde(default)]
    pub goal_stack: GoalStack,
    /// Completed turns
    #[serde(default)]
    pub turn_count: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn new(id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            slot_values: HashMap::new(),
            goal_stack: GoalStack::new(),
            turn_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn active_goal(&self) -> Option<&str> {
        self.goal_stack.top().map(|g| g.id.as_str())
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
