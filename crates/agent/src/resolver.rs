//! Intent Resolver
//!
//! Picks the binding an utterance triggers. The active goal's bindings are
//! tried first, in declaration order, then the global bindings. Bindings of
//! suspended goals are never tried. A candidate whose captures fail type
//! coercion is skipped and resolution falls through.

use std::collections::HashMap;

use voice_intent_core::{NoMatchError, Session, SlotValue};

use crate::model::{Binding, BindingScope, ConversationModel};
use crate::pattern::{has_words, normalize};

/// The winning binding and its coerced slot values
#[derive(Debug, Clone)]
pub struct MatchResult<'m> {
    pub binding: &'m Binding,
    pub scope: BindingScope,
    pub slots: HashMap<String, SlotValue>,
}

/// Resolves utterances against one conversation model
#[derive(Debug, Clone, Copy)]
pub struct IntentResolver<'m> {
    model: &'m ConversationModel,
}

impl<'m> IntentResolver<'m> {
    pub fn new(model: &'m ConversationModel) -> Self {
        Self { model }
    }

    pub fn resolve(
        &self,
        utterance: &str,
        session: &Session,
    ) -> Result<MatchResult<'m>, NoMatchError> {
        let normalized = normalize(utterance);
        let active_goal = session.active_goal();

        let no_match = || NoMatchError {
            utterance: utterance.to_string(),
            active_goal: active_goal.map(str::to_string),
        };

        if !has_words(&normalized) {
            return Err(no_match());
        }

        if let Some(goal_id) = active_goal {
            match self.model.goal(goal_id) {
                Some(goal) => {
                    let scope = BindingScope::Goal(goal_id.to_string());
                    if let Some(found) = self.first_match(&goal.bindings, &normalized, &scope) {
                        return Ok(found);
                    }
                }
                None => {
                    tracing::warn!(
                        session_id = %session.id,
                        goal = goal_id,
                        "Active goal is not registered, trying global bindings"
                    );
                }
            }
        }

        self.first_match(self.model.global_bindings(), &normalized, &BindingScope::Global)
            .ok_or_else(no_match)
    }

    fn first_match(
        &self,
        bindings: &'m [Binding],
        normalized: &str,
        scope: &BindingScope,
    ) -> Option<MatchResult<'m>> {
        bindings.iter().find_map(|binding| {
            binding.matcher.candidates(normalized).find_map(|raw| {
                let mut slots = HashMap::with_capacity(raw.len());
                for (name, text) in raw {
                    match self.model.input_types().coerce(&name, &text) {
                        Ok(value) => {
                            slots.insert(name, value);
                        }
                        Err(e) => {
                            tracing::debug!(
                                template = binding.matcher.template(),
                                error = %e,
                                "Candidate rejected"
                            );
                            return None;
                        }
                    }
                }
                Some(MatchResult {
                    binding,
                    scope: scope.clone(),
                    slots,
                })
            })
        })
    }
}
