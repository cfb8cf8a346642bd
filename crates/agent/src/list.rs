//! Results list helper
//!
//! Keeps a list of records in a session slot, reads it out as a numbered
//! list and resolves a later "article 2" back to the record.

use voice_intent_core::{field_text, IndexError, Record, SlotValue};

use crate::response::Response;
use crate::TurnError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultsList {
    /// Session slot holding the records
    pub slot: String,
    /// Spoken name of one item ("article")
    pub item_name: String,
    /// Spoken name of several items ("articles")
    pub items_name: String,
    /// Field read out for each item
    pub title_field: String,
}

impl ResultsList {
    pub fn new(
        slot: impl Into<String>,
        item_name: impl Into<String>,
        items_name: impl Into<String>,
        title_field: impl Into<String>,
    ) -> Self {
        Self {
            slot: slot.into(),
            item_name: item_name.into(),
            items_name: items_name.into(),
            title_field: title_field.into(),
        }
    }

    /// Goal pushed while the user is browsing this list
    pub fn interaction_goal(&self) -> String {
        format!("interactionWith{}", self.slot)
    }

    /// Store the records, read them out and start the interaction goal
    pub fn respond_with_items(
        &self,
        response: &mut Response,
        items: Vec<Record>,
    ) -> Result<(), TurnError> {
        let count = items.len();
        let noun = if count == 1 { &self.item_name } else { &self.items_name };

        let mut speech = format!("I found {} {}.", count, noun);
        for (i, item) in items.iter().enumerate() {
            speech.push_str(&format!(
                " {} {}, {}.",
                capitalize(&self.item_name),
                i + 1,
                field_text(item, &self.title_field)
            ));
        }

        response.set(
            self.slot.clone(),
            SlotValue::Array(items.into_iter().map(SlotValue::Object).collect()),
        );
        response.say(&speech);
        response.add_goal(&self.interaction_goal())
    }

    /// Records currently stored for this list
    pub fn items(&self, response: &Response) -> Result<Vec<Record>, IndexError> {
        let stored = response
            .get(&self.slot)
            .and_then(SlotValue::as_array)
            .ok_or_else(|| IndexError::NotListed {
                items: self.items_name.clone(),
            })?;

        Ok(stored
            .iter()
            .filter_map(|v| v.as_object().cloned())
            .collect())
    }

    /// Record for a 1-based position
    pub fn get_item_from_results(
        &self,
        response: &Response,
        index: i64,
    ) -> Result<Record, IndexError> {
        let items = self.items(response)?;
        if index < 1 || index as usize > items.len() {
            return Err(IndexError::OutOfRange {
                item: self.item_name.clone(),
                index,
                len: items.len(),
            });
        }
        Ok(items[(index - 1) as usize].clone())
    }

    /// Record for the position held in a NUMBER slot
    pub fn item_at_slot(&self, response: &Response, slot: &str) -> Result<Record, IndexError> {
        let index = response.get_i64(slot).ok_or_else(|| IndexError::NotANumber {
            item: self.item_name.clone(),
            raw: response.get_str(slot).unwrap_or_default(),
        })?;
        self.get_item_from_results(response, index)
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
