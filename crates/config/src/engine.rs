//! Engine configuration
//!
//! Fallback speech and compile limits used by the conversation engine.

use serde::{Deserialize, Serialize};

/// Conversation engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Upper bound on phrasings a single template may expand to
    #[serde(default = "default_max_expansions")]
    pub max_template_expansions: usize,

    /// Error/fallback responses
    #[serde(default)]
    pub fallback: FallbackTemplates,
}

fn default_max_expansions() -> usize {
    1024
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            max_template_expansions: default_max_expansions(),
            fallback: FallbackTemplates::default(),
        }
    }
}

/// Fallback speech
///
/// `{entity}`, `{operation}`, `{item}`, `{items}` and `{index}` are filled in
/// where the template applies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FallbackTemplates {
    /// Didn't understand, no goal active
    #[serde(default = "default_not_understood")]
    pub not_understood: String,
    /// Spoken before re-prompting the active goal
    #[serde(default = "default_reprompt_prefix")]
    pub reprompt_prefix: String,
    /// Data source call failed
    #[serde(default = "default_data_source_failure")]
    pub data_source_failure: String,
    /// List reference outside the listed range
    #[serde(default = "default_item_not_found")]
    pub item_not_found: String,
    /// List reference before anything was listed
    #[serde(default = "default_nothing_listed")]
    pub nothing_listed: String,
    /// Any other handler failure
    #[serde(default = "default_technical_issue")]
    pub technical_issue: String,
}

fn default_not_understood() -> String {
    "Sorry, I did not understand that.".to_string()
}
fn default_reprompt_prefix() -> String {
    "Sorry, I did not get that.".to_string()
}
fn default_data_source_failure() -> String {
    "Sorry, I was unable to {operation} {entity} right now.".to_string()
}
fn default_item_not_found() -> String {
    "Sorry, I could not find {item} {index}.".to_string()
}
fn default_nothing_listed() -> String {
    "Sorry, I do not have any {items} for you yet.".to_string()
}
fn default_technical_issue() -> String {
    "Sorry, something went wrong. Please try again.".to_string()
}

impl Default for FallbackTemplates {
    fn default() -> Self {
        Self {
            not_understood: default_not_understood(),
            reprompt_prefix: default_reprompt_prefix(),
            data_source_failure: default_data_source_failure(),
            item_not_found: default_item_not_found(),
            nothing_listed: default_nothing_listed(),
            technical_issue: default_technical_issue(),
        }
    }
}

impl FallbackTemplates {
    /// Fill `{name}` placeholders in a template
    pub fn fill(template: &str, values: &[(&str, &str)]) -> String {
        values.iter().fold(template.to_string(), |text, (key, value)| {
            text.replace(&format!("{{{}}}", key), value)
        })
    }
}
