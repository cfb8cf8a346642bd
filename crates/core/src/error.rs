//! Error kinds shared by every layer of the engine
//!
//! Only `TemplateError` is fatal, and only at startup. Everything else is
//! either absorbed by the resolver or turned into speech by the engine.

use thiserror::Error;

/// Malformed template or reference to an unregistered input type.
///
/// Raised while a conversation model is being built; the script author has
/// to fix the template.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("template `{template}` matches no words")]
    Empty { template: String },

    #[error("template `{template}` references unknown slot type `{slot}`")]
    UnknownSlot { template: String, slot: String },

    #[error("template `{template}` has an unterminated `{{` group")]
    UnterminatedGroup { template: String },

    #[error("template `{template}` has an unterminated `[[` slot")]
    UnterminatedSlot { template: String },

    #[error("template `{template}` is malformed at byte {offset}")]
    Malformed { template: String, offset: usize },

    #[error("template `{template}` expands to more than {limit} phrasings")]
    TooManyExpansions { template: String, limit: usize },

    #[error("template `{template}` could not be compiled: {message}")]
    Compile { template: String, message: String },
}

/// Extracted text does not satisfy its input type.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SlotCoercionError {
    #[error("slot `{slot}` has no registered input type")]
    UnknownType { slot: String },

    #[error("slot `{slot}` expects a number, got `{raw}`")]
    NotANumber { slot: String, raw: String },

    #[error("slot `{slot}` does not accept `{raw}`")]
    NotInClosedSet { slot: String, raw: String },
}

/// No binding matched at any level.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("no binding matched `{utterance}`")]
pub struct NoMatchError {
    pub utterance: String,
    /// Goal that was active when resolution failed
    pub active_goal: Option<String>,
}

/// Failure reported by the external data source.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DataSourceError {
    #[error("data source timed out after {0}ms")]
    Timeout(u64),

    #[error("unknown entity type: {0}")]
    UnknownEntity(String),

    #[error("data source unavailable: {0}")]
    Unavailable(String),

    #[error("data source rejected the request: {0}")]
    Rejected(String),
}

/// A numeric list reference could not be resolved.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IndexError {
    #[error("{item} {index} is out of range 1..={len}")]
    OutOfRange { item: String, index: i64, len: usize },

    #[error("no {items} have been listed in this session")]
    NotListed { items: String },

    #[error("`{raw}` is not a valid {item} number")]
    NotANumber { item: String, raw: String },
}

/// Goal stack misuse.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GoalError {
    #[error("goal `{0}` is not defined")]
    Unknown(String),

    #[error("goal `{0}` is defined twice")]
    Duplicate(String),
}

/// Failure of the external session key-value store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionStoreError {
    #[error("session store unavailable: {0}")]
    Unavailable(String),

    #[error("session `{id}` could not be decoded: {message}")]
    Corrupt { id: String, message: String },
}
