//! Intent/goal resolution engine
//!
//! Features:
//! - Template compilation (optional segments, alternatives, typed slots)
//! - Per-session goal stack with rotating prompts
//! - Deterministic resolution: active goal first, then global bindings
//! - Turn-scoped response context with suspending data-source calls
//! - Numbered results lists
//!
//! ```ignore
//! let model = ConversationModel::builder()
//!     .add_input_type(InputType::literal("name", ["Jeff Douglas"]))
//!     .respond_to(["{to|} create a {new|} lead"], Handler::sync(|r| {
//!         r.say("OK, let's create a new lead.");
//!         r.add_goal("createLeadName")
//!     }))
//!     .define_goal(
//!         GoalSpec::new("createLeadName")
//!             .prompt("What is the person's first and last name?")
//!             .respond_to(["[[name]]"], Handler::sync(|r| {
//!                 r.say("Got it. the name is, [[name]].");
//!                 Ok(())
//!             })),
//!     )
//!     .build()?;
//!
//! let engine = ConversationEngine::new(Arc::new(model), sessions, data_source);
//! let turn = engine.handle_utterance("session-1", "create a new lead").await?;
//! ```

pub mod engine;
pub mod list;
pub mod model;
pub mod pattern;
pub mod resolver;
pub mod response;
pub mod store;

pub use engine::{ConversationEngine, TurnOutcome};
pub use list::ResultsList;
pub use model::{
    Binding, BindingScope, ConversationModel, GoalDefinition, GoalSpec, Handler, HandlerResult,
    ModelBuilder, Responder,
};
pub use pattern::{has_words, normalize, CompiledMatcher};
pub use resolver::{IntentResolver, MatchResult};
pub use response::{DataOperation, Response};
pub use store::{InMemoryDataSource, InMemorySessionStore};

use thiserror::Error;
use voice_intent_core::{DataSourceError, GoalError, IndexError, SessionStoreError, TemplateError};

/// Registration errors, fatal at startup
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Goal(#[from] GoalError),
}

/// Why a handler stopped early. Turned into speech by the engine.
#[derive(Error, Debug)]
pub enum TurnError {
    #[error("unable to {operation} {entity}: {source}")]
    DataSource {
        operation: DataOperation,
        entity: String,
        source: DataSourceError,
    },

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    Goal(#[from] GoalError),

    #[error("slot `{0}` has no value")]
    MissingSlot(String),

    #[error("handler failed: {0}")]
    Handler(String),
}

/// Errors `handle_utterance` returns. Everything else becomes speech.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Session store error: {0}")]
    SessionStore(#[from] SessionStoreError),
}
