//! Core types for the intent/goal resolution engine
//!
//! This crate provides the leaf types used by every other crate:
//! - Slot values, records and the field projection contract
//! - Input type registry (NUMBER / LITERAL slot types)
//! - Session state and the per-session goal stack
//! - Error kinds
//! - Collaborator traits (data source, session store)

pub mod error;
pub mod input_type;
pub mod session;
pub mod traits;
pub mod value;

pub use error::{
    DataSourceError, GoalError, IndexError, NoMatchError, SessionStoreError, SlotCoercionError,
    TemplateError,
};
pub use input_type::{InputKind, InputType, InputTypeRegistry, InputTypeSpec};
pub use session::{GoalCatalog, GoalInstance, GoalStack, Session};
pub use traits::{DataSource, SessionStore};
pub use value::{field_text, render_value, FieldProjection, Record, SlotValue};
