//! Collaborator traits
//!
//! The engine talks to the outside world through two seams:
//!
//! ```text
//! DataSource:   search / load / store records (suspending calls)
//! SessionStore: key-value persistence of Session state
//! ```
//!
//! Both are async and object safe so they can be swapped for mocks in tests.

mod data_source;
mod session_store;

pub use data_source::DataSource;
pub use session_store::SessionStore;
