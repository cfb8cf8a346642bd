//! Session key-value store interface

use async_trait::async_trait;

use crate::error::SessionStoreError;
use crate::session::Session;

/// Key-value persistence of sessions, owned by the transport layer.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Fetch a session by id
    async fn get(&self, id: &str) -> Result<Option<Session>, SessionStoreError>;

    /// Insert or replace a session
    async fn put(&self, session: Session) -> Result<(), SessionStoreError>;

    /// Drop a session
    async fn delete(&self, id: &str) -> Result<(), SessionStoreError>;

    /// List stored session ids
    async fn list_ids(&self) -> Result<Vec<String>, SessionStoreError>;

    /// Whether sessions are shared between processes
    fn is_distributed(&self) -> bool;
}
