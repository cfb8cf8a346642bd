//! External data source interface

use async_trait::async_trait;

use crate::error::DataSourceError;
use crate::value::Record;

/// Record store reached from handlers (a CRM connector in production).
///
/// Entity and field names arrive with the projection marker already
/// stripped (`Lead`, not `Lead*`).
///
/// # Example
///
/// ```ignore
/// let leads = source.load("Lead", None, None, Some("CreatedDate = TODAY")).await?;
/// for lead in &leads {
///     println!("{} from {}", lead["Name"], lead["Company"]);
/// }
/// ```
#[async_trait]
pub trait DataSource: Send + Sync + 'static {
    /// Full-text search over an entity type, best match first
    async fn search(&self, entity_type: &str, term: &str) -> Result<Vec<Record>, DataSourceError>;

    /// Load records by field equality and/or an opaque raw filter
    async fn load(
        &self,
        entity_type: &str,
        filter_field: Option<&str>,
        filter_value: Option<&str>,
        raw_filter: Option<&str>,
    ) -> Result<Vec<Record>, DataSourceError>;

    /// Create a record and return it as stored
    async fn store(&self, entity_type: &str, fields: Record) -> Result<Record, DataSourceError>;

    /// Name for logging
    fn name(&self) -> &str;
}
