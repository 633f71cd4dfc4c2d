//! The database client seen by the handlers.

use crate::domain::BackendError;
use async_trait::async_trait;
use serde_json::Value as JsonValue;

/// Async insert/query operations of the backing time-series database.
///
/// Implementations own their connection pooling, timeouts and retries; the
/// handlers await each call once and encode whatever comes back.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn insert(&self, payload: JsonValue) -> Result<JsonValue, BackendError>;

    async fn query(&self, query: &str) -> Result<JsonValue, BackendError>;

    /// Static database description served by `/db-info`.
    fn db_info(&self) -> JsonValue;
}
