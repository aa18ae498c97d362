use crate::AdapterError;
use async_trait::async_trait;
use serde_json::Value;

/// Runs a search body against an index and hands back the raw JSON response.
#[async_trait]
pub trait QueryExecutor {
    async fn search(&self, index: &str, body: &Value) -> Result<Value, AdapterError>;
}
