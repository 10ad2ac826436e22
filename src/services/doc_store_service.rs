use async_trait::async_trait;
use serde_json::Value;

use crate::models::BackendError;

/// External store of document content.
///
/// Content is an opaque JSON value. `overwrite` replaces it wholesale, so
/// repeating a write leaves the store unchanged.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Current content of the document, `None` when it does not exist.
    async fn fetch(&self, document_id: &str) -> Result<Option<Value>, BackendError>;

    async fn overwrite(&self, document_id: &str, content: &Value) -> Result<(), BackendError>;

    async fn exists(&self, document_id: &str) -> Result<bool, BackendError> {
        Ok(self.fetch(document_id).await?.is_some())
    }
}
