use serde_json::Value;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::models::SessionError;
use crate::services::doc_store_service::DocumentStore;

/// Best-effort writer of the latest edit payload to the document store.
///
/// Every call spawns an independent overwrite. Writes are neither ordered
/// nor retried: two edits persisted back to back may complete in either
/// order, so the store can briefly hold an edit older than the last one
/// relayed. A failed write is logged and otherwise ignored, while the edit
/// it carried has already reached the live peers.
#[derive(Clone)]
pub struct PersistenceCoordinator {
    store: Arc<dyn DocumentStore>,
}

impl PersistenceCoordinator {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub fn persist(&self, document_id: &str, payload: Value) -> JoinHandle<()> {
        let store = self.store.clone();
        let document_id = document_id.to_string();
        tokio::spawn(async move {
            match store.overwrite(&document_id, &payload).await {
                Ok(()) => debug!("Persisted document {}", document_id),
                Err(e) => {
                    let failure = SessionError::PersistenceFailure(e.to_string());
                    error!("{} (document {})", failure, document_id);
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryDocumentStore;
    use crate::models::BackendError;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Store whose writes take `delay_ms` from the payload and that logs
    /// payloads in completion order.
    #[derive(Default)]
    struct SlowStore {
        content: Mutex<Option<Value>>,
        completed: Mutex<Vec<Value>>,
    }

    #[async_trait]
    impl DocumentStore for SlowStore {
        async fn fetch(&self, _document_id: &str) -> Result<Option<Value>, BackendError> {
            Ok(self.content.lock().unwrap().clone())
        }

        async fn overwrite(&self, _document_id: &str, content: &Value) -> Result<(), BackendError> {
            let delay = content["delay_ms"].as_u64().unwrap_or(0);
            tokio::time::sleep(Duration::from_millis(delay)).await;
            *self.content.lock().unwrap() = Some(content.clone());
            self.completed.lock().unwrap().push(content.clone());
            Ok(())
        }
    }

    #[tokio::test]
    async fn last_completed_write_wins() {
        let store = Arc::new(SlowStore::default());
        let coordinator = PersistenceCoordinator::new(store.clone());

        // p1 is issued first but completes after p2
        let p1 = coordinator.persist("doc1", json!({"value": "p1", "delay_ms": 50}));
        let p2 = coordinator.persist("doc1", json!({"value": "p2", "delay_ms": 0}));
        p1.await.unwrap();
        p2.await.unwrap();

        let completed = store.completed.lock().unwrap().clone();
        assert_eq!(completed.len(), 2);
        assert_eq!(completed[1]["value"], "p1");
        assert_eq!(store.content.lock().unwrap().clone(), Some(completed[1].clone()));
    }

    #[tokio::test]
    async fn replaying_a_write_is_harmless() {
        let store = Arc::new(MemoryDocumentStore::new());
        store.create("doc1", json!(null));
        let coordinator = PersistenceCoordinator::new(store.clone());

        let first = coordinator.persist("doc1", json!({"ops": [{"insert": "a"}]}));
        let second = coordinator.persist("doc1", json!({"ops": [{"insert": "a"}]}));
        first.await.unwrap();
        second.await.unwrap();

        assert_eq!(store.content("doc1"), Some(json!({"ops": [{"insert": "a"}]})));
        assert_eq!(store.writes(), 2);
    }

    #[tokio::test]
    async fn failures_are_swallowed() {
        let store = Arc::new(MemoryDocumentStore::new());
        store.create("doc1", json!("old"));
        store.set_fail_writes(true);
        let coordinator = PersistenceCoordinator::new(store.clone());

        // the task completes normally even though the write failed
        coordinator.persist("doc1", json!("new")).await.unwrap();
        coordinator.persist("missing", json!("new")).await.unwrap();
        assert_eq!(store.content("doc1"), Some(json!("old")));
    }
}
