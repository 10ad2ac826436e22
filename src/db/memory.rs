//! In-process backends for the document store and user directory.
//!
//! Used when no database is configured and by the test suites. Nothing
//! here survives a restart.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::models::{BackendError, UserProfile};
use crate::services::doc_store_service::DocumentStore;
use crate::services::user_service::UserDirectory;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Default)]
pub struct MemoryDocumentStore {
    docs: Mutex<HashMap<String, Value>>,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a document with the given initial content.
    pub fn create(&self, document_id: &str, content: Value) {
        lock(&self.docs).insert(document_id.to_string(), content);
    }

    pub fn content(&self, document_id: &str) -> Option<Value> {
        lock(&self.docs).get(document_id).cloned()
    }

    /// Make every subsequent overwrite fail.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful overwrites.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn fetch(&self, document_id: &str) -> Result<Option<Value>, BackendError> {
        Ok(self.content(document_id))
    }

    async fn overwrite(&self, document_id: &str, content: &Value) -> Result<(), BackendError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(BackendError::Unavailable("store rejected write".to_string()));
        }
        let mut docs = lock(&self.docs);
        match docs.get_mut(document_id) {
            Some(slot) => {
                *slot = content.clone();
                self.writes.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
            None => Err(BackendError::MissingDocument(document_id.to_string())),
        }
    }
}

#[derive(Default)]
pub struct MemoryUserDirectory {
    users: Mutex<HashMap<String, UserProfile>>,
    lookups: AtomicUsize,
}

impl MemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, user_id: &str, username: &str, email: &str) {
        lock(&self.users).insert(
            user_id.to_string(),
            UserProfile {
                username: username.to_string(),
                email: email.to_string(),
            },
        );
    }

    pub fn remove(&self, user_id: &str) {
        lock(&self.users).remove(user_id);
    }

    /// Number of lookups served, hits and misses alike.
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UserDirectory for MemoryUserDirectory {
    async fn find_user(&self, user_id: &str) -> Result<Option<UserProfile>, BackendError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(lock(&self.users).get(user_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn overwrite_replaces_content_and_is_idempotent() {
        let store = MemoryDocumentStore::new();
        store.create("doc1", json!({"ops": []}));

        store.overwrite("doc1", &json!("p1")).await.unwrap();
        store.overwrite("doc1", &json!("p2")).await.unwrap();
        store.overwrite("doc1", &json!("p2")).await.unwrap();

        assert_eq!(store.fetch("doc1").await.unwrap(), Some(json!("p2")));
        assert_eq!(store.writes(), 3);
    }

    #[tokio::test]
    async fn overwrite_of_unknown_document_fails() {
        let store = MemoryDocumentStore::new();
        assert!(!store.exists("ghost").await.unwrap());
        assert!(matches!(
            store.overwrite("ghost", &json!(1)).await,
            Err(BackendError::MissingDocument(_))
        ));
    }
}
