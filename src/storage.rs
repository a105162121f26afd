//! Document store seam.
//!
//! The core only needs four operations from its store: get, merge-upsert,
//! delete, and bulk delete by field value. Paths are hierarchical strings
//! (`users/{userId}`, `emailVerificationTokens/{secret}`). Backends
//! implement [`DocumentStore`]; the in-memory implementation here backs the
//! tests and the CLI binary.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::config::{TOKEN_COLLECTION, USER_COLLECTION, VERIFICATION_COLLECTION};

/// Uniform error type for all store backends.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A merge write was given a non-object record.
    #[error("record is not a JSON object")]
    NotAnObject,
    /// The backend itself failed.
    #[error("backend error: {0}")]
    Backend(String),
}

/// Merge-upsert document store.
///
/// `set` must be non-destructive to fields absent from the given record, and
/// must overwrite fields that are present — including explicit nulls, which
/// is how a previously set field gets reset. Merge writes are idempotent on
/// retry.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetches a document, or `None` when the path holds nothing.
    async fn get(&self, path: &str) -> Result<Option<Value>, StoreError>;

    /// Merge-upserts a document at a path.
    async fn set(&self, path: &str, record: Value) -> Result<(), StoreError>;

    /// Deletes a document. Deleting a missing document is not an error.
    async fn delete(&self, path: &str) -> Result<(), StoreError>;

    /// Deletes every document in a top-level collection whose `field` equals
    /// `value`. Used to clean up all outstanding tokens for one account.
    async fn delete_where(&self, collection: &str, field: &str, value: &str)
        -> Result<(), StoreError>;
}

/// Path of a `users/{userId}` document.
pub fn user_path(user_id: &str) -> String {
    format!("{USER_COLLECTION}/{user_id}")
}

/// Path of the per-account verification attempt document.
pub fn attempt_path(user_id: &str) -> String {
    format!("{USER_COLLECTION}/{user_id}/{VERIFICATION_COLLECTION}/{user_id}")
}

/// Path of a token document; the secret is the document key.
pub fn token_path(secret: &str) -> String {
    format!("{TOKEN_COLLECTION}/{secret}")
}

/// In-memory [`DocumentStore`] with merge semantics.
#[derive(Default)]
pub struct MemoryStore {
    documents: RwLock<HashMap<String, Value>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Lists the paths of all stored documents under a path prefix.
    /// Inspection helper for tests and the CLI; not part of the store seam.
    pub async fn paths_with_prefix(&self, prefix: &str) -> Vec<String> {
        let documents = self.documents.read().await;
        let mut paths: Vec<String> = documents
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        paths.sort();
        paths
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, path: &str) -> Result<Option<Value>, StoreError> {
        let documents = self.documents.read().await;
        Ok(documents.get(path).cloned())
    }

    async fn set(&self, path: &str, record: Value) -> Result<(), StoreError> {
        let Value::Object(incoming) = record else {
            return Err(StoreError::NotAnObject);
        };
        let mut documents = self.documents.write().await;
        match documents.get_mut(path) {
            Some(Value::Object(existing)) => {
                for (key, value) in incoming {
                    existing.insert(key, value);
                }
            }
            _ => {
                documents.insert(path.to_string(), Value::Object(incoming));
            }
        }
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<(), StoreError> {
        let mut documents = self.documents.write().await;
        documents.remove(path);
        Ok(())
    }

    async fn delete_where(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Result<(), StoreError> {
        let prefix = format!("{collection}/");
        let mut documents = self.documents.write().await;
        documents.retain(|path, record| {
            let in_collection = path.starts_with(&prefix);
            let matches = in_collection
                && record
                    .get(field)
                    .and_then(Value::as_str)
                    .is_some_and(|v| v == value);
            !matches
        });
        Ok(())
    }
}
