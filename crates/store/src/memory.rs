//! In-process `DocumentStore` backend.
//!
//! Implements the full store contract over `tokio::sync::watch` channels:
//! subscribers hold the current snapshot immediately and receive a full
//! replacement on every relevant mutation. Transactions apply under a single
//! lock and notifications go out only after the whole operation set has
//! landed, so partial application is never observable.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{watch, Mutex};
use tracing::debug;
use uuid::Uuid;

use crate::path::{CollectionPath, DocumentPath};
use crate::{CollectionSnapshot, Document, DocumentSnapshot, DocumentStore, StoreError, WriteOp};

#[derive(Default)]
struct MemoryState {
    documents: BTreeMap<String, Value>,
    collection_watchers: HashMap<String, watch::Sender<CollectionSnapshot>>,
    document_watchers: HashMap<String, watch::Sender<DocumentSnapshot>>,
}

impl MemoryState {
    fn collection_snapshot(&self, collection: &str) -> CollectionSnapshot {
        let prefix = format!("{collection}/");
        let documents = self
            .documents
            .range(prefix.clone()..)
            .take_while(|(path, _)| path.starts_with(&prefix))
            .filter(|(path, _)| !path[prefix.len()..].contains('/'))
            .map(|(path, data)| Document {
                id: path[prefix.len()..].to_string(),
                data: data.clone(),
            })
            .collect();
        CollectionSnapshot { documents }
    }

    fn document_snapshot(&self, path: &str) -> DocumentSnapshot {
        DocumentSnapshot {
            data: self.documents.get(path).cloned(),
        }
    }

    fn apply(&mut self, op: &WriteOp) {
        match op {
            WriteOp::Set { path, data } => {
                self.documents.insert(path.as_str().to_string(), data.clone());
            }
            WriteOp::Merge { path, data } => {
                let entry = self
                    .documents
                    .entry(path.as_str().to_string())
                    .or_insert_with(|| Value::Object(serde_json::Map::new()));
                merge_fields(entry, data);
            }
            WriteOp::Delete { path } => {
                self.documents.remove(path.as_str());
            }
        }
    }

    fn notify(&self, touched: &[String]) {
        let mut collections: Vec<&str> = Vec::new();
        for path in touched {
            if let Some(tx) = self.document_watchers.get(path) {
                tx.send_replace(self.document_snapshot(path));
            }
            let parent = match path.rfind('/') {
                Some(idx) => &path[..idx],
                None => continue,
            };
            if !collections.contains(&parent) {
                collections.push(parent);
            }
        }
        for collection in collections {
            if let Some(tx) = self.collection_watchers.get(collection) {
                tx.send_replace(self.collection_snapshot(collection));
            }
        }
    }
}

/// Merges `incoming`'s top-level fields into `target`, leaving unrelated
/// fields untouched. A non-object on either side degrades to a full replace.
fn merge_fields(target: &mut Value, incoming: &Value) {
    match (target, incoming) {
        (Value::Object(existing), Value::Object(fields)) => {
            for (key, value) in fields {
                existing.insert(key.clone(), value.clone());
            }
        }
        (target, incoming) => *target = incoming.clone(),
    }
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Active subscriber count for a collection. Diagnostic surface used to
    /// verify subscriptions are actually released on teardown.
    pub async fn collection_subscribers(&self, path: &CollectionPath) -> usize {
        let state = self.state.lock().await;
        state
            .collection_watchers
            .get(path.as_str())
            .map(|tx| tx.receiver_count())
            .unwrap_or(0)
    }

    /// Active subscriber count for a single document.
    pub async fn document_subscribers(&self, path: &DocumentPath) -> usize {
        let state = self.state.lock().await;
        state
            .document_watchers
            .get(path.as_str())
            .map(|tx| tx.receiver_count())
            .unwrap_or(0)
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn subscribe_collection(
        &self,
        path: &CollectionPath,
    ) -> Result<watch::Receiver<CollectionSnapshot>, StoreError> {
        let mut state = self.state.lock().await;
        let snapshot = state.collection_snapshot(path.as_str());
        let tx = state
            .collection_watchers
            .entry(path.as_str().to_string())
            .or_insert_with(|| watch::channel(snapshot).0);
        Ok(tx.subscribe())
    }

    async fn subscribe_document(
        &self,
        path: &DocumentPath,
    ) -> Result<watch::Receiver<DocumentSnapshot>, StoreError> {
        let mut state = self.state.lock().await;
        let snapshot = state.document_snapshot(path.as_str());
        let tx = state
            .document_watchers
            .entry(path.as_str().to_string())
            .or_insert_with(|| watch::channel(snapshot).0);
        Ok(tx.subscribe())
    }

    async fn add(&self, path: &CollectionPath, data: Value) -> Result<String, StoreError> {
        let id = Uuid::new_v4().to_string();
        let doc = path.doc(&id)?;
        let mut state = self.state.lock().await;
        state.apply(&WriteOp::Set {
            path: doc.clone(),
            data,
        });
        state.notify(&[doc.as_str().to_string()]);
        debug!(path = %doc, "document added");
        Ok(id)
    }

    async fn set(&self, path: &DocumentPath, data: Value) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        state.apply(&WriteOp::Set {
            path: path.clone(),
            data,
        });
        state.notify(&[path.as_str().to_string()]);
        Ok(())
    }

    async fn merge(&self, path: &DocumentPath, data: Value) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        state.apply(&WriteOp::Merge {
            path: path.clone(),
            data,
        });
        state.notify(&[path.as_str().to_string()]);
        Ok(())
    }

    async fn delete(&self, path: &DocumentPath) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        state.apply(&WriteOp::Delete { path: path.clone() });
        state.notify(&[path.as_str().to_string()]);
        Ok(())
    }

    async fn run_atomic(&self, ops: Vec<WriteOp>) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        let touched: Vec<String> = ops
            .iter()
            .map(|op| match op {
                WriteOp::Set { path, .. }
                | WriteOp::Merge { path, .. }
                | WriteOp::Delete { path } => path.as_str().to_string(),
            })
            .collect();
        for op in &ops {
            state.apply(op);
        }
        state.notify(&touched);
        debug!(ops = ops.len(), "atomic operation set applied");
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/memory_tests.rs"]
mod tests;
