use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::watch;

pub mod memory;
pub mod path;

pub use memory::MemoryStore;

use crate::path::{CollectionPath, DocumentPath};

/// Errors surfaced by a document store backend. Cloneable so a failure can be
/// relayed through snapshot channels to every observer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },
    #[error("document not found: {0}")]
    NotFound(String),
    #[error("transaction rejected: {0}")]
    TransactionRejected(String),
    #[error("store backend failure: {0}")]
    Backend(String),
}

/// One document inside a collection snapshot. `data` is the raw stored
/// value; the id lives beside it, exactly as the store keys the document.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub data: Value,
}

/// Full replacement snapshot of a collection's membership and contents.
/// Never a diff: consumers rebuild their caches from it wholesale.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectionSnapshot {
    pub documents: Vec<Document>,
}

/// Full replacement snapshot of a single document. `data` is `None` while
/// the document does not exist.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentSnapshot {
    pub data: Option<Value>,
}

impl DocumentSnapshot {
    pub fn exists(&self) -> bool {
        self.data.is_some()
    }
}

/// One entry of an atomic operation set. The store applies a set
/// all-or-nothing; no partial application is ever observable.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    Set { path: DocumentPath, data: Value },
    Merge { path: DocumentPath, data: Value },
    Delete { path: DocumentPath },
}

/// The remote document store seam: path-addressed collections and documents,
/// live snapshot subscriptions, partial-field merge writes and atomic
/// multi-write transactions.
///
/// Subscriptions use watch semantics: the receiver holds the current
/// snapshot immediately and is notified on every subsequent change. A closed
/// channel means the subscription terminated; observers decide whether to
/// resubscribe.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn subscribe_collection(
        &self,
        path: &CollectionPath,
    ) -> Result<watch::Receiver<CollectionSnapshot>, StoreError>;

    async fn subscribe_document(
        &self,
        path: &DocumentPath,
    ) -> Result<watch::Receiver<DocumentSnapshot>, StoreError>;

    /// Creates a document with a store-assigned id and returns the id.
    async fn add(&self, path: &CollectionPath, data: Value) -> Result<String, StoreError>;

    /// Full-document write, replacing any previous contents.
    async fn set(&self, path: &DocumentPath, data: Value) -> Result<(), StoreError>;

    /// Partial write: fields present in `data` overwrite, everything else in
    /// the stored document is kept. Creates the document when missing.
    async fn merge(&self, path: &DocumentPath, data: Value) -> Result<(), StoreError>;

    /// Deleting a missing document is a no-op, not an error.
    async fn delete(&self, path: &DocumentPath) -> Result<(), StoreError>;

    /// Applies the whole operation set atomically, in order.
    async fn run_atomic(&self, ops: Vec<WriteOp>) -> Result<(), StoreError>;
}
