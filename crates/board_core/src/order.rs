use std::sync::Arc;

use serde_json::Value;
use shared::domain::{OrderRecord, Task, TaskId};
use store::path::DocumentPath;
use store::{DocumentSnapshot, DocumentStore};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::BoardError;
use crate::BoardEvent;

/// Holds one container's canonical task ordering and keeps it synchronized
/// with the remote order document.
///
/// Snapshot rule: a snapshot carrying a populated `order` field replaces the
/// cached ordering; an absent or empty snapshot leaves the last-known
/// ordering untouched. Keeping the stale cache protects against the
/// first-write race, where the order document does not exist yet while tasks
/// already do.
pub struct OrderStore {
    doc: DocumentPath,
    store: Arc<dyn DocumentStore>,
    cached: Arc<watch::Sender<Vec<TaskId>>>,
    remote: watch::Receiver<DocumentSnapshot>,
    pump: JoinHandle<()>,
}

impl OrderStore {
    pub async fn start(
        store: &Arc<dyn DocumentStore>,
        doc: DocumentPath,
        initial_order: Vec<TaskId>,
        events: broadcast::Sender<BoardEvent>,
    ) -> Result<Self, BoardError> {
        let mut remote = store.subscribe_document(&doc).await.map_err(|source| {
            BoardError::Subscription {
                path: doc.to_string(),
                source,
            }
        })?;
        let snapshot_rx = remote.clone();
        let seeded = order_from_snapshot(&doc, &remote.borrow_and_update()).unwrap_or(initial_order);
        let cached = Arc::new(watch::channel(seeded).0);

        let pump = tokio::spawn({
            let cached = Arc::clone(&cached);
            let doc = doc.clone();
            async move {
                loop {
                    if remote.changed().await.is_err() {
                        warn!(path = %doc, "order document subscription closed by store");
                        let _ = events.send(BoardEvent::SubscriptionLost {
                            path: doc.to_string(),
                        });
                        break;
                    }
                    let snapshot = remote.borrow_and_update().clone();
                    match order_from_snapshot(&doc, &snapshot) {
                        Some(order) => {
                            cached.send_replace(order);
                        }
                        None => {
                            debug!(path = %doc, "empty order snapshot, keeping last-known ordering");
                        }
                    }
                }
            }
        });

        Ok(Self {
            doc,
            store: Arc::clone(store),
            cached,
            remote: snapshot_rx,
            pump,
        })
    }

    pub fn doc_path(&self) -> &DocumentPath {
        &self.doc
    }

    pub fn cached_order(&self) -> Vec<TaskId> {
        self.cached.borrow().clone()
    }

    pub fn observe_order(&self) -> watch::Receiver<Vec<TaskId>> {
        self.cached.subscribe()
    }

    /// Pure ordered projection of `items` under the cached ordering. Never
    /// mutates shared state; every call returns a fresh sequence.
    pub fn sorted_view(&self, items: &[Task]) -> Vec<Task> {
        sort_by_order(&self.cached.borrow(), items)
    }

    /// Optimistic cache update, visible to `sorted_view` immediately.
    pub fn set_local(&self, order: Vec<TaskId>) {
        self.cached.send_replace(order);
    }

    /// Re-applies the snapshot rule to the store's current authoritative
    /// snapshot.
    pub fn refresh_from_remote(&self) {
        if let Some(order) = order_from_snapshot(&self.doc, &self.remote.borrow()) {
            self.cached.send_replace(order);
        }
    }

    /// Persists the ordering with a merge write, leaving unrelated fields of
    /// the order document untouched.
    pub async fn write(&self, order: &[TaskId]) -> Result<(), BoardError> {
        let payload = order_payload(order)?;
        self.store
            .merge(&self.doc, payload)
            .await
            .map_err(|source| BoardError::Write {
                path: self.doc.to_string(),
                source,
            })
    }

    pub fn stop(&self) {
        self.pump.abort();
    }
}

impl Drop for OrderStore {
    fn drop(&mut self) {
        self.pump.abort();
    }
}

pub(crate) fn order_payload(order: &[TaskId]) -> Result<Value, BoardError> {
    serde_json::to_value(OrderRecord {
        order: order.to_vec(),
    })
    .map_err(|err| BoardError::Encode(err.to_string()))
}

fn order_from_snapshot(doc: &DocumentPath, snapshot: &DocumentSnapshot) -> Option<Vec<TaskId>> {
    let data = snapshot.data.as_ref()?;
    match serde_json::from_value::<OrderRecord>(data.clone()) {
        Ok(record) if !record.order.is_empty() => Some(record.order),
        Ok(_) => None,
        Err(err) => {
            warn!(path = %doc, error = %err, "malformed order document ignored");
            None
        }
    }
}

/// Stable sort of `items` by position in `order`. Ids unknown to the
/// ordering sort after all known ids and keep their arrival order; stale ids
/// in `order` with no matching item are ignored.
pub fn sort_by_order(order: &[TaskId], items: &[Task]) -> Vec<Task> {
    let mut sorted = items.to_vec();
    sorted.sort_by_key(|task| {
        order
            .iter()
            .position(|id| id == &task.id)
            .unwrap_or(usize::MAX)
    });
    sorted
}
