use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use store::path::CollectionPath;
use store::{CollectionSnapshot, DocumentStore};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::WatchStream;
use tracing::warn;

use crate::error::BoardError;
use crate::BoardEvent;

/// Local live cache of one remote collection.
///
/// Subscribes to the collection and republishes each full-replacement
/// snapshot on its own watch channel. The cache is derived and disposable:
/// the remote store stays authoritative, and every remote snapshot replaces
/// the published list wholesale, including anything applied through
/// [`CollectionMirror::apply_local`].
pub struct CollectionMirror<T> {
    path: CollectionPath,
    items: Arc<watch::Sender<Vec<T>>>,
    remote: watch::Receiver<CollectionSnapshot>,
    pump: JoinHandle<()>,
}

impl<T> CollectionMirror<T>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    pub async fn start(
        store: &Arc<dyn DocumentStore>,
        path: CollectionPath,
        events: broadcast::Sender<BoardEvent>,
    ) -> Result<Self, BoardError> {
        let mut remote = store.subscribe_collection(&path).await.map_err(|source| {
            BoardError::Subscription {
                path: path.to_string(),
                source,
            }
        })?;
        let snapshot_rx = remote.clone();
        let initial = decode_snapshot::<T>(&path, &remote.borrow_and_update());
        let items = Arc::new(watch::channel(initial).0);

        let pump = tokio::spawn({
            let items = Arc::clone(&items);
            let path = path.clone();
            async move {
                loop {
                    if remote.changed().await.is_err() {
                        warn!(path = %path, "collection subscription closed by store");
                        let _ = events.send(BoardEvent::SubscriptionLost {
                            path: path.to_string(),
                        });
                        break;
                    }
                    let snapshot = remote.borrow_and_update().clone();
                    items.send_replace(decode_snapshot::<T>(&path, &snapshot));
                }
            }
        });

        Ok(Self {
            path,
            items,
            remote: snapshot_rx,
            pump,
        })
    }

    pub fn path(&self) -> &CollectionPath {
        &self.path
    }

    /// Watch handle over the mirrored list. Holds the current list
    /// immediately; an empty list may precede the first remote snapshot.
    pub fn observe(&self) -> watch::Receiver<Vec<T>> {
        self.items.subscribe()
    }

    pub fn stream(&self) -> WatchStream<Vec<T>> {
        WatchStream::new(self.observe())
    }

    pub fn current(&self) -> Vec<T> {
        self.items.borrow().clone()
    }

    /// Optimistic local mutation, published to observers before the remote
    /// store confirms anything. The next remote snapshot replaces it.
    pub fn apply_local(&self, mutate: impl FnOnce(&mut Vec<T>)) {
        self.items.send_modify(mutate);
    }

    /// Republishes the store's current authoritative snapshot, discarding
    /// any optimistic local mutation.
    pub fn refresh_from_remote(&self) {
        let snapshot = self.remote.borrow().clone();
        self.items
            .send_replace(decode_snapshot::<T>(&self.path, &snapshot));
    }

    pub fn stop(&self) {
        self.pump.abort();
    }
}

impl<T> Drop for CollectionMirror<T> {
    fn drop(&mut self) {
        self.pump.abort();
    }
}

/// Decodes a collection snapshot, injecting each document's id as the `id`
/// field before deserializing. Undecodable documents are skipped with a
/// warning rather than poisoning the whole snapshot.
fn decode_snapshot<T: DeserializeOwned>(
    path: &CollectionPath,
    snapshot: &CollectionSnapshot,
) -> Vec<T> {
    let mut items = Vec::with_capacity(snapshot.documents.len());
    for doc in &snapshot.documents {
        let mut data = doc.data.clone();
        if let Value::Object(fields) = &mut data {
            fields.insert("id".to_string(), Value::String(doc.id.clone()));
        }
        match serde_json::from_value::<T>(data) {
            Ok(item) => items.push(item),
            Err(err) => {
                warn!(path = %path, id = %doc.id, error = %err, "skipping undecodable document");
            }
        }
    }
    items
}
