use serde_json::json;

use super::*;
use crate::path::{CollectionPath, DocumentPath};
use crate::{DocumentStore, WriteOp};

fn tasks_collection() -> CollectionPath {
    CollectionPath::new("userData/u1/projects/default/todo").expect("path")
}

fn order_path() -> DocumentPath {
    DocumentPath::new("userData/u1/projects/default/order/todo").expect("path")
}

#[tokio::test]
async fn add_assigns_id_and_updates_collection_snapshot() {
    let store = MemoryStore::new();
    let collection = tasks_collection();
    let mut rx = store
        .subscribe_collection(&collection)
        .await
        .expect("subscribe");
    assert!(rx.borrow().documents.is_empty());

    let id = store
        .add(&collection, json!({"title": "write tests"}))
        .await
        .expect("add");

    rx.changed().await.expect("snapshot");
    let snapshot = rx.borrow_and_update().clone();
    assert_eq!(snapshot.documents.len(), 1);
    assert_eq!(snapshot.documents[0].id, id);
    assert_eq!(snapshot.documents[0].data["title"], "write tests");
}

#[tokio::test]
async fn merge_preserves_unrelated_fields() {
    let store = MemoryStore::new();
    let doc = order_path();
    store
        .set(&doc, json!({"order": ["a"], "color": "green"}))
        .await
        .expect("set");
    store
        .merge(&doc, json!({"order": ["b", "a"]}))
        .await
        .expect("merge");

    let rx = store.subscribe_document(&doc).await.expect("subscribe");
    let snapshot = rx.borrow().clone();
    let data = snapshot.data.expect("document exists");
    assert_eq!(data["order"], json!(["b", "a"]));
    assert_eq!(data["color"], "green");
}

#[tokio::test]
async fn merge_creates_missing_document() {
    let store = MemoryStore::new();
    let doc = order_path();
    store.merge(&doc, json!({"order": []})).await.expect("merge");
    let rx = store.subscribe_document(&doc).await.expect("subscribe");
    assert!(rx.borrow().exists());
}

#[tokio::test]
async fn document_subscription_sees_set_and_delete() {
    let store = MemoryStore::new();
    let doc = tasks_collection().doc("t1").expect("path");
    let mut rx = store.subscribe_document(&doc).await.expect("subscribe");
    assert!(!rx.borrow().exists());

    store.set(&doc, json!({"title": "a"})).await.expect("set");
    rx.changed().await.expect("set snapshot");
    assert!(rx.borrow_and_update().exists());

    store.delete(&doc).await.expect("delete");
    rx.changed().await.expect("delete snapshot");
    assert!(!rx.borrow_and_update().exists());
}

#[tokio::test]
async fn delete_of_missing_document_is_noop() {
    let store = MemoryStore::new();
    let doc = tasks_collection().doc("ghost").expect("path");
    store.delete(&doc).await.expect("delete");
}

#[tokio::test]
async fn subcollection_documents_stay_out_of_parent_snapshot() {
    let store = MemoryStore::new();
    let projects = CollectionPath::new("userData/u1/projects").expect("path");
    let project = projects.doc("default").expect("path");
    store.set(&project, json!({"title": "default"})).await.expect("set");

    let task = project
        .collection("todo")
        .expect("path")
        .doc("t1")
        .expect("path");
    store.set(&task, json!({"title": "nested"})).await.expect("set");

    let rx = store.subscribe_collection(&projects).await.expect("subscribe");
    let snapshot = rx.borrow().clone();
    assert_eq!(snapshot.documents.len(), 1);
    assert_eq!(snapshot.documents[0].id, "default");
}

#[tokio::test]
async fn atomic_set_applies_every_operation() {
    let store = MemoryStore::new();
    let todo = tasks_collection();
    let done = CollectionPath::new("userData/u1/projects/default/done").expect("path");
    let source_doc = todo.doc("t1").expect("path");
    let dest_doc = done.doc("t1").expect("path");

    store.set(&source_doc, json!({"title": "move me"})).await.expect("set");

    let mut todo_rx = store.subscribe_collection(&todo).await.expect("subscribe");
    let mut done_rx = store.subscribe_collection(&done).await.expect("subscribe");
    todo_rx.borrow_and_update();
    done_rx.borrow_and_update();

    store
        .run_atomic(vec![
            WriteOp::Delete {
                path: source_doc.clone(),
            },
            WriteOp::Set {
                path: dest_doc.clone(),
                data: json!({"title": "move me"}),
            },
            WriteOp::Merge {
                path: order_path(),
                data: json!({"order": []}),
            },
        ])
        .await
        .expect("transaction");

    todo_rx.changed().await.expect("todo snapshot");
    done_rx.changed().await.expect("done snapshot");
    assert!(todo_rx.borrow().documents.is_empty());
    assert_eq!(done_rx.borrow().documents.len(), 1);
}

#[tokio::test]
async fn subscriber_counts_track_dropped_receivers() {
    let store = MemoryStore::new();
    let collection = tasks_collection();
    let rx = store
        .subscribe_collection(&collection)
        .await
        .expect("subscribe");
    assert_eq!(store.collection_subscribers(&collection).await, 1);
    drop(rx);
    assert_eq!(store.collection_subscribers(&collection).await, 0);
}
