use std::sync::Arc;

use shared::domain::{ContainerKind, ProjectId, Task, UserId};
use store::path::{self, CollectionPath, DocumentPath};
use store::DocumentStore;
use tokio::sync::{broadcast, watch};

use crate::error::BoardError;
use crate::mirror::CollectionMirror;
use crate::order::OrderStore;
use crate::BoardEvent;

/// Store handles for one container of the active project.
#[derive(Debug, Clone)]
pub struct ContainerHandles {
    pub kind: ContainerKind,
    pub collection: CollectionPath,
    pub order_doc: DocumentPath,
}

struct ContainerState {
    handles: ContainerHandles,
    mirror: CollectionMirror<Task>,
    order: OrderStore,
}

impl ContainerState {
    async fn start(
        store: &Arc<dyn DocumentStore>,
        uid: &UserId,
        project: &ProjectId,
        kind: ContainerKind,
        events: broadcast::Sender<BoardEvent>,
    ) -> Result<Self, BoardError> {
        let handles = ContainerHandles {
            kind,
            collection: path::container_collection(uid, project, kind)?,
            order_doc: path::order_doc(uid, project, kind)?,
        };
        let mirror =
            CollectionMirror::start(store, handles.collection.clone(), events.clone()).await?;
        let order =
            OrderStore::start(store, handles.order_doc.clone(), Vec::new(), events).await?;
        Ok(Self {
            handles,
            mirror,
            order,
        })
    }
}

/// Read-only aggregate of the active project's three containers: a mirror
/// and an order store per container, plus their store handles. One context
/// exists at a time; switching projects stops the old context's pumps before
/// the new one subscribes.
pub struct ProjectContext {
    project_id: ProjectId,
    todo: ContainerState,
    in_progress: ContainerState,
    done: ContainerState,
}

impl ProjectContext {
    pub async fn start(
        store: &Arc<dyn DocumentStore>,
        uid: &UserId,
        project_id: ProjectId,
        events: broadcast::Sender<BoardEvent>,
    ) -> Result<Self, BoardError> {
        let todo =
            ContainerState::start(store, uid, &project_id, ContainerKind::Todo, events.clone())
                .await?;
        let in_progress = ContainerState::start(
            store,
            uid,
            &project_id,
            ContainerKind::InProgress,
            events.clone(),
        )
        .await?;
        let done =
            ContainerState::start(store, uid, &project_id, ContainerKind::Done, events).await?;
        Ok(Self {
            project_id,
            todo,
            in_progress,
            done,
        })
    }

    fn container(&self, kind: ContainerKind) -> &ContainerState {
        match kind {
            ContainerKind::Todo => &self.todo,
            ContainerKind::InProgress => &self.in_progress,
            ContainerKind::Done => &self.done,
        }
    }

    pub fn project_id(&self) -> &ProjectId {
        &self.project_id
    }

    pub fn handles(&self, kind: ContainerKind) -> &ContainerHandles {
        &self.container(kind).handles
    }

    pub fn mirror(&self, kind: ContainerKind) -> &CollectionMirror<Task> {
        &self.container(kind).mirror
    }

    pub fn order(&self, kind: ContainerKind) -> &OrderStore {
        &self.container(kind).order
    }

    /// Fresh ordered sequence of the container's current tasks.
    pub fn sorted_view(&self, kind: ContainerKind) -> Vec<Task> {
        let container = self.container(kind);
        container.order.sorted_view(&container.mirror.current())
    }

    pub fn observe(&self, kind: ContainerKind) -> watch::Receiver<Vec<Task>> {
        self.container(kind).mirror.observe()
    }

    /// Releases every subscription pump. Must run before a successor context
    /// subscribes, otherwise ghost listeners accumulate.
    pub fn stop(&self) {
        for kind in ContainerKind::ALL {
            let container = self.container(kind);
            container.mirror.stop();
            container.order.stop();
        }
    }
}
