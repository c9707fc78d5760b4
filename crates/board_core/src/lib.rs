use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{broadcast, watch, Mutex};
use tracing::{info, warn};

use shared::domain::{
    ContainerKind, GestureId, ProjectId, ProjectSummary, Task, TaskDraft, TaskId, UserId,
};
use shared::error::validate_project_title;
use store::path;
use store::DocumentStore;

pub mod error;
mod mirror;
mod order;
mod project;
pub mod reorder;
mod transaction;

pub use error::BoardError;
pub use mirror::CollectionMirror;
pub use order::{sort_by_order, OrderStore};
pub use project::{ContainerHandles, ProjectContext};
pub use transaction::{DropEvent, MovePhase, MovePlan, MoveTransaction};

/// Selected when a session starts and after a project is deleted.
pub const DEFAULT_PROJECT: &str = "default";

const EVENT_CHANNEL_CAPACITY: usize = 1024;

#[derive(Debug, Clone)]
pub enum BoardEvent {
    ProjectSelected { project_id: ProjectId },
    ProjectDeleted { project_id: ProjectId },
    TaskCreated { kind: ContainerKind, task_id: TaskId },
    MoveCommitted { gesture: GestureId },
    MoveFailed { gesture: GestureId, message: String },
    SubscriptionLost { path: String },
    Error(String),
}

/// The board surface handed to a presentation layer.
#[async_trait]
pub trait BoardHandle: Send + Sync {
    async fn select_project(&self, project_id: ProjectId) -> Result<(), BoardError>;
    async fn create_project(&self, title: &str) -> Result<(), BoardError>;
    async fn delete_project(&self) -> Result<(), BoardError>;
    async fn create_task(&self, draft: TaskDraft) -> Result<TaskId, BoardError>;
    async fn submit_task_edit(
        &self,
        kind: ContainerKind,
        task: Task,
        delete: bool,
    ) -> Result<(), BoardError>;
    async fn handle_drop(&self, event: DropEvent) -> Result<(), BoardError>;
    async fn sorted_view(&self, kind: ContainerKind) -> Vec<Task>;
    async fn observe(&self, kind: ContainerKind) -> Option<watch::Receiver<Vec<Task>>>;
    async fn projects(&self) -> Vec<ProjectSummary>;
    async fn current_project(&self) -> Option<ProjectId>;
    fn subscribe_events(&self) -> broadcast::Receiver<BoardEvent>;
}

struct BoardState {
    applied_gestures: HashSet<GestureId>,
}

/// Client-side core of the task board: owns the store handle, the active
/// project's context, the projects-list mirror and the event fan-out. All
/// persisted state lives in the remote store; everything here is derived and
/// rebuildable from fresh subscriptions.
pub struct BoardClient {
    store: Arc<dyn DocumentStore>,
    user_id: UserId,
    projects: CollectionMirror<ProjectSummary>,
    context: Mutex<Option<ProjectContext>>,
    inner: Mutex<BoardState>,
    events: broadcast::Sender<BoardEvent>,
}

#[derive(Serialize)]
struct ProjectDocument<'a> {
    title: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NewTaskDocument<'a> {
    title: &'a str,
    description: &'a str,
    created_at: DateTime<Utc>,
}

impl BoardClient {
    /// Subscribes the projects mirror and selects the default project.
    pub async fn start(
        store: Arc<dyn DocumentStore>,
        user_id: UserId,
    ) -> Result<Arc<Self>, BoardError> {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let projects_path = path::projects_collection(&user_id)?;
        let projects = CollectionMirror::start(&store, projects_path, events.clone()).await?;
        let client = Arc::new(Self {
            store,
            user_id,
            projects,
            context: Mutex::new(None),
            inner: Mutex::new(BoardState {
                applied_gestures: HashSet::new(),
            }),
            events,
        });
        client
            .select_project(ProjectId::from(DEFAULT_PROJECT))
            .await?;
        Ok(client)
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub async fn select_project(&self, project_id: ProjectId) -> Result<(), BoardError> {
        let mut guard = self.context.lock().await;
        // Release the previous project's subscriptions before the new ones
        // are created; stale pumps must not outlive the switch.
        if let Some(previous) = guard.take() {
            previous.stop();
        }
        let next = ProjectContext::start(
            &self.store,
            &self.user_id,
            project_id.clone(),
            self.events.clone(),
        )
        .await?;
        *guard = Some(next);
        drop(guard);
        info!(project = %project_id, "project selected");
        let _ = self
            .events
            .send(BoardEvent::ProjectSelected { project_id });
        Ok(())
    }

    pub async fn create_project(&self, title: &str) -> Result<(), BoardError> {
        validate_project_title(title)?;
        let project_id = ProjectId::from(title);
        let doc = path::project_doc(&self.user_id, &project_id)?;
        let payload = serde_json::to_value(ProjectDocument { title })
            .map_err(|err| BoardError::Encode(err.to_string()))?;
        self.store
            .set(&doc, payload)
            .await
            .map_err(|source| BoardError::Write {
                path: doc.to_string(),
                source,
            })?;
        self.select_project(project_id).await
    }

    /// Deletes every task in all three containers, the order documents, then
    /// the project document itself, and falls back to the default project.
    /// An empty project issues zero task deletes.
    pub async fn delete_project(&self) -> Result<(), BoardError> {
        let ctx = match self.context.lock().await.take() {
            Some(ctx) => ctx,
            None => return Ok(()),
        };
        let project_id = ctx.project_id().clone();

        let mut doomed = Vec::new();
        for kind in ContainerKind::ALL {
            let handles = ctx.handles(kind);
            for task in ctx.mirror(kind).current() {
                doomed.push(handles.collection.doc(task.id.as_str())?);
            }
        }
        ctx.stop();

        let result: Result<(), BoardError> = async {
            futures::future::try_join_all(doomed.iter().map(|doc| self.store.delete(doc)))
                .await
                .map_err(BoardError::from)?;
            for kind in ContainerKind::ALL {
                let order_doc = path::order_doc(&self.user_id, &project_id, kind)?;
                self.store.delete(&order_doc).await?;
            }
            let project_doc = path::project_doc(&self.user_id, &project_id)?;
            self.store.delete(&project_doc).await?;
            Ok(())
        }
        .await;

        match &result {
            Ok(()) => {
                info!(project = %project_id, "project deleted");
                let _ = self.events.send(BoardEvent::ProjectDeleted {
                    project_id: project_id.clone(),
                });
            }
            Err(err) => {
                warn!(project = %project_id, error = %err, "project deletion failed");
                let _ = self.events.send(BoardEvent::Error(err.to_string()));
            }
        }

        // Reconverge on the default project either way; the store remains
        // authoritative for whatever the deletion left behind.
        self.select_project(ProjectId::from(DEFAULT_PROJECT)).await?;
        result
    }

    /// Creates a task in the todo container. The store assigns the id, which
    /// is then appended to todo's order record.
    pub async fn create_task(&self, draft: TaskDraft) -> Result<TaskId, BoardError> {
        let guard = self.context.lock().await;
        let ctx = guard.as_ref().ok_or(BoardError::NoProjectSelected)?;
        let handles = ctx.handles(ContainerKind::Todo);
        let payload = serde_json::to_value(NewTaskDocument {
            title: &draft.title,
            description: &draft.description,
            created_at: Utc::now(),
        })
        .map_err(|err| BoardError::Encode(err.to_string()))?;
        let id = self
            .store
            .add(&handles.collection, payload)
            .await
            .map_err(|source| BoardError::Write {
                path: handles.collection.to_string(),
                source,
            })?;
        let task_id = TaskId::from(id);

        let order_store = ctx.order(ContainerKind::Todo);
        let mut order = order_store.cached_order();
        order.push(task_id.clone());
        order_store.set_local(order.clone());
        order_store.write(&order).await?;
        drop(guard);

        let _ = self.events.send(BoardEvent::TaskCreated {
            kind: ContainerKind::Todo,
            task_id: task_id.clone(),
        });
        Ok(task_id)
    }

    /// Applies an edit-dialog result: a full-document update, or a delete
    /// when the flag is set. A deleted task's id may linger in the order
    /// record; stale ids are ignored during sorting.
    pub async fn submit_task_edit(
        &self,
        kind: ContainerKind,
        task: Task,
        delete: bool,
    ) -> Result<(), BoardError> {
        let guard = self.context.lock().await;
        let ctx = guard.as_ref().ok_or(BoardError::NoProjectSelected)?;
        let doc = ctx.handles(kind).collection.doc(task.id.as_str())?;
        if delete {
            self.store
                .delete(&doc)
                .await
                .map_err(|source| BoardError::Write {
                    path: doc.to_string(),
                    source,
                })?;
        } else {
            let payload =
                serde_json::to_value(&task).map_err(|err| BoardError::Encode(err.to_string()))?;
            self.store
                .set(&doc, payload)
                .await
                .map_err(|source| BoardError::Write {
                    path: doc.to_string(),
                    source,
                })?;
        }
        Ok(())
    }

    /// Persists one drop gesture. The local caches are mutated optimistically
    /// before the write is issued; a failed commit triggers re-derivation
    /// from the store's authoritative snapshots, never a compensating write.
    pub async fn handle_drop(&self, event: DropEvent) -> Result<(), BoardError> {
        {
            let inner = self.inner.lock().await;
            if inner.applied_gestures.contains(&event.gesture) {
                info!(gesture = %event.gesture, "duplicate drop gesture ignored");
                return Ok(());
            }
        }

        let mut txn = MoveTransaction::new(event.gesture.clone());
        let guard = self.context.lock().await;
        let ctx = match guard.as_ref() {
            Some(ctx) => ctx,
            None => {
                txn.stage(false, false);
                return Ok(());
            }
        };
        txn.stage(true, true);

        let plan = if event.source == event.target {
            let kind = event.source;
            let mut items = ctx.sorted_view(kind);
            reorder::move_item_in_list(&mut items, event.previous_index, event.current_index);
            let outcome = reorder::compute_order(&items, &items);
            ctx.order(kind).set_local(outcome.target_order.clone());
            transaction::plan_reorder(&ctx.handles(kind).order_doc, &outcome.target_order)?
        } else {
            let mut source_items = ctx.sorted_view(event.source);
            let mut target_items = ctx.sorted_view(event.target);
            let Some(task) = source_items
                .get(event.previous_index.min(source_items.len().saturating_sub(1)))
                .cloned()
            else {
                // nothing at the source index: degenerate gesture, no-op
                return Ok(());
            };
            reorder::transfer_list_item(
                &mut source_items,
                &mut target_items,
                event.previous_index,
                event.current_index,
            );
            let outcome = reorder::compute_order(&source_items, &target_items);

            ctx.order(event.source).set_local(outcome.source_order.clone());
            ctx.order(event.target).set_local(outcome.target_order.clone());
            let moved = task.clone();
            ctx.mirror(event.source)
                .apply_local(|items| items.retain(|item| item.id != moved.id));
            let appended = task.clone();
            ctx.mirror(event.target)
                .apply_local(move |items| items.push(appended));

            transaction::plan_transfer(
                &ctx.handles(event.source).collection,
                &ctx.handles(event.target).collection,
                &ctx.handles(event.source).order_doc,
                &ctx.handles(event.target).order_doc,
                &task,
                &outcome.source_order,
                &outcome.target_order,
            )?
        };

        {
            let mut inner = self.inner.lock().await;
            inner.applied_gestures.insert(event.gesture.clone());
        }

        match txn.commit(self.store.as_ref(), plan).await {
            Ok(()) => {
                let _ = self.events.send(BoardEvent::MoveCommitted {
                    gesture: event.gesture,
                });
                Ok(())
            }
            Err(err) => {
                warn!(gesture = %event.gesture, error = %err, "move transaction failed");
                ctx.mirror(event.source).refresh_from_remote();
                ctx.mirror(event.target).refresh_from_remote();
                ctx.order(event.source).refresh_from_remote();
                ctx.order(event.target).refresh_from_remote();
                let _ = self.events.send(BoardEvent::MoveFailed {
                    gesture: event.gesture,
                    message: err.to_string(),
                });
                Err(err)
            }
        }
    }

    pub async fn sorted_view(&self, kind: ContainerKind) -> Vec<Task> {
        let guard = self.context.lock().await;
        guard
            .as_ref()
            .map(|ctx| ctx.sorted_view(kind))
            .unwrap_or_default()
    }

    pub async fn observe(&self, kind: ContainerKind) -> Option<watch::Receiver<Vec<Task>>> {
        let guard = self.context.lock().await;
        guard.as_ref().map(|ctx| ctx.observe(kind))
    }

    pub async fn projects(&self) -> Vec<ProjectSummary> {
        self.projects.current()
    }

    pub async fn current_project(&self) -> Option<ProjectId> {
        let guard = self.context.lock().await;
        guard.as_ref().map(|ctx| ctx.project_id().clone())
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<BoardEvent> {
        self.events.subscribe()
    }
}

#[async_trait]
impl BoardHandle for BoardClient {
    async fn select_project(&self, project_id: ProjectId) -> Result<(), BoardError> {
        BoardClient::select_project(self, project_id).await
    }

    async fn create_project(&self, title: &str) -> Result<(), BoardError> {
        BoardClient::create_project(self, title).await
    }

    async fn delete_project(&self) -> Result<(), BoardError> {
        BoardClient::delete_project(self).await
    }

    async fn create_task(&self, draft: TaskDraft) -> Result<TaskId, BoardError> {
        BoardClient::create_task(self, draft).await
    }

    async fn submit_task_edit(
        &self,
        kind: ContainerKind,
        task: Task,
        delete: bool,
    ) -> Result<(), BoardError> {
        BoardClient::submit_task_edit(self, kind, task, delete).await
    }

    async fn handle_drop(&self, event: DropEvent) -> Result<(), BoardError> {
        BoardClient::handle_drop(self, event).await
    }

    async fn sorted_view(&self, kind: ContainerKind) -> Vec<Task> {
        BoardClient::sorted_view(self, kind).await
    }

    async fn observe(&self, kind: ContainerKind) -> Option<watch::Receiver<Vec<Task>>> {
        BoardClient::observe(self, kind).await
    }

    async fn projects(&self) -> Vec<ProjectSummary> {
        BoardClient::projects(self).await
    }

    async fn current_project(&self) -> Option<ProjectId> {
        BoardClient::current_project(self).await
    }

    fn subscribe_events(&self) -> broadcast::Receiver<BoardEvent> {
        BoardClient::subscribe_events(self)
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
