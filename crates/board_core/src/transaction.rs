use serde_json::Value;
use shared::domain::{ContainerKind, GestureId, Task, TaskId};
use store::path::{CollectionPath, DocumentPath};
use store::{DocumentStore, WriteOp};
use tracing::info;

use crate::error::BoardError;
use crate::order::order_payload;

/// Lifecycle of one drop gesture's persistence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovePhase {
    Idle,
    Staging,
    Committing,
    Committed,
    Failed,
}

/// A drag-drop gesture as reported by the presentation layer. Indices refer
/// to positions in the sorted views; the gesture id deduplicates replays.
#[derive(Debug, Clone)]
pub struct DropEvent {
    pub gesture: GestureId,
    pub source: ContainerKind,
    pub target: ContainerKind,
    pub previous_index: usize,
    pub current_index: usize,
}

/// The exact write set a commit will issue.
#[derive(Debug, Clone, PartialEq)]
pub enum MovePlan {
    /// Same-container reorder: a single merge write of the new order array.
    Reorder {
        order_doc: DocumentPath,
        payload: Value,
    },
    /// Cross-container move: one atomic set of exactly four operations.
    Transfer { ops: Vec<WriteOp> },
}

/// Drives one gesture through `Idle → Staging → Committing → Committed`
/// (or `Failed`). The transaction only assembles and issues the operation
/// set; atomicity is the store's guarantee, and the caller owns optimistic
/// state and failure reconciliation.
pub struct MoveTransaction {
    gesture: GestureId,
    phase: MovePhase,
}

impl MoveTransaction {
    pub fn new(gesture: GestureId) -> Self {
        Self {
            gesture,
            phase: MovePhase::Idle,
        }
    }

    pub fn gesture(&self) -> &GestureId {
        &self.gesture
    }

    pub fn phase(&self) -> MovePhase {
        self.phase
    }

    /// Validates the drop endpoints. When either endpoint is unresolved the
    /// gesture aborts back to `Idle`: a no-op, not an error.
    pub fn stage(&mut self, source_resolved: bool, target_resolved: bool) -> bool {
        if source_resolved && target_resolved {
            self.phase = MovePhase::Staging;
            true
        } else {
            self.phase = MovePhase::Idle;
            false
        }
    }

    pub async fn commit(
        &mut self,
        store: &dyn DocumentStore,
        plan: MovePlan,
    ) -> Result<(), BoardError> {
        self.phase = MovePhase::Committing;
        let result = match plan {
            MovePlan::Reorder { order_doc, payload } => store.merge(&order_doc, payload).await,
            MovePlan::Transfer { ops } => store.run_atomic(ops).await,
        };
        match result {
            Ok(()) => {
                self.phase = MovePhase::Committed;
                info!(gesture = %self.gesture, "move committed");
                Ok(())
            }
            Err(source) => {
                self.phase = MovePhase::Failed;
                Err(BoardError::Transaction(source))
            }
        }
    }
}

pub fn plan_reorder(order_doc: &DocumentPath, order: &[TaskId]) -> Result<MovePlan, BoardError> {
    Ok(MovePlan::Reorder {
        order_doc: order_doc.clone(),
        payload: order_payload(order)?,
    })
}

/// Assembles the cross-container operation set: delete from source, set the
/// full task document into the destination, then merge both order records.
#[allow(clippy::too_many_arguments)]
pub fn plan_transfer(
    source_collection: &CollectionPath,
    target_collection: &CollectionPath,
    source_order_doc: &DocumentPath,
    target_order_doc: &DocumentPath,
    task: &Task,
    source_order: &[TaskId],
    target_order: &[TaskId],
) -> Result<MovePlan, BoardError> {
    let task_data =
        serde_json::to_value(task).map_err(|err| BoardError::Encode(err.to_string()))?;
    let ops = vec![
        WriteOp::Delete {
            path: source_collection.doc(task.id.as_str())?,
        },
        WriteOp::Set {
            path: target_collection.doc(task.id.as_str())?,
            data: task_data,
        },
        WriteOp::Merge {
            path: source_order_doc.clone(),
            data: order_payload(source_order)?,
        },
        WriteOp::Merge {
            path: target_order_doc.clone(),
            data: order_payload(target_order)?,
        },
    ];
    Ok(MovePlan::Transfer { ops })
}
