//! Path addressing for the document store.
//!
//! Paths alternate collection and document segments, so a collection path
//! always has an odd number of segments and a document path an even number.
//! Segments are non-empty and must not contain `/`.

use shared::domain::{ContainerKind, ProjectId, TaskId, UserId};

use crate::StoreError;

const USER_DATA: &str = "userData";
const PROJECTS: &str = "projects";
const ORDER: &str = "order";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollectionPath(String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentPath(String);

fn check_segments(raw: &str, want_odd: bool) -> Result<(), StoreError> {
    let segments: Vec<&str> = raw.split('/').collect();
    if segments.iter().any(|segment| segment.is_empty()) {
        return Err(StoreError::InvalidPath {
            path: raw.to_string(),
            reason: "empty path segment".to_string(),
        });
    }
    let odd = segments.len() % 2 == 1;
    if odd != want_odd {
        let reason = if want_odd {
            "collection paths need an odd number of segments"
        } else {
            "document paths need an even number of segments"
        };
        return Err(StoreError::InvalidPath {
            path: raw.to_string(),
            reason: reason.to_string(),
        });
    }
    Ok(())
}

fn check_id(parent: &str, id: &str) -> Result<(), StoreError> {
    if id.is_empty() || id.contains('/') {
        return Err(StoreError::InvalidPath {
            path: format!("{parent}/{id}"),
            reason: "segment must be non-empty and must not contain '/'".to_string(),
        });
    }
    Ok(())
}

impl CollectionPath {
    pub fn new(raw: impl Into<String>) -> Result<Self, StoreError> {
        let raw = raw.into();
        check_segments(&raw, true)?;
        Ok(Self(raw))
    }

    /// Addresses a document inside this collection.
    pub fn doc(&self, id: &str) -> Result<DocumentPath, StoreError> {
        check_id(&self.0, id)?;
        Ok(DocumentPath(format!("{}/{id}", self.0)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl DocumentPath {
    pub fn new(raw: impl Into<String>) -> Result<Self, StoreError> {
        let raw = raw.into();
        check_segments(&raw, false)?;
        Ok(Self(raw))
    }

    /// Addresses a subcollection under this document.
    pub fn collection(&self, name: &str) -> Result<CollectionPath, StoreError> {
        check_id(&self.0, name)?;
        Ok(CollectionPath(format!("{}/{name}", self.0)))
    }

    /// Splits into the parent collection path and the document id. Safe on
    /// any validated document path.
    pub fn split(&self) -> (&str, &str) {
        // A document path has at least two segments.
        let idx = self.0.rfind('/').unwrap_or(0);
        (&self.0[..idx], &self.0[idx + 1..])
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// Canonical persisted layout, applied uniformly:
// userData/{uid}/projects/{projectId}/{container}/{taskId} for tasks and
// userData/{uid}/projects/{projectId}/order/{container} for order documents.

pub fn user_doc(uid: &UserId) -> Result<DocumentPath, StoreError> {
    CollectionPath::new(USER_DATA)?.doc(uid.as_str())
}

pub fn projects_collection(uid: &UserId) -> Result<CollectionPath, StoreError> {
    user_doc(uid)?.collection(PROJECTS)
}

pub fn project_doc(uid: &UserId, project: &ProjectId) -> Result<DocumentPath, StoreError> {
    projects_collection(uid)?.doc(project.as_str())
}

pub fn container_collection(
    uid: &UserId,
    project: &ProjectId,
    kind: ContainerKind,
) -> Result<CollectionPath, StoreError> {
    project_doc(uid, project)?.collection(kind.as_str())
}

pub fn task_doc(
    uid: &UserId,
    project: &ProjectId,
    kind: ContainerKind,
    task: &TaskId,
) -> Result<DocumentPath, StoreError> {
    container_collection(uid, project, kind)?.doc(task.as_str())
}

pub fn order_doc(
    uid: &UserId,
    project: &ProjectId,
    kind: ContainerKind,
) -> Result<DocumentPath, StoreError> {
    project_doc(uid, project)?.collection(ORDER)?.doc(kind.as_str())
}
