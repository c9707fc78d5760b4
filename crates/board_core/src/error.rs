use shared::error::InvalidProjectTitle;
use store::StoreError;
use thiserror::Error;

/// Failures surfaced by board operations. None of these are fatal to the
/// process; the presentation layer decides how to display them.
#[derive(Debug, Error)]
pub enum BoardError {
    #[error(transparent)]
    Validation(#[from] InvalidProjectTitle),
    #[error("subscription to {path} failed: {source}")]
    Subscription { path: String, source: StoreError },
    #[error("write to {path} failed: {source}")]
    Write { path: String, source: StoreError },
    #[error("move transaction failed: {0}")]
    Transaction(StoreError),
    #[error("cannot encode document: {0}")]
    Encode(String),
    #[error("no project selected")]
    NoProjectSelected,
    #[error(transparent)]
    Store(#[from] StoreError),
}
