use draftsync_common::types::CollaboratorRole;
use thiserror::Error;
use uuid::Uuid;

/// Failure taxonomy for collaboration operations.
///
/// Structural errors (`MalformedChange`, `AlreadyApplied`, `NoHistory`) are
/// recovered locally: the operation is rejected and document state is left
/// untouched. `ChannelUnavailable` is surfaced to the caller so the UI can
/// show a disconnected indicator; local state that was already mutated
/// before the failed send is kept (accepted at-most-once loss window).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CollabError {
    #[error("a live session already exists for content {content_id}")]
    AlreadyActive { content_id: String },

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("malformed change: {reason}")]
    MalformedChange { reason: String },

    #[error("suggestion {0} was already applied")]
    AlreadyApplied(Uuid),

    #[error("no further history in that direction")]
    NoHistory,

    #[error("collaboration channel is unavailable")]
    ChannelUnavailable,

    #[error("collaborator {collaborator_id} has role {role} and may not edit")]
    Forbidden { collaborator_id: String, role: CollaboratorRole },
}

impl CollabError {
    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        Self::NotFound { kind, id: id.to_string() }
    }

    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedChange { reason: reason.into() }
    }
}
