// Channel message types for the draftsync-collab.v1 protocol.
//
// The channel delivers JSON envelopes of the form `{ "type": ..., "data":
// ... }`. Payload field names are camelCase to match the dashboard client's
// wire format; outer and inner `type` tags are snake_case.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{AiSuggestion, Comment, CollaboratorSummary, ContentChange, SuggestionCategory};

/// All message types on the collaboration channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "data", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum Envelope {
    /// A collaboration session opened for a draft.
    StartCollaboration(StartCollaboration),

    /// A collaboration session ended.
    EndCollaboration { session_id: Uuid },

    /// An in-session event: edit, comment, suggestion application, or
    /// presence update.
    CollaborationMessage(CollabMessage),

    /// A batch of AI suggestions for a session.
    AiSuggestions(SuggestionBatch),
}

/// Payload of `start_collaboration`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StartCollaboration {
    pub session_id: Uuid,
    pub content_id: String,
    pub title: String,
    /// Initial document body.
    pub content: String,
    pub platform: String,
    pub collaborators: Vec<CollaboratorSummary>,
}

/// Payload of `collaboration_message`: a session id plus one in-session
/// event, flattened so the wire shape is `{ sessionId, type, ... }`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CollabMessage {
    pub session_id: Uuid,
    #[serde(flatten)]
    pub payload: CollabPayload,
}

/// In-session event kinds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum CollabPayload {
    /// A document edit from one collaborator.
    ContentChange { change: ContentChange },

    /// A new top-level comment.
    CommentAdded { comment: Comment },

    /// A suggestion was merged into the document; recipients replay the
    /// same merge instead of re-deriving it.
    SuggestionApplied {
        suggestion_id: Uuid,
        applied_by: String,
        category: SuggestionCategory,
        payload: String,
    },

    /// Presence update: online flag and current activity label.
    UserActivity {
        collaborator_id: String,
        online: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        activity: Option<String>,
    },
}

/// Payload of `ai_suggestions`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionBatch {
    pub session_id: Uuid,
    pub suggestions: Vec<AiSuggestion>,
}
