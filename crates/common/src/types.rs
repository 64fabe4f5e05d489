// Core domain types shared across all DraftSync crates.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Display colors assigned to collaborators, in dashboard palette order.
pub const DISPLAY_PALETTE: [&str; 8] = [
    "#2563eb", "#16a34a", "#db2777", "#ea580c", "#7c3aed", "#0891b2", "#ca8a04", "#dc2626",
];

/// Deterministic palette color for a collaborator id.
///
/// Every client derives the same color from the same id, so cursors and
/// comment badges render consistently without any coordination message.
pub fn color_for(collaborator_id: &str) -> &'static str {
    // FNV-1a over the id bytes; only the low bits matter for palette indexing.
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in collaborator_id.as_bytes() {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    DISPLAY_PALETTE[(hash % DISPLAY_PALETTE.len() as u64) as usize]
}

/// Capability tier for a collaborator.
///
/// `Owner` and `Editor` may submit edits; `Viewer` may only read and comment.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CollaboratorRole {
    Owner,
    Editor,
    Viewer,
}

impl CollaboratorRole {
    pub fn can_edit(self) -> bool {
        matches!(self, Self::Owner | Self::Editor)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Editor => "editor",
            Self::Viewer => "viewer",
        }
    }
}

impl fmt::Display for CollaboratorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown collaborator role: {0}")]
pub struct RoleParseError(String);

impl FromStr for CollaboratorRole {
    type Err = RoleParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "owner" => Ok(Self::Owner),
            "editor" => Ok(Self::Editor),
            "viewer" => Ok(Self::Viewer),
            other => Err(RoleParseError(other.to_string())),
        }
    }
}

/// A participant in the collaborative editor.
///
/// Lives for the whole application session, independent of any one
/// collaboration session; presence fields are mutated by the tracker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Collaborator {
    pub id: String,
    pub name: String,
    /// Unknown for collaborators learned from a session announcement,
    /// which carries no email.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub role: CollaboratorRole,
    pub online: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity: Option<String>,
    pub color: String,
}

impl Collaborator {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        email: impl Into<String>,
        role: CollaboratorRole,
    ) -> Self {
        let id = id.into();
        let color = color_for(&id).to_string();
        Self {
            id,
            name: name.into(),
            email: Some(email.into()),
            role,
            online: false,
            activity: None,
            color,
        }
    }

    /// Rebuild a roster entry from a session-payload summary. The summary
    /// carries no email, so none is invented.
    pub fn from_summary(summary: &CollaboratorSummary) -> Self {
        Self {
            id: summary.id.clone(),
            name: summary.name.clone(),
            email: None,
            role: summary.role,
            online: false,
            activity: None,
            color: summary.color.clone(),
        }
    }

    pub fn summary(&self) -> CollaboratorSummary {
        CollaboratorSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            role: self.role,
            color: self.color.clone(),
        }
    }
}

/// Compact participant entry carried in session payloads.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CollaboratorSummary {
    pub id: String,
    pub name: String,
    pub role: CollaboratorRole,
    pub color: String,
}

/// The shared post draft under edit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ContentDocument {
    pub title: String,
    pub body: String,
    /// Target platform tag, e.g. "twitter" or "linkedin".
    pub platform: String,
}

/// Kind of edit carried by a [`ContentChange`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Insert,
    Delete,
    Format,
}

/// A single edit to the shared document body. Immutable once created;
/// consumed exactly once by each remote recipient.
///
/// `position` and `length` count Unicode scalar values into the *current*
/// local body. They are signed so that malformed (negative) values arriving
/// over the wire are representable and can be rejected as a structural
/// error instead of failing deserialization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ContentChange {
    pub id: Uuid,
    pub author_id: String,
    pub author_name: String,
    pub kind: ChangeKind,
    pub position: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<i64>,
    pub timestamp: DateTime<Utc>,
}

impl ContentChange {
    pub fn insert(
        author_id: impl Into<String>,
        author_name: impl Into<String>,
        position: i64,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            author_id: author_id.into(),
            author_name: author_name.into(),
            kind: ChangeKind::Insert,
            position,
            content: Some(content.into()),
            length: None,
            timestamp: Utc::now(),
        }
    }

    pub fn delete(
        author_id: impl Into<String>,
        author_name: impl Into<String>,
        position: i64,
        length: i64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            author_id: author_id.into(),
            author_name: author_name.into(),
            kind: ChangeKind::Delete,
            position,
            content: None,
            length: Some(length),
            timestamp: Utc::now(),
        }
    }

    pub fn format(
        author_id: impl Into<String>,
        author_name: impl Into<String>,
        position: i64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            author_id: author_id.into(),
            author_name: author_name.into(),
            kind: ChangeKind::Format,
            position,
            content: None,
            length: None,
            timestamp: Utc::now(),
        }
    }
}

/// A threaded comment on the draft.
///
/// Append-only except for `resolved` and `replies`, which only grow within
/// a session. Replies are nested and never broadcast as top-level comments.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: Uuid,
    pub author_id: String,
    pub author_name: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub resolved: bool,
    /// Character offset the comment is anchored to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor: Option<i64>,
    #[serde(default)]
    pub replies: Vec<Comment>,
}

impl Comment {
    pub fn new(
        author_id: impl Into<String>,
        author_name: impl Into<String>,
        text: impl Into<String>,
        anchor: Option<i64>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            author_id: author_id.into(),
            author_name: author_name.into(),
            text: text.into(),
            timestamp: Utc::now(),
            resolved: false,
            anchor,
            replies: Vec::new(),
        }
    }
}

/// Category of an AI suggestion; decides how (and whether) the payload is
/// merged into the document body.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionCategory {
    Content,
    Hashtag,
    Timing,
    Style,
}

impl SuggestionCategory {
    /// Whether applying a suggestion of this category mutates the body.
    /// `timing` and `style` suggestions are informational only.
    pub fn merges_into_body(self) -> bool {
        matches!(self, Self::Content | Self::Hashtag)
    }
}

/// An externally generated content suggestion.
///
/// Consumed at most once: applying flips `applied` permanently.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AiSuggestion {
    pub id: Uuid,
    pub category: SuggestionCategory,
    pub title: String,
    pub description: String,
    pub payload: String,
    /// Engagement confidence in [0, 1].
    pub confidence: f64,
    pub applied: bool,
}

/// An active collaboration session tying one draft to its participants.
///
/// Exactly one session is active per content id at a time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CollaborationSession {
    pub id: Uuid,
    pub content_id: String,
    pub participants: Vec<CollaboratorSummary>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_assignment_is_deterministic_and_in_palette() {
        let first = color_for("user-alice");
        let second = color_for("user-alice");
        assert_eq!(first, second);
        assert!(DISPLAY_PALETTE.contains(&first));
    }

    #[test]
    fn roles_round_trip_through_strings() {
        for role in [CollaboratorRole::Owner, CollaboratorRole::Editor, CollaboratorRole::Viewer] {
            let parsed: CollaboratorRole = role.as_str().parse().expect("role should parse");
            assert_eq!(parsed, role);
        }
        assert!("admin".parse::<CollaboratorRole>().is_err());
    }

    #[test]
    fn only_owner_and_editor_can_edit() {
        assert!(CollaboratorRole::Owner.can_edit());
        assert!(CollaboratorRole::Editor.can_edit());
        assert!(!CollaboratorRole::Viewer.can_edit());
    }

    #[test]
    fn collaborator_serializes_with_camel_case_wire_names() {
        let mut collaborator =
            Collaborator::new("user-bob", "Bob", "bob@example.com", CollaboratorRole::Editor);
        collaborator.activity = Some("typing".to_string());

        let value = serde_json::to_value(&collaborator).expect("serialize collaborator");
        assert_eq!(value["role"], "editor");
        assert_eq!(value["activity"], "typing");
        assert_eq!(value["color"], color_for("user-bob"));
    }

    #[test]
    fn collaborator_from_summary_has_no_email() {
        let full =
            Collaborator::new("user-bob", "Bob", "bob@example.com", CollaboratorRole::Editor);
        let rebuilt = Collaborator::from_summary(&full.summary());

        assert_eq!(rebuilt.email, None);
        assert_eq!(rebuilt.color, full.color);
        assert_eq!(rebuilt.role, full.role);

        let value = serde_json::to_value(&rebuilt).expect("serialize collaborator");
        assert!(value.get("email").is_none());
    }

    #[test]
    fn change_constructors_fill_kind_specific_fields() {
        let insert = ContentChange::insert("user-a", "A", 5, " world");
        assert_eq!(insert.kind, ChangeKind::Insert);
        assert_eq!(insert.content.as_deref(), Some(" world"));
        assert_eq!(insert.length, None);

        let delete = ContentChange::delete("user-a", "A", 0, 5);
        assert_eq!(delete.kind, ChangeKind::Delete);
        assert_eq!(delete.content, None);
        assert_eq!(delete.length, Some(5));
    }

    #[test]
    fn only_content_and_hashtag_suggestions_merge() {
        assert!(SuggestionCategory::Content.merges_into_body());
        assert!(SuggestionCategory::Hashtag.merges_into_body());
        assert!(!SuggestionCategory::Timing.merges_into_body());
        assert!(!SuggestionCategory::Style.merges_into_body());
    }
}
