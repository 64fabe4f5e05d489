// In-memory session registry.
//
// Sessions are ephemeral: created on start, destroyed on end, never
// persisted. At most one session is active per content id; ending is
// idempotent. Broadcasting start/end envelopes is the engine's job — the
// registry is pure state.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use draftsync_common::types::{CollaborationSession, CollaboratorSummary};
use uuid::Uuid;

use crate::error::CollabError;

#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    sessions: HashMap<Uuid, CollaborationSession>,
    by_content: HashMap<String, Uuid>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a session for a content id. Fails with `AlreadyActive` if a
    /// live session already exists for that content.
    pub fn start(
        &mut self,
        content_id: impl Into<String>,
        participants: Vec<CollaboratorSummary>,
        now: DateTime<Utc>,
    ) -> Result<&CollaborationSession, CollabError> {
        let content_id = content_id.into();
        if self.by_content.contains_key(&content_id) {
            return Err(CollabError::AlreadyActive { content_id });
        }

        let session = CollaborationSession {
            id: Uuid::new_v4(),
            content_id: content_id.clone(),
            participants,
            active: true,
            created_at: now,
            last_activity_at: now,
        };
        let id = session.id;
        self.by_content.insert(content_id, id);
        self.sessions.insert(id, session);
        Ok(&self.sessions[&id])
    }

    /// Register a session that a remote peer started.
    ///
    /// Returns false (and changes nothing) if the content already has a
    /// live session here — the local one wins and the duplicate is dropped.
    pub fn adopt(&mut self, session: CollaborationSession) -> bool {
        if self.by_content.contains_key(&session.content_id) || self.sessions.contains_key(&session.id)
        {
            return false;
        }
        self.by_content.insert(session.content_id.clone(), session.id);
        self.sessions.insert(session.id, session);
        true
    }

    /// End a session, destroying its registry entry. Idempotent: ending an
    /// unknown or already-ended session is a no-op.
    ///
    /// Returns the ended session (now marked inactive) when this call did
    /// the ending, so the caller can broadcast it.
    pub fn end(&mut self, session_id: Uuid) -> Option<CollaborationSession> {
        let mut session = self.sessions.remove(&session_id)?;
        self.by_content.remove(&session.content_id);
        session.active = false;
        Some(session)
    }

    pub fn get(&self, session_id: Uuid) -> Result<&CollaborationSession, CollabError> {
        self.sessions
            .get(&session_id)
            .ok_or_else(|| CollabError::not_found("session", session_id))
    }

    /// The live session for a content id, if any.
    pub fn active_for(&self, content_id: &str) -> Option<&CollaborationSession> {
        self.by_content.get(content_id).and_then(|id| self.sessions.get(id))
    }

    /// Bump `last_activity_at`.
    pub fn touch(&mut self, session_id: Uuid, now: DateTime<Utc>) {
        if let Some(session) = self.sessions.get_mut(&session_id) {
            session.last_activity_at = now;
        }
    }

    /// Ids of all live sessions that list the collaborator as a participant.
    pub fn sessions_with_participant(&self, collaborator_id: &str) -> Vec<Uuid> {
        let mut ids: Vec<Uuid> = self
            .sessions
            .values()
            .filter(|session| session.participants.iter().any(|p| p.id == collaborator_id))
            .map(|session| session.id)
            .collect();
        ids.sort();
        ids
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use draftsync_common::types::{Collaborator, CollaboratorRole};
    use uuid::Uuid;

    use super::SessionRegistry;
    use crate::error::CollabError;

    fn participants() -> Vec<draftsync_common::types::CollaboratorSummary> {
        vec![
            Collaborator::new("user-a", "Alice", "alice@example.com", CollaboratorRole::Owner)
                .summary(),
        ]
    }

    #[test]
    fn second_start_for_same_content_is_already_active() {
        let mut registry = SessionRegistry::new();
        registry.start("draft-1", participants(), Utc::now()).expect("first start");

        let err = registry
            .start("draft-1", participants(), Utc::now())
            .expect_err("second start should fail");
        assert_eq!(err, CollabError::AlreadyActive { content_id: "draft-1".to_string() });
    }

    #[test]
    fn end_destroys_the_session_and_is_idempotent() {
        let mut registry = SessionRegistry::new();
        let id = registry.start("draft-1", participants(), Utc::now()).expect("start").id;

        let ended = registry.end(id).expect("first end should report the session");
        assert!(!ended.active);
        assert!(registry.end(id).is_none());
        assert!(matches!(registry.get(id), Err(CollabError::NotFound { kind: "session", .. })));
    }

    #[test]
    fn ending_frees_the_content_for_a_new_session() {
        let mut registry = SessionRegistry::new();
        let first = registry.start("draft-1", participants(), Utc::now()).expect("start").id;
        registry.end(first);

        let second = registry.start("draft-1", participants(), Utc::now());
        assert!(second.is_ok());
    }

    #[test]
    fn adopt_rejects_content_with_a_live_local_session() {
        let mut registry = SessionRegistry::new();
        let local = registry.start("draft-1", participants(), Utc::now()).expect("start").clone();

        let mut remote = local.clone();
        remote.id = Uuid::new_v4();
        assert!(!registry.adopt(remote));
        assert_eq!(registry.active_for("draft-1").expect("live session").id, local.id);
    }

    #[test]
    fn touch_bumps_last_activity() {
        let mut registry = SessionRegistry::new();
        let started = Utc::now();
        let id = registry.start("draft-1", participants(), started).expect("start").id;

        let later = started + chrono::Duration::seconds(30);
        registry.touch(id, later);
        assert_eq!(registry.get(id).expect("session").last_activity_at, later);
    }
}
