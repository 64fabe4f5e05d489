// Collaborator roster and live presence state.
//
// Presence is best-effort and self-healing: there is no acknowledgement,
// and a reconnecting client simply re-announces its online status. Remote
// updates for collaborators we have never been introduced to are dropped.

use std::collections::HashMap;

use draftsync_common::types::Collaborator;
use tracing::debug;

use crate::error::CollabError;

#[derive(Debug, Clone, Default)]
pub struct PresenceTracker {
    collaborators: HashMap<String, Collaborator>,
}

impl PresenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a collaborator in the roster.
    pub fn upsert(&mut self, collaborator: Collaborator) {
        self.collaborators.insert(collaborator.id.clone(), collaborator);
    }

    pub fn get(&self, id: &str) -> Option<&Collaborator> {
        self.collaborators.get(id)
    }

    /// All known collaborators, ordered by id for stable rendering.
    pub fn roster(&self) -> Vec<&Collaborator> {
        let mut all: Vec<_> = self.collaborators.values().collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        all
    }

    /// Set the online flag. Going offline clears the activity label.
    pub fn set_online(&mut self, id: &str, online: bool) -> Result<&Collaborator, CollabError> {
        let collaborator = self
            .collaborators
            .get_mut(id)
            .ok_or_else(|| CollabError::not_found("collaborator", id))?;
        collaborator.online = online;
        if !online {
            collaborator.activity = None;
        }
        Ok(collaborator)
    }

    /// Set the current-activity label, e.g. "typing" or "reviewing".
    pub fn set_activity(
        &mut self,
        id: &str,
        activity: Option<String>,
    ) -> Result<&Collaborator, CollabError> {
        let collaborator = self
            .collaborators
            .get_mut(id)
            .ok_or_else(|| CollabError::not_found("collaborator", id))?;
        collaborator.activity = activity;
        Ok(collaborator)
    }

    /// Apply a remote presence update. Unknown collaborators are ignored;
    /// the next roster broadcast heals the gap.
    pub fn apply_remote(&mut self, id: &str, online: bool, activity: Option<String>) {
        match self.collaborators.get_mut(id) {
            Some(collaborator) => {
                collaborator.online = online;
                collaborator.activity = if online { activity } else { None };
            }
            None => debug!(collaborator_id = %id, "presence update for unknown collaborator"),
        }
    }
}

#[cfg(test)]
mod tests {
    use draftsync_common::types::{Collaborator, CollaboratorRole};

    use super::PresenceTracker;
    use crate::error::CollabError;

    fn tracker_with(id: &str, name: &str) -> PresenceTracker {
        let mut tracker = PresenceTracker::new();
        tracker.upsert(Collaborator::new(
            id,
            name,
            format!("{name}@example.com"),
            CollaboratorRole::Editor,
        ));
        tracker
    }

    #[test]
    fn going_offline_clears_activity() {
        let mut tracker = tracker_with("user-a", "Alice");
        tracker.set_online("user-a", true).expect("set online");
        tracker.set_activity("user-a", Some("typing".to_string())).expect("set activity");

        let collaborator = tracker.set_online("user-a", false).expect("set offline");
        assert!(!collaborator.online);
        assert_eq!(collaborator.activity, None);
    }

    #[test]
    fn unknown_collaborator_is_not_found() {
        let mut tracker = PresenceTracker::new();
        let err = tracker.set_online("ghost", true).expect_err("unknown id should fail");
        assert!(matches!(err, CollabError::NotFound { kind: "collaborator", .. }));
    }

    #[test]
    fn remote_update_for_unknown_collaborator_is_dropped() {
        let mut tracker = tracker_with("user-a", "Alice");
        tracker.apply_remote("ghost", true, Some("typing".to_string()));
        assert_eq!(tracker.roster().len(), 1);
    }

    #[test]
    fn roster_is_sorted_by_id() {
        let mut tracker = tracker_with("user-b", "Bob");
        tracker.upsert(Collaborator::new(
            "user-a",
            "Alice",
            "alice@example.com",
            CollaboratorRole::Owner,
        ));

        let ids: Vec<_> = tracker.roster().iter().map(|c| c.id.clone()).collect();
        assert_eq!(ids, ["user-a", "user-b"]);
    }
}
