// Per-client collaboration engine.
//
// One `CollabEngine` lives inside each dashboard client. It owns the
// session registry, presence roster, and per-session document state, and
// is driven by a single-threaded event model: UI calls and inbound channel
// events are handled one at a time, so no internal locking is needed.
//
// Every operation that peers must observe publishes an envelope through
// the outbound channel. A failed publish surfaces `ChannelUnavailable` but
// keeps the already-applied local state: missed broadcasts are not resent
// on reconnect (accepted at-most-once loss window).

use std::collections::HashMap;

use chrono::Utc;
use draftsync_common::protocol::{
    CollabMessage, CollabPayload, Envelope, StartCollaboration, SuggestionBatch,
};
use draftsync_common::types::{
    AiSuggestion, CollaborationSession, Collaborator, Comment, ContentChange, ContentDocument,
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::channel::OutboundChannel;
use crate::comments::CommentLog;
use crate::error::CollabError;
use crate::presence::PresenceTracker;
use crate::propagation::SharedDraft;
use crate::session::SessionRegistry;
use crate::suggestions::{merge_fragment, SuggestionInbox, DEFAULT_SUGGESTION_CAP};

/// Events drained by the engine's run loop.
#[derive(Debug)]
pub enum EngineEvent {
    /// An envelope delivered by the external channel.
    Channel(Envelope),
    /// Suggestions produced by a locally issued insights request.
    SuggestionsReady { session_id: Uuid, suggestions: Vec<AiSuggestion> },
}

/// Per-session content state, destroyed with the session.
#[derive(Debug)]
struct SessionState {
    draft: SharedDraft,
    comments: CommentLog,
    suggestions: SuggestionInbox,
}

pub struct CollabEngine<C: OutboundChannel> {
    local_id: String,
    registry: SessionRegistry,
    presence: PresenceTracker,
    states: HashMap<Uuid, SessionState>,
    outbound: C,
    suggestion_cap: usize,
}

impl<C: OutboundChannel> CollabEngine<C> {
    pub fn new(local: Collaborator, outbound: C) -> Self {
        let local_id = local.id.clone();
        let mut presence = PresenceTracker::new();
        presence.upsert(local);
        Self {
            local_id,
            registry: SessionRegistry::new(),
            presence,
            states: HashMap::new(),
            outbound,
            suggestion_cap: DEFAULT_SUGGESTION_CAP,
        }
    }

    pub fn with_suggestion_cap(mut self, cap: usize) -> Self {
        self.suggestion_cap = cap.max(1);
        self
    }

    pub fn local_id(&self) -> &str {
        &self.local_id
    }

    pub fn presence(&self) -> &PresenceTracker {
        &self.presence
    }

    // ── Session registry ────────────────────────────────────────────

    /// Start a collaboration session for a draft and announce it.
    ///
    /// Fails with `AlreadyActive` if the content already has a live
    /// session. On `ChannelUnavailable` the session exists locally; it can
    /// be found via [`active_session_for`](Self::active_session_for).
    pub fn start_session(
        &mut self,
        content_id: &str,
        title: &str,
        platform: &str,
        body: &str,
        participants: Vec<Collaborator>,
    ) -> Result<Uuid, CollabError> {
        let mut summaries: Vec<_> = participants.iter().map(Collaborator::summary).collect();
        if !summaries.iter().any(|p| p.id == self.local_id) {
            if let Some(local) = self.presence.get(&self.local_id) {
                summaries.insert(0, local.summary());
            }
        }
        for participant in participants {
            self.presence.upsert(participant);
        }

        let session = self.registry.start(content_id, summaries.clone(), Utc::now())?;
        let session_id = session.id;
        let document = ContentDocument {
            title: title.to_string(),
            body: body.to_string(),
            platform: platform.to_string(),
        };
        self.states.insert(
            session_id,
            SessionState {
                draft: SharedDraft::new(document),
                comments: CommentLog::new(),
                suggestions: SuggestionInbox::new(self.suggestion_cap),
            },
        );

        info!(%session_id, content_id, "collaboration session started");
        self.outbound.publish(Envelope::StartCollaboration(StartCollaboration {
            session_id,
            content_id: content_id.to_string(),
            title: title.to_string(),
            content: body.to_string(),
            platform: platform.to_string(),
            collaborators: summaries,
        }))?;
        Ok(session_id)
    }

    /// End a session and announce it. Idempotent: ending an unknown or
    /// already-ended session is a no-op, and no further local broadcasts
    /// happen for it (messages already in flight are not retracted).
    pub fn end_session(&mut self, session_id: Uuid) -> Result<(), CollabError> {
        let Some(ended) = self.registry.end(session_id) else {
            return Ok(());
        };
        self.states.remove(&session_id);
        info!(%session_id, content_id = %ended.content_id, "collaboration session ended");
        self.outbound.publish(Envelope::EndCollaboration { session_id })
    }

    pub fn get_session(&self, session_id: Uuid) -> Result<&CollaborationSession, CollabError> {
        self.registry.get(session_id)
    }

    pub fn active_session_for(&self, content_id: &str) -> Option<&CollaborationSession> {
        self.registry.active_for(content_id)
    }

    pub fn document(&self, session_id: Uuid) -> Result<&ContentDocument, CollabError> {
        Ok(self.state(session_id)?.draft.document())
    }

    pub fn comments(&self, session_id: Uuid) -> Result<&[Comment], CollabError> {
        Ok(self.state(session_id)?.comments.comments())
    }

    pub fn suggestions(&self, session_id: Uuid) -> Result<Vec<&AiSuggestion>, CollabError> {
        Ok(self.state(session_id)?.suggestions.suggestions().collect())
    }

    // ── Presence ────────────────────────────────────────────────────

    /// Flip a collaborator's online flag and notify their sessions.
    pub fn set_online(&mut self, collaborator_id: &str, online: bool) -> Result<(), CollabError> {
        let activity = self.presence.set_online(collaborator_id, online)?.activity.clone();
        self.broadcast_presence(collaborator_id, online, activity)
    }

    /// Update a collaborator's current-activity label and notify their
    /// sessions.
    pub fn set_activity(
        &mut self,
        collaborator_id: &str,
        activity: Option<String>,
    ) -> Result<(), CollabError> {
        let online = self.presence.set_activity(collaborator_id, activity.clone())?.online;
        self.broadcast_presence(collaborator_id, online, activity)
    }

    fn broadcast_presence(
        &mut self,
        collaborator_id: &str,
        online: bool,
        activity: Option<String>,
    ) -> Result<(), CollabError> {
        // Best-effort, unacknowledged: a reconnect simply re-announces.
        for session_id in self.registry.sessions_with_participant(collaborator_id) {
            self.outbound.publish(Envelope::CollaborationMessage(CollabMessage {
                session_id,
                payload: CollabPayload::UserActivity {
                    collaborator_id: collaborator_id.to_string(),
                    online,
                    activity: activity.clone(),
                },
            }))?;
        }
        Ok(())
    }

    // ── Change propagation ──────────────────────────────────────────

    /// Optimistic local apply plus broadcast.
    ///
    /// Viewer-role local collaborators may not edit. Malformed changes are
    /// rejected without touching the document.
    pub fn apply_local_change(
        &mut self,
        session_id: Uuid,
        change: ContentChange,
    ) -> Result<(), CollabError> {
        if let Some(local) = self.presence.get(&self.local_id) {
            if !local.role.can_edit() {
                return Err(CollabError::Forbidden {
                    collaborator_id: self.local_id.clone(),
                    role: local.role,
                });
            }
        }

        let state = self.state_mut(session_id)?;
        state.draft.apply_local(&change)?;
        self.registry.touch(session_id, Utc::now());

        self.outbound.publish(Envelope::CollaborationMessage(CollabMessage {
            session_id,
            payload: CollabPayload::ContentChange { change },
        }))
    }

    /// Apply a change received from the channel, unless we authored it.
    ///
    /// Echo suppression: the channel repeats our own broadcasts back to us;
    /// reapplying them would double every local edit.
    pub fn receive_remote_change(
        &mut self,
        session_id: Uuid,
        change: ContentChange,
    ) -> Result<(), CollabError> {
        let is_echo = change.author_id == self.local_id;
        let state = self.state_mut(session_id)?;
        if is_echo {
            debug!(change_id = %change.id, "suppressed echo of own change");
            return Ok(());
        }
        state.draft.apply_remote(&change)?;
        self.registry.touch(session_id, Utc::now());
        Ok(())
    }

    // ── Comments ────────────────────────────────────────────────────

    /// Append a top-level comment and broadcast it. Any role may comment.
    pub fn add_comment(
        &mut self,
        session_id: Uuid,
        author_id: &str,
        text: &str,
        anchor: Option<i64>,
    ) -> Result<Comment, CollabError> {
        let author_name = self
            .presence
            .get(author_id)
            .map(|c| c.name.clone())
            .unwrap_or_else(|| author_id.to_string());

        let state = self.state_mut(session_id)?;
        let comment = Comment::new(author_id, author_name, text, anchor);
        state.comments.add(comment.clone());
        self.registry.touch(session_id, Utc::now());

        self.outbound.publish(Envelope::CollaborationMessage(CollabMessage {
            session_id,
            payload: CollabPayload::CommentAdded { comment: comment.clone() },
        }))?;
        Ok(comment)
    }

    /// Append a reply under a parent comment. Replies are not broadcast as
    /// top-level comments.
    pub fn add_reply(
        &mut self,
        session_id: Uuid,
        parent_id: Uuid,
        author_id: &str,
        text: &str,
    ) -> Result<Comment, CollabError> {
        let author_name = self
            .presence
            .get(author_id)
            .map(|c| c.name.clone())
            .unwrap_or_else(|| author_id.to_string());

        let state = self.state_mut(session_id)?;
        let reply = Comment::new(author_id, author_name, text, None);
        state.comments.add_reply(parent_id, reply.clone())?;
        self.registry.touch(session_id, Utc::now());
        Ok(reply)
    }

    /// Mark a comment resolved. Idempotent.
    pub fn resolve_comment(
        &mut self,
        session_id: Uuid,
        comment_id: Uuid,
    ) -> Result<(), CollabError> {
        self.state_mut(session_id)?.comments.set_resolved(comment_id, true)?;
        Ok(())
    }

    /// Reopen a resolved comment. Idempotent.
    pub fn reopen_comment(
        &mut self,
        session_id: Uuid,
        comment_id: Uuid,
    ) -> Result<(), CollabError> {
        self.state_mut(session_id)?.comments.set_resolved(comment_id, false)?;
        Ok(())
    }

    // ── Suggestions ─────────────────────────────────────────────────

    /// Take delivery of a locally requested suggestion batch and broadcast
    /// it to the session.
    pub fn receive_suggestions(
        &mut self,
        session_id: Uuid,
        suggestions: Vec<AiSuggestion>,
    ) -> Result<(), CollabError> {
        let state = self.state_mut(session_id)?;
        state.suggestions.receive(suggestions.clone());
        self.registry.touch(session_id, Utc::now());

        self.outbound
            .publish(Envelope::AiSuggestions(SuggestionBatch { session_id, suggestions }))
    }

    /// Merge a suggestion into the draft and broadcast the application.
    ///
    /// Consume-once: re-applying fails with `AlreadyApplied` and leaves the
    /// body unchanged. The merge goes through the same apply path as edits,
    /// so the history stack records it like any local change.
    pub fn apply_suggestion(
        &mut self,
        session_id: Uuid,
        suggestion_id: Uuid,
    ) -> Result<(), CollabError> {
        let local_id = self.local_id.clone();
        let local_name = self
            .presence
            .get(&local_id)
            .map(|c| c.name.clone())
            .unwrap_or_else(|| local_id.clone());

        let state = self.state_mut(session_id)?;
        let (category, payload) = {
            let suggestion = state
                .suggestions
                .get(suggestion_id)
                .ok_or_else(|| CollabError::not_found("suggestion", suggestion_id))?;
            if suggestion.applied {
                return Err(CollabError::AlreadyApplied(suggestion_id));
            }
            (suggestion.category, suggestion.payload.clone())
        };

        if let Some(fragment) = merge_fragment(category, state.draft.body(), &payload) {
            let position = state.draft.body().chars().count() as i64;
            let change = ContentChange::insert(local_id, local_name, position, fragment);
            state.draft.apply_local(&change)?;
        }
        state.suggestions.mark_applied(suggestion_id)?;
        self.registry.touch(session_id, Utc::now());

        self.outbound.publish(Envelope::CollaborationMessage(CollabMessage {
            session_id,
            payload: CollabPayload::SuggestionApplied {
                suggestion_id,
                applied_by: self.local_id.clone(),
                category,
                payload,
            },
        }))
    }

    // ── History ─────────────────────────────────────────────────────

    /// Step the draft back one local snapshot and return the new body.
    pub fn undo(&mut self, session_id: Uuid) -> Result<String, CollabError> {
        self.state_mut(session_id)?.draft.undo()
    }

    /// Step the draft forward one local snapshot and return the new body.
    pub fn redo(&mut self, session_id: Uuid) -> Result<String, CollabError> {
        self.state_mut(session_id)?.draft.redo()
    }

    // ── Event loop ──────────────────────────────────────────────────

    /// Drain inbound events one at a time until the queue closes.
    ///
    /// Rejected events are logged and skipped; a bad remote message must
    /// not take the editor down.
    pub async fn run(&mut self, mut inbound: mpsc::UnboundedReceiver<EngineEvent>) {
        while let Some(event) = inbound.recv().await {
            if let Err(error) = self.handle_event(event) {
                warn!(%error, "inbound collaboration event rejected");
            }
        }
        debug!("inbound event queue closed, engine loop exiting");
    }

    pub fn handle_event(&mut self, event: EngineEvent) -> Result<(), CollabError> {
        match event {
            EngineEvent::Channel(envelope) => self.handle_inbound(envelope),
            EngineEvent::SuggestionsReady { session_id, suggestions } => {
                self.receive_suggestions(session_id, suggestions)
            }
        }
    }

    /// Dispatch one envelope delivered by the channel.
    pub fn handle_inbound(&mut self, envelope: Envelope) -> Result<(), CollabError> {
        match envelope {
            Envelope::StartCollaboration(payload) => self.adopt_remote_session(payload),
            Envelope::EndCollaboration { session_id } => {
                if self.registry.end(session_id).is_some() {
                    self.states.remove(&session_id);
                    info!(%session_id, "remote peer ended collaboration session");
                }
                Ok(())
            }
            Envelope::CollaborationMessage(message) => self.handle_collab_message(message),
            Envelope::AiSuggestions(batch) => {
                // Peer-originated batch: append only. The sender already
                // broadcast it; re-publishing would loop forever.
                let state = self.state_mut(batch.session_id)?;
                state.suggestions.receive(batch.suggestions);
                self.registry.touch(batch.session_id, Utc::now());
                Ok(())
            }
        }
    }

    fn handle_collab_message(&mut self, message: CollabMessage) -> Result<(), CollabError> {
        let session_id = message.session_id;
        match message.payload {
            CollabPayload::ContentChange { change } => {
                self.receive_remote_change(session_id, change)
            }
            CollabPayload::CommentAdded { comment } => {
                let is_echo = comment.author_id == self.local_id;
                let state = self.state_mut(session_id)?;
                if is_echo {
                    return Ok(());
                }
                state.comments.add(comment);
                self.registry.touch(session_id, Utc::now());
                Ok(())
            }
            CollabPayload::SuggestionApplied { suggestion_id, applied_by, category, payload } => {
                if applied_by == self.local_id {
                    return Ok(());
                }
                let state = self.state_mut(session_id)?;
                if let Some(fragment) = merge_fragment(category, state.draft.body(), &payload) {
                    let position = state.draft.body().chars().count() as i64;
                    let change = ContentChange::insert(
                        applied_by.clone(),
                        applied_by,
                        position,
                        fragment,
                    );
                    state.draft.apply_remote(&change)?;
                }
                // The suggestion may have rolled out of our bounded inbox
                // or already be flagged; either way the merge stands.
                match state.suggestions.mark_applied(suggestion_id) {
                    Ok(_) | Err(CollabError::AlreadyApplied(_)) => {}
                    Err(CollabError::NotFound { .. }) => {
                        debug!(%suggestion_id, "applied suggestion not in local inbox")
                    }
                    Err(other) => return Err(other),
                }
                self.registry.touch(session_id, Utc::now());
                Ok(())
            }
            CollabPayload::UserActivity { collaborator_id, online, activity } => {
                if collaborator_id != self.local_id {
                    self.presence.apply_remote(&collaborator_id, online, activity);
                }
                Ok(())
            }
        }
    }

    fn adopt_remote_session(&mut self, payload: StartCollaboration) -> Result<(), CollabError> {
        let session = CollaborationSession {
            id: payload.session_id,
            content_id: payload.content_id.clone(),
            participants: payload.collaborators.clone(),
            active: true,
            created_at: Utc::now(),
            last_activity_at: Utc::now(),
        };
        if !self.registry.adopt(session) {
            debug!(
                session_id = %payload.session_id,
                content_id = %payload.content_id,
                "ignoring remote session start for content with a live session"
            );
            return Ok(());
        }

        for summary in &payload.collaborators {
            if self.presence.get(&summary.id).is_none() {
                let mut collaborator = Collaborator::from_summary(summary);
                collaborator.online = true;
                self.presence.upsert(collaborator);
            }
        }

        let document = ContentDocument {
            title: payload.title,
            body: payload.content,
            platform: payload.platform,
        };
        self.states.insert(
            payload.session_id,
            SessionState {
                draft: SharedDraft::new(document),
                comments: CommentLog::new(),
                suggestions: SuggestionInbox::new(self.suggestion_cap),
            },
        );
        info!(session_id = %payload.session_id, "adopted remote collaboration session");
        Ok(())
    }

    fn state(&self, session_id: Uuid) -> Result<&SessionState, CollabError> {
        self.states.get(&session_id).ok_or_else(|| CollabError::not_found("session", session_id))
    }

    fn state_mut(&mut self, session_id: Uuid) -> Result<&mut SessionState, CollabError> {
        self.states
            .get_mut(&session_id)
            .ok_or_else(|| CollabError::not_found("session", session_id))
    }
}
