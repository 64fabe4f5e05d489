// Per-session comment log.
//
// Comments are ordered by insertion (equivalently by timestamp, which is
// assigned monotonically at creation) and grow unbounded within a session
// — unlike suggestions, which are capped. Replies nest under their parent
// and are never broadcast as top-level comments.

use draftsync_common::types::Comment;
use uuid::Uuid;

use crate::error::CollabError;

#[derive(Debug, Clone, Default)]
pub struct CommentLog {
    comments: Vec<Comment>,
}

impl CommentLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Top-level comments in insertion order.
    pub fn comments(&self) -> &[Comment] {
        &self.comments
    }

    /// Append a top-level comment.
    pub fn add(&mut self, comment: Comment) {
        self.comments.push(comment);
    }

    /// Append a reply to the parent's reply list. The parent may itself be
    /// a reply.
    pub fn add_reply(&mut self, parent_id: Uuid, reply: Comment) -> Result<(), CollabError> {
        let parent = find_mut(&mut self.comments, parent_id)
            .ok_or_else(|| CollabError::not_found("comment", parent_id))?;
        parent.replies.push(reply);
        Ok(())
    }

    /// Set the resolved flag. Idempotent: returns whether the flag changed.
    pub fn set_resolved(&mut self, id: Uuid, resolved: bool) -> Result<bool, CollabError> {
        let comment = find_mut(&mut self.comments, id)
            .ok_or_else(|| CollabError::not_found("comment", id))?;
        let changed = comment.resolved != resolved;
        comment.resolved = resolved;
        Ok(changed)
    }

    pub fn get(&self, id: Uuid) -> Option<&Comment> {
        find(&self.comments, id)
    }
}

fn find_mut(comments: &mut [Comment], id: Uuid) -> Option<&mut Comment> {
    for comment in comments {
        if comment.id == id {
            return Some(comment);
        }
        if let Some(found) = find_mut(&mut comment.replies, id) {
            return Some(found);
        }
    }
    None
}

fn find(comments: &[Comment], id: Uuid) -> Option<&Comment> {
    for comment in comments {
        if comment.id == id {
            return Some(comment);
        }
        if let Some(found) = find(&comment.replies, id) {
            return Some(found);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use draftsync_common::types::Comment;
    use uuid::Uuid;

    use super::CommentLog;
    use crate::error::CollabError;

    #[test]
    fn resolve_then_reopen_leaves_comment_unresolved() {
        let mut log = CommentLog::new();
        let comment = Comment::new("user-a", "A", "Nice!", Some(3));
        let id = comment.id;
        log.add(comment);

        assert!(log.set_resolved(id, true).expect("resolve should succeed"));
        assert!(log.set_resolved(id, false).expect("reopen should succeed"));
        assert!(!log.get(id).expect("comment should exist").resolved);
    }

    #[test]
    fn resolve_is_idempotent() {
        let mut log = CommentLog::new();
        let comment = Comment::new("user-a", "A", "Nice!", None);
        let id = comment.id;
        log.add(comment);

        assert!(log.set_resolved(id, true).expect("first resolve"));
        assert!(!log.set_resolved(id, true).expect("second resolve is a no-op"));
    }

    #[test]
    fn resolving_unknown_comment_is_not_found() {
        let mut log = CommentLog::new();
        let err = log.set_resolved(Uuid::new_v4(), true).expect_err("unknown id should fail");
        assert!(matches!(err, CollabError::NotFound { kind: "comment", .. }));
    }

    #[test]
    fn replies_nest_without_growing_top_level_count() {
        let mut log = CommentLog::new();
        let parent = Comment::new("user-a", "A", "Thoughts?", None);
        let parent_id = parent.id;
        log.add(parent);

        log.add_reply(parent_id, Comment::new("user-b", "B", "Love it", None))
            .expect("reply should attach");

        assert_eq!(log.comments().len(), 1);
        assert_eq!(log.comments()[0].replies.len(), 1);
        assert_eq!(log.comments()[0].replies[0].text, "Love it");
    }

    #[test]
    fn nested_replies_are_reachable_by_id() {
        let mut log = CommentLog::new();
        let parent = Comment::new("user-a", "A", "Thoughts?", None);
        let parent_id = parent.id;
        log.add(parent);

        let reply = Comment::new("user-b", "B", "Love it", None);
        let reply_id = reply.id;
        log.add_reply(parent_id, reply).expect("reply should attach");
        log.add_reply(reply_id, Comment::new("user-a", "A", "Thanks", None))
            .expect("nested reply should attach");

        assert!(log.set_resolved(reply_id, true).expect("reply should resolve"));
    }
}
