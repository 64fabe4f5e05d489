// Change application at raw character offsets.
//
// An insert splices its text at `position`; a delete removes `length`
// characters from `position`. Positions index the *current* local body and
// are never rebased against concurrently received changes, so replicas
// converge only when edits are non-overlapping and delivered in order.
// This is a documented limitation of the sync model, not an oversight; see
// DESIGN.md before "fixing" it.
//
// Malformed changes (negative position or length, out-of-bounds splice)
// are rejected without touching the body — partial application is
// forbidden.

use draftsync_common::types::{ChangeKind, ContentChange, ContentDocument};
use tracing::debug;

use crate::error::CollabError;
use crate::history::HistoryStack;

/// Validate a change against the current body without applying it.
///
/// Offsets count Unicode scalar values, not bytes.
pub fn validate_change(body: &str, change: &ContentChange) -> Result<(), CollabError> {
    if change.position < 0 {
        return Err(CollabError::malformed(format!("negative position {}", change.position)));
    }
    let position = change.position as usize;
    let body_len = body.chars().count();

    match change.kind {
        ChangeKind::Insert => {
            if change.content.is_none() {
                return Err(CollabError::malformed("insert change carries no content"));
            }
            if position > body_len {
                return Err(CollabError::malformed(format!(
                    "insert position {position} beyond body length {body_len}"
                )));
            }
        }
        ChangeKind::Delete => {
            let length = change
                .length
                .ok_or_else(|| CollabError::malformed("delete change carries no length"))?;
            if length < 0 {
                return Err(CollabError::malformed(format!("negative delete length {length}")));
            }
            let length = length as usize;
            if position > body_len || body_len - position < length {
                return Err(CollabError::malformed(format!(
                    "delete of {length} at {position} exceeds body length {body_len}"
                )));
            }
        }
        ChangeKind::Format => {
            if position > body_len {
                return Err(CollabError::malformed(format!(
                    "format position {position} beyond body length {body_len}"
                )));
            }
        }
    }
    Ok(())
}

/// Apply a change to a body, returning the new body.
///
/// Validates first; on error the input body is untouched (the function is
/// pure, so partial application cannot occur).
pub fn apply_change(body: &str, change: &ContentChange) -> Result<String, CollabError> {
    validate_change(body, change)?;
    let position = change.position as usize;

    match change.kind {
        ChangeKind::Insert => {
            let text = change.content.as_deref().unwrap_or_default();
            let at = byte_offset(body, position);
            let mut next = String::with_capacity(body.len() + text.len());
            next.push_str(&body[..at]);
            next.push_str(text);
            next.push_str(&body[at..]);
            Ok(next)
        }
        ChangeKind::Delete => {
            let length = change.length.unwrap_or_default() as usize;
            let start = byte_offset(body, position);
            let end = byte_offset(body, position + length);
            let mut next = String::with_capacity(body.len() - (end - start));
            next.push_str(&body[..start]);
            next.push_str(&body[end..]);
            Ok(next)
        }
        // Formatting is presentation-level metadata; the body is unchanged.
        ChangeKind::Format => Ok(body.to_string()),
    }
}

fn byte_offset(body: &str, char_offset: usize) -> usize {
    body.char_indices().nth(char_offset).map(|(at, _)| at).unwrap_or(body.len())
}

/// Per-session document state: the shared draft plus its local-edit
/// history. All body mutation funnels through here so the history stack's
/// invariants are never bypassed.
#[derive(Debug, Clone)]
pub struct SharedDraft {
    document: ContentDocument,
    history: HistoryStack,
}

impl SharedDraft {
    pub fn new(document: ContentDocument) -> Self {
        let history = HistoryStack::new(document.body.clone());
        Self { document, history }
    }

    pub fn document(&self) -> &ContentDocument {
        &self.document
    }

    pub fn body(&self) -> &str {
        &self.document.body
    }

    /// Optimistic local apply: mutate the body and record a snapshot.
    pub fn apply_local(&mut self, change: &ContentChange) -> Result<(), CollabError> {
        let next = apply_change(&self.document.body, change)?;
        self.document.body = next;
        self.history.record_snapshot(&self.document.body);
        Ok(())
    }

    /// Remote apply: mutate the body without recording history.
    ///
    /// The resulting body still becomes the baseline captured by the next
    /// local snapshot.
    pub fn apply_remote(&mut self, change: &ContentChange) -> Result<(), CollabError> {
        let next = apply_change(&self.document.body, change)?;
        debug!(
            change_id = %change.id,
            author = %change.author_id,
            "applied remote change"
        );
        self.document.body = next;
        Ok(())
    }

    /// Step the body back one local snapshot.
    pub fn undo(&mut self) -> Result<String, CollabError> {
        let body = self.history.undo()?.to_string();
        self.document.body = body.clone();
        Ok(body)
    }

    /// Step the body forward one local snapshot.
    pub fn redo(&mut self) -> Result<String, CollabError> {
        let body = self.history.redo()?.to_string();
        self.document.body = body.clone();
        Ok(body)
    }
}
