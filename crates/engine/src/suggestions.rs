// Bounded inbox of AI suggestions, plus the category merge rules.
//
// Retention is intentionally asymmetric with comments: only the most
// recent `cap` suggestions are kept (oldest dropped first), while comments
// grow unbounded for the life of the session.

use std::collections::VecDeque;

use draftsync_common::types::{AiSuggestion, SuggestionCategory};
use uuid::Uuid;

use crate::error::CollabError;

pub const DEFAULT_SUGGESTION_CAP: usize = 5;

/// How a suggestion payload merges into a document body.
///
/// Returns the fragment to append (separator included), or `None` for the
/// informational categories that never touch the body.
pub fn merge_fragment(category: SuggestionCategory, body: &str, payload: &str) -> Option<String> {
    match category {
        SuggestionCategory::Hashtag => {
            Some(if body.is_empty() { payload.to_string() } else { format!(" {payload}") })
        }
        SuggestionCategory::Content => {
            Some(if body.is_empty() { payload.to_string() } else { format!("\n\n{payload}") })
        }
        SuggestionCategory::Timing | SuggestionCategory::Style => None,
    }
}

#[derive(Debug, Clone)]
pub struct SuggestionInbox {
    entries: VecDeque<AiSuggestion>,
    cap: usize,
}

impl SuggestionInbox {
    pub fn new(cap: usize) -> Self {
        Self { entries: VecDeque::with_capacity(cap), cap: cap.max(1) }
    }

    /// Suggestions in arrival order, oldest first.
    pub fn suggestions(&self) -> impl Iterator<Item = &AiSuggestion> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, id: Uuid) -> Option<&AiSuggestion> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    /// Append a batch, dropping oldest entries beyond the cap.
    pub fn receive(&mut self, suggestions: Vec<AiSuggestion>) {
        for suggestion in suggestions {
            // The channel echoes our own batches back with `applied: false`;
            // a known id keeps its stored entry — `applied` is permanent.
            if self.entries.iter().any(|entry| entry.id == suggestion.id) {
                continue;
            }
            self.entries.push_back(suggestion);
        }
        while self.entries.len() > self.cap {
            self.entries.pop_front();
        }
    }

    /// Flip `applied` for a suggestion. Applying is consume-once: a second
    /// call fails with `AlreadyApplied` and changes nothing.
    pub fn mark_applied(&mut self, id: Uuid) -> Result<&AiSuggestion, CollabError> {
        let entry = self
            .entries
            .iter_mut()
            .find(|entry| entry.id == id)
            .ok_or_else(|| CollabError::not_found("suggestion", id))?;
        if entry.applied {
            return Err(CollabError::AlreadyApplied(id));
        }
        entry.applied = true;
        Ok(entry)
    }
}

impl Default for SuggestionInbox {
    fn default() -> Self {
        Self::new(DEFAULT_SUGGESTION_CAP)
    }
}

#[cfg(test)]
mod tests {
    use draftsync_common::types::{AiSuggestion, SuggestionCategory};
    use uuid::Uuid;

    use super::{merge_fragment, SuggestionInbox};
    use crate::error::CollabError;

    fn suggestion(category: SuggestionCategory, payload: &str) -> AiSuggestion {
        AiSuggestion {
            id: Uuid::new_v4(),
            category,
            title: "Suggestion".to_string(),
            description: "From the insights service".to_string(),
            payload: payload.to_string(),
            confidence: 0.8,
            applied: false,
        }
    }

    #[test]
    fn hashtag_fragment_appends_as_trailing_tags() {
        assert_eq!(
            merge_fragment(SuggestionCategory::Hashtag, "Launch day", "#AI #Tech").as_deref(),
            Some(" #AI #Tech")
        );
        assert_eq!(
            merge_fragment(SuggestionCategory::Hashtag, "", "#AI").as_deref(),
            Some("#AI")
        );
    }

    #[test]
    fn content_fragment_appends_as_new_paragraph() {
        assert_eq!(
            merge_fragment(SuggestionCategory::Content, "Intro", "More detail.").as_deref(),
            Some("\n\nMore detail.")
        );
    }

    #[test]
    fn timing_and_style_are_informational_only() {
        assert_eq!(merge_fragment(SuggestionCategory::Timing, "Body", "9am"), None);
        assert_eq!(merge_fragment(SuggestionCategory::Style, "Body", "shorter"), None);
    }

    #[test]
    fn inbox_keeps_only_most_recent_entries() {
        let mut inbox = SuggestionInbox::new(3);
        let batch: Vec<_> =
            (0..5).map(|n| suggestion(SuggestionCategory::Content, &format!("s{n}"))).collect();
        let oldest = batch[0].id;
        let newest = batch[4].id;

        inbox.receive(batch);

        assert_eq!(inbox.len(), 3);
        assert!(inbox.get(oldest).is_none());
        assert!(inbox.get(newest).is_some());
    }

    #[test]
    fn redelivered_suggestion_keeps_the_stored_entry() {
        let mut inbox = SuggestionInbox::default();
        let entry = suggestion(SuggestionCategory::Hashtag, "#AI");
        let id = entry.id;
        inbox.receive(vec![entry.clone()]);
        inbox.mark_applied(id).expect("apply");

        // The same batch arrives again, carrying the unapplied copy.
        inbox.receive(vec![entry]);

        assert_eq!(inbox.len(), 1);
        assert!(inbox.get(id).expect("entry").applied);
    }

    #[test]
    fn apply_is_consume_once() {
        let mut inbox = SuggestionInbox::default();
        let entry = suggestion(SuggestionCategory::Hashtag, "#AI");
        let id = entry.id;
        inbox.receive(vec![entry]);

        assert!(inbox.mark_applied(id).expect("first apply").applied);
        assert_eq!(inbox.mark_applied(id), Err(CollabError::AlreadyApplied(id)));
    }

    #[test]
    fn unknown_suggestion_is_not_found() {
        let mut inbox = SuggestionInbox::default();
        let err = inbox.mark_applied(Uuid::new_v4()).expect_err("unknown id should fail");
        assert!(matches!(err, CollabError::NotFound { kind: "suggestion", .. }));
    }
}
