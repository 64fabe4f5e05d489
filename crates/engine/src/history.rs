// Linear undo/redo over full-body snapshots.
//
// The stack records local edits only; remote applies do not push entries,
// but the body they produce becomes the baseline captured by the next
// local snapshot. Invariant: `0 <= index < entries.len()` (the stack is
// never empty — it is seeded with the initial body).

use crate::error::CollabError;

#[derive(Debug, Clone)]
pub struct HistoryStack {
    entries: Vec<String>,
    index: usize,
}

impl HistoryStack {
    pub fn new(initial_body: impl Into<String>) -> Self {
        Self { entries: vec![initial_body.into()], index: 0 }
    }

    /// Snapshot at the current index.
    pub fn current(&self) -> &str {
        &self.entries[self.index]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Record a new snapshot if it differs from the current one.
    ///
    /// Any "future" entries beyond the current index (left by undos) are
    /// truncated before appending, so redo reachability resets.
    pub fn record_snapshot(&mut self, body: &str) {
        if self.entries[self.index] == body {
            return;
        }
        self.entries.truncate(self.index + 1);
        self.entries.push(body.to_string());
        self.index = self.entries.len() - 1;
    }

    /// Step back one snapshot. Fails with `NoHistory` at the lower bound.
    pub fn undo(&mut self) -> Result<&str, CollabError> {
        if self.index == 0 {
            return Err(CollabError::NoHistory);
        }
        self.index -= 1;
        Ok(&self.entries[self.index])
    }

    /// Step forward one snapshot. Fails with `NoHistory` at the upper bound.
    pub fn redo(&mut self) -> Result<&str, CollabError> {
        if self.index + 1 >= self.entries.len() {
            return Err(CollabError::NoHistory);
        }
        self.index += 1;
        Ok(&self.entries[self.index])
    }
}
