use crate::model::preferences::Preferences;

/// Default number of undo steps kept
pub const HISTORY_LIMIT: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HistoryError {
    #[error("nothing to undo or redo")]
    Empty,
}

/// Where the history sits in its linear timeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryState {
    /// No redo available
    Clean,
    /// At least one undone snapshot can be redone
    AfterUndo,
}

/// Linear undo/redo over full preference snapshots.
///
/// Entries are owned clones, so later edits to the live state never reach
/// back into the stacks.
#[derive(Debug)]
pub struct History {
    undo: Vec<Preferences>,
    redo: Vec<Preferences>,
    limit: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new(HISTORY_LIMIT)
    }
}

impl History {
    pub fn new(limit: usize) -> Self {
        History {
            undo: Vec::new(),
            redo: Vec::new(),
            limit: limit.max(1),
        }
    }

    /// Record the state as it was before a committed action. Clears redo.
    pub fn commit(&mut self, before: Preferences) {
        self.undo.push(before);
        self.trim();
        self.redo.clear();
    }

    /// Step back: returns the snapshot to apply and keeps `current` for redo.
    pub fn undo(&mut self, current: Preferences) -> Result<Preferences, HistoryError> {
        let snapshot = self.undo.pop().ok_or(HistoryError::Empty)?;
        self.redo.push(current);
        Ok(snapshot)
    }

    /// Step forward again: returns the snapshot to apply and keeps `current`
    /// for undo.
    pub fn redo(&mut self, current: Preferences) -> Result<Preferences, HistoryError> {
        let snapshot = self.redo.pop().ok_or(HistoryError::Empty)?;
        self.undo.push(current);
        self.trim();
        Ok(snapshot)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn state(&self) -> HistoryState {
        if self.redo.is_empty() {
            HistoryState::Clean
        } else {
            HistoryState::AfterUndo
        }
    }

    fn trim(&mut self) {
        if self.undo.len() > self.limit {
            self.undo.drain(..self.undo.len() - self.limit);
        }
    }
}
