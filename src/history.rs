//! Undo/redo stacks over [`Command`]s.
//!
//! - executing a command clears the redo stack
//! - a command that can merge with the top of the undo stack replaces it
//!   instead of being pushed, unless [`History::end_gesture`] ran in between
//! - with `max_depth` set, the oldest entries are evicted first
//!
//! ```text
//! execute(c1) execute(c2) execute(c3)   undo: [c1, c2, c3]  redo: []
//! undo() undo()                         undo: [c1]          redo: [c3, c2]
//! execute(c4)                           undo: [c1, c4]      redo: []
//! ```

use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::commands::Command;
use crate::layout::EditorState;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HistoryConfig {
    /// Maximum number of undo steps kept. `None` or 0 keeps everything.
    pub max_depth: Option<usize>,
}

impl HistoryConfig {
    pub fn bounded(max_depth: usize) -> Self {
        Self {
            max_depth: Some(max_depth),
        }
    }
}

#[derive(Clone, Default)]
pub struct History {
    /// Newest at the back.
    undo_stack: VecDeque<Command>,
    /// Newest at the back.
    redo_stack: VecDeque<Command>,
    config: HistoryConfig,
    gesture_ended: bool,
}

impl fmt::Debug for History {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("History")
            .field("undo_depth", &self.undo_stack.len())
            .field("redo_depth", &self.redo_stack.len())
            .field("config", &self.config)
            .finish()
    }
}

impl History {
    pub fn new(config: HistoryConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &HistoryConfig {
        &self.config
    }

    /// Runs `command` against `state` and records it.
    pub fn execute(&mut self, mut command: Command, state: &mut EditorState) {
        command.execute(state);
        debug!(command = command.description(), "executed");
        self.redo_stack.clear();

        let merge_allowed = !std::mem::take(&mut self.gesture_ended);
        let command = match self.undo_stack.pop_back() {
            Some(top) if merge_allowed => match top.merge(command) {
                Ok(merged) => {
                    debug!(command = merged.description(), "merged into previous step");
                    merged
                }
                Err((top, command)) => {
                    self.undo_stack.push_back(top);
                    command
                }
            },
            Some(top) => {
                self.undo_stack.push_back(top);
                command
            }
            None => command,
        };

        self.undo_stack.push_back(command);
        self.enforce_depth();
    }

    /// Reverts the newest step. Returns its description.
    pub fn undo(&mut self, state: &mut EditorState) -> Option<String> {
        let mut command = self.undo_stack.pop_back()?;
        command.undo(state);
        let description = command.description().to_string();
        debug!(command = %description, "undone");
        self.redo_stack.push_back(command);
        self.gesture_ended = true;
        Some(description)
    }

    /// Re-applies the newest undone step. Returns its description.
    pub fn redo(&mut self, state: &mut EditorState) -> Option<String> {
        let mut command = self.redo_stack.pop_back()?;
        command.execute(state);
        let description = command.description().to_string();
        debug!(command = %description, "redone");
        self.undo_stack.push_back(command);
        self.gesture_ended = true;
        self.enforce_depth();
        Some(description)
    }

    /// Stops the next command from merging into the current top entry.
    pub fn end_gesture(&mut self) {
        self.gesture_ended = true;
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn next_undo_description(&self) -> Option<&str> {
        self.undo_stack.back().map(Command::description)
    }

    pub fn next_redo_description(&self) -> Option<&str> {
        self.redo_stack.back().map(Command::description)
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.gesture_ended = false;
    }

    fn enforce_depth(&mut self) {
        let Some(max_depth) = self.config.max_depth.filter(|depth| *depth > 0) else {
            return;
        };
        while self.undo_stack.len() > max_depth {
            if let Some(evicted) = self.undo_stack.pop_front() {
                debug!(command = evicted.description(), "evicted from history");
            }
        }
    }
}
