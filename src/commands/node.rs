use std::collections::BTreeMap;

use tracing::trace;

use super::EditCommand;
use crate::engine::{LayoutConfig, LayoutEngine};
use crate::layout::{EditorState, Point};
use crate::model::PersonId;

/// Moves one node. Consecutive moves of the same node merge, keeping the
/// position from before the first move.
#[derive(Debug, Clone, PartialEq)]
pub struct MoveNodeCommand {
    node_id: PersonId,
    position: Point,
    previous: Option<Point>,
}

impl MoveNodeCommand {
    pub fn new(node_id: impl Into<PersonId>, position: Point) -> Self {
        Self {
            node_id: node_id.into(),
            position,
            previous: None,
        }
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub fn can_merge(&self, other: &MoveNodeCommand) -> bool {
        self.node_id == other.node_id
    }

    pub fn merge(self, newer: MoveNodeCommand) -> MoveNodeCommand {
        MoveNodeCommand {
            node_id: self.node_id,
            position: newer.position,
            previous: self.previous.or(newer.previous),
        }
    }
}

impl EditCommand for MoveNodeCommand {
    fn execute(&mut self, state: &mut EditorState) {
        let Some(node) = state.layout.nodes.get_mut(&self.node_id) else {
            trace!(node = %self.node_id, "node missing; move skipped");
            return;
        };
        let previous = std::mem::replace(&mut node.position, self.position);
        self.previous.get_or_insert(previous);
        state.genogram.touch();
    }

    fn undo(&mut self, state: &mut EditorState) {
        let Some(previous) = self.previous.take() else {
            return;
        };
        if let Some(node) = state.layout.nodes.get_mut(&self.node_id) {
            node.position = previous;
            state.genogram.touch();
        }
    }

    fn description(&self) -> &str {
        "Move person"
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MoveMultipleNodesCommand {
    moves: BTreeMap<PersonId, Point>,
    previous: BTreeMap<PersonId, Point>,
}

impl MoveMultipleNodesCommand {
    pub fn new(moves: BTreeMap<PersonId, Point>) -> Self {
        Self {
            moves,
            previous: BTreeMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }
}

impl EditCommand for MoveMultipleNodesCommand {
    /// Nodes missing from the layout are skipped; the rest still move.
    fn execute(&mut self, state: &mut EditorState) {
        self.previous.clear();
        for (id, position) in &self.moves {
            match state.layout.nodes.get_mut(id) {
                Some(node) => {
                    let previous = std::mem::replace(&mut node.position, *position);
                    self.previous.insert(id.clone(), previous);
                }
                None => trace!(node = %id, "node missing; move skipped"),
            }
        }
        if !self.previous.is_empty() {
            state.genogram.touch();
        }
    }

    fn undo(&mut self, state: &mut EditorState) {
        let previous = std::mem::take(&mut self.previous);
        if previous.is_empty() {
            return;
        }
        for (id, position) in previous {
            if let Some(node) = state.layout.nodes.get_mut(&id) {
                node.position = position;
            }
        }
        state.genogram.touch();
    }

    fn description(&self) -> &str {
        "Move selection"
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SetNodeVisibilityCommand {
    node_id: PersonId,
    visible: bool,
    previous: Option<bool>,
}

impl SetNodeVisibilityCommand {
    pub fn new(node_id: impl Into<PersonId>, visible: bool) -> Self {
        Self {
            node_id: node_id.into(),
            visible,
            previous: None,
        }
    }
}

impl EditCommand for SetNodeVisibilityCommand {
    fn execute(&mut self, state: &mut EditorState) {
        let Some(node) = state.layout.nodes.get_mut(&self.node_id) else {
            trace!(node = %self.node_id, "node missing; visibility change skipped");
            return;
        };
        self.previous = Some(std::mem::replace(&mut node.visible, self.visible));
        state.genogram.touch();
    }

    fn undo(&mut self, state: &mut EditorState) {
        let Some(previous) = self.previous.take() else {
            return;
        };
        if let Some(node) = state.layout.nodes.get_mut(&self.node_id) {
            node.visible = previous;
            state.genogram.touch();
        }
    }

    fn description(&self) -> &str {
        if self.visible { "Show person" } else { "Hide person" }
    }
}

/// Re-lays out every node by generation row. Undo restores each node's
/// previous position.
#[derive(Debug, Clone, PartialEq)]
pub struct AutoLayoutCommand {
    config: LayoutConfig,
    previous: BTreeMap<PersonId, Point>,
}

impl AutoLayoutCommand {
    pub fn new(config: LayoutConfig) -> Self {
        Self {
            config,
            previous: BTreeMap::new(),
        }
    }
}

impl EditCommand for AutoLayoutCommand {
    fn execute(&mut self, state: &mut EditorState) {
        if state.layout.nodes.is_empty() {
            trace!("no nodes; auto layout skipped");
            return;
        }
        self.previous = state
            .layout
            .nodes
            .iter()
            .map(|(id, node)| (id.clone(), node.position))
            .collect();
        LayoutEngine::new(self.config).auto_layout_by_generation(&mut state.layout);
        state.genogram.touch();
    }

    fn undo(&mut self, state: &mut EditorState) {
        let previous = std::mem::take(&mut self.previous);
        if previous.is_empty() {
            return;
        }
        for (id, position) in previous {
            if let Some(node) = state.layout.nodes.get_mut(&id) {
                node.position = position;
            }
        }
        state.genogram.touch();
    }

    fn description(&self) -> &str {
        "Auto layout"
    }
}
