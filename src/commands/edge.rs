use tracing::trace;

use super::EditCommand;
use crate::layout::{ArrowDirection, EdgeStylePatch, EditorState, Point};
use crate::model::RelationshipId;

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateEdgeStyleCommand {
    edge_id: RelationshipId,
    patch: EdgeStylePatch,
    previous: Option<EdgeStylePatch>,
}

impl UpdateEdgeStyleCommand {
    pub fn new(edge_id: impl Into<RelationshipId>, patch: EdgeStylePatch) -> Self {
        Self {
            edge_id: edge_id.into(),
            patch,
            previous: None,
        }
    }
}

impl EditCommand for UpdateEdgeStyleCommand {
    fn execute(&mut self, state: &mut EditorState) {
        if self.patch.is_empty() {
            return;
        }
        let Some(edge) = state.layout.edges.get_mut(&self.edge_id) else {
            trace!(edge = %self.edge_id, "edge missing; style update skipped");
            return;
        };
        self.previous = Some(self.patch.apply(&mut edge.style));
        state.genogram.touch();
    }

    fn undo(&mut self, state: &mut EditorState) {
        let Some(previous) = self.previous.take() else {
            return;
        };
        if let Some(edge) = state.layout.edges.get_mut(&self.edge_id) {
            previous.apply(&mut edge.style);
            state.genogram.touch();
        }
    }

    fn description(&self) -> &str {
        "Edit line style"
    }
}

/// Replaces the waypoint list of an edge. Consecutive updates on the same
/// edge merge, so a drag is one undo step.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateEdgePathCommand {
    edge_id: RelationshipId,
    points: Vec<Point>,
    previous: Option<Vec<Point>>,
}

impl UpdateEdgePathCommand {
    pub fn new(edge_id: impl Into<RelationshipId>, points: Vec<Point>) -> Self {
        Self {
            edge_id: edge_id.into(),
            points,
            previous: None,
        }
    }

    pub fn can_merge(&self, other: &UpdateEdgePathCommand) -> bool {
        self.edge_id == other.edge_id
    }

    pub fn merge(self, newer: UpdateEdgePathCommand) -> UpdateEdgePathCommand {
        UpdateEdgePathCommand {
            edge_id: self.edge_id,
            points: newer.points,
            previous: self.previous.or(newer.previous),
        }
    }
}

impl EditCommand for UpdateEdgePathCommand {
    fn execute(&mut self, state: &mut EditorState) {
        let Some(edge) = state.layout.edges.get_mut(&self.edge_id) else {
            trace!(edge = %self.edge_id, "edge missing; path update skipped");
            return;
        };
        let previous = std::mem::replace(&mut edge.points, self.points.clone());
        self.previous.get_or_insert(previous);
        state.genogram.touch();
    }

    fn undo(&mut self, state: &mut EditorState) {
        let Some(previous) = self.previous.take() else {
            return;
        };
        if let Some(edge) = state.layout.edges.get_mut(&self.edge_id) {
            edge.points = previous;
            state.genogram.touch();
        }
    }

    fn description(&self) -> &str {
        "Edit line path"
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SetArrowDirectionCommand {
    edge_id: RelationshipId,
    arrow: ArrowDirection,
    previous: Option<ArrowDirection>,
}

impl SetArrowDirectionCommand {
    pub fn new(edge_id: impl Into<RelationshipId>, arrow: ArrowDirection) -> Self {
        Self {
            edge_id: edge_id.into(),
            arrow,
            previous: None,
        }
    }
}

impl EditCommand for SetArrowDirectionCommand {
    fn execute(&mut self, state: &mut EditorState) {
        let Some(edge) = state.layout.edges.get_mut(&self.edge_id) else {
            trace!(edge = %self.edge_id, "edge missing; arrow update skipped");
            return;
        };
        self.previous = Some(std::mem::replace(&mut edge.arrow, self.arrow));
        state.genogram.touch();
    }

    fn undo(&mut self, state: &mut EditorState) {
        let Some(previous) = self.previous.take() else {
            return;
        };
        if let Some(edge) = state.layout.edges.get_mut(&self.edge_id) {
            edge.arrow = previous;
            state.genogram.touch();
        }
    }

    fn description(&self) -> &str {
        "Change arrow direction"
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SetEdgeLabelCommand {
    edge_id: RelationshipId,
    label: Option<String>,
    previous: Option<Option<String>>,
}

impl SetEdgeLabelCommand {
    pub fn new(edge_id: impl Into<RelationshipId>, label: Option<String>) -> Self {
        Self {
            edge_id: edge_id.into(),
            label: label.filter(|text| !text.trim().is_empty()),
            previous: None,
        }
    }
}

impl EditCommand for SetEdgeLabelCommand {
    fn execute(&mut self, state: &mut EditorState) {
        let Some(edge) = state.layout.edges.get_mut(&self.edge_id) else {
            trace!(edge = %self.edge_id, "edge missing; label update skipped");
            return;
        };
        self.previous = Some(std::mem::replace(&mut edge.label, self.label.clone()));
        state.genogram.touch();
    }

    fn undo(&mut self, state: &mut EditorState) {
        let Some(previous) = self.previous.take() else {
            return;
        };
        if let Some(edge) = state.layout.edges.get_mut(&self.edge_id) {
            edge.label = previous;
            state.genogram.touch();
        }
    }

    fn description(&self) -> &str {
        "Edit line label"
    }
}
