use tracing::trace;

use super::EditCommand;
use crate::engine::LayoutEngine;
use crate::layout::{EdgeLayout, EdgeStyle, EditorState, Point};
use crate::model::{
    ChildRelationship, ChildStatus, EmotionalRelationship, EmotionalStatus, PartnerRelationship,
    PartnerStatus, PersonId, Relationship, RelationshipId,
};

fn endpoints_exist(state: &EditorState, relationship: &Relationship) -> bool {
    let persons = &state.genogram.persons;
    persons.contains_key(relationship.source_id()) && persons.contains_key(relationship.target_id())
}

/// Inserts the relationship and its edge together. Returns false, leaving
/// the state alone, when an endpoint is missing or the ID is taken.
fn insert_relationship(state: &mut EditorState, relationship: &Relationship, edge: EdgeLayout) -> bool {
    let id = relationship.id();
    if !endpoints_exist(state, relationship) {
        trace!(relationship = %id, "endpoint missing; add skipped");
        return false;
    }
    if state.genogram.relationships.contains_key(id) || state.layout.edges.contains_key(id) {
        trace!(relationship = %id, "relationship already exists; add skipped");
        return false;
    }

    state
        .genogram
        .relationships
        .insert(id.to_string(), relationship.clone());
    state.layout.edges.insert(id.to_string(), edge);
    state.genogram.touch();
    true
}

fn remove_relationship(state: &mut EditorState, id: &str) {
    let removed_relationship = state.genogram.relationships.remove(id).is_some();
    let removed_edge = state.layout.edges.remove(id).is_some();
    if removed_relationship || removed_edge {
        state.genogram.touch();
    }
}

/// Adds a partner relationship whose edge carries a virtual anchor at the
/// midpoint of the two partners.
#[derive(Debug, Clone, PartialEq)]
pub struct AddPartnerRelationshipCommand {
    relationship: Relationship,
    source_position: Point,
    target_position: Point,
    inserted: bool,
}

impl AddPartnerRelationshipCommand {
    pub fn new(
        source_id: impl Into<PersonId>,
        target_id: impl Into<PersonId>,
        status: PartnerStatus,
        source_position: Point,
        target_position: Point,
    ) -> Self {
        Self {
            relationship: Relationship::Partner(PartnerRelationship {
                id: crate::new_id(),
                source_id: source_id.into(),
                target_id: target_id.into(),
                status,
            }),
            source_position,
            target_position,
            inserted: false,
        }
    }

    pub fn with_id(mut self, id: impl Into<RelationshipId>) -> Self {
        if let Relationship::Partner(partner) = &mut self.relationship {
            partner.id = id.into();
        }
        self
    }

    pub fn relationship_id(&self) -> &str {
        self.relationship.id()
    }
}

impl EditCommand for AddPartnerRelationshipCommand {
    fn execute(&mut self, state: &mut EditorState) {
        let engine = LayoutEngine::default();
        let mut edge = EdgeLayout::new(
            engine.calculate_edge_path(self.source_position, self.target_position, false),
            EdgeStyle::with_line(self.relationship.line_kind()),
        );
        edge.virtual_anchor =
            Some(engine.calculate_virtual_anchor(self.source_position, self.target_position));

        self.inserted = insert_relationship(state, &self.relationship, edge);
    }

    fn undo(&mut self, state: &mut EditorState) {
        if std::mem::take(&mut self.inserted) {
            remove_relationship(state, self.relationship.id());
        }
    }

    fn description(&self) -> &str {
        "Add partner relationship"
    }
}

/// Adds a parent-to-child relationship routed as a vertical elbow. When it
/// descends from a partner relationship with a virtual anchor, the edge starts
/// at that anchor instead of the parent.
#[derive(Debug, Clone, PartialEq)]
pub struct AddChildRelationshipCommand {
    relationship: Relationship,
    parent_position: Point,
    child_position: Point,
    inserted: bool,
}

impl AddChildRelationshipCommand {
    pub fn new(
        parent_id: impl Into<PersonId>,
        child_id: impl Into<PersonId>,
        status: ChildStatus,
        parent_position: Point,
        child_position: Point,
    ) -> Self {
        Self {
            relationship: Relationship::Child(ChildRelationship {
                id: crate::new_id(),
                source_id: parent_id.into(),
                target_id: child_id.into(),
                status,
                parent_relationship_id: None,
            }),
            parent_position,
            child_position,
            inserted: false,
        }
    }

    pub fn with_id(mut self, id: impl Into<RelationshipId>) -> Self {
        if let Relationship::Child(child) = &mut self.relationship {
            child.id = id.into();
        }
        self
    }

    pub fn with_parent_relationship(mut self, partner_id: impl Into<RelationshipId>) -> Self {
        if let Relationship::Child(child) = &mut self.relationship {
            child.parent_relationship_id = Some(partner_id.into());
        }
        self
    }

    pub fn relationship_id(&self) -> &str {
        self.relationship.id()
    }
}

impl EditCommand for AddChildRelationshipCommand {
    fn execute(&mut self, state: &mut EditorState) {
        let anchor = match &self.relationship {
            Relationship::Child(child) => child
                .parent_relationship_id
                .as_ref()
                .and_then(|partner_id| state.layout.edges.get(partner_id))
                .and_then(|edge| edge.virtual_anchor),
            _ => None,
        };
        let start = anchor.unwrap_or(self.parent_position);

        let edge = EdgeLayout::new(
            LayoutEngine::default().calculate_edge_path(start, self.child_position, true),
            EdgeStyle::with_line(self.relationship.line_kind()),
        );

        self.inserted = insert_relationship(state, &self.relationship, edge);
    }

    fn undo(&mut self, state: &mut EditorState) {
        if std::mem::take(&mut self.inserted) {
            remove_relationship(state, self.relationship.id());
        }
    }

    fn description(&self) -> &str {
        "Add child relationship"
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AddEmotionalRelationshipCommand {
    relationship: Relationship,
    source_position: Point,
    target_position: Point,
    inserted: bool,
}

impl AddEmotionalRelationshipCommand {
    pub fn new(
        source_id: impl Into<PersonId>,
        target_id: impl Into<PersonId>,
        status: EmotionalStatus,
        source_position: Point,
        target_position: Point,
    ) -> Self {
        Self {
            relationship: Relationship::Emotional(EmotionalRelationship {
                id: crate::new_id(),
                source_id: source_id.into(),
                target_id: target_id.into(),
                status,
            }),
            source_position,
            target_position,
            inserted: false,
        }
    }

    pub fn with_id(mut self, id: impl Into<RelationshipId>) -> Self {
        if let Relationship::Emotional(emotional) = &mut self.relationship {
            emotional.id = id.into();
        }
        self
    }

    pub fn relationship_id(&self) -> &str {
        self.relationship.id()
    }
}

impl EditCommand for AddEmotionalRelationshipCommand {
    fn execute(&mut self, state: &mut EditorState) {
        let edge = EdgeLayout::new(
            LayoutEngine::default().calculate_edge_path(
                self.source_position,
                self.target_position,
                false,
            ),
            EdgeStyle::with_line(self.relationship.line_kind()),
        );

        self.inserted = insert_relationship(state, &self.relationship, edge);
    }

    fn undo(&mut self, state: &mut EditorState) {
        if std::mem::take(&mut self.inserted) {
            remove_relationship(state, self.relationship.id());
        }
    }

    fn description(&self) -> &str {
        "Add emotional relationship"
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteRelationshipCommand {
    relationship_id: RelationshipId,
    backup: Option<(Relationship, EdgeLayout)>,
}

impl DeleteRelationshipCommand {
    pub fn new(relationship_id: impl Into<RelationshipId>) -> Self {
        Self {
            relationship_id: relationship_id.into(),
            backup: None,
        }
    }

    pub fn relationship_id(&self) -> &str {
        &self.relationship_id
    }
}

impl EditCommand for DeleteRelationshipCommand {
    fn execute(&mut self, state: &mut EditorState) {
        let id = &self.relationship_id;
        if !state.genogram.relationships.contains_key(id) || !state.layout.edges.contains_key(id) {
            trace!(relationship = %id, "relationship or edge missing; delete skipped");
            self.backup = None;
            return;
        }

        let relationship = state.genogram.relationships.remove(id);
        let edge = state.layout.edges.remove(id);
        self.backup = relationship.zip(edge);
        state.genogram.touch();
    }

    fn undo(&mut self, state: &mut EditorState) {
        let Some((relationship, edge)) = self.backup.take() else {
            return;
        };
        state
            .genogram
            .relationships
            .insert(self.relationship_id.clone(), relationship);
        state.layout.edges.insert(self.relationship_id.clone(), edge);
        state.genogram.touch();
    }

    fn description(&self) -> &str {
        "Delete relationship"
    }
}
