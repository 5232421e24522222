use tracing::trace;

use super::EditCommand;
use crate::layout::{EdgeLayout, EditorState, NodeLayout, Point};
use crate::model::{Gender, Person, PersonId, PersonPatch, Relationship, RelationshipId};

#[derive(Debug, Clone, PartialEq)]
pub struct AddPersonCommand {
    person: Person,
    position: Point,
    generation: i32,
    inserted: bool,
}

impl AddPersonCommand {
    pub fn new(name: impl Into<String>, gender: Gender, position: Point, generation: i32) -> Self {
        Self::from_person(Person::new(crate::new_id(), name, gender), position, generation)
    }

    pub fn from_person(person: Person, position: Point, generation: i32) -> Self {
        Self {
            person,
            position,
            generation,
            inserted: false,
        }
    }

    pub fn with_id(mut self, id: impl Into<PersonId>) -> Self {
        self.person.id = id.into();
        self
    }

    pub fn person_id(&self) -> &str {
        &self.person.id
    }
}

impl EditCommand for AddPersonCommand {
    fn execute(&mut self, state: &mut EditorState) {
        let id = &self.person.id;
        if state.genogram.persons.contains_key(id) || state.layout.nodes.contains_key(id) {
            trace!(person = %id, "person already exists; add skipped");
            self.inserted = false;
            return;
        }

        let mut layout = NodeLayout::new(self.position, self.generation);
        layout.z_index = state.layout.max_z_index() + 1;

        state.genogram.persons.insert(id.clone(), self.person.clone());
        state.layout.nodes.insert(id.clone(), layout);
        state.genogram.touch();
        self.inserted = true;
    }

    fn undo(&mut self, state: &mut EditorState) {
        if !self.inserted {
            return;
        }
        state.genogram.persons.remove(&self.person.id);
        state.layout.nodes.remove(&self.person.id);
        state.genogram.touch();
        self.inserted = false;
    }

    fn description(&self) -> &str {
        "Add person"
    }
}

#[derive(Debug, Clone, PartialEq)]
struct DeletedPerson {
    person: Person,
    layout: Option<NodeLayout>,
    relationships: Vec<(RelationshipId, Relationship, Option<EdgeLayout>)>,
}

/// Deletes a person together with every relationship that references it.
/// Undo restores the person and all cascaded relationships and edges.
#[derive(Debug, Clone, PartialEq)]
pub struct DeletePersonCommand {
    person_id: PersonId,
    backup: Option<DeletedPerson>,
}

impl DeletePersonCommand {
    pub fn new(person_id: impl Into<PersonId>) -> Self {
        Self {
            person_id: person_id.into(),
            backup: None,
        }
    }

    pub fn person_id(&self) -> &str {
        &self.person_id
    }
}

impl EditCommand for DeletePersonCommand {
    fn execute(&mut self, state: &mut EditorState) {
        let Some(person) = state.genogram.persons.remove(&self.person_id) else {
            trace!(person = %self.person_id, "person missing; delete skipped");
            self.backup = None;
            return;
        };
        let layout = state.layout.nodes.remove(&self.person_id);

        let cascaded: Vec<String> = state
            .genogram
            .relationships_of(&self.person_id)
            .map(|(id, _)| id.clone())
            .collect();

        let mut relationships = Vec::with_capacity(cascaded.len());
        for id in cascaded {
            if let Some(relationship) = state.genogram.relationships.remove(&id) {
                let edge = state.layout.edges.remove(&id);
                relationships.push((id, relationship, edge));
            }
        }

        self.backup = Some(DeletedPerson {
            person,
            layout,
            relationships,
        });
        state.genogram.touch();
    }

    fn undo(&mut self, state: &mut EditorState) {
        let Some(backup) = self.backup.take() else {
            return;
        };

        state
            .genogram
            .persons
            .insert(self.person_id.clone(), backup.person);
        if let Some(layout) = backup.layout {
            state.layout.nodes.insert(self.person_id.clone(), layout);
        }
        for (id, relationship, edge) in backup.relationships {
            if let Some(edge) = edge {
                state.layout.edges.insert(id.clone(), edge);
            }
            state.genogram.relationships.insert(id, relationship);
        }
        state.genogram.touch();
    }

    fn description(&self) -> &str {
        "Delete person"
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdatePersonCommand {
    person_id: PersonId,
    patch: PersonPatch,
    previous: Option<PersonPatch>,
}

impl UpdatePersonCommand {
    pub fn new(person_id: impl Into<PersonId>, patch: PersonPatch) -> Self {
        Self {
            person_id: person_id.into(),
            patch,
            previous: None,
        }
    }

    pub fn can_merge(&self, other: &UpdatePersonCommand) -> bool {
        self.person_id == other.person_id
    }

    /// Newest values win; the oldest backup wins.
    pub fn merge(self, newer: UpdatePersonCommand) -> UpdatePersonCommand {
        let previous = match (self.previous, newer.previous) {
            (Some(oldest), Some(later)) => Some(later.overlay(oldest)),
            (oldest, later) => oldest.or(later),
        };
        UpdatePersonCommand {
            person_id: self.person_id,
            patch: self.patch.overlay(newer.patch),
            previous,
        }
    }
}

impl EditCommand for UpdatePersonCommand {
    fn execute(&mut self, state: &mut EditorState) {
        if self.patch.is_empty() {
            return;
        }
        let Some(person) = state.genogram.persons.get_mut(&self.person_id) else {
            trace!(person = %self.person_id, "person missing; update skipped");
            return;
        };
        self.previous = Some(self.patch.apply(person));
        state.genogram.touch();
    }

    fn undo(&mut self, state: &mut EditorState) {
        let Some(previous) = self.previous.take() else {
            return;
        };
        if let Some(person) = state.genogram.persons.get_mut(&self.person_id) {
            previous.apply(person);
            state.genogram.touch();
        }
    }

    fn description(&self) -> &str {
        "Edit person"
    }
}
