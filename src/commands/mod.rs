//! Reversible mutations of an [`EditorState`].
//!
//! Every change to a genogram goes through a command. A command captures
//! whatever it needs to reverse itself while executing, so:
//!
//! - `undo` after `execute` restores the prior state (except
//!   `metadata.updated_at`, which only moves forward)
//! - `execute` after `undo` reproduces the executed state
//! - a command whose target is missing leaves the state untouched
//!
//! Drag-style commands ([`MoveNodeCommand`], [`UpdateEdgePathCommand`],
//! [`UpdatePersonCommand`], ...) can merge with a later command on the same
//! target, keeping the oldest backup and the newest value, so a whole gesture
//! is a single undo step.

mod annotation;
mod edge;
mod family_tree;
mod node;
mod person;
mod relationship;

pub use annotation::{
    AddTextAnnotationCommand, DeleteTextAnnotationCommand, MoveTextAnnotationCommand,
    UpdateTextAnnotationCommand,
};
pub use edge::{
    SetArrowDirectionCommand, SetEdgeLabelCommand, UpdateEdgePathCommand, UpdateEdgeStyleCommand,
};
pub use family_tree::{AddFamilyTreeCommand, DeleteFamilyTreeCommand, SetFamilyTreeMemberCommand};
pub use node::{
    AutoLayoutCommand, MoveMultipleNodesCommand, MoveNodeCommand, SetNodeVisibilityCommand,
};
pub use person::{AddPersonCommand, DeletePersonCommand, UpdatePersonCommand};
pub use relationship::{
    AddChildRelationshipCommand, AddEmotionalRelationshipCommand, AddPartnerRelationshipCommand,
    DeleteRelationshipCommand,
};

use crate::layout::EditorState;

/// Shared interface of every command struct.
pub trait EditCommand {
    fn execute(&mut self, state: &mut EditorState);

    fn undo(&mut self, state: &mut EditorState);

    /// Short label for history UI, e.g. "Move person".
    fn description(&self) -> &str;
}

/// Runs child commands in order and undoes them in reverse.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchCommand {
    label: String,
    commands: Vec<Command>,
}

impl BatchCommand {
    pub fn new(label: impl Into<String>, commands: Vec<Command>) -> Self {
        Self {
            label: label.into(),
            commands,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }
}

impl EditCommand for BatchCommand {
    fn execute(&mut self, state: &mut EditorState) {
        for command in &mut self.commands {
            command.execute(state);
        }
    }

    fn undo(&mut self, state: &mut EditorState) {
        for command in self.commands.iter_mut().rev() {
            command.undo(state);
        }
    }

    fn description(&self) -> &str {
        &self.label
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    AddPerson(AddPersonCommand),
    DeletePerson(DeletePersonCommand),
    UpdatePerson(UpdatePersonCommand),
    MoveNode(MoveNodeCommand),
    MoveMultipleNodes(MoveMultipleNodesCommand),
    SetNodeVisibility(SetNodeVisibilityCommand),
    AutoLayout(AutoLayoutCommand),
    AddPartnerRelationship(AddPartnerRelationshipCommand),
    AddChildRelationship(AddChildRelationshipCommand),
    AddEmotionalRelationship(AddEmotionalRelationshipCommand),
    DeleteRelationship(DeleteRelationshipCommand),
    UpdateEdgeStyle(UpdateEdgeStyleCommand),
    UpdateEdgePath(UpdateEdgePathCommand),
    SetArrowDirection(SetArrowDirectionCommand),
    SetEdgeLabel(SetEdgeLabelCommand),
    AddTextAnnotation(AddTextAnnotationCommand),
    UpdateTextAnnotation(UpdateTextAnnotationCommand),
    MoveTextAnnotation(MoveTextAnnotationCommand),
    DeleteTextAnnotation(DeleteTextAnnotationCommand),
    AddFamilyTree(AddFamilyTreeCommand),
    DeleteFamilyTree(DeleteFamilyTreeCommand),
    SetFamilyTreeMember(SetFamilyTreeMemberCommand),
    Batch(BatchCommand),
}

macro_rules! dispatch {
    ($command:expr, $inner:ident => $body:expr) => {
        match $command {
            Command::AddPerson($inner) => $body,
            Command::DeletePerson($inner) => $body,
            Command::UpdatePerson($inner) => $body,
            Command::MoveNode($inner) => $body,
            Command::MoveMultipleNodes($inner) => $body,
            Command::SetNodeVisibility($inner) => $body,
            Command::AutoLayout($inner) => $body,
            Command::AddPartnerRelationship($inner) => $body,
            Command::AddChildRelationship($inner) => $body,
            Command::AddEmotionalRelationship($inner) => $body,
            Command::DeleteRelationship($inner) => $body,
            Command::UpdateEdgeStyle($inner) => $body,
            Command::UpdateEdgePath($inner) => $body,
            Command::SetArrowDirection($inner) => $body,
            Command::SetEdgeLabel($inner) => $body,
            Command::AddTextAnnotation($inner) => $body,
            Command::UpdateTextAnnotation($inner) => $body,
            Command::MoveTextAnnotation($inner) => $body,
            Command::DeleteTextAnnotation($inner) => $body,
            Command::AddFamilyTree($inner) => $body,
            Command::DeleteFamilyTree($inner) => $body,
            Command::SetFamilyTreeMember($inner) => $body,
            Command::Batch($inner) => $body,
        }
    };
}

impl EditCommand for Command {
    fn execute(&mut self, state: &mut EditorState) {
        dispatch!(self, command => command.execute(state))
    }

    fn undo(&mut self, state: &mut EditorState) {
        dispatch!(self, command => command.undo(state))
    }

    fn description(&self) -> &str {
        dispatch!(self, command => command.description())
    }
}

impl Command {
    pub fn execute(&mut self, state: &mut EditorState) {
        EditCommand::execute(self, state)
    }

    pub fn undo(&mut self, state: &mut EditorState) {
        EditCommand::undo(self, state)
    }

    pub fn description(&self) -> &str {
        EditCommand::description(self)
    }

    /// True when `other` targets the same entity with the same kind of
    /// continuous edit.
    pub fn can_merge(&self, other: &Command) -> bool {
        match (self, other) {
            (Command::MoveNode(a), Command::MoveNode(b)) => a.can_merge(b),
            (Command::UpdateEdgePath(a), Command::UpdateEdgePath(b)) => a.can_merge(b),
            (Command::UpdatePerson(a), Command::UpdatePerson(b)) => a.can_merge(b),
            (Command::UpdateTextAnnotation(a), Command::UpdateTextAnnotation(b)) => a.can_merge(b),
            (Command::MoveTextAnnotation(a), Command::MoveTextAnnotation(b)) => a.can_merge(b),
            _ => false,
        }
    }

    /// Folds `newer` into `self`. Hands both back unchanged when they cannot
    /// merge.
    pub fn merge(self, newer: Command) -> Result<Command, (Command, Command)> {
        if !self.can_merge(&newer) {
            return Err((self, newer));
        }
        match (self, newer) {
            (Command::MoveNode(a), Command::MoveNode(b)) => Ok(Command::MoveNode(a.merge(b))),
            (Command::UpdateEdgePath(a), Command::UpdateEdgePath(b)) => {
                Ok(Command::UpdateEdgePath(a.merge(b)))
            }
            (Command::UpdatePerson(a), Command::UpdatePerson(b)) => {
                Ok(Command::UpdatePerson(a.merge(b)))
            }
            (Command::UpdateTextAnnotation(a), Command::UpdateTextAnnotation(b)) => {
                Ok(Command::UpdateTextAnnotation(a.merge(b)))
            }
            (Command::MoveTextAnnotation(a), Command::MoveTextAnnotation(b)) => {
                Ok(Command::MoveTextAnnotation(a.merge(b)))
            }
            (older, newer) => Err((older, newer)),
        }
    }
}

macro_rules! impl_from_command {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        $(
            impl From<$ty> for Command {
                fn from(command: $ty) -> Self {
                    Command::$variant(command)
                }
            }
        )*
    };
}

impl_from_command!(
    AddPerson(AddPersonCommand),
    DeletePerson(DeletePersonCommand),
    UpdatePerson(UpdatePersonCommand),
    MoveNode(MoveNodeCommand),
    MoveMultipleNodes(MoveMultipleNodesCommand),
    SetNodeVisibility(SetNodeVisibilityCommand),
    AutoLayout(AutoLayoutCommand),
    AddPartnerRelationship(AddPartnerRelationshipCommand),
    AddChildRelationship(AddChildRelationshipCommand),
    AddEmotionalRelationship(AddEmotionalRelationshipCommand),
    DeleteRelationship(DeleteRelationshipCommand),
    UpdateEdgeStyle(UpdateEdgeStyleCommand),
    UpdateEdgePath(UpdateEdgePathCommand),
    SetArrowDirection(SetArrowDirectionCommand),
    SetEdgeLabel(SetEdgeLabelCommand),
    AddTextAnnotation(AddTextAnnotationCommand),
    UpdateTextAnnotation(UpdateTextAnnotationCommand),
    MoveTextAnnotation(MoveTextAnnotationCommand),
    DeleteTextAnnotation(DeleteTextAnnotationCommand),
    AddFamilyTree(AddFamilyTreeCommand),
    DeleteFamilyTree(DeleteFamilyTreeCommand),
    SetFamilyTreeMember(SetFamilyTreeMemberCommand),
    Batch(BatchCommand),
);


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::layout::Point;

    #[test]
    fn move_chain_merges_into_first_previous_and_last_target() {
        let mut state = state_with_people(&[("a", 0.0, 0.0)]);
        let mut merged: Option<Command> = None;

        for step in 1..=5 {
            let mut next: Command =
                MoveNodeCommand::new("a", Point::new(step as f32 * 10.0, 0.0)).into();
            next.execute(&mut state);
            merged = Some(match merged.take() {
                None => next,
                Some(older) => older.merge(next).unwrap(),
            });
        }

        let mut merged = merged.unwrap();
        assert_eq!(state.layout.nodes["a"].position, Point::new(50.0, 0.0));
        merged.undo(&mut state);
        assert_eq!(state.layout.nodes["a"].position, Point::new(0.0, 0.0));
        merged.execute(&mut state);
        assert_eq!(state.layout.nodes["a"].position, Point::new(50.0, 0.0));
    }

    #[test]
    fn different_targets_do_not_merge() {
        let a: Command = MoveNodeCommand::new("a", Point::new(1.0, 1.0)).into();
        let b: Command = MoveNodeCommand::new("b", Point::new(1.0, 1.0)).into();
        assert!(!a.can_merge(&b));
        let (a, b) = a.merge(b).unwrap_err();
        assert_eq!(a.description(), "Move person");
        assert_eq!(b.description(), "Move person");

        let label: Command = SetEdgeLabelCommand::new("e", Some("x".into())).into();
        let path: Command = UpdateEdgePathCommand::new("e", vec![]).into();
        assert!(!label.can_merge(&path));
    }

    #[test]
    fn batch_undoes_in_reverse_order() {
        let mut state = state_with_people(&[("a", 0.0, 0.0), ("b", 100.0, 0.0)]);
        let mut partner = AddPartnerRelationshipCommand::new(
            "a",
            "b",
            crate::model::PartnerStatus::Married,
            Point::new(0.0, 0.0),
            Point::new(100.0, 0.0),
        )
        .with_id("r1");
        let batch = BatchCommand::new(
            "Delete selection",
            vec![
                DeleteRelationshipCommand::new("r1").into(),
                DeletePersonCommand::new("a").into(),
            ],
        );

        partner.execute(&mut state);
        assert_reversible(&mut state, batch.into());
    }
}
