use std::collections::BTreeMap;

use tracing::trace;

use super::EditCommand;
use crate::layout::EditorState;
use crate::model::{FamilyTree, FamilyTreeNode, PersonId};

#[derive(Debug, Clone, PartialEq)]
pub struct AddFamilyTreeCommand {
    tree: FamilyTree,
    inserted: bool,
}

impl AddFamilyTreeCommand {
    /// Starts a tree containing only its root person at generation 0.
    pub fn new(name: impl Into<String>, root_person_id: impl Into<PersonId>) -> Self {
        let root_person_id = root_person_id.into();
        let nodes = BTreeMap::from([(
            root_person_id.clone(),
            FamilyTreeNode::new(root_person_id.clone(), 0),
        )]);
        Self {
            tree: FamilyTree {
                id: crate::new_id(),
                name: name.into(),
                root_person_id,
                nodes,
            },
            inserted: false,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.tree.id = id.into();
        self
    }

    pub fn tree_id(&self) -> &str {
        &self.tree.id
    }
}

impl EditCommand for AddFamilyTreeCommand {
    fn execute(&mut self, state: &mut EditorState) {
        let id = &self.tree.id;
        if state.genogram.family_trees.contains_key(id) {
            trace!(tree = %id, "family tree already exists; add skipped");
            self.inserted = false;
            return;
        }
        if !state.genogram.persons.contains_key(&self.tree.root_person_id) {
            trace!(tree = %id, root = %self.tree.root_person_id, "root person missing; add skipped");
            self.inserted = false;
            return;
        }
        state.genogram.family_trees.insert(id.clone(), self.tree.clone());
        state.genogram.touch();
        self.inserted = true;
    }

    fn undo(&mut self, state: &mut EditorState) {
        if std::mem::take(&mut self.inserted) {
            state.genogram.family_trees.remove(&self.tree.id);
            state.genogram.touch();
        }
    }

    fn description(&self) -> &str {
        "Add family tree"
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteFamilyTreeCommand {
    tree_id: String,
    backup: Option<FamilyTree>,
}

impl DeleteFamilyTreeCommand {
    pub fn new(tree_id: impl Into<String>) -> Self {
        Self {
            tree_id: tree_id.into(),
            backup: None,
        }
    }
}

impl EditCommand for DeleteFamilyTreeCommand {
    fn execute(&mut self, state: &mut EditorState) {
        self.backup = state.genogram.family_trees.remove(&self.tree_id);
        match self.backup {
            Some(_) => state.genogram.touch(),
            None => trace!(tree = %self.tree_id, "family tree missing; delete skipped"),
        }
    }

    fn undo(&mut self, state: &mut EditorState) {
        if let Some(tree) = self.backup.take() {
            state.genogram.family_trees.insert(self.tree_id.clone(), tree);
            state.genogram.touch();
        }
    }

    fn description(&self) -> &str {
        "Delete family tree"
    }
}

/// Inserts, replaces or (with `None`) removes one member of a family tree.
#[derive(Debug, Clone, PartialEq)]
pub struct SetFamilyTreeMemberCommand {
    tree_id: String,
    person_id: PersonId,
    node: Option<FamilyTreeNode>,
    previous: Option<Option<FamilyTreeNode>>,
}

impl SetFamilyTreeMemberCommand {
    pub fn new(
        tree_id: impl Into<String>,
        person_id: impl Into<PersonId>,
        node: Option<FamilyTreeNode>,
    ) -> Self {
        Self {
            tree_id: tree_id.into(),
            person_id: person_id.into(),
            node,
            previous: None,
        }
    }
}

impl EditCommand for SetFamilyTreeMemberCommand {
    fn execute(&mut self, state: &mut EditorState) {
        let Some(tree) = state.genogram.family_trees.get_mut(&self.tree_id) else {
            trace!(tree = %self.tree_id, "family tree missing; member update skipped");
            return;
        };
        let previous = match &self.node {
            Some(node) => tree.nodes.insert(self.person_id.clone(), node.clone()),
            None => tree.nodes.remove(&self.person_id),
        };
        if previous.is_none() && self.node.is_none() {
            return;
        }
        self.previous = Some(previous);
        state.genogram.touch();
    }

    fn undo(&mut self, state: &mut EditorState) {
        let Some(previous) = self.previous.take() else {
            return;
        };
        let Some(tree) = state.genogram.family_trees.get_mut(&self.tree_id) else {
            return;
        };
        match previous {
            Some(node) => {
                tree.nodes.insert(self.person_id.clone(), node);
            }
            None => {
                tree.nodes.remove(&self.person_id);
            }
        }
        state.genogram.touch();
    }

    fn description(&self) -> &str {
        "Edit family tree"
    }
}
