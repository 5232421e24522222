use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use tracing::debug;

use crate::boundary::{Boundary, family_tree_boundary};
use crate::commands::{
    AddChildRelationshipCommand, AddEmotionalRelationshipCommand, AddPartnerRelationshipCommand,
    AddPersonCommand, AutoLayoutCommand, BatchCommand, Command, DeletePersonCommand,
    DeleteRelationshipCommand, DeleteTextAnnotationCommand, MoveMultipleNodesCommand,
    MoveNodeCommand,
};
use crate::config::EditorConfig;
use crate::engine::LayoutEngine;
use crate::error::Result;
use crate::history::History;
use crate::keyboard::{KeyInput, ShortcutAction, resolve_shortcut};
use crate::layout::{EditorState, Point, Rect};
use crate::model::{ChildStatus, EmotionalStatus, Gender, Genogram, PartnerStatus};
use crate::serialization;

type ChangeListener = Box<dyn FnMut(&EditorState, u64)>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub nodes: BTreeSet<String>,
    pub edges: BTreeSet<String>,
    pub annotations: BTreeSet<String>,
}

impl Selection {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty() && self.annotations.is_empty()
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.edges.clear();
        self.annotations.clear();
    }

    fn retain_existing(&mut self, state: &EditorState) {
        self.nodes.retain(|id| state.layout.nodes.contains_key(id));
        self.edges.retain(|id| state.layout.edges.contains_key(id));
        self.annotations
            .retain(|id| state.genogram.text_annotations.contains_key(id));
    }
}

/// Owns a document and routes every change through the undo history.
pub struct Editor {
    state: EditorState,
    history: History,
    engine: LayoutEngine,
    config: EditorConfig,
    selection: Selection,
    listeners: Vec<ChangeListener>,
    revision: u64,
}

impl fmt::Debug for Editor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Editor")
            .field("state", &self.state)
            .field("history", &self.history)
            .field("selection", &self.selection)
            .field("listeners", &self.listeners.len())
            .field("revision", &self.revision)
            .finish()
    }
}

impl Default for Editor {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}

impl Editor {
    pub fn new(config: EditorConfig) -> Self {
        Self::with_state(EditorState::new(Genogram::default()), config)
    }

    pub fn with_state(state: EditorState, config: EditorConfig) -> Self {
        Self {
            state,
            history: History::new(config.history),
            engine: LayoutEngine::new(config.layout),
            config,
            selection: Selection::default(),
            listeners: Vec::new(),
            revision: 0,
        }
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn genogram(&self) -> &Genogram {
        &self.state.genogram
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn engine(&self) -> &LayoutEngine {
        &self.engine
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Bumped after every change to the state.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Registers a callback run after every change, with the new revision.
    pub fn on_change(&mut self, listener: impl FnMut(&EditorState, u64) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    fn notify(&mut self) {
        self.revision += 1;
        for listener in &mut self.listeners {
            listener(&self.state, self.revision);
        }
    }

    pub fn execute(&mut self, command: impl Into<Command>) {
        self.history.execute(command.into(), &mut self.state);
        self.notify();
    }

    pub fn undo(&mut self) -> Option<String> {
        let description = self.history.undo(&mut self.state)?;
        self.selection.retain_existing(&self.state);
        self.notify();
        Some(description)
    }

    pub fn redo(&mut self) -> Option<String> {
        let description = self.history.redo(&mut self.state)?;
        self.selection.retain_existing(&self.state);
        self.notify();
        Some(description)
    }

    pub fn end_gesture(&mut self) {
        self.history.end_gesture();
    }

    pub fn add_person(
        &mut self,
        name: impl Into<String>,
        gender: Gender,
        position: Point,
        generation: i32,
    ) -> String {
        let command = AddPersonCommand::new(name, gender, position, generation);
        let id = command.person_id().to_string();
        self.execute(command);
        self.end_gesture();
        id
    }

    /// Partner edge between two placed persons. `None` when either has no
    /// node layout.
    pub fn add_partner(&mut self, source_id: &str, target_id: &str, status: PartnerStatus) -> Option<String> {
        let source = self.state.layout.position_of(source_id)?;
        let target = self.state.layout.position_of(target_id)?;
        let command = AddPartnerRelationshipCommand::new(source_id, target_id, status, source, target);
        let id = command.relationship_id().to_string();
        self.execute(command);
        self.end_gesture();
        Some(id)
    }

    pub fn add_child(
        &mut self,
        parent_id: &str,
        child_id: &str,
        status: ChildStatus,
        parent_relationship_id: Option<&str>,
    ) -> Option<String> {
        let parent = self.state.layout.position_of(parent_id)?;
        let child = self.state.layout.position_of(child_id)?;
        let mut command = AddChildRelationshipCommand::new(parent_id, child_id, status, parent, child);
        if let Some(partner_id) = parent_relationship_id {
            command = command.with_parent_relationship(partner_id);
        }
        let id = command.relationship_id().to_string();
        self.execute(command);
        self.end_gesture();
        Some(id)
    }

    pub fn add_emotional(
        &mut self,
        source_id: &str,
        target_id: &str,
        status: EmotionalStatus,
    ) -> Option<String> {
        let source = self.state.layout.position_of(source_id)?;
        let target = self.state.layout.position_of(target_id)?;
        let command =
            AddEmotionalRelationshipCommand::new(source_id, target_id, status, source, target);
        let id = command.relationship_id().to_string();
        self.execute(command);
        self.end_gesture();
        Some(id)
    }

    pub fn select_node(&mut self, id: &str, additive: bool) {
        if !additive {
            self.selection.clear();
        }
        if self.state.layout.nodes.contains_key(id) {
            self.selection.nodes.insert(id.to_string());
        }
    }

    pub fn select_edge(&mut self, id: &str, additive: bool) {
        if !additive {
            self.selection.clear();
        }
        if self.state.layout.edges.contains_key(id) {
            self.selection.edges.insert(id.to_string());
        }
    }

    pub fn select_annotation(&mut self, id: &str, additive: bool) {
        if !additive {
            self.selection.clear();
        }
        if self.state.genogram.text_annotations.contains_key(id) {
            self.selection.annotations.insert(id.to_string());
        }
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    /// Selects the topmost node under `point`. Clicking empty canvas clears a
    /// non-additive selection.
    pub fn select_at(&mut self, point: Point, additive: bool) -> Option<String> {
        let hit = self
            .engine
            .find_node_at_point(point, &self.state.layout.nodes)
            .map(str::to_string);
        if !additive {
            self.selection.clear();
        }
        if let Some(id) = &hit {
            self.selection.nodes.insert(id.clone());
        }
        hit
    }

    /// Marquee selection. Returns how many nodes the rectangle caught.
    pub fn select_in_rect(&mut self, rect: Rect, additive: bool) -> usize {
        let found = self.engine.find_nodes_in_rect(rect, &self.state.layout.nodes);
        if !additive {
            self.selection.clear();
        }
        let count = found.len();
        self.selection.nodes.extend(found);
        count
    }

    /// Deletes everything selected as one undo step. Returns false when the
    /// selection was empty.
    pub fn delete_selected(&mut self) -> bool {
        if self.selection.is_empty() {
            return false;
        }
        let selection = std::mem::take(&mut self.selection);

        let mut commands: Vec<Command> = Vec::new();
        commands.extend(
            selection
                .edges
                .iter()
                .map(|id| DeleteRelationshipCommand::new(id.clone()).into()),
        );
        commands.extend(
            selection
                .annotations
                .iter()
                .map(|id| DeleteTextAnnotationCommand::new(id.clone()).into()),
        );
        commands.extend(
            selection
                .nodes
                .iter()
                .map(|id| DeletePersonCommand::new(id.clone()).into()),
        );

        let batch = BatchCommand::new("Delete selection", commands);
        if batch.is_empty() {
            return false;
        }
        debug!(count = batch.len(), "deleting selection");
        self.end_gesture();
        self.execute(batch);
        self.end_gesture();
        true
    }

    /// One step of a node drag. Steps merge until [`Editor::end_drag`].
    pub fn drag_node(&mut self, id: &str, position: Point, snap: bool) {
        let position = if snap {
            self.engine.snap_to_grid(position, self.config.layout.grid_size)
        } else {
            position
        };
        self.execute(MoveNodeCommand::new(id, position));
    }

    pub fn end_drag(&mut self) {
        self.end_gesture();
    }

    /// Offsets every selected node by `delta` as one undo step.
    pub fn move_selection(&mut self, delta: Point) -> bool {
        let moves: BTreeMap<String, Point> = self
            .selection
            .nodes
            .iter()
            .filter_map(|id| {
                let position = self.state.layout.position_of(id)?;
                Some((id.clone(), Point::new(position.x + delta.x, position.y + delta.y)))
            })
            .collect();
        let command = MoveMultipleNodesCommand::new(moves);
        if command.is_empty() {
            return false;
        }
        self.end_gesture();
        self.execute(command);
        self.end_gesture();
        true
    }

    /// Where a node dropped at `position` would land without overlapping
    /// others. Does not change the state.
    pub fn preview_drop(&self, id: &str, position: Point) -> Point {
        self.engine
            .find_non_colliding_position(position, &self.state.layout.nodes, Some(id))
    }

    pub fn auto_layout(&mut self) {
        self.end_gesture();
        self.execute(AutoLayoutCommand::new(self.config.layout));
        self.end_gesture();
    }

    pub fn boundaries(&self) -> Vec<(String, Boundary)> {
        self.state
            .genogram
            .family_trees
            .iter()
            .filter_map(|(id, tree)| {
                family_tree_boundary(
                    tree,
                    &self.state.layout,
                    &self.config.layout,
                    &self.config.boundary,
                )
                .map(|boundary| (id.clone(), boundary))
            })
            .collect()
    }

    /// Runs the shortcut bound to `input`, if any, and reports which one.
    pub fn handle_key(&mut self, input: &KeyInput) -> Option<ShortcutAction> {
        let action = resolve_shortcut(input)?;
        match action {
            ShortcutAction::DeleteSelected => {
                self.delete_selected();
            }
            ShortcutAction::Undo => {
                self.undo();
            }
            ShortcutAction::Redo => {
                self.redo();
            }
            ShortcutAction::ClearSelection => self.clear_selection(),
        }
        Some(action)
    }

    pub fn copy_json(&self) -> Result<String> {
        serialization::state_to_json(&self.state)
    }

    /// Replaces the document. History and selection are cleared; the current
    /// document is kept when `raw` does not parse.
    pub fn load_json(&mut self, raw: &str) -> Result<()> {
        let state = serialization::state_from_json(raw, &self.config.layout)?;
        self.state = state;
        self.history.clear();
        self.selection.clear();
        self.notify();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyboard::Key;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn editor_with_family() -> (Editor, String, String, String) {
        let mut editor = Editor::default();
        let a = editor.add_person("Ann", Gender::Female, Point::new(0.0, 0.0), 0);
        let b = editor.add_person("Bob", Gender::Male, Point::new(200.0, 0.0), 0);
        let partners = editor.add_partner(&a, &b, PartnerStatus::Married).unwrap();
        (editor, a, b, partners)
    }

    #[test]
    fn listeners_see_every_change() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut editor = Editor::default();
        let sink = Rc::clone(&seen);
        editor.on_change(move |state, revision| {
            sink.borrow_mut().push((revision, state.genogram.persons.len()));
        });

        editor.add_person("Ann", Gender::Female, Point::default(), 0);
        editor.undo();
        editor.redo();

        assert_eq!(*seen.borrow(), vec![(1, 1), (2, 0), (3, 1)]);
        assert_eq!(editor.revision(), 3);
    }

    #[test]
    fn drag_is_one_undo_step_per_gesture() {
        let (mut editor, a, _, _) = editor_with_family();
        let depth = editor.history().undo_depth();

        for x in [5.0, 17.0, 29.0] {
            editor.drag_node(&a, Point::new(x, 3.0), true);
        }
        editor.end_drag();
        assert_eq!(editor.state().layout.nodes[&a].position, Point::new(20.0, 0.0));
        assert_eq!(editor.history().undo_depth(), depth + 1);

        editor.drag_node(&a, Point::new(60.0, 0.0), false);
        editor.end_drag();
        assert_eq!(editor.history().undo_depth(), depth + 2);

        editor.undo();
        editor.undo();
        assert_eq!(editor.state().layout.nodes[&a].position, Point::new(0.0, 0.0));
    }

    #[test]
    fn delete_selected_is_one_step() {
        let (mut editor, a, b, partners) = editor_with_family();
        let before = editor.state().clone();

        editor.select_node(&a, false);
        editor.select_edge(&partners, true);
        assert!(editor.delete_selected());

        assert!(!editor.genogram().persons.contains_key(&a));
        assert!(editor.genogram().persons.contains_key(&b));
        assert!(editor.genogram().relationships.is_empty());
        assert!(editor.selection().is_empty());

        assert_eq!(editor.undo().as_deref(), Some("Delete selection"));
        assert_eq!(editor.state().layout, before.layout);
        assert_eq!(editor.genogram().persons, before.genogram.persons);
        assert_eq!(editor.genogram().relationships, before.genogram.relationships);
        assert!(!editor.delete_selected());
    }

    #[test]
    fn click_and_marquee_selection() {
        let (mut editor, a, b, _) = editor_with_family();

        assert_eq!(editor.select_at(Point::new(10.0, 10.0), false), Some(a.clone()));
        assert_eq!(editor.select_at(Point::new(1000.0, 0.0), false), None);
        assert!(editor.selection().is_empty());

        let caught = editor.select_in_rect(
            Rect::from_corners(Point::new(-100.0, -100.0), Point::new(300.0, 100.0)),
            false,
        );
        assert_eq!(caught, 2);
        assert!(editor.selection().nodes.contains(&b));
    }

    #[test]
    fn move_selection_and_undo() {
        let (mut editor, a, b, _) = editor_with_family();
        editor.select_node(&a, false);
        editor.select_node(&b, true);

        assert!(editor.move_selection(Point::new(10.0, 20.0)));
        assert_eq!(editor.state().layout.nodes[&b].position, Point::new(210.0, 20.0));

        editor.undo();
        assert_eq!(editor.state().layout.nodes[&a].position, Point::new(0.0, 0.0));
    }

    #[test]
    fn preview_drop_avoids_neighbours() {
        let (editor, a, b, _) = editor_with_family();
        let onto_b = editor.state().layout.nodes[&b].position;

        let landing = editor.preview_drop(&a, onto_b);

        assert_ne!(landing, onto_b);
        let mut others = editor.state().layout.nodes.clone();
        others.remove(&a);
        assert!(!editor.engine().check_collision(landing, &others, None));
    }

    #[test]
    fn keyboard_drives_history() {
        let (mut editor, a, _, _) = editor_with_family();
        editor.select_node(&a, false);

        assert_eq!(
            editor.handle_key(&KeyInput::new(Key::Delete)),
            Some(ShortcutAction::DeleteSelected)
        );
        assert!(!editor.genogram().persons.contains_key(&a));

        editor.handle_key(&KeyInput::new(Key::Char('z')).ctrl());
        assert!(editor.genogram().persons.contains_key(&a));

        editor.handle_key(&KeyInput::new(Key::Char('z')).ctrl().shift());
        assert!(!editor.genogram().persons.contains_key(&a));

        editor.handle_key(&KeyInput::new(Key::Char('z')).ctrl().in_text_input());
        assert!(!editor.genogram().persons.contains_key(&a));
    }

    #[test]
    fn load_json_resets_history_and_selection() {
        let (mut editor, a, _, _) = editor_with_family();
        let json = editor.copy_json().unwrap();
        editor.select_node(&a, false);

        let mut other = Editor::default();
        other.load_json(&json).unwrap();
        assert_eq!(other.state(), editor.state());

        editor.load_json(&json).unwrap();
        assert!(!editor.history().can_undo());
        assert!(editor.selection().is_empty());

        let revision = editor.revision();
        assert!(editor.load_json("not json").is_err());
        assert_eq!(editor.revision(), revision);
        assert!(editor.genogram().persons.contains_key(&a));
    }

    #[test]
    fn auto_layout_is_undoable() {
        let (mut editor, a, b, _) = editor_with_family();
        editor.auto_layout();
        assert_eq!(editor.state().layout.nodes[&a].position.y, 100.0);
        assert_eq!(
            editor.state().layout.nodes[&b].position.x - editor.state().layout.nodes[&a].position.x,
            140.0
        );
        editor.undo();
        assert_eq!(editor.state().layout.nodes[&b].position, Point::new(200.0, 0.0));
    }
}
