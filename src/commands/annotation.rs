use tracing::trace;

use super::EditCommand;
use crate::layout::{EditorState, Point};
use crate::model::{TextAnnotation, TextAnnotationPatch, TextStyle};

#[derive(Debug, Clone, PartialEq)]
pub struct AddTextAnnotationCommand {
    annotation: TextAnnotation,
    inserted: bool,
}

impl AddTextAnnotationCommand {
    pub fn new(text: impl Into<String>, position: Point) -> Self {
        Self {
            annotation: TextAnnotation {
                id: crate::new_id(),
                text: text.into(),
                style: TextStyle::default(),
                position,
                width: None,
            },
            inserted: false,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.annotation.id = id.into();
        self
    }

    pub fn with_style(mut self, style: TextStyle) -> Self {
        self.annotation.style = style;
        self
    }

    pub fn annotation_id(&self) -> &str {
        &self.annotation.id
    }
}

impl EditCommand for AddTextAnnotationCommand {
    fn execute(&mut self, state: &mut EditorState) {
        let id = &self.annotation.id;
        if state.genogram.text_annotations.contains_key(id) {
            trace!(annotation = %id, "annotation already exists; add skipped");
            self.inserted = false;
            return;
        }
        state
            .genogram
            .text_annotations
            .insert(id.clone(), self.annotation.clone());
        state.genogram.touch();
        self.inserted = true;
    }

    fn undo(&mut self, state: &mut EditorState) {
        if std::mem::take(&mut self.inserted) {
            state.genogram.text_annotations.remove(&self.annotation.id);
            state.genogram.touch();
        }
    }

    fn description(&self) -> &str {
        "Add text"
    }
}

/// Edits text, style or width. Typing into the same annotation merges.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateTextAnnotationCommand {
    annotation_id: String,
    patch: TextAnnotationPatch,
    previous: Option<TextAnnotationPatch>,
}

impl UpdateTextAnnotationCommand {
    pub fn new(annotation_id: impl Into<String>, patch: TextAnnotationPatch) -> Self {
        Self {
            annotation_id: annotation_id.into(),
            patch,
            previous: None,
        }
    }

    pub fn can_merge(&self, other: &UpdateTextAnnotationCommand) -> bool {
        self.annotation_id == other.annotation_id
    }

    pub fn merge(self, newer: UpdateTextAnnotationCommand) -> UpdateTextAnnotationCommand {
        let previous = match (self.previous, newer.previous) {
            (Some(oldest), Some(later)) => Some(later.overlay(oldest)),
            (oldest, later) => oldest.or(later),
        };
        UpdateTextAnnotationCommand {
            annotation_id: self.annotation_id,
            patch: self.patch.overlay(newer.patch),
            previous,
        }
    }
}

impl EditCommand for UpdateTextAnnotationCommand {
    fn execute(&mut self, state: &mut EditorState) {
        if self.patch.is_empty() {
            return;
        }
        let Some(annotation) = state.genogram.text_annotations.get_mut(&self.annotation_id) else {
            trace!(annotation = %self.annotation_id, "annotation missing; update skipped");
            return;
        };
        self.previous = Some(self.patch.apply(annotation));
        state.genogram.touch();
    }

    fn undo(&mut self, state: &mut EditorState) {
        let Some(previous) = self.previous.take() else {
            return;
        };
        if let Some(annotation) = state.genogram.text_annotations.get_mut(&self.annotation_id) {
            previous.apply(annotation);
            state.genogram.touch();
        }
    }

    fn description(&self) -> &str {
        "Edit text"
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MoveTextAnnotationCommand {
    annotation_id: String,
    position: Point,
    previous: Option<Point>,
}

impl MoveTextAnnotationCommand {
    pub fn new(annotation_id: impl Into<String>, position: Point) -> Self {
        Self {
            annotation_id: annotation_id.into(),
            position,
            previous: None,
        }
    }

    pub fn can_merge(&self, other: &MoveTextAnnotationCommand) -> bool {
        self.annotation_id == other.annotation_id
    }

    pub fn merge(self, newer: MoveTextAnnotationCommand) -> MoveTextAnnotationCommand {
        MoveTextAnnotationCommand {
            annotation_id: self.annotation_id,
            position: newer.position,
            previous: self.previous.or(newer.previous),
        }
    }
}

impl EditCommand for MoveTextAnnotationCommand {
    fn execute(&mut self, state: &mut EditorState) {
        let Some(annotation) = state.genogram.text_annotations.get_mut(&self.annotation_id) else {
            trace!(annotation = %self.annotation_id, "annotation missing; move skipped");
            return;
        };
        let previous = std::mem::replace(&mut annotation.position, self.position);
        self.previous.get_or_insert(previous);
        state.genogram.touch();
    }

    fn undo(&mut self, state: &mut EditorState) {
        let Some(previous) = self.previous.take() else {
            return;
        };
        if let Some(annotation) = state.genogram.text_annotations.get_mut(&self.annotation_id) {
            annotation.position = previous;
            state.genogram.touch();
        }
    }

    fn description(&self) -> &str {
        "Move text"
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteTextAnnotationCommand {
    annotation_id: String,
    backup: Option<TextAnnotation>,
}

impl DeleteTextAnnotationCommand {
    pub fn new(annotation_id: impl Into<String>) -> Self {
        Self {
            annotation_id: annotation_id.into(),
            backup: None,
        }
    }
}

impl EditCommand for DeleteTextAnnotationCommand {
    fn execute(&mut self, state: &mut EditorState) {
        self.backup = state.genogram.text_annotations.remove(&self.annotation_id);
        match self.backup {
            Some(_) => state.genogram.touch(),
            None => trace!(annotation = %self.annotation_id, "annotation missing; delete skipped"),
        }
    }

    fn undo(&mut self, state: &mut EditorState) {
        if let Some(annotation) = self.backup.take() {
            state
                .genogram
                .text_annotations
                .insert(self.annotation_id.clone(), annotation);
            state.genogram.touch();
        }
    }

    fn description(&self) -> &str {
        "Delete text"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::*;
    use crate::model::Genogram;

    fn state_with_note() -> EditorState {
        let mut state = EditorState::new(Genogram::new("notes"));
        let mut add = AddTextAnnotationCommand::new("Household", Point::new(10.0, 10.0)).with_id("n");
        add.execute(&mut state);
        state
    }

    #[test]
    fn add_and_delete_are_reversible() {
        let mut state = EditorState::new(Genogram::new("notes"));
        assert_reversible(
            &mut state,
            AddTextAnnotationCommand::new("Hello", Point::new(0.0, 0.0))
                .with_id("n")
                .into(),
        );

        let mut state = state_with_note();
        assert_reversible(&mut state, DeleteTextAnnotationCommand::new("n").into());
    }

    #[test]
    fn styled_note_keeps_its_style() {
        let mut state = EditorState::new(Genogram::new("notes"));
        let style = TextStyle {
            font_size: 18.0,
            ..TextStyle::default()
        };
        let mut add = AddTextAnnotationCommand::new("Title", Point::new(0.0, 0.0))
            .with_id("t")
            .with_style(style.clone());
        add.execute(&mut state);
        assert_eq!(state.genogram.text_annotations["t"].style, style);

        let stamp = state.genogram.metadata.updated_at;
        let mut empty = UpdateTextAnnotationCommand::new("t", TextAnnotationPatch::default());
        empty.execute(&mut state);
        assert_eq!(state.genogram.metadata.updated_at, stamp);
    }

    #[test]
    fn typing_merges_into_one_edit() {
        let mut state = state_with_note();
        let before = normalized(&state);

        let mut first = UpdateTextAnnotationCommand::new(
            "n",
            TextAnnotationPatch {
                text: Some("Household A".into()),
                ..TextAnnotationPatch::default()
            },
        );
        let mut second = UpdateTextAnnotationCommand::new(
            "n",
            TextAnnotationPatch {
                text: Some("Household AB".into()),
                width: Some(Some(200.0)),
                ..TextAnnotationPatch::default()
            },
        );
        first.execute(&mut state);
        second.execute(&mut state);
        let mut merged = first.merge(second);

        merged.undo(&mut state);
        assert_eq!(normalized(&state), before);
        merged.execute(&mut state);
        let note = &state.genogram.text_annotations["n"];
        assert_eq!(note.text, "Household AB");
        assert_eq!(note.width, Some(200.0));
    }

    #[test]
    fn move_merges_and_reverts_to_origin() {
        let mut state = state_with_note();
        let mut first = MoveTextAnnotationCommand::new("n", Point::new(20.0, 20.0));
        let mut second = MoveTextAnnotationCommand::new("n", Point::new(30.0, 40.0));
        first.execute(&mut state);
        second.execute(&mut state);
        assert!(first.can_merge(&second));

        let mut merged = first.merge(second);
        merged.undo(&mut state);
        assert_eq!(state.genogram.text_annotations["n"].position, Point::new(10.0, 10.0));
    }

    #[test]
    fn delete_missing_annotation_is_a_no_op() {
        let mut state = state_with_note();
        let stamp = state.genogram.metadata.updated_at;
        let mut delete = DeleteTextAnnotationCommand::new("other");
        delete.execute(&mut state);
        delete.undo(&mut state);
        assert_eq!(state.genogram.metadata.updated_at, stamp);
        assert_eq!(state.genogram.text_annotations.len(), 1);
    }
}
