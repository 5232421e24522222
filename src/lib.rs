//! Editing core for genograms: a family-relationship graph that is mutated
//! only through reversible commands, a parallel layout store, and the
//! geometry used to place nodes and outline family groups.

pub mod boundary;
pub mod commands;
pub mod config;
pub mod editor;
pub mod engine;
pub mod error;
pub mod history;
pub mod keyboard;
pub mod layout;
pub mod model;
pub mod serialization;

pub use boundary::{Boundary, BoundaryConfig, BoundaryMember, compute_boundary, convex_hull, hull_path};
pub use commands::Command;
pub use config::EditorConfig;
pub use editor::{Editor, Selection};
pub use engine::{LayoutConfig, LayoutEngine};
pub use error::{GenogramError, Result};
pub use history::{History, HistoryConfig};
pub use keyboard::{Key, KeyInput, ShortcutAction, resolve_shortcut};
pub use layout::{
    ArrowDirection, EdgeLayout, EdgeStyle, EdgeStylePatch, EditorState, LayoutState, LineKind,
    NodeLayout, Point, Rect,
};
pub use model::{
    ChildRelationship, ChildStatus, EmotionalRelationship, EmotionalStatus, FamilyTree,
    FamilyTreeNode, Gender, Genogram, GenogramMetadata, PartnerRelationship, PartnerStatus, Person,
    PersonPatch, Relationship, RelationshipKind, TextAnnotation, TextAnnotationPatch, TextStyle,
};
pub use serialization::{SerializedDocument, SerializedGenogram};

pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
