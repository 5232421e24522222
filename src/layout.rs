use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::Genogram;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rect {
    pub min_x: f32,
    pub max_x: f32,
    pub min_y: f32,
    pub max_y: f32,
}

impl Rect {
    /// Normalizes two drag corners into a rectangle.
    pub fn from_corners(a: Point, b: Point) -> Rect {
        Rect {
            min_x: a.x.min(b.x),
            max_x: a.x.max(b.x),
            min_y: a.y.min(b.y),
            max_y: a.y.max(b.y),
        }
    }

    pub fn centered(center: Point, width: f32, height: f32) -> Rect {
        Rect {
            min_x: center.x - width / 2.0,
            max_x: center.x + width / 2.0,
            min_y: center.y - height / 2.0,
            max_y: center.y + height / 2.0,
        }
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.min_x <= other.max_x
            && self.max_x >= other.min_x
            && self.min_y <= other.max_y
            && self.max_y >= other.min_y
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.min_x
            && point.x <= self.max_x
            && point.y >= self.min_y
            && point.y <= self.max_y
    }

    pub fn center(&self) -> Point {
        Point {
            x: (self.min_x + self.max_x) / 2.0,
            y: (self.min_y + self.max_y) / 2.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArrowDirection {
    #[default]
    None,
    Forward,
    Backward,
    Both,
}

impl ArrowDirection {
    pub fn marker_start(&self) -> bool {
        matches!(self, ArrowDirection::Backward | ArrowDirection::Both)
    }

    pub fn marker_end(&self) -> bool {
        matches!(self, ArrowDirection::Forward | ArrowDirection::Both)
    }
}

/// Line pattern the renderer draws for an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineKind {
    #[default]
    Solid,
    Dashed,
    Dotted,
    Double,
    Triple,
    Zigzag,
    Slashed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeStyle {
    pub color: String,
    pub width: f32,
    #[serde(default)]
    pub line: LineKind,
}

impl Default for EdgeStyle {
    fn default() -> Self {
        Self {
            color: "#2d3748".to_string(),
            width: 2.0,
            line: LineKind::Solid,
        }
    }
}

impl EdgeStyle {
    pub fn with_line(line: LineKind) -> Self {
        Self {
            line,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeStylePatch {
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub width: Option<f32>,
    #[serde(default)]
    pub line: Option<LineKind>,
}

impl EdgeStylePatch {
    pub fn is_empty(&self) -> bool {
        self.color.is_none() && self.width.is_none() && self.line.is_none()
    }

    /// Writes the touched fields and returns their previous values.
    pub fn apply(&self, style: &mut EdgeStyle) -> EdgeStylePatch {
        let mut previous = EdgeStylePatch::default();
        if let Some(color) = &self.color {
            previous.color = Some(std::mem::replace(&mut style.color, color.clone()));
        }
        if let Some(width) = self.width {
            previous.width = Some(std::mem::replace(&mut style.width, width));
        }
        if let Some(line) = self.line {
            previous.line = Some(std::mem::replace(&mut style.line, line));
        }
        previous
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeLayout {
    pub position: Point,
    pub generation: i32,
    #[serde(default)]
    pub z_index: i32,
    #[serde(default = "default_visible")]
    pub visible: bool,
}

fn default_visible() -> bool {
    true
}

impl NodeLayout {
    pub fn new(position: Point, generation: i32) -> Self {
        Self {
            position,
            generation,
            z_index: 0,
            visible: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeLayout {
    #[serde(default)]
    pub points: Vec<Point>,
    /// Midpoint node shared by a partner pair; child edges hang from it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub virtual_anchor: Option<Point>,
    #[serde(default)]
    pub arrow: ArrowDirection,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default)]
    pub style: EdgeStyle,
}

impl EdgeLayout {
    pub fn new(points: Vec<Point>, style: EdgeStyle) -> Self {
        Self {
            points,
            virtual_anchor: None,
            arrow: ArrowDirection::None,
            label: None,
            style,
        }
    }
}

/// Geometry kept in lockstep with the graph: node layouts share person IDs,
/// edge layouts share relationship IDs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayoutState {
    pub nodes: BTreeMap<String, NodeLayout>,
    pub edges: BTreeMap<String, EdgeLayout>,
}

impl LayoutState {
    pub fn position_of(&self, id: &str) -> Option<Point> {
        self.nodes.get(id).map(|node| node.position)
    }

    pub fn max_z_index(&self) -> i32 {
        self.nodes.values().map(|node| node.z_index).max().unwrap_or(0)
    }
}

/// The only object commands read or write.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EditorState {
    pub genogram: Genogram,
    pub layout: LayoutState,
}

impl EditorState {
    pub fn new(genogram: Genogram) -> Self {
        Self {
            genogram,
            layout: LayoutState::default(),
        }
    }

    /// True when the layout store holds exactly the graph's IDs.
    pub fn is_in_lockstep(&self) -> bool {
        self.layout.nodes.len() == self.genogram.persons.len()
            && self.layout.edges.len() == self.genogram.relationships.len()
            && self
                .genogram
                .persons
                .keys()
                .all(|id| self.layout.nodes.contains_key(id))
            && self
                .genogram
                .relationships
                .keys()
                .all(|id| self.layout.edges.contains_key(id))
    }
}
