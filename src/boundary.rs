use std::f32::consts::TAU;
use std::fmt::Write as FmtWrite;

use serde::{Deserialize, Serialize};

use crate::engine::LayoutConfig;
use crate::layout::{LayoutState, Point};
use crate::model::FamilyTree;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BoundaryConfig {
    pub padding: f32,
    pub samples: usize,
    /// Groups with fewer positioned members are not outlined.
    pub min_members: usize,
}

impl Default for BoundaryConfig {
    fn default() -> Self {
        Self {
            padding: 20.0,
            samples: 16,
            min_members: 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundaryMember {
    pub position: Point,
    pub size: f32,
}

/// Outline of a member cluster. `hull` and `path` are relative to `center`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Boundary {
    pub center: Point,
    pub hull: Vec<Point>,
    pub path: String,
}

fn cluster_center(members: &[BoundaryMember]) -> Point {
    let mut min_x = f32::MAX;
    let mut max_x = f32::MIN;
    let mut min_y = f32::MAX;
    let mut max_y = f32::MIN;
    for member in members {
        min_x = min_x.min(member.position.x);
        max_x = max_x.max(member.position.x);
        min_y = min_y.min(member.position.y);
        max_y = max_y.max(member.position.y);
    }
    Point {
        x: (min_x + max_x) / 2.0,
        y: (min_y + max_y) / 2.0,
    }
}

/// Points evenly spaced on a circle of radius `size / 2 + padding` around
/// each member, relative to `center`.
pub fn sample_member_points(
    members: &[BoundaryMember],
    center: Point,
    padding: f32,
    samples: usize,
) -> Vec<Point> {
    let samples = samples.max(1);
    let mut points = Vec::with_capacity(members.len() * samples);
    for member in members {
        let radius = member.size / 2.0 + padding;
        let local_x = member.position.x - center.x;
        let local_y = member.position.y - center.y;
        for step in 0..samples {
            let angle = TAU * step as f32 / samples as f32;
            points.push(Point {
                x: local_x + radius * angle.cos(),
                y: local_y + radius * angle.sin(),
            });
        }
    }
    points
}

fn cross(o: Point, a: Point, b: Point) -> f32 {
    (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
}

/// Andrew's monotone chain. Collinear points are dropped and the result is
/// counter-clockwise without a repeated closing vertex.
pub fn convex_hull(points: &[Point]) -> Vec<Point> {
    let mut sorted: Vec<Point> = points
        .iter()
        .copied()
        .filter(|p| p.x.is_finite() && p.y.is_finite())
        .collect();
    sorted.sort_by(|a, b| a.x.total_cmp(&b.x).then_with(|| a.y.total_cmp(&b.y)));
    sorted.dedup();

    if sorted.len() < 3 {
        return sorted;
    }

    let mut lower: Vec<Point> = Vec::with_capacity(sorted.len());
    for &p in &sorted {
        while lower.len() >= 2 && cross(lower[lower.len() - 2], lower[lower.len() - 1], p) <= 0.0 {
            lower.pop();
        }
        lower.push(p);
    }

    let mut upper: Vec<Point> = Vec::with_capacity(sorted.len());
    for &p in sorted.iter().rev() {
        while upper.len() >= 2 && cross(upper[upper.len() - 2], upper[upper.len() - 1], p) <= 0.0 {
            upper.pop();
        }
        upper.push(p);
    }

    lower.pop();
    upper.pop();
    lower.extend(upper);
    lower
}

/// Closed path through the hull, or `None` when fewer than three vertices
/// remain.
pub fn hull_path(hull: &[Point]) -> Option<String> {
    let (first, rest) = hull.split_first()?;
    if hull.len() < 3 {
        return None;
    }

    let mut path = String::new();
    write!(path, "M {:.1} {:.1}", first.x, first.y).ok()?;
    for point in rest {
        write!(path, " L {:.1} {:.1}", point.x, point.y).ok()?;
    }
    path.push_str(" Z");
    Some(path)
}

pub fn compute_boundary(members: &[BoundaryMember], config: &BoundaryConfig) -> Option<Boundary> {
    if members.is_empty() || members.len() < config.min_members {
        return None;
    }

    let center = cluster_center(members);
    let samples = sample_member_points(members, center, config.padding, config.samples);
    let hull = convex_hull(&samples);
    let path = hull_path(&hull)?;

    Some(Boundary { center, hull, path })
}

/// Outline around the positioned members of a family tree. Members without a
/// node layout, or hidden ones, are skipped.
pub fn family_tree_boundary(
    tree: &FamilyTree,
    layout: &LayoutState,
    layout_config: &LayoutConfig,
    config: &BoundaryConfig,
) -> Option<Boundary> {
    let size = layout_config.node_width.max(layout_config.node_height);
    let members: Vec<BoundaryMember> = tree
        .nodes
        .keys()
        .filter_map(|person_id| layout.nodes.get(person_id))
        .filter(|node| node.visible)
        .map(|node| BoundaryMember {
            position: node.position,
            size,
        })
        .collect();

    compute_boundary(&members, config)
}
