use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::layout::{LayoutState, NodeLayout, Point, Rect};

const COLLISION_MARGIN: f32 = 10.0;
const SEARCH_RINGS: u32 = 10;
const COMPASS: [(f32, f32); 8] = [
    (1.0, 0.0),
    (-1.0, 0.0),
    (0.0, 1.0),
    (0.0, -1.0),
    (1.0, 1.0),
    (-1.0, 1.0),
    (1.0, -1.0),
    (-1.0, -1.0),
];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LayoutConfig {
    pub node_width: f32,
    pub node_height: f32,
    pub horizontal_gap: f32,
    pub vertical_gap: f32,
    pub generation_height: f32,
    /// Horizontal center every generation row is laid out around.
    pub center_x: f32,
    pub base_y: f32,
    pub grid_size: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            node_width: 80.0,
            node_height: 80.0,
            horizontal_gap: 60.0,
            vertical_gap: 70.0,
            generation_height: 150.0,
            center_x: 400.0,
            base_y: 100.0,
            grid_size: 20.0,
        }
    }
}

/// Stateless geometry over a [`LayoutConfig`]. Node positions are node centers.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LayoutEngine {
    config: LayoutConfig,
}

impl LayoutEngine {
    pub fn new(config: LayoutConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    fn spacing(&self) -> f32 {
        self.config.node_width + self.config.horizontal_gap
    }

    pub fn snap_to_grid(&self, point: Point, grid_size: f32) -> Point {
        if grid_size <= 0.0 || !grid_size.is_finite() {
            return point;
        }
        Point {
            x: (point.x / grid_size).round() * grid_size,
            y: (point.y / grid_size).round() * grid_size,
        }
    }

    pub fn get_generation_y(&self, generation: i32, base_y: f32) -> f32 {
        base_y + generation as f32 * self.config.generation_height
    }

    pub fn calculate_partner_position(&self, existing: Point) -> Point {
        Point {
            x: existing.x + self.spacing(),
            y: existing.y,
        }
    }

    /// Children sit one generation below the first parent, starting under the
    /// parents' mean X. Returns `None` without parents.
    pub fn calculate_child_position(&self, parents: &[Point], sibling_index: usize) -> Option<Point> {
        let first = parents.first()?;
        let mean_x = parents.iter().map(|p| p.x).sum::<f32>() / parents.len() as f32;
        Some(Point {
            x: mean_x + sibling_index as f32 * self.spacing(),
            y: first.y + self.config.generation_height,
        })
    }

    pub fn calculate_virtual_anchor(&self, a: Point, b: Point) -> Point {
        Point {
            x: (a.x + b.x) / 2.0,
            y: (a.y + b.y) / 2.0,
        }
    }

    pub fn check_collision(
        &self,
        position: Point,
        existing: &BTreeMap<String, NodeLayout>,
        exclude_id: Option<&str>,
    ) -> bool {
        let reach_x = self.config.node_width + COLLISION_MARGIN;
        let reach_y = self.config.node_height + COLLISION_MARGIN;

        existing
            .iter()
            .filter(|(id, node)| node.visible && Some(id.as_str()) != exclude_id)
            .any(|(_, node)| {
                (position.x - node.position.x).abs() < reach_x
                    && (position.y - node.position.y).abs() < reach_y
            })
    }

    /// Falls back to `preferred` when every candidate within the search rings
    /// collides.
    pub fn find_non_colliding_position(
        &self,
        preferred: Point,
        existing: &BTreeMap<String, NodeLayout>,
        exclude_id: Option<&str>,
    ) -> Point {
        if !self.check_collision(preferred, existing, exclude_id) {
            return preferred;
        }

        for ring in 1..=SEARCH_RINGS {
            let step = ring as f32 * self.config.horizontal_gap;
            for (dx, dy) in COMPASS {
                let candidate = Point {
                    x: preferred.x + dx * step,
                    y: preferred.y + dy * step,
                };
                if !self.check_collision(candidate, existing, exclude_id) {
                    return candidate;
                }
            }
        }

        preferred
    }

    /// Moves visible nodes that overlap an earlier node (in ID order) to the
    /// nearest free spot. Returns the IDs that moved.
    pub fn resolve_collisions(&self, layout: &mut LayoutState) -> Vec<String> {
        let mut placed: BTreeMap<String, NodeLayout> = BTreeMap::new();
        let mut moved = Vec::new();

        for (id, node) in layout.nodes.iter_mut() {
            if node.visible && self.check_collision(node.position, &placed, None) {
                let free = self.find_non_colliding_position(node.position, &placed, None);
                if free != node.position {
                    node.position = free;
                    moved.push(id.clone());
                }
            }
            placed.insert(id.clone(), node.clone());
        }

        moved
    }

    /// Rows per generation, each centered on `center_x`; nodes keep their
    /// left-to-right order within a row.
    pub fn auto_layout_by_generation(&self, layout: &mut LayoutState) {
        let mut rows: BTreeMap<i32, Vec<(String, f32)>> = BTreeMap::new();
        for (id, node) in &layout.nodes {
            rows.entry(node.generation)
                .or_default()
                .push((id.clone(), node.position.x));
        }

        let spacing = self.spacing();
        for (generation, mut members) in rows {
            members.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)));

            let y = self.get_generation_y(generation, self.config.base_y);
            let span = spacing * members.len().saturating_sub(1) as f32;
            let start_x = self.config.center_x - span / 2.0;

            for (idx, (id, _)) in members.iter().enumerate() {
                if let Some(node) = layout.nodes.get_mut(id) {
                    node.position = Point {
                        x: start_x + idx as f32 * spacing,
                        y,
                    };
                }
            }
        }
    }

    /// Straight two-point path, or an orthogonal elbow through the vertical
    /// midpoint when `vertical` is set.
    pub fn calculate_edge_path(&self, source: Point, target: Point, vertical: bool) -> Vec<Point> {
        if !vertical {
            return vec![source, target];
        }

        let mid_y = (source.y + target.y) / 2.0;
        vec![
            source,
            Point {
                x: source.x,
                y: mid_y,
            },
            Point {
                x: target.x,
                y: mid_y,
            },
            target,
        ]
    }

    pub fn get_node_bounds(&self, node: &NodeLayout) -> Rect {
        Rect::centered(node.position, self.config.node_width, self.config.node_height)
    }

    pub fn is_point_in_node(&self, point: Point, node: &NodeLayout) -> bool {
        self.get_node_bounds(node).contains(point)
    }

    /// Topmost visible node under `point`; later IDs win z-index ties.
    pub fn find_node_at_point<'a>(
        &self,
        point: Point,
        nodes: &'a BTreeMap<String, NodeLayout>,
    ) -> Option<&'a str> {
        let mut best: Option<(&'a str, i32)> = None;
        for (id, node) in nodes {
            if !node.visible || !self.is_point_in_node(point, node) {
                continue;
            }
            match best {
                Some((_, z)) if node.z_index < z => {}
                _ => best = Some((id.as_str(), node.z_index)),
            }
        }
        best.map(|(id, _)| id)
    }

    pub fn find_nodes_in_rect(&self, rect: Rect, nodes: &BTreeMap<String, NodeLayout>) -> Vec<String> {
        nodes
            .iter()
            .filter(|(_, node)| node.visible && self.get_node_bounds(node).intersects(&rect))
            .map(|(id, _)| id.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nodes(points: &[(&str, f32, f32)]) -> BTreeMap<String, NodeLayout> {
        points
            .iter()
            .map(|(id, x, y)| (id.to_string(), NodeLayout::new(Point::new(*x, *y), 0)))
            .collect()
    }

    fn packed_engine() -> LayoutEngine {
        LayoutEngine::new(LayoutConfig {
            node_width: 60.0,
            node_height: 40.0,
            horizontal_gap: 60.0,
            ..LayoutConfig::default()
        })
    }

    #[test]
    fn snaps_to_nearest_grid_multiple() {
        let engine = LayoutEngine::default();
        assert_eq!(
            engine.snap_to_grid(Point::new(29.0, -31.0), 20.0),
            Point::new(20.0, -40.0)
        );
        assert_eq!(
            engine.snap_to_grid(Point::new(29.0, 31.0), 0.0),
            Point::new(29.0, 31.0)
        );
    }

    #[test]
    fn generation_y_is_linear() {
        let engine = LayoutEngine::default();
        assert_eq!(engine.get_generation_y(0, 100.0), 100.0);
        assert_eq!(engine.get_generation_y(2, 100.0), 400.0);
        assert_eq!(engine.get_generation_y(-1, 100.0), -50.0);
    }

    #[test]
    fn partner_and_child_positions() {
        let engine = LayoutEngine::default();
        assert_eq!(
            engine.calculate_partner_position(Point::new(0.0, 0.0)),
            Point::new(140.0, 0.0)
        );

        let parents = [Point::new(0.0, 100.0), Point::new(140.0, 100.0)];
        assert_eq!(
            engine.calculate_child_position(&parents, 0),
            Some(Point::new(70.0, 250.0))
        );
        assert_eq!(
            engine.calculate_child_position(&parents, 2),
            Some(Point::new(350.0, 250.0))
        );
        assert_eq!(engine.calculate_child_position(&[], 0), None);
    }

    #[test]
    fn collision_ignores_hidden_and_excluded_nodes() {
        let engine = packed_engine();
        let mut existing = nodes(&[("a", 0.0, 0.0)]);

        assert!(engine.check_collision(Point::new(50.0, 20.0), &existing, None));
        assert!(!engine.check_collision(Point::new(50.0, 20.0), &existing, Some("a")));
        assert!(!engine.check_collision(Point::new(70.0, 0.0), &existing, None));

        existing.get_mut("a").unwrap().visible = false;
        assert!(!engine.check_collision(Point::new(0.0, 0.0), &existing, None));
    }

    #[test]
    fn packed_row_resolves_to_first_ring() {
        let engine = packed_engine();
        let existing = nodes(&[("a", 0.0, 0.0), ("b", 60.0, 0.0), ("c", 120.0, 0.0)]);

        let found = engine.find_non_colliding_position(Point::new(60.0, 0.0), &existing, None);

        assert_ne!(found, Point::new(60.0, 0.0));
        assert!(!engine.check_collision(found, &existing, None));
        let dx = (found.x - 60.0).abs();
        let dy = found.y.abs();
        assert!(dx <= 60.0 && dy <= 60.0, "expected ring-1 offset, got {found:?}");
    }

    #[test]
    fn default_sizes_push_packed_row_to_second_ring() {
        let engine = LayoutEngine::default();
        let existing = nodes(&[("a", 0.0, 0.0), ("b", 60.0, 0.0), ("c", 120.0, 0.0)]);

        let found = engine.find_non_colliding_position(Point::new(60.0, 0.0), &existing, None);

        assert!(!engine.check_collision(found, &existing, None));
        let reach = (found.x - 60.0).abs().max(found.y.abs());
        assert_eq!(reach, 120.0, "expected ring-2 offset, got {found:?}");
    }

    #[test]
    fn search_falls_back_to_preferred_when_exhausted() {
        let engine = LayoutEngine::new(LayoutConfig {
            node_width: 60.0,
            node_height: 40.0,
            horizontal_gap: 1.0,
            ..LayoutConfig::default()
        });
        let existing = nodes(&[("a", 0.0, 0.0)]);
        let preferred = Point::new(1.0, 1.0);
        assert_eq!(
            engine.find_non_colliding_position(preferred, &existing, None),
            preferred
        );
    }

    #[test]
    fn resolve_collisions_separates_stacked_nodes() {
        let engine = packed_engine();
        let mut layout = LayoutState {
            nodes: nodes(&[("a", 0.0, 0.0), ("b", 0.0, 0.0), ("c", 500.0, 0.0)]),
            ..LayoutState::default()
        };

        let moved = engine.resolve_collisions(&mut layout);

        assert_eq!(moved, vec!["b".to_string()]);
        let a = layout.nodes["a"].position;
        let b = layout.nodes["b"].position;
        assert!(!engine.check_collision(b, &nodes(&[("a", a.x, a.y)]), None));
        assert_eq!(layout.nodes["c"].position, Point::new(500.0, 0.0));
    }

    #[test]
    fn auto_layout_centers_each_generation() {
        let engine = LayoutEngine::default();
        let mut layout = LayoutState::default();
        layout
            .nodes
            .insert("p1".into(), NodeLayout::new(Point::new(900.0, 3.0), 0));
        layout
            .nodes
            .insert("p2".into(), NodeLayout::new(Point::new(-50.0, 7.0), 0));
        layout
            .nodes
            .insert("c1".into(), NodeLayout::new(Point::new(0.0, 0.0), 1));

        engine.auto_layout_by_generation(&mut layout);

        assert_eq!(layout.nodes["p2"].position, Point::new(330.0, 100.0));
        assert_eq!(layout.nodes["p1"].position, Point::new(470.0, 100.0));
        assert_eq!(layout.nodes["c1"].position, Point::new(400.0, 250.0));
    }

    #[test]
    fn vertical_edge_path_is_an_elbow() {
        let engine = LayoutEngine::default();
        let source = Point::new(0.0, 0.0);
        let target = Point::new(100.0, 200.0);

        assert_eq!(engine.calculate_edge_path(source, target, false), vec![source, target]);
        assert_eq!(
            engine.calculate_edge_path(source, target, true),
            vec![
                source,
                Point::new(0.0, 100.0),
                Point::new(100.0, 100.0),
                target
            ]
        );
    }

    #[test]
    fn hit_testing_prefers_highest_z_index() {
        let engine = LayoutEngine::default();
        let mut existing = nodes(&[("low", 0.0, 0.0), ("high", 20.0, 0.0), ("far", 400.0, 0.0)]);
        existing.get_mut("high").unwrap().z_index = 5;

        assert_eq!(
            engine.find_node_at_point(Point::new(10.0, 0.0), &existing),
            Some("high")
        );
        assert_eq!(engine.find_node_at_point(Point::new(200.0, 0.0), &existing), None);

        existing.get_mut("high").unwrap().visible = false;
        assert_eq!(
            engine.find_node_at_point(Point::new(10.0, 0.0), &existing),
            Some("low")
        );
    }

    #[test]
    fn marquee_selects_overlapping_visible_nodes() {
        let engine = LayoutEngine::default();
        let mut existing = nodes(&[("a", 0.0, 0.0), ("b", 300.0, 0.0), ("c", 45.0, 45.0)]);
        existing.get_mut("c").unwrap().visible = false;

        let rect = Rect::from_corners(Point::new(35.0, 35.0), Point::new(100.0, 100.0));
        assert_eq!(engine.find_nodes_in_rect(rect, &existing), vec!["a".to_string()]);
    }
}
