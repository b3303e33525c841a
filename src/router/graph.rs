use tracing::debug;

use crate::geometry::{Point, Rect};

use super::grid::GridLines;
use super::hierarchy::Forest;

#[derive(Debug, Clone, PartialEq)]
pub struct Vert {
    pub id: usize,
    pub pos: Point,
    /// Innermost node the vertex belongs to: its boundary for ports, its
    /// interior for crossings and leaf centres.
    pub node: Option<usize>,
    /// The line a port sits on. Crossings lie on two lines and carry `None`.
    pub line: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridEdge {
    pub source: usize,
    pub target: usize,
    pub length: f32,
}

#[derive(Debug, Clone)]
pub struct GridLine {
    pub start: Point,
    pub end: Point,
    pub horizontal: bool,
    pub verts: Vec<usize>,
}

impl GridLine {
    fn along(&self, p: Point) -> f32 {
        if self.horizontal { p.x } else { p.y }
    }
}

/// Planar grid graph over line crossings and node-boundary ports.
#[derive(Debug, Clone, Default)]
pub struct RoutingGraph {
    pub verts: Vec<Vert>,
    pub edges: Vec<GridEdge>,
    pub lines: Vec<GridLine>,
}

impl RoutingGraph {
    /// Generates vertices and edges for `grid`, registering ports and leaf
    /// interiors on the forest's nodes.
    pub fn build(forest: &mut Forest, grid: &GridLines) -> Self {
        let mut graph = RoutingGraph::default();
        let Some(extent) = grid.extent() else {
            return graph;
        };

        for &y in &grid.ys {
            graph.lines.push(GridLine {
                start: Point::new(extent.x, y),
                end: Point::new(extent.right(), y),
                horizontal: true,
                verts: Vec::new(),
            });
        }
        let first_vertical = graph.lines.len();
        for &x in &grid.xs {
            graph.lines.push(GridLine {
                start: Point::new(x, extent.y),
                end: Point::new(x, extent.bottom()),
                horizontal: false,
                verts: Vec::new(),
            });
        }

        graph.add_crossings(forest, first_vertical);
        graph.add_leaf_interiors(forest);
        for line_idx in 0..graph.lines.len() {
            graph.add_ports(forest, line_idx);
            graph.add_line_edges(forest, line_idx);
        }

        debug!(
            lines = graph.lines.len(),
            verts = graph.verts.len(),
            edges = graph.edges.len(),
            "built routing graph"
        );
        graph
    }

    pub fn vert(&self, id: usize) -> &Vert {
        &self.verts[id]
    }

    fn push_vert(&mut self, pos: Point, node: Option<usize>, line: Option<usize>) -> usize {
        let id = self.verts.len();
        self.verts.push(Vert { id, pos, node, line });
        id
    }

    /// One vertex per horizontal/vertical crossing, owned by the innermost node
    /// strictly containing it. Crossings inside a leaf are left out: the leaf's
    /// interior is its single centre vertex.
    fn add_crossings(&mut self, forest: &Forest, first_vertical: usize) {
        let back_to_front = forest.back_to_front();
        for h in 0..first_vertical {
            for v in first_vertical..self.lines.len() {
                let p = Point::new(self.lines[v].start.x, self.lines[h].start.y);
                let owner = back_to_front
                    .iter()
                    .rev()
                    .copied()
                    .find(|&idx| forest.node(idx).rect.contains_strict(p));
                if owner.is_some_and(|idx| forest.node(idx).leaf) {
                    continue;
                }
                let id = self.push_vert(p, owner, None);
                self.lines[h].verts.push(id);
                self.lines[v].verts.push(id);
            }
        }
    }

    fn add_leaf_interiors(&mut self, forest: &mut Forest) {
        let leaves: Vec<(usize, Rect)> = forest.leaves().map(|n| (n.id, n.rect)).collect();
        for (idx, rect) in leaves {
            let id = self.push_vert(rect.center(), Some(idx), None);
            forest.node_mut(idx).interior = Some(id);
        }
    }

    fn add_ports(&mut self, forest: &mut Forest, line_idx: usize) {
        let (start, end) = (self.lines[line_idx].start, self.lines[line_idx].end);
        for idx in 0..forest.len() {
            let rect = forest.node(idx).rect;
            if rect.is_empty() {
                continue;
            }
            for p in rect.line_intersections(start, end) {
                let id = self.push_vert(p, Some(idx), Some(line_idx));
                self.lines[line_idx].verts.push(id);
                forest.node_mut(idx).ports.push(id);
            }
        }
    }

    /// Chains consecutive vertices along the line, never joining two vertices
    /// of the same leaf.
    fn add_line_edges(&mut self, forest: &Forest, line_idx: usize) {
        let line = &self.lines[line_idx];
        let mut order = line.verts.clone();
        order.sort_by(|&a, &b| {
            line.along(self.verts[a].pos)
                .total_cmp(&line.along(self.verts[b].pos))
                .then(a.cmp(&b))
        });
        let mut edges = Vec::with_capacity(order.len().saturating_sub(1));
        for pair in order.windows(2) {
            let (u, v) = (&self.verts[pair[0]], &self.verts[pair[1]]);
            if let (Some(a), Some(b)) = (u.node, v.node)
                && a == b
                && forest.node(a).leaf
            {
                continue;
            }
            edges.push(GridEdge {
                source: u.id,
                target: v.id,
                length: (line.along(v.pos) - line.along(u.pos)).abs(),
            });
        }
        self.lines[line_idx].verts = order;
        self.edges.extend(edges);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::grid::build_grid_lines;

    fn side_by_side() -> (Forest, RoutingGraph) {
        let mut forest = Forest::new(vec![
            (Some(Rect::new(0.0, 0.0, 100.0, 50.0)), Vec::new()),
            (Some(Rect::new(200.0, 0.0, 100.0, 50.0)), Vec::new()),
        ])
        .unwrap();
        let lines = build_grid_lines(&forest, 12.0);
        let graph = RoutingGraph::build(&mut forest, &lines);
        (forest, graph)
    }

    #[test]
    fn counts_for_two_leaves() {
        let (_, graph) = side_by_side();
        assert_eq!(graph.lines.len(), 8);
        // 13 crossings outside leaves, 2 centres, 8 ports
        assert_eq!(graph.verts.len(), 23);
        assert_eq!(graph.edges.len(), 22);
    }

    #[test]
    fn leaf_has_one_interior_vertex_and_boundary_ports() {
        let (forest, graph) = side_by_side();
        for leaf in forest.leaves() {
            let owned: Vec<&Vert> = graph.verts.iter().filter(|v| v.node == Some(leaf.id)).collect();
            let interior: Vec<&&Vert> = owned
                .iter()
                .filter(|v| leaf.rect.contains_strict(v.pos))
                .collect();
            assert_eq!(interior.len(), 1);
            assert_eq!(interior[0].pos, leaf.rect.center());
            assert_eq!(Some(interior[0].id), leaf.interior);
            assert_eq!(leaf.ports.len(), 4);
            for &port in &leaf.ports {
                assert!(leaf.rect.on_boundary(graph.vert(port).pos));
            }
        }
    }

    #[test]
    fn no_edge_inside_a_leaf() {
        let (forest, graph) = side_by_side();
        for edge in &graph.edges {
            let (a, b) = (graph.vert(edge.source).node, graph.vert(edge.target).node);
            if let (Some(a), Some(b)) = (a, b) {
                assert!(!(a == b && forest.node(a).leaf));
            }
        }
    }

    #[test]
    fn ports_follow_line_order() {
        let (forest, graph) = side_by_side();
        let ports: Vec<Point> = forest.node(0).ports.iter().map(|&p| graph.vert(p).pos).collect();
        assert_eq!(
            ports,
            vec![
                Point::new(100.0, 25.0),
                Point::new(0.0, 25.0),
                Point::new(50.0, 0.0),
                Point::new(50.0, 50.0),
            ]
        );
    }

    #[test]
    fn crossings_inside_groups_belong_to_the_group() {
        let mut forest = Forest::new(vec![
            (Some(Rect::new(0.0, 0.0, 40.0, 40.0)), Vec::new()),
            (Some(Rect::new(100.0, 0.0, 40.0, 40.0)), Vec::new()),
            (None, vec![0, 1]),
        ])
        .unwrap();
        forest.resolve_group_rects(12.0);
        let lines = build_grid_lines(&forest, 12.0);
        let graph = RoutingGraph::build(&mut forest, &lines);
        // the midline between the two leaves crosses the row line inside the group
        let mid = graph
            .verts
            .iter()
            .find(|v| v.line.is_none() && v.pos == Point::new(70.0, 20.0))
            .unwrap();
        assert_eq!(mid.node, Some(2));
        // group ports sit on the padded boundary
        assert!(
            forest
                .node(2)
                .ports
                .iter()
                .all(|&p| forest.node(2).rect.on_boundary(graph.vert(p).pos))
        );
        assert!(!forest.node(2).ports.is_empty());
    }

    #[test]
    fn edge_lengths_match_axis_distance() {
        let (_, graph) = side_by_side();
        for edge in &graph.edges {
            let d = graph.vert(edge.source).pos.distance(&graph.vert(edge.target).pos);
            assert!((d - edge.length).abs() < 1e-4);
        }
    }
}
