//! Orthogonal edge routing between hierarchically grouped rectangles.
//!
//! Construction resolves group boxes and builds an immutable grid graph; each
//! request then searches that graph with its own obstacle set. Batch routing
//! adds edge ordering and nudging so routes sharing a corridor are drawn apart.

pub mod graph;
pub mod grid;
pub mod hierarchy;
pub mod nudge;
pub mod ordering;
pub mod search;
pub mod segments;
pub mod solver;

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::config::RouterConfig;
use crate::error::{Result, RouteError};
use crate::geometry::{Axis, Point, Rect};
use crate::scene::{Scene, SceneNode};

use graph::{GridEdge, RoutingGraph, Vert};
use grid::build_grid_lines;
use hierarchy::{Forest, NodeWrapper, Parent};
use nudge::{Nudger, unreverse_edges};
use ordering::order_edges;
use search::{Adjacency, SearchFailure, shortest_path};
use segments::{Segment, make_segments_with};

/// Reads geometry and nesting out of caller-owned nodes.
pub trait NodeAccessor<N> {
    /// Bounding box of the node. Groups may return `None`; their box is
    /// always recomputed from their children.
    fn bounds(&self, node: &N) -> Option<Rect>;
    /// Indices, into the same node list, of the node's direct children.
    fn children(&self, node: &N) -> Vec<usize>;
}

impl<N, B, C> NodeAccessor<N> for (B, C)
where
    B: Fn(&N) -> Option<Rect>,
    C: Fn(&N) -> Vec<usize>,
{
    fn bounds(&self, node: &N) -> Option<Rect> {
        (self.0)(node)
    }

    fn children(&self, node: &N) -> Vec<usize> {
        (self.1)(node)
    }
}

#[derive(Debug, Clone)]
pub struct GridRouter {
    forest: Forest,
    graph: RoutingGraph,
    config: RouterConfig,
}

impl GridRouter {
    pub fn new<N, A>(nodes: &[N], accessor: &A, config: &RouterConfig) -> Result<Self>
    where
        A: NodeAccessor<N>,
    {
        let entries = nodes
            .iter()
            .map(|n| (accessor.bounds(n), accessor.children(n)))
            .collect();
        let mut forest = Forest::new(entries)?;
        forest.resolve_group_rects(config.group_padding);
        let lines = build_grid_lines(&forest, config.group_padding);
        let graph = RoutingGraph::build(&mut forest, &lines);
        debug!(
            nodes = forest.len(),
            cols = lines.cols.len(),
            rows = lines.rows.len(),
            "grid router ready"
        );
        Ok(Self {
            forest,
            graph,
            config: config.clone(),
        })
    }

    pub fn from_scene(scene: &Scene, config: &RouterConfig) -> Result<Self> {
        Self::new::<SceneNode, Scene>(&scene.nodes, scene, config)
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    pub fn nodes(&self) -> &[NodeWrapper] {
        self.forest.nodes()
    }

    pub fn verts(&self) -> &[Vert] {
        &self.graph.verts
    }

    pub fn edges(&self) -> &[GridEdge] {
        &self.graph.edges
    }

    /// Resolved box of a node; groups report their padded box.
    pub fn node_rect(&self, idx: usize) -> Option<Rect> {
        self.forest.nodes().get(idx).map(|n| n.rect)
    }

    pub fn lineage(&self, idx: usize) -> Result<Vec<usize>> {
        self.check(idx)?;
        Ok(self.forest.lineage(idx))
    }

    pub fn common_ancestor(&self, a: usize, b: usize) -> Result<Parent> {
        self.check(a)?;
        self.check(b)?;
        Ok(self.forest.common_ancestor(a, b))
    }

    /// Nodes a route from `a` to `b` may not pass through.
    pub fn sibling_obstacles(&self, a: usize, b: usize) -> Result<Vec<usize>> {
        self.check(a)?;
        self.check(b)?;
        Ok(self.forest.sibling_obstacles(a, b))
    }

    /// Shortest orthogonal path between two nodes, from a boundary point of
    /// `source` to a boundary point of `target`.
    pub fn route(&self, source: usize, target: usize) -> Result<Vec<Point>> {
        let path = self.route_vertices(source, target)?;
        Ok(path.into_iter().map(|v| self.graph.verts[v].pos).collect())
    }

    /// Routes every edge, orders routes sharing a corridor, and nudges them at
    /// least `gap` apart. Self edges come back with no segments.
    pub fn route_edges<E, S, T>(
        &self,
        edges: &[E],
        gap: f32,
        source_of: S,
        target_of: T,
    ) -> Result<Vec<Vec<Segment>>>
    where
        S: Fn(&E) -> usize,
        T: Fn(&E) -> usize,
    {
        if gap.is_nan() || gap < 0.0 {
            return Err(RouteError::NegativeGap(gap));
        }
        let pairs: Vec<(usize, usize)> = edges.iter().map(|e| (source_of(e), target_of(e))).collect();

        #[cfg(feature = "parallel")]
        let paths = pairs
            .par_iter()
            .map(|&(s, t)| self.route(s, t))
            .collect::<Result<Vec<_>>>()?;
        #[cfg(not(feature = "parallel"))]
        let paths = pairs
            .iter()
            .map(|&(s, t)| self.route(s, t))
            .collect::<Result<Vec<_>>>()?;

        let mut paths = paths;
        let order = order_edges(&mut paths);
        let mut routes: Vec<Vec<Segment>> = paths
            .iter()
            .map(|p| make_segments_with(p, self.config.collinear_tolerance))
            .collect();

        let nudger = Nudger {
            gap,
            tolerance: self.config.bucket_tolerance,
            max_iterations: self.config.max_solver_iterations,
        };
        nudger.nudge(&mut routes, Axis::X, &order);
        nudger.nudge(&mut routes, Axis::Y, &order);
        unreverse_edges(&mut routes, &order);

        debug!(edges = routes.len(), ordered_pairs = order.pairs(), "routed edges");
        Ok(routes)
    }

    fn check(&self, idx: usize) -> Result<()> {
        let len = self.forest.len();
        if idx >= len {
            return Err(RouteError::IndexOutOfRange { index: idx, len });
        }
        Ok(())
    }

    fn route_vertices(&self, source: usize, target: usize) -> Result<Vec<usize>> {
        self.check(source)?;
        self.check(target)?;
        let disconnected = RouteError::DisconnectedGraph {
            from: source,
            to: target,
        };
        let src = self.forest.node(source);
        let dst = self.forest.node(target);
        let (Some(&start), Some(&goal)) = (src.ports.first(), dst.ports.first()) else {
            return Err(disconnected);
        };
        if source == target {
            return Ok(vec![start]);
        }

        let obstacles = self.forest.sibling_obstacles(source, target);
        let mut blocked = vec![false; self.forest.len()];
        for &o in &obstacles {
            blocked[o] = true;
        }
        let is_blocked = |v: usize| self.graph.verts[v].node.is_some_and(|n| blocked[n]);

        let mut adjacency = Adjacency::new(self.graph.verts.len());
        for e in &self.graph.edges {
            if !is_blocked(e.source) && !is_blocked(e.target) {
                adjacency.add_edge(e.source, e.target, e.length);
            }
        }
        for node in [src, dst] {
            for &port in &node.ports[1..] {
                adjacency.add_edge(node.ports[0], port, 0.0);
            }
        }

        let verts = &self.graph.verts;
        let (penalty, threshold) = (self.config.bend_penalty, self.config.bend_threshold);
        let turn_cost = |u: usize, v: usize, w: usize| {
            let (a, b, c) = (&verts[u], &verts[v], &verts[w]);
            let inside_source = a.node == Some(source) && b.node == Some(source);
            let inside_target = b.node == Some(target) && c.node == Some(target);
            if inside_source || inside_target {
                return 0.0;
            }
            let dx = (c.pos.x - a.pos.x).abs();
            let dy = (c.pos.y - a.pos.y).abs();
            if dx > threshold && dy > threshold {
                penalty
            } else {
                0.0
            }
        };
        let gap = src.rect.manhattan_gap(&dst.rect);
        let heuristic = |v: usize| {
            let p = verts[v].pos;
            dst.rect
                .manhattan_distance(p)
                .min(src.rect.manhattan_distance(p) + gap)
        };

        let mut path = shortest_path(
            &adjacency,
            start,
            goal,
            self.config.max_search_steps,
            turn_cost,
            heuristic,
        )
        .map_err(|failure| match failure {
            SearchFailure::Unreachable => disconnected,
            SearchFailure::Exhausted(steps) => {
                warn!(source, target, steps, "route search exhausted");
                RouteError::SearchExhausted {
                    from: source,
                    to: target,
                    steps,
                }
            }
        })?;

        // strip the zero-length hops between ports of the same end node
        let is_port = |node: &NodeWrapper, v: usize| node.ports.contains(&v);
        let mut first = 0;
        while first + 1 < path.len() && is_port(src, path[first]) && is_port(src, path[first + 1]) {
            first += 1;
        }
        while path.len() > first + 1
            && is_port(dst, path[path.len() - 1])
            && is_port(dst, path[path.len() - 2])
        {
            path.pop();
        }
        path.drain(..first);

        debug!(source, target, vertices = path.len(), obstacles = obstacles.len(), "routed");
        Ok(path)
    }
}
