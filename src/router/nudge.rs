use std::cmp::Ordering;

use tracing::trace;

use crate::geometry::Axis;

use super::ordering::EdgeOrder;
use super::segments::Segment;
use super::solver::{Separation, solve};

/// Segment `index` of route `edge`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentRef {
    pub edge: usize,
    pub index: usize,
}

/// Parallel segments sharing (within tolerance) one coordinate on the nudged axis.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentSet {
    pub pos: f32,
    pub members: Vec<SegmentRef>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum EventKind {
    Open,
    Close,
}

/// Pushes apart overlapping parallel segments of different routes.
#[derive(Debug, Clone, Copy)]
pub struct Nudger {
    pub gap: f32,
    pub tolerance: f32,
    pub max_iterations: usize,
}

impl Nudger {
    /// One pass over segments that are constant on `axis`, moving them along it.
    pub fn nudge(&self, routes: &mut [Vec<Segment>], axis: Axis, order: &EdgeOrder) {
        for set in segment_sets(routes, axis, self.tolerance) {
            for bundle in overlapping_bundles(routes, &set, axis.other()) {
                if bundle.len() > 1 {
                    self.nudge_bundle(routes, &bundle, axis, order);
                }
            }
        }
    }

    fn nudge_bundle(
        &self,
        routes: &mut [Vec<Segment>],
        bundle: &[SegmentRef],
        axis: Axis,
        order: &EdgeOrder,
    ) {
        let perp = axis.other();
        let segs: Vec<Segment> = bundle.iter().map(|r| routes[r.edge][r.index]).collect();
        let desired: Vec<f64> = segs.iter().map(|s| axis.of(s.start) as f64).collect();

        let mut constraints = Vec::new();
        for (i, a) in bundle.iter().enumerate() {
            for (j, b) in bundle.iter().enumerate() {
                if i == j || !order.left_of(a.edge, b.edge) {
                    continue;
                }
                let s = segs[i];
                let increasing = perp.of(s.start) < perp.of(s.end);
                let flip = match axis {
                    Axis::X => increasing,
                    Axis::Y => !increasing,
                };
                let (l, r) = if flip { (j, i) } else { (i, j) };
                constraints.push(Separation::new(l, r, self.gap as f64));
            }
        }
        if constraints.is_empty() {
            return;
        }

        let solution = solve(&desired, &constraints, self.max_iterations);
        trace!(
            segments = bundle.len(),
            constraints = constraints.len(),
            iterations = solution.iterations,
            "nudged bundle"
        );
        for (r, &pos) in bundle.iter().zip(&solution.positions) {
            move_segment(&mut routes[r.edge], r.index, axis, pos as f32);
        }
    }
}

/// Moves segment `index` to `pos` on `axis`, dragging the shared ends of its
/// neighbours along.
fn move_segment(route: &mut [Segment], index: usize, axis: Axis, pos: f32) {
    let seg = &mut route[index];
    axis.set(&mut seg.start, pos);
    axis.set(&mut seg.end, pos);
    if index > 0 {
        axis.set(&mut route[index - 1].end, pos);
    }
    if index + 1 < route.len() {
        axis.set(&mut route[index + 1].start, pos);
    }
}

/// Buckets segments constant on `axis` by that coordinate.
pub fn segment_sets(routes: &[Vec<Segment>], axis: Axis, tolerance: f32) -> Vec<SegmentSet> {
    let mut parallel: Vec<(f32, SegmentRef)> = Vec::new();
    for (edge, route) in routes.iter().enumerate() {
        for (index, seg) in route.iter().enumerate() {
            if seg.is_constant_on(axis, tolerance) {
                parallel.push((axis.of(seg.start), SegmentRef { edge, index }));
            }
        }
    }
    parallel.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut sets: Vec<SegmentSet> = Vec::new();
    for (pos, seg) in parallel {
        match sets.last_mut() {
            Some(set) if (pos - set.pos).abs() <= tolerance => set.members.push(seg),
            _ => sets.push(SegmentSet {
                pos,
                members: vec![seg],
            }),
        }
    }
    sets
}

/// Splits a set into maximal groups whose extents along `along` overlap
/// transitively. Segments that only touch end to start share a group.
fn overlapping_bundles(routes: &[Vec<Segment>], set: &SegmentSet, along: Axis) -> Vec<Vec<SegmentRef>> {
    let mut events: Vec<(f32, EventKind, SegmentRef)> = Vec::with_capacity(set.members.len() * 2);
    for &r in &set.members {
        let seg = routes[r.edge][r.index];
        let (a, b) = (along.of(seg.start), along.of(seg.end));
        events.push((a.min(b), EventKind::Open, r));
        events.push((a.max(b), EventKind::Close, r));
    }
    events.sort_by(|a, b| match a.0.total_cmp(&b.0) {
        Ordering::Equal => a.1.cmp(&b.1),
        other => other,
    });

    let mut bundles = Vec::new();
    let mut open = Vec::new();
    let mut depth = 0usize;
    for (_, kind, r) in events {
        match kind {
            EventKind::Open => {
                open.push(r);
                depth += 1;
            }
            EventKind::Close => depth = depth.saturating_sub(1),
        }
        if depth == 0 && !open.is_empty() {
            bundles.push(std::mem::take(&mut open));
        }
    }
    bundles
}

/// Restores the original direction of routes that edge ordering compared
/// backwards.
pub fn unreverse_edges(routes: &mut [Vec<Segment>], order: &EdgeOrder) {
    for (edge, route) in routes.iter_mut().enumerate() {
        if order.is_reversed(edge) {
            route.reverse();
            for seg in route.iter_mut() {
                *seg = seg.reversed();
            }
        }
    }
}
