use serde::{Deserialize, Serialize};

use crate::geometry::{Axis, COORD_EPSILON, Point};

/// Sine of the largest angle still treated as "straight on".
pub const COLLINEAR_TOLERANCE: f32 = 1e-3;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub start: Point,
    pub end: Point,
}

impl Segment {
    pub fn new(start: Point, end: Point) -> Self {
        Self { start, end }
    }

    /// True when both ends share the `axis` coordinate, i.e. the segment runs
    /// along the other axis.
    pub fn is_constant_on(&self, axis: Axis, tolerance: f32) -> bool {
        (axis.of(self.end) - axis.of(self.start)).abs() < tolerance
    }

    pub fn reversed(&self) -> Self {
        Self {
            start: self.end,
            end: self.start,
        }
    }

    pub fn length(&self) -> f32 {
        self.start.distance(&self.end)
    }
}

fn collinear(a: Point, b: Point, c: Point, tolerance: f32) -> bool {
    let d1 = (b.x - a.x, b.y - a.y);
    let d2 = (c.x - b.x, c.y - b.y);
    let cross = d1.0 * d2.1 - d1.1 * d2.0;
    let dot = d1.0 * d2.0 + d1.1 * d2.1;
    let scale = (d1.0.hypot(d1.1) * d2.0.hypot(d2.1)).max(f32::MIN_POSITIVE);
    dot > 0.0 && cross.abs() <= tolerance * scale
}

/// Drops repeated points and every interior point of a straight run, leaving
/// only the polyline's corners. Applying it twice changes nothing.
pub fn merge_collinear(points: &[Point], tolerance: f32) -> Vec<Point> {
    let mut out: Vec<Point> = Vec::with_capacity(points.len());
    for &p in points {
        if out.last().is_some_and(|last| last.approx_eq(&p)) {
            continue;
        }
        while out.len() >= 2 && collinear(out[out.len() - 2], out[out.len() - 1], p, tolerance) {
            out.pop();
        }
        if out.last().is_some_and(|last| last.approx_eq(&p)) {
            continue;
        }
        out.push(p);
    }
    out
}

/// Minimal list of straight segments covering the same polyline as `points`.
pub fn make_segments(points: &[Point]) -> Vec<Segment> {
    make_segments_with(points, COLLINEAR_TOLERANCE)
}

pub fn make_segments_with(points: &[Point], tolerance: f32) -> Vec<Segment> {
    merge_collinear(points, tolerance)
        .windows(2)
        .map(|w| Segment::new(w[0], w[1]))
        .collect()
}

/// Corner points of a chained segment list.
pub fn segment_points(segments: &[Segment]) -> Vec<Point> {
    let mut points = Vec::with_capacity(segments.len() + 1);
    if let Some(first) = segments.first() {
        points.push(first.start);
    }
    points.extend(segments.iter().map(|s| s.end));
    points
}

/// Number of direction changes along the polyline.
pub fn bend_count(points: &[Point]) -> usize {
    let corners = merge_collinear(points, COLLINEAR_TOLERANCE);
    corners.len().saturating_sub(2)
}

/// True when every segment is horizontal or vertical.
pub fn is_orthogonal(segments: &[Segment]) -> bool {
    segments.iter().all(|s| {
        s.is_constant_on(Axis::X, COORD_EPSILON) || s.is_constant_on(Axis::Y, COORD_EPSILON)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pts(raw: &[(f32, f32)]) -> Vec<Point> {
        raw.iter().copied().map(Point::from).collect()
    }

    #[test]
    fn merges_straight_runs() {
        let path = pts(&[(0.0, 0.0), (10.0, 0.0), (20.0, 0.0), (20.0, 5.0), (20.0, 30.0)]);
        let segments = make_segments(&path);
        assert_eq!(
            segments,
            vec![
                Segment::new(Point::new(0.0, 0.0), Point::new(20.0, 0.0)),
                Segment::new(Point::new(20.0, 0.0), Point::new(20.0, 30.0)),
            ]
        );
        assert_eq!(bend_count(&path), 1);
    }

    #[test]
    fn drops_repeated_points() {
        let path = pts(&[(0.0, 0.0), (0.0, 0.0), (5.0, 0.0), (5.0, 0.0)]);
        assert_eq!(merge_collinear(&path, COLLINEAR_TOLERANCE), pts(&[(0.0, 0.0), (5.0, 0.0)]));
    }

    #[test]
    fn keeps_reversals() {
        let path = pts(&[(0.0, 0.0), (10.0, 0.0), (5.0, 0.0)]);
        assert_eq!(merge_collinear(&path, COLLINEAR_TOLERANCE).len(), 3);
    }

    #[test]
    fn degenerate_inputs() {
        assert!(make_segments(&[]).is_empty());
        assert!(make_segments(&pts(&[(1.0, 1.0)])).is_empty());
        assert_eq!(make_segments(&pts(&[(1.0, 1.0), (1.0, 4.0)])).len(), 1);
    }

    #[test]
    fn make_segments_is_idempotent() {
        // deterministic pseudo-random orthogonal walks
        let mut seed = 0x2545_f491_u32;
        let mut next = move || {
            seed ^= seed << 13;
            seed ^= seed >> 17;
            seed ^= seed << 5;
            seed
        };
        for _ in 0..200 {
            let mut p = Point::new(0.0, 0.0);
            let mut path = vec![p];
            for _ in 0..(next() % 12) {
                let step = (next() % 4) as f32 * 10.0;
                if next() % 2 == 0 {
                    p.x += step;
                } else {
                    p.y += step;
                }
                path.push(p);
            }
            let once = make_segments(&path);
            let twice = make_segments(&segment_points(&once));
            assert_eq!(once, twice);
            assert!(is_orthogonal(&once));
            assert!(once.len() + 1 <= path.len().max(1));
        }
    }

    #[test]
    fn segment_axis_tests() {
        let vertical = Segment::new(Point::new(3.0, 0.0), Point::new(3.0, 9.0));
        assert!(vertical.is_constant_on(Axis::X, 0.1));
        assert!(!vertical.is_constant_on(Axis::Y, 0.1));
        assert_eq!(vertical.reversed().start, Point::new(3.0, 9.0));
        assert_eq!(vertical.length(), 9.0);
    }
}
