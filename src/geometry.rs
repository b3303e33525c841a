use serde::{Deserialize, Serialize};

/// Distance below which two coordinates are treated as the same grid position.
pub const COORD_EPSILON: f32 = 1e-3;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn approx_eq(&self, other: &Point) -> bool {
        (self.x - other.x).abs() <= COORD_EPSILON && (self.y - other.y).abs() <= COORD_EPSILON
    }

    pub fn distance(&self, other: &Point) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }
}

impl From<(f32, f32)> for Point {
    fn from((x, y): (f32, f32)) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
}

impl Axis {
    pub fn other(self) -> Self {
        match self {
            Axis::X => Axis::Y,
            Axis::Y => Axis::X,
        }
    }

    pub fn of(self, p: Point) -> f32 {
        match self {
            Axis::X => p.x,
            Axis::Y => p.y,
        }
    }

    pub fn set(self, p: &mut Point, value: f32) {
        match self {
            Axis::X => p.x = value,
            Axis::Y => p.y = value,
        }
    }
}

/// Axis-aligned box. `width`/`height` are never negative for boxes built through
/// the constructors below; an [`Rect::empty`] box is the identity for [`Rect::union`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn from_corners(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self {
            x: x1.min(x2),
            y: y1.min(y2),
            width: (x2 - x1).abs(),
            height: (y2 - y1).abs(),
        }
    }

    pub fn empty() -> Self {
        Self {
            x: f32::INFINITY,
            y: f32::INFINITY,
            width: f32::NEG_INFINITY,
            height: f32::NEG_INFINITY,
        }
    }

    pub fn is_empty(&self) -> bool {
        !(self.x.is_finite() && self.y.is_finite()) || self.width < 0.0 || self.height < 0.0
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn cx(&self) -> f32 {
        self.x + self.width / 2.0
    }

    pub fn cy(&self) -> f32 {
        self.y + self.height / 2.0
    }

    pub fn center(&self) -> Point {
        Point::new(self.cx(), self.cy())
    }

    pub fn center_on(&self, axis: Axis) -> f32 {
        match axis {
            Axis::X => self.cx(),
            Axis::Y => self.cy(),
        }
    }

    pub fn union(&self, other: &Rect) -> Rect {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        Rect::from_corners(
            self.x.min(other.x),
            self.y.min(other.y),
            self.right().max(other.right()),
            self.bottom().max(other.bottom()),
        )
    }

    pub fn inflate(&self, pad: f32) -> Rect {
        if self.is_empty() {
            return *self;
        }
        Rect::new(
            self.x - pad,
            self.y - pad,
            self.width + 2.0 * pad,
            self.height + 2.0 * pad,
        )
    }

    pub fn overlaps_x(&self, other: &Rect) -> bool {
        self.x < other.right() && other.x < self.right()
    }

    pub fn overlaps_y(&self, other: &Rect) -> bool {
        self.y < other.bottom() && other.y < self.bottom()
    }

    pub fn overlaps_on(&self, axis: Axis, other: &Rect) -> bool {
        match axis {
            Axis::X => self.overlaps_x(other),
            Axis::Y => self.overlaps_y(other),
        }
    }

    /// True when `p` lies strictly inside the box (boundary excluded).
    pub fn contains_strict(&self, p: Point) -> bool {
        (p.x - self.cx()).abs() < self.width / 2.0 && (p.y - self.cy()).abs() < self.height / 2.0
    }

    pub fn on_boundary(&self, p: Point) -> bool {
        let within_x = p.x >= self.x - COORD_EPSILON && p.x <= self.right() + COORD_EPSILON;
        let within_y = p.y >= self.y - COORD_EPSILON && p.y <= self.bottom() + COORD_EPSILON;
        let on_vertical =
            (p.x - self.x).abs() <= COORD_EPSILON || (p.x - self.right()).abs() <= COORD_EPSILON;
        let on_horizontal =
            (p.y - self.y).abs() <= COORD_EPSILON || (p.y - self.bottom()).abs() <= COORD_EPSILON;
        (on_vertical && within_y) || (on_horizontal && within_x)
    }

    /// Manhattan distance from `p` to the nearest point of the box; zero inside.
    pub fn manhattan_distance(&self, p: Point) -> f32 {
        let dx = (self.x - p.x).max(0.0).max(p.x - self.right());
        let dy = (self.y - p.y).max(0.0).max(p.y - self.bottom());
        dx + dy
    }

    /// Manhattan gap between two boxes; zero when they overlap or touch.
    pub fn manhattan_gap(&self, other: &Rect) -> f32 {
        let dx = (other.x - self.right()).max(self.x - other.right()).max(0.0);
        let dy = (other.y - self.bottom()).max(self.y - other.bottom()).max(0.0);
        dx + dy
    }

    /// Points where the segment `a`-`b` crosses the boundary, visiting the sides
    /// top, right, bottom, left. Touching a corner or running along a side does
    /// not count as a crossing.
    pub fn line_intersections(&self, a: Point, b: Point) -> Vec<Point> {
        let sides = [
            (Point::new(self.x, self.y), Point::new(self.right(), self.y)),
            (
                Point::new(self.right(), self.y),
                Point::new(self.right(), self.bottom()),
            ),
            (
                Point::new(self.right(), self.bottom()),
                Point::new(self.x, self.bottom()),
            ),
            (Point::new(self.x, self.bottom()), Point::new(self.x, self.y)),
        ];
        sides
            .iter()
            .filter_map(|(s, e)| segment_intersection(a, b, *s, *e))
            .collect()
    }
}

/// Intersection of segment `a`-`b` with side `s`-`e`. The side parameter must be
/// strictly interior so corners are never reported; parallel pairs never intersect.
fn segment_intersection(a: Point, b: Point, s: Point, e: Point) -> Option<Point> {
    let r = (b.x - a.x, b.y - a.y);
    let q = (e.x - s.x, e.y - s.y);
    let denom = r.0 * q.1 - r.1 * q.0;
    if denom.abs() <= f32::EPSILON {
        return None;
    }
    let w = (s.x - a.x, s.y - a.y);
    let t = (w.0 * q.1 - w.1 * q.0) / denom;
    let u = (w.0 * r.1 - w.1 * r.0) / denom;
    if !(0.0..=1.0).contains(&t) || u <= 0.0 || u >= 1.0 {
        return None;
    }
    let mut p = Point::new(a.x + t * r.0, a.y + t * r.1);
    // snap to the exact coordinates of axis-aligned inputs
    if q.1 == 0.0 {
        p.y = s.y;
    } else if q.0 == 0.0 {
        p.x = s.x;
    }
    if r.0 == 0.0 {
        p.x = a.x;
    } else if r.1 == 0.0 {
        p.y = a.y;
    }
    Some(p)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_with_empty_is_identity() {
        let r = Rect::new(1.0, 2.0, 3.0, 4.0);
        assert_eq!(Rect::empty().union(&r), r);
        assert_eq!(r.union(&Rect::empty()), r);
    }

    #[test]
    fn union_and_inflate() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(20.0, 5.0, 10.0, 20.0);
        let u = a.union(&b);
        assert_eq!(u, Rect::new(0.0, 0.0, 30.0, 25.0));
        assert_eq!(u.inflate(2.0), Rect::new(-2.0, -2.0, 34.0, 29.0));
    }

    #[test]
    fn horizontal_line_crosses_left_and_right_sides() {
        let r = Rect::new(10.0, 10.0, 20.0, 10.0);
        let hits = r.line_intersections(Point::new(0.0, 15.0), Point::new(50.0, 15.0));
        assert_eq!(hits, vec![Point::new(30.0, 15.0), Point::new(10.0, 15.0)]);
    }

    #[test]
    fn vertical_line_crosses_top_and_bottom_sides() {
        let r = Rect::new(10.0, 10.0, 20.0, 10.0);
        let hits = r.line_intersections(Point::new(15.0, -5.0), Point::new(15.0, 40.0));
        assert_eq!(hits, vec![Point::new(15.0, 10.0), Point::new(15.0, 20.0)]);
    }

    #[test]
    fn tangent_lines_do_not_cross() {
        let r = Rect::new(10.0, 10.0, 20.0, 10.0);
        assert!(
            r.line_intersections(Point::new(0.0, 10.0), Point::new(50.0, 10.0))
                .is_empty()
        );
        assert!(
            r.line_intersections(Point::new(0.0, 5.0), Point::new(50.0, 5.0))
                .is_empty()
        );
    }

    #[test]
    fn overlap_tests_are_strict() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let touching = Rect::new(10.0, 0.0, 10.0, 10.0);
        let overlapping = Rect::new(5.0, 20.0, 10.0, 10.0);
        assert!(!a.overlaps_x(&touching));
        assert!(a.overlaps_y(&touching));
        assert!(a.overlaps_x(&overlapping));
        assert!(!a.overlaps_y(&overlapping));
    }

    #[test]
    fn boundary_and_interior() {
        let r = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!(r.contains_strict(Point::new(5.0, 5.0)));
        assert!(!r.contains_strict(Point::new(10.0, 5.0)));
        assert!(r.on_boundary(Point::new(10.0, 5.0)));
        assert!(!r.on_boundary(Point::new(5.0, 5.0)));
        assert_eq!(r.manhattan_distance(Point::new(13.0, -4.0)), 7.0);
        assert_eq!(r.manhattan_distance(Point::new(3.0, 3.0)), 0.0);
    }

    #[test]
    fn gap_between_boxes() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert_eq!(a.manhattan_gap(&Rect::new(30.0, 15.0, 5.0, 5.0)), 25.0);
        assert_eq!(a.manhattan_gap(&Rect::new(5.0, 5.0, 10.0, 10.0)), 0.0);
        assert_eq!(Rect::new(30.0, 15.0, 5.0, 5.0).manhattan_gap(&a), 25.0);
    }
}
