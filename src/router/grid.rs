use crate::geometry::{Axis, COORD_EPSILON, Rect};

use super::hierarchy::Forest;

/// A column (`Axis::X`) or row (`Axis::Y`) of leaves that overlap along that axis.
#[derive(Debug, Clone, PartialEq)]
pub struct Band {
    pub pos: f32,
    pub members: Vec<usize>,
}

/// Grid line positions. `xs` are vertical lines, `ys` horizontal ones; both keep
/// band lines first, then midlines, then any per-leaf lines.
#[derive(Debug, Clone, Default)]
pub struct GridLines {
    pub cols: Vec<Band>,
    pub rows: Vec<Band>,
    pub xs: Vec<f32>,
    pub ys: Vec<f32>,
}

impl GridLines {
    /// Span of horizontal lines (along x) and vertical lines (along y).
    pub fn extent(&self) -> Option<Rect> {
        let (min_x, max_x) = min_max(&self.xs)?;
        let (min_y, max_y) = min_max(&self.ys)?;
        Some(Rect::from_corners(min_x, min_y, max_x, max_y))
    }
}

/// Greedily partitions leaves into bands: the first remaining leaf claims every
/// remaining leaf overlapping it along `axis`; the band sits at the mean centre.
/// Bands come back sorted by position.
pub fn compute_grid_dimension(leaves: &[(usize, Rect)], axis: Axis) -> Vec<Band> {
    let mut pool: Vec<(usize, Rect)> = leaves.to_vec();
    let mut bands = Vec::new();
    while !pool.is_empty() {
        let (first_id, first_rect) = pool.remove(0);
        let mut members = vec![(first_id, first_rect)];
        pool.retain(|(id, rect)| {
            if rect.overlaps_on(axis, &first_rect) {
                members.push((*id, *rect));
                false
            } else {
                true
            }
        });
        let pos = members.iter().map(|(_, r)| r.center_on(axis)).sum::<f32>() / members.len() as f32;
        bands.push(Band {
            pos,
            members: members.into_iter().map(|(id, _)| id).collect(),
        });
    }
    bands.sort_by(|a, b| a.pos.total_cmp(&b.pos));
    bands
}

/// For `n` sorted band positions returns `n + 1` boundaries: a half-gap before the
/// first, the midpoint of each consecutive pair, and a half-gap after the last.
pub fn midpoints(coords: &[f32]) -> Vec<f32> {
    let Some((&first, &last)) = coords.first().zip(coords.last()) else {
        return Vec::new();
    };
    let head_gap = if coords.len() > 1 { coords[1] - coords[0] } else { 0.0 };
    let tail_gap = if coords.len() > 1 {
        coords[coords.len() - 1] - coords[coords.len() - 2]
    } else {
        0.0
    };
    let mut mids = Vec::with_capacity(coords.len() + 1);
    mids.push(first - head_gap / 2.0);
    for pair in coords.windows(2) {
        mids.push((pair[0] + pair[1]) / 2.0);
    }
    mids.push(last + tail_gap / 2.0);
    mids
}

/// Builds all grid lines for a forest whose group rectangles are already resolved.
pub fn build_grid_lines(forest: &Forest, padding: f32) -> GridLines {
    let leaves: Vec<(usize, Rect)> = forest.leaves().map(|n| (n.id, n.rect)).collect();
    if leaves.is_empty() {
        return GridLines::default();
    }
    let cols = compute_grid_dimension(&leaves, Axis::X);
    let rows = compute_grid_dimension(&leaves, Axis::Y);

    let bounds = forest
        .nodes()
        .iter()
        .fold(Rect::empty(), |acc, n| acc.union(&n.rect));

    let mut xs: Vec<f32> = cols.iter().map(|c| c.pos).collect();
    let mut col_mids = midpoints(&xs);
    clear_bounds(&mut col_mids, bounds.x - padding, bounds.right() + padding);
    push_unique(&mut xs, col_mids);

    let mut ys: Vec<f32> = rows.iter().map(|r| r.pos).collect();
    let mut row_mids = midpoints(&ys);
    clear_bounds(&mut row_mids, bounds.y - padding, bounds.bottom() + padding);
    push_unique(&mut ys, row_mids);

    for (_, rect) in &leaves {
        if !xs.iter().any(|&x| x > rect.x && x < rect.right()) {
            push_unique(&mut xs, [rect.cx()]);
        }
        if !ys.iter().any(|&y| y > rect.y && y < rect.bottom()) {
            push_unique(&mut ys, [rect.cy()]);
        }
    }

    GridLines { cols, rows, xs, ys }
}

/// Pushes the outermost midlines out so they clear `[lo, hi]`.
fn clear_bounds(mids: &mut [f32], lo: f32, hi: f32) {
    if let Some(first) = mids.first_mut() {
        *first = first.min(lo);
    }
    if let Some(last) = mids.last_mut() {
        *last = last.max(hi);
    }
}

fn push_unique(lines: &mut Vec<f32>, extra: impl IntoIterator<Item = f32>) {
    for value in extra {
        if !lines.iter().any(|&l| (l - value).abs() <= COORD_EPSILON) {
            lines.push(value);
        }
    }
}

fn min_max(values: &[f32]) -> Option<(f32, f32)> {
    let first = *values.first()?;
    Some(
        values
            .iter()
            .fold((first, first), |(lo, hi), &v| (lo.min(v), hi.max(v))),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect_leaves(rects: &[Rect]) -> Vec<(usize, Rect)> {
        rects.iter().copied().enumerate().collect()
    }

    #[test]
    fn midpoints_pad_both_ends() {
        assert_eq!(midpoints(&[50.0, 150.0, 250.0]), vec![0.0, 100.0, 200.0, 300.0]);
        assert_eq!(midpoints(&[0.0, 10.0, 40.0]), vec![-5.0, 5.0, 25.0, 55.0]);
        assert_eq!(midpoints(&[25.0]), vec![25.0, 25.0]);
        assert!(midpoints(&[]).is_empty());
    }

    #[test]
    fn bands_cover_every_leaf_once() {
        let leaves = rect_leaves(&[
            Rect::new(0.0, 0.0, 40.0, 20.0),
            Rect::new(100.0, 0.0, 40.0, 20.0),
            Rect::new(10.0, 60.0, 40.0, 20.0),
            Rect::new(200.0, 60.0, 40.0, 20.0),
        ]);
        let cols = compute_grid_dimension(&leaves, Axis::X);
        assert_eq!(cols.len(), 3);
        assert_eq!(cols[0].members, vec![0, 2]);
        assert_eq!(cols[0].pos, 25.0);
        assert_eq!(cols[1].members, vec![1]);
        assert_eq!(cols[2].members, vec![3]);

        let rows = compute_grid_dimension(&leaves, Axis::Y);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].members, vec![0, 1]);
        assert_eq!(rows[0].pos, 10.0);
        assert_eq!(rows[1].members, vec![2, 3]);

        let mut seen: Vec<usize> = cols.iter().flat_map(|b| b.members.clone()).collect();
        seen.sort_unstable();
        assert_eq!(seen, vec![0, 1, 2, 3]);
    }

    #[test]
    fn bands_are_sorted_by_position() {
        let leaves = rect_leaves(&[
            Rect::new(300.0, 0.0, 10.0, 10.0),
            Rect::new(0.0, 0.0, 10.0, 10.0),
            Rect::new(150.0, 0.0, 10.0, 10.0),
        ]);
        let cols = compute_grid_dimension(&leaves, Axis::X);
        let positions: Vec<f32> = cols.iter().map(|b| b.pos).collect();
        assert_eq!(positions, vec![5.0, 155.0, 305.0]);
    }

    #[test]
    fn outer_lines_clear_every_node() {
        let forest = Forest::new(vec![
            (Some(Rect::new(0.0, 0.0, 100.0, 50.0)), Vec::new()),
            (Some(Rect::new(200.0, 0.0, 100.0, 50.0)), Vec::new()),
        ])
        .unwrap();
        let lines = build_grid_lines(&forest, 12.0);
        assert_eq!(lines.xs, vec![50.0, 250.0, -50.0, 150.0, 350.0]);
        assert_eq!(lines.ys, vec![25.0, -12.0, 62.0]);
        assert_eq!(lines.extent(), Some(Rect::from_corners(-50.0, -12.0, 350.0, 62.0)));
    }

    #[test]
    fn misaligned_leaf_gets_its_own_line() {
        // the column band of 0 and 1 sits at 28.75, outside leaf 0
        let forest = Forest::new(vec![
            (Some(Rect::new(0.0, 0.0, 10.0, 10.0)), Vec::new()),
            (Some(Rect::new(5.0, 40.0, 95.0, 10.0)), Vec::new()),
        ])
        .unwrap();
        let lines = build_grid_lines(&forest, 12.0);
        assert!(lines.xs.iter().any(|&x| x > 0.0 && x < 10.0));
        assert!(lines.xs.contains(&5.0));
    }

    #[test]
    fn empty_forest_has_no_lines() {
        let forest = Forest::new(Vec::new()).unwrap();
        let lines = build_grid_lines(&forest, 12.0);
        assert!(lines.xs.is_empty());
        assert!(lines.extent().is_none());
    }
}
