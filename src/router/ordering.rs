use std::collections::HashSet;

use crate::geometry::Point;

/// Longest run of equal consecutive points shared by two paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommonRun {
    pub length: usize,
    /// Start of the run in the first path.
    pub si: usize,
    /// Start of the run in the second path, in its original orientation.
    pub ti: usize,
    /// The run only matches when the second path is read backwards.
    pub reversed: bool,
}

fn find_match(s: &[Point], t: &[Point]) -> (usize, usize, usize) {
    let mut best = (0, 0, 0);
    let mut prev = vec![0usize; t.len()];
    let mut row = vec![0usize; t.len()];
    for (i, a) in s.iter().enumerate() {
        for (j, b) in t.iter().enumerate() {
            row[j] = if a.approx_eq(b) {
                if j == 0 { 1 } else { prev[j - 1] + 1 }
            } else {
                0
            };
            if row[j] > best.0 {
                best = (row[j], i + 1 - row[j], j + 1 - row[j]);
            }
        }
        std::mem::swap(&mut prev, &mut row);
    }
    best
}

/// Longest common contiguous run of `s` and `t`, trying `t` forwards and
/// backwards. Forward wins ties. `None` when the paths share no point.
pub fn longest_common_run(s: &[Point], t: &[Point]) -> Option<CommonRun> {
    let (flen, fsi, fti) = find_match(s, t);
    let reversed: Vec<Point> = t.iter().rev().copied().collect();
    let (rlen, rsi, rti) = find_match(s, &reversed);
    if flen == 0 && rlen == 0 {
        return None;
    }
    if flen >= rlen {
        Some(CommonRun {
            length: flen,
            si: fsi,
            ti: fti,
            reversed: false,
        })
    } else {
        Some(CommonRun {
            length: rlen,
            si: rsi,
            ti: t.len() - rti - rlen,
            reversed: true,
        })
    }
}

/// Twice the signed area of `a`, `b`, `c`.
pub fn turn_direction(a: Point, b: Point, c: Point) -> f32 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

/// `c` lies on the left of (or on) the ray `a` -> `b` in page coordinates.
pub fn is_left(a: Point, b: Point, c: Point) -> bool {
    turn_direction(a, b, c) <= 0.0
}

/// Which routed edge renders on the left of which, plus the orientation each
/// path was compared in.
#[derive(Debug, Clone, Default)]
pub struct EdgeOrder {
    left_of: HashSet<(usize, usize)>,
    reversed: Vec<bool>,
}

impl EdgeOrder {
    pub fn left_of(&self, l: usize, r: usize) -> bool {
        self.left_of.contains(&(l, r))
    }

    pub fn is_reversed(&self, edge: usize) -> bool {
        self.reversed.get(edge).copied().unwrap_or(false)
    }

    pub fn pairs(&self) -> usize {
        self.left_of.len()
    }
}

/// Decides a left/right order for every pair of paths sharing a corridor.
///
/// Paths are compared in place: when the best shared run needs one path read
/// backwards, that path is flipped (and stays flipped for later pairs) so every
/// shared corridor is walked the same way. The returned order records which
/// paths ended up flipped.
pub fn order_edges(paths: &mut [Vec<Point>]) -> EdgeOrder {
    let mut order = EdgeOrder {
        left_of: HashSet::new(),
        reversed: vec![false; paths.len()],
    };
    for i in 0..paths.len() {
        for j in (i + 1)..paths.len() {
            let Some(mut run) = longest_common_run(&paths[i], &paths[j]) else {
                continue;
            };
            if run.reversed {
                paths[j].reverse();
                order.reversed[j] = !order.reversed[j];
                run = match longest_common_run(&paths[i], &paths[j]) {
                    Some(run) => run,
                    None => continue,
                };
            }
            let (e, f) = (&paths[i], &paths[j]);
            let e_last = run.si + run.length - 1;
            let f_last = run.ti + run.length - 1;
            let reaches_end = e_last + 1 >= e.len() || f_last + 1 >= f.len();
            if (run.si == 0 || run.ti == 0) && reaches_end {
                // the paths never diverge on either side
                order.left_of.insert((i, j));
                continue;
            }
            let divergence = if reaches_end {
                // diverge before the shared run
                let ahead = e.get(run.si + 1).or_else(|| f.get(run.ti + 1));
                ahead.map(|&u| (u, f[run.ti - 1], e[run.si - 1]))
            } else {
                let behind = if run.length >= 2 {
                    Some(e[e_last - 1])
                } else {
                    // a single shared point: fall back on whichever path has a predecessor
                    run.si
                        .checked_sub(1)
                        .map(|k| e[k])
                        .or_else(|| run.ti.checked_sub(1).map(|k| f[k]))
                };
                behind.map(|u| (u, e[e_last + 1], f[f_last + 1]))
            };
            let Some((u, vi, vj)) = divergence else {
                order.left_of.insert((i, j));
                continue;
            };
            if is_left(u, vi, vj) {
                order.left_of.insert((j, i));
            } else {
                order.left_of.insert((i, j));
            }
        }
    }
    order
}
