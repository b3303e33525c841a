//! One-dimensional separation solver.
//!
//! Finds positions `x` as close as possible (least squares) to the desired
//! positions subject to `x[left] + gap <= x[right]` for every constraint:
//!
//! ```text
//! minimise    sum (x_i - d_i)^2        P = 2I, q = -2d
//! subject to  x_l - x_r <= -gap        one row of A per constraint
//! ```
//!
//! The quadratic program goes to OSQP. Its answer is then snapped onto the
//! exact optimum of the active set it identified, and a topological sweep
//! makes the result exactly feasible.

use std::borrow::Cow;
use std::collections::VecDeque;

#[cfg(feature = "osqp-rust")]
use osqp_rust as osqp;
#[cfg(not(any(feature = "osqp", feature = "osqp-rust")))]
compile_error!("enable either the `osqp` or the `osqp-rust` feature");

use osqp::{CscMatrix, Problem, Settings, Status};
use tracing::warn;

/// Stands in for an absent lower bound.
const UNBOUNDED: f64 = 1.0e30;
const TOLERANCE: f64 = 1e-7;
/// Slack below which a constraint counts as tight.
const ACTIVE: f64 = 1e-4;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Separation {
    pub left: usize,
    pub right: usize,
    pub gap: f64,
}

impl Separation {
    pub fn new(left: usize, right: usize, gap: f64) -> Self {
        Self { left, right, gap }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    pub positions: Vec<f64>,
    /// Iterations the QP solver ran; zero when the desired positions were
    /// already feasible.
    pub iterations: usize,
    /// Constraints discarded because they referenced a missing variable or
    /// closed a cycle.
    pub dropped: usize,
}

pub fn solve(desired: &[f64], constraints: &[Separation], max_iterations: usize) -> Solution {
    let n = desired.len();
    let mut kept: Vec<Separation> = Vec::with_capacity(constraints.len());
    let mut outgoing: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut dropped = 0;
    for c in constraints {
        if c.left >= n || c.right >= n || c.left == c.right {
            warn!(left = c.left, right = c.right, n, "dropping malformed separation constraint");
            dropped += 1;
            continue;
        }
        if reaches(&outgoing, &kept, c.right, c.left) {
            warn!(left = c.left, right = c.right, "dropping separation constraint that closes a cycle");
            dropped += 1;
            continue;
        }
        outgoing[c.left].push(kept.len());
        kept.push(*c);
    }

    let mut x = desired.to_vec();
    let mut iterations = 0;
    let violated = kept.iter().any(|c| desired[c.left] + c.gap > desired[c.right]);
    if violated && let Some((qp, iters)) = quadratic_program(desired, &kept, max_iterations) {
        iterations = iters;
        x = snap_to_active_set(desired, &kept, &qp).unwrap_or(qp);
    }

    // exact feasibility
    for v in topological_order(&outgoing, &kept, n) {
        for &k in &outgoing[v] {
            let c = kept[k];
            if x[c.right] < x[c.left] + c.gap {
                x[c.right] = x[c.left] + c.gap;
            }
        }
    }

    Solution {
        positions: x,
        iterations,
        dropped,
    }
}

fn quadratic_program(
    desired: &[f64],
    kept: &[Separation],
    max_iterations: usize,
) -> Option<(Vec<f64>, usize)> {
    let n = desired.len();
    let p = CscMatrix {
        nrows: n,
        ncols: n,
        indptr: Cow::Owned((0..=n).collect()),
        indices: Cow::Owned((0..n).collect()),
        data: Cow::Owned(vec![2.0; n]),
    };
    let q: Vec<f64> = desired.iter().map(|d| -2.0 * d).collect();
    let a = constraint_matrix(n, kept);
    let lower = vec![-UNBOUNDED; kept.len()];
    let upper: Vec<f64> = kept.iter().map(|c| -c.gap).collect();

    let settings = Settings::default()
        .verbose(false)
        .eps_abs(TOLERANCE)
        .eps_rel(TOLERANCE)
        .polish(true)
        .max_iter(u32::try_from(max_iterations).unwrap_or(u32::MAX));
    let mut problem = match Problem::new(p, &q, a, &lower, &upper, &settings) {
        Ok(problem) => problem,
        Err(err) => {
            warn!(%err, "separation problem rejected by the QP solver");
            return None;
        }
    };

    let status = problem.solve();
    if let Status::MaxIterationsReached(_) = status {
        warn!(max_iterations, "separation solver hit its iteration cap");
    }
    let iterations = status.iter() as usize;
    match status.x() {
        Some(x) => Some((x.to_vec(), iterations)),
        None => {
            warn!("separation solver returned no solution");
            None
        }
    }
}

/// `A` in compressed sparse column form: row `k` holds `+1` at `left` and
/// `-1` at `right` of constraint `k`.
fn constraint_matrix(n: usize, kept: &[Separation]) -> CscMatrix<'static> {
    let mut columns: Vec<Vec<(usize, f64)>> = vec![Vec::new(); n];
    for (row, c) in kept.iter().enumerate() {
        columns[c.left].push((row, 1.0));
        columns[c.right].push((row, -1.0));
    }
    let mut indptr = Vec::with_capacity(n + 1);
    let mut indices = Vec::with_capacity(kept.len() * 2);
    let mut data = Vec::with_capacity(kept.len() * 2);
    indptr.push(0);
    for column in columns {
        for (row, value) in column {
            indices.push(row);
            data.push(value);
        }
        indptr.push(indices.len());
    }
    CscMatrix {
        nrows: kept.len(),
        ncols: n,
        indptr: Cow::Owned(indptr),
        indices: Cow::Owned(indices),
        data: Cow::Owned(data),
    }
}

/// Places each block of variables joined by tight constraints at the least
/// squares optimum for that block: members keep their relative offsets and the
/// block sits on the mean of their desired positions. `None` when the blocks
/// are inconsistent or the result breaks a constraint.
fn snap_to_active_set(desired: &[f64], kept: &[Separation], x: &[f64]) -> Option<Vec<f64>> {
    let n = desired.len();
    let mut links: Vec<Vec<(usize, f64)>> = vec![Vec::new(); n];
    for c in kept {
        if x[c.right] - x[c.left] - c.gap <= ACTIVE {
            links[c.left].push((c.right, c.gap));
            links[c.right].push((c.left, -c.gap));
        }
    }

    let mut offset = vec![0.0f64; n];
    let mut seen = vec![false; n];
    let mut snapped = vec![0.0f64; n];
    for root in 0..n {
        if seen[root] {
            continue;
        }
        seen[root] = true;
        let mut block = vec![root];
        let mut stack = vec![root];
        while let Some(v) = stack.pop() {
            for &(w, delta) in &links[v] {
                let want = offset[v] + delta;
                if !seen[w] {
                    seen[w] = true;
                    offset[w] = want;
                    block.push(w);
                    stack.push(w);
                } else if (offset[w] - want).abs() > ACTIVE {
                    return None;
                }
            }
        }
        let shift = block.iter().map(|&v| desired[v] - offset[v]).sum::<f64>() / block.len() as f64;
        for &v in &block {
            snapped[v] = shift + offset[v];
        }
    }

    kept.iter()
        .all(|c| snapped[c.left] + c.gap <= snapped[c.right] + ACTIVE)
        .then_some(snapped)
}

fn reaches(outgoing: &[Vec<usize>], kept: &[Separation], from: usize, to: usize) -> bool {
    let mut seen = vec![false; outgoing.len()];
    let mut stack = vec![from];
    while let Some(v) = stack.pop() {
        if v == to {
            return true;
        }
        if std::mem::replace(&mut seen[v], true) {
            continue;
        }
        stack.extend(outgoing[v].iter().map(|&k| kept[k].right));
    }
    false
}

fn topological_order(outgoing: &[Vec<usize>], kept: &[Separation], n: usize) -> Vec<usize> {
    let mut indegree = vec![0usize; n];
    for c in kept {
        indegree[c.right] += 1;
    }
    let mut queue: VecDeque<usize> = (0..n).filter(|&v| indegree[v] == 0).collect();
    let mut order = Vec::with_capacity(n);
    while let Some(v) = queue.pop_front() {
        order.push(v);
        for &k in &outgoing[v] {
            let r = kept[k].right;
            indegree[r] -= 1;
            if indegree[r] == 0 {
                queue.push_back(r);
            }
        }
    }
    order
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn splits_two_coincident_variables_evenly() {
        let sol = solve(&[150.0, 150.0], &[Separation::new(0, 1, 4.0)], 4000);
        assert_eq!(sol.positions, vec![148.0, 152.0]);
        assert_eq!(sol.dropped, 0);
    }

    #[test]
    fn satisfied_constraints_leave_positions_alone() {
        let sol = solve(&[0.0, 50.0], &[Separation::new(0, 1, 4.0)], 4000);
        assert_eq!(sol.positions, vec![0.0, 50.0]);
        assert_eq!(sol.iterations, 0);
    }

    #[test]
    fn swaps_an_inverted_pair() {
        let sol = solve(&[200.0, 100.0], &[Separation::new(0, 1, 10.0)], 4000);
        assert!(close(sol.positions[0], 145.0));
        assert!(close(sol.positions[1], 155.0));
    }

    #[test]
    fn chain_spreads_around_the_mean() {
        let constraints = [Separation::new(0, 1, 4.0), Separation::new(1, 2, 4.0)];
        let sol = solve(&[0.0, 0.0, 0.0], &constraints, 4000);
        assert!(close(sol.positions[0], -4.0));
        assert!(close(sol.positions[1], 0.0));
        assert!(close(sol.positions[2], 4.0));
    }

    #[test]
    fn result_is_feasible_even_when_capped() {
        let constraints = [
            Separation::new(0, 1, 4.0),
            Separation::new(1, 2, 4.0),
            Separation::new(2, 3, 4.0),
        ];
        let sol = solve(&[10.0, 10.0, 10.0, 10.0], &constraints, 1);
        for c in constraints {
            assert!(sol.positions[c.left] + c.gap <= sol.positions[c.right] + 1e-12);
        }
    }

    #[test]
    fn cycle_closing_constraint_is_dropped() {
        let constraints = [
            Separation::new(0, 1, 4.0),
            Separation::new(1, 2, 4.0),
            Separation::new(2, 0, 4.0),
        ];
        let sol = solve(&[0.0, 0.0, 0.0], &constraints, 4000);
        assert_eq!(sol.dropped, 1);
        assert!(sol.positions[0] + 4.0 <= sol.positions[1] + 1e-9);
        assert!(sol.positions[1] + 4.0 <= sol.positions[2] + 1e-9);
    }

    #[test]
    fn out_of_range_constraints_are_ignored() {
        let sol = solve(&[1.0], &[Separation::new(0, 3, 4.0)], 10);
        assert_eq!(sol.positions, vec![1.0]);
        assert_eq!(sol.dropped, 1);
    }

    #[test]
    fn constraint_matrix_has_one_row_per_constraint() {
        let kept = [Separation::new(0, 2, 4.0), Separation::new(1, 2, 4.0)];
        let a = constraint_matrix(3, &kept);
        assert_eq!((a.nrows, a.ncols), (2, 3));
        assert_eq!(&a.indptr[..], &[0, 1, 2, 4]);
        assert_eq!(&a.indices[..], &[0, 1, 0, 1]);
        assert_eq!(&a.data[..], &[1.0, 1.0, -1.0, -1.0]);
    }

    #[test]
    fn snapping_recovers_the_exact_block_optimum() {
        let kept = [Separation::new(0, 1, 4.0)];
        let rough = [147.99998, 152.00001];
        let snapped = snap_to_active_set(&[150.0, 150.0], &kept, &rough).unwrap();
        assert_eq!(snapped, vec![148.0, 152.0]);
    }

    #[test]
    fn bundle_of_five_is_evenly_spaced() {
        let constraints: Vec<Separation> = (0..4).map(|i| Separation::new(i, i + 1, 4.0)).collect();
        let sol = solve(&[105.0; 5], &constraints, 4000);
        let expected = [97.0, 101.0, 105.0, 109.0, 113.0];
        for (got, want) in sol.positions.iter().zip(expected) {
            assert!(close(*got, want), "{got} vs {want}");
        }
    }
}
