use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use tracing::trace;

/// Integer cost multiplier so the heap can order on exact integers.
const COST_SCALE: f32 = 1000.0;

const NO_PREV: usize = usize::MAX;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchFailure {
    Unreachable,
    Exhausted(usize),
}

/// Undirected weighted adjacency list, rebuilt per request.
#[derive(Debug, Clone)]
pub struct Adjacency {
    neighbours: Vec<Vec<(usize, f32)>>,
}

impl Adjacency {
    pub fn new(vertex_count: usize) -> Self {
        Self {
            neighbours: vec![Vec::new(); vertex_count],
        }
    }

    pub fn add_edge(&mut self, a: usize, b: usize, length: f32) {
        self.neighbours[a].push((b, length));
        self.neighbours[b].push((a, length));
    }

    pub fn neighbours(&self, v: usize) -> &[(usize, f32)] {
        &self.neighbours[v]
    }

    pub fn len(&self) -> usize {
        self.neighbours.len()
    }

    pub fn is_empty(&self) -> bool {
        self.neighbours.is_empty()
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
struct SearchEntry {
    est: u64,
    cost: u64,
    vertex: usize,
    state: usize,
}

impl Ord for SearchEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .est
            .cmp(&self.est)
            .then_with(|| other.cost.cmp(&self.cost))
            .then_with(|| other.vertex.cmp(&self.vertex))
            .then_with(|| other.state.cmp(&self.state))
    }
}

impl PartialOrd for SearchEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn scaled(value: f32) -> u64 {
    (value.max(0.0) * COST_SCALE).round() as u64
}

/// Shortest path from `start` to `goal` where each step `v -> w` costs the edge
/// length plus `turn_cost(u, v, w)` for the vertex `u` the search arrived from.
/// Search states are `(vertex, previous vertex)` pairs so the turn cost is exact.
/// `heuristic` must never overestimate the remaining cost.
///
/// Returns the vertex sequence including both ends.
pub fn shortest_path<T, H>(
    graph: &Adjacency,
    start: usize,
    goal: usize,
    max_steps: usize,
    turn_cost: T,
    heuristic: H,
) -> Result<Vec<usize>, SearchFailure>
where
    T: Fn(usize, usize, usize) -> f32,
    H: Fn(usize) -> f32,
{
    if start == goal {
        return Ok(vec![start]);
    }

    // state index -> (vertex, parent state)
    let mut states: Vec<(usize, usize)> = vec![(start, NO_PREV)];
    let mut best: Vec<u64> = vec![0];
    let mut lookup: HashMap<(usize, usize), usize> = HashMap::new();
    lookup.insert((start, NO_PREV), 0);

    let mut heap = BinaryHeap::new();
    heap.push(SearchEntry {
        est: scaled(heuristic(start)),
        cost: 0,
        vertex: start,
        state: 0,
    });

    let mut steps = 0usize;
    let mut found = None;
    while let Some(SearchEntry {
        cost, vertex, state, ..
    }) = heap.pop()
    {
        steps += 1;
        if steps > max_steps {
            trace!(steps, "search step cap reached");
            return Err(SearchFailure::Exhausted(steps - 1));
        }
        if cost != best[state] {
            continue;
        }
        if vertex == goal {
            found = Some(state);
            break;
        }
        let prev_state = states[state].1;
        let prev_vertex = (prev_state != NO_PREV).then(|| states[prev_state].0);
        for &(next, length) in graph.neighbours(vertex) {
            if Some(next) == prev_vertex {
                continue;
            }
            let mut step = length;
            if let Some(u) = prev_vertex {
                step += turn_cost(u, vertex, next);
            }
            let next_cost = cost.saturating_add(scaled(step));
            let key = (next, vertex);
            let next_state = match lookup.get(&key) {
                Some(&idx) => {
                    if next_cost >= best[idx] {
                        continue;
                    }
                    best[idx] = next_cost;
                    states[idx].1 = state;
                    idx
                }
                None => {
                    let idx = states.len();
                    states.push((next, state));
                    best.push(next_cost);
                    lookup.insert(key, idx);
                    idx
                }
            };
            heap.push(SearchEntry {
                est: next_cost.saturating_add(scaled(heuristic(next))),
                cost: next_cost,
                vertex: next,
                state: next_state,
            });
        }
    }

    let mut cur = found.ok_or(SearchFailure::Unreachable)?;
    trace!(steps, states = states.len(), "search finished");
    let mut path = Vec::new();
    loop {
        let (vertex, parent) = states[cur];
        path.push(vertex);
        if parent == NO_PREV {
            break;
        }
        cur = parent;
    }
    path.reverse();
    Ok(path)
}
