use std::collections::HashSet;

use crate::error::{Result, RouteError};
use crate::geometry::Rect;

/// Where a node hangs in the forest. Unparented nodes belong to the implicit root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Parent {
    Root,
    Node(usize),
}

#[derive(Debug, Clone)]
pub struct NodeWrapper {
    pub id: usize,
    pub rect: Rect,
    pub children: Vec<usize>,
    pub parent: Parent,
    pub leaf: bool,
    /// Boundary vertices, in creation order. `ports[0]` is the search anchor.
    pub ports: Vec<usize>,
    /// The single interior vertex of a leaf, at its rectangle centre.
    pub interior: Option<usize>,
}

/// Arena of nodes with index-based parent/child links.
#[derive(Debug, Clone)]
pub struct Forest {
    nodes: Vec<NodeWrapper>,
    roots: Vec<usize>,
    depths: Vec<usize>,
}

impl Forest {
    /// Builds the forest from `(bounds, children)` pairs, one per external node.
    pub fn new(entries: Vec<(Option<Rect>, Vec<usize>)>) -> Result<Self> {
        let len = entries.len();
        let mut nodes = Vec::with_capacity(len);
        for (id, (bounds, mut children)) in entries.into_iter().enumerate() {
            for &child in &children {
                if child >= len {
                    return Err(RouteError::IndexOutOfRange { index: child, len });
                }
                if child == id {
                    return Err(RouteError::InvalidHierarchy(format!(
                        "node {id} lists itself as a child"
                    )));
                }
            }
            let mut seen = HashSet::new();
            children.retain(|c| seen.insert(*c));
            let leaf = children.is_empty();
            let rect = match bounds {
                Some(rect) => rect,
                None if leaf => return Err(RouteError::MissingBounds(id)),
                None => Rect::empty(),
            };
            nodes.push(NodeWrapper {
                id,
                rect,
                children,
                parent: Parent::Root,
                leaf,
                ports: Vec::new(),
                interior: None,
            });
        }

        let mut assigned: Vec<Option<usize>> = vec![None; len];
        for group in 0..len {
            for idx in 0..nodes[group].children.len() {
                let child = nodes[group].children[idx];
                if let Some(previous) = assigned[child] {
                    return Err(RouteError::InvalidHierarchy(format!(
                        "node {child} is a child of both {previous} and {group}"
                    )));
                }
                assigned[child] = Some(group);
                nodes[child].parent = Parent::Node(group);
            }
        }

        let depths = compute_depths(&nodes)?;
        let roots = nodes
            .iter()
            .filter(|n| n.parent == Parent::Root)
            .map(|n| n.id)
            .collect();
        Ok(Self {
            nodes,
            roots,
            depths,
        })
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[NodeWrapper] {
        &self.nodes
    }

    pub fn node(&self, idx: usize) -> &NodeWrapper {
        &self.nodes[idx]
    }

    pub(crate) fn node_mut(&mut self, idx: usize) -> &mut NodeWrapper {
        &mut self.nodes[idx]
    }

    pub fn roots(&self) -> &[usize] {
        &self.roots
    }

    pub fn depth(&self, idx: usize) -> usize {
        self.depths[idx]
    }

    pub fn children_of(&self, parent: Parent) -> &[usize] {
        match parent {
            Parent::Root => &self.roots,
            Parent::Node(idx) => &self.nodes[idx].children,
        }
    }

    pub fn leaves(&self) -> impl Iterator<Item = &NodeWrapper> {
        self.nodes.iter().filter(|n| n.leaf)
    }

    /// Node ids ordered shallowest first; ties keep index order.
    pub fn back_to_front(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.nodes.len()).collect();
        order.sort_by_key(|&idx| self.depths[idx]);
        order
    }

    /// Recomputes group rectangles deepest first, so every group sees resolved
    /// child boxes: `rect = union(children).inflate(padding)`.
    pub fn resolve_group_rects(&mut self, padding: f32) {
        let mut groups: Vec<usize> = self.back_to_front();
        groups.reverse();
        for group in groups {
            if self.nodes[group].leaf {
                continue;
            }
            let mut rect = Rect::empty();
            for &child in &self.nodes[group].children {
                rect = rect.union(&self.nodes[child].rect);
            }
            self.nodes[group].rect = rect.inflate(padding);
        }
    }

    /// Ancestors of `idx` from the outermost down to `idx` itself.
    pub fn lineage(&self, idx: usize) -> Vec<usize> {
        let mut lineage = vec![idx];
        let mut current = self.nodes[idx].parent;
        while let Parent::Node(parent) = current {
            lineage.push(parent);
            current = self.nodes[parent].parent;
        }
        lineage.reverse();
        lineage
    }

    pub fn common_ancestor(&self, a: usize, b: usize) -> Parent {
        self.ancestor_split(a, b).0
    }

    /// Sibling subtrees that a route from `a` to `b` must not enter: every other
    /// child of the lowest common ancestor, and every other sibling of each node
    /// on the two lineages below it. Sorted, no duplicates.
    pub fn sibling_obstacles(&self, a: usize, b: usize) -> Vec<usize> {
        let (ancestor, below) = self.ancestor_split(a, b);
        let on_path: HashSet<usize> = below.iter().copied().collect();

        let mut obstacles: Vec<usize> = self
            .children_of(ancestor)
            .iter()
            .copied()
            .filter(|c| !on_path.contains(c))
            .collect();
        for &v in &below {
            let parent = self.nodes[v].parent;
            if parent == ancestor {
                continue;
            }
            obstacles.extend(self.children_of(parent).iter().copied().filter(|&c| c != v));
        }
        obstacles.sort_unstable();
        obstacles.dedup();
        obstacles
    }

    /// Lowest common ancestor plus the lineage members of `a` and `b` strictly below it.
    fn ancestor_split(&self, a: usize, b: usize) -> (Parent, Vec<usize>) {
        let la = self.lineage(a);
        let lb = self.lineage(b);
        let mut k = 0;
        while k < la.len() && k < lb.len() && la[k] == lb[k] {
            k += 1;
        }
        if k == la.len() && k == lb.len() {
            // a == b: the node itself is the diverging element
            k -= 1;
        }
        let ancestor = if k == 0 {
            Parent::Root
        } else {
            Parent::Node(la[k - 1])
        };
        let below = la[k.min(la.len())..]
            .iter()
            .chain(lb[k.min(lb.len())..].iter())
            .copied()
            .collect();
        (ancestor, below)
    }
}

fn compute_depths(nodes: &[NodeWrapper]) -> Result<Vec<usize>> {
    let len = nodes.len();
    let mut depths: Vec<Option<usize>> = vec![None; len];
    for start in 0..len {
        if depths[start].is_some() {
            continue;
        }
        let mut chain = vec![start];
        let mut visited = HashSet::from([start]);
        let mut current = nodes[start].parent;
        let base = loop {
            match current {
                Parent::Root => break 0,
                Parent::Node(parent) => {
                    if let Some(depth) = depths[parent] {
                        break depth + 1;
                    }
                    if !visited.insert(parent) || chain.len() > len {
                        return Err(RouteError::InvalidHierarchy(format!(
                            "cycle through node {parent}"
                        )));
                    }
                    chain.push(parent);
                    current = nodes[parent].parent;
                }
            }
        };
        for (offset, &idx) in chain.iter().rev().enumerate() {
            depths[idx] = Some(base + offset);
        }
    }
    Ok(depths.into_iter().map(|d| d.unwrap_or(0)).collect())
}
