use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::error::RouteError;
use crate::geometry::Rect;
use crate::router::NodeAccessor;

/// A node of a scene file. Nodes with children are groups; their geometry is
/// recomputed from the children and may be left out.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneNode {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub x: Option<f32>,
    #[serde(default)]
    pub y: Option<f32>,
    #[serde(default)]
    pub width: Option<f32>,
    #[serde(default)]
    pub height: Option<f32>,
    #[serde(default)]
    pub children: Vec<usize>,
}

impl SceneNode {
    pub fn bounds(&self) -> Option<Rect> {
        Some(Rect::new(self.x?, self.y?, self.width?, self.height?))
    }

    pub fn is_group(&self) -> bool {
        !self.children.is_empty()
    }
}

/// Edge endpoint: a position in the node list or a node id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeRef {
    Index(usize),
    Id(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneEdge {
    pub from: NodeRef,
    pub to: NodeRef,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    #[serde(default)]
    pub nodes: Vec<SceneNode>,
    #[serde(default)]
    pub edges: Vec<SceneEdge>,
}

impl Scene {
    pub fn node_index(&self, node: &NodeRef) -> Result<usize, RouteError> {
        match node {
            NodeRef::Index(index) if *index < self.nodes.len() => Ok(*index),
            NodeRef::Index(index) => Err(RouteError::IndexOutOfRange {
                index: *index,
                len: self.nodes.len(),
            }),
            NodeRef::Id(id) => self
                .nodes
                .iter()
                .position(|n| n.id.as_deref() == Some(id.as_str()))
                .ok_or_else(|| RouteError::UnknownNode(id.clone())),
        }
    }

    /// `(source, target)` index pairs for every edge, in file order.
    pub fn resolve_edges(&self) -> Result<Vec<(usize, usize)>, RouteError> {
        self.edges
            .iter()
            .map(|e| Ok((self.node_index(&e.from)?, self.node_index(&e.to)?)))
            .collect()
    }

    /// Text shown for a node: its label, else its id.
    pub fn display_name(&self, idx: usize) -> Option<&str> {
        let node = self.nodes.get(idx)?;
        node.label.as_deref().or(node.id.as_deref())
    }
}

impl NodeAccessor<SceneNode> for Scene {
    fn bounds(&self, node: &SceneNode) -> Option<Rect> {
        node.bounds()
    }

    fn children(&self, node: &SceneNode) -> Vec<usize> {
        node.children.clone()
    }
}

pub fn parse_scene(input: &str) -> anyhow::Result<Scene> {
    serde_json::from_str(input).context("failed to parse scene JSON")
}
