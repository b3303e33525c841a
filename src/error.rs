use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RouteError {
    /// Parent/child links do not form a forest (cycle, self-parenting, or shared child).
    #[error("invalid node hierarchy: {0}")]
    InvalidHierarchy(String),
    #[error("node index {index} out of range ({len} nodes)")]
    IndexOutOfRange { index: usize, len: usize },
    /// No passable path between the two nodes. The router stays usable for
    /// other requests.
    #[error("no passable path from node {from} to node {to}")]
    DisconnectedGraph { from: usize, to: usize },
    #[error("path search from node {from} to node {to} gave up after {steps} steps")]
    SearchExhausted { from: usize, to: usize, steps: usize },
    #[error("leaf node {0} has no bounds")]
    MissingBounds(usize),
    #[error("nudge gap must be non-negative, got {0}")]
    NegativeGap(f32),
    #[error("unknown node id `{0}`")]
    UnknownNode(String),
}

pub type Result<T> = std::result::Result<T, RouteError>;
