//! Graph and element identifiers.
//!
//! An element does not carry one global id. It receives an independent
//! `GraphElementId` in every graph it is inserted into, scoped by
//! `(GraphId, ElementKind)`.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Identity of one graph instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GraphId(pub u64);

static NEXT_GRAPH_ID: AtomicU64 = AtomicU64::new(1);

impl GraphId {
    /// Allocate a process-unique graph id.
    pub fn next() -> Self {
        GraphId(NEXT_GRAPH_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for GraphId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of an element within one graph instance, unique per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GraphElementId(pub u64);

impl GraphElementId {
    /// First id a fresh graph issues for each element kind.
    pub const FIRST: GraphElementId = GraphElementId(1);
}

impl std::fmt::Display for GraphElementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which id space an element lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementKind {
    Vertex,
    Edge,
}

impl std::fmt::Display for ElementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ElementKind::Vertex => f.write_str("vertex"),
            ElementKind::Edge => f.write_str("edge"),
        }
    }
}

/// Traversal direction relative to a vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Outgoing,
    Incoming,
    Both,
}

/// Per-graph id counters.
///
/// Ids are monotonic and never handed out twice, so a removed element's id
/// is not reused for a later element of the same graph.
#[derive(Debug, Clone)]
pub struct IdAllocator {
    next_vertex: u64,
    next_edge: u64,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self {
            next_vertex: GraphElementId::FIRST.0,
            next_edge: GraphElementId::FIRST.0,
        }
    }

    pub fn allocate(&mut self, kind: ElementKind) -> GraphElementId {
        let counter = match kind {
            ElementKind::Vertex => &mut self.next_vertex,
            ElementKind::Edge => &mut self.next_edge,
        };
        let id = GraphElementId(*counter);
        *counter += 1;
        id
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocator_starts_at_first_per_kind() {
        let mut ids = IdAllocator::new();
        assert_eq!(ids.allocate(ElementKind::Vertex), GraphElementId::FIRST);
        assert_eq!(ids.allocate(ElementKind::Edge), GraphElementId::FIRST);
        assert_eq!(ids.allocate(ElementKind::Vertex), GraphElementId(2));
    }

    #[test]
    fn test_graph_ids_are_distinct() {
        let a = GraphId::next();
        let b = GraphId::next();
        assert_ne!(a, b);
    }
}
