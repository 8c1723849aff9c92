//! Vertex in the graph model.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use super::{ElementCore, GraphElement};

/// Shared handle to a vertex. A vertex lives as long as its longest
/// holder: any graph, edge, iterator or caller keeping the `Arc`.
pub type VertexRef = Arc<dyn Vertex>;

/// A graph element with no endpoint references.
///
/// Attribute payloads live on the concrete type; the core only sees them
/// through the registry's attribute callbacks.
pub trait Vertex: GraphElement {
    /// Raw structural copy of the concrete vertex.
    fn duplicate(&self) -> Box<dyn Vertex>;

    /// Copy that belongs to no graph.
    fn clone_vertex(&self) -> Box<dyn Vertex> {
        let vertex = self.duplicate();
        vertex.core().disassociate_from_all();
        vertex
    }
}

impl fmt::Display for dyn Vertex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

/// Reference identity of two vertex handles.
pub fn same_vertex(a: &VertexRef, b: &VertexRef) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

/// Default vertex kind: a label and nothing else.
#[derive(Debug, Clone)]
pub struct BasicVertex {
    core: ElementCore,
}

impl BasicVertex {
    pub const CLASS_NAME: &'static str = "graph_analysis::Vertex";

    pub fn new(label: impl Into<String>) -> Self {
        Self { core: ElementCore::new(label, Self::CLASS_NAME) }
    }

    /// Convenience for callers that only need a shared handle.
    pub fn shared(label: impl Into<String>) -> VertexRef {
        Arc::new(Self::new(label))
    }
}

impl Default for BasicVertex {
    fn default() -> Self {
        Self::new("")
    }
}

impl GraphElement for BasicVertex {
    fn core(&self) -> &ElementCore { &self.core }
    fn core_mut(&mut self) -> &mut ElementCore { &mut self.core }
    fn class_name(&self) -> &'static str { Self::CLASS_NAME }
    fn as_any(&self) -> &dyn Any { self }
}

impl Vertex for BasicVertex {
    fn duplicate(&self) -> Box<dyn Vertex> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GraphElementId, GraphId};

    #[test]
    fn test_describe_falls_back_to_class_name() {
        let v = BasicVertex::shared("");
        assert_eq!(v.to_string(), BasicVertex::CLASS_NAME);
        v.set_label("hub");
        assert_eq!(v.to_string(), "hub");
    }

    #[test]
    fn test_clone_vertex_is_unassociated() {
        let v = BasicVertex::new("a");
        v.core().associate(GraphId(3), GraphElementId(1));

        let copy = v.clone_vertex();
        assert_eq!(copy.label(), "a");
        assert_eq!(copy.class_type(), BasicVertex::CLASS_NAME);
        assert!(copy.core().graphs().is_empty());
    }

    #[test]
    fn test_same_vertex_is_by_reference() {
        let a = BasicVertex::shared("x");
        let b = BasicVertex::shared("x");
        assert!(same_vertex(&a, &a.clone()));
        assert!(!same_vertex(&a, &b));
    }
}
