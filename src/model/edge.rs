//! Edge in the graph model.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use smallvec::SmallVec;

use super::{ElementCore, GraphElement, VertexRef, same_vertex};

/// Shared handle to an edge.
pub type EdgeRef = Arc<dyn Edge>;

/// Endpoints of an edge. Edges do not own their vertices: the same vertex
/// may be referenced by many edges in many graphs at once.
#[derive(Default)]
pub struct EdgeEnds {
    source: RwLock<Option<VertexRef>>,
    target: RwLock<Option<VertexRef>>,
}

impl EdgeEnds {
    pub fn new(source: Option<VertexRef>, target: Option<VertexRef>) -> Self {
        Self {
            source: RwLock::new(source),
            target: RwLock::new(target),
        }
    }

    pub fn source(&self) -> Option<VertexRef> {
        self.source.read().clone()
    }

    pub fn target(&self) -> Option<VertexRef> {
        self.target.read().clone()
    }

    pub fn set_source(&self, vertex: Option<VertexRef>) {
        *self.source.write() = vertex;
    }

    pub fn set_target(&self, vertex: Option<VertexRef>) {
        *self.target.write() = vertex;
    }

    pub fn clear(&self) {
        self.set_source(None);
        self.set_target(None);
    }
}

impl Clone for EdgeEnds {
    fn clone(&self) -> Self {
        Self::new(self.source(), self.target())
    }
}

impl fmt::Debug for EdgeEnds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = |v: Option<VertexRef>| v.map(|v| v.describe());
        f.debug_struct("EdgeEnds")
            .field("source", &name(self.source()))
            .field("target", &name(self.target()))
            .finish()
    }
}

/// A graph element linking a source vertex to a target vertex.
pub trait Edge: GraphElement {
    fn ends(&self) -> &EdgeEnds;

    /// Raw structural copy of the concrete edge, endpoints included.
    fn duplicate(&self) -> Box<dyn Edge>;

    fn source(&self) -> Option<VertexRef> {
        self.ends().source()
    }

    fn target(&self) -> Option<VertexRef> {
        self.ends().target()
    }

    fn set_source(&self, vertex: Option<VertexRef>) {
        self.ends().set_source(vertex);
    }

    fn set_target(&self, vertex: Option<VertexRef>) {
        self.ends().set_target(vertex);
    }

    /// Drop endpoints and every graph membership.
    fn disassociate_from_all(&self) {
        self.ends().clear();
        self.core().disassociate_from_all();
    }

    /// Copy with the same class type and label but no endpoints and no
    /// graph membership. It must be reattached explicitly.
    fn clone_edge(&self) -> Box<dyn Edge> {
        let edge = self.duplicate();
        edge.disassociate_from_all();
        edge
    }
}

impl fmt::Display for dyn Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

/// Reference identity of two edge handles.
pub fn same_edge(a: &EdgeRef, b: &EdgeRef) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

/// Endpoints of `e0` and `e1` with `e0`'s endpoints deduplicated against
/// `e1`'s. Both of `e1`'s endpoints are always emitted, so self-loops and
/// parallel edges keep their duplicates on the `e1` side.
///
/// Unset endpoints count as distinct from everything.
pub fn involved_vertices(e0: &dyn Edge, e1: &dyn Edge) -> SmallVec<[Option<VertexRef>; 4]> {
    let (s1, t1) = (e1.source(), e1.target());
    let shared = |v: &Option<VertexRef>| match v {
        Some(v) => [&s1, &t1]
            .into_iter()
            .any(|other| other.as_ref().is_some_and(|o| same_vertex(v, o))),
        None => false,
    };

    let mut vertices = SmallVec::new();
    for end in [e0.source(), e0.target()] {
        if !shared(&end) {
            vertices.push(end);
        }
    }
    vertices.push(s1);
    vertices.push(t1);
    vertices
}

/// True iff the two edges share at least one endpoint vertex.
pub fn are_meeting(e0: &dyn Edge, e1: &dyn Edge) -> bool {
    involved_vertices(e0, e1).len() < 4
}

/// Default edge kind.
#[derive(Debug, Clone)]
pub struct BasicEdge {
    core: ElementCore,
    ends: EdgeEnds,
}

impl BasicEdge {
    pub const CLASS_NAME: &'static str = "graph_analysis::Edge";

    pub fn new(label: impl Into<String>) -> Self {
        Self {
            core: ElementCore::new(label, Self::CLASS_NAME),
            ends: EdgeEnds::default(),
        }
    }

    pub fn between(source: VertexRef, target: VertexRef, label: impl Into<String>) -> Self {
        Self {
            core: ElementCore::new(label, Self::CLASS_NAME),
            ends: EdgeEnds::new(Some(source), Some(target)),
        }
    }

    pub fn shared(source: VertexRef, target: VertexRef, label: impl Into<String>) -> EdgeRef {
        Arc::new(Self::between(source, target, label))
    }
}

impl Default for BasicEdge {
    fn default() -> Self {
        Self::new("")
    }
}

impl GraphElement for BasicEdge {
    fn core(&self) -> &ElementCore { &self.core }
    fn core_mut(&mut self) -> &mut ElementCore { &mut self.core }
    fn class_name(&self) -> &'static str { Self::CLASS_NAME }
    fn as_any(&self) -> &dyn Any { self }
}

impl Edge for BasicEdge {
    fn ends(&self) -> &EdgeEnds {
        &self.ends
    }

    fn duplicate(&self) -> Box<dyn Edge> {
        Box::new(self.clone())
    }
}
