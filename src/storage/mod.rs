//! # Backend Adapter Contract
//!
//! `BaseGraph` is THE contract between graph consumers (algorithms,
//! serializers, editors) and any concrete graph engine. Consumers never
//! touch native handles; they go through element ids and shared element
//! references only.
//!
//! ## Implementations
//!
//! | Backend | Module | Description |
//! |---------|--------|-------------|
//! | `StableGraph` | `stable` | Generational arena, handles survive removals |
//! | `IndexedGraph` | `indexed` | Vector-indexed, renumbers on removal, repairs its maps |
//!
//! ## Descriptor maps
//!
//! Every adapter owns `GraphElementId → native handle` maps for vertices
//! and edges. They must agree with the live native elements at every
//! point a caller can observe: an adapter whose backend renumbers handles
//! on removal repairs its maps before returning from the mutation. A
//! mismatch detected on lookup is reported as
//! `Error::InconsistentDescriptor`, never guessed around.
//!
//! Mutations validate first and touch the maps last, so a failed call
//! leaves the graph unchanged.
//!
//! Structural mutation takes `&mut self`; callers sharing a graph across
//! threads serialize writers themselves.

pub mod arena;
pub mod stable;
pub mod indexed;

use std::fmt;
use std::str::FromStr;

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::iter::{EdgeIterator, VertexIterator};
use crate::model::*;
use crate::subgraph::{self, SubGraph};
use crate::{Error, Result};

pub use indexed::IndexedGraph;
pub use stable::StableGraph;

/// Lazy sequence of elements borrowed from a graph.
pub type ElementIter<'g, T> = Box<dyn Iterator<Item = T> + 'g>;

// ============================================================================
// Backend Configuration
// ============================================================================

/// Concrete adapter behind a `BaseGraph`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Generational arena
    #[default]
    Stable,
    /// Vector-indexed with descriptor repair
    Indexed,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Stable => "stable",
            BackendKind::Indexed => "indexed",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stable" => Ok(BackendKind::Stable),
            "indexed" => Ok(BackendKind::Indexed),
            other => Err(Error::UnknownBackend(other.to_string())),
        }
    }
}

/// How to construct a graph.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub kind: BackendKind,
    /// Pre-allocated vertex slots.
    pub vertex_capacity: usize,
    /// Pre-allocated edge slots.
    pub edge_capacity: usize,
}

impl BackendConfig {
    pub fn new(kind: BackendKind) -> Self {
        Self { kind, ..Self::default() }
    }

    /// Parse from JSON, e.g. `{"kind": "indexed", "vertex_capacity": 64}`.
    /// Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn open(&self) -> Box<dyn BaseGraph> {
        open(self)
    }
}

/// Construct an empty graph of the configured backend kind.
pub fn open(config: &BackendConfig) -> Box<dyn BaseGraph> {
    match config.kind {
        BackendKind::Stable => Box::new(StableGraph::with_capacity(
            config.vertex_capacity,
            config.edge_capacity,
        )),
        BackendKind::Indexed => Box::new(IndexedGraph::with_capacity(
            config.vertex_capacity,
            config.edge_capacity,
        )),
    }
}

// ============================================================================
// BaseGraph Trait
// ============================================================================

/// The universal graph contract.
///
/// Required methods are what a backend adapter implements; everything
/// else is provided on top of them and works for any adapter.
pub trait BaseGraph: Send + Sync {
    // ========================================================================
    // Identity
    // ========================================================================

    /// Scope of every id this graph hands out.
    fn id(&self) -> GraphId;

    /// The adapter implementing this graph.
    fn kind(&self) -> BackendKind;

    /// `self` as a trait object. Adapters implement this as `{ self }`.
    fn as_base_graph(&self) -> &dyn BaseGraph;

    // ========================================================================
    // Structure
    // ========================================================================

    /// Insert a vertex and return its freshly allocated id.
    ///
    /// Fails with `InvalidElement` if the vertex already belongs to this
    /// graph. Membership in other graphs is irrelevant.
    fn add_vertex(&mut self, vertex: VertexRef) -> Result<GraphElementId>;

    /// Insert an edge between two live vertices of this graph.
    ///
    /// The edge's own endpoints must be set and must be the vertices
    /// behind `source` and `target`.
    fn add_edge_between(
        &mut self,
        edge: EdgeRef,
        source: GraphElementId,
        target: GraphElementId,
    ) -> Result<GraphElementId>;

    /// Remove a vertex together with its incident edges.
    fn remove_vertex(&mut self, vertex: &VertexRef) -> Result<()>;

    fn remove_edge(&mut self, edge: &EdgeRef) -> Result<()>;

    // ========================================================================
    // Lookup
    // ========================================================================

    /// Fails with `NotFound` if `id` is not live in this graph.
    fn vertex(&self, id: GraphElementId) -> Result<VertexRef>;

    /// Fails with `NotFound` if `id` is not live in this graph.
    fn edge(&self, id: GraphElementId) -> Result<EdgeRef>;

    /// `(source, target)` vertex ids of a live edge, as stored natively.
    fn edge_endpoints(&self, id: GraphElementId) -> Result<(GraphElementId, GraphElementId)>;

    fn vertices(&self) -> ElementIter<'_, VertexRef>;

    fn edges(&self) -> ElementIter<'_, EdgeRef>;

    /// Edges touching `vertex` in the given direction, insertion order.
    /// A self-loop is yielded once for `Direction::Both`.
    fn incident_edges(
        &self,
        vertex: GraphElementId,
        direction: Direction,
    ) -> Result<ElementIter<'_, EdgeRef>>;

    fn vertex_count(&self) -> usize;

    fn edge_count(&self) -> usize;

    // ========================================================================
    // Construction
    // ========================================================================

    /// Empty graph of the same backend kind, with its own `GraphId`.
    fn new_instance(&self) -> Box<dyn BaseGraph>;

    /// Verify the descriptor maps against the native store.
    fn check_consistency(&self) -> Result<()>;

    // ========================================================================
    // Provided: membership
    // ========================================================================

    fn is_empty(&self) -> bool {
        self.vertex_count() == 0
    }

    /// Id of `vertex` in this graph.
    ///
    /// `InvalidElement` if it is not a member; `InconsistentDescriptor`
    /// if the element claims membership the graph does not back.
    fn vertex_id(&self, vertex: &VertexRef) -> Result<GraphElementId> {
        let id = vertex.id_in(self.id()).ok_or_else(|| {
            Error::InvalidElement(format!(
                "vertex '{}' is not part of graph {}",
                vertex.describe(),
                self.id()
            ))
        })?;
        let stored = self.vertex(id).map_err(|_| {
            Error::InconsistentDescriptor(format!(
                "vertex '{}' claims id {id} in graph {}, which has no such vertex",
                vertex.describe(),
                self.id()
            ))
        })?;
        if !same_vertex(&stored, vertex) {
            return Err(Error::InconsistentDescriptor(format!(
                "vertex id {id} in graph {} resolves to a different vertex",
                self.id()
            )));
        }
        Ok(id)
    }

    /// Id of `edge` in this graph. Same failure modes as `vertex_id`.
    fn edge_id(&self, edge: &EdgeRef) -> Result<GraphElementId> {
        let id = edge.id_in(self.id()).ok_or_else(|| {
            Error::InvalidElement(format!(
                "edge '{}' is not part of graph {}",
                edge.describe(),
                self.id()
            ))
        })?;
        let stored = self.edge(id).map_err(|_| {
            Error::InconsistentDescriptor(format!(
                "edge '{}' claims id {id} in graph {}, which has no such edge",
                edge.describe(),
                self.id()
            ))
        })?;
        if !same_edge(&stored, edge) {
            return Err(Error::InconsistentDescriptor(format!(
                "edge id {id} in graph {} resolves to a different edge",
                self.id()
            )));
        }
        Ok(id)
    }

    fn contains_vertex(&self, vertex: &VertexRef) -> bool {
        self.vertex_id(vertex).is_ok()
    }

    fn contains_edge(&self, edge: &EdgeRef) -> bool {
        self.edge_id(edge).is_ok()
    }

    // ========================================================================
    // Provided: structure
    // ========================================================================

    /// Insert an edge using its own endpoints, adding either endpoint
    /// vertex first if it is not yet in this graph.
    fn add_edge(&mut self, edge: EdgeRef) -> Result<GraphElementId> {
        let (source, target) = endpoints(edge.as_ref())?;
        if edge.id_in(self.id()).is_some() {
            return Err(Error::InvalidElement(format!(
                "edge '{}' is already part of graph {}",
                edge.describe(),
                self.id()
            )));
        }

        let source_id = match self.vertex_id(&source) {
            Ok(id) => id,
            Err(Error::InvalidElement(_)) => self.add_vertex(source)?,
            Err(e) => return Err(e),
        };
        let target_id = match self.vertex_id(&target) {
            Ok(id) => id,
            Err(Error::InvalidElement(_)) => self.add_vertex(target)?,
            Err(e) => return Err(e),
        };
        self.add_edge_between(edge, source_id, target_id)
    }

    /// All parallel edges from `source` to `target`, insertion order.
    fn edges_between(&self, source: &VertexRef, target: &VertexRef) -> Result<Vec<EdgeRef>> {
        let source_id = self.vertex_id(source)?;
        let target_id = self.vertex_id(target)?;
        let mut result = Vec::new();
        for edge in self.incident_edges(source_id, Direction::Outgoing)? {
            let (_, t) = self.edge_endpoints(self.edge_id(&edge)?)?;
            if t == target_id {
                result.push(edge);
            }
        }
        Ok(result)
    }

    /// Same element objects, fresh ids and native handles in a new
    /// `GraphId` namespace.
    fn copy(&self) -> Result<Box<dyn BaseGraph>> {
        let mut copy = self.new_instance();
        let mut translated: HashMap<GraphElementId, GraphElementId> =
            HashMap::with_capacity(self.vertex_count());

        for vertex in self.vertices() {
            let old = self.vertex_id(&vertex)?;
            let new = copy.add_vertex(vertex)?;
            translated.insert(old, new);
        }
        for edge in self.edges() {
            let (s, t) = self.edge_endpoints(self.edge_id(&edge)?)?;
            let missing = |id: GraphElementId| {
                Error::InconsistentDescriptor(format!(
                    "edge endpoint {id} of graph {} was not iterated as a vertex",
                    self.id()
                ))
            };
            let source = *translated.get(&s).ok_or_else(|| missing(s))?;
            let target = *translated.get(&t).ok_or_else(|| missing(t))?;
            copy.add_edge_between(edge, source, target)?;
        }
        Ok(copy)
    }

    // ========================================================================
    // Provided: traversal
    // ========================================================================

    fn vertex_iterator(&self) -> VertexIterator<'_> {
        VertexIterator::over(self.as_base_graph())
    }

    fn edge_iterator(&self) -> EdgeIterator<'_> {
        EdgeIterator::over(self.as_base_graph())
    }

    fn incident_edge_iterator(&self, vertex: &VertexRef, direction: Direction) -> Result<EdgeIterator<'_>> {
        EdgeIterator::incident(self.as_base_graph(), vertex, direction)
    }

    fn out_edge_iterator(&self, vertex: &VertexRef) -> Result<EdgeIterator<'_>> {
        self.incident_edge_iterator(vertex, Direction::Outgoing)
    }

    fn in_edge_iterator(&self, vertex: &VertexRef) -> Result<EdgeIterator<'_>> {
        self.incident_edge_iterator(vertex, Direction::Incoming)
    }

    // ========================================================================
    // Provided: views
    // ========================================================================

    /// View over this graph with every current element enabled.
    fn create_sub_graph(&self) -> SubGraph<'_> {
        SubGraph::new(self.as_base_graph())
    }

    /// One view per weakly connected component.
    fn identify_connected_components(&self) -> Vec<SubGraph<'_>> {
        subgraph::connected_components(self.as_base_graph())
    }
}

/// Both endpoints of an edge, or `InvalidElement` if either is unset.
pub(crate) fn endpoints(edge: &dyn Edge) -> Result<(VertexRef, VertexRef)> {
    match (edge.source(), edge.target()) {
        (Some(source), Some(target)) => Ok((source, target)),
        _ => Err(Error::InvalidElement(format!(
            "edge '{}' has no source/target vertex",
            edge.describe()
        ))),
    }
}

/// Check that `edge`'s own endpoints are the given vertices.
pub(crate) fn check_edge_endpoints(edge: &dyn Edge, source: &VertexRef, target: &VertexRef) -> Result<()> {
    let (s, t) = endpoints(edge)?;
    if !same_vertex(&s, source) || !same_vertex(&t, target) {
        return Err(Error::InvalidElement(format!(
            "edge '{}' endpoints do not match the given vertex ids",
            edge.describe()
        )));
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
