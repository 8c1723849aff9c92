//! # Subgraph Views
//!
//! A `SubGraph` masks elements of a base graph without copying it. Each
//! view owns its own enable/disable mask; the base graph and any other
//! view over it are unaffected by toggling.
//!
//! Iteration over a view is the base graph's iteration with a skipper
//! that hides disabled elements. The base graph stays borrowed for the
//! lifetime of the view, so it cannot change underneath the mask.

use std::fmt;

use hashbrown::HashMap;
use hashbrown::hash_map::Entry;
use tracing::{debug, trace, warn};

use crate::iter::{EdgeIterator, Skipper, VertexIterator};
use crate::model::*;
use crate::storage::BaseGraph;
use crate::Result;

type Mask = HashMap<GraphElementId, bool>;

pub struct SubGraph<'g> {
    base: &'g dyn BaseGraph,
    vertices: Mask,
    edges: Mask,
}

fn is_enabled(mask: &Mask, id: Option<GraphElementId>) -> bool {
    id.and_then(|id| mask.get(&id).copied()).unwrap_or(false)
}

impl<'g> SubGraph<'g> {
    /// View with every element of `base` enabled.
    pub fn new(base: &'g dyn BaseGraph) -> Self {
        let graph = base.id();
        let vertices = base.vertices().filter_map(|v| v.id_in(graph)).map(|id| (id, true)).collect();
        let edges = base.edges().filter_map(|e| e.id_in(graph)).map(|id| (id, true)).collect();
        Self { base, vertices, edges }
    }

    /// View with nothing enabled. Masks grow only as elements are toggled.
    fn empty(base: &'g dyn BaseGraph) -> Self {
        Self { base, vertices: Mask::new(), edges: Mask::new() }
    }

    pub fn base_graph(&self) -> &'g dyn BaseGraph {
        self.base
    }

    // ========================================================================
    // Mask
    // ========================================================================

    // A missing mask entry reads as disabled, so ids outside the current
    // mask get a slot once the base graph has vouched for them.
    fn vertex_slot(&mut self, vertex: &VertexRef) -> Result<&mut bool> {
        let id = self.base.vertex_id(vertex)?;
        Ok(self.vertices.entry(id).or_insert(false))
    }

    fn edge_slot(&mut self, edge: &EdgeRef) -> Result<&mut bool> {
        let id = self.base.edge_id(edge)?;
        Ok(self.edges.entry(id).or_insert(false))
    }

    pub fn enable_vertex(&mut self, vertex: &VertexRef) -> Result<()> {
        *self.vertex_slot(vertex)? = true;
        Ok(())
    }

    pub fn disable_vertex(&mut self, vertex: &VertexRef) -> Result<()> {
        *self.vertex_slot(vertex)? = false;
        Ok(())
    }

    /// Fails with `InvalidElement` if `vertex` is not in the base graph.
    pub fn vertex_enabled(&self, vertex: &VertexRef) -> Result<bool> {
        let id = self.base.vertex_id(vertex)?;
        Ok(is_enabled(&self.vertices, Some(id)))
    }

    pub fn enable_edge(&mut self, edge: &EdgeRef) -> Result<()> {
        *self.edge_slot(edge)? = true;
        Ok(())
    }

    pub fn disable_edge(&mut self, edge: &EdgeRef) -> Result<()> {
        *self.edge_slot(edge)? = false;
        Ok(())
    }

    pub fn edge_enabled(&self, edge: &EdgeRef) -> Result<bool> {
        let id = self.base.edge_id(edge)?;
        Ok(is_enabled(&self.edges, Some(id)))
    }

    pub fn enable_all_vertices(&mut self) {
        let graph = self.base.id();
        self.vertices = self.base.vertices().filter_map(|v| v.id_in(graph)).map(|id| (id, true)).collect();
    }

    pub fn disable_all_vertices(&mut self) {
        self.vertices.clear();
    }

    pub fn enable_all_edges(&mut self) {
        let graph = self.base.id();
        self.edges = self.base.edges().filter_map(|e| e.id_in(graph)).map(|id| (id, true)).collect();
    }

    pub fn disable_all_edges(&mut self) {
        self.edges.clear();
    }

    pub fn enabled_vertex_count(&self) -> usize {
        self.vertices.values().filter(|&&enabled| enabled).count()
    }

    pub fn enabled_edge_count(&self) -> usize {
        self.edges.values().filter(|&&enabled| enabled).count()
    }

    // ========================================================================
    // Traversal
    // ========================================================================

    fn vertex_skipper(&self) -> Skipper<'_, dyn Vertex> {
        let graph = self.base.id();
        let mask = &self.vertices;
        Box::new(move |v: &VertexRef| !is_enabled(mask, v.id_in(graph)))
    }

    fn edge_skipper(&self) -> Skipper<'_, dyn Edge> {
        let graph = self.base.id();
        let mask = &self.edges;
        Box::new(move |e: &EdgeRef| !is_enabled(mask, e.id_in(graph)))
    }

    pub fn vertex_iterator(&self) -> VertexIterator<'_> {
        VertexIterator::over(self.base).with_skipper(self.vertex_skipper())
    }

    pub fn edge_iterator(&self) -> EdgeIterator<'_> {
        EdgeIterator::over(self.base).with_skipper(self.edge_skipper())
    }

    /// Enabled edges touching `vertex`. The vertex itself may be disabled.
    pub fn incident_edge_iterator(&self, vertex: &VertexRef, direction: Direction) -> Result<EdgeIterator<'_>> {
        Ok(EdgeIterator::incident(self.base, vertex, direction)?.with_skipper(self.edge_skipper()))
    }

    pub fn out_edge_iterator(&self, vertex: &VertexRef) -> Result<EdgeIterator<'_>> {
        self.incident_edge_iterator(vertex, Direction::Outgoing)
    }

    pub fn in_edge_iterator(&self, vertex: &VertexRef) -> Result<EdgeIterator<'_>> {
        self.incident_edge_iterator(vertex, Direction::Incoming)
    }

    // ========================================================================
    // Materialization
    // ========================================================================

    /// Fresh graph of the base's backend kind holding the enabled part.
    ///
    /// Elements are shared, not cloned. An enabled edge with a disabled
    /// endpoint is dropped.
    pub fn to_base_graph(&self) -> Result<Box<dyn BaseGraph>> {
        let mut graph = self.base.new_instance();
        let mut translated: HashMap<GraphElementId, GraphElementId> =
            HashMap::with_capacity(self.vertices.len());

        for vertex in self.vertex_iterator() {
            let old = self.base.vertex_id(&vertex)?;
            translated.insert(old, graph.add_vertex(vertex)?);
        }
        for edge in self.edge_iterator() {
            let id = self.base.edge_id(&edge)?;
            let (s, t) = self.base.edge_endpoints(id)?;
            let (Some(&source), Some(&target)) = (translated.get(&s), translated.get(&t)) else {
                trace!(edge = %id, "dropping edge with a disabled endpoint");
                continue;
            };
            graph.add_edge_between(edge, source, target)?;
        }

        debug!(
            base = %self.base.id(),
            graph = %graph.id(),
            vertices = graph.vertex_count(),
            edges = graph.edge_count(),
            "materialized subgraph"
        );
        Ok(graph)
    }
}

impl fmt::Debug for SubGraph<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubGraph")
            .field("base", &self.base.id())
            .field("vertices", &self.enabled_vertex_count())
            .field("edges", &self.enabled_edge_count())
            .finish()
    }
}

// ============================================================================
// Connected components
// ============================================================================

/// One view per weakly connected component of `base`, ordered by the
/// first vertex of each component in `base`'s iteration order.
pub fn connected_components(base: &dyn BaseGraph) -> Vec<SubGraph<'_>> {
    let graph = base.id();
    let mut component_of: HashMap<GraphElementId, usize> = HashMap::with_capacity(base.vertex_count());
    let mut components: Vec<SubGraph<'_>> = Vec::new();

    for vertex in base.vertices() {
        let Some(start) = vertex.id_in(graph) else { continue };
        if component_of.contains_key(&start) {
            continue;
        }

        let index = components.len();
        let mut view = SubGraph::empty(base);
        let mut worklist = vec![start];
        component_of.insert(start, index);

        while let Some(current) = worklist.pop() {
            view.vertices.insert(current, true);
            let incident = match base.incident_edges(current, Direction::Both) {
                Ok(incident) => incident,
                Err(e) => {
                    warn!(graph = %graph, vertex = %current, error = %e, "component search skipped vertex");
                    continue;
                }
            };
            for edge in incident {
                let Some(edge_id) = edge.id_in(graph) else { continue };
                view.edges.insert(edge_id, true);
                let Ok((s, t)) = base.edge_endpoints(edge_id) else { continue };
                let next = if s == current { t } else { s };
                if let Entry::Vacant(slot) = component_of.entry(next) {
                    slot.insert(index);
                    worklist.push(next);
                }
            }
        }
        components.push(view);
    }

    debug!(graph = %graph, components = components.len(), "identified connected components");
    components
}

// ============================================================================
// Tests
// ============================================================================
