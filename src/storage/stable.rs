//! Stable-handle backend.
//!
//! This is the reference implementation of `BaseGraph`.
//! Native elements live in generational arenas, so removing one element
//! never moves another: the descriptor maps only ever lose the removed
//! entry and need no repair pass.
//!
//! ## Ordering
//!
//! - `vertices()` / `edges()` follow arena slot order, which is insertion
//!   order until slots are reused after removals.
//! - `incident_edges()` and `edges_between()` are always insertion order.

use hashbrown::HashMap;
use tracing::{debug, warn};

use crate::model::*;
use crate::{Error, Result};
use super::arena::{Arena, Handle};
use super::{BackendKind, BaseGraph, ElementIter, check_edge_endpoints};

// ============================================================================
// Native records
// ============================================================================

struct VertexRecord {
    id: GraphElementId,
    vertex: VertexRef,
    /// Outgoing edge ids, insertion order.
    out_edges: Vec<GraphElementId>,
    /// Incoming edge ids, insertion order.
    in_edges: Vec<GraphElementId>,
}

struct EdgeRecord {
    id: GraphElementId,
    edge: EdgeRef,
    source: Handle,
    target: Handle,
}

// ============================================================================
// StableGraph
// ============================================================================

/// Directed multigraph over generational arenas.
pub struct StableGraph {
    id: GraphId,
    ids: IdAllocator,
    vertices: Arena<VertexRecord>,
    edges: Arena<EdgeRecord>,
    vertex_map: HashMap<GraphElementId, Handle>,
    edge_map: HashMap<GraphElementId, Handle>,
}

impl StableGraph {
    pub fn new() -> Self {
        Self::with_capacity(0, 0)
    }

    pub fn with_capacity(vertices: usize, edges: usize) -> Self {
        Self {
            id: GraphId::next(),
            ids: IdAllocator::new(),
            vertices: Arena::with_capacity(vertices),
            edges: Arena::with_capacity(edges),
            vertex_map: HashMap::with_capacity(vertices),
            edge_map: HashMap::with_capacity(edges),
        }
    }

    fn vertex_record(&self, id: GraphElementId) -> Result<(Handle, &VertexRecord)> {
        let handle = *self
            .vertex_map
            .get(&id)
            .ok_or_else(|| Error::NotFound(format!("Vertex {id} in graph {}", self.id)))?;
        match self.vertices.get(handle) {
            Some(record) if record.id == id => Ok((handle, record)),
            _ => Err(Error::InconsistentDescriptor(format!(
                "vertex {id} of graph {} maps to a dead or foreign handle {handle:?}",
                self.id
            ))),
        }
    }

    fn edge_record(&self, id: GraphElementId) -> Result<(Handle, &EdgeRecord)> {
        let handle = *self
            .edge_map
            .get(&id)
            .ok_or_else(|| Error::NotFound(format!("Edge {id} in graph {}", self.id)))?;
        match self.edges.get(handle) {
            Some(record) if record.id == id => Ok((handle, record)),
            _ => Err(Error::InconsistentDescriptor(format!(
                "edge {id} of graph {} maps to a dead or foreign handle {handle:?}",
                self.id
            ))),
        }
    }

    fn vertex_id_at(&self, handle: Handle) -> Result<GraphElementId> {
        self.vertices.get(handle).map(|r| r.id).ok_or_else(|| {
            Error::InconsistentDescriptor(format!(
                "edge endpoint handle {handle:?} of graph {} is dead",
                self.id
            ))
        })
    }

    /// Drop a validated edge from the arena, adjacency lists and map.
    fn detach_edge(&mut self, id: GraphElementId, handle: Handle) {
        let Some(record) = self.edges.remove(handle) else {
            return;
        };
        if let Some(source) = self.vertices.get_mut(record.source) {
            source.out_edges.retain(|e| *e != id);
        }
        if let Some(target) = self.vertices.get_mut(record.target) {
            target.in_edges.retain(|e| *e != id);
        }
        self.edge_map.remove(&id);
        record.edge.core().disassociate(self.id);
        debug!(graph = %self.id, edge = %id, "removed edge");
    }
}

impl Default for StableGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for StableGraph {
    fn drop(&mut self) {
        for record in self.edges.values() {
            record.edge.core().disassociate(self.id);
        }
        for record in self.vertices.values() {
            record.vertex.core().disassociate(self.id);
        }
    }
}

// ============================================================================
// BaseGraph impl
// ============================================================================

impl BaseGraph for StableGraph {
    fn id(&self) -> GraphId {
        self.id
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Stable
    }

    fn as_base_graph(&self) -> &dyn BaseGraph {
        self
    }

    // ========================================================================
    // Structure
    // ========================================================================

    fn add_vertex(&mut self, vertex: VertexRef) -> Result<GraphElementId> {
        if vertex.id_in(self.id).is_some() {
            return Err(Error::InvalidElement(format!(
                "vertex '{}' is already part of graph {}",
                vertex.describe(),
                self.id
            )));
        }

        let id = self.ids.allocate(ElementKind::Vertex);
        vertex.core().associate(self.id, id);
        let handle = self.vertices.insert(VertexRecord {
            id,
            vertex,
            out_edges: Vec::new(),
            in_edges: Vec::new(),
        });
        self.vertex_map.insert(id, handle);

        debug!(graph = %self.id, vertex = %id, "added vertex");
        Ok(id)
    }

    fn add_edge_between(
        &mut self,
        edge: EdgeRef,
        source: GraphElementId,
        target: GraphElementId,
    ) -> Result<GraphElementId> {
        if edge.id_in(self.id).is_some() {
            return Err(Error::InvalidElement(format!(
                "edge '{}' is already part of graph {}",
                edge.describe(),
                self.id
            )));
        }
        let (source_handle, source_record) = self.vertex_record(source)?;
        let (target_handle, target_record) = self.vertex_record(target)?;
        check_edge_endpoints(edge.as_ref(), &source_record.vertex, &target_record.vertex)?;

        let id = self.ids.allocate(ElementKind::Edge);
        edge.core().associate(self.id, id);
        let handle = self.edges.insert(EdgeRecord {
            id,
            edge,
            source: source_handle,
            target: target_handle,
        });
        if let Some(record) = self.vertices.get_mut(source_handle) {
            record.out_edges.push(id);
        }
        if let Some(record) = self.vertices.get_mut(target_handle) {
            record.in_edges.push(id);
        }
        self.edge_map.insert(id, handle);

        debug!(graph = %self.id, edge = %id, %source, %target, "added edge");
        Ok(id)
    }

    fn remove_vertex(&mut self, vertex: &VertexRef) -> Result<()> {
        let id = self.vertex_id(vertex)?;
        let (handle, record) = self.vertex_record(id)?;

        let mut incident: Vec<GraphElementId> =
            record.out_edges.iter().chain(&record.in_edges).copied().collect();
        incident.sort();
        incident.dedup();

        let mut detached = Vec::with_capacity(incident.len());
        for edge_id in incident {
            let (edge_handle, _) = self.edge_record(edge_id)?;
            detached.push((edge_id, edge_handle));
        }
        for (edge_id, edge_handle) in detached {
            self.detach_edge(edge_id, edge_handle);
        }

        self.vertices.remove(handle);
        self.vertex_map.remove(&id);
        vertex.core().disassociate(self.id);

        debug!(graph = %self.id, vertex = %id, "removed vertex");
        Ok(())
    }

    fn remove_edge(&mut self, edge: &EdgeRef) -> Result<()> {
        let id = self.edge_id(edge)?;
        let (handle, _) = self.edge_record(id)?;
        self.detach_edge(id, handle);
        Ok(())
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    fn vertex(&self, id: GraphElementId) -> Result<VertexRef> {
        self.vertex_record(id).map(|(_, r)| r.vertex.clone())
    }

    fn edge(&self, id: GraphElementId) -> Result<EdgeRef> {
        self.edge_record(id).map(|(_, r)| r.edge.clone())
    }

    fn edge_endpoints(&self, id: GraphElementId) -> Result<(GraphElementId, GraphElementId)> {
        let (_, record) = self.edge_record(id)?;
        Ok((self.vertex_id_at(record.source)?, self.vertex_id_at(record.target)?))
    }

    fn vertices(&self) -> ElementIter<'_, VertexRef> {
        Box::new(self.vertices.values().map(|r| r.vertex.clone()))
    }

    fn edges(&self) -> ElementIter<'_, EdgeRef> {
        Box::new(self.edges.values().map(|r| r.edge.clone()))
    }

    fn incident_edges(
        &self,
        vertex: GraphElementId,
        direction: Direction,
    ) -> Result<ElementIter<'_, EdgeRef>> {
        let (_, record) = self.vertex_record(vertex)?;
        let ids: Vec<GraphElementId> = match direction {
            Direction::Outgoing => record.out_edges.clone(),
            Direction::Incoming => record.in_edges.clone(),
            Direction::Both => {
                // Ids are monotonic, so sorting restores insertion order;
                // a self-loop sits in both lists and is kept once.
                let mut ids: Vec<_> = record.out_edges.iter().chain(&record.in_edges).copied().collect();
                ids.sort();
                ids.dedup();
                ids
            }
        };
        Ok(Box::new(ids.into_iter().filter_map(move |id| {
            self.edge_record(id).ok().map(|(_, r)| r.edge.clone())
        })))
    }

    fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    fn edge_count(&self) -> usize {
        self.edges.len()
    }

    // ========================================================================
    // Construction
    // ========================================================================

    fn new_instance(&self) -> Box<dyn BaseGraph> {
        Box::new(StableGraph::new())
    }

    fn check_consistency(&self) -> Result<()> {
        let fail = |message: String| {
            warn!(graph = %self.id, %message, "descriptor check failed");
            Err(Error::InconsistentDescriptor(message))
        };

        if self.vertex_map.len() != self.vertices.len() || self.edge_map.len() != self.edges.len() {
            return fail(format!(
                "map sizes {}/{} differ from native sizes {}/{}",
                self.vertex_map.len(),
                self.edge_map.len(),
                self.vertices.len(),
                self.edges.len()
            ));
        }
        for &id in self.vertex_map.keys() {
            let (_, record) = self.vertex_record(id)?;
            if record.vertex.id_in(self.id) != Some(id) {
                return fail(format!("vertex {id} does not carry its id"));
            }
        }
        for &id in self.edge_map.keys() {
            let (_, record) = self.edge_record(id)?;
            if record.edge.id_in(self.id) != Some(id) {
                return fail(format!("edge {id} does not carry its id"));
            }
            let (Some(source), Some(target)) =
                (self.vertices.get(record.source), self.vertices.get(record.target))
            else {
                return fail(format!("edge {id} has a dead endpoint handle"));
            };
            if check_edge_endpoints(record.edge.as_ref(), &source.vertex, &target.vertex).is_err() {
                return fail(format!("edge {id} endpoints differ from the native store"));
            }
            if !source.out_edges.contains(&id) || !target.in_edges.contains(&id) {
                return fail(format!("edge {id} missing from adjacency lists"));
            }
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> (StableGraph, Vec<VertexRef>, Vec<EdgeRef>) {
        let mut g = StableGraph::new();
        let vs: Vec<VertexRef> = ["a", "b", "c"].into_iter().map(BasicVertex::shared).collect();
        for v in &vs {
            g.add_vertex(v.clone()).unwrap();
        }
        let es: Vec<EdgeRef> = [(0, 1), (1, 2), (2, 0)]
            .into_iter()
            .map(|(s, t)| BasicEdge::shared(vs[s].clone(), vs[t].clone(), format!("{s}{t}")))
            .collect();
        for e in &es {
            g.add_edge(e.clone()).unwrap();
        }
        (g, vs, es)
    }

    #[test]
    fn test_ids_start_at_first() {
        let (g, vs, es) = triangle();
        assert_eq!(g.vertex_id(&vs[0]).unwrap(), GraphElementId::FIRST);
        assert_eq!(g.edge_id(&es[0]).unwrap(), GraphElementId::FIRST);
        assert_eq!(g.vertex_id(&vs[2]).unwrap(), GraphElementId(3));
        g.check_consistency().unwrap();
    }

    #[test]
    fn test_add_vertex_twice_is_rejected() {
        let (mut g, vs, _) = triangle();
        assert!(matches!(g.add_vertex(vs[0].clone()), Err(Error::InvalidElement(_))));
        assert_eq!(g.vertex_count(), 3);
    }

    #[test]
    fn test_remove_vertex_removes_incident_edges() {
        let (mut g, vs, es) = triangle();
        let removed = g.vertex_id(&vs[1]).unwrap();
        g.remove_vertex(&vs[1]).unwrap();

        assert!(matches!(g.vertex(removed), Err(Error::NotFound(_))));
        assert_eq!(g.edge_count(), 1);
        assert!(!g.contains_edge(&es[0]));
        assert!(g.contains_edge(&es[2]));
        assert!(vs[1].id_in(g.id()).is_none());
        assert!(es[0].id_in(g.id()).is_none());
        g.check_consistency().unwrap();
    }

    #[test]
    fn test_removed_id_is_not_reused() {
        let (mut g, vs, _) = triangle();
        g.remove_vertex(&vs[2]).unwrap();
        let fresh = g.add_vertex(BasicVertex::shared("d")).unwrap();
        assert_eq!(fresh, GraphElementId(4));
        // Slot reuse does not confuse lookups of surviving ids.
        assert!(same_vertex(&g.vertex(GraphElementId(1)).unwrap(), &vs[0]));
        g.check_consistency().unwrap();
    }

    #[test]
    fn test_incident_edges_by_direction() {
        let (mut g, vs, _) = triangle();
        let lp = BasicEdge::shared(vs[0].clone(), vs[0].clone(), "loop");
        g.add_edge(lp.clone()).unwrap();
        let a = g.vertex_id(&vs[0]).unwrap();

        let labels = |dir| -> Vec<String> {
            g.incident_edges(a, dir).unwrap().map(|e| e.label()).collect()
        };
        assert_eq!(labels(Direction::Outgoing), vec!["01", "loop"]);
        assert_eq!(labels(Direction::Incoming), vec!["20", "loop"]);
        assert_eq!(labels(Direction::Both), vec!["01", "20", "loop"]);
    }

    #[test]
    fn test_edge_with_mismatched_ids_is_rejected() {
        let (mut g, vs, _) = triangle();
        let e = BasicEdge::shared(vs[0].clone(), vs[1].clone(), "");
        let c = g.vertex_id(&vs[2]).unwrap();
        let a = g.vertex_id(&vs[0]).unwrap();
        assert!(matches!(g.add_edge_between(e.clone(), a, c), Err(Error::InvalidElement(_))));
        assert!(matches!(
            g.add_edge_between(e.clone(), a, GraphElementId(99)),
            Err(Error::NotFound(_))
        ));
        assert_eq!(g.edge_count(), 3);
        assert!(e.id_in(g.id()).is_none());
    }

    #[test]
    fn test_drop_releases_memberships() {
        let v = BasicVertex::shared("v");
        let graph_id = {
            let mut g = StableGraph::new();
            g.add_vertex(v.clone()).unwrap();
            g.id()
        };
        assert!(v.id_in(graph_id).is_none());
    }
}
