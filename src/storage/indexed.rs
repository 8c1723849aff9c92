//! Vector-indexed backend.
//!
//! Vertices and edges live in plain `Vec`s and their native handle is the
//! position in that `Vec`. Removing an element shifts everything behind
//! it, which renumbers native handles. Every mutation that can renumber
//! ends with a repair pass over the descriptor maps, so a caller never
//! observes a map entry pointing at the wrong element.
//!
//! ## Limitations
//!
//! - Removals are O(V + E).
//! - Incident-edge scans walk the whole edge list.
//!
//! Use this backend when iteration order must be strict insertion order,
//! or to exercise the descriptor-repair discipline in tests.

use hashbrown::HashMap;
use tracing::{debug, trace, warn};

use crate::model::*;
use crate::{Error, Result};
use super::{BackendKind, BaseGraph, ElementIter, check_edge_endpoints};

// ============================================================================
// Native records
// ============================================================================

struct VertexRecord {
    id: GraphElementId,
    vertex: VertexRef,
}

struct EdgeRecord {
    id: GraphElementId,
    edge: EdgeRef,
    /// Index into `vertices`. Renumbered when a vertex before it goes.
    source: usize,
    target: usize,
}

// ============================================================================
// IndexedGraph
// ============================================================================

/// Directed multigraph over index-addressed vectors.
pub struct IndexedGraph {
    id: GraphId,
    ids: IdAllocator,
    vertices: Vec<VertexRecord>,
    edges: Vec<EdgeRecord>,
    vertex_map: HashMap<GraphElementId, usize>,
    edge_map: HashMap<GraphElementId, usize>,
}

impl IndexedGraph {
    pub fn new() -> Self {
        Self::with_capacity(0, 0)
    }

    pub fn with_capacity(vertices: usize, edges: usize) -> Self {
        Self {
            id: GraphId::next(),
            ids: IdAllocator::new(),
            vertices: Vec::with_capacity(vertices),
            edges: Vec::with_capacity(edges),
            vertex_map: HashMap::with_capacity(vertices),
            edge_map: HashMap::with_capacity(edges),
        }
    }

    fn vertex_index(&self, id: GraphElementId) -> Result<usize> {
        let index = *self
            .vertex_map
            .get(&id)
            .ok_or_else(|| Error::NotFound(format!("Vertex {id} in graph {}", self.id)))?;
        match self.vertices.get(index) {
            Some(record) if record.id == id => Ok(index),
            _ => Err(Error::InconsistentDescriptor(format!(
                "vertex {id} of graph {} maps to stale index {index}",
                self.id
            ))),
        }
    }

    fn edge_index(&self, id: GraphElementId) -> Result<usize> {
        let index = *self
            .edge_map
            .get(&id)
            .ok_or_else(|| Error::NotFound(format!("Edge {id} in graph {}", self.id)))?;
        match self.edges.get(index) {
            Some(record) if record.id == id => Ok(index),
            _ => Err(Error::InconsistentDescriptor(format!(
                "edge {id} of graph {} maps to stale index {index}",
                self.id
            ))),
        }
    }

    fn vertex_id_at(&self, index: usize) -> Result<GraphElementId> {
        self.vertices.get(index).map(|r| r.id).ok_or_else(|| {
            Error::InconsistentDescriptor(format!(
                "edge endpoint index {index} of graph {} is out of range",
                self.id
            ))
        })
    }

    /// Rebuild both descriptor maps from the native vectors.
    fn repair_descriptors(&mut self) {
        self.vertex_map.clear();
        self.vertex_map
            .extend(self.vertices.iter().enumerate().map(|(index, r)| (r.id, index)));
        self.edge_map.clear();
        self.edge_map
            .extend(self.edges.iter().enumerate().map(|(index, r)| (r.id, index)));
        trace!(
            graph = %self.id,
            vertices = self.vertices.len(),
            edges = self.edges.len(),
            "repaired descriptor maps"
        );
    }
}

impl Default for IndexedGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for IndexedGraph {
    fn drop(&mut self) {
        for record in &self.edges {
            record.edge.core().disassociate(self.id);
        }
        for record in &self.vertices {
            record.vertex.core().disassociate(self.id);
        }
    }
}

// ============================================================================
// BaseGraph impl
// ============================================================================

impl BaseGraph for IndexedGraph {
    fn id(&self) -> GraphId {
        self.id
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Indexed
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
        self.vertex_map.insert(id, self.vertices.len());
        self.vertices.push(VertexRecord { id, vertex });

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
        let source_index = self.vertex_index(source)?;
        let target_index = self.vertex_index(target)?;
        check_edge_endpoints(
            edge.as_ref(),
            &self.vertices[source_index].vertex,
            &self.vertices[target_index].vertex,
        )?;

        let id = self.ids.allocate(ElementKind::Edge);
        edge.core().associate(self.id, id);
        self.edge_map.insert(id, self.edges.len());
        self.edges.push(EdgeRecord {
            id,
            edge,
            source: source_index,
            target: target_index,
        });

        debug!(graph = %self.id, edge = %id, %source, %target, "added edge");
        Ok(id)
    }

    fn remove_vertex(&mut self, vertex: &VertexRef) -> Result<()> {
        let id = self.vertex_id(vertex)?;
        let index = self.vertex_index(id)?;

        let (kept, removed): (Vec<EdgeRecord>, Vec<EdgeRecord>) = std::mem::take(&mut self.edges)
            .into_iter()
            .partition(|e| e.source != index && e.target != index);
        self.edges = kept;
        for record in &removed {
            record.edge.core().disassociate(self.id);
            debug!(graph = %self.id, edge = %record.id, "removed edge");
        }

        // Everything behind `index` shifts down by one.
        self.vertices.remove(index);
        for record in &mut self.edges {
            if record.source > index {
                record.source -= 1;
            }
            if record.target > index {
                record.target -= 1;
            }
        }
        self.repair_descriptors();
        vertex.core().disassociate(self.id);

        debug!(graph = %self.id, vertex = %id, "removed vertex");
        Ok(())
    }

    fn remove_edge(&mut self, edge: &EdgeRef) -> Result<()> {
        let id = self.edge_id(edge)?;
        let index = self.edge_index(id)?;

        self.edges.remove(index);
        self.repair_descriptors();
        edge.core().disassociate(self.id);

        debug!(graph = %self.id, edge = %id, "removed edge");
        Ok(())
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    fn vertex(&self, id: GraphElementId) -> Result<VertexRef> {
        let index = self.vertex_index(id)?;
        Ok(self.vertices[index].vertex.clone())
    }

    fn edge(&self, id: GraphElementId) -> Result<EdgeRef> {
        let index = self.edge_index(id)?;
        Ok(self.edges[index].edge.clone())
    }

    fn edge_endpoints(&self, id: GraphElementId) -> Result<(GraphElementId, GraphElementId)> {
        let record = &self.edges[self.edge_index(id)?];
        Ok((self.vertex_id_at(record.source)?, self.vertex_id_at(record.target)?))
    }

    fn vertices(&self) -> ElementIter<'_, VertexRef> {
        Box::new(self.vertices.iter().map(|r| r.vertex.clone()))
    }

    fn edges(&self) -> ElementIter<'_, EdgeRef> {
        Box::new(self.edges.iter().map(|r| r.edge.clone()))
    }

    fn incident_edges(
        &self,
        vertex: GraphElementId,
        direction: Direction,
    ) -> Result<ElementIter<'_, EdgeRef>> {
        let index = self.vertex_index(vertex)?;
        Ok(Box::new(
            self.edges
                .iter()
                .filter(move |r| match direction {
                    Direction::Outgoing => r.source == index,
                    Direction::Incoming => r.target == index,
                    Direction::Both => r.source == index || r.target == index,
                })
                .map(|r| r.edge.clone()),
        ))
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
        Box::new(IndexedGraph::new())
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
        for (index, record) in self.vertices.iter().enumerate() {
            if self.vertex_map.get(&record.id) != Some(&index) {
                return fail(format!("vertex {} is not mapped to index {index}", record.id));
            }
            if record.vertex.id_in(self.id) != Some(record.id) {
                return fail(format!("vertex {} does not carry its id", record.id));
            }
        }
        for (index, record) in self.edges.iter().enumerate() {
            if self.edge_map.get(&record.id) != Some(&index) {
                return fail(format!("edge {} is not mapped to index {index}", record.id));
            }
            if record.edge.id_in(self.id) != Some(record.id) {
                return fail(format!("edge {} does not carry its id", record.id));
            }
            let (Some(source), Some(target)) =
                (self.vertices.get(record.source), self.vertices.get(record.target))
            else {
                return fail(format!("edge {} has an out-of-range endpoint", record.id));
            };
            if check_edge_endpoints(record.edge.as_ref(), &source.vertex, &target.vertex).is_err() {
                return fail(format!("edge {} endpoints differ from the native store", record.id));
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

    fn chain(n: usize) -> (IndexedGraph, Vec<VertexRef>, Vec<EdgeRef>) {
        let mut g = IndexedGraph::new();
        let vs: Vec<VertexRef> = (0..n).map(|i| BasicVertex::shared(format!("v{i}"))).collect();
        for v in &vs {
            g.add_vertex(v.clone()).unwrap();
        }
        let es: Vec<EdgeRef> = vs
            .windows(2)
            .map(|w| BasicEdge::shared(w[0].clone(), w[1].clone(), format!("{}-{}", w[0], w[1])))
            .collect();
        for e in &es {
            g.add_edge(e.clone()).unwrap();
        }
        (g, vs, es)
    }

    #[test]
    fn test_removal_renumbers_and_repairs() {
        let (mut g, vs, es) = chain(5);
        let ids: Vec<GraphElementId> = vs.iter().map(|v| g.vertex_id(v).unwrap()).collect();

        // Removing the first vertex shifts every native index.
        g.remove_vertex(&vs[0]).unwrap();
        g.check_consistency().unwrap();

        assert!(matches!(g.vertex(ids[0]), Err(Error::NotFound(_))));
        for (v, id) in vs.iter().zip(&ids).skip(1) {
            assert!(same_vertex(&g.vertex(*id).unwrap(), v));
        }
        assert_eq!(g.edge_count(), 3);
        let (s, t) = g.edge_endpoints(g.edge_id(&es[1]).unwrap()).unwrap();
        assert_eq!((s, t), (ids[1], ids[2]));
    }

    #[test]
    fn test_remove_edge_in_the_middle() {
        let (mut g, vs, es) = chain(4);
        g.remove_edge(&es[0]).unwrap();
        g.check_consistency().unwrap();

        assert!(!g.contains_edge(&es[0]));
        assert!(es[0].id_in(g.id()).is_none());
        let last = g.edge_id(&es[2]).unwrap();
        assert!(same_edge(&g.edge(last).unwrap(), &es[2]));
        assert_eq!(g.edges_between(&vs[1], &vs[2]).unwrap().len(), 1);
    }

    #[test]
    fn test_iteration_is_insertion_order() {
        let (mut g, vs, _) = chain(4);
        g.remove_vertex(&vs[1]).unwrap();
        let labels: Vec<String> = g.vertices().map(|v| v.label()).collect();
        assert_eq!(labels, vec!["v0", "v2", "v3"]);
        let edges: Vec<String> = g.edges().map(|e| e.label()).collect();
        assert_eq!(edges, vec!["v2-v3"]);
    }

    #[test]
    fn test_remove_foreign_element_leaves_graph_untouched() {
        let (mut g, _, _) = chain(3);
        let stranger = BasicVertex::shared("x");
        assert!(matches!(g.remove_vertex(&stranger), Err(Error::InvalidElement(_))));
        let loose = BasicEdge::shared(stranger.clone(), stranger, "");
        assert!(matches!(g.remove_edge(&loose), Err(Error::InvalidElement(_))));
        assert_eq!((g.vertex_count(), g.edge_count()), (3, 2));
        g.check_consistency().unwrap();
    }

    #[test]
    fn test_detects_tampered_endpoints() {
        let (g, vs, es) = chain(3);
        es[0].set_target(Some(vs[0].clone()));
        assert!(matches!(g.check_consistency(), Err(Error::InconsistentDescriptor(_))));
    }
}
