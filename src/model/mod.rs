//! # Element Identity Model
//!
//! Vertices and edges shared across graph instances and views.
//! An element is held through `Arc`, may sit in several graphs at once,
//! and carries an independent id in each of them.
//!
//! This module is pure data: no storage and no traversal.

pub mod id;
pub mod element;
pub mod vertex;
pub mod edge;

pub use id::{Direction, ElementKind, GraphElementId, GraphId, IdAllocator};
pub use element::{ElementCore, GraphElement};
pub use vertex::{BasicVertex, Vertex, VertexRef, same_vertex};
pub use edge::{
    BasicEdge, Edge, EdgeEnds, EdgeRef,
    are_meeting, involved_vertices, same_edge,
};
