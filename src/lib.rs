//! # graph-analysis-rs: Backend-Agnostic Graph Abstraction
//!
//! One stable vertex/edge model backed by interchangeable graph engines.
//!
//! ## Design Principles
//!
//! 1. **Trait-first**: `BaseGraph` is the contract between algorithms and storage
//! 2. **Shared elements**: `VertexRef` / `EdgeRef` are `Arc`s; one element may
//!    live in many graphs, with an independent id in each
//! 3. **Prototype registry**: new kinds are registered at runtime and
//!    reconstructed by cloning, keyed by type name
//! 4. **Views, not copies**: `SubGraph` masks elements of a base graph
//!
//! ## Quick Start
//!
//! ```rust
//! use graph_analysis::{BackendConfig, BasicEdge, BasicVertex, Direction};
//!
//! # fn example() -> graph_analysis::Result<()> {
//! let mut graph = graph_analysis::open(&BackendConfig::default());
//!
//! let a = BasicVertex::shared("a");
//! let b = BasicVertex::shared("b");
//! graph.add_edge(BasicEdge::shared(a.clone(), b.clone(), "a->b"))?;
//!
//! let mut out = graph.out_edge_iterator(&a)?;
//! while out.advance() {
//!     if let Some(edge) = out.current() {
//!         println!("{edge}");
//!     }
//! }
//!
//! let mut view = graph.create_sub_graph();
//! view.disable_vertex(&b)?;
//! assert_eq!(view.vertex_iterator().count(), 1);
//! # let _ = Direction::Both;
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```
//!
//! ## Storage Backends
//!
//! | Backend | `BackendKind` | Description |
//! |---------|---------------|-------------|
//! | Stable | `Stable` (default) | Generational arena; native handles never move |
//! | Indexed | `Indexed` | Vector-indexed; renumbers on removal and repairs its maps |

// ============================================================================
// Modules
// ============================================================================

pub mod model;
pub mod registry;
pub mod storage;
pub mod iter;
pub mod filter;
pub mod subgraph;

// ============================================================================
// Re-exports: Model
// ============================================================================

pub use model::{
    BasicEdge, BasicVertex, Direction, Edge, EdgeRef, ElementCore, ElementKind,
    GraphElement, GraphElementId, GraphId, Vertex, VertexRef,
    are_meeting, involved_vertices,
};

// ============================================================================
// Re-exports: Registry
// ============================================================================

pub use registry::{
    Attribute, AttributeCallbacks, AttributeId, EdgeTypeRegistry, OnDuplicate,
    OnMissing, TypeRegistry, VertexTypeRegistry, edge_types, vertex_types,
};

// ============================================================================
// Re-exports: Storage, traversal, views
// ============================================================================

pub use storage::{BackendConfig, BackendKind, BaseGraph, IndexedGraph, StableGraph, open};
pub use iter::{EdgeIterator, GraphIterator, Skipper, VertexIterator};
pub use filter::{EdgeContextFilter, EdgeFilterChain, EndpointFilter, Filter, FilterType, PatternFilter};
pub use subgraph::SubGraph;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Unknown type: {0}")]
    UnknownType(String),

    #[error("Type already registered: {0}")]
    DuplicateType(String),

    #[error("Attribute '{attribute}' already registered for type '{type_name}'")]
    DuplicateAttribute { type_name: String, attribute: String },

    #[error("Invalid element: {0}")]
    InvalidElement(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Descriptor map and native store disagree. Always a defect.
    #[error("Inconsistent descriptor: {0}")]
    InconsistentDescriptor(String),

    #[error("Invalid value for attribute '{attribute}': {message}")]
    InvalidAttributeValue { attribute: String, message: String },

    #[error("Invalid filter pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] serde_json::Error),

    #[error("Unknown backend: '{0}' (expected 'stable' or 'indexed')")]
    UnknownBackend(String),
}

pub type Result<T> = std::result::Result<T, Error>;
