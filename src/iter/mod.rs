//! # Traversal Protocol
//!
//! Pull-based, restartable iteration over any `BaseGraph`.
//!
//! ```text
//! while it.advance() {
//!     let element = it.current();
//! }
//! ```
//!
//! A `GraphIterator` is backed by a lazy sequence: all vertices, all edges,
//! or the edges incident to one vertex in a given direction. Skippers are
//! consulted at each step; an element any skipper rejects is passed over
//! and never becomes `current()`. `GraphIterator` is also a plain
//! `Iterator`, so adaptor chains work on it directly.

use std::fmt;
use std::sync::Arc;

use tracing::trace;

use crate::model::{Direction, Edge, EdgeRef, Vertex, VertexRef};
use crate::storage::{BaseGraph, ElementIter};
use crate::Result;

/// Predicate consulted during iteration. Returns `true` to skip.
pub type Skipper<'a, T> = Box<dyn Fn(&Arc<T>) -> bool + 'a>;

type Source<'g, T> = Box<dyn Fn() -> ElementIter<'g, Arc<T>> + 'g>;

/// Restartable cursor over graph elements.
pub struct GraphIterator<'g, T: ?Sized> {
    source: Source<'g, T>,
    inner: ElementIter<'g, Arc<T>>,
    current: Option<Arc<T>>,
    skippers: Vec<Skipper<'g, T>>,
}

pub type VertexIterator<'g> = GraphIterator<'g, dyn Vertex>;
pub type EdgeIterator<'g> = GraphIterator<'g, dyn Edge>;

impl<'g, T: ?Sized> GraphIterator<'g, T> {
    /// Iterator over whatever `source` yields. `source` is called again on
    /// every `restart()`.
    pub fn new(source: impl Fn() -> ElementIter<'g, Arc<T>> + 'g) -> Self {
        let inner = source();
        Self::from_parts(Box::new(source), inner)
    }

    fn from_parts(source: Source<'g, T>, inner: ElementIter<'g, Arc<T>>) -> Self {
        Self {
            source,
            inner,
            current: None,
            skippers: Vec::new(),
        }
    }

    /// Move to the next element no skipper rejects.
    ///
    /// Returns whether there is a current element afterwards.
    pub fn advance(&mut self) -> bool {
        for element in self.inner.by_ref() {
            if self.skippers.iter().any(|skip| skip(&element)) {
                trace!("iterator skipped element");
                continue;
            }
            self.current = Some(element);
            return true;
        }
        self.current = None;
        false
    }

    /// Element reached by the last successful `advance()`.
    pub fn current(&self) -> Option<&Arc<T>> {
        self.current.as_ref()
    }

    /// Rewind to before the first element. Skippers are kept.
    pub fn restart(&mut self) {
        self.inner = (self.source)();
        self.current = None;
    }

    pub fn add_skipper(&mut self, skipper: Skipper<'g, T>) {
        self.skippers.push(skipper);
    }

    pub fn with_skipper(mut self, skipper: Skipper<'g, T>) -> Self {
        self.add_skipper(skipper);
        self
    }
}

impl<T: ?Sized> Iterator for GraphIterator<'_, T> {
    type Item = Arc<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.advance() { self.current.clone() } else { None }
    }
}

impl<T: ?Sized> fmt::Debug for GraphIterator<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphIterator")
            .field("has_current", &self.current.is_some())
            .field("skippers", &self.skippers.len())
            .finish()
    }
}

impl<'g> GraphIterator<'g, dyn Vertex> {
    /// Every vertex of `graph`.
    pub fn over(graph: &'g dyn BaseGraph) -> Self {
        Self::new(move || graph.vertices())
    }
}

impl<'g> GraphIterator<'g, dyn Edge> {
    /// Every edge of `graph`.
    pub fn over(graph: &'g dyn BaseGraph) -> Self {
        Self::new(move || graph.edges())
    }

    /// Edges touching `vertex` in `direction`.
    ///
    /// Fails if `vertex` is not a member of `graph`.
    pub fn incident(graph: &'g dyn BaseGraph, vertex: &VertexRef, direction: Direction) -> Result<Self> {
        let id = graph.vertex_id(vertex)?;
        let inner = graph.incident_edges(id, direction)?;
        // The graph is borrowed for 'g, so the vertex stays a member and
        // the lookup on restart cannot fail.
        let source = move || {
            graph
                .incident_edges(id, direction)
                .unwrap_or_else(|_| Box::new(std::iter::empty()) as ElementIter<'g, EdgeRef>)
        };
        Ok(Self::from_parts(Box::new(source), inner))
    }
}

// ============================================================================
// Tests
// ============================================================================
