//! # Filters
//!
//! Element predicates and edge-context permission chains.
//!
//! A [`Filter`] answers "does this element match". Filters turn into
//! iteration [`Skipper`]s with [`skip_matching`] and [`skip_unmatched`].
//!
//! An [`EdgeContextFilter`] decides whether an edge's source or target is
//! admissible. It permits when its own predicate does, and otherwise when
//! *any* of its children permits, recursively. A filter with no predicate
//! and no children permits nothing; absence of a deny is never a permit.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use regex::Regex;

use crate::iter::Skipper;
use crate::model::{Edge, GraphElement, Vertex};
use crate::{Error, Result};

// ============================================================================
// Element filters
// ============================================================================

/// Predicate over one element.
pub trait Filter<T: ?Sized>: Send + Sync {
    fn name(&self) -> String;

    fn matches(&self, element: &T) -> bool;
}

/// What a [`PatternFilter`] looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterType {
    /// The element label
    Content,
    /// The element's concrete class name
    Class,
}

impl FilterType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterType::Content => "CONTENT",
            FilterType::Class => "CLASS",
        }
    }
}

impl fmt::Display for FilterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "CONTENT" => Ok(FilterType::Content),
            "CLASS" => Ok(FilterType::Class),
            other => Err(Error::NotFound(format!("Filter type '{other}'"))),
        }
    }
}

/// Regex match on an element's label or class name.
#[derive(Debug, Clone)]
pub struct PatternFilter {
    pattern: Regex,
    filter_type: FilterType,
}

impl PatternFilter {
    pub fn new(pattern: &str, filter_type: FilterType) -> Result<Self> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
            filter_type,
        })
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    pub fn filter_type(&self) -> FilterType {
        self.filter_type
    }
}

impl<T: GraphElement + ?Sized> Filter<T> for PatternFilter {
    fn name(&self) -> String {
        format!("{}:{}", self.filter_type, self.pattern)
    }

    fn matches(&self, element: &T) -> bool {
        match self.filter_type {
            FilterType::Content => self.pattern.is_match(&element.label()),
            FilterType::Class => self.pattern.is_match(element.class_name()),
        }
    }
}

/// Skip every element `filter` matches.
pub fn skip_matching<'a, T: ?Sized + 'a>(filter: &'a dyn Filter<T>) -> Skipper<'a, T> {
    Box::new(move |element: &Arc<T>| filter.matches(element))
}

/// Skip every element `filter` does not match.
pub fn skip_unmatched<'a, T: ?Sized + 'a>(filter: &'a dyn Filter<T>) -> Skipper<'a, T> {
    Box::new(move |element: &Arc<T>| !filter.matches(element))
}

// ============================================================================
// Edge context filters
// ============================================================================

/// Admissibility of an edge's endpoints, composed as a recursive OR.
pub trait EdgeContextFilter: Send + Sync {
    fn evaluate_source(&self, _edge: &dyn Edge) -> bool {
        false
    }

    fn evaluate_target(&self, _edge: &dyn Edge) -> bool {
        false
    }

    /// Consulted in order when the direct predicate does not permit.
    fn children(&self) -> &[Box<dyn EdgeContextFilter>] {
        &[]
    }

    fn permit_source(&self, edge: &dyn Edge) -> bool {
        self.evaluate_source(edge) || self.children().iter().any(|c| c.permit_source(edge))
    }

    fn permit_target(&self, edge: &dyn Edge) -> bool {
        self.evaluate_target(edge) || self.children().iter().any(|c| c.permit_target(edge))
    }
}

/// Skip every edge whose source or target is not permitted.
pub fn skip_unpermitted<'a>(filter: &'a dyn EdgeContextFilter) -> Skipper<'a, dyn Edge> {
    Box::new(move |edge: &Arc<dyn Edge>| {
        !(filter.permit_source(edge.as_ref()) && filter.permit_target(edge.as_ref()))
    })
}

type EdgePredicate = Box<dyn Fn(&dyn Edge) -> bool + Send + Sync>;

/// Closure-backed [`EdgeContextFilter`] with nested children.
#[derive(Default)]
pub struct EdgeFilterChain {
    source: Option<EdgePredicate>,
    target: Option<EdgePredicate>,
    children: Vec<Box<dyn EdgeContextFilter>>,
}

impl EdgeFilterChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source(mut self, predicate: impl Fn(&dyn Edge) -> bool + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(predicate));
        self
    }

    pub fn with_target(mut self, predicate: impl Fn(&dyn Edge) -> bool + Send + Sync + 'static) -> Self {
        self.target = Some(Box::new(predicate));
        self
    }

    pub fn with_child(mut self, child: impl EdgeContextFilter + 'static) -> Self {
        self.add_child(Box::new(child));
        self
    }

    pub fn add_child(&mut self, child: Box<dyn EdgeContextFilter>) {
        self.children.push(child);
    }
}

impl EdgeContextFilter for EdgeFilterChain {
    fn evaluate_source(&self, edge: &dyn Edge) -> bool {
        self.source.as_ref().is_some_and(|p| p(edge))
    }

    fn evaluate_target(&self, edge: &dyn Edge) -> bool {
        self.target.as_ref().is_some_and(|p| p(edge))
    }

    fn children(&self) -> &[Box<dyn EdgeContextFilter>] {
        &self.children
    }
}

impl fmt::Debug for EdgeFilterChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EdgeFilterChain")
            .field("source", &self.source.is_some())
            .field("target", &self.target.is_some())
            .field("children", &self.children.len())
            .finish()
    }
}

/// Permits an endpoint when a vertex filter matches it.
pub struct EndpointFilter {
    vertex_filter: Box<dyn Filter<dyn Vertex>>,
    children: Vec<Box<dyn EdgeContextFilter>>,
}

impl EndpointFilter {
    pub fn new(vertex_filter: impl Filter<dyn Vertex> + 'static) -> Self {
        Self {
            vertex_filter: Box::new(vertex_filter),
            children: Vec::new(),
        }
    }

    pub fn with_child(mut self, child: impl EdgeContextFilter + 'static) -> Self {
        self.children.push(Box::new(child));
        self
    }
}

impl EdgeContextFilter for EndpointFilter {
    fn evaluate_source(&self, edge: &dyn Edge) -> bool {
        edge.source().is_some_and(|v| self.vertex_filter.matches(v.as_ref()))
    }

    fn evaluate_target(&self, edge: &dyn Edge) -> bool {
        edge.target().is_some_and(|v| self.vertex_filter.matches(v.as_ref()))
    }

    fn children(&self) -> &[Box<dyn EdgeContextFilter>] {
        &self.children
    }
}

impl fmt::Debug for EndpointFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointFilter")
            .field("vertex_filter", &self.vertex_filter.name())
            .field("children", &self.children.len())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BasicEdge, BasicVertex, VertexRef};
    use crate::storage::{BaseGraph, StableGraph};

    struct Deny;
    impl EdgeContextFilter for Deny {}

    fn edge(source: &str, target: &str) -> BasicEdge {
        BasicEdge::between(BasicVertex::shared(source), BasicVertex::shared(target), "")
    }

    #[test]
    fn test_filter_type_names() {
        assert_eq!(FilterType::Content.to_string(), "CONTENT");
        assert_eq!("CLASS".parse::<FilterType>().unwrap(), FilterType::Class);
        assert!("class".parse::<FilterType>().is_err());
    }

    #[test]
    fn test_pattern_filter_content_and_class() {
        let v = BasicVertex::new("pump-7");
        let content = PatternFilter::new(r"^pump-\d+$", FilterType::Content).unwrap();
        let class = PatternFilter::new("Vertex$", FilterType::Class).unwrap();
        assert!(Filter::<BasicVertex>::matches(&content, &v));
        assert!(Filter::<BasicVertex>::matches(&class, &v));
        assert_eq!(Filter::<BasicVertex>::name(&class), "CLASS:Vertex$");

        let e = BasicEdge::new("pump-7");
        assert!(Filter::<BasicEdge>::matches(&content, &e));
        assert!(!Filter::<BasicEdge>::matches(&class, &e));
    }

    #[test]
    fn test_invalid_pattern() {
        assert!(matches!(
            PatternFilter::new("(", FilterType::Content),
            Err(Error::InvalidPattern(_))
        ));
    }

    #[test]
    fn test_empty_chain_permits_nothing() {
        let e = edge("a", "b");
        let chain = EdgeFilterChain::new();
        assert!(!chain.permit_source(&e));
        assert!(!chain.permit_target(&e));
    }

    #[test]
    fn test_direct_permit_short_circuits() {
        let e = edge("a", "b");
        let chain = EdgeFilterChain::new().with_target(|_| true).with_child(Deny);
        assert!(chain.permit_target(&e));
        assert!(!chain.permit_source(&e));
    }

    #[test]
    fn test_any_child_permits() {
        let e = edge("a", "b");
        let chain = EdgeFilterChain::new()
            .with_source(|_| false)
            .with_child(Deny)
            .with_child(EdgeFilterChain::new().with_source(|_| true));
        assert!(chain.permit_source(&e));
        assert!(!chain.permit_target(&e));
    }

    #[test]
    fn test_nested_permit_is_found() {
        let e = edge("a", "b");
        let deep = EdgeFilterChain::new().with_child(
            EdgeFilterChain::new()
                .with_child(Deny)
                .with_child(EdgeFilterChain::new().with_target(|e| e.target().is_some())),
        );
        assert!(deep.permit_target(&e));
        assert!(!deep.permit_source(&e));
    }

    #[test]
    fn test_endpoint_filter() {
        let pumps = PatternFilter::new("^pump", FilterType::Content).unwrap();
        let filter = EndpointFilter::new(pumps);
        let e = edge("pump-1", "tank");
        assert!(filter.permit_source(&e));
        assert!(!filter.permit_target(&e));

        let dangling = BasicEdge::new("");
        assert!(!filter.permit_source(&dangling));
    }

    #[test]
    fn test_filters_as_skippers() {
        let mut g = StableGraph::new();
        let vs: Vec<VertexRef> = ["pump-1", "tank", "pump-2"].into_iter().map(BasicVertex::shared).collect();
        g.add_edge(BasicEdge::shared(vs[0].clone(), vs[1].clone(), "")).unwrap();
        g.add_edge(BasicEdge::shared(vs[1].clone(), vs[2].clone(), "")).unwrap();

        let pumps = PatternFilter::new("^pump", FilterType::Content).unwrap();
        let kept: Vec<String> = g.vertex_iterator().with_skipper(skip_unmatched::<dyn Vertex>(&pumps)).map(|v| v.label()).collect();
        assert_eq!(kept, vec!["pump-1", "pump-2"]);
        let rest: Vec<String> = g.vertex_iterator().with_skipper(skip_matching::<dyn Vertex>(&pumps)).map(|v| v.label()).collect();
        assert_eq!(rest, vec!["tank"]);

        let from_pump = EdgeFilterChain::new()
            .with_source(|e| e.source().is_some_and(|v| v.label().starts_with("pump")))
            .with_target(|_| true);
        assert_eq!(g.edge_iterator().with_skipper(skip_unpermitted(&from_pump)).count(), 1);
    }
}
