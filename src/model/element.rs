//! Shared base of vertices and edges.

use std::any::Any;
use std::fmt;

use hashbrown::HashMap;
use parking_lot::RwLock;

use super::{GraphElementId, GraphId};

/// State every graph element carries: label, registered class type, and
/// the id it was given in each graph it belongs to.
///
/// Cloning an `ElementCore` copies label and class type but never the
/// memberships: a copy is not part of any graph.
pub struct ElementCore {
    label: RwLock<String>,
    class_type: String,
    memberships: RwLock<HashMap<GraphId, GraphElementId>>,
}

impl ElementCore {
    pub fn new(label: impl Into<String>, class_type: impl Into<String>) -> Self {
        Self {
            label: RwLock::new(label.into()),
            class_type: class_type.into(),
            memberships: RwLock::new(HashMap::new()),
        }
    }

    pub fn label(&self) -> String {
        self.label.read().clone()
    }

    pub fn set_label(&self, label: impl Into<String>) {
        *self.label.write() = label.into();
    }

    pub fn class_type(&self) -> &str {
        &self.class_type
    }

    /// Only reachable through `&mut`, i.e. before the element is shared.
    pub fn set_class_type(&mut self, class_type: impl Into<String>) {
        self.class_type = class_type.into();
    }

    /// Id of this element in the given graph, if it is a member.
    pub fn id_in(&self, graph: GraphId) -> Option<GraphElementId> {
        self.memberships.read().get(&graph).copied()
    }

    /// Graphs this element currently belongs to.
    pub fn graphs(&self) -> Vec<GraphId> {
        let mut graphs: Vec<GraphId> = self.memberships.read().keys().copied().collect();
        graphs.sort();
        graphs
    }

    pub(crate) fn associate(&self, graph: GraphId, id: GraphElementId) {
        self.memberships.write().insert(graph, id);
    }

    pub(crate) fn disassociate(&self, graph: GraphId) {
        self.memberships.write().remove(&graph);
    }

    pub fn disassociate_from_all(&self) {
        self.memberships.write().clear();
    }
}

impl Clone for ElementCore {
    fn clone(&self) -> Self {
        Self::new(self.label(), self.class_type.clone())
    }
}

impl fmt::Debug for ElementCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementCore")
            .field("label", &*self.label.read())
            .field("class_type", &self.class_type)
            .field("memberships", &*self.memberships.read())
            .finish()
    }
}

/// Common contract of `Vertex` and `Edge`.
///
/// Concrete kinds embed an [`ElementCore`] and expose it through `core()`;
/// everything else has a default built on top of it.
pub trait GraphElement: Any + Send + Sync + fmt::Debug {
    fn core(&self) -> &ElementCore;

    fn core_mut(&mut self) -> &mut ElementCore;

    /// Static per-concrete-type name, the default registry key.
    fn class_name(&self) -> &'static str;

    fn as_any(&self) -> &dyn Any;

    fn label(&self) -> String {
        self.core().label()
    }

    fn set_label(&self, label: &str) {
        self.core().set_label(label);
    }

    /// Registered type name used to reconstruct this exact kind.
    fn class_type(&self) -> &str {
        self.core().class_type()
    }

    fn id_in(&self, graph: GraphId) -> Option<GraphElementId> {
        self.core().id_in(graph)
    }

    /// Label, or class name when the label is empty.
    fn describe(&self) -> String {
        let label = self.label();
        if label.is_empty() {
            self.class_name().to_string()
        } else {
            label
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clone_drops_memberships() {
        let core = ElementCore::new("a", "Vertex");
        core.associate(GraphId(7), GraphElementId(3));
        assert_eq!(core.id_in(GraphId(7)), Some(GraphElementId(3)));

        let copy = core.clone();
        assert_eq!(copy.label(), "a");
        assert_eq!(copy.class_type(), "Vertex");
        assert!(copy.graphs().is_empty());
        assert_eq!(core.graphs(), vec![GraphId(7)]);
    }

    #[test]
    fn test_disassociate() {
        let core = ElementCore::new("", "Edge");
        core.associate(GraphId(1), GraphElementId(1));
        core.associate(GraphId(2), GraphElementId(5));
        core.disassociate(GraphId(1));
        assert_eq!(core.graphs(), vec![GraphId(2)]);
        core.disassociate_from_all();
        assert!(core.graphs().is_empty());
    }
}
