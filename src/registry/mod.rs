//! # Type Registry
//!
//! Runtime-extensible factory for vertex and edge kinds. A type name maps
//! to a prototype element; new elements are produced by cloning the
//! prototype, never by compiled-in dispatch. A deserializer can therefore
//! build any registered kind from nothing but the type name in its input.
//!
//! Registries are plain values passed to whoever needs them. A
//! process-wide instance per element kind is available through
//! [`vertex_types`] and [`edge_types`] as a convenience.
//!
//! Registration is expected to happen during setup. Afterwards any number
//! of readers may query a registry concurrently (`&self` only).

pub mod attribute;

use std::collections::BTreeSet;
use std::sync::{Arc, LazyLock};

use hashbrown::HashMap;
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::model::*;
use crate::{Error, Result};

pub use attribute::{Attribute, AttributeCallbacks, AttributeId};

// ============================================================================
// Policies
// ============================================================================

/// What `create_*` does when the requested type is not registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OnMissing {
    /// Fail with `Error::UnknownType`.
    Fail,
    /// Clone the default type's prototype instead.
    #[default]
    UseDefault,
}

/// What `register_type*` does when the type name is already taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OnDuplicate {
    /// Fail with `Error::DuplicateType`.
    Fail,
    /// Keep the existing registration and return successfully.
    #[default]
    Ignore,
}

// ============================================================================
// Prototype
// ============================================================================

/// Element kinds a registry can hold: `dyn Vertex` and `dyn Edge`.
pub trait Prototype: GraphElement {
    const KIND: ElementKind;

    /// Graph-unassociated clone of this prototype.
    fn spawn(&self) -> Box<Self>;
}

impl Prototype for dyn Vertex {
    const KIND: ElementKind = ElementKind::Vertex;

    fn spawn(&self) -> Box<dyn Vertex> {
        self.clone_vertex()
    }
}

impl Prototype for dyn Edge {
    const KIND: ElementKind = ElementKind::Edge;

    fn spawn(&self) -> Box<dyn Edge> {
        self.clone_edge()
    }
}

// ============================================================================
// TypeRegistry
// ============================================================================

struct Registration<T: ?Sized> {
    prototype: Box<T>,
    attributes: Vec<(Attribute, AttributeCallbacks<T>)>,
}

/// Type name → prototype table for one element kind.
pub struct TypeRegistry<T: ?Sized> {
    types: HashMap<String, Registration<T>>,
    default_type: String,
}

pub type VertexTypeRegistry = TypeRegistry<dyn Vertex>;
pub type EdgeTypeRegistry = TypeRegistry<dyn Edge>;

impl<T: ?Sized + Prototype> TypeRegistry<T> {
    /// Registry holding only `prototype`, which becomes the default type.
    pub fn with_default(prototype: Box<T>) -> Self {
        let name = prototype.class_name().to_string();
        let mut types = HashMap::new();
        types.insert(name.clone(), Registration { prototype, attributes: Vec::new() });
        Self { types, default_type: name }
    }

    /// Register `prototype` under its own class name.
    pub fn register_type(&mut self, prototype: Box<T>, on_duplicate: OnDuplicate) -> Result<()> {
        let name = prototype.class_name().to_string();
        self.register_type_as(&name, prototype, on_duplicate)
    }

    /// Register `prototype` under an explicit key, which may differ from
    /// its class name.
    pub fn register_type_as(
        &mut self,
        type_name: &str,
        prototype: Box<T>,
        on_duplicate: OnDuplicate,
    ) -> Result<()> {
        if self.types.contains_key(type_name) {
            return match on_duplicate {
                OnDuplicate::Fail => Err(Error::DuplicateType(type_name.to_string())),
                OnDuplicate::Ignore => Ok(()),
            };
        }
        debug!(kind = %T::KIND, type_name, class = prototype.class_name(), "registered type");
        self.types.insert(
            type_name.to_string(),
            Registration { prototype, attributes: Vec::new() },
        );
        Ok(())
    }

    pub fn is_registered(&self, type_name: &str) -> bool {
        self.types.contains_key(type_name)
    }

    /// The prototype registered under `type_name`.
    pub fn prototype(&self, type_name: &str) -> Result<&T> {
        self.types
            .get(type_name)
            .map(|r| r.prototype.as_ref())
            .ok_or_else(|| Error::UnknownType(type_name.to_string()))
    }

    /// Select the fallback type. It must already be registered.
    pub fn set_default_type(&mut self, type_name: &str) -> Result<()> {
        if !self.types.contains_key(type_name) {
            return Err(Error::UnknownType(type_name.to_string()));
        }
        self.default_type = type_name.to_string();
        Ok(())
    }

    pub fn default_type(&self) -> &str {
        &self.default_type
    }

    /// All registered keys.
    pub fn supported_types(&self) -> BTreeSet<String> {
        self.types.keys().cloned().collect()
    }

    /// Resolve `type_name` to the key actually used, per `on_missing`.
    fn resolve<'a>(&'a self, type_name: &'a str, on_missing: OnMissing) -> Result<&'a str> {
        if self.types.contains_key(type_name) {
            return Ok(type_name);
        }
        match on_missing {
            OnMissing::Fail => Err(Error::UnknownType(type_name.to_string())),
            OnMissing::UseDefault => {
                warn!(
                    kind = %T::KIND,
                    requested = type_name,
                    fallback = %self.default_type,
                    "unknown type, falling back to default"
                );
                if self.types.contains_key(&self.default_type) {
                    Ok(self.default_type.as_str())
                } else {
                    Err(Error::UnknownType(self.default_type.clone()))
                }
            }
        }
    }

    /// Clone the prototype for `type_name` and label the result.
    ///
    /// The element carries no graph id until it is inserted into a graph.
    pub fn create(
        &self,
        type_name: &str,
        label: &str,
        on_missing: OnMissing,
    ) -> Result<Arc<T>> {
        let key = self.resolve(type_name, on_missing)?;
        let prototype = self.prototype(key)?;

        let mut element = prototype.spawn();
        element.core_mut().set_class_type(key);
        element.set_label(label);
        Ok(Arc::from(element))
    }

    // ========================================================================
    // Attributes
    // ========================================================================

    /// Attach an attribute to a registered type.
    pub fn register_attribute(
        &mut self,
        type_name: &str,
        attribute: impl Into<AttributeId>,
        member_type: &str,
        callbacks: AttributeCallbacks<T>,
    ) -> Result<()> {
        let registration = self
            .types
            .get_mut(type_name)
            .ok_or_else(|| Error::UnknownType(type_name.to_string()))?;

        let id = attribute.into();
        if registration.attributes.iter().any(|(a, _)| a.id == id) {
            return Err(Error::DuplicateAttribute {
                type_name: type_name.to_string(),
                attribute: id.0,
            });
        }
        debug!(kind = %T::KIND, type_name, attribute = %id, "registered attribute");
        registration.attributes.push((
            Attribute {
                id,
                member_type: member_type.to_string(),
                class_type: type_name.to_string(),
            },
            callbacks,
        ));
        Ok(())
    }

    /// Attributes of the given types, or of every type when `type_names`
    /// is empty. Ordered by type name, then registration order.
    /// Unregistered names contribute nothing.
    pub fn known_attributes(&self, type_names: &[&str]) -> Vec<Attribute> {
        let selected: BTreeSet<&str> = if type_names.is_empty() {
            self.types.keys().map(String::as_str).collect()
        } else {
            type_names.iter().copied().collect()
        };

        selected
            .into_iter()
            .filter_map(|name| self.types.get(name))
            .flat_map(|r| r.attributes.iter().map(|(a, _)| a.clone()))
            .collect()
    }

    /// `(attribute, value)` pairs for `element`, in registration order.
    /// Looked up by the element's class type.
    pub fn attribute_values(&self, element: &T) -> Vec<(AttributeId, String)> {
        let Some(registration) = self.types.get(element.class_type()) else {
            return Vec::new();
        };
        registration
            .attributes
            .iter()
            .filter_map(|(attribute, callbacks)| {
                callbacks.serialize(element).map(|value| (attribute.id.clone(), value))
            })
            .collect()
    }

    /// Parse `value` into the attribute of `element`.
    pub fn set_attribute_value(&self, element: &T, attribute: &AttributeId, value: &str) -> Result<()> {
        let registration = self
            .types
            .get(element.class_type())
            .ok_or_else(|| Error::UnknownType(element.class_type().to_string()))?;
        let (_, callbacks) = registration
            .attributes
            .iter()
            .find(|(a, _)| &a.id == attribute)
            .ok_or_else(|| Error::NotFound(format!(
                "Attribute '{attribute}' on type '{}'",
                element.class_type()
            )))?;

        if !callbacks.is_writable() {
            return Err(Error::InvalidAttributeValue {
                attribute: attribute.0.clone(),
                message: "attribute is read-only".into(),
            });
        }
        callbacks.deserialize(element, value)
    }
}

// ============================================================================
// Vertex registry
// ============================================================================

impl TypeRegistry<dyn Vertex> {
    /// Registry with `BasicVertex` registered as the default type.
    pub fn new() -> Self {
        Self::with_default(Box::new(BasicVertex::default()))
    }

    pub fn create_vertex(&self, type_name: &str, label: &str, on_missing: OnMissing) -> Result<VertexRef> {
        self.create(type_name, label, on_missing)
    }
}

impl Default for TypeRegistry<dyn Vertex> {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Edge registry
// ============================================================================

impl TypeRegistry<dyn Edge> {
    /// Registry with `BasicEdge` registered as the default type.
    pub fn new() -> Self {
        Self::with_default(Box::new(BasicEdge::default()))
    }

    /// Edge without endpoints; attach them before inserting into a graph.
    pub fn create_edge(&self, type_name: &str, label: &str, on_missing: OnMissing) -> Result<EdgeRef> {
        self.create(type_name, label, on_missing)
    }

    pub fn create_edge_between(
        &self,
        type_name: &str,
        source: VertexRef,
        target: VertexRef,
        label: &str,
        on_missing: OnMissing,
    ) -> Result<EdgeRef> {
        let edge = self.create(type_name, label, on_missing)?;
        edge.set_source(Some(source));
        edge.set_target(Some(target));
        Ok(edge)
    }
}

impl Default for TypeRegistry<dyn Edge> {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Process-wide defaults
// ============================================================================

static VERTEX_TYPES: LazyLock<RwLock<VertexTypeRegistry>> =
    LazyLock::new(|| RwLock::new(VertexTypeRegistry::new()));

static EDGE_TYPES: LazyLock<RwLock<EdgeTypeRegistry>> =
    LazyLock::new(|| RwLock::new(EdgeTypeRegistry::new()));

/// Process-wide vertex registry. Register during setup; read afterwards.
pub fn vertex_types() -> &'static RwLock<VertexTypeRegistry> {
    &VERTEX_TYPES
}

/// Process-wide edge registry. Register during setup; read afterwards.
pub fn edge_types() -> &'static RwLock<EdgeTypeRegistry> {
    &EDGE_TYPES
}

// ============================================================================
// Tests
// ============================================================================
