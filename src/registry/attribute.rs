//! Attribute reflection for registered element types.
//!
//! Concrete element kinds expose typed fields to generic serializers
//! through string-valued callbacks, so a format writer never needs to know
//! the concrete type it is writing.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::model::GraphElement;
use crate::{Error, Result};

/// Name of an attribute within its element type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AttributeId(pub String);

impl AttributeId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AttributeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AttributeId {
    fn from(s: &str) -> Self {
        AttributeId(s.to_string())
    }
}

impl From<String> for AttributeId {
    fn from(s: String) -> Self {
        AttributeId(s)
    }
}

/// Description of a known attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub id: AttributeId,
    /// Name of the value's type, e.g. `"u32"`. Informational only.
    pub member_type: String,
    /// Registry key of the element type owning the attribute.
    pub class_type: String,
}

type SerializeFn<T> = Arc<dyn Fn(&T) -> Option<String> + Send + Sync>;
type DeserializeFn<T> = Arc<dyn Fn(&T, &str) -> Result<()> + Send + Sync>;

/// String conversion of one attribute.
///
/// `serialize` returns `None` when the element does not carry the
/// attribute (e.g. a typed callback handed an element of another type).
pub struct AttributeCallbacks<T: ?Sized> {
    serialize: SerializeFn<T>,
    deserialize: Option<DeserializeFn<T>>,
}

impl<T: ?Sized> Clone for AttributeCallbacks<T> {
    fn clone(&self) -> Self {
        Self {
            serialize: Arc::clone(&self.serialize),
            deserialize: self.deserialize.clone(),
        }
    }
}

impl<T: ?Sized> fmt::Debug for AttributeCallbacks<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttributeCallbacks")
            .field("writable", &self.deserialize.is_some())
            .finish()
    }
}

impl<T: ?Sized + GraphElement> AttributeCallbacks<T> {
    pub fn new<F>(serialize: F) -> Self
    where
        F: Fn(&T) -> Option<String> + Send + Sync + 'static,
    {
        Self { serialize: Arc::new(serialize), deserialize: None }
    }

    /// Read side bound to a concrete element type `E`.
    pub fn typed<E, F>(serialize: F) -> Self
    where
        E: 'static,
        F: Fn(&E) -> String + Send + Sync + 'static,
    {
        Self::new(move |element: &T| element.as_any().downcast_ref::<E>().map(&serialize))
    }

    pub fn with_deserialize<F>(mut self, deserialize: F) -> Self
    where
        F: Fn(&T, &str) -> Result<()> + Send + Sync + 'static,
    {
        self.deserialize = Some(Arc::new(deserialize));
        self
    }

    /// Write side bound to a concrete element type `E`.
    pub fn with_typed_deserialize<E, F>(self, deserialize: F) -> Self
    where
        E: 'static,
        F: Fn(&E, &str) -> Result<()> + Send + Sync + 'static,
    {
        self.with_deserialize(move |element: &T, value: &str| {
            match element.as_any().downcast_ref::<E>() {
                Some(concrete) => deserialize(concrete, value),
                None => Err(Error::InvalidElement(format!(
                    "{} does not carry this attribute",
                    element.class_name()
                ))),
            }
        })
    }

    pub fn serialize(&self, element: &T) -> Option<String> {
        (self.serialize)(element)
    }

    pub fn is_writable(&self) -> bool {
        self.deserialize.is_some()
    }

    pub fn deserialize(&self, element: &T, value: &str) -> Result<()> {
        match &self.deserialize {
            Some(deserialize) => deserialize(element, value),
            None => Err(Error::InvalidAttributeValue {
                attribute: String::new(),
                message: "attribute is read-only".into(),
            }),
        }
    }
}
