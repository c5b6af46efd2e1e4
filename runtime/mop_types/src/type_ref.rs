//! Declared and runtime type references.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::{ClassRef, Primitive};

/// A type as it appears in a parameter list or as an argument's runtime type.
///
/// Class types compare by [`ClassId`](crate::ClassId), never by name, so two
/// same-named classes from different loaders are distinct types.
#[derive(Clone)]
pub enum TypeRef {
    Primitive(Primitive),
    Class(ClassRef),
    Array(Arc<TypeRef>),
}

impl TypeRef {
    pub fn class(class: &ClassRef) -> Self {
        TypeRef::Class(ClassRef::clone(class))
    }

    pub fn array_of(component: TypeRef) -> Self {
        TypeRef::Array(Arc::new(component))
    }

    pub fn as_class(&self) -> Option<&ClassRef> {
        match self {
            TypeRef::Class(class) => Some(class),
            _ => None,
        }
    }

    pub fn as_primitive(&self) -> Option<Primitive> {
        match self {
            TypeRef::Primitive(p) => Some(*p),
            _ => None,
        }
    }

    /// Element type of an array type.
    pub fn component(&self) -> Option<&TypeRef> {
        match self {
            TypeRef::Array(component) => Some(component),
            _ => None,
        }
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self, TypeRef::Primitive(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self, TypeRef::Array(_))
    }
}

impl PartialEq for TypeRef {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (TypeRef::Primitive(a), TypeRef::Primitive(b)) => a == b,
            (TypeRef::Class(a), TypeRef::Class(b)) => a.id() == b.id(),
            (TypeRef::Array(a), TypeRef::Array(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for TypeRef {}

impl Hash for TypeRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            TypeRef::Primitive(p) => {
                0u8.hash(state);
                p.hash(state);
            }
            TypeRef::Class(class) => {
                1u8.hash(state);
                class.id().hash(state);
            }
            TypeRef::Array(component) => {
                2u8.hash(state);
                component.hash(state);
            }
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Primitive(p) => f.write_str(p.name()),
            TypeRef::Class(class) => f.write_str(class.name()),
            TypeRef::Array(component) => write!(f, "{component}[]"),
        }
    }
}

impl fmt::Debug for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
