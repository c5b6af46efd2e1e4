//! Declared members and the host's reflective introspection capability.
//!
//! The dispatch engine never enumerates members itself: it asks a class's
//! [`Introspect`] implementation, once per member category, and skips any
//! entry that comes back as an [`IntrospectionError`].

use std::fmt;
use std::sync::Arc;

use mop_ir::Name;

use crate::{MemberFlags, TypeRef, Value};

/// Error raised by code running behind a method thunk.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct InvokeError {
    message: String,
}

impl InvokeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Result of running a method thunk.
pub type InvokeResult = Result<Value, InvokeError>;

/// Native method body: `(receiver, already-coerced arguments) -> result`.
///
/// Static methods and constructors receive `Value::Class` as the receiver.
pub type NativeFn = Arc<dyn Fn(&Value, &[Value]) -> InvokeResult + Send + Sync>;

/// How a declared member is actually called.
#[derive(Clone)]
pub enum Invoker {
    Native(NativeFn),
    /// No body; only callable on a closure adapted to the declaring interface.
    Abstract,
}

impl Invoker {
    pub fn native<F>(f: F) -> Self
    where
        F: Fn(&Value, &[Value]) -> InvokeResult + Send + Sync + 'static,
    {
        Invoker::Native(Arc::new(f))
    }

    pub fn is_abstract(&self) -> bool {
        matches!(self, Invoker::Abstract)
    }
}

impl fmt::Debug for Invoker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Invoker::Native(_) => f.write_str("Invoker::Native"),
            Invoker::Abstract => f.write_str("Invoker::Abstract"),
        }
    }
}

/// A method as reported by introspection.
#[derive(Clone, Debug)]
pub struct DeclaredMethod {
    pub name: Name,
    pub params: Vec<TypeRef>,
    /// The last parameter is an array that also accepts spread arguments.
    pub varargs: bool,
    pub flags: MemberFlags,
    pub invoker: Invoker,
}

impl DeclaredMethod {
    /// A public instance method.
    pub fn new(name: Name, params: Vec<TypeRef>, invoker: Invoker) -> Self {
        Self {
            name,
            params,
            varargs: false,
            flags: MemberFlags::PUBLIC,
            invoker,
        }
    }

    /// A public abstract instance method.
    pub fn abstract_method(name: Name, params: Vec<TypeRef>) -> Self {
        Self {
            name,
            params,
            varargs: false,
            flags: MemberFlags::PUBLIC | MemberFlags::ABSTRACT,
            invoker: Invoker::Abstract,
        }
    }

    #[must_use]
    pub fn with_varargs(mut self) -> Self {
        self.varargs = true;
        self
    }

    #[must_use]
    pub fn with_static(mut self) -> Self {
        self.flags |= MemberFlags::STATIC;
        self
    }

    pub fn is_static(&self) -> bool {
        self.flags.contains(MemberFlags::STATIC)
    }

    pub fn is_abstract(&self) -> bool {
        self.flags.contains(MemberFlags::ABSTRACT)
    }
}

/// A constructor as reported by introspection.
#[derive(Clone, Debug)]
pub struct DeclaredConstructor {
    pub params: Vec<TypeRef>,
    pub varargs: bool,
    pub invoker: Invoker,
}

impl DeclaredConstructor {
    pub fn new(params: Vec<TypeRef>, invoker: Invoker) -> Self {
        Self {
            params,
            varargs: false,
            invoker,
        }
    }

    #[must_use]
    pub fn with_varargs(mut self) -> Self {
        self.varargs = true;
        self
    }
}

/// A public instance field and the storage slot backing it.
#[derive(Clone, Debug)]
pub struct DeclaredField {
    pub name: Name,
    pub ty: TypeRef,
    pub slot: usize,
}

/// Which member table an introspection request targets.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum MemberCategory {
    Methods,
    Constructors,
    Fields,
}

impl fmt::Display for MemberCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MemberCategory::Methods => "method",
            MemberCategory::Constructors => "constructor",
            MemberCategory::Fields => "field",
        })
    }
}

/// A member the host could not expose (access restrictions, broken signature).
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{category} {member}: {reason}")]
pub struct IntrospectionError {
    pub category: MemberCategory,
    pub member: String,
    pub reason: String,
}

/// Per-member harvest result.
pub type Harvest<T> = Vec<Result<T, IntrospectionError>>;

/// Reflective introspection of a class's own declared members.
///
/// Implementations must be deterministic: the engine calls each method at most
/// once per class and caches the outcome for the class's lifetime.
pub trait Introspect: Send + Sync {
    fn declared_methods(&self) -> Harvest<DeclaredMethod>;
    fn declared_constructors(&self) -> Harvest<DeclaredConstructor>;
    fn declared_fields(&self) -> Harvest<DeclaredField>;
}

/// Member tables fixed at class definition time.
#[derive(Default)]
pub struct StaticMembers {
    pub(crate) methods: Harvest<DeclaredMethod>,
    pub(crate) constructors: Harvest<DeclaredConstructor>,
    pub(crate) fields: Harvest<DeclaredField>,
}

impl Introspect for StaticMembers {
    fn declared_methods(&self) -> Harvest<DeclaredMethod> {
        self.methods.clone()
    }

    fn declared_constructors(&self) -> Harvest<DeclaredConstructor> {
        self.constructors.clone()
    }

    fn declared_fields(&self) -> Harvest<DeclaredField> {
        self.fields.clone()
    }
}
