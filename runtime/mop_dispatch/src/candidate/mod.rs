//! Resolvable callables.

use std::fmt;

use mop_ir::{Name, StringLookup};
use mop_types::{ClassRef, DeclaredConstructor, DeclaredMethod, Invoker, TypeRef};

use crate::{DispatchError, DispatchResult};

/// What a candidate is invoked as.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum MethodKind {
    Instance,
    Static,
    Constructor,
}

/// Where a candidate came from.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Origin {
    /// Harvested from the class's declared members.
    Declared,
    /// Registered at run time.
    Dynamic,
}

/// Declared parameter list.
///
/// Two candidates with equal signatures (and the same name and kind) are the
/// same method for registration and shadowing purposes.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Signature {
    pub params: Vec<TypeRef>,
    /// The last parameter is an array that also accepts spread arguments.
    pub varargs: bool,
}

impl Signature {
    pub fn new(params: Vec<TypeRef>) -> Self {
        Self {
            params,
            varargs: false,
        }
    }

    pub fn varargs(params: Vec<TypeRef>) -> Self {
        Self {
            params,
            varargs: true,
        }
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let last = self.params.len().saturating_sub(1);
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            match (self.varargs && i == last, param.component()) {
                (true, Some(element)) => write!(f, "{element}...")?,
                _ => write!(f, "{param}")?,
            }
        }
        Ok(())
    }
}

/// A method added to a type at run time, before it is bound to that type.
#[derive(Clone, Debug)]
pub struct DynamicMethod {
    pub name: Name,
    pub signature: Signature,
    pub kind: MethodKind,
    pub invoker: Invoker,
}

impl DynamicMethod {
    pub fn instance(name: Name, params: Vec<TypeRef>, invoker: Invoker) -> Self {
        Self {
            name,
            signature: Signature::new(params),
            kind: MethodKind::Instance,
            invoker,
        }
    }

    pub fn static_method(name: Name, params: Vec<TypeRef>, invoker: Invoker) -> Self {
        Self {
            name,
            signature: Signature::new(params),
            kind: MethodKind::Static,
            invoker,
        }
    }

    /// A constructor; `init` must be the interned `<init>` name.
    pub fn constructor(init: Name, params: Vec<TypeRef>, invoker: Invoker) -> Self {
        Self {
            name: init,
            signature: Signature::new(params),
            kind: MethodKind::Constructor,
            invoker,
        }
    }

    #[must_use]
    pub fn with_varargs(mut self) -> Self {
        self.signature.varargs = true;
        self
    }
}

/// One resolvable callable, bound to its declaring type. Immutable once built.
pub struct CandidateMethod {
    name: Name,
    signature: Signature,
    kind: MethodKind,
    origin: Origin,
    declaring: ClassRef,
    invoker: Invoker,
}

impl CandidateMethod {
    fn build(
        name: Name,
        signature: Signature,
        kind: MethodKind,
        origin: Origin,
        declaring: &ClassRef,
        invoker: Invoker,
    ) -> DispatchResult<Self> {
        if signature.varargs && !signature.params.last().is_some_and(TypeRef::is_array) {
            return Err(DispatchError::InvalidCandidate {
                name: declaring.name().to_owned(),
                reason: format!("varargs signature ({signature}) must end with an array parameter"),
            });
        }
        Ok(Self {
            name,
            signature,
            kind,
            origin,
            declaring: ClassRef::clone(declaring),
            invoker,
        })
    }

    pub(crate) fn declared(declaring: &ClassRef, method: DeclaredMethod) -> DispatchResult<Self> {
        let kind = if method.is_static() {
            MethodKind::Static
        } else {
            MethodKind::Instance
        };
        let signature = Signature {
            params: method.params,
            varargs: method.varargs,
        };
        Self::build(
            method.name,
            signature,
            kind,
            Origin::Declared,
            declaring,
            method.invoker,
        )
    }

    pub(crate) fn declared_constructor(
        declaring: &ClassRef,
        init: Name,
        constructor: DeclaredConstructor,
    ) -> DispatchResult<Self> {
        let signature = Signature {
            params: constructor.params,
            varargs: constructor.varargs,
        };
        Self::build(
            init,
            signature,
            MethodKind::Constructor,
            Origin::Declared,
            declaring,
            constructor.invoker,
        )
    }

    pub(crate) fn dynamic(declaring: &ClassRef, method: DynamicMethod) -> DispatchResult<Self> {
        Self::build(
            method.name,
            method.signature,
            method.kind,
            Origin::Dynamic,
            declaring,
            method.invoker,
        )
    }

    pub fn name(&self) -> Name {
        self.name
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn params(&self) -> &[TypeRef] {
        &self.signature.params
    }

    /// Declared parameter count, the vararg array included.
    pub fn arity(&self) -> usize {
        self.signature.params.len()
    }

    pub fn is_varargs(&self) -> bool {
        self.signature.varargs
    }

    /// Parameters before the vararg array.
    pub fn fixed_arity(&self) -> usize {
        if self.signature.varargs {
            self.arity().saturating_sub(1)
        } else {
            self.arity()
        }
    }

    /// Element type of the trailing vararg array.
    pub fn vararg_element(&self) -> Option<&TypeRef> {
        if self.signature.varargs {
            self.signature.params.last().and_then(TypeRef::component)
        } else {
            None
        }
    }

    pub fn kind(&self) -> MethodKind {
        self.kind
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    pub fn declaring(&self) -> &ClassRef {
        &self.declaring
    }

    pub fn invoker(&self) -> &Invoker {
        &self.invoker
    }

    pub fn is_abstract(&self) -> bool {
        self.invoker.is_abstract()
    }

    /// Same name, kind and signature: one shadows the other.
    pub fn same_method(&self, other: &CandidateMethod) -> bool {
        self.name == other.name && self.kind == other.kind && self.signature == other.signature
    }

    /// `Declaring.name(params)` for diagnostics.
    pub fn describe(&self, interner: &impl StringLookup) -> String {
        format!(
            "{}.{}({})",
            self.declaring.name(),
            interner.lookup(self.name),
            self.signature
        )
    }
}

impl fmt::Debug for CandidateMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CandidateMethod")
            .field("declaring", &self.declaring.name())
            .field("name", &self.name)
            .field("signature", &self.signature)
            .field("kind", &self.kind)
            .field("origin", &self.origin)
            .finish_non_exhaustive()
    }
}
