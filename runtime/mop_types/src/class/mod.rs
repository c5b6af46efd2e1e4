//! Runtime classes and their builder.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use mop_ir::Name;

use crate::loader::{ClassLoader, LoaderId, WeakClassLoader};
use crate::members::StaticMembers;
use crate::{
    ClassFlags, DeclaredConstructor, DeclaredField, DeclaredMethod, Introspect,
    IntrospectionError, MemberCategory, Primitive, TypeRef,
};

/// Process-unique class identity. Never reused, even after the defining
/// loader is unloaded, so a stale id can only ever fail a comparison.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(u64);

static NEXT_CLASS_ID: AtomicU64 = AtomicU64::new(1);

impl ClassId {
    fn next() -> Self {
        ClassId(NEXT_CLASS_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// Shared handle to a class.
pub type ClassRef = Arc<Class>;

/// A runtime type: identity, hierarchy, modifiers and a member source.
pub struct Class {
    id: ClassId,
    name: Arc<str>,
    loader: WeakClassLoader,
    superclass: Option<ClassRef>,
    interfaces: Vec<ClassRef>,
    flags: ClassFlags,
    boxes: Option<Primitive>,
    sam_method: Option<Name>,
    field_slots: usize,
    members: Box<dyn Introspect>,
}

impl Class {
    pub fn id(&self) -> ClassId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn loader_id(&self) -> LoaderId {
        self.loader.id()
    }

    /// The defining loader, if it has not been unloaded.
    pub fn loader(&self) -> Option<ClassLoader> {
        self.loader.upgrade()
    }

    pub fn is_loaded(&self) -> bool {
        self.loader.is_alive()
    }

    pub fn superclass(&self) -> Option<&ClassRef> {
        self.superclass.as_ref()
    }

    pub fn interfaces(&self) -> &[ClassRef] {
        &self.interfaces
    }

    pub fn flags(&self) -> ClassFlags {
        self.flags
    }

    pub fn is_interface(&self) -> bool {
        self.flags.contains(ClassFlags::INTERFACE)
    }

    /// The primitive this class is the wrapper of (`Integer` -> `int`).
    pub fn boxes(&self) -> Option<Primitive> {
        self.boxes
    }

    /// Name of the single abstract method, for functional interfaces.
    pub fn sam_method(&self) -> Option<Name> {
        self.sam_method
    }

    pub fn is_functional(&self) -> bool {
        self.flags.contains(ClassFlags::FUNCTIONAL)
    }

    /// Instance field slots, inherited ones included.
    pub fn field_slots(&self) -> usize {
        self.field_slots
    }

    /// The host's introspection capability for this class's own members.
    pub fn members(&self) -> &dyn Introspect {
        self.members.as_ref()
    }

    /// Direct supertypes: the superclass first, then interfaces in declaration order.
    pub fn supertypes(&self) -> impl Iterator<Item = &ClassRef> {
        self.superclass.iter().chain(self.interfaces.iter())
    }

    /// Length of the shortest superclass/interface path from `self` to `target`.
    ///
    /// `Some(0)` for the class itself, `None` when `target` is not a supertype.
    pub fn distance_to(&self, target: ClassId) -> Option<u32> {
        if self.id == target {
            return Some(0);
        }
        self.supertypes()
            .filter_map(|parent| parent.distance_to(target))
            .min()
            .map(|d| d.saturating_add(1))
    }

    pub fn is_subtype_of(&self, target: ClassId) -> bool {
        self.distance_to(target).is_some()
    }

    /// Number of superclass links up to the root.
    pub fn depth(&self) -> u32 {
        self.superclass
            .as_ref()
            .map_or(0, |parent| parent.depth().saturating_add(1))
    }
}

/// Classes compare by identity: two same-named classes from different
/// loaders are different classes.
impl PartialEq for Class {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Class {}

impl Hash for Class {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Class({}#{})", self.name, self.id.raw())
    }
}

/// Builder for classes defined through [`ClassLoader::define`].
pub struct ClassBuilder {
    name: Arc<str>,
    superclass: Option<ClassRef>,
    interfaces: Vec<ClassRef>,
    flags: ClassFlags,
    boxes: Option<Primitive>,
    sam_method: Option<Name>,
    members: StaticMembers,
    fields: Vec<(Name, TypeRef)>,
    introspector: Option<Box<dyn Introspect>>,
}

impl ClassBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: Arc::from(name),
            superclass: None,
            interfaces: Vec::new(),
            flags: ClassFlags::empty(),
            boxes: None,
            sam_method: None,
            members: StaticMembers::default(),
            fields: Vec::new(),
            introspector: None,
        }
    }

    #[must_use]
    pub fn extends(mut self, parent: &ClassRef) -> Self {
        self.superclass = Some(ClassRef::clone(parent));
        self
    }

    #[must_use]
    pub fn implements(mut self, interface: &ClassRef) -> Self {
        self.interfaces.push(ClassRef::clone(interface));
        self
    }

    #[must_use]
    pub fn interface(mut self) -> Self {
        self.flags |= ClassFlags::INTERFACE | ClassFlags::ABSTRACT;
        self
    }

    #[must_use]
    pub fn flags(mut self, flags: ClassFlags) -> Self {
        self.flags |= flags;
        self
    }

    #[must_use]
    pub fn boxes(mut self, primitive: Primitive) -> Self {
        self.boxes = Some(primitive);
        self
    }

    /// Mark as a functional interface whose single abstract method is `sam`.
    ///
    /// Only needed with a custom introspector; otherwise detected from the
    /// declared abstract methods.
    #[must_use]
    pub fn functional(mut self, sam: Name) -> Self {
        self.sam_method = Some(sam);
        self
    }

    #[must_use]
    pub fn method(mut self, method: DeclaredMethod) -> Self {
        self.members.methods.push(Ok(method));
        self
    }

    #[must_use]
    pub fn constructor(mut self, constructor: DeclaredConstructor) -> Self {
        self.members.constructors.push(Ok(constructor));
        self
    }

    /// Declare a public instance field; its slot follows the inherited ones.
    #[must_use]
    pub fn field(mut self, name: Name, ty: TypeRef) -> Self {
        self.fields.push((name, ty));
        self
    }

    /// Declare a member that introspection will refuse to expose.
    #[must_use]
    pub fn inaccessible(mut self, category: MemberCategory, member: &str, reason: &str) -> Self {
        let err = IntrospectionError {
            category,
            member: member.to_owned(),
            reason: reason.to_owned(),
        };
        match category {
            MemberCategory::Methods => self.members.methods.push(Err(err)),
            MemberCategory::Constructors => self.members.constructors.push(Err(err)),
            MemberCategory::Fields => self.members.fields.push(Err(err)),
        }
        self
    }

    /// Replace the builder's member tables with a host-provided introspector.
    #[must_use]
    pub fn introspector(mut self, introspector: Box<dyn Introspect>) -> Self {
        self.introspector = Some(introspector);
        self
    }

    fn detect_sam(&self) -> Option<Name> {
        if !self.flags.contains(ClassFlags::INTERFACE) {
            return None;
        }
        let mut own: Vec<Name> = self
            .members
            .methods
            .iter()
            .filter_map(|m| m.as_ref().ok())
            .filter(|m| m.is_abstract() && !m.is_static())
            .map(|m| m.name)
            .collect();
        own.sort_unstable();
        own.dedup();
        match own.as_slice() {
            [single] => Some(*single),
            [] => {
                let inherited: Vec<Name> =
                    self.interfaces.iter().filter_map(|i| i.sam_method()).collect();
                match inherited.as_slice() {
                    [single] => Some(*single),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    pub(crate) fn build(mut self, loader: &ClassLoader) -> Class {
        let sam_method = self.sam_method.or_else(|| self.detect_sam());
        if sam_method.is_some() {
            self.flags |= ClassFlags::FUNCTIONAL;
        }

        let inherited_slots = self.superclass.as_ref().map_or(0, |p| p.field_slots());
        let field_slots = inherited_slots.saturating_add(self.fields.len());
        for (offset, (name, ty)) in self.fields.into_iter().enumerate() {
            self.members.fields.push(Ok(DeclaredField {
                name,
                ty,
                slot: inherited_slots.saturating_add(offset),
            }));
        }

        let members: Box<dyn Introspect> = match self.introspector {
            Some(custom) => custom,
            None => Box::new(self.members),
        };

        Class {
            id: ClassId::next(),
            name: self.name,
            loader: loader.downgrade(),
            superclass: self.superclass,
            interfaces: self.interfaces,
            flags: self.flags,
            boxes: self.boxes,
            sam_method,
            field_slots,
            members,
        }
    }

    pub(crate) fn name(&self) -> &Arc<str> {
        &self.name
    }
}
