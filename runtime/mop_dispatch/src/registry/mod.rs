//! The Method Registry: dynamic registration and merged bucket lookup.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use mop_ir::{Name, SharedInterner, StringLookup};
use mop_types::ClassRef;

use crate::candidate::{DynamicMethod, MethodKind};
use crate::descriptor::{DescriptorCache, TypeDescriptor};
use crate::{CandidateMethod, DispatchResult};

/// Which candidates a lookup collects.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum LookupScope {
    /// Instance methods of the type and its ancestors.
    Instance,
    /// Static methods of the type and its ancestors.
    Static,
    /// The type's own constructors. Constructors are not inherited.
    Constructor,
}

impl LookupScope {
    fn kind(self) -> MethodKind {
        match self {
            LookupScope::Instance => MethodKind::Instance,
            LookupScope::Static => MethodKind::Static,
            LookupScope::Constructor => MethodKind::Constructor,
        }
    }
}

/// Key of a memoized bucket.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct BucketKey {
    pub name: Name,
    pub scope: LookupScope,
}

impl BucketKey {
    #[inline]
    pub const fn new(name: Name, scope: LookupScope) -> Self {
        Self { name, scope }
    }

    /// Format the key for display (requires interner).
    pub fn display<'a>(&self, interner: &'a SharedInterner) -> BucketKeyDisplay<'a> {
        BucketKeyDisplay {
            name: interner.lookup(self.name),
            scope: self.scope,
        }
    }
}

/// Helper for displaying a `BucketKey` with its resolved name.
pub struct BucketKeyDisplay<'a> {
    name: &'a str,
    scope: LookupScope,
}

impl fmt::Display for BucketKeyDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:?})", self.name, self.scope)
    }
}

/// Every candidate sharing a name, most-specific declaring type first.
#[derive(Debug, Default)]
pub struct MethodBucket {
    candidates: Vec<Arc<CandidateMethod>>,
}

impl MethodBucket {
    pub fn candidates(&self) -> &[Arc<CandidateMethod>] {
        &self.candidates
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Candidates declaring exactly `arity` parameters.
    pub fn with_arity(&self, arity: usize) -> impl Iterator<Item = &Arc<CandidateMethod>> + '_ {
        self.candidates.iter().filter(move |c| c.arity() == arity)
    }

    /// Vararg candidates whose fixed prefix fits `arg_count` arguments.
    pub fn vararg_eligible(
        &self,
        arg_count: usize,
    ) -> impl Iterator<Item = &Arc<CandidateMethod>> + '_ {
        self.candidates
            .iter()
            .filter(move |c| c.is_varargs() && c.fixed_arity() <= arg_count)
    }

    /// Append unless a nearer entry already has the same signature.
    fn push_unshadowed(&mut self, candidate: &Arc<CandidateMethod>) {
        if !self.candidates.iter().any(|c| c.same_method(candidate)) {
            self.candidates.push(Arc::clone(candidate));
        }
    }
}

/// Per-type method tables over the descriptor cache.
pub struct MethodRegistry {
    descriptors: DescriptorCache,
    init: Name,
    memoize: bool,
}

impl MethodRegistry {
    pub fn new(descriptors: DescriptorCache, init: Name, memoize: bool) -> Self {
        Self {
            descriptors,
            init,
            memoize,
        }
    }

    pub fn descriptors(&self) -> &DescriptorCache {
        &self.descriptors
    }

    pub fn descriptor(&self, class: &ClassRef) -> DispatchResult<Arc<TypeDescriptor>> {
        self.descriptors.get(class)
    }

    /// Add `method` to `class`, replacing a dynamic method with the same
    /// name, kind and signature. Bumps the type's version stamp.
    ///
    /// Returns whether an existing entry was replaced.
    pub fn register(&self, class: &ClassRef, mut method: DynamicMethod) -> DispatchResult<bool> {
        if method.kind == MethodKind::Constructor {
            method.name = self.init;
        }
        let descriptor = self.descriptors.get(class)?;
        let candidate = Arc::new(CandidateMethod::dynamic(class, method)?);
        let replaced = descriptor.register(candidate);
        debug!(
            class = class.name(),
            replaced,
            stamp = descriptor.own_stamp(),
            "dynamic method registered"
        );
        Ok(replaced)
    }

    /// Remove the dynamic methods of `class` named `name` with `arity`
    /// declared parameters. Declared methods are never removed.
    pub fn unregister(&self, class: &ClassRef, name: Name, arity: usize) -> DispatchResult<usize> {
        let descriptor = self.descriptors.get(class)?;
        let removed = descriptor.unregister(name, arity);
        if removed > 0 {
            debug!(
                class = class.name(),
                removed,
                stamp = descriptor.own_stamp(),
                "dynamic methods unregistered"
            );
        }
        Ok(removed)
    }

    /// The merged bucket for `key` on `descriptor`.
    pub fn lookup(&self, descriptor: &TypeDescriptor, key: BucketKey) -> Arc<MethodBucket> {
        if !self.memoize {
            return Arc::new(Self::merge(descriptor, key));
        }
        let stamp = descriptor.composite_stamp();
        if let Some(bucket) = descriptor.memoized(key, stamp) {
            return bucket;
        }
        let bucket = Arc::new(Self::merge(descriptor, key));
        descriptor.memoize(key, stamp, Arc::clone(&bucket));
        bucket
    }

    /// Walk the type and its ancestors nearest first. Within one type,
    /// dynamic methods come first and shadow declared ones of the same
    /// signature; nearer types shadow farther ones.
    fn merge(descriptor: &TypeDescriptor, key: BucketKey) -> MethodBucket {
        let kind = key.scope.kind();
        let mut bucket = MethodBucket::default();
        let mut collect = |d: &TypeDescriptor, declared: &[Arc<CandidateMethod>]| {
            if let Some(dynamic) = d.dynamic_methods(key.name) {
                for candidate in dynamic.iter().filter(|c| c.kind() == kind) {
                    bucket.push_unshadowed(candidate);
                }
            }
            for candidate in declared
                .iter()
                .filter(|c| c.name() == key.name && c.kind() == kind)
            {
                bucket.push_unshadowed(candidate);
            }
        };

        if key.scope == LookupScope::Constructor {
            collect(descriptor, descriptor.declared_constructors());
        } else {
            for d in descriptor.ancestors() {
                collect(d, d.declared_methods());
            }
        }
        bucket
    }
}
