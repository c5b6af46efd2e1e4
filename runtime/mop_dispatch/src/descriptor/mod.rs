//! Type descriptors: per-class dispatch metadata.
//!
//! A [`TypeDescriptor`] wraps one runtime class with:
//! - its declared members, harvested lazily and at most once per category
//! - a copy-on-write table of dynamically registered methods
//! - a version stamp bumped on every change to that table
//! - memoized method buckets, tagged with the stamp they were built under
//!
//! Descriptors are owned by the [`DescriptorCache`], one slot per class
//! loader, and dropped with the slot when the loader is unloaded.

mod cache;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use arc_swap::ArcSwap;
use dashmap::DashMap;
use parking_lot::Mutex;
use rustc_hash::{FxBuildHasher, FxHashMap, FxHashSet};
use tracing::warn;

use mop_ir::Name;
use mop_types::{ClassId, ClassRef, DeclaredField, MemberCategory};

use crate::registry::{BucketKey, MethodBucket};
use crate::{CandidateMethod, DispatchError, IntrospectionUnavailable};

pub use cache::DescriptorCache;

/// Dynamically registered methods of one type, by name.
pub type DynamicTable = FxHashMap<Name, Arc<[Arc<CandidateMethod>]>>;

struct MemoizedBucket {
    stamp: u64,
    bucket: Arc<MethodBucket>,
}

/// Dispatch metadata for one runtime class.
pub struct TypeDescriptor {
    class: ClassRef,
    init: Name,
    /// Direct supertypes' descriptors, superclass first.
    parents: Vec<Arc<TypeDescriptor>>,
    /// Every distinct ancestor, nearest first.
    lineage: Box<[Arc<TypeDescriptor>]>,
    methods: OnceLock<Box<[Arc<CandidateMethod>]>>,
    constructors: OnceLock<Box<[Arc<CandidateMethod>]>>,
    fields: OnceLock<Box<[DeclaredField]>>,
    unavailable: Mutex<Vec<IntrospectionUnavailable>>,
    dynamic: ArcSwap<DynamicTable>,
    /// Serializes writers of `dynamic`; readers never take it.
    writer: Mutex<()>,
    stamp: AtomicU64,
    buckets: DashMap<BucketKey, MemoizedBucket, FxBuildHasher>,
}

impl TypeDescriptor {
    pub(crate) fn new(class: &ClassRef, parents: Vec<Arc<TypeDescriptor>>, init: Name) -> Self {
        let lineage = Self::linearize(class.id(), &parents);
        Self {
            class: ClassRef::clone(class),
            init,
            parents,
            lineage,
            methods: OnceLock::new(),
            constructors: OnceLock::new(),
            fields: OnceLock::new(),
            unavailable: Mutex::new(Vec::new()),
            dynamic: ArcSwap::from_pointee(DynamicTable::default()),
            writer: Mutex::new(()),
            stamp: AtomicU64::new(0),
            buckets: DashMap::default(),
        }
    }

    /// Breadth-first, deduplicated walk of the supertype graph.
    fn linearize(own: ClassId, parents: &[Arc<TypeDescriptor>]) -> Box<[Arc<TypeDescriptor>]> {
        let mut seen = FxHashSet::default();
        seen.insert(own);
        let mut order: Vec<Arc<TypeDescriptor>> = Vec::new();
        let mut next = 0;
        for parent in parents {
            if seen.insert(parent.id()) {
                order.push(Arc::clone(parent));
            }
        }
        while next < order.len() {
            let grandparents: Vec<Arc<TypeDescriptor>> = order[next].parents.clone();
            for ancestor in grandparents {
                if seen.insert(ancestor.id()) {
                    order.push(ancestor);
                }
            }
            next += 1;
        }
        order.into_boxed_slice()
    }

    pub fn class(&self) -> &ClassRef {
        &self.class
    }

    pub fn id(&self) -> ClassId {
        self.class.id()
    }

    pub fn parents(&self) -> &[Arc<TypeDescriptor>] {
        &self.parents
    }

    /// This descriptor followed by every ancestor, nearest first.
    pub fn ancestors(&self) -> impl Iterator<Item = &TypeDescriptor> + '_ {
        std::iter::once(self).chain(self.lineage.iter().map(|d| &**d))
    }

    // Versioning

    /// Stamp of this type's own dynamic table.
    pub fn own_stamp(&self) -> u64 {
        self.stamp.load(Ordering::Acquire)
    }

    /// Sum of the own stamps of this type and all its ancestors.
    ///
    /// Each own stamp only grows, so the sum changes whenever any of them does.
    pub fn composite_stamp(&self) -> u64 {
        self.lineage
            .iter()
            .fold(self.own_stamp(), |sum, d| sum.wrapping_add(d.own_stamp()))
    }

    // Declared members

    pub fn declared_methods(&self) -> &[Arc<CandidateMethod>] {
        self.methods.get_or_init(|| self.harvest_methods())
    }

    pub fn declared_constructors(&self) -> &[Arc<CandidateMethod>] {
        self.constructors.get_or_init(|| self.harvest_constructors())
    }

    pub fn declared_fields(&self) -> &[DeclaredField] {
        self.fields.get_or_init(|| self.harvest_fields())
    }

    /// A public field declared by this type itself.
    pub fn field(&self, name: Name) -> Option<&DeclaredField> {
        self.declared_fields().iter().find(|f| f.name == name)
    }

    /// Members skipped while harvesting so far.
    pub fn introspection_failures(&self) -> Vec<IntrospectionUnavailable> {
        self.unavailable.lock().clone()
    }

    fn skip(&self, category: MemberCategory, member: String, reason: String) {
        warn!(
            class = self.class.name(),
            %category,
            member = member.as_str(),
            reason = reason.as_str(),
            "skipping member that could not be introspected"
        );
        self.unavailable.lock().push(IntrospectionUnavailable {
            type_name: self.class.name().to_owned(),
            category,
            member,
            reason,
        });
    }

    fn skip_invalid(&self, category: MemberCategory, err: &DispatchError) {
        let (member, reason) = match err {
            DispatchError::InvalidCandidate { name, reason } => (name.clone(), reason.clone()),
            other => (String::new(), other.to_string()),
        };
        self.skip(category, member, reason);
    }

    fn harvest_methods(&self) -> Box<[Arc<CandidateMethod>]> {
        let mut out = Vec::new();
        for entry in self.class.members().declared_methods() {
            match entry {
                Ok(method) => match CandidateMethod::declared(&self.class, method) {
                    Ok(candidate) => out.push(Arc::new(candidate)),
                    Err(err) => self.skip_invalid(MemberCategory::Methods, &err),
                },
                Err(err) => self.skip(err.category, err.member, err.reason),
            }
        }
        out.into_boxed_slice()
    }

    fn harvest_constructors(&self) -> Box<[Arc<CandidateMethod>]> {
        let mut out = Vec::new();
        for entry in self.class.members().declared_constructors() {
            match entry {
                Ok(ctor) => {
                    match CandidateMethod::declared_constructor(&self.class, self.init, ctor) {
                        Ok(candidate) => out.push(Arc::new(candidate)),
                        Err(err) => self.skip_invalid(MemberCategory::Constructors, &err),
                    }
                }
                Err(err) => self.skip(err.category, err.member, err.reason),
            }
        }
        out.into_boxed_slice()
    }

    fn harvest_fields(&self) -> Box<[DeclaredField]> {
        let mut out = Vec::new();
        for entry in self.class.members().declared_fields() {
            match entry {
                Ok(field) => out.push(field),
                Err(err) => self.skip(err.category, err.member, err.reason),
            }
        }
        out.into_boxed_slice()
    }

    // Dynamic table

    /// Snapshot of the dynamic table. Never observed half-updated.
    pub fn dynamic_table(&self) -> Arc<DynamicTable> {
        self.dynamic.load_full()
    }

    /// Dynamically registered methods named `name`.
    pub fn dynamic_methods(&self, name: Name) -> Option<Arc<[Arc<CandidateMethod>]>> {
        self.dynamic.load().get(&name).cloned()
    }

    /// Insert `candidate`, replacing an entry with the same name, kind and
    /// signature. Returns whether an entry was replaced.
    pub(crate) fn register(&self, candidate: Arc<CandidateMethod>) -> bool {
        let _writer = self.writer.lock();
        let mut table = DynamicTable::clone(&self.dynamic.load());
        let mut bucket: Vec<Arc<CandidateMethod>> = table
            .get(&candidate.name())
            .map(|b| b.to_vec())
            .unwrap_or_default();
        let replaced = match bucket.iter_mut().find(|c| c.same_method(&candidate)) {
            Some(slot) => {
                *slot = Arc::clone(&candidate);
                true
            }
            None => {
                bucket.push(Arc::clone(&candidate));
                false
            }
        };
        table.insert(candidate.name(), bucket.into());
        self.publish(table);
        replaced
    }

    /// Remove every dynamic method named `name` with `arity` declared
    /// parameters. Returns how many were removed.
    pub(crate) fn unregister(&self, name: Name, arity: usize) -> usize {
        let _writer = self.writer.lock();
        let current = self.dynamic.load_full();
        let Some(bucket) = current.get(&name) else {
            return 0;
        };
        let kept: Vec<Arc<CandidateMethod>> = bucket
            .iter()
            .filter(|c| c.arity() != arity)
            .cloned()
            .collect();
        let removed = bucket.len() - kept.len();
        if removed == 0 {
            return 0;
        }
        let mut table = DynamicTable::clone(&current);
        if kept.is_empty() {
            table.remove(&name);
        } else {
            table.insert(name, kept.into());
        }
        self.publish(table);
        removed
    }

    /// Swap in the new table, then bump the stamp. A reader that sees the
    /// new stamp also sees the new table.
    fn publish(&self, table: DynamicTable) {
        self.dynamic.store(Arc::new(table));
        self.stamp.fetch_add(1, Ordering::AcqRel);
    }

    // Bucket memo

    pub(crate) fn memoized(&self, key: BucketKey, stamp: u64) -> Option<Arc<MethodBucket>> {
        self.buckets
            .get(&key)
            .filter(|memo| memo.stamp == stamp)
            .map(|memo| Arc::clone(&memo.bucket))
    }

    pub(crate) fn memoize(&self, key: BucketKey, stamp: u64, bucket: Arc<MethodBucket>) {
        self.buckets.insert(key, MemoizedBucket { stamp, bucket });
    }
}

impl std::fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("class", &self.class.name())
            .field("stamp", &self.own_stamp())
            .finish_non_exhaustive()
    }
}
