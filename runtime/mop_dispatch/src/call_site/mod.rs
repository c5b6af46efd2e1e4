//! The Call-Site Cache.
//!
//! Every call site remembers the last successful resolution as a
//! [`CacheEntry`]: a [`Guard`] describing what the resolution depended on,
//! and the target it produced. Entries are published with a single atomic
//! pointer swap, so concurrent invocations either see the old entry, the new
//! one, or none; two threads racing to fill an empty site both resolve and
//! the last store wins, which is safe because both computed the same answer
//! for the same guard.
//!
//! Entries hold only weak references to descriptors and candidates. A site
//! whose receiver type has been unloaded fails its guard and re-resolves,
//! which reports the unload.

use std::fmt;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use arc_swap::ArcSwapOption;
use dashmap::DashMap;
use rustc_hash::FxBuildHasher;
use smallvec::SmallVec;

use mop_ir::Name;
use mop_types::{ClassId, ClassRef, TypeRef, Value, WellKnown};

use crate::coercion::{ArgShape, CoercionPlan};
use crate::descriptor::TypeDescriptor;
use crate::registry::LookupScope;
use crate::{CandidateMethod, DispatchError, DispatchResult};

/// Stable identity of one lexical call expression.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallSiteId(u32);

impl CallSiteId {
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for CallSiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What a cached resolution was computed for.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum SiteKind {
    Method(LookupScope),
    Property,
}

/// Everything a cached resolution depends on.
pub(crate) struct Guard {
    receiver: ClassId,
    descriptor: Weak<TypeDescriptor>,
    /// Composite stamp read before the lookup that produced the entry.
    stamp: u64,
    name: Name,
    kind: SiteKind,
    shapes: SmallVec<[ArgShape; 4]>,
}

impl Guard {
    pub(crate) fn new(
        descriptor: &Arc<TypeDescriptor>,
        stamp: u64,
        name: Name,
        kind: SiteKind,
        shapes: SmallVec<[ArgShape; 4]>,
    ) -> Self {
        Self {
            receiver: descriptor.id(),
            descriptor: Arc::downgrade(descriptor),
            stamp,
            name,
            kind,
            shapes,
        }
    }

    /// Cheap identity checks first; the stamp read comes last.
    fn admits(
        &self,
        wk: &WellKnown,
        receiver: &ClassRef,
        name: Name,
        kind: SiteKind,
        args: &[Value],
    ) -> bool {
        self.receiver == receiver.id()
            && self.name == name
            && self.kind == kind
            && self.shapes.len() == args.len()
            && self
                .shapes
                .iter()
                .zip(args)
                .all(|(shape, arg)| shape_matches(wk, shape, arg))
            && self
                .descriptor
                .upgrade()
                .is_some_and(|d| d.composite_stamp() == self.stamp)
    }
}

/// Whether `value`'s runtime type is exactly `shape`, without building one.
fn shape_matches(wk: &WellKnown, shape: &ArgShape, value: &Value) -> bool {
    match (shape, value) {
        (None, Value::Null) => true,
        (None, _) | (Some(_), Value::Null) => false,
        (Some(TypeRef::Primitive(p)), v) => v.primitive_type() == Some(*p),
        (Some(TypeRef::Array(component)), Value::Array(array)) => **component == array.component,
        (Some(TypeRef::Array(_)), _) => false,
        (Some(TypeRef::Class(class)), v) => {
            v.primitive_type().is_none()
                && !matches!(v, Value::Array(_))
                && wk.class_of(v).id() == class.id()
        }
    }
}

/// What a cache hit runs.
pub(crate) enum CachedTarget {
    Method {
        candidate: Weak<CandidateMethod>,
        plan: CoercionPlan,
    },
    /// A public field read through property syntax.
    Field { slot: usize },
}

/// A live cache hit.
pub(crate) enum Hit {
    Method(Arc<CandidateMethod>, Arc<CacheEntry>),
    Field(usize),
}

pub(crate) struct CacheEntry {
    guard: Guard,
    target: CachedTarget,
}

impl CacheEntry {
    pub(crate) fn new(guard: Guard, target: CachedTarget) -> Self {
        Self { guard, target }
    }

    pub(crate) fn plan(&self) -> Option<&CoercionPlan> {
        match &self.target {
            CachedTarget::Method { plan, .. } => Some(plan),
            CachedTarget::Field { .. } => None,
        }
    }
}

/// Whether a call site currently holds a resolution.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CacheState {
    Empty,
    Cached,
}

/// Counters of one call site.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CallSiteStats {
    pub id: CallSiteId,
    pub hits: u64,
    pub misses: u64,
    pub state: CacheState,
}

/// One call site's cache slot.
pub struct CallSite {
    id: CallSiteId,
    entry: ArcSwapOption<CacheEntry>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl CallSite {
    fn new(id: CallSiteId) -> Self {
        Self {
            id,
            entry: ArcSwapOption::empty(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn id(&self) -> CallSiteId {
        self.id
    }

    /// The cached target if the current entry's guard admits this call.
    ///
    /// A target whose candidate has been dropped is a miss.
    pub(crate) fn probe(
        &self,
        wk: &WellKnown,
        receiver: &ClassRef,
        name: Name,
        kind: SiteKind,
        args: &[Value],
    ) -> Option<Hit> {
        let entry = self.entry.load_full()?;
        if !entry.guard.admits(wk, receiver, name, kind, args) {
            return None;
        }
        let hit = match &entry.target {
            CachedTarget::Method { candidate, .. } => {
                let candidate = candidate.upgrade()?;
                Hit::Method(candidate, Arc::clone(&entry))
            }
            CachedTarget::Field { slot } => Hit::Field(*slot),
        };
        self.hits.fetch_add(1, Ordering::Relaxed);
        Some(hit)
    }

    /// Take back a hit whose cached plan could not convert the arguments.
    pub(crate) fn retract_hit(&self) {
        self.hits.fetch_sub(1, Ordering::Relaxed);
    }

    pub(crate) fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn publish(&self, entry: CacheEntry) {
        self.entry.store(Some(Arc::new(entry)));
    }

    pub(crate) fn invalidate(&self) {
        self.entry.store(None);
    }

    pub fn stats(&self) -> CallSiteStats {
        let state = if self.entry.load().is_some() {
            CacheState::Cached
        } else {
            CacheState::Empty
        };
        CallSiteStats {
            id: self.id,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            state,
        }
    }
}

impl fmt::Debug for CallSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallSite")
            .field("id", &self.id)
            .field("stats", &self.stats())
            .finish()
    }
}

/// All call sites of a runtime, by id.
#[derive(Default)]
pub struct CallSiteCache {
    sites: DashMap<CallSiteId, Arc<CallSite>, FxBuildHasher>,
    next: AtomicU32,
}

impl CallSiteCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty site with a fresh id.
    pub fn allocate(&self) -> CallSiteId {
        let id = CallSiteId(self.next.fetch_add(1, Ordering::Relaxed));
        self.sites.insert(id, Arc::new(CallSite::new(id)));
        id
    }

    pub fn get(&self, id: CallSiteId) -> DispatchResult<Arc<CallSite>> {
        self.sites
            .get(&id)
            .map(|site| Arc::clone(&site))
            .ok_or(DispatchError::UnknownCallSite(id.0))
    }

    /// Drop a site and its entry. Returns whether it existed.
    pub fn discard(&self, id: CallSiteId) -> bool {
        self.sites.remove(&id).is_some()
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }
}
