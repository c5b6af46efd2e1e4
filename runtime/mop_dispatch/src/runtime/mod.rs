//! The dispatch entry points.
//!
//! [`Runtime`] ties the components together: every `invoke*` call goes
//! through its call site first, and only on a guard miss through the
//! registry lookup and the overload resolver.
//!
//! ```text
//! invoke(site, receiver, name, args)
//!   ├─ hit:  apply cached plan ─► call candidate
//!   └─ miss: descriptor ─► stamp ─► bucket ─► resolve ─► publish ─► call
//!                                                 └─ no match ─► methodMissing
//! ```

mod builder;
mod operators;
mod property;

use std::sync::Arc;

use smallvec::SmallVec;
use tracing::debug;

use mop_ir::{Name, SharedInterner, StringLookup};
use mop_types::{Bootstrap, ClassRef, Invoker, TypeRef, Value, WellKnown};

use crate::call_site::{
    CacheEntry, CachedTarget, CallSite, CallSiteCache, CallSiteId, CallSiteStats, Guard, Hit,
    SiteKind,
};
use crate::coercion::{Applied, ArgShape, CoercionEngine};
use crate::descriptor::TypeDescriptor;
use crate::errors::{ambiguous_method, no_applicable_method};
use crate::names::WellKnownNames;
use crate::registry::{BucketKey, LookupScope, MethodRegistry};
use crate::resolver::{MethodResolution, OverloadResolver};
use crate::suggest::method_suggestions;
use crate::{CandidateMethod, DispatchConfig, DispatchError, DispatchResult, DynamicMethod};

pub use builder::RuntimeBuilder;
pub use operators::BinaryOp;

/// The metaobject dispatch engine.
///
/// Shared by every thread that dispatches; all entry points take `&self`.
pub struct Runtime {
    interner: SharedInterner,
    bootstrap: Bootstrap,
    names: WellKnownNames,
    config: DispatchConfig,
    registry: MethodRegistry,
    engine: CoercionEngine,
    call_sites: CallSiteCache,
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl Runtime {
    /// A runtime with the default configuration.
    pub fn new() -> Self {
        RuntimeBuilder::new().build()
    }

    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    pub fn interner(&self) -> &SharedInterner {
        &self.interner
    }

    pub fn intern(&self, name: &str) -> Name {
        self.interner.intern(name)
    }

    pub fn bootstrap(&self) -> &Bootstrap {
        &self.bootstrap
    }

    pub fn well_known(&self) -> &WellKnown {
        self.engine.well_known()
    }

    pub fn config(&self) -> DispatchConfig {
        self.config
    }

    pub fn coercion(&self) -> &CoercionEngine {
        &self.engine
    }

    pub fn registry(&self) -> &MethodRegistry {
        &self.registry
    }

    pub fn descriptor(&self, class: &ClassRef) -> DispatchResult<Arc<TypeDescriptor>> {
        self.registry.descriptor(class)
    }

    // Call sites

    /// A new, empty call site.
    pub fn call_site(&self) -> CallSiteId {
        self.call_sites.allocate()
    }

    pub fn discard_call_site(&self, site: CallSiteId) -> bool {
        self.call_sites.discard(site)
    }

    pub fn call_site_stats(&self, site: CallSiteId) -> DispatchResult<CallSiteStats> {
        Ok(self.call_sites.get(site)?.stats())
    }

    // Registration

    /// Add a method to `class` at run time. Returns whether it replaced a
    /// dynamic method with the same signature.
    pub fn register_method(&self, class: &ClassRef, method: DynamicMethod) -> DispatchResult<bool> {
        self.registry.register(class, method)
    }

    /// Remove the dynamic methods of `class` named `name` with `arity`
    /// parameters. Returns how many were removed.
    pub fn unregister_method(
        &self,
        class: &ClassRef,
        name: Name,
        arity: usize,
    ) -> DispatchResult<usize> {
        self.registry.unregister(class, name, arity)
    }

    // Invocation

    /// Call instance method `name` on `receiver`.
    pub fn invoke(
        &self,
        site: CallSiteId,
        receiver: &Value,
        name: Name,
        args: Vec<Value>,
    ) -> DispatchResult<Value> {
        let class = self.well_known().class_of(receiver);
        self.dispatch(site, receiver, class, name, LookupScope::Instance, args)
    }

    /// [`invoke`](Self::invoke) with a method name that is not interned yet.
    pub fn invoke_method(
        &self,
        site: CallSiteId,
        receiver: &Value,
        name: &str,
        args: Vec<Value>,
    ) -> DispatchResult<Value> {
        self.invoke(site, receiver, self.interner.intern(name), args)
    }

    /// Call static method `name` of `class`.
    pub fn invoke_static(
        &self,
        site: CallSiteId,
        class: &ClassRef,
        name: Name,
        args: Vec<Value>,
    ) -> DispatchResult<Value> {
        let receiver = Value::Class(ClassRef::clone(class));
        self.dispatch(site, &receiver, class, name, LookupScope::Static, args)
    }

    /// Construct an instance of `class`.
    pub fn invoke_constructor(
        &self,
        site: CallSiteId,
        class: &ClassRef,
        args: Vec<Value>,
    ) -> DispatchResult<Value> {
        let receiver = Value::Class(ClassRef::clone(class));
        self.dispatch(
            site,
            &receiver,
            class,
            self.names.init,
            LookupScope::Constructor,
            args,
        )
    }

    /// Resolve without consulting or filling any call site.
    pub fn resolve(
        &self,
        class: &ClassRef,
        name: Name,
        scope: LookupScope,
        args: &[Value],
    ) -> DispatchResult<MethodResolution> {
        let descriptor = self.registry.descriptor(class)?;
        let bucket = self.registry.lookup(&descriptor, BucketKey::new(name, scope));
        Ok(self.resolver().resolve_values(&bucket, args))
    }

    /// Every instance method of `class` named `name` that accepts `args`.
    pub fn responds_to(
        &self,
        class: &ClassRef,
        name: Name,
        args: &[Value],
    ) -> DispatchResult<Vec<Arc<CandidateMethod>>> {
        let descriptor = self.registry.descriptor(class)?;
        let bucket = self
            .registry
            .lookup(&descriptor, BucketKey::new(name, LookupScope::Instance));
        Ok(self.resolver().compatible(&bucket, &self.shapes(args)))
    }

    fn resolver(&self) -> OverloadResolver<'_> {
        OverloadResolver::new(&self.engine)
    }

    fn shapes(&self, args: &[Value]) -> SmallVec<[ArgShape; 4]> {
        args.iter().map(|a| self.engine.shape_of(a)).collect()
    }

    #[tracing::instrument(
        level = "trace",
        skip_all,
        fields(site = %site_id, class = class.name(), name = self.interner.lookup(name))
    )]
    fn dispatch(
        &self,
        site_id: CallSiteId,
        receiver: &Value,
        class: &ClassRef,
        name: Name,
        scope: LookupScope,
        mut args: Vec<Value>,
    ) -> DispatchResult<Value> {
        let site = self.call_sites.get(site_id)?;
        if self.config.call_site_caching {
            let hit = site.probe(self.well_known(), class, name, SiteKind::Method(scope), &args);
            if let Some(Hit::Method(candidate, entry)) = hit {
                let Some(plan) = entry.plan() else {
                    return self.call(&candidate, receiver, args);
                };
                match plan.apply_checked(&self.engine, args)? {
                    Applied::Ready(args) => return self.call(&candidate, receiver, args),
                    // The cached target cannot take these values; resolve afresh.
                    Applied::Overflow(original) => {
                        site.retract_hit();
                        args = original;
                    }
                }
            }
        }
        site.record_miss();
        self.resolve_and_call(&site, receiver, class, name, scope, args)
    }

    fn resolve_and_call(
        &self,
        site: &CallSite,
        receiver: &Value,
        class: &ClassRef,
        name: Name,
        scope: LookupScope,
        args: Vec<Value>,
    ) -> DispatchResult<Value> {
        let descriptor = self.registry.descriptor(class)?;
        // Read before the lookup: a concurrent change makes the entry stale,
        // never the other way around.
        let stamp = descriptor.composite_stamp();
        let key = BucketKey::new(name, scope);
        let bucket = self.registry.lookup(&descriptor, key);
        let shapes = self.shapes(&args);
        debug!(
            site = %site.id(),
            key = %key.display(&self.interner),
            stamp,
            candidates = bucket.len(),
            "call site miss"
        );

        // Candidates whose conversion overflowed on these argument values.
        let mut excluded: SmallVec<[Arc<CandidateMethod>; 1]> = SmallVec::new();
        let mut args = args;
        loop {
            match self.resolver().resolve_excluding(&bucket, &shapes, &excluded) {
                MethodResolution::Resolved(call) => {
                    let converted = match call.plan.apply_checked(&self.engine, args)? {
                        Applied::Ready(converted) => converted,
                        Applied::Overflow(original) => {
                            debug!(
                                candidate = %call.candidate.describe(&self.interner),
                                "argument out of range, excluding candidate"
                            );
                            excluded.push(call.candidate);
                            args = original;
                            continue;
                        }
                    };
                    // A fallback picked for these values alone must not be
                    // replayed for every argument of the same shape.
                    if self.config.call_site_caching && excluded.is_empty() {
                        let guard = Guard::new(&descriptor, stamp, name, SiteKind::Method(scope), shapes);
                        site.publish(CacheEntry::new(
                            guard,
                            CachedTarget::Method {
                                candidate: Arc::downgrade(&call.candidate),
                                plan: call.plan,
                            },
                        ));
                    }
                    return self.call(&call.candidate, receiver, converted);
                }
                MethodResolution::Ambiguous(tied) => {
                    if excluded.is_empty() {
                        site.invalidate();
                    }
                    let candidates = tied.iter().map(|c| c.describe(&self.interner)).collect();
                    return Err(ambiguous_method(class, self.interner.lookup(name), &args, candidates));
                }
                MethodResolution::NoMatch => {
                    if excluded.is_empty() {
                        site.invalidate();
                    }
                    if self.config.method_missing && scope == LookupScope::Instance {
                        if let Some(result) = self.method_missing(&descriptor, receiver, name, &args)? {
                            return Ok(result);
                        }
                    }
                    let suggestions =
                        method_suggestions(&self.registry, &descriptor, name, scope, &self.interner);
                    return Err(no_applicable_method(
                        class,
                        self.interner.lookup(name),
                        &args,
                        suggestions,
                    ));
                }
            }
        }
    }

    /// Route an unmatched call to `methodMissing(String, Object[])`, if the
    /// receiver type has one. Never cached.
    fn method_missing(
        &self,
        descriptor: &TypeDescriptor,
        receiver: &Value,
        name: Name,
        args: &[Value],
    ) -> DispatchResult<Option<Value>> {
        let key = BucketKey::new(self.names.method_missing, LookupScope::Instance);
        let bucket = self.registry.lookup(descriptor, key);
        if bucket.is_empty() {
            return Ok(None);
        }
        let object = TypeRef::class(&self.well_known().object);
        let fallback = vec![
            Value::string(self.interner.lookup(name)),
            Value::array(object, args.to_vec()),
        ];
        let MethodResolution::Resolved(call) = self.resolver().resolve_values(&bucket, &fallback)
        else {
            return Ok(None);
        };
        debug!(name = self.interner.lookup(name), "dispatching to methodMissing");
        let fallback = call.plan.apply(&self.engine, fallback)?;
        self.call(&call.candidate, receiver, fallback).map(Some)
    }

    /// Run a selected candidate with already-coerced arguments.
    fn call(
        &self,
        candidate: &CandidateMethod,
        receiver: &Value,
        args: Vec<Value>,
    ) -> DispatchResult<Value> {
        let result = match candidate.invoker() {
            Invoker::Native(body) => body(receiver, &args),
            Invoker::Abstract => match receiver {
                Value::Sam(adapter) if adapter.interface.sam_method() == Some(candidate.name()) => {
                    adapter.closure.call(&args)
                }
                _ => {
                    return Err(DispatchError::AbstractMethod {
                        declaring: candidate.declaring().name().to_owned(),
                        name: self.interner.lookup(candidate.name()).to_owned(),
                    })
                }
            },
        };
        result.map_err(|err| DispatchError::Invocation {
            name: candidate.describe(&self.interner),
            message: err.message().to_owned(),
        })
    }
}
