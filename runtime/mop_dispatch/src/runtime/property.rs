//! Property access: `receiver.name` reads and writes.
//!
//! A read tries the `getName()` accessor, then `isName()`, then a public
//! field, nearest type first. Reads are cached per call site under the same
//! guard as method calls; writes always resolve. A property that resolves to
//! nothing goes to `propertyMissing`, uncached.

use std::sync::Arc;

use smallvec::SmallVec;
use tracing::debug;

use mop_ir::{Name, StringLookup};
use mop_types::{ClassRef, Value};

use super::Runtime;
use crate::call_site::{CacheEntry, CachedTarget, CallSiteId, Guard, Hit, SiteKind};
use crate::coercion::CoercionPlan;
use crate::descriptor::TypeDescriptor;
use crate::errors::{ambiguous_method, no_such_property};
use crate::registry::{BucketKey, LookupScope};
use crate::resolver::MethodResolution;
use crate::{CandidateMethod, DispatchError, DispatchResult};

enum PropertyTarget {
    Getter(Arc<CandidateMethod>),
    Field(usize),
}

/// `prefix` followed by `property` with its first letter upper-cased.
fn accessor_name(prefix: &str, property: &str) -> String {
    let mut chars = property.chars();
    let mut name = String::with_capacity(prefix.len() + property.len());
    name.push_str(prefix);
    if let Some(first) = chars.next() {
        name.extend(first.to_uppercase());
        name.push_str(chars.as_str());
    }
    name
}

impl Runtime {
    /// Read property `name` of `receiver`.
    pub fn get_property(&self, site: CallSiteId, receiver: &Value, name: Name) -> DispatchResult<Value> {
        let wk = self.well_known();
        let class = wk.class_of(receiver);
        let site = self.call_sites.get(site)?;
        if self.config.call_site_caching {
            match site.probe(wk, class, name, SiteKind::Property, &[]) {
                Some(Hit::Method(getter, _)) => return self.call(&getter, receiver, Vec::new()),
                Some(Hit::Field(slot)) => return self.read_field(receiver, class, name, slot),
                None => {}
            }
        }
        site.record_miss();

        let descriptor = self.registry.descriptor(class)?;
        let stamp = descriptor.composite_stamp();
        let Some(target) = self.find_property(&descriptor, name) else {
            site.invalidate();
            return match self.property_missing(&descriptor, receiver, name, None)? {
                Some(value) => Ok(value),
                None => Err(no_such_property(class, self.interner.lookup(name))),
            };
        };
        debug!(site = %site.id(), stamp, "property site miss");

        let guard = || Guard::new(&descriptor, stamp, name, SiteKind::Property, SmallVec::new());
        match target {
            PropertyTarget::Getter(getter) => {
                if self.config.call_site_caching {
                    site.publish(CacheEntry::new(
                        guard(),
                        CachedTarget::Method {
                            candidate: Arc::downgrade(&getter),
                            plan: CoercionPlan::default(),
                        },
                    ));
                }
                self.call(&getter, receiver, Vec::new())
            }
            PropertyTarget::Field(slot) => {
                if self.config.call_site_caching {
                    site.publish(CacheEntry::new(guard(), CachedTarget::Field { slot }));
                }
                self.read_field(receiver, class, name, slot)
            }
        }
    }

    /// Write property `name` of `receiver` through `setName(value)` or a
    /// public field.
    pub fn set_property(&self, receiver: &Value, name: Name, value: Value) -> DispatchResult<()> {
        let class = self.well_known().class_of(receiver);
        let descriptor = self.registry.descriptor(class)?;
        let property = self.interner.lookup(name);

        let setter = self.interner.intern(&accessor_name("set", property));
        let bucket = self
            .registry
            .lookup(&descriptor, BucketKey::new(setter, LookupScope::Instance));
        let mut args = vec![value];
        match self.resolver().resolve_values(&bucket, &args) {
            MethodResolution::Resolved(call) => {
                let args = call.plan.apply(&self.engine, args)?;
                self.call(&call.candidate, receiver, args)?;
                return Ok(());
            }
            MethodResolution::Ambiguous(tied) => {
                let candidates = tied.iter().map(|c| c.describe(&self.interner)).collect();
                return Err(ambiguous_method(
                    class,
                    self.interner.lookup(setter),
                    &args,
                    candidates,
                ));
            }
            MethodResolution::NoMatch => {}
        }

        let Some(value) = args.pop() else {
            return Err(no_such_property(class, property));
        };
        let Some(field) = descriptor.ancestors().find_map(|d| d.field(name)) else {
            return match self.property_missing(&descriptor, receiver, name, Some(value))? {
                Some(_) => Ok(()),
                None => Err(no_such_property(class, property)),
            };
        };
        let Value::Object(instance) = receiver else {
            return Err(no_such_property(class, property));
        };
        let coercion = self
            .engine
            .try_coerce_value(&field.ty, &value)
            .compatible()
            .ok_or_else(|| DispatchError::ArgumentMismatch {
                expected: field.ty.to_string(),
                actual: value.type_name().to_owned(),
            })?;
        let value = self.engine.convert(&coercion.conversion, value)?;
        instance.set_field(field.slot, value);
        Ok(())
    }

    /// Route an unresolved read to `propertyMissing(String)` and an
    /// unresolved write to `propertyMissing(String, Object)`, if the receiver
    /// type has a matching one. Never cached.
    fn property_missing(
        &self,
        descriptor: &TypeDescriptor,
        receiver: &Value,
        name: Name,
        value: Option<Value>,
    ) -> DispatchResult<Option<Value>> {
        if !self.config.method_missing {
            return Ok(None);
        }
        let key = BucketKey::new(self.names.property_missing, LookupScope::Instance);
        let bucket = self.registry.lookup(descriptor, key);
        if bucket.is_empty() {
            return Ok(None);
        }
        let mut args = vec![Value::string(self.interner.lookup(name))];
        args.extend(value);
        let MethodResolution::Resolved(call) = self.resolver().resolve_values(&bucket, &args) else {
            return Ok(None);
        };
        debug!(
            name = self.interner.lookup(name),
            write = args.len() == 2,
            "dispatching to propertyMissing"
        );
        let args = call.plan.apply(&self.engine, args)?;
        self.call(&call.candidate, receiver, args).map(Some)
    }

    fn find_property(&self, descriptor: &TypeDescriptor, name: Name) -> Option<PropertyTarget> {
        let property = self.interner.lookup(name);
        for prefix in ["get", "is"] {
            let accessor = self.interner.intern(&accessor_name(prefix, property));
            let bucket = self
                .registry
                .lookup(descriptor, BucketKey::new(accessor, LookupScope::Instance));
            if let MethodResolution::Resolved(call) = self.resolver().resolve(&bucket, &[]) {
                return Some(PropertyTarget::Getter(call.candidate));
            }
        }
        descriptor
            .ancestors()
            .find_map(|d| d.field(name))
            .map(|field| PropertyTarget::Field(field.slot))
    }

    fn read_field(
        &self,
        receiver: &Value,
        class: &ClassRef,
        name: Name,
        slot: usize,
    ) -> DispatchResult<Value> {
        receiver
            .as_object()
            .and_then(|instance| instance.field(slot))
            .ok_or_else(|| no_such_property(class, self.interner.lookup(name)))
    }
}
