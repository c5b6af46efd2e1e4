//! `RuntimeBuilder` for creating Runtime instances with various configurations.

use mop_ir::SharedInterner;
use mop_types::Bootstrap;

use super::Runtime;
use crate::call_site::CallSiteCache;
use crate::coercion::CoercionEngine;
use crate::descriptor::DescriptorCache;
use crate::names::WellKnownNames;
use crate::registry::MethodRegistry;
use crate::DispatchConfig;

/// Builder for creating Runtime instances with various configurations.
///
/// Every switch starts from [`DispatchConfig::default`]. Hosts that already
/// intern names elsewhere pass their interner so `Name`s are shared.
#[derive(Default)]
pub struct RuntimeBuilder {
    interner: Option<SharedInterner>,
    config: DispatchConfig,
}

impl RuntimeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Share an existing interner instead of creating one.
    #[must_use]
    pub fn interner(mut self, interner: SharedInterner) -> Self {
        self.interner = Some(interner);
        self
    }

    /// Replace the whole configuration.
    #[must_use]
    pub fn config(mut self, config: DispatchConfig) -> Self {
        self.config = config;
        self
    }

    /// Remember resolutions per call site.
    #[must_use]
    pub fn call_site_caching(mut self, enabled: bool) -> Self {
        self.config.call_site_caching = enabled;
        self
    }

    /// Memoize merged method buckets per type.
    #[must_use]
    pub fn memoize_buckets(mut self, enabled: bool) -> Self {
        self.config.memoize_buckets = enabled;
        self
    }

    /// Let closures satisfy functional-interface parameters.
    #[must_use]
    pub fn sam_coercion(mut self, enabled: bool) -> Self {
        self.config.sam_coercion = enabled;
        self
    }

    /// Route unmatched instance calls to `methodMissing` and unresolved
    /// properties to `propertyMissing`.
    #[must_use]
    pub fn method_missing(mut self, enabled: bool) -> Self {
        self.config.method_missing = enabled;
        self
    }

    /// Define the bootstrap classes and build the runtime.
    pub fn build(self) -> Runtime {
        let interner = self.interner.unwrap_or_default();
        let bootstrap = Bootstrap::new(&interner);
        let names = WellKnownNames::new(&interner);
        let wk = bootstrap.well_known().clone();
        let descriptors = DescriptorCache::new(&wk.object, names.init);
        let registry = MethodRegistry::new(descriptors, names.init, self.config.memoize_buckets);
        let engine = CoercionEngine::new(wk, self.config.sam_coercion);
        Runtime {
            interner,
            bootstrap,
            names,
            config: self.config,
            registry,
            engine,
            call_sites: CallSiteCache::new(),
        }
    }
}
