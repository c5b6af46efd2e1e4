//! Dispatch configuration.

/// Feature switches of a [`Runtime`](crate::Runtime).
///
/// Every switch defaults to on. Turning caching or memoization off changes
/// performance only, never which method a call selects.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DispatchConfig {
    /// Remember the last resolution per call site.
    pub call_site_caching: bool,
    /// Memoize merged method buckets per type descriptor.
    pub memoize_buckets: bool,
    /// Let closures satisfy functional-interface parameters.
    pub sam_coercion: bool,
    /// Fall back to `methodMissing(String, Object[])` when no method matches,
    /// and to `propertyMissing` when no property does.
    pub method_missing: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            call_site_caching: true,
            memoize_buckets: true,
            sam_coercion: true,
            method_missing: true,
        }
    }
}

impl DispatchConfig {
    /// Every cache disabled: each call resolves from scratch.
    pub fn uncached() -> Self {
        Self {
            call_site_caching: false,
            memoize_buckets: false,
            ..Self::default()
        }
    }
}
