//! Pre-interned names for the dispatch hot path.

use mop_ir::{Name, StringInterner};

/// Member names the engine looks up on its own, interned once per runtime
/// so fallbacks and operator dispatch compare `Name`s instead of strings.
#[derive(Clone, Copy, Debug)]
pub(crate) struct WellKnownNames {
    pub(crate) init: Name,
    pub(crate) method_missing: Name,
    pub(crate) property_missing: Name,
    pub(crate) equals: Name,
    pub(crate) compare_to: Name,
    pub(crate) plus: Name,
    pub(crate) minus: Name,
    pub(crate) multiply: Name,
    pub(crate) div: Name,
    pub(crate) mod_: Name,
}

impl WellKnownNames {
    pub(crate) fn new(interner: &StringInterner) -> Self {
        Self {
            init: interner.intern("<init>"),
            method_missing: interner.intern("methodMissing"),
            property_missing: interner.intern("propertyMissing"),
            equals: interner.intern("equals"),
            compare_to: interner.intern("compareTo"),
            plus: interner.intern("plus"),
            minus: interner.intern("minus"),
            multiply: interner.intern("multiply"),
            div: interner.intern("div"),
            mod_: interner.intern("mod"),
        }
    }
}
