//! Shared fixtures for unit tests.

use mop_ir::SharedInterner;
use mop_types::{Bootstrap, WellKnown};

use crate::coercion::CoercionEngine;

/// An interner plus the bootstrap classes defined against it.
pub(crate) struct Fixture {
    pub(crate) interner: SharedInterner,
    pub(crate) bootstrap: Bootstrap,
}

impl Fixture {
    pub(crate) fn new() -> Self {
        let interner = SharedInterner::new();
        let bootstrap = Bootstrap::new(&interner);
        Self {
            interner,
            bootstrap,
        }
    }

    pub(crate) fn wk(&self) -> &WellKnown {
        self.bootstrap.well_known()
    }

    pub(crate) fn engine(&self) -> CoercionEngine {
        CoercionEngine::new(self.wk().clone(), true)
    }
}
