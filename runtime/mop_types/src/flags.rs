//! Class and member modifier flags.

use bitflags::bitflags;

bitflags! {
    /// Modifiers of a runtime class.
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
    pub struct ClassFlags: u8 {
        /// Declares no state and cannot be instantiated.
        const INTERFACE = 1 << 0;
        /// Has at least one unimplemented method.
        const ABSTRACT = 1 << 1;
        /// Cannot be extended.
        const FINAL = 1 << 2;
        /// Interface with exactly one abstract method; closures adapt to it.
        const FUNCTIONAL = 1 << 3;
    }
}

bitflags! {
    /// Modifiers of a declared method, constructor or field.
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
    pub struct MemberFlags: u8 {
        const PUBLIC = 1 << 0;
        const STATIC = 1 << 1;
        const ABSTRACT = 1 << 2;
    }
}
