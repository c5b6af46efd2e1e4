//! Mop IR - identifiers shared by every layer of the metaobject runtime.
//!
//! Method names, property names and operator names are interned once into a
//! [`Name`] so the dispatch hot path compares `u32`s instead of strings.

mod interner;
mod name;

pub use interner::{InternError, SharedInterner, StringInterner, StringLookup};
pub use name::Name;
